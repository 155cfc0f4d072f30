// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use carebook_app::YearMonth;
use carebook_store::{RecordImport, Workspace};
use carebook_testkit::CareFaker;
use std::path::PathBuf;
use tracing::{debug, info};

pub const DEMO_SEED: u64 = 42;
pub const DEMO_RESIDENTS: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSource {
    /// Generated residents; edits stay in memory.
    Demo { seed: u64, residents: usize },
    /// JSON import that edits are written back to.
    File(PathBuf),
    /// Nothing configured: start with empty views.
    Empty,
}

pub struct WorkspaceRuntime {
    source: RecordSource,
    period: YearMonth,
    save_edits: bool,
    compact_width: u16,
}

impl WorkspaceRuntime {
    pub fn new(source: RecordSource, period: YearMonth) -> Self {
        Self {
            source,
            period,
            save_edits: true,
            compact_width: carebook_tui::DEFAULT_COMPACT_WIDTH,
        }
    }

    pub fn with_save_edits(mut self, save_edits: bool) -> Self {
        self.save_edits = save_edits;
        self
    }

    pub fn with_compact_width(mut self, compact_width: u16) -> Self {
        self.compact_width = compact_width;
        self
    }

    pub fn source(&self) -> &RecordSource {
        &self.source
    }
}

impl carebook_tui::AppRuntime for WorkspaceRuntime {
    fn load_workspace(&mut self) -> Result<Workspace> {
        match &self.source {
            RecordSource::Demo { seed, residents } => {
                let views = CareFaker::new(*seed).demo_views(self.period, *residents);
                let workspace = Workspace::from_import(RecordImport {
                    settlement: views.settlement,
                    status: views.status,
                    urine: views.urine,
                })?;
                info!(
                    seed,
                    period = %self.period,
                    records = workspace.total_records(),
                    "demo records generated"
                );
                Ok(workspace)
            }
            RecordSource::File(path) if !path.exists() => {
                info!(path = %path.display(), "records file missing; starting empty");
                Ok(Workspace::new())
            }
            RecordSource::File(path) => carebook_store::load_workspace(path),
            RecordSource::Empty => Ok(Workspace::new()),
        }
    }

    fn save_workspace(&mut self, workspace: &Workspace) -> Result<()> {
        match &self.source {
            RecordSource::File(path) if self.save_edits => {
                carebook_store::save_workspace(path, workspace)
            }
            _ => {
                debug!("edit kept in memory");
                Ok(())
            }
        }
    }

    fn compact_width(&self) -> u16 {
        self.compact_width
    }
}
