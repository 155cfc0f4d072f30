// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod validation;

use anyhow::{Context, Result, anyhow, bail};
use carebook_app::{GridView, Record, RecordStore};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const APP_NAME: &str = "carebook";

/// On-disk shape of a record import: one array per grid view.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordImport {
    #[serde(default)]
    pub settlement: Vec<Record>,
    #[serde(default)]
    pub status: Vec<Record>,
    #[serde(default)]
    pub urine: Vec<Record>,
}

impl RecordImport {
    pub fn for_view(&self, view: GridView) -> &[Record] {
        match view {
            GridView::MonthlySettlement => &self.settlement,
            GridView::StatusChange => &self.status,
            GridView::UrineTest => &self.urine,
        }
    }

    fn into_views(self) -> [(GridView, Vec<Record>); 3] {
        [
            (GridView::MonthlySettlement, self.settlement),
            (GridView::StatusChange, self.status),
            (GridView::UrineTest, self.urine),
        ]
    }
}

/// One record store per grid view. Views never share rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workspace {
    settlement: RecordStore,
    status: RecordStore,
    urine: RecordStore,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_import(import: RecordImport) -> Result<Self> {
        let mut workspace = Self::new();
        for (view, records) in import.into_views() {
            workspace.replace(view, records)?;
        }
        Ok(workspace)
    }

    pub fn store(&self, view: GridView) -> &RecordStore {
        match view {
            GridView::MonthlySettlement => &self.settlement,
            GridView::StatusChange => &self.status,
            GridView::UrineTest => &self.urine,
        }
    }

    pub fn store_mut(&mut self, view: GridView) -> &mut RecordStore {
        match view {
            GridView::MonthlySettlement => &mut self.settlement,
            GridView::StatusChange => &mut self.status,
            GridView::UrineTest => &mut self.urine,
        }
    }

    pub fn replace(&mut self, view: GridView, records: Vec<Record>) -> Result<()> {
        let count = records.len();
        self.store_mut(view)
            .replace_all(records)
            .with_context(|| format!("load {} rows", view.as_str()))?;
        debug!(view = view.as_str(), count, "view rows replaced");
        Ok(())
    }

    pub fn total_records(&self) -> usize {
        GridView::ALL
            .iter()
            .map(|view| self.store(*view).len())
            .sum()
    }

    /// Snapshot of every view in import shape.
    pub fn snapshot(&self) -> RecordImport {
        RecordImport {
            settlement: self.settlement.all().to_vec(),
            status: self.status.all().to_vec(),
            urine: self.urine.all().to_vec(),
        }
    }
}

pub fn parse_workspace(json: &str) -> Result<Workspace> {
    let import: RecordImport = serde_json::from_str(json).context("parse record import")?;
    Workspace::from_import(import)
}

pub fn load_workspace(path: &Path) -> Result<Workspace> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read records from {}", path.display()))?;
    let workspace =
        parse_workspace(&raw).with_context(|| format!("import records from {}", path.display()))?;
    info!(
        path = %path.display(),
        records = workspace.total_records(),
        "records imported"
    );
    Ok(workspace)
}

pub fn save_workspace(path: &Path, workspace: &Workspace) -> Result<()> {
    let body = serde_json::to_string_pretty(&workspace.snapshot()).context("encode records")?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    fs::write(path, body).with_context(|| format!("write records to {}", path.display()))?;
    debug!(path = %path.display(), "records written");
    Ok(())
}

/// Visible rows as a JSON array, in grid order.
pub fn export_rows(rows: &[&Record]) -> Result<String> {
    serde_json::to_string_pretty(rows).context("encode visible rows")
}

pub fn data_dir() -> Result<PathBuf> {
    if let Some(override_dir) = env::var_os("CAREBOOK_DATA_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set CAREBOOK_DATA_DIR to a writable directory")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir)
}

pub fn default_log_path() -> Result<PathBuf> {
    Ok(data_dir()?.join(format!("{APP_NAME}.log")))
}

pub fn validate_records_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("records path must not be empty");
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!("records path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead");
        }
    }

    if Path::new(path).extension().and_then(|ext| ext.to_str()) != Some("json") {
        bail!("records path {path:?} must point at a .json file");
    }
    Ok(())
}
