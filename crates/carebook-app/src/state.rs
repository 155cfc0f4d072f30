// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::debug;

use crate::{
    DateRange, DayColumn, DayKey, EditTarget, FilterCriteria, FilterEngine, GridError,
    GridResult, GridView, LayoutMode, Record, RecordKey, RecordStore, SchemaEntry, ScrollSync,
    SessionState, WidthObserver, YearMonth, day_columns,
};

#[derive(Debug, Clone, PartialEq)]
pub struct GridState {
    pub view: GridView,
    pub period: YearMonth,
    pub criteria: FilterCriteria,
    pub scroll: ScrollSync,
    pub layout: LayoutMode,
    pub status_line: Option<String>,
    columns: Vec<DayColumn>,
    session: SessionState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridCommand {
    NextView,
    PrevView,
    SetPeriod(YearMonth),
    ShiftPeriod(i32),
    SetNameFilter(String),
    SetDateRange(Option<DateRange>),
    ClearFilters,
    Activate {
        record: RecordKey,
        field: String,
        day: Option<DayKey>,
    },
    SetDraft(String),
    SetQuery(String),
    MoveOption(isize),
    PickOption,
    ToggleOtherInput,
    Commit,
    Cancel,
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    ViewChanged(GridView),
    PeriodChanged(YearMonth),
    FilterChanged,
    LayoutChanged(LayoutMode),
    SessionOpened {
        record: RecordKey,
        target: EditTarget,
    },
    SessionUpdated,
    SessionClosed {
        committed: bool,
    },
    RecordUpdated(RecordKey),
    CommitFailed(GridError),
    StatusUpdated(String),
    StatusCleared,
}

impl GridState {
    pub fn new(view: GridView, period: YearMonth) -> Self {
        Self {
            view,
            period,
            criteria: FilterCriteria::default(),
            scroll: ScrollSync::default(),
            layout: LayoutMode::default(),
            status_line: None,
            columns: if view.has_daily_records() {
                day_columns(period)
            } else {
                Vec::new()
            },
            session: SessionState::Closed,
        }
    }

    /// Day columns for the selected month, empty for views without them.
    pub fn columns(&self) -> &[DayColumn] {
        &self.columns
    }

    pub const fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn fixed_columns(&self) -> Vec<&'static SchemaEntry> {
        self.view.registry().fixed_entries().collect()
    }

    /// Rows that pass the current criteria, in store order. This is also
    /// the sequence handed to exporters.
    pub fn visible_rows<'a>(&self, store: &'a RecordStore) -> Vec<&'a Record> {
        FilterEngine::for_view(self.view).apply(store.all(), &self.criteria)
    }

    pub fn observe_width(&mut self, observer: &dyn WidthObserver, compact_below: u16) -> Vec<GridEvent> {
        let layout = LayoutMode::observe(observer, compact_below);
        if layout == self.layout {
            return Vec::new();
        }
        self.layout = layout;
        vec![GridEvent::LayoutChanged(layout)]
    }

    /// Applies one command against the store of the active view.
    pub fn dispatch(
        &mut self,
        store: &mut RecordStore,
        command: GridCommand,
    ) -> GridResult<Vec<GridEvent>> {
        match command {
            GridCommand::NextView => Ok(self.rotate_view(store, 1)),
            GridCommand::PrevView => Ok(self.rotate_view(store, -1)),
            GridCommand::SetPeriod(period) => Ok(self.set_period(store, period)),
            GridCommand::ShiftPeriod(months) => {
                let period = self.period.shift(months).ok_or_else(|| GridError::InvalidPeriod {
                    input: format!("{} {months:+} months", self.period),
                })?;
                Ok(self.set_period(store, period))
            }
            GridCommand::SetNameFilter(needle) => {
                let mut events = self.release_focus(store);
                self.criteria.name_contains = (!needle.is_empty()).then_some(needle);
                events.push(GridEvent::FilterChanged);
                Ok(events)
            }
            GridCommand::SetDateRange(range) => {
                let mut events = self.release_focus(store);
                self.criteria.date_range = range;
                events.push(GridEvent::FilterChanged);
                Ok(events)
            }
            GridCommand::ClearFilters => {
                let mut events = self.release_focus(store);
                self.criteria = FilterCriteria::default();
                events.push(GridEvent::FilterChanged);
                events.push(self.set_status("filters cleared"));
                Ok(events)
            }
            GridCommand::Activate { record, field, day } => self.activate(store, &record, &field, day),
            GridCommand::SetDraft(value) => self.update_session(|s| s.set_draft(value)),
            GridCommand::SetQuery(query) => self.update_session(|s| s.set_query(query)),
            GridCommand::MoveOption(delta) => self.update_session(|s| s.move_cursor(delta)),
            GridCommand::PickOption => self.update_session(SessionState::pick),
            GridCommand::ToggleOtherInput => self.update_session(SessionState::toggle_other_input),
            GridCommand::Commit => {
                let (state, result) = std::mem::take(&mut self.session).commit(store);
                self.session = state;
                let committed = result?;
                let target = committed.target.describe();
                let mut events = vec![GridEvent::SessionClosed { committed: true }];
                if committed.written {
                    events.push(GridEvent::RecordUpdated(committed.record));
                    events.push(self.set_status(&format!("saved {target}")));
                } else {
                    events.push(self.set_status(&format!("no change to {target}")));
                }
                Ok(events)
            }
            GridCommand::Cancel => {
                self.session = std::mem::take(&mut self.session).cancel()?;
                Ok(vec![
                    GridEvent::SessionClosed { committed: false },
                    self.set_status("edit cancelled"),
                ])
            }
            GridCommand::ClearStatus => {
                self.status_line = None;
                Ok(vec![GridEvent::StatusCleared])
            }
        }
    }

    fn activate(
        &mut self,
        store: &mut RecordStore,
        key: &RecordKey,
        field: &str,
        day: Option<DayKey>,
    ) -> GridResult<Vec<GridEvent>> {
        // Everything that can reject the new cell is checked before the
        // live session is committed away.
        let entry = self.view.registry().lookup(field)?;
        EditTarget::resolve(entry, day)?;
        if store.get(key).is_none() {
            return Err(GridError::NotFound { key: key.clone() });
        }

        let mut events = self.release_focus(store);
        let record = store
            .get(key)
            .ok_or_else(|| GridError::NotFound { key: key.clone() })?;

        self.session = SessionState::Closed.activate(record, entry, day)?;
        if let Some(session) = self.session.session() {
            events.push(GridEvent::SessionOpened {
                record: session.record().clone(),
                target: session.target().clone(),
            });
        }
        Ok(events)
    }

    fn update_session(
        &mut self,
        transition: impl FnOnce(SessionState) -> GridResult<SessionState>,
    ) -> GridResult<Vec<GridEvent>> {
        let current = std::mem::take(&mut self.session);
        let fallback = current.clone();
        match transition(current) {
            Ok(next) => {
                self.session = next;
                Ok(vec![GridEvent::SessionUpdated])
            }
            Err(error) => {
                self.session = fallback;
                Err(error)
            }
        }
    }

    /// Focus moved away from the live cell: commit it before doing anything
    /// else so at most one session is ever open.
    fn release_focus(&mut self, store: &mut RecordStore) -> Vec<GridEvent> {
        if !self.session.is_open() {
            return Vec::new();
        }
        let (state, result) = std::mem::take(&mut self.session).commit(store);
        self.session = state;
        match result {
            Ok(committed) => {
                debug!(record = %committed.record, written = committed.written, "auto-committed on focus loss");
                let mut events = vec![GridEvent::SessionClosed { committed: true }];
                if committed.written {
                    events.push(GridEvent::RecordUpdated(committed.record));
                }
                events
            }
            Err(error) => {
                let message = error.to_string();
                vec![
                    GridEvent::SessionClosed { committed: false },
                    GridEvent::CommitFailed(error),
                    self.set_status(&message),
                ]
            }
        }
    }

    fn rotate_view(&mut self, store: &mut RecordStore, delta: isize) -> Vec<GridEvent> {
        let mut events = self.release_focus(store);
        let views = GridView::ALL;
        let current = views
            .iter()
            .position(|view| *view == self.view)
            .unwrap_or(0) as isize;
        let len = views.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.view = views[next];
        self.columns = if self.view.has_daily_records() {
            day_columns(self.period)
        } else {
            Vec::new()
        };
        self.scroll = ScrollSync::default();
        events.push(GridEvent::ViewChanged(self.view));
        events
    }

    fn set_period(&mut self, store: &mut RecordStore, period: YearMonth) -> Vec<GridEvent> {
        let mut events = self.release_focus(store);
        self.period = period;
        if self.view.has_daily_records() {
            self.columns = day_columns(period);
        }
        events.push(GridEvent::PeriodChanged(period));
        events.push(self.set_status(&format!("period {period}")));
        events
    }

    fn set_status(&mut self, message: &str) -> GridEvent {
        self.status_line = Some(message.to_owned());
        GridEvent::StatusUpdated(message.to_owned())
    }
}
