// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Single-cell edit life cycle.
//!
//! A session is a plain value: every transition consumes it and returns the
//! next one, so the owner decides where the single live session is kept.

use tracing::{debug, warn};

use crate::schema::{DAILY_CODES, filter_options, is_conventional_daily_code};
use crate::{
    CellValue, DayEntry, DayKey, DayValue, FieldKind, GridError, GridResult, Record, RecordKey,
    RecordStore, SchemaEntry, parse_amount,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    Field(&'static str),
    Day(DayKey),
}

impl EditTarget {
    /// Pairs a schema entry with an optional day. Day cells need `day`;
    /// scalar cells must not pass one.
    pub fn resolve(entry: &'static SchemaEntry, day: Option<DayKey>) -> GridResult<Self> {
        match (entry.kind, day) {
            (FieldKind::DailyRecord, Some(day)) => Ok(Self::Day(day)),
            (FieldKind::DailyRecord, None) => Err(GridError::MissingDayKey {
                field: entry.name.to_owned(),
            }),
            (_, Some(_)) => Err(GridError::NotDailyRecord {
                field: entry.name.to_owned(),
            }),
            (_, None) => Ok(Self::Field(entry.name)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Field(name) => (*name).to_owned(),
            Self::Day(day) => format!("day {day}"),
        }
    }
}

/// Sub-mode of a daily-record editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DailyInputMode {
    #[default]
    Pick,
    Free,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenSession {
    record: RecordKey,
    entry: &'static SchemaEntry,
    target: EditTarget,
    original: CellValue,
    day_was_absent: bool,
    initial_draft: String,
    draft: String,
    query: String,
    input_mode: DailyInputMode,
    cursor: usize,
}

impl OpenSession {
    pub const fn record(&self) -> &RecordKey {
        &self.record
    }

    pub const fn target(&self) -> &EditTarget {
        &self.target
    }

    pub const fn kind(&self) -> FieldKind {
        self.entry.kind
    }

    pub const fn entry(&self) -> &'static SchemaEntry {
        self.entry
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub const fn input_mode(&self) -> DailyInputMode {
        self.input_mode
    }

    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_dirty(&self) -> bool {
        self.draft != self.initial_draft
    }

    /// Options the picker currently offers.
    pub fn visible_options(&self) -> Vec<&'static str> {
        match (self.entry.kind, self.input_mode) {
            (FieldKind::Searchable, _) => filter_options(self.entry.options, &self.query),
            (FieldKind::Selection, _) | (FieldKind::DailyRecord, DailyInputMode::Pick) => {
                self.entry.options.to_vec()
            }
            _ => Vec::new(),
        }
    }

    fn coerce_field(&self) -> CellValue {
        if !self.is_dirty() {
            return self.original.clone();
        }
        match self.entry.kind {
            FieldKind::Number => coerce_number(self.entry.name, &self.draft),
            FieldKind::Selection
            | FieldKind::Searchable
            | FieldKind::Text
            | FieldKind::Date
            | FieldKind::DailyRecord => CellValue::Text(self.draft.clone()),
        }
    }

    fn coerce_day(&self, day: DayKey) -> DayValue {
        if self.input_mode == DailyInputMode::Free
            && !self.draft.is_empty()
            && !DAILY_CODES.contains(&self.draft.as_str())
            && !is_conventional_daily_code(&self.draft)
        {
            warn!(record = %self.record, %day, code = %self.draft, "unconventional daily code accepted");
        }
        DayValue::from_draft(&self.draft)
    }
}

/// Empty drafts stay unset rather than becoming zero. Yen prefixes and
/// thousands separators are accepted; anything else that does not parse is
/// kept verbatim as text.
pub fn coerce_number(field: &str, draft: &str) -> CellValue {
    if draft.trim().is_empty() {
        return CellValue::Unset;
    }
    match parse_amount(draft) {
        Some(value) => CellValue::Number(value),
        None => {
            warn!(field, draft, "non-numeric value accepted for numeric field");
            CellValue::Text(draft.to_owned())
        }
    }
}

/// Result of a commit that reached the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Committed {
    pub record: RecordKey,
    pub target: EditTarget,
    pub value: String,
    /// False when an untouched, previously absent day cell was left absent.
    pub written: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Closed,
    Open(OpenSession),
}

impl SessionState {
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open(_))
    }

    pub const fn session(&self) -> Option<&OpenSession> {
        match self {
            Self::Open(session) => Some(session),
            Self::Closed => None,
        }
    }

    const fn state_name(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open(_) => "open",
        }
    }

    fn illegal(&self, action: &'static str) -> GridError {
        GridError::IllegalTransition {
            action,
            state: self.state_name(),
        }
    }

    /// Opens an editor on one cell. See [`EditTarget::resolve`] for the
    /// day pairing rules.
    pub fn activate(
        self,
        record: &Record,
        entry: &'static SchemaEntry,
        day: Option<DayKey>,
    ) -> GridResult<Self> {
        if self.is_open() {
            return Err(self.illegal("activate"));
        }

        let target = EditTarget::resolve(entry, day)?;
        let (original, draft, day_was_absent) = match target {
            EditTarget::Day(day) => {
                let draft = record.day_draft(day);
                let absent = record.day_entry(day) == DayEntry::Absent;
                (CellValue::Text(draft.clone()), draft, absent)
            }
            EditTarget::Field(name) => {
                let original = record.field(name).clone();
                let draft = original.display();
                (original, draft, false)
            }
        };

        let cursor = entry
            .options
            .iter()
            .position(|option| *option == draft)
            .unwrap_or(0);
        debug!(record = %record.key, target = %target.describe(), kind = entry.kind.as_str(), "edit opened");

        Ok(Self::Open(OpenSession {
            record: record.key.clone(),
            entry,
            target,
            original,
            day_was_absent,
            initial_draft: draft.clone(),
            draft,
            query: String::new(),
            input_mode: DailyInputMode::Pick,
            cursor,
        }))
    }

    pub fn set_draft(self, value: impl Into<String>) -> GridResult<Self> {
        match self {
            Self::Open(mut session) => {
                session.draft = value.into();
                Ok(Self::Open(session))
            }
            closed @ Self::Closed => Err(closed.illegal("set the draft")),
        }
    }

    /// Updates the searchable query; the draft itself is left alone.
    pub fn set_query(self, query: impl Into<String>) -> GridResult<Self> {
        match self {
            Self::Open(mut session) if session.kind() == FieldKind::Searchable => {
                session.query = query.into();
                session.cursor = 0;
                Ok(Self::Open(session))
            }
            other => Err(other.illegal("search options")),
        }
    }

    /// Moves the option cursor, clamped to the visible options.
    pub fn move_cursor(self, delta: isize) -> GridResult<Self> {
        match self {
            Self::Open(mut session) => {
                let count = session.visible_options().len();
                if count > 0 {
                    let next = session.cursor.saturating_add_signed(delta);
                    session.cursor = next.min(count - 1);
                }
                Ok(Self::Open(session))
            }
            closed @ Self::Closed => Err(closed.illegal("move the option cursor")),
        }
    }

    /// Copies the option under the cursor into the draft.
    pub fn pick(self) -> GridResult<Self> {
        match self {
            Self::Open(mut session) => {
                if let Some(option) = session.visible_options().get(session.cursor).copied() {
                    session.draft = option.to_owned();
                }
                Ok(Self::Open(session))
            }
            closed @ Self::Closed => Err(closed.illegal("pick an option")),
        }
    }

    pub fn toggle_other_input(self) -> GridResult<Self> {
        match self {
            Self::Open(mut session) if session.kind() == FieldKind::DailyRecord => {
                session.input_mode = match session.input_mode {
                    DailyInputMode::Pick => DailyInputMode::Free,
                    DailyInputMode::Free => DailyInputMode::Pick,
                };
                session.cursor = 0;
                Ok(Self::Open(session))
            }
            other => Err(other.illegal("toggle free input")),
        }
    }

    /// Writes the draft through the store. The returned state is always
    /// `Closed`; a store failure is reported beside it and not retried.
    pub fn commit(self, store: &mut RecordStore) -> (Self, GridResult<Committed>) {
        let session = match self {
            Self::Open(session) => session,
            closed @ Self::Closed => {
                let error = closed.illegal("commit");
                return (Self::Closed, Err(error));
            }
        };

        let result = match session.target {
            EditTarget::Field(field) => {
                let value = session.coerce_field();
                store
                    .set_field(&session.record, field, value)
                    .map(|record| (record.field(field).display(), true))
            }
            // Leaving an empty day untouched must not turn it into a blank.
            EditTarget::Day(_) if session.day_was_absent && !session.is_dirty() => store
                .get(&session.record)
                .map(|_| (String::new(), false))
                .ok_or_else(|| GridError::NotFound {
                    key: session.record.clone(),
                }),
            EditTarget::Day(day) => {
                let value = session.coerce_day(day);
                store
                    .set_day(&session.record, day, value)
                    .map(|record| (record.day_draft(day), true))
            }
        };

        let result = result.map(|(value, written)| Committed {
            record: session.record.clone(),
            target: session.target.clone(),
            value,
            written,
        });
        match &result {
            Ok(committed) => {
                debug!(record = %committed.record, target = %committed.target.describe(), "edit committed");
            }
            Err(error) => warn!(record = %session.record, %error, "edit commit failed"),
        }
        (Self::Closed, result)
    }

    pub fn cancel(self) -> GridResult<Self> {
        match self {
            Self::Open(session) => {
                debug!(record = %session.record, target = %session.target.describe(), "edit cancelled");
                Ok(Self::Closed)
            }
            closed @ Self::Closed => Err(closed.illegal("cancel")),
        }
    }
}
