// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

use crate::{GridView, RecordKey};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    /// An editable column has no registry entry. This is a configuration
    /// defect in the view definition, not something a user can fix.
    #[error("no schema entry for field {field:?} in the {} view", view.label())]
    SchemaNotFound { view: GridView, field: String },

    #[error("invalid period {input:?}; expected YYYY-MM with a month in 01..12")]
    InvalidPeriod { input: String },

    #[error("invalid day key {input:?}; expected <month>/<day> without zero padding")]
    InvalidDayKey { input: String },

    #[error("record {key} not found")]
    NotFound { key: RecordKey },

    #[error("record key {key} is already in use")]
    DuplicateKey { key: RecordKey },

    #[error("cannot {action} while the editor is {state}")]
    IllegalTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("field {field:?} is not a daily record column")]
    NotDailyRecord { field: String },

    #[error("daily record column {field:?} needs a day key")]
    MissingDayKey { field: String },
}

pub type GridResult<T> = std::result::Result<T, GridError>;
