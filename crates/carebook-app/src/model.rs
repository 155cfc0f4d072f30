// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{GridError, GridResult, RecordKey, YearMonth};

/// Draft value a daily-record editor uses to mean "explicitly blank".
pub const BLANK_SENTINEL: &str = "空白";

static UNSET: CellValue = CellValue::Unset;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    #[default]
    Unset,
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// String form used for display and as the initial editor draft.
    pub fn display(&self) -> String {
        match self {
            Self::Number(value) => value.to_string(),
            Self::Text(value) => value.clone(),
            Self::Unset => String::new(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            Self::Number(_) | Self::Unset => None,
        }
    }

    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(_) | Self::Unset => None,
        }
    }

    pub const fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }
}

/// Key into a record's sparse per-day map, rendered as `<month>/<day>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DayKey {
    month: u8,
    day: u8,
}

impl DayKey {
    pub fn new(month: u8, day: u8) -> GridResult<Self> {
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(GridError::InvalidDayKey {
                input: format!("{month}/{day}"),
            });
        }
        Ok(Self { month, day })
    }

    pub fn parse(input: &str) -> GridResult<Self> {
        let invalid = || GridError::InvalidDayKey {
            input: input.to_owned(),
        };
        let (month, day) = input.split_once('/').ok_or_else(invalid)?;
        let month = parse_unpadded(month).ok_or_else(invalid)?;
        let day = parse_unpadded(day).ok_or_else(invalid)?;
        Self::new(month, day).map_err(|_| invalid())
    }

    pub fn from_date(date: time::Date) -> Self {
        Self {
            month: date.month() as u8,
            day: date.day(),
        }
    }

    pub const fn month(self) -> u8 {
        self.month
    }

    pub const fn day(self) -> u8 {
        self.day
    }
}

fn parse_unpadded(raw: &str) -> Option<u8> {
    if raw.is_empty() || raw.starts_with('0') || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.month, self.day)
    }
}

impl TryFrom<String> for DayKey {
    type Error = GridError;

    fn try_from(value: String) -> GridResult<Self> {
        Self::parse(&value)
    }
}

impl From<DayKey> for String {
    fn from(value: DayKey) -> Self {
        value.to_string()
    }
}

/// Value written into a day cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayValue {
    Blank,
    Code(String),
}

impl DayValue {
    pub fn from_draft(draft: &str) -> Self {
        if draft.is_empty() || draft == BLANK_SENTINEL {
            Self::Blank
        } else {
            Self::Code(draft.to_owned())
        }
    }

    pub fn into_stored(self) -> String {
        match self {
            Self::Blank => String::new(),
            Self::Code(code) => code,
        }
    }
}

/// Observable state of one day cell. `Absent` and `Blank` are distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayEntry<'a> {
    Absent,
    Blank,
    Code(&'a str),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub key: RecordKey,
    #[serde(default)]
    pub fields: BTreeMap<String, CellValue>,
    #[serde(default, rename = "dailyRecords")]
    pub daily_records: BTreeMap<DayKey, String>,
}

impl Record {
    pub fn new(key: RecordKey) -> Self {
        Self {
            key,
            fields: BTreeMap::new(),
            daily_records: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: &str, value: CellValue) -> Self {
        self.fields.insert(name.to_owned(), value);
        self
    }

    #[must_use]
    pub fn with_day(mut self, key: DayKey, code: &str) -> Self {
        self.daily_records.insert(key, code.to_owned());
        self
    }

    pub fn field(&self, name: &str) -> &CellValue {
        self.fields.get(name).unwrap_or(&UNSET)
    }

    pub fn day_entry(&self, key: DayKey) -> DayEntry<'_> {
        match self.daily_records.get(&key).map(String::as_str) {
            None => DayEntry::Absent,
            Some("") => DayEntry::Blank,
            Some(code) => DayEntry::Code(code),
        }
    }

    /// Draft string for a day cell; absent and blank both start empty.
    pub fn day_draft(&self, key: DayKey) -> String {
        self.daily_records.get(&key).cloned().unwrap_or_default()
    }

    /// Day entries that fall inside `period`, in calendar order.
    pub fn days_in(&self, period: YearMonth) -> impl Iterator<Item = (DayKey, &str)> + '_ {
        let month = period.month_number();
        self.daily_records
            .iter()
            .filter(move |(key, _)| key.month() == month)
            .map(|(key, code)| (*key, code.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::{BLANK_SENTINEL, CellValue, DayEntry, DayKey, DayValue, Record};
    use crate::{RecordKey, YearMonth};

    #[test]
    fn day_key_rejects_zero_padding_and_out_of_range_parts() {
        assert!(DayKey::parse("9/3").is_ok());
        assert!(DayKey::parse("12/31").is_ok());
        assert!(DayKey::parse("09/3").is_err());
        assert!(DayKey::parse("9/03").is_err());
        assert!(DayKey::parse("13/1").is_err());
        assert!(DayKey::parse("2/0").is_err());
        assert!(DayKey::parse("2-1").is_err());
        assert!(DayKey::parse("/1").is_err());
    }

    #[test]
    fn day_keys_order_by_month_then_day() {
        let early = DayKey::parse("2/29").expect("valid day key");
        let late = DayKey::parse("10/1").expect("valid day key");
        assert!(early < late);
        assert_eq!(late.to_string(), "10/1");
    }

    #[test]
    fn blank_and_absent_days_are_different_entries() {
        let day = DayKey::parse("9/3").expect("valid day key");
        let absent = Record::new(RecordKey::int(1));
        let blank = Record::new(RecordKey::int(2)).with_day(day, "");
        let marked = Record::new(RecordKey::int(3)).with_day(day, "●");

        assert_eq!(absent.day_entry(day), DayEntry::Absent);
        assert_eq!(blank.day_entry(day), DayEntry::Blank);
        assert_eq!(marked.day_entry(day), DayEntry::Code("●"));
    }

    #[test]
    fn blank_sentinel_draft_becomes_empty_string() {
        assert_eq!(DayValue::from_draft(BLANK_SENTINEL), DayValue::Blank);
        assert_eq!(DayValue::from_draft(BLANK_SENTINEL).into_stored(), "");
        assert_eq!(
            DayValue::from_draft("12▼"),
            DayValue::Code("12▼".to_owned())
        );
    }

    #[test]
    fn number_display_drops_trailing_zero_fraction() {
        assert_eq!(CellValue::Number(12.0).display(), "12");
        assert_eq!(CellValue::Number(0.5).display(), "0.5");
        assert_eq!(CellValue::Unset.display(), "");
    }

    #[test]
    fn days_in_only_yields_the_selected_month() -> Result<(), crate::GridError> {
        let record = Record::new(RecordKey::int(1))
            .with_day(DayKey::parse("9/3")?, "●")
            .with_day(DayKey::parse("10/1")?, "○");
        let september: Vec<_> = record.days_in(YearMonth::parse("2024-09")?).collect();
        assert_eq!(september, vec![(DayKey::parse("9/3")?, "●")]);
        Ok(())
    }
}
