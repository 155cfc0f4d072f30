// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::macros::format_description;
use time::{Date, PrimitiveDateTime, Time};

use crate::{GridView, Record};

/// Inclusive day range; either side may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<Date>,
    pub end: Option<Date>,
}

impl DateRange {
    pub const fn on(day: Date) -> Self {
        Self {
            start: Some(day),
            end: Some(day),
        }
    }

    pub const fn is_open(self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    fn contains(self, value: PrimitiveDateTime) -> bool {
        if let Some(start) = self.start
            && value.date() < start
        {
            return false;
        }
        if let Some(end) = self.end
            && value > end_of_day(end)
        {
            return false;
        }
        true
    }
}

fn end_of_day(day: Date) -> PrimitiveDateTime {
    let last = Time::from_hms_milli(23, 59, 59, 999).unwrap_or(Time::MIDNIGHT);
    day.with_time(last)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    pub name_contains: Option<String>,
    pub date_range: Option<DateRange>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.name_contains.as_deref().is_none_or(str::is_empty)
            && self.date_range.is_none_or(DateRange::is_open)
    }
}

/// Applies criteria against the name and date columns of one view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterEngine {
    name_field: &'static str,
    date_field: &'static str,
}

impl FilterEngine {
    pub const fn new(name_field: &'static str, date_field: &'static str) -> Self {
        Self {
            name_field,
            date_field,
        }
    }

    pub const fn for_view(view: GridView) -> Self {
        Self::new(view.name_field(), view.date_field())
    }

    pub fn apply<'a>(&self, records: &'a [Record], criteria: &FilterCriteria) -> Vec<&'a Record> {
        records
            .iter()
            .filter(|record| self.matches(record, criteria))
            .collect()
    }

    pub fn matches(&self, record: &Record, criteria: &FilterCriteria) -> bool {
        if let Some(needle) = criteria.name_contains.as_deref()
            && !needle.is_empty()
            && !record.field(self.name_field).display().contains(needle)
        {
            return false;
        }

        match criteria.date_range {
            Some(range) if !range.is_open() => record
                .field(self.date_field)
                .as_text()
                .and_then(parse_record_datetime)
                .is_some_and(|value| range.contains(value)),
            _ => true,
        }
    }
}

/// Parses a stored date attribute. Date-only values are taken at midnight.
pub fn parse_record_datetime(raw: &str) -> Option<PrimitiveDateTime> {
    let raw = raw.trim();
    let with_subseconds =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
    let with_seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let with_minutes = format_description!("[year]-[month]-[day] [hour]:[minute]");
    if let Ok(value) = PrimitiveDateTime::parse(raw, with_subseconds) {
        return Some(value);
    }
    if let Ok(value) = PrimitiveDateTime::parse(raw, with_seconds) {
        return Some(value);
    }
    if let Ok(value) = PrimitiveDateTime::parse(raw, with_minutes) {
        return Some(value);
    }
    parse_record_date(raw).map(Date::midnight)
}

pub fn parse_record_date(raw: &str) -> Option<Date> {
    let dashed = format_description!("[year]-[month]-[day]");
    let slashed = format_description!("[year]/[month]/[day]");
    Date::parse(raw, dashed)
        .or_else(|_| Date::parse(raw, slashed))
        .ok()
}
