// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use carebook_app::{DateRange, YearMonth};
use time::Date;
use time::macros::format_description;

pub const DATE_LAYOUT: &str = "YYYY-MM-DD";
pub const RANGE_SEPARATOR: &str = "..";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    InvalidDate,
    InvalidDateRange,
    ReversedDateRange,
    InvalidPeriod,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDate => write!(f, "invalid date value; expected {DATE_LAYOUT}"),
            Self::InvalidDateRange => write!(
                f,
                "invalid date range; expected {DATE_LAYOUT}{RANGE_SEPARATOR}{DATE_LAYOUT}"
            ),
            Self::ReversedDateRange => f.write_str("date range ends before it starts"),
            Self::InvalidPeriod => f.write_str("invalid period; expected YYYY-MM"),
        }
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

pub fn parse_optional_date(input: &str) -> ValidationResult<Option<Date>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_date(trimmed).map(Some)
}

pub fn format_date(value: Option<Date>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    value
        .format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

/// Parses `start..end` where either side may be empty. A lone date selects
/// that single day; empty input clears the range.
pub fn parse_date_range(input: &str) -> ValidationResult<Option<DateRange>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let Some((start, end)) = trimmed.split_once(RANGE_SEPARATOR) else {
        return parse_date(trimmed).map(|day| Some(DateRange::on(day)));
    };
    if end.contains(RANGE_SEPARATOR) {
        return Err(ValidationError::InvalidDateRange);
    }

    let start = parse_optional_date(start).map_err(|_| ValidationError::InvalidDateRange)?;
    let end = parse_optional_date(end).map_err(|_| ValidationError::InvalidDateRange)?;
    if let (Some(start), Some(end)) = (start, end)
        && end < start
    {
        return Err(ValidationError::ReversedDateRange);
    }

    let range = DateRange { start, end };
    Ok((!range.is_open()).then_some(range))
}

pub fn format_date_range(range: Option<&DateRange>) -> String {
    let Some(range) = range else {
        return String::new();
    };
    match (range.start, range.end) {
        (Some(start), Some(end)) if start == end => format_date(Some(start)),
        (start, end) => format!("{}{RANGE_SEPARATOR}{}", format_date(start), format_date(end)),
    }
}

pub fn parse_period(input: &str) -> ValidationResult<YearMonth> {
    YearMonth::parse(input.trim()).map_err(|_| ValidationError::InvalidPeriod)
}

fn parse_date(input: &str) -> ValidationResult<Date> {
    Date::parse(input, &format_description!("[year]-[month]-[day]"))
        .map_err(|_| ValidationError::InvalidDate)
}
