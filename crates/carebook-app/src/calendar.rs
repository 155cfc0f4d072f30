// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;
use time::{Date, Month, Weekday};

use crate::{DayKey, GridError, GridResult};

/// Short weekday labels, Sunday first.
pub const WEEKDAY_LABELS: [&str; 7] = ["日", "月", "火", "水", "木", "金", "土"];

/// A selected calendar month, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: Month,
}

impl YearMonth {
    pub fn new(year: i32, month: u8) -> GridResult<Self> {
        let invalid = || GridError::InvalidPeriod {
            input: format!("{year:04}-{month:02}"),
        };
        let month = Month::try_from(month).map_err(|_| invalid())?;
        // Reject years the calendar cannot represent.
        Date::from_calendar_date(year, month, 1).map_err(|_| invalid())?;
        Ok(Self { year, month })
    }

    pub fn parse(input: &str) -> GridResult<Self> {
        let invalid = || GridError::InvalidPeriod {
            input: input.to_owned(),
        };
        let (year, month) = input.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u8 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }

    pub fn from_date(date: Date) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub const fn year(self) -> i32 {
        self.year
    }

    pub const fn month(self) -> Month {
        self.month
    }

    pub const fn month_number(self) -> u8 {
        self.month as u8
    }

    pub fn days_in_month(self) -> u8 {
        time::util::days_in_year_month(self.year, self.month)
    }

    pub fn first_day(self) -> Date {
        // `new`/`parse` already proved day one exists.
        Date::from_calendar_date(self.year, self.month, 1).unwrap_or(Date::MIN)
    }

    pub fn contains(self, date: Date) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Moves by whole months; `None` once the calendar range is exceeded.
    pub fn shift(self, months: i32) -> Option<Self> {
        let base = (i32::from(self.month_number()) - 1).checked_add(months)?;
        let year = self.year.checked_add(base.div_euclid(12))?;
        let month = u8::try_from(base.rem_euclid(12) + 1).ok()?;
        Self::new(year, month).ok()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month_number())
    }
}

impl TryFrom<String> for YearMonth {
    type Error = GridError;

    fn try_from(value: String) -> GridResult<Self> {
        Self::parse(&value)
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayColumn {
    pub day: u8,
    pub weekday: Weekday,
    pub key: DayKey,
}

impl DayColumn {
    pub const fn weekday_label(self) -> &'static str {
        WEEKDAY_LABELS[self.weekday.number_days_from_sunday() as usize]
    }

    pub const fn is_weekend(self) -> bool {
        matches!(self.weekday, Weekday::Saturday | Weekday::Sunday)
    }

    pub fn header(self) -> String {
        format!("{}({})", self.day, self.weekday_label())
    }
}

/// Day columns for `period`, day one first.
pub fn day_columns(period: YearMonth) -> Vec<DayColumn> {
    let mut date = period.first_day();
    let mut columns = Vec::with_capacity(usize::from(period.days_in_month()));
    loop {
        columns.push(DayColumn {
            day: date.day(),
            weekday: date.weekday(),
            key: DayKey::from_date(date),
        });
        match date.next_day() {
            Some(next) if period.contains(next) => date = next,
            _ => break,
        }
    }
    columns
}

/// Parses a `YYYY-MM` string and returns its day columns.
pub fn columns(input: &str) -> GridResult<Vec<DayColumn>> {
    YearMonth::parse(input).map(day_columns)
}
