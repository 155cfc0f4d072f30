// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use carebook_app::{BLANK_SENTINEL, CellValue, DayKey, GridView, Record, RecordKey, YearMonth};
use std::path::PathBuf;
use time::{Date, Duration, Month};

const FAMILY_NAMES: [(&str, &str); 16] = [
    ("田中", "タナカ"),
    ("佐藤", "サトウ"),
    ("鈴木", "スズキ"),
    ("高橋", "タカハシ"),
    ("伊藤", "イトウ"),
    ("渡辺", "ワタナベ"),
    ("山本", "ヤマモト"),
    ("中村", "ナカムラ"),
    ("小林", "コバヤシ"),
    ("加藤", "カトウ"),
    ("吉田", "ヨシダ"),
    ("山田", "ヤマダ"),
    ("松本", "マツモト"),
    ("井上", "イノウエ"),
    ("木村", "キムラ"),
    ("清水", "シミズ"),
];

const GIVEN_NAMES: [(&str, &str); 14] = [
    ("太郎", "タロウ"),
    ("花子", "ハナコ"),
    ("一郎", "イチロウ"),
    ("和子", "カズコ"),
    ("清", "キヨシ"),
    ("幸子", "サチコ"),
    ("茂", "シゲル"),
    ("節子", "セツコ"),
    ("勇", "イサム"),
    ("文子", "フミコ"),
    ("実", "ミノル"),
    ("久子", "ヒサコ"),
    ("進", "ススム"),
    ("千代", "チヨ"),
];

const PREFECTURES: [&str; 6] = ["東京都", "神奈川県", "埼玉県", "千葉県", "静岡県", "大阪府"];
const STAFF: [&str; 5] = ["看護 木下", "介護 大野", "相談員 森", "看護 石川", "介護 野口"];
const NOTES: [&str; 6] = [
    "家族面会あり",
    "食事量低下に注意",
    "口座振替手続き中",
    "次回受診予定あり",
    "嚥下評価済み",
    "転倒リスク高",
];

/// Share of scheduled days that get a conventional code, in percent.
const DAILY_FILL_PERCENT: usize = 85;
const REFERENCE_YEAR: i32 = 2024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resident {
    pub name: String,
    pub furigana: String,
    pub room_number: String,
    pub gender: &'static str,
    pub birth_date: Date,
    pub admission_date: Date,
}

/// Deterministic per-view row sets for one period.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DemoViews {
    pub settlement: Vec<Record>,
    pub status: Vec<Record>,
    pub urine: Vec<Record>,
}

impl DemoViews {
    pub fn for_view(&self, view: GridView) -> &[Record] {
        match view {
            GridView::MonthlySettlement => &self.settlement,
            GridView::StatusChange => &self.status,
            GridView::UrineTest => &self.urine,
        }
    }
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn percent(&mut self, chance: usize) -> bool {
        self.int_n(100) < chance
    }
}

#[derive(Debug, Clone)]
pub struct CareFaker {
    rng: DeterministicRng,
    seed: u64,
}

impl CareFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
        }
    }

    pub const fn seed(&self) -> u64 {
        self.seed
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    /// A resident admitted before `period` begins.
    pub fn resident(&mut self, period: YearMonth) -> Resident {
        let (family, family_kana) = FAMILY_NAMES[self.rng.int_n(FAMILY_NAMES.len())];
        let (given, given_kana) = GIVEN_NAMES[self.rng.int_n(GIVEN_NAMES.len())];
        let floor = self.int_range(1, 3);
        let room = self.int_range(1, 20);

        let admission_floor = calendar_date(REFERENCE_YEAR - 6, Month::January, 1);
        let admission_ceiling = period.first_day().previous_day().unwrap_or(admission_floor);
        let birth_floor = calendar_date(1925, Month::January, 1);
        let birth_ceiling = calendar_date(1950, Month::December, 31);

        Resident {
            name: format!("{family} {given}"),
            furigana: format!("{family_kana} {given_kana}"),
            room_number: format!("{floor}{room:02}"),
            gender: self.option(GridView::MonthlySettlement, "gender"),
            birth_date: self.date_between(birth_floor, birth_ceiling),
            admission_date: self.date_between(admission_floor, admission_ceiling),
        }
    }

    pub fn settlement_record(&mut self, key: i64, resident: &Resident, period: YearMonth) -> Record {
        let view = GridView::MonthlySettlement;
        let days = i64::from(period.days_in_month());
        let mut record = Record::new(RecordKey::int(key))
            .with_field("name", CellValue::text(&resident.name))
            .with_field("furigana", CellValue::text(&resident.furigana))
            .with_field("roomNumber", CellValue::text(&resident.room_number))
            .with_field("gender", CellValue::text(resident.gender))
            .with_field("birthDate", CellValue::text(iso(resident.birth_date)))
            .with_field("admissionDate", CellValue::text(iso(resident.admission_date)))
            .with_field("careLevel", CellValue::text(self.option(view, "careLevel")))
            .with_field("burdenRatio", CellValue::text(self.option(view, "burdenRatio")))
            .with_field(
                "insurerNumber",
                CellValue::text(format!("13{:04}", self.int_range(1, 9999))),
            )
            .with_field(
                "insuredNumber",
                CellValue::text(format!("{:010}", self.int_range(1, 9_999_999))),
            )
            .with_field("residentStatus", CellValue::text(self.option(view, "residentStatus")))
            .with_field("physician", CellValue::text(self.option(view, "physician")))
            .with_field("pharmacy", CellValue::text(self.option(view, "pharmacy")))
            .with_field("mealForm", CellValue::text(self.option(view, "mealForm")))
            .with_field("roomCharge", CellValue::Number((days * 2_066) as f64))
            .with_field("mealCharge", CellValue::Number((days * 1_445) as f64))
            .with_field("utilityCharge", CellValue::Number((days * 370) as f64))
            .with_field("managementFee", CellValue::Number(15_000.0))
            .with_field(
                "dailyNecessities",
                CellValue::Number(self.int_range(20, 60) as f64 * 100.0),
            )
            .with_field("paymentMethod", CellValue::text(self.option(view, "paymentMethod")))
            .with_field("bank", CellValue::text(self.option(view, "bank")))
            .with_field(
                "billingAddress",
                CellValue::text(format!(
                    "{}{}丁目{}-{}",
                    PREFECTURES[self.rng.int_n(PREFECTURES.len())],
                    self.int_range(1, 9),
                    self.int_range(1, 30),
                    self.int_range(1, 20),
                )),
            )
            .with_field(
                "guarantorPhone",
                CellValue::text(format!(
                    "090-{:04}-{:04}",
                    self.int_range(0, 9999),
                    self.int_range(0, 9999)
                )),
            );

        if self.rng.percent(30) {
            record = record.with_field(
                "medicalExpense",
                CellValue::Number(self.int_range(5, 80) as f64 * 100.0),
            );
        }
        if self.rng.percent(25) {
            record = record.with_field("haircutFee", CellValue::Number(1_800.0));
        }
        if self.rng.percent(40) {
            record = record.with_field("notes", CellValue::text(self.pick(&NOTES)));
        }

        self.fill_daily(record, period)
    }

    pub fn status_record(&mut self, key: i64, resident: &Resident, period: YearMonth) -> Record {
        let view = GridView::StatusChange;
        let day = self.int_range(1, i64::from(period.days_in_month())) as u8;
        let changed = Date::from_calendar_date(period.year(), period.month(), day)
            .unwrap_or_else(|_| period.first_day());
        let mut record = Record::new(RecordKey::text(format!("sc-{key}")))
            .with_field("name", CellValue::text(&resident.name))
            .with_field("roomNumber", CellValue::text(&resident.room_number))
            .with_field(
                "changeDate",
                CellValue::text(format!(
                    "{} {:02}:{:02}",
                    iso(changed),
                    self.int_range(8, 18),
                    self.int_range(0, 59)
                )),
            )
            .with_field("changeType", CellValue::text(self.option(view, "changeType")))
            .with_field("destination", CellValue::text(self.option(view, "destination")))
            .with_field("reportedBy", CellValue::text(self.pick(&STAFF)));

        if self.rng.percent(50) {
            let back = changed + Duration::days(self.int_range(1, 10));
            record = record.with_field("returnDate", CellValue::text(iso(back)));
        }
        record
    }

    pub fn urine_record(&mut self, key: i64, resident: &Resident, period: YearMonth) -> Record {
        let view = GridView::UrineTest;
        let day = self.int_range(1, i64::from(period.days_in_month())) as u8;
        let tested = Date::from_calendar_date(period.year(), period.month(), day)
            .unwrap_or_else(|_| period.first_day());
        let ph = 5.0 + self.int_range(0, 30) as f64 / 10.0;
        let gravity = 1.005 + self.int_range(0, 25) as f64 / 1000.0;

        Record::new(RecordKey::text(format!("ut-{key}")))
            .with_field("name", CellValue::text(&resident.name))
            .with_field("roomNumber", CellValue::text(&resident.room_number))
            .with_field("testDate", CellValue::text(iso(tested)))
            .with_field("color", CellValue::text(self.option(view, "color")))
            .with_field("protein", CellValue::text(self.option(view, "protein")))
            .with_field("glucose", CellValue::text(self.option(view, "glucose")))
            .with_field("occultBlood", CellValue::text(self.option(view, "occultBlood")))
            .with_field("ketone", CellValue::text(self.option(view, "ketone")))
            .with_field("ph", CellValue::Number(ph))
            .with_field("specificGravity", CellValue::Number(gravity))
    }

    /// One settlement row per resident plus status and urine rows for a
    /// subset of them.
    pub fn demo_views(&mut self, period: YearMonth, residents: usize) -> DemoViews {
        let mut views = DemoViews::default();
        for index in 0..residents {
            let key = index as i64 + 1;
            let resident = self.resident(period);
            views
                .settlement
                .push(self.settlement_record(key, &resident, period));
            if self.rng.percent(35) {
                views.status.push(self.status_record(key, &resident, period));
            }
            if self.rng.percent(60) {
                views.urine.push(self.urine_record(key, &resident, period));
            }
        }
        views
    }

    fn fill_daily(&mut self, mut record: Record, period: YearMonth) -> Record {
        let away_from = self.int_range(1, i64::from(period.days_in_month()));
        let away_days = if self.rng.percent(20) {
            self.int_range(1, 4)
        } else {
            0
        };

        for day in 1..=period.days_in_month() {
            let Ok(key) = DayKey::new(period.month_number(), day) else {
                continue;
            };
            let offset = i64::from(day) - away_from;
            let code = if (0..away_days).contains(&offset) {
                if offset == 0 { "外" } else { "泊" }
            } else if self.rng.percent(DAILY_FILL_PERCENT) {
                "●"
            } else if self.rng.percent(50) {
                BLANK_SENTINEL
            } else {
                continue;
            };

            record = if code == BLANK_SENTINEL {
                record.with_day(key, "")
            } else {
                record.with_day(key, code)
            };
        }
        record
    }

    fn option(&mut self, view: GridView, field: &str) -> &'static str {
        let options = view
            .registry()
            .lookup(field)
            .map(|entry| entry.options)
            .unwrap_or(&[]);
        if options.is_empty() {
            return "";
        }
        options[self.rng.int_n(options.len())]
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }

    fn date_between(&mut self, start: Date, end: Date) -> Date {
        let span = (end - start).whole_days();
        if span <= 0 {
            return start;
        }
        start + Duration::days(self.int_range(0, span))
    }
}

pub fn temp_records_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("records.json");
    Ok((dir, path))
}

pub fn fixture_period() -> YearMonth {
    YearMonth::new(REFERENCE_YEAR, 9).expect("valid fixture period")
}

fn iso(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        date.month() as u8,
        date.day()
    )
}

fn calendar_date(year: i32, month: Month, day: u8) -> Date {
    Date::from_calendar_date(year, month, day).expect("valid calendar date")
}
