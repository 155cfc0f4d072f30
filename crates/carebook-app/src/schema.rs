// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::{BLANK_SENTINEL, GridError, GridResult};

/// Name of the sparse per-day column in every view that has one.
pub const DAILY_RECORDS_FIELD: &str = "dailyRecords";

/// Placeholder shown while typing a free daily value. Not enforced.
pub const DAILY_FREE_INPUT_HINT: &str = "01-99, or digits + ▼";

pub const DAILY_CODES: &[&str] = &["●", "○", "△", "×", "入", "退", "外", "泊", BLANK_SENTINEL];

const GENDERS: &[&str] = &["男性", "女性"];
const CARE_LEVELS: &[&str] = &[
    "要支援1", "要支援2", "要介護1", "要介護2", "要介護3", "要介護4", "要介護5",
];
const BURDEN_RATIOS: &[&str] = &["1割", "2割", "3割"];
const RESIDENT_STATUSES: &[&str] = &["入所中", "入院中", "外泊中", "退所"];
const MEAL_FORMS: &[&str] = &["常食", "軟食", "刻み食", "極刻み食", "ミキサー食", "流動食"];
const PAYMENT_METHODS: &[&str] = &["口座振替", "振込", "現金"];
pub const PHYSICIANS: &[&str] = &[
    "青木クリニック 青木医師",
    "中央病院 内科 石井医師",
    "中央病院 整形外科 上田医師",
    "さくら診療所 遠藤医師",
    "みどり内科 小野医師",
    "Kawasaki Family Clinic Dr. Kato",
];
pub const PHARMACIES: &[&str] = &[
    "ひかり薬局 本店",
    "ひかり薬局 駅前店",
    "あおば調剤薬局",
    "さくら薬局",
    "Green Pharmacy",
];
pub const BANKS: &[&str] = &[
    "みずほ銀行",
    "三菱UFJ銀行",
    "三井住友銀行",
    "ゆうちょ銀行",
    "横浜銀行",
    "JA バンク",
];
const CHANGE_TYPES: &[&str] = &["入院", "退院", "外泊", "帰設", "退所", "死亡退所"];
pub const DESTINATIONS: &[&str] = &[
    "中央病院",
    "市民病院",
    "大学附属病院",
    "ひまわり整形外科",
    "自宅",
    "家族宅",
];
const DIPSTICK: &[&str] = &["−", "±", "+", "2+", "3+"];
const URINE_COLORS: &[&str] = &["淡黄色", "黄色", "濃黄色", "褐色", "赤色"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Selection,
    Searchable,
    DailyRecord,
    Text,
    Number,
    Date,
}

impl FieldKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Selection => "selection",
            Self::Searchable => "searchable",
            Self::DailyRecord => "dailyRecord",
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
        }
    }

    pub const fn has_options(self) -> bool {
        matches!(self, Self::Selection | Self::Searchable | Self::DailyRecord)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaEntry {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub options: &'static [&'static str],
}

const fn entry(name: &'static str, label: &'static str, kind: FieldKind) -> SchemaEntry {
    SchemaEntry {
        name,
        label,
        kind,
        options: &[],
    }
}

const fn choice(
    name: &'static str,
    label: &'static str,
    kind: FieldKind,
    options: &'static [&'static str],
) -> SchemaEntry {
    SchemaEntry {
        name,
        label,
        kind,
        options,
    }
}

const SETTLEMENT_FIELDS: &[SchemaEntry] = &[
    entry("name", "氏名", FieldKind::Text),
    entry("furigana", "フリガナ", FieldKind::Text),
    entry("roomNumber", "居室", FieldKind::Text),
    choice("gender", "性別", FieldKind::Selection, GENDERS),
    entry("birthDate", "生年月日", FieldKind::Date),
    choice("careLevel", "介護度", FieldKind::Selection, CARE_LEVELS),
    choice("burdenRatio", "負担割合", FieldKind::Selection, BURDEN_RATIOS),
    entry("insurerNumber", "保険者番号", FieldKind::Text),
    entry("insuredNumber", "被保険者番号", FieldKind::Text),
    entry("admissionDate", "入所日", FieldKind::Date),
    entry("dischargeDate", "退所日", FieldKind::Date),
    choice("residentStatus", "状態", FieldKind::Selection, RESIDENT_STATUSES),
    choice("physician", "主治医", FieldKind::Searchable, PHYSICIANS),
    choice("pharmacy", "薬局", FieldKind::Searchable, PHARMACIES),
    choice("mealForm", "食形態", FieldKind::Selection, MEAL_FORMS),
    entry("roomCharge", "居住費", FieldKind::Number),
    entry("mealCharge", "食費", FieldKind::Number),
    entry("utilityCharge", "光熱水費", FieldKind::Number),
    entry("managementFee", "管理費", FieldKind::Number),
    entry("dailyNecessities", "日用品費", FieldKind::Number),
    entry("medicalExpense", "医療費", FieldKind::Number),
    entry("medicineExpense", "薬代", FieldKind::Number),
    entry("haircutFee", "理美容代", FieldKind::Number),
    entry("otherExpense", "その他", FieldKind::Number),
    entry("deposit", "預り金", FieldKind::Number),
    choice("paymentMethod", "支払方法", FieldKind::Selection, PAYMENT_METHODS),
    choice("bank", "金融機関", FieldKind::Searchable, BANKS),
    entry("billingAddress", "請求先住所", FieldKind::Text),
    entry("guarantor", "身元引受人", FieldKind::Text),
    entry("guarantorPhone", "連絡先", FieldKind::Text),
    entry("notes", "備考", FieldKind::Text),
    choice(
        DAILY_RECORDS_FIELD,
        "日別記録",
        FieldKind::DailyRecord,
        DAILY_CODES,
    ),
];

const STATUS_CHANGE_FIELDS: &[SchemaEntry] = &[
    entry("name", "氏名", FieldKind::Text),
    entry("roomNumber", "居室", FieldKind::Text),
    entry("changeDate", "異動日", FieldKind::Date),
    choice("changeType", "異動種別", FieldKind::Selection, CHANGE_TYPES),
    choice("destination", "異動先", FieldKind::Searchable, DESTINATIONS),
    entry("returnDate", "帰設日", FieldKind::Date),
    entry("reportedBy", "報告者", FieldKind::Text),
    entry("notes", "備考", FieldKind::Text),
];

const URINE_TEST_FIELDS: &[SchemaEntry] = &[
    entry("name", "氏名", FieldKind::Text),
    entry("roomNumber", "居室", FieldKind::Text),
    entry("testDate", "検査日", FieldKind::Date),
    choice("color", "色調", FieldKind::Selection, URINE_COLORS),
    choice("protein", "蛋白", FieldKind::Selection, DIPSTICK),
    choice("glucose", "糖", FieldKind::Selection, DIPSTICK),
    choice("occultBlood", "潜血", FieldKind::Selection, DIPSTICK),
    choice("ketone", "ケトン体", FieldKind::Selection, DIPSTICK),
    entry("ph", "pH", FieldKind::Number),
    entry("specificGravity", "比重", FieldKind::Number),
    entry("notes", "備考", FieldKind::Text),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GridView {
    MonthlySettlement,
    StatusChange,
    UrineTest,
}

impl GridView {
    pub const ALL: [Self; 3] = [Self::MonthlySettlement, Self::StatusChange, Self::UrineTest];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MonthlySettlement => "settlement",
            Self::StatusChange => "status",
            Self::UrineTest => "urine",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "settlement" => Some(Self::MonthlySettlement),
            "status" => Some(Self::StatusChange),
            "urine" => Some(Self::UrineTest),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::MonthlySettlement => "月次精算",
            Self::StatusChange => "異動",
            Self::UrineTest => "尿検査",
        }
    }

    pub const fn registry(self) -> SchemaRegistry {
        let entries = match self {
            Self::MonthlySettlement => SETTLEMENT_FIELDS,
            Self::StatusChange => STATUS_CHANGE_FIELDS,
            Self::UrineTest => URINE_TEST_FIELDS,
        };
        SchemaRegistry {
            view: self,
            entries,
        }
    }

    pub const fn name_field(self) -> &'static str {
        "name"
    }

    /// Field the date-range filter compares against.
    pub const fn date_field(self) -> &'static str {
        match self {
            Self::MonthlySettlement => "admissionDate",
            Self::StatusChange => "changeDate",
            Self::UrineTest => "testDate",
        }
    }

    pub const fn has_daily_records(self) -> bool {
        matches!(self, Self::MonthlySettlement)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaRegistry {
    view: GridView,
    entries: &'static [SchemaEntry],
}

impl SchemaRegistry {
    pub const fn view(self) -> GridView {
        self.view
    }

    pub fn lookup(self, field: &str) -> GridResult<&'static SchemaEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name == field)
            .ok_or_else(|| GridError::SchemaNotFound {
                view: self.view,
                field: field.to_owned(),
            })
    }

    pub const fn entries(self) -> &'static [SchemaEntry] {
        self.entries
    }

    /// Scalar columns in display order, without the per-day column.
    pub fn fixed_entries(self) -> impl Iterator<Item = &'static SchemaEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.kind != FieldKind::DailyRecord)
    }
}

/// Case-insensitive substring match used by searchable pickers.
pub fn filter_options(options: &'static [&'static str], query: &str) -> Vec<&'static str> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return options.to_vec();
    }
    options
        .iter()
        .copied()
        .filter(|option| option.to_lowercase().contains(&needle))
        .collect()
}

/// Whether a free daily value follows the hinted `NN` / `NN▼` shape.
pub fn is_conventional_daily_code(input: &str) -> bool {
    let digits = input.strip_suffix('▼').unwrap_or(input);
    (1..=2).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
}
