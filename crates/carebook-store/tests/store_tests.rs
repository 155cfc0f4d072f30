// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use carebook_app::{
    CellValue, DayEntry, DayKey, DayValue, GridCommand, GridState, GridView, RecordKey,
};
use carebook_store::{
    RecordImport, Workspace, export_rows, load_workspace, parse_workspace, save_workspace,
    validate_records_path,
};
use carebook_testkit::{CareFaker, fixture_period, temp_records_path};

const SAMPLE: &str = r#"{
  "settlement": [
    {
      "key": 1,
      "fields": { "name": "田中 太郎", "admissionDate": "2024-09-03", "roomCharge": 61980 },
      "dailyRecords": { "9/3": "●", "9/4": "" }
    },
    {
      "key": "r-2",
      "fields": { "name": "佐藤 花子", "admissionDate": "2024-08-20" }
    }
  ],
  "urine": [
    { "key": "ut-1", "fields": { "name": "田中 太郎", "testDate": "2024-09-10", "ph": 6.5 } }
  ]
}"#;

#[test]
fn validate_records_path_rejects_uri_forms() {
    assert!(validate_records_path("").is_err());
    assert!(validate_records_path("https://example.com/records.json").is_err());
    assert!(validate_records_path("/tmp/records.csv").is_err());
    assert!(validate_records_path("/tmp/records.json").is_ok());
}

#[test]
fn parse_workspace_splits_views_and_keeps_cell_shapes() -> Result<()> {
    let workspace = parse_workspace(SAMPLE)?;
    assert_eq!(workspace.store(GridView::MonthlySettlement).len(), 2);
    assert!(workspace.store(GridView::StatusChange).is_empty());
    assert_eq!(workspace.total_records(), 3);

    let settlement = workspace.store(GridView::MonthlySettlement);
    let first = settlement.get(&RecordKey::int(1)).expect("int key");
    assert_eq!(first.field("roomCharge"), &CellValue::Number(61_980.0));
    assert_eq!(first.day_entry(DayKey::parse("9/3")?), DayEntry::Code("●"));
    assert_eq!(first.day_entry(DayKey::parse("9/4")?), DayEntry::Blank);
    assert_eq!(first.day_entry(DayKey::parse("9/5")?), DayEntry::Absent);
    assert!(settlement.get(&RecordKey::text("r-2")).is_some());
    Ok(())
}

#[test]
fn parse_workspace_rejects_duplicate_keys() {
    let json = r#"{ "status": [ { "key": 7 }, { "key": 7 } ] }"#;
    let error = parse_workspace(json).expect_err("duplicate keys");
    let message = format!("{error:#}");
    assert!(message.contains("load status rows"), "{message}");
    assert!(message.contains('7'), "{message}");
}

#[test]
fn parse_workspace_rejects_unknown_views_and_bad_day_keys() {
    assert!(parse_workspace(r#"{ "billing": [] }"#).is_err());
    assert!(parse_workspace(r#"{ "settlement": [ { "key": 1, "dailyRecords": { "09/03": "●" } } ] }"#).is_err());
}

#[test]
fn save_then_load_preserves_edits() -> Result<()> {
    let (_dir, path) = temp_records_path()?;
    let mut workspace = parse_workspace(SAMPLE)?;
    let key = RecordKey::int(1);
    workspace.store_mut(GridView::MonthlySettlement).set_day(
        &key,
        DayKey::parse("9/3")?,
        DayValue::from_draft("空白"),
    )?;

    save_workspace(&path, &workspace)?;
    let reloaded = load_workspace(&path)?;
    assert_eq!(reloaded.snapshot(), workspace.snapshot());
    let record = reloaded
        .store(GridView::MonthlySettlement)
        .get(&key)
        .expect("record survives");
    assert_eq!(record.day_entry(DayKey::parse("9/3")?), DayEntry::Blank);
    Ok(())
}

#[test]
fn load_workspace_reports_the_path() -> Result<()> {
    let (dir, _) = temp_records_path()?;
    let missing = dir.path().join("absent.json");
    let error = load_workspace(&missing).expect_err("file is missing");
    assert!(format!("{error:#}").contains("absent.json"));
    Ok(())
}

#[test]
fn faker_workspace_drives_a_grid_edit() -> Result<()> {
    let period = fixture_period();
    let views = CareFaker::new(5).demo_views(period, 12);
    let mut workspace = Workspace::from_import(RecordImport {
        settlement: views.settlement,
        status: views.status,
        urine: views.urine,
    })?;

    let view = GridView::MonthlySettlement;
    let mut grid = GridState::new(view, period);
    let key = RecordKey::int(3);
    let store = workspace.store_mut(view);
    grid.dispatch(
        store,
        GridCommand::Activate {
            record: key.clone(),
            field: "careLevel".to_owned(),
            day: None,
        },
    )?;
    grid.dispatch(store, GridCommand::SetDraft("要介護5".to_owned()))?;
    grid.dispatch(store, GridCommand::Commit)?;

    let record = workspace.store(view).get(&key).expect("row 3");
    assert_eq!(record.field("careLevel"), &CellValue::text("要介護5"));
    assert_eq!(workspace.store(view).revision(), 2);
    Ok(())
}

#[test]
fn export_rows_follows_the_filtered_order() -> Result<()> {
    let mut workspace = parse_workspace(SAMPLE)?;
    let view = GridView::MonthlySettlement;
    let mut grid = GridState::new(view, fixture_period());
    grid.dispatch(
        workspace.store_mut(view),
        GridCommand::SetNameFilter("佐藤".to_owned()),
    )?;

    let rows = grid.visible_rows(workspace.store(view));
    let json = export_rows(&rows)?;
    assert!(json.contains("r-2"));
    assert!(!json.contains("田中"));
    Ok(())
}
