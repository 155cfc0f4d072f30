// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::debug;

use crate::{CellValue, DayEntry, DayKey, DayValue, GridError, GridResult, Record, RecordKey};

/// In-memory row collection for one grid view.
///
/// Every successful mutation bumps `revision`, which is how readers notice
/// that a filtered projection built earlier is stale.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordStore {
    records: Vec<Record>,
    revision: u64,
}

impl RecordStore {
    pub fn new(records: Vec<Record>) -> GridResult<Self> {
        let mut store = Self::default();
        store.replace_all(records)?;
        Ok(store)
    }

    pub fn all(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub const fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, key: &RecordKey) -> Option<&Record> {
        self.records.iter().find(|record| &record.key == key)
    }

    pub fn day_entry(&self, key: &RecordKey, day: DayKey) -> GridResult<DayEntry<'_>> {
        self.get(key)
            .map(|record| record.day_entry(day))
            .ok_or_else(|| not_found(key))
    }

    /// Swaps in a new row set from the host. Keys must be unique.
    pub fn replace_all(&mut self, records: Vec<Record>) -> GridResult<()> {
        for (index, record) in records.iter().enumerate() {
            if records[..index].iter().any(|prior| prior.key == record.key) {
                return Err(GridError::DuplicateKey {
                    key: record.key.clone(),
                });
            }
        }
        self.records = records;
        self.bump();
        Ok(())
    }

    pub fn insert(&mut self, record: Record) -> GridResult<()> {
        if self.get(&record.key).is_some() {
            return Err(GridError::DuplicateKey { key: record.key });
        }
        debug!(key = %record.key, "record inserted");
        self.records.push(record);
        self.bump();
        Ok(())
    }

    pub fn remove(&mut self, key: &RecordKey) -> GridResult<Record> {
        let index = self.position(key)?;
        let removed = self.records.remove(index);
        debug!(%key, "record removed");
        self.bump();
        Ok(removed)
    }

    /// Replaces one fixed field. No schema check happens here.
    pub fn set_field(
        &mut self,
        key: &RecordKey,
        field: &str,
        value: CellValue,
    ) -> GridResult<&Record> {
        let index = self.position(key)?;
        debug!(%key, field, value = %value.display(), "field updated");
        self.records[index].fields.insert(field.to_owned(), value);
        self.bump();
        Ok(&self.records[index])
    }

    /// Writes one day cell. `DayValue::Blank` stores an explicit empty string.
    pub fn set_day(&mut self, key: &RecordKey, day: DayKey, value: DayValue) -> GridResult<&Record> {
        let index = self.position(key)?;
        let stored = value.into_stored();
        debug!(%key, %day, code = %stored, "day updated");
        self.records[index].daily_records.insert(day, stored);
        self.bump();
        Ok(&self.records[index])
    }

    fn position(&self, key: &RecordKey) -> GridResult<usize> {
        self.records
            .iter()
            .position(|record| &record.key == key)
            .ok_or_else(|| not_found(key))
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

fn not_found(key: &RecordKey) -> GridError {
    GridError::NotFound { key: key.clone() }
}
