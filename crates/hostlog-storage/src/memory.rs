use crate::StoredLog;
use hostlog_common::types::SampleRecord;

/// Non-durable store that keeps every record in process memory.
///
/// Intended for local runs without a database; everything is lost when the
/// process exits and the list grows without bound.
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    logs: Vec<SampleRecord>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_log(&mut self, record: &SampleRecord) -> i64 {
        self.logs.push(record.clone());
        self.logs.len() as i64
    }

    /// All records in insertion order.
    pub fn records(&self) -> &[SampleRecord] {
        &self.logs
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    pub fn fetch_recent(&self, limit: usize) -> Vec<StoredLog> {
        self.logs
            .iter()
            .enumerate()
            .rev()
            .take(limit)
            .map(|(i, record)| StoredLog {
                id: i as i64 + 1,
                record: record.clone(),
            })
            .collect()
    }
}
