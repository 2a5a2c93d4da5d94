//! Persistence for collected sample records.
//!
//! [`StorageBackend`] is a closed set of backends: a durable SQLite store
//! ([`engine::SqliteLogStore`]) and a non-durable in-memory list
//! ([`memory::MemoryLogStore`]) used when no database is configured.

pub mod engine;
pub mod error;
pub mod memory;
pub mod schema;


use engine::SqliteLogStore;
use error::Result;
use hostlog_common::types::{SampleRecord, SchemaMode};
use memory::MemoryLogStore;

/// A record read back from a backend, with the backend-assigned row id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredLog {
    pub id: i64,
    pub record: SampleRecord,
}

/// The storage backend a scheduler writes into.
///
/// The scheduler is the only writer and calls it strictly sequentially, so
/// none of the variants lock internally.
pub enum StorageBackend {
    Sqlite(SqliteLogStore),
    Memory(MemoryLogStore),
}

impl StorageBackend {
    /// Opens the durable backend for `url`, or the in-memory one when no URL
    /// is given.
    ///
    /// # Errors
    ///
    /// Fails if the URL is unsupported or the database cannot be opened.
    pub fn connect(url: Option<&str>, mode: SchemaMode, retention_days: u32) -> Result<Self> {
        match url {
            Some(url) => Ok(StorageBackend::Sqlite(
                SqliteLogStore::open(url, mode)?.with_retention(retention_days),
            )),
            None => Ok(StorageBackend::Memory(MemoryLogStore::new())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StorageBackend::Sqlite(_) => "sqlite",
            StorageBackend::Memory(_) => "memory",
        }
    }

    pub fn is_durable(&self) -> bool {
        matches!(self, StorageBackend::Sqlite(_))
    }

    /// Prepares the backend for writes. Idempotent; a no-op for the memory
    /// backend.
    pub fn ensure_schema(&mut self) -> Result<()> {
        match self {
            StorageBackend::Sqlite(store) => store.ensure_schema(),
            StorageBackend::Memory(_) => Ok(()),
        }
    }

    /// Persists one record. A failed write is not retried.
    pub fn insert_log(&mut self, record: &SampleRecord) -> Result<()> {
        let id = match self {
            StorageBackend::Sqlite(store) => store.insert_log(record)?,
            StorageBackend::Memory(store) => store.insert_log(record),
        };
        tracing::debug!(backend = self.kind(), id, "Stored log");
        Ok(())
    }

    /// Most recent records first.
    pub fn fetch_recent(&self, limit: usize) -> Result<Vec<StoredLog>> {
        match self {
            StorageBackend::Sqlite(store) => store.fetch_recent(limit),
            StorageBackend::Memory(store) => Ok(store.fetch_recent(limit)),
        }
    }

    /// Releases the backend after the last write.
    pub fn close(self) -> Result<()> {
        match self {
            StorageBackend::Sqlite(store) => store.close(),
            StorageBackend::Memory(store) => {
                tracing::info!(records = store.len(), "Discarding in-memory logs");
                Ok(())
            }
        }
    }
}
