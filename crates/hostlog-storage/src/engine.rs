use crate::error::Result;
use crate::schema::{self, SqliteTarget};
use crate::StoredLog;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use hostlog_common::payload;
use hostlog_common::types::{SampleRecord, SchemaMode};
use rusqlite::Connection;

/// Durable log store backed by a single SQLite database.
///
/// One row per record, either as discrete columns (`system_logs`) or as a
/// timestamp plus JSON payload (`security_logs`), depending on the
/// [`SchemaMode`] chosen at open time.
pub struct SqliteLogStore {
    conn: Connection,
    mode: SchemaMode,
    retention_days: u32,
    last_pruned: Option<NaiveDate>,
}

impl SqliteLogStore {
    pub fn open(url: &str, mode: SchemaMode) -> Result<Self> {
        let target = SqliteTarget::parse(url)?;
        Ok(Self {
            conn: schema::open(&target)?,
            mode,
            retention_days: 0,
            last_pruned: None,
        })
    }

    pub fn open_in_memory(mode: SchemaMode) -> Result<Self> {
        Self::open(":memory:", mode)
    }

    /// Keep only the last `days` days of rows; 0 keeps everything.
    pub fn with_retention(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    pub fn mode(&self) -> SchemaMode {
        self.mode
    }

    /// Creates the log table for the configured mode. Safe to call repeatedly.
    pub fn ensure_schema(&self) -> Result<()> {
        schema::ensure(&self.conn, self.mode)
    }

    /// Inserts one record and returns its row id.
    pub fn insert_log(&mut self, record: &SampleRecord) -> Result<i64> {
        let ts = schema::format_timestamp(record.timestamp);
        match self.mode {
            SchemaMode::Schemaless => {
                let log_data = payload::encode(record)?;
                let mut stmt = self.conn.prepare_cached(
                    "INSERT INTO security_logs (timestamp, log_data) VALUES (?1, ?2)",
                )?;
                stmt.execute(rusqlite::params![ts, log_data])?;
            }
            SchemaMode::Structured => {
                let mut stmt = self.conn.prepare_cached(
                    "INSERT INTO system_logs (timestamp, cpu_percent, memory_percent, disk_percent,
                        open_ports, running_services, system_users, recent_logins, failed_logins,
                        network_connections, suspicious_processes)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                )?;
                stmt.execute(rusqlite::params![
                    ts,
                    record.cpu_percent,
                    record.memory_percent,
                    record.disk_percent,
                    serde_json::to_string(&record.open_ports)?,
                    serde_json::to_string(&record.running_services)?,
                    serde_json::to_string(&record.system_users)?,
                    serde_json::to_string(&record.recent_logins)?,
                    record.failed_logins,
                    serde_json::to_string(&record.network_connections)?,
                    serde_json::to_string(&record.suspicious_processes)?,
                ])?;
            }
        }
        let id = self.conn.last_insert_rowid();
        self.prune_if_due(record.timestamp);
        Ok(id)
    }

    /// Most recent rows first, at most `limit` of them.
    pub fn fetch_recent(&self, limit: usize) -> Result<Vec<StoredLog>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        match self.mode {
            SchemaMode::Schemaless => self.fetch_schemaless(limit),
            SchemaMode::Structured => self.fetch_structured(limit),
        }
    }

    fn fetch_schemaless(&self, limit: i64) -> Result<Vec<StoredLog>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, log_data FROM security_logs ORDER BY id DESC LIMIT ?1")?;
        let rows = stmt.query_map([limit], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut logs = Vec::new();
        for row in rows {
            let (id, log_data) = row?;
            logs.push(StoredLog {
                id,
                record: payload::decode(&log_data)?,
            });
        }
        Ok(logs)
    }

    fn fetch_structured(&self, limit: i64) -> Result<Vec<StoredLog>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, timestamp, cpu_percent, memory_percent, disk_percent, open_ports,
                    running_services, system_users, recent_logins, failed_logins,
                    network_connections, suspicious_processes
             FROM system_logs ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit], |row| {
            Ok(StructuredRow {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                cpu_percent: row.get(2)?,
                memory_percent: row.get(3)?,
                disk_percent: row.get(4)?,
                open_ports: row.get(5)?,
                running_services: row.get(6)?,
                system_users: row.get(7)?,
                recent_logins: row.get(8)?,
                failed_logins: row.get(9)?,
                network_connections: row.get(10)?,
                suspicious_processes: row.get(11)?,
            })
        })?;

        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?.into_stored()?);
        }
        Ok(logs)
    }

    /// Deletes rows older than `cutoff`. Returns the number of rows removed.
    pub fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let sql = format!(
            "DELETE FROM {} WHERE timestamp < ?1",
            schema::table_for(self.mode)
        );
        let removed = self
            .conn
            .execute(&sql, [schema::format_timestamp(cutoff)])?;
        Ok(removed)
    }

    /// Retention runs at most once per calendar day and never fails the insert.
    fn prune_if_due(&mut self, now: DateTime<Utc>) {
        if self.retention_days == 0 {
            return;
        }
        let today = now.date_naive();
        if self.last_pruned == Some(today) {
            return;
        }
        self.last_pruned = Some(today);

        let cutoff = now - Duration::days(i64::from(self.retention_days));
        match self.prune_older_than(cutoff) {
            Ok(0) => {}
            Ok(removed) => {
                tracing::info!(removed, retention_days = self.retention_days, "Pruned expired logs")
            }
            Err(e) => tracing::warn!(error = %e, "Failed to prune expired logs"),
        }
    }

    /// Closes the connection, surfacing any error SQLite reports while
    /// finalising (e.g. a failed WAL checkpoint).
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| e.into())
    }
}

struct StructuredRow {
    id: i64,
    timestamp: String,
    cpu_percent: f64,
    memory_percent: f64,
    disk_percent: f64,
    open_ports: String,
    running_services: String,
    system_users: String,
    recent_logins: String,
    failed_logins: u32,
    network_connections: String,
    suspicious_processes: String,
}

impl StructuredRow {
    fn into_stored(self) -> Result<StoredLog> {
        let mut record = SampleRecord::new(
            schema::parse_timestamp(&self.timestamp)?,
            self.cpu_percent,
            self.memory_percent,
            self.disk_percent,
        );
        record.open_ports = serde_json::from_str(&self.open_ports)?;
        record.running_services = serde_json::from_str(&self.running_services)?;
        record.system_users = serde_json::from_str(&self.system_users)?;
        record.recent_logins = serde_json::from_str(&self.recent_logins)?;
        record.failed_logins = self.failed_logins;
        record.network_connections = serde_json::from_str(&self.network_connections)?;
        record.suspicious_processes = serde_json::from_str(&self.suspicious_processes)?;
        Ok(StoredLog {
            id: self.id,
            record,
        })
    }
}
