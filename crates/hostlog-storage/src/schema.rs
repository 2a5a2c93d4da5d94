use crate::error::{Result, StorageError};
use chrono::{DateTime, SecondsFormat, Utc};
use hostlog_common::types::SchemaMode;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

pub(crate) const STRUCTURED_TABLE: &str = "system_logs";
pub(crate) const SCHEMALESS_TABLE: &str = "security_logs";

const STRUCTURED_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS system_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    cpu_percent REAL NOT NULL,
    memory_percent REAL NOT NULL,
    disk_percent REAL NOT NULL,
    open_ports TEXT NOT NULL DEFAULT '[]',
    running_services TEXT NOT NULL DEFAULT '[]',
    system_users TEXT NOT NULL DEFAULT '[]',
    recent_logins TEXT NOT NULL DEFAULT '[]',
    failed_logins INTEGER NOT NULL DEFAULT 0,
    network_connections TEXT NOT NULL DEFAULT '[]',
    suspicious_processes TEXT NOT NULL DEFAULT '[]'
);
CREATE INDEX IF NOT EXISTS idx_system_logs_time ON system_logs(timestamp);
";

const SCHEMALESS_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS security_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    log_data TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_security_logs_time ON security_logs(timestamp);
";

/// Where a `DATABASE_URL` points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteTarget {
    File(PathBuf),
    Memory,
}

impl SqliteTarget {
    /// Accepts a plain path, `sqlite://path`, `sqlite:path`, `file:path`,
    /// or `sqlite::memory:` / `:memory:`. Query parameters are rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use hostlog_storage::schema::SqliteTarget;
    /// use std::path::PathBuf;
    ///
    /// assert_eq!(
    ///     SqliteTarget::parse("sqlite://data/hostlog.db").unwrap(),
    ///     SqliteTarget::File(PathBuf::from("data/hostlog.db"))
    /// );
    /// assert_eq!(SqliteTarget::parse("sqlite::memory:").unwrap(), SqliteTarget::Memory);
    /// assert!(SqliteTarget::parse("postgres://localhost/logs").is_err());
    /// ```
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(StorageError::UnsupportedUrl(url.to_string()));
        }
        let rest = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .or_else(|| url.strip_prefix("file:"))
            .unwrap_or(url);
        if rest == ":memory:" {
            return Ok(SqliteTarget::Memory);
        }
        // connections are opened without URI parsing, so query parameters
        // would end up in the file name
        if rest.is_empty() || rest.contains("://") || rest.contains('?') {
            return Err(StorageError::UnsupportedUrl(url.to_string()));
        }
        Ok(SqliteTarget::File(PathBuf::from(rest)))
    }
}

pub(crate) fn open(target: &SqliteTarget) -> Result<Connection> {
    let conn = match target {
        SqliteTarget::Memory => Connection::open_in_memory()?,
        SqliteTarget::File(path) => open_file(path)?,
    };
    Ok(conn)
}

fn open_file(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    tracing::info!(path = %path.display(), "Opened SQLite log database");
    Ok(conn)
}

/// Creates the table and index for `mode` if they do not exist yet.
pub(crate) fn ensure(conn: &Connection, mode: SchemaMode) -> Result<()> {
    let ddl = match mode {
        SchemaMode::Structured => STRUCTURED_SCHEMA,
        SchemaMode::Schemaless => SCHEMALESS_SCHEMA,
    };
    conn.execute_batch(ddl)?;
    Ok(())
}

pub(crate) fn table_for(mode: SchemaMode) -> &'static str {
    match mode {
        SchemaMode::Structured => STRUCTURED_TABLE,
        SchemaMode::Schemaless => SCHEMALESS_TABLE,
    }
}

/// Fixed-width RFC 3339 so stored timestamps sort lexicographically.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| StorageError::InvalidTimestamp {
            column: "timestamp",
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_plain_paths_and_prefixes() {
        assert_eq!(
            SqliteTarget::parse("/var/lib/hostlog/logs.db").unwrap(),
            SqliteTarget::File(PathBuf::from("/var/lib/hostlog/logs.db"))
        );
        assert_eq!(
            SqliteTarget::parse("sqlite:logs.db").unwrap(),
            SqliteTarget::File(PathBuf::from("logs.db"))
        );
        assert_eq!(SqliteTarget::parse(":memory:").unwrap(), SqliteTarget::Memory);
    }

    #[test]
    fn rejects_foreign_schemes_and_empty_urls() {
        assert!(matches!(
            SqliteTarget::parse("postgres://user@localhost/logs"),
            Err(StorageError::UnsupportedUrl(_))
        ));
        assert!(SqliteTarget::parse("  ").is_err());
        assert!(SqliteTarget::parse("sqlite://").is_err());
    }

    #[test]
    fn rejects_query_parameters() {
        for url in ["file:logs.db?mode=rwc", "sqlite://data/logs.db?cache=shared"] {
            assert!(matches!(
                SqliteTarget::parse(url),
                Err(StorageError::UnsupportedUrl(_))
            ));
        }
        assert_eq!(
            SqliteTarget::parse("file:logs.db").unwrap(),
            SqliteTarget::File(PathBuf::from("logs.db"))
        );
    }

    #[test]
    fn timestamps_are_fixed_width() {
        let a = Utc.with_ymd_and_hms(2024, 7, 4, 10, 0, 0).unwrap();
        let b = a + chrono::Duration::milliseconds(500);
        let (fa, fb) = (format_timestamp(a), format_timestamp(b));
        assert_eq!(fa.len(), fb.len());
        assert!(fa < fb);
        assert_eq!(parse_timestamp(&fb).unwrap(), b);
    }

    #[test]
    fn creates_wal_database_in_missing_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("logs.db");
        let conn = open(&SqliteTarget::File(path.clone())).unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        assert!(path.exists());
    }
}
