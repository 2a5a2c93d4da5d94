use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One observation of the host at a single point in time.
///
/// Records are assembled once per collection cycle and then only handed out
/// by shared reference, so they are never modified after assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    pub open_ports: BTreeSet<u16>,
    pub running_services: Vec<String>,
    pub system_users: BTreeSet<String>,
    pub recent_logins: Vec<String>,
    pub failed_logins: u32,
    pub network_connections: Vec<ConnectionDescriptor>,
    pub suspicious_processes: BTreeSet<String>,
}

impl SampleRecord {
    /// Creates a record carrying only the essential resource metrics. All
    /// optional signals start at their zero value.
    pub fn new(
        timestamp: DateTime<Utc>,
        cpu_percent: f64,
        memory_percent: f64,
        disk_percent: f64,
    ) -> Self {
        Self {
            timestamp,
            cpu_percent,
            memory_percent,
            disk_percent,
            open_ports: BTreeSet::new(),
            running_services: Vec::new(),
            system_users: BTreeSet::new(),
            recent_logins: Vec::new(),
            failed_logins: 0,
            network_connections: Vec::new(),
            suspicious_processes: BTreeSet::new(),
        }
    }
}

/// A single socket as reported by the OS network stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    /// `tcp`, `tcp6`, `udp` or `udp6`
    pub protocol: String,
    pub local_addr: String,
    pub local_port: u16,
    pub remote_addr: String,
    pub remote_port: u16,
    pub state: String,
}

/// How the durable backend lays out a record.
///
/// # Examples
///
/// ```
/// use hostlog_common::types::SchemaMode;
///
/// let mode: SchemaMode = "Structured".parse().unwrap();
/// assert_eq!(mode, SchemaMode::Structured);
/// assert_eq!(SchemaMode::default().to_string(), "schemaless");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaMode {
    /// Discrete typed columns, one per field.
    Structured,
    /// Timestamp plus a single JSON payload column.
    #[default]
    #[serde(alias = "json")]
    Schemaless,
}

impl std::fmt::Display for SchemaMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaMode::Structured => write!(f, "structured"),
            SchemaMode::Schemaless => write!(f, "schemaless"),
        }
    }
}

impl std::str::FromStr for SchemaMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "structured" => Ok(SchemaMode::Structured),
            "schemaless" | "json" => Ok(SchemaMode::Schemaless),
            _ => Err(format!("unknown schema mode: {s}")),
        }
    }
}
