use crate::ProbeError;
use chrono::{DateTime, Utc};
use hostlog_common::types::SampleRecord;

/// Record fields, one per probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    CpuPercent,
    MemoryPercent,
    DiskPercent,
    OpenPorts,
    RunningServices,
    SystemUsers,
    RecentLogins,
    FailedLogins,
    NetworkConnections,
    SuspiciousProcesses,
}

impl Field {
    /// Essential fields invalidate the whole record when their probe fails.
    /// Only the resource usage percentages are essential.
    pub fn is_essential(self) -> bool {
        matches!(
            self,
            Field::CpuPercent | Field::MemoryPercent | Field::DiskPercent
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Field::CpuPercent => "cpu_percent",
            Field::MemoryPercent => "memory_percent",
            Field::DiskPercent => "disk_percent",
            Field::OpenPorts => "open_ports",
            Field::RunningServices => "running_services",
            Field::SystemUsers => "system_users",
            Field::RecentLogins => "recent_logins",
            Field::FailedLogins => "failed_logins",
            Field::NetworkConnections => "network_connections",
            Field::SuspiciousProcesses => "suspicious_processes",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a cycle produced no record.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("essential probe for {field} failed: {source}")]
    EssentialProbe {
        field: Field,
        #[source]
        source: ProbeError,
    },

    #[error("{field} out of range: {value}")]
    OutOfRange { field: Field, value: f64 },
}

/// Accumulates probe results for one cycle and applies the
/// essential/optional failure policy once, in [`RecordBuilder::build`].
///
/// Successful results are written into the record as they arrive. Failed
/// results leave the field at its zero value and are remembered together
/// with the field they belong to.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use hostlog_collector::{Field, ProbeError, RecordBuilder};
///
/// let mut builder = RecordBuilder::new(Utc::now());
/// builder.set(Field::CpuPercent, Ok(12.0), |r, v| r.cpu_percent = v);
/// builder.set(Field::MemoryPercent, Ok(40.0), |r, v| r.memory_percent = v);
/// builder.set(Field::DiskPercent, Ok(55.0), |r, v| r.disk_percent = v);
/// builder.set(
///     Field::FailedLogins,
///     Err(ProbeError::Unavailable("no auth log".into())),
///     |r, v| r.failed_logins = v,
/// );
/// let record = builder.build().unwrap();
/// assert_eq!(record.failed_logins, 0);
/// ```
pub struct RecordBuilder {
    record: SampleRecord,
    failures: Vec<(Field, ProbeError)>,
}

impl RecordBuilder {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            record: SampleRecord::new(timestamp, 0.0, 0.0, 0.0),
            failures: Vec::new(),
        }
    }

    /// Applies one probe result. `assign` is only called on success.
    pub fn set<T>(
        &mut self,
        field: Field,
        result: Result<T, ProbeError>,
        assign: impl FnOnce(&mut SampleRecord, T),
    ) -> &mut Self {
        match result {
            Ok(value) => assign(&mut self.record, value),
            Err(e) => self.failures.push((field, e)),
        }
        self
    }

    /// Fields whose probe failed so far, in the order they were applied.
    pub fn failed_fields(&self) -> Vec<Field> {
        self.failures.iter().map(|(field, _)| *field).collect()
    }

    /// Finishes the record.
    ///
    /// # Errors
    ///
    /// Returns the first essential probe failure, or
    /// [`CollectError::OutOfRange`] if a resource percentage is outside
    /// `[0, 100]`. Optional failures are logged and leave the field zeroed.
    pub fn build(self) -> Result<SampleRecord, CollectError> {
        let mut essential = None;
        for (field, error) in self.failures {
            if field.is_essential() {
                if essential.is_none() {
                    essential = Some((field, error));
                } else {
                    tracing::warn!(field = %field, error = %error, "Essential probe also failed");
                }
            } else {
                tracing::warn!(field = %field, error = %error, "Optional probe failed, field left empty");
            }
        }
        if let Some((field, source)) = essential {
            return Err(CollectError::EssentialProbe { field, source });
        }

        let record = self.record;
        for (field, value) in [
            (Field::CpuPercent, record.cpu_percent),
            (Field::MemoryPercent, record.memory_percent),
            (Field::DiskPercent, record.disk_percent),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(CollectError::OutOfRange { field, value });
            }
        }
        Ok(record)
    }
}
