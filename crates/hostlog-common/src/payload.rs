//! JSON payload encoding for [`SampleRecord`].
//!
//! The same encoding is used for the per-cycle stdout line and for the
//! `log_data` column of the schemaless storage layout.

use crate::types::SampleRecord;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

/// Errors raised while decoding a stored or emitted payload.
///
/// # Examples
///
/// ```rust
/// use hostlog_common::payload::{decode, PayloadError};
///
/// let err = decode("{\"cpu_percent\": 1.0}").unwrap_err();
/// assert!(matches!(err, PayloadError::MissingField(_)));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("Payload: malformed JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Payload: expected a JSON object")]
    NotAnObject,

    #[error("Payload: missing field '{0}'")]
    MissingField(&'static str),

    #[error("Payload: invalid timestamp '{value}': {source}")]
    InvalidTimestamp {
        value: String,
        source: chrono::ParseError,
    },

    #[error("Payload: invalid field value: {0}")]
    InvalidField(#[source] serde_json::Error),

    #[error("Payload: encoding failed: {0}")]
    Encode(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PayloadError>;

const REQUIRED_FIELDS: [&str; 4] = ["timestamp", "cpu_percent", "memory_percent", "disk_percent"];

/// Encodes a record as a single-line JSON document.
pub fn encode(record: &SampleRecord) -> Result<String> {
    serde_json::to_string(record).map_err(PayloadError::Encode)
}

/// Decodes a record from JSON text.
pub fn decode(text: &str) -> Result<SampleRecord> {
    let value: Value = serde_json::from_str(text).map_err(PayloadError::Malformed)?;
    decode_value(value)
}

/// Decodes a record from an already parsed JSON value.
///
/// Only the timestamp and the essential resource metrics are required;
/// optional signals missing from older payloads decode to their zero value.
pub fn decode_value(mut value: Value) -> Result<SampleRecord> {
    let obj = value.as_object_mut().ok_or(PayloadError::NotAnObject)?;
    for field in REQUIRED_FIELDS {
        if !obj.contains_key(field) {
            return Err(PayloadError::MissingField(field));
        }
    }

    let raw_ts = obj
        .get("timestamp")
        .and_then(Value::as_str)
        .ok_or(PayloadError::MissingField("timestamp"))?
        .to_string();
    let timestamp = parse_timestamp(&raw_ts)?;

    let mut record = SampleRecord::new(
        timestamp,
        take_field(obj, "cpu_percent")?.unwrap_or_default(),
        take_field(obj, "memory_percent")?.unwrap_or_default(),
        take_field(obj, "disk_percent")?.unwrap_or_default(),
    );
    record.open_ports = take_field(obj, "open_ports")?.unwrap_or_default();
    record.running_services = take_field(obj, "running_services")?.unwrap_or_default();
    record.system_users = take_field(obj, "system_users")?.unwrap_or_default();
    record.recent_logins = take_field(obj, "recent_logins")?.unwrap_or_default();
    record.failed_logins = take_field(obj, "failed_logins")?.unwrap_or_default();
    record.network_connections = take_field(obj, "network_connections")?.unwrap_or_default();
    record.suspicious_processes = take_field(obj, "suspicious_processes")?.unwrap_or_default();
    Ok(record)
}

/// RFC 3339, or an ISO 8601 local time without offset, which is read as UTC.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Ok(ts.with_timezone(&Utc)),
        Err(rfc_err) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|_| PayloadError::InvalidTimestamp {
                value: raw.to_string(),
                source: rfc_err,
            }),
    }
}

fn take_field<T: serde::de::DeserializeOwned>(
    obj: &mut serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<T>> {
    match obj.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => serde_json::from_value(v)
            .map(Some)
            .map_err(PayloadError::InvalidField),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConnectionDescriptor;
    use chrono::TimeZone;

    fn full_record() -> SampleRecord {
        let ts = Utc.with_ymd_and_hms(2024, 7, 4, 10, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let mut record = SampleRecord::new(ts, 50.0, 60.5, 70.25);
        record.open_ports = [22, 80, 443].into_iter().collect();
        record.running_services = vec!["sshd.service".into(), "cron.service".into()];
        record.system_users = ["root".to_string(), "daemon".to_string()].into_iter().collect();
        record.recent_logins = vec!["alice pts/0 10.0.0.4 Thu Jul 4 09:58 still logged in".into()];
        record.failed_logins = 0;
        record.network_connections = vec![ConnectionDescriptor {
            protocol: "tcp".into(),
            local_addr: "127.0.0.1".into(),
            local_port: 5432,
            remote_addr: "127.0.0.1".into(),
            remote_port: 51544,
            state: "ESTABLISHED".into(),
        }];
        record.suspicious_processes = ["SuspiciousAgent".to_string()].into_iter().collect();
        record
    }

    #[test]
    fn payload_round_trip_preserves_every_field() {
        let record = full_record();
        let text = encode(&record).unwrap();
        assert!(!text.contains('\n'));
        assert_eq!(decode(&text).unwrap(), record);
    }

    #[test]
    fn decode_accepts_legacy_resource_only_payload() {
        let text = r#"{"timestamp": "2024-07-04T10:00:00", "cpu_percent": 50.0, "memory_percent": 60.0, "disk_percent": 70.0}"#;
        let record = decode(text).unwrap();
        assert_eq!(record.cpu_percent, 50.0);
        assert_eq!(record.disk_percent, 70.0);
        assert!(record.open_ports.is_empty());
        assert_eq!(record.failed_logins, 0);
    }

    #[test]
    fn decode_reads_timestamp_without_offset_as_utc() {
        let text = r#"{"timestamp": "2024-07-04T10:00:00", "cpu_percent": 50.0, "memory_percent": 60.0, "disk_percent": 70.0}"#;
        let record = decode(text).unwrap();
        assert_eq!(
            record.timestamp,
            Utc.with_ymd_and_hms(2024, 7, 4, 10, 0, 0).unwrap()
        );

        let text = r#"{"timestamp": "2024-07-04T10:00:00.250", "cpu_percent": 1, "memory_percent": 1, "disk_percent": 1}"#;
        assert_eq!(decode(text).unwrap().timestamp.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn decode_reports_bad_timestamp() {
        let text = r#"{"timestamp": "yesterday", "cpu_percent": 1, "memory_percent": 1, "disk_percent": 1}"#;
        assert!(matches!(
            decode(text),
            Err(PayloadError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn decode_rejects_non_object_and_garbage() {
        assert!(matches!(decode("[1, 2]"), Err(PayloadError::NotAnObject)));
        assert!(matches!(decode("{not json"), Err(PayloadError::Malformed(_))));
    }

    #[test]
    fn decode_rejects_wrong_field_type() {
        let text = r#"{"timestamp": "2024-07-04T10:00:00Z", "cpu_percent": 1, "memory_percent": 1, "disk_percent": 1, "open_ports": "22"}"#;
        assert!(matches!(decode(text), Err(PayloadError::InvalidField(_))));
    }
}
