use crate::cpu::CpuProbe;
use crate::disk::DiskProbe;
use crate::logins::{FailedLoginProbe, RecentLoginProbe};
use crate::memory::MemoryProbe;
use crate::network::ConnectionProbe;
use crate::ports::OpenPortProbe;
use crate::process::{KeywordMatcher, SuspiciousProcessProbe};
use crate::record::{CollectError, Field, RecordBuilder};
use crate::services::ServiceProbe;
use crate::users::UserProbe;
use crate::Probe;
use chrono::{DateTime, Duration, Utc};
use hostlog_common::types::{ConnectionDescriptor, SampleRecord};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Tunables for the system probes.
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    pub disk_mount: PathBuf,
    pub passwd_path: PathBuf,
    pub recent_logins_limit: usize,
    pub suspicious_keywords: Vec<String>,
    pub suspicious_limit: usize,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            disk_mount: PathBuf::from("/"),
            passwd_path: PathBuf::from("/etc/passwd"),
            recent_logins_limit: 10,
            suspicious_keywords: vec!["suspicious".to_string()],
            suspicious_limit: 50,
        }
    }
}

/// One probe per record field.
pub struct ProbeSet {
    pub cpu: Box<dyn Probe<Output = f64>>,
    pub memory: Box<dyn Probe<Output = f64>>,
    pub disk: Box<dyn Probe<Output = f64>>,
    pub open_ports: Box<dyn Probe<Output = BTreeSet<u16>>>,
    pub running_services: Box<dyn Probe<Output = Vec<String>>>,
    pub system_users: Box<dyn Probe<Output = BTreeSet<String>>>,
    pub recent_logins: Box<dyn Probe<Output = Vec<String>>>,
    pub failed_logins: Box<dyn Probe<Output = u32>>,
    pub network_connections: Box<dyn Probe<Output = Vec<ConnectionDescriptor>>>,
    pub suspicious_processes: Box<dyn Probe<Output = BTreeSet<String>>>,
}

impl ProbeSet {
    /// Probes backed by the local operating system.
    pub fn system(options: &ProbeOptions) -> Self {
        Self {
            cpu: Box::new(CpuProbe::new()),
            memory: Box::new(MemoryProbe::new()),
            disk: Box::new(DiskProbe::new(&options.disk_mount)),
            open_ports: Box::new(OpenPortProbe::new()),
            running_services: Box::new(ServiceProbe::new()),
            system_users: Box::new(UserProbe::new(&options.passwd_path)),
            recent_logins: Box::new(RecentLoginProbe::new(options.recent_logins_limit)),
            failed_logins: Box::new(FailedLoginProbe::new()),
            network_connections: Box::new(ConnectionProbe::new()),
            suspicious_processes: Box::new(SuspiciousProcessProbe::new(
                KeywordMatcher::new(&options.suspicious_keywords),
                options.suspicious_limit,
            )),
        }
    }
}

/// Runs every probe once per call and assembles the results into a record.
pub struct SampleCollector {
    probes: ProbeSet,
    last_timestamp: Option<DateTime<Utc>>,
}

impl SampleCollector {
    pub fn new(probes: ProbeSet) -> Self {
        Self {
            probes,
            last_timestamp: None,
        }
    }

    /// Takes one sample of every signal.
    ///
    /// # Errors
    ///
    /// Fails only when an essential probe (CPU, memory, disk) fails. Optional
    /// probe failures leave their field empty.
    pub fn collect(&mut self) -> Result<SampleRecord, CollectError> {
        let timestamp = self.next_timestamp();
        let mut builder = RecordBuilder::new(timestamp);
        let p = &mut self.probes;

        builder
            .set(Field::CpuPercent, run(p.cpu.as_mut()), |r, v| r.cpu_percent = v)
            .set(Field::MemoryPercent, run(p.memory.as_mut()), |r, v| {
                r.memory_percent = v
            })
            .set(Field::DiskPercent, run(p.disk.as_mut()), |r, v| r.disk_percent = v)
            .set(Field::OpenPorts, run(p.open_ports.as_mut()), |r, v| {
                r.open_ports = v
            })
            .set(Field::RunningServices, run(p.running_services.as_mut()), |r, v| {
                r.running_services = v
            })
            .set(Field::SystemUsers, run(p.system_users.as_mut()), |r, v| {
                r.system_users = v
            })
            .set(Field::RecentLogins, run(p.recent_logins.as_mut()), |r, v| {
                r.recent_logins = v
            })
            .set(Field::FailedLogins, run(p.failed_logins.as_mut()), |r, v| {
                r.failed_logins = v
            })
            .set(
                Field::NetworkConnections,
                run(p.network_connections.as_mut()),
                |r, v| r.network_connections = v,
            )
            .set(
                Field::SuspiciousProcesses,
                run(p.suspicious_processes.as_mut()),
                |r, v| r.suspicious_processes = v,
            );

        let failed = builder.failed_fields();
        let record = builder.build()?;
        tracing::debug!(
            timestamp = %record.timestamp,
            degraded = failed.len(),
            "Collected sample"
        );
        Ok(record)
    }

    /// Wall-clock time, nudged forward when the clock did not advance (or
    /// stepped back) so timestamps stay strictly increasing.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now
    }
}

fn run<T>(probe: &mut dyn Probe<Output = T>) -> crate::Result<T> {
    let result = probe.probe();
    if let Err(e) = &result {
        tracing::debug!(probe = probe.name(), error = %e, "Probe failed");
    }
    result
}
