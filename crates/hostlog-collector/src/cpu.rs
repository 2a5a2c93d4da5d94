use crate::{clamp_percent, Probe, ProbeError, Result};
use sysinfo::System;

/// Global CPU usage across all cores.
///
/// `sysinfo` computes usage as the delta between two refreshes, so the probe
/// primes itself on construction and every sample covers the time since the
/// previous one.
pub struct CpuProbe {
    system: System,
}

impl CpuProbe {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_all();
        Self { system }
    }
}

impl Default for CpuProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for CpuProbe {
    type Output = f64;

    fn name(&self) -> &'static str {
        "cpu"
    }

    fn probe(&mut self) -> Result<f64> {
        self.system.refresh_cpu_all();
        if self.system.cpus().is_empty() {
            return Err(ProbeError::Unavailable("no CPUs reported".to_string()));
        }
        clamp_percent(f64::from(self.system.global_cpu_usage()), "cpu")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_usage_is_a_percentage() {
        let mut probe = CpuProbe::new();
        if let Ok(value) = probe.probe() {
            assert!((0.0..=100.0).contains(&value));
        }
    }
}
