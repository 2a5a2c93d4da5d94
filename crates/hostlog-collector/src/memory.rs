use crate::{usage_percent, Probe, Result};
use sysinfo::System;

/// Physical memory in use, as a percentage of total.
pub struct MemoryProbe {
    system: System,
}

impl MemoryProbe {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for MemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for MemoryProbe {
    type Output = f64;

    fn name(&self) -> &'static str {
        "memory"
    }

    fn probe(&mut self) -> Result<f64> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        let used = self.system.used_memory();
        usage_percent(used, total, "memory")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_usage_is_a_percentage() {
        let mut probe = MemoryProbe::new();
        if let Ok(value) = probe.probe() {
            assert!((0.0..=100.0).contains(&value));
        }
    }
}
