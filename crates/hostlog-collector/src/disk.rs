use crate::{usage_percent, Probe, ProbeError, Result};
use std::path::{Path, PathBuf};
use sysinfo::Disks;

/// Used space of the filesystem mounted at a single mount point.
pub struct DiskProbe {
    disks: Disks,
    mount: PathBuf,
}

impl DiskProbe {
    pub fn new(mount: impl Into<PathBuf>) -> Self {
        Self {
            disks: Disks::new_with_refreshed_list(),
            mount: mount.into(),
        }
    }

    pub fn mount(&self) -> &Path {
        &self.mount
    }
}

impl Probe for DiskProbe {
    type Output = f64;

    fn name(&self) -> &'static str {
        "disk"
    }

    fn probe(&mut self) -> Result<f64> {
        self.disks.refresh();
        let disk = self
            .disks
            .iter()
            .find(|d| d.mount_point() == self.mount.as_path())
            .ok_or_else(|| {
                ProbeError::Unavailable(format!("no disk mounted at {}", self.mount.display()))
            })?;

        let total = disk.total_space();
        let used = total.saturating_sub(disk.available_space());
        usage_percent(used, total, "disk")
    }
}
