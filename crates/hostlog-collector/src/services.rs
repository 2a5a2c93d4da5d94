use crate::{command, Probe, ProbeError, Result};

/// Service units known to the platform service manager.
///
/// Linux uses `systemctl`, macOS uses `launchctl`. Any other platform is
/// reported as [`ProbeError::UnsupportedPlatform`].
pub struct ServiceProbe {
    os: &'static str,
}

impl ServiceProbe {
    pub fn new() -> Self {
        Self::for_os(std::env::consts::OS)
    }

    pub fn for_os(os: &'static str) -> Self {
        Self { os }
    }
}

impl Default for ServiceProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for ServiceProbe {
    type Output = Vec<String>;

    fn name(&self) -> &'static str {
        "running_services"
    }

    fn probe(&mut self) -> Result<Vec<String>> {
        match self.os {
            "linux" => {
                let output = command::run(
                    "systemctl",
                    &["list-units", "--type=service", "--no-legend", "--plain"],
                )?;
                Ok(parse_systemctl_units(&output))
            }
            "macos" => {
                let output = command::run("launchctl", &["list"])?;
                Ok(parse_launchctl_list(&output))
            }
            other => Err(ProbeError::UnsupportedPlatform(other)),
        }
    }
}

/// First column of `systemctl list-units --no-legend --plain`.
pub fn parse_systemctl_units(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Label column of `launchctl list`, skipping the `PID Status Label` header.
pub fn parse_launchctl_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !line.starts_with("PID"))
        .filter_map(|line| line.split_whitespace().nth(2))
        .map(str::to_string)
        .collect()
}
