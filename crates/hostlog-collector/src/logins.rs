use crate::{command, Probe, Result};

/// The most recent login sessions, as reported by `last`.
pub struct RecentLoginProbe {
    limit: usize,
}

impl RecentLoginProbe {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }
}

impl Probe for RecentLoginProbe {
    type Output = Vec<String>;

    fn name(&self) -> &'static str {
        "recent_logins"
    }

    fn probe(&mut self) -> Result<Vec<String>> {
        let limit = self.limit.to_string();
        let output = command::run("last", &["-n", &limit])?;
        Ok(parse_last(&output, self.limit))
    }
}

/// Session lines from `last` output, newest first, at most `limit` of them.
/// Blank lines and the trailing `wtmp begins ...` banner are dropped.
pub fn parse_last(output: &str, limit: usize) -> Vec<String> {
    output
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !line.starts_with("wtmp begins") && !line.starts_with("btmp begins"))
        .take(limit)
        .map(str::to_string)
        .collect()
}

/// Failed login attempts.
///
/// Placeholder signal: always reports 0. Counting real failures needs a
/// platform-specific auth log reader, which this probe is the extension
/// point for.
#[derive(Default)]
pub struct FailedLoginProbe;

impl FailedLoginProbe {
    pub fn new() -> Self {
        Self
    }
}

impl Probe for FailedLoginProbe {
    type Output = u32;

    fn name(&self) -> &'static str {
        "failed_logins"
    }

    fn probe(&mut self) -> Result<u32> {
        Ok(0)
    }
}
