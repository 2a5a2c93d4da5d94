use crate::{command, Probe, Result};
use std::collections::BTreeSet;

/// Listening TCP/UDP ports, read from `netstat -tuln`.
#[derive(Default)]
pub struct OpenPortProbe;

impl OpenPortProbe {
    pub fn new() -> Self {
        Self
    }
}

impl Probe for OpenPortProbe {
    type Output = BTreeSet<u16>;

    fn name(&self) -> &'static str {
        "open_ports"
    }

    fn probe(&mut self) -> Result<BTreeSet<u16>> {
        let output = command::run("netstat", &["-tuln"])?;
        Ok(parse_listening_ports(&output))
    }
}

/// Extracts listening ports from `netstat` output.
///
/// Only lines containing `LISTEN` are considered. The port is the token after
/// the last `:` of the fourth whitespace-separated field (the local address),
/// so `0.0.0.0:22` and `[::]:22` both yield 22. Lines whose port does not
/// parse are skipped.
pub fn parse_listening_ports(output: &str) -> BTreeSet<u16> {
    output
        .lines()
        .filter(|line| line.contains("LISTEN"))
        .filter_map(|line| line.split_whitespace().nth(3))
        .filter_map(|addr| addr.rsplit(':').next())
        .filter_map(|port| port.parse().ok())
        .collect()
}
