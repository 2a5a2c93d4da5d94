use crate::{ProbeError, Result};
use std::process::{Command, Stdio};

/// Runs a platform utility to completion and returns its stdout.
///
/// A non-zero exit status is an error, mirroring what the probes expect from
/// a failed `netstat`/`systemctl`/`last` invocation.
pub(crate) fn run(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| ProbeError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(ProbeError::ExitStatus {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
