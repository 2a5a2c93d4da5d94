use crate::{Probe, ProbeError, Result};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Local accounts listed in a colon-delimited account file (`/etc/passwd`).
pub struct UserProbe {
    path: PathBuf,
}

impl UserProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Probe for UserProbe {
    type Output = BTreeSet<String>;

    fn name(&self) -> &'static str {
        "system_users"
    }

    fn probe(&mut self) -> Result<BTreeSet<String>> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| ProbeError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(parse_passwd(&content))
    }
}

/// Usernames (first field) from passwd-formatted text.
pub fn parse_passwd(content: &str) -> BTreeSet<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split(':').next())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_usernames_and_skips_comments() {
        let content = "\
# local accounts
root:x:0:0:root:/root:/bin/bash
daemon:x:1:1:daemon:/usr/sbin:/usr/sbin/nologin

alice:x:1000:1000:Alice,,,:/home/alice:/bin/zsh
";
        let users = parse_passwd(content);
        assert_eq!(
            users,
            BTreeSet::from(["alice".to_string(), "daemon".to_string(), "root".to_string()])
        );
    }

    #[test]
    fn reads_account_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "root:x:0:0::/root:/bin/sh").unwrap();
        let mut probe = UserProbe::new(file.path());
        assert_eq!(probe.probe().unwrap(), BTreeSet::from(["root".to_string()]));
    }

    #[test]
    fn missing_file_is_io_error() {
        let mut probe = UserProbe::new("/hostlog/missing/passwd");
        assert!(matches!(probe.probe(), Err(ProbeError::Io { .. })));
    }
}
