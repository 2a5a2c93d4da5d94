use crate::{Probe, Result};
use std::collections::BTreeSet;
use sysinfo::{ProcessesToUpdate, System};

/// Case-insensitive substring matcher over process names.
///
/// This is a placeholder heuristic for flagging processes by name, not a
/// security control. An empty keyword list matches nothing.
///
/// # Examples
///
/// ```
/// use hostlog_collector::process::KeywordMatcher;
///
/// let matcher = KeywordMatcher::new(["suspicious"]);
/// assert!(matcher.matches("SuspiciousAgent"));
/// assert!(!matcher.matches("sshd"));
/// ```
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    keywords: Vec<String>,
}

impl KeywordMatcher {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.keywords.iter().any(|k| name.contains(k.as_str()))
    }

    /// Distinct matching names, capped at `limit` entries.
    pub fn filter<'a, I>(&self, names: I, limit: usize) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut matched = BTreeSet::new();
        for name in names {
            if matched.len() >= limit {
                break;
            }
            if self.matches(name) {
                matched.insert(name.to_string());
            }
        }
        matched
    }
}

/// Running processes whose name matches the configured keywords.
pub struct SuspiciousProcessProbe {
    system: System,
    matcher: KeywordMatcher,
    limit: usize,
}

impl SuspiciousProcessProbe {
    pub fn new(matcher: KeywordMatcher, limit: usize) -> Self {
        Self {
            system: System::new(),
            matcher,
            limit,
        }
    }
}

impl Probe for SuspiciousProcessProbe {
    type Output = BTreeSet<String>;

    fn name(&self) -> &'static str {
        "suspicious_processes"
    }

    fn probe(&mut self) -> Result<BTreeSet<String>> {
        self.system.refresh_processes(ProcessesToUpdate::All, true);
        let names: Vec<String> = self
            .system
            .processes()
            .values()
            .map(|p| p.name().to_string_lossy().into_owned())
            .collect();
        Ok(self.matcher.filter(names.iter().map(String::as_str), self.limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_is_case_insensitive() {
        let matcher = KeywordMatcher::new(["suspicious"]);
        assert!(matcher.matches("SuspiciousAgent"));
        assert!(matcher.matches("my-SUSPICIOUS-helper"));
        assert!(!matcher.matches("systemd"));
    }

    #[test]
    fn keywords_are_normalised() {
        let matcher = KeywordMatcher::new(["  Miner ", ""]);
        assert!(matcher.matches("xmrminer"));
        assert!(!KeywordMatcher::new(Vec::<String>::new()).matches("anything"));
    }

    #[test]
    fn filter_dedupes_and_caps() {
        let matcher = KeywordMatcher::new(["bad"]);
        let names = ["badproc", "badproc", "goodproc", "BadTwo", "bad3"];
        let all = matcher.filter(names, 10);
        assert_eq!(all.len(), 3);
        let capped = matcher.filter(names, 2);
        assert_eq!(capped.len(), 2);
    }
}
