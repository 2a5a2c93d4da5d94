use anyhow::{bail, Context};
use hostlog_collector::ProbeOptions;
use hostlog_common::types::SchemaMode;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/agent.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// SQLite target; unset selects the in-memory backend
    #[serde(default)]
    pub database_url: Option<String>,
    /// Refuse to start without `database_url` instead of falling back to memory
    #[serde(default)]
    pub require_database: bool,
    #[serde(default)]
    pub schema_mode: SchemaMode,
    #[serde(default = "default_collection_interval")]
    pub collection_interval_secs: u64,
    /// Days of history kept in the database, 0 = forever
    #[serde(default)]
    pub retention_days: u32,
    #[serde(default = "default_disk_mount")]
    pub disk_mount: PathBuf,
    #[serde(default = "default_passwd_path")]
    pub passwd_path: PathBuf,
    #[serde(default = "default_recent_logins_limit")]
    pub recent_logins_limit: usize,
    #[serde(default = "default_suspicious_keywords")]
    pub suspicious_keywords: Vec<String>,
    #[serde(default = "default_suspicious_limit")]
    pub suspicious_limit: usize,
}

fn default_collection_interval() -> u64 {
    300
}

fn default_disk_mount() -> PathBuf {
    PathBuf::from("/")
}

fn default_passwd_path() -> PathBuf {
    PathBuf::from("/etc/passwd")
}

fn default_recent_logins_limit() -> usize {
    10
}

fn default_suspicious_keywords() -> Vec<String> {
    vec!["suspicious".to_string()]
}

fn default_suspicious_limit() -> usize {
    50
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            require_database: false,
            schema_mode: SchemaMode::default(),
            collection_interval_secs: default_collection_interval(),
            retention_days: 0,
            disk_mount: default_disk_mount(),
            passwd_path: default_passwd_path(),
            recent_logins_limit: default_recent_logins_limit(),
            suspicious_keywords: default_suspicious_keywords(),
            suspicious_limit: default_suspicious_limit(),
        }
    }
}

impl AgentConfig {
    /// Loads the TOML config file. An explicitly named file must exist; the
    /// default path is optional and falls back to built-in defaults.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        Self::load_or_default(path.map(Path::new), Path::new(DEFAULT_CONFIG_PATH))
    }

    fn load_or_default(path: Option<&Path>, default_path: &Path) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if default_path.exists() => Self::from_file(default_path),
            None => Ok(Self::default()),
        }
    }

    fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Applies environment overrides. Empty values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(v) = get("HOSTLOG_REQUIRE_DATABASE") {
            self.require_database = parse_bool(&v)
                .with_context(|| format!("HOSTLOG_REQUIRE_DATABASE: invalid value '{v}'"))?;
        }
        if let Some(v) = get("HOSTLOG_SCHEMA_MODE") {
            self.schema_mode = v
                .parse()
                .map_err(|e: String| anyhow::anyhow!("HOSTLOG_SCHEMA_MODE: {e}"))?;
        }
        if let Some(v) = get("HOSTLOG_INTERVAL_SECS") {
            self.collection_interval_secs = v
                .trim()
                .parse()
                .with_context(|| format!("HOSTLOG_INTERVAL_SECS: invalid value '{v}'"))?;
        }
        if let Some(v) = get("HOSTLOG_RETENTION_DAYS") {
            self.retention_days = v
                .trim()
                .parse()
                .with_context(|| format!("HOSTLOG_RETENTION_DAYS: invalid value '{v}'"))?;
        }
        Ok(())
    }

    /// Rejects configurations the agent cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.collection_interval_secs == 0 {
            bail!("collection_interval_secs must be greater than 0");
        }
        if self.require_database && self.database_url.is_none() {
            bail!("DATABASE_URL is not set and require_database is enabled");
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.collection_interval_secs)
    }

    pub fn probe_options(&self) -> ProbeOptions {
        ProbeOptions {
            disk_mount: self.disk_mount.clone(),
            passwd_path: self.passwd_path.clone(),
            recent_logins_limit: self.recent_logins_limit,
            suspicious_keywords: self.suspicious_keywords.clone(),
            suspicious_limit: self.suspicious_limit,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config: AgentConfig = toml::from_str("").unwrap();
        assert_eq!(config.collection_interval_secs, 300);
        assert_eq!(config.schema_mode, SchemaMode::Schemaless);
        assert_eq!(config.suspicious_keywords, vec!["suspicious"]);
        assert!(config.database_url.is_none());
        assert_eq!(config.interval(), Duration::from_secs(300));
    }

    #[test]
    fn toml_overrides_fields() {
        let config: AgentConfig = toml::from_str(
            r#"
            database_url = "sqlite://data/hostlog.db"
            schema_mode = "structured"
            collection_interval_secs = 60
            suspicious_keywords = ["miner", "suspicious"]
            "#,
        )
        .unwrap();
        assert_eq!(config.schema_mode, SchemaMode::Structured);
        assert_eq!(config.collection_interval_secs, 60);
        assert_eq!(config.probe_options().suspicious_keywords.len(), 2);
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = AgentConfig::default();
        config
            .apply_env(env(&[
                ("DATABASE_URL", "sqlite:///tmp/hostlog.db"),
                ("HOSTLOG_SCHEMA_MODE", "structured"),
                ("HOSTLOG_INTERVAL_SECS", "30"),
                ("HOSTLOG_REQUIRE_DATABASE", "true"),
                ("HOSTLOG_RETENTION_DAYS", "14"),
            ]))
            .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("sqlite:///tmp/hostlog.db"));
        assert_eq!(config.schema_mode, SchemaMode::Structured);
        assert_eq!(config.collection_interval_secs, 30);
        assert!(config.require_database);
        assert_eq!(config.retention_days, 14);
        config.validate().unwrap();
    }

    #[test]
    fn empty_database_url_counts_as_unset() {
        let mut config = AgentConfig::default();
        config.apply_env(env(&[("DATABASE_URL", "")])).unwrap();
        assert!(config.database_url.is_none());
    }

    #[test]
    fn invalid_env_values_are_errors() {
        let mut config = AgentConfig::default();
        assert!(config
            .apply_env(env(&[("HOSTLOG_INTERVAL_SECS", "soon")]))
            .is_err());
        assert!(config
            .apply_env(env(&[("HOSTLOG_SCHEMA_MODE", "columnar")]))
            .is_err());
        assert!(config
            .apply_env(env(&[("HOSTLOG_REQUIRE_DATABASE", "maybe")]))
            .is_err());
    }

    #[test]
    fn strict_mode_requires_database_url() {
        let config = AgentConfig {
            require_database: true,
            ..AgentConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = AgentConfig {
            collection_interval_secs: 0,
            ..AgentConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        assert!(AgentConfig::load(Some("/hostlog/missing/agent.toml")).is_err());
    }

    #[test]
    fn json_alias_is_accepted_in_file_and_env() {
        let config: AgentConfig = toml::from_str("schema_mode = \"json\"").unwrap();
        assert_eq!(config.schema_mode, SchemaMode::Schemaless);

        let mut config = AgentConfig {
            schema_mode: SchemaMode::Structured,
            ..AgentConfig::default()
        };
        config
            .apply_env(env(&[("HOSTLOG_SCHEMA_MODE", "json")]))
            .unwrap();
        assert_eq!(config.schema_mode, SchemaMode::Schemaless);
    }

    #[test]
    fn missing_default_file_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let default_path = dir.path().join("agent.toml");
        let config = AgentConfig::load_or_default(None, &default_path).unwrap();
        assert_eq!(config.collection_interval_secs, 300);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn present_default_file_is_loaded() {
        let dir = tempfile::TempDir::new().unwrap();
        let default_path = dir.path().join("agent.toml");
        std::fs::write(&default_path, "schema_mode = \"structured\"\n").unwrap();
        let config = AgentConfig::load_or_default(None, &default_path).unwrap();
        assert_eq!(config.schema_mode, SchemaMode::Structured);
    }

    #[test]
    fn loads_named_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("agent.toml");
        std::fs::write(&path, "collection_interval_secs = 90\nretention_days = 3\n").unwrap();
        let config = AgentConfig::load(path.to_str()).unwrap();
        assert_eq!(config.collection_interval_secs, 90);
        assert_eq!(config.retention_days, 3);
    }
}
