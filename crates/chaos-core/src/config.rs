use crate::error::ChaosError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
/// Loaded from ~/.config/chaos-run/config.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "default_schedule_secs")]
    pub schedule_secs: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Deadline for a single destructive call. 0 disables it.
    #[serde(default = "default_member_timeout_secs")]
    pub member_timeout_secs: u64,
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub fate: FateConfig,
    #[serde(default)]
    pub infrastructure: Option<InfrastructureConfig>,
    #[serde(default)]
    pub reporter: ReporterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FateConfig {
    #[serde(default = "default_probability")]
    pub default_probability: f64,
    /// Per-group overrides of `default_probability`.
    #[serde(default)]
    pub probabilities: HashMap<String, f64>,
    /// When non-empty, only these groups are eligible.
    #[serde(default)]
    pub include_groups: Vec<String>,
    #[serde(default)]
    pub exclude_groups: Vec<String>,
}

impl Default for FateConfig {
    fn default() -> Self {
        Self {
            default_probability: default_probability(),
            probabilities: HashMap::new(),
            include_groups: Vec::new(),
            exclude_groups: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfrastructureConfig {
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    #[serde(default)]
    pub runtime: Option<ContainerRuntime>,
    /// Container label selecting the members, e.g. `chaos.enabled=true`.
    #[serde(default)]
    pub label: Option<String>,
    /// Container label whose value is used as the member group.
    #[serde(default)]
    pub group_label: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub key_path: Option<String>,
    #[serde(default)]
    pub hosts: Vec<HostConfig>,
    #[serde(default)]
    pub list_command: Option<String>,
    #[serde(default)]
    pub destroy_command: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    Ssh,
    Container,
    Command,
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderType::Ssh => write!(f, "ssh"),
            ProviderType::Container => write!(f, "container"),
            ProviderType::Command => write!(f, "command"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContainerRuntime {
    #[default]
    Docker,
    Podman,
}

impl std::fmt::Display for ContainerRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerRuntime::Docker => write!(f, "docker"),
            ContainerRuntime::Podman => write!(f, "podman"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostConfig {
    pub name: String,
    pub host: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReporterType {
    #[default]
    Log,
    Webhook,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReporterConfig {
    #[serde(rename = "type", default)]
    pub reporter_type: ReporterType,
    #[serde(default)]
    pub url: Option<String>,
}

fn default_schedule_secs() -> u64 {
    3600
}

fn default_max_concurrency() -> usize {
    8
}

fn default_member_timeout_secs() -> u64 {
    300
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_probability() -> f64 {
    0.2
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dry_run: false,
            schedule_secs: default_schedule_secs(),
            max_concurrency: default_max_concurrency(),
            member_timeout_secs: default_member_timeout_secs(),
            listen: default_listen(),
            base_url: default_base_url(),
            fate: FateConfig::default(),
            infrastructure: None,
            reporter: ReporterConfig::default(),
        }
    }
}

impl Config {
    /// Load config from the default path, or defaults if it does not exist.
    pub fn load_default() -> Result<Self, ChaosError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ChaosError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("chaos-run")
            .join("config.yaml")
    }

    pub fn validate(&self) -> Result<(), ChaosError> {
        if self.schedule_secs == 0 {
            return Err(ChaosError::Config("'schedule_secs' must be positive".into()));
        }
        if self.max_concurrency == 0 {
            return Err(ChaosError::Config("'max_concurrency' must be positive".into()));
        }
        if self.reporter.reporter_type == ReporterType::Webhook && self.reporter.url.is_none() {
            return Err(ChaosError::Config("Webhook reporter requires 'url'".into()));
        }
        Ok(())
    }

    pub fn schedule(&self) -> Duration {
        Duration::from_secs(self.schedule_secs)
    }

    pub fn member_timeout(&self) -> Option<Duration> {
        match self.member_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl InfrastructureConfig {
    /// Get the SSH port, falling back to 22.
    pub fn ssh_port(&self) -> u16 {
        self.port.unwrap_or(22)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert!(!config.dry_run);
        assert_eq!(config.schedule(), Duration::from_secs(3600));
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.member_timeout(), Some(Duration::from_secs(300)));
        assert_eq!(config.fate.default_probability, 0.2);
        assert_eq!(config.reporter.reporter_type, ReporterType::Log);
        assert!(config.infrastructure.is_none());
    }

    #[test]
    fn zero_timeout_disables_deadline() {
        let config: Config = serde_yaml::from_str("member_timeout_secs: 0").unwrap();
        assert_eq!(config.member_timeout(), None);
    }

    #[test]
    fn loads_full_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
dry_run: true
schedule_secs: 60
fate:
  default_probability: 0.5
  probabilities:
    db: 0.1
  exclude_groups: [router]
infrastructure:
  type: container
  runtime: podman
  label: chaos.enabled=true
reporter:
  type: webhook
  url: https://hooks.example.com/chaos
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert!(config.dry_run);
        assert_eq!(config.schedule_secs, 60);
        assert_eq!(config.fate.probabilities.get("db"), Some(&0.1));
        let infra = config.infrastructure.unwrap();
        assert_eq!(infra.provider_type, ProviderType::Container);
        assert_eq!(infra.runtime, Some(ContainerRuntime::Podman));
        assert_eq!(config.reporter.url.as_deref(), Some("https://hooks.example.com/chaos"));
    }

    #[test]
    fn webhook_without_url_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "reporter:\n  type: webhook\n").unwrap();
        assert!(Config::load_from(file.path()).is_err());
    }

    #[test]
    fn unreadable_or_malformed_files_keep_their_cause() {
        let missing = Config::load_from(Path::new("/nonexistent/chaos-run.yaml"));
        assert!(matches!(missing, Err(ChaosError::Io(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "schedule_secs: [not, a, number]\n").unwrap();
        assert!(matches!(Config::load_from(file.path()), Err(ChaosError::Yaml(_))));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let config = Config {
            max_concurrency: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ChaosError::Config(_))));
    }
}
