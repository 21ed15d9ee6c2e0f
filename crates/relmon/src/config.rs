//! Configuration for relmon.
//!
//! Loaded from `$XDG_CONFIG_HOME/relmon/config.toml` (falling back to
//! `~/.config/relmon/config.toml`), or from an explicit `--config` file.
//! Command-line flags override anything set here.
//!
//! Example config.toml:
//! ```toml
//! [service]
//! base_url = "https://release-monitoring.org/api/v2/"
//! token_file = "~/.config/relmon/anitya-token"
//! timeout_secs = 30
//!
//! [hosting]
//! github_token_file = "~/.config/relmon/github-token"
//! requests_per_second = 2.0
//! burst = 4
//! max_retries = 4
//!
//! [hosting.rates]
//! "api.github.com" = 1.0
//!
//! [match]
//! external_match = true
//! check_redirects = true
//! allow_duplicates = false
//! require_no_existing_package = false
//!
//! [create]
//! strip_prefixes = ["python-", "perl-"]
//! external_check = true
//! add_package = true
//!
//! [run]
//! distro = "NixOS"
//! delay_secs = 4.0
//! ```

use crate::error::{Error, Result};
use relmon_hosting::RetryPolicy;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://release-monitoring.org/api/v2/";

/// Tracking service settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// API base URL. Default: release-monitoring.org v2 API
    pub base_url: Option<String>,
    /// File holding the API token.
    pub token_file: Option<PathBuf>,
    /// Per-request timeout. Default: 30
    pub timeout_secs: Option<u64>,
}

impl ServiceConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(30))
    }
}

/// External site settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct HostingConfig {
    /// File holding a GitHub token, used to raise the API quota.
    pub github_token_file: Option<PathBuf>,
    /// Default request rate per host. Default: 2.0
    pub requests_per_second: Option<f64>,
    /// Default burst size per host. Default: 4
    pub burst: Option<u32>,
    /// Per-host request rates, overriding the default.
    pub rates: HashMap<String, f64>,
    /// Retries of a rate-limited request. Default: 4
    pub max_retries: Option<u32>,
}

impl HostingConfig {
    pub fn requests_per_second(&self) -> f64 {
        self.requests_per_second.unwrap_or(2.0)
    }

    pub fn burst(&self) -> u32 {
        self.burst.unwrap_or(4)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let mut policy = RetryPolicy::default();
        if let Some(max_retries) = self.max_retries {
            policy.max_retries = max_retries;
        }
        policy
    }
}

/// Matching behaviour.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MatchConfig {
    /// Contact other sites to look harder for a match. Default: true
    pub external_match: Option<bool>,
    /// Follow redirects of input URLs. Default: true
    pub check_redirects: Option<bool>,
    /// Report every candidate instead of refusing when several match. Default: false
    pub allow_duplicates: Option<bool>,
    /// Skip candidates that already package something for the distro. Default: false
    pub require_no_existing_package: Option<bool>,
}

impl MatchConfig {
    pub fn external_match(&self) -> bool {
        self.external_match.unwrap_or(true)
    }

    pub fn check_redirects(&self) -> bool {
        self.check_redirects.unwrap_or(true)
    }

    pub fn allow_duplicates(&self) -> bool {
        self.allow_duplicates.unwrap_or(false)
    }

    pub fn require_no_existing_package(&self) -> bool {
        self.require_no_existing_package.unwrap_or(false)
    }
}

/// Project creation settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CreateConfig {
    /// Prefixes stripped from project names; the first that matches wins.
    pub strip_prefixes: Vec<String>,
    /// Check that URLs are reachable before creating. Default: true
    pub external_check: Option<bool>,
    /// Add the distro package after creating the project. Default: true
    pub add_package: Option<bool>,
}

impl CreateConfig {
    pub fn external_check(&self) -> bool {
        self.external_check.unwrap_or(true)
    }

    pub fn add_package(&self) -> bool {
        self.add_package.unwrap_or(true)
    }
}

/// Run settings shared by all commands.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RunConfig {
    /// Distribution name packages are recorded under.
    pub distro: Option<String>,
    /// Delay between records, overriding each command's default.
    pub delay_secs: Option<f64>,
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub hosting: HostingConfig,
    #[serde(rename = "match")]
    pub matching: MatchConfig,
    pub create: CreateConfig,
    pub run: RunConfig,
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist and parse. The global file is optional,
    /// but a global file that fails to parse is still an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_file(&expand_tilde(path));
        }
        match Self::global_config_path() {
            Some(path) if path.is_file() => Self::load_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Get the global config path.
    fn global_config_path() -> Option<PathBuf> {
        let config_home = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))?;
        Some(config_home.join("relmon").join("config.toml"))
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}

/// Expand a leading `~` or `~/` to the home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Some(s) = path.to_str() else {
        return path.to_path_buf();
    };
    let rest = match s.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with('/') => &rest[1..],
        _ => return path.to_path_buf(),
    };
    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

/// Read a token file, trimming surrounding whitespace.
pub fn read_token(path: &Path) -> Result<String> {
    let path = expand_tilde(path);
    let token = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("token file {}: {}", path.display(), e)))?;
    let token = token.trim();
    if token.is_empty() {
        return Err(Error::Config(format!("token file {} is empty", path.display())));
    }
    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.service.timeout(), Duration::from_secs(30));
        assert!(config.matching.external_match());
        assert!(config.matching.check_redirects());
        assert!(!config.matching.allow_duplicates());
        assert!(config.create.add_package());
        assert_eq!(config.hosting.burst(), 4);
        assert_eq!(config.hosting.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_load_explicit_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[service]
base_url = "https://anitya.example/api/v2/"

[hosting]
max_retries = 1

[hosting.rates]
"api.github.com" = 0.5

[match]
external_match = false

[create]
strip_prefixes = ["python-", "perl-"]

[run]
distro = "NixOS"
delay_secs = 0.5
"#
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.service.base_url(), "https://anitya.example/api/v2/");
        assert_eq!(config.hosting.rates.get("api.github.com"), Some(&0.5));
        assert_eq!(config.hosting.retry_policy().max_retries, 1);
        assert!(!config.matching.external_match());
        assert!(config.matching.check_redirects());
        assert_eq!(config.create.strip_prefixes, vec!["python-", "perl-"]);
        assert_eq!(config.run.distro.as_deref(), Some("NixOS"));
        assert_eq!(config.run.delay_secs, Some(0.5));
    }

    #[test]
    fn test_load_missing_explicit_config_fails() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_invalid_config_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[match]\nexternal_match = \"yes please\"\n").unwrap();
        assert!(matches!(Config::load(Some(&path)), Err(Error::Config(_))));
    }

    #[test]
    fn test_read_token_trims() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "  secret\n").unwrap();
        assert_eq!(read_token(&path).unwrap(), "secret");

        std::fs::write(&path, "\n").unwrap();
        assert!(read_token(&path).is_err());
    }

    #[test]
    fn test_expand_tilde() {
        let plain = Path::new("/etc/relmon");
        assert_eq!(expand_tilde(plain), plain);
        assert_eq!(expand_tilde(Path::new("~user/x")), Path::new("~user/x"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde(Path::new("~/token")), home.join("token"));
            assert_eq!(expand_tilde(Path::new("~")), home);
        }
    }
}
