use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::repo::{RepoError, RepositoryQuery};

pub const CONFIG_FILE: &str = ".git-webrev.toml";
pub const DEFAULT_FETCH_BRANCH: &str = "WEBREV_FETCH_HEAD";
pub const DEFAULT_GENERATOR: &str = "webrev";
pub const DEFAULT_UPSTREAM_REF: &str = "origin/master";
pub const GENERATOR_ENV: &str = "GIT_WEBREV_GENERATOR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .git-webrev.toml.
/// Every field is optional; the tool works with no file at all.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub generate: GenerateConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpConfig {
    /// User-Agent sent with every request. Defaults to `git-webrev/<version>`.
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchConfig {
    /// Branch created by `fetch` when `--branch` is not given
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateConfig {
    /// Program that renders the webrev
    pub command: Option<String>,
    /// Comparison base when neither `--rev` nor `--no-outgoing` is given
    pub upstream_ref: Option<String>,
}

impl Config {
    /// Load configuration from .git-webrev.toml in the current directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(CONFIG_FILE);
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            Config::default()
        };

        if let Ok(command) = std::env::var(GENERATOR_ENV) {
            if !command.trim().is_empty() {
                config.generate.command = Some(command.trim().to_string());
            }
        }

        Ok(config)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn user_agent(&self) -> String {
        self.http
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("git-webrev/{}", env!("CARGO_PKG_VERSION")))
    }

    pub fn fetch_branch(&self) -> &str {
        self.fetch.branch.as_deref().unwrap_or(DEFAULT_FETCH_BRANCH)
    }

    pub fn generator(&self) -> &str {
        self.generate.command.as_deref().unwrap_or(DEFAULT_GENERATOR)
    }

    pub fn upstream_ref(&self) -> &str {
        self.generate
            .upstream_ref
            .as_deref()
            .unwrap_or(DEFAULT_UPSTREAM_REF)
    }
}

/// Values that would otherwise be read from global process state.
#[derive(Debug, Clone)]
pub struct ProcessDefaults {
    pub cwd: PathBuf,
    pub user_name: Option<String>,
}

impl ProcessDefaults {
    pub fn from_env() -> Result<Self, std::io::Error> {
        let cwd = std::env::current_dir()?;
        let user_name = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .ok()
            .filter(|name| !name.is_empty());
        Ok(Self { cwd, user_name })
    }
}

/// Look up a per-invocation setting: the command-line value if given,
/// otherwise `webrev.<name>` from the repository configuration when exactly
/// one value is set.
pub fn setting<R>(flag: Option<&str>, name: &str, repo: &R) -> Result<Option<String>, RepoError>
where
    R: RepositoryQuery + ?Sized,
{
    if let Some(value) = flag {
        return Ok(Some(value.to_string()));
    }

    let values = repo.config(&format!("webrev.{}", name))?;
    if let [value] = values.as_slice() {
        return Ok(Some(value.clone()));
    }
    Ok(None)
}
