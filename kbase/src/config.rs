//! Configuration management for kbase
//!
//! Settings are assembled from, in increasing precedence:
//!
//! 1. built-in defaults
//! 2. `KBASE_*` environment variables
//! 3. a YAML file: an explicit path, else `.kbase/config.yaml` in the working
//!    directory, else `~/.kbase/config.yaml`
//!
//! The remote credential is only ever read from `KBASE_TOKEN`, never from a
//! file, and is handed to the backend when the store is built.

use crate::common::env_loader::{load_env_optional, EnvLoader};
use crate::error::{KbError, Result as KbResult};
use crate::store::{DocumentStore, HttpContentApi, LocalBackend, RemoteVersionedBackend, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Prefix of every configuration environment variable
pub const ENV_PREFIX: &str = "KBASE";
/// Environment variable holding the remote bearer token
pub const TOKEN_ENV: &str = "KBASE_TOKEN";
/// Directory holding the configuration file
pub const CONFIG_DIR: &str = ".kbase";
/// Configuration file name
pub const CONFIG_FILE: &str = "config.yaml";

const DEFAULT_API_URL: &str = "https://api.github.com";
const DEFAULT_BRANCH: &str = "main";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RECENT_DAYS: u32 = 7;
const DEFAULT_SEARCH_LIMIT: usize = 10;
const MAX_CONFLICT_RETRIES: u32 = 10;
/// Longest date window a journal listing, search or story pass may cover
pub const MAX_JOURNAL_DAYS: u32 = 366;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file from disk
    #[error("Failed to read configuration file {path}: {source}")]
    FileRead {
        /// Path to the configuration file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML content from a configuration file
    #[error("Invalid YAML syntax in {path}:\n{source}\n\nHint: Check for proper indentation and YAML formatting")]
    YamlParse {
        /// Path to the configuration file
        path: PathBuf,
        /// Underlying YAML parsing error
        #[source]
        source: serde_yaml::Error,
    },

    /// Invalid configuration value for a specific field
    #[error("Invalid configuration value for '{field}': {value}\n{hint}")]
    InvalidValue {
        /// Dotted field name
        field: String,
        /// The rejected value
        value: String,
        /// How to fix it
        hint: String,
    },
}

impl From<ConfigError> for KbError {
    fn from(e: ConfigError) -> Self {
        KbError::Config(e.to_string())
    }
}

/// Which document store to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Files under a local directory
    #[default]
    Local,
    /// A revision-tracked remote repository
    Remote,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Local => "local",
            Self::Remote => "remote",
        })
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            other => Err(format!("unknown backend '{other}', expected 'local' or 'remote'")),
        }
    }
}

/// Remote content API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the content API
    pub api_url: String,
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Branch documents are read from and committed to
    pub branch: String,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl RemoteConfig {
    /// Request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            owner: String::new(),
            repo: String::new(),
            branch: DEFAULT_BRANCH.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Write behaviour
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteConfig {
    /// Retries after a write conflict; 0 reports the first conflict
    pub max_conflict_retries: u32,
}

/// Journal defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Days covered by a recency listing when none is given
    pub recent_days: u32,
    /// Search hits returned when no limit is given
    pub search_limit: usize,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            recent_days: DEFAULT_RECENT_DAYS,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

/// Complete kbase configuration
#[derive(Clone, PartialEq, Serialize)]
pub struct KbConfig {
    /// Selected backend
    pub backend: BackendKind,
    /// Root directory of the local backend
    pub root: PathBuf,
    /// Remote backend settings
    pub remote: RemoteConfig,
    /// Write behaviour
    pub write: WriteConfig,
    /// Journal defaults
    pub journal: JournalConfig,
    /// Bearer token for the remote backend
    #[serde(skip)]
    pub token: Option<String>,
}

impl fmt::Debug for KbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KbConfig")
            .field("backend", &self.backend)
            .field("root", &self.root)
            .field("remote", &self.remote)
            .field("write", &self.write)
            .field("journal", &self.journal)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for KbConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            root: default_root(),
            remote: RemoteConfig::default(),
            write: WriteConfig::default(),
            journal: JournalConfig::default(),
            token: None,
        }
    }
}

/// `~/knowledge-base`, or `knowledge-base` in the working directory when
/// there is no home directory
pub fn default_root() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join("knowledge-base"))
        .unwrap_or_else(|| PathBuf::from("knowledge-base"))
}

impl KbConfig {
    /// Load configuration from defaults, environment and the YAML file.
    ///
    /// An explicit `path` must exist; otherwise the search locations are
    /// tried and a missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_vars();

        let file = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config_file(),
        };
        match file {
            Some(file) => YamlConfig::load_from_file(&file)?.apply_to_config(&mut config),
            None => tracing::debug!("No configuration file found, using environment and defaults"),
        }

        config.token = load_env_optional::<String>(TOKEN_ENV);
        config.validate()?;
        Ok(config)
    }

    /// Apply `KBASE_*` environment variables
    fn apply_env_vars(&mut self) {
        let loader = EnvLoader::new(ENV_PREFIX);

        self.backend = loader.load_parsed("BACKEND", self.backend);
        if let Some(root) = loader.load_optional::<String>("ROOT") {
            self.root = PathBuf::from(root);
        }
        self.remote.api_url = loader.load_string("REMOTE_API_URL", &self.remote.api_url);
        self.remote.owner = loader.load_string("REMOTE_OWNER", &self.remote.owner);
        self.remote.repo = loader.load_string("REMOTE_REPO", &self.remote.repo);
        self.remote.branch = loader.load_string("REMOTE_BRANCH", &self.remote.branch);
        self.remote.timeout_secs =
            loader.load_parsed("REMOTE_TIMEOUT_SECS", self.remote.timeout_secs);
        self.write.max_conflict_retries =
            loader.load_parsed("MAX_CONFLICT_RETRIES", self.write.max_conflict_retries);
        self.journal.recent_days = loader.load_parsed("JOURNAL_RECENT_DAYS", self.journal.recent_days);
        self.journal.search_limit =
            loader.load_parsed("JOURNAL_SEARCH_LIMIT", self.journal.search_limit);
    }

    /// First existing configuration file among the search locations
    pub fn find_config_file() -> Option<PathBuf> {
        let mut candidates = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            candidates.push(cwd.join(CONFIG_DIR).join(CONFIG_FILE));
        }
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(CONFIG_DIR).join(CONFIG_FILE));
        }

        let found = candidates.into_iter().find(|path| path.is_file());
        if let Some(path) = &found {
            tracing::debug!("Found configuration file: {:?}", path);
        }
        found
    }

    /// Check that the settings are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, value: String, hint: &str| ConfigError::InvalidValue {
            field: field.to_string(),
            value,
            hint: hint.to_string(),
        };

        if self.backend == BackendKind::Local && self.root.as_os_str().is_empty() {
            return Err(invalid("root", String::new(), "Set KBASE_ROOT or 'root' to a directory"));
        }

        if self.backend == BackendKind::Remote {
            if self.remote.owner.trim().is_empty() {
                return Err(invalid(
                    "remote.owner",
                    self.remote.owner.clone(),
                    "The remote backend needs a repository owner (KBASE_REMOTE_OWNER)",
                ));
            }
            if self.remote.repo.trim().is_empty() {
                return Err(invalid(
                    "remote.repo",
                    self.remote.repo.clone(),
                    "The remote backend needs a repository name (KBASE_REMOTE_REPO)",
                ));
            }
            if let Err(e) = reqwest::Url::parse(&self.remote.api_url) {
                return Err(invalid(
                    "remote.api_url",
                    self.remote.api_url.clone(),
                    &format!("Must be an absolute URL: {e}"),
                ));
            }
        }

        if self.remote.branch.trim().is_empty() {
            return Err(invalid("remote.branch", self.remote.branch.clone(), "Branch cannot be empty"));
        }
        if self.remote.timeout_secs == 0 {
            return Err(invalid("remote.timeout_secs", "0".to_string(), "Timeout must be at least 1 second"));
        }
        if self.write.max_conflict_retries > MAX_CONFLICT_RETRIES {
            return Err(invalid(
                "write.max_conflict_retries",
                self.write.max_conflict_retries.to_string(),
                &format!("At most {MAX_CONFLICT_RETRIES} retries are allowed"),
            ));
        }
        if self.journal.recent_days == 0 || self.journal.recent_days > MAX_JOURNAL_DAYS {
            return Err(invalid(
                "journal.recent_days",
                self.journal.recent_days.to_string(),
                &format!("Must be between 1 and {MAX_JOURNAL_DAYS}"),
            ));
        }
        if self.journal.search_limit == 0 {
            return Err(invalid("journal.search_limit", "0".to_string(), "Must be at least 1"));
        }
        Ok(())
    }

    /// Conflict retry policy for the update engine
    pub fn retry_policy(&self) -> RetryPolicy {
        match self.write.max_conflict_retries {
            0 => RetryPolicy::none(),
            n => RetryPolicy::retries(n),
        }
    }

    /// Construct the configured document store
    pub fn build_store(&self) -> KbResult<Arc<dyn DocumentStore>> {
        match self.backend {
            BackendKind::Local => {
                tracing::debug!("Using local backend at {:?}", self.root);
                Ok(Arc::new(LocalBackend::new(self.root.clone())))
            }
            BackendKind::Remote => {
                tracing::debug!(
                    "Using remote backend {}/{}@{}",
                    self.remote.owner,
                    self.remote.repo,
                    self.remote.branch
                );
                if self.token.is_none() {
                    tracing::warn!("{} is not set; remote writes will be rejected", TOKEN_ENV);
                }
                let api = HttpContentApi::new(self.remote.clone(), self.token.clone())?;
                Ok(Arc::new(RemoteVersionedBackend::new(Arc::new(api))))
            }
        }
    }
}

/// Sparse configuration as written in the YAML file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YamlConfig {
    pub backend: Option<BackendKind>,
    pub root: Option<PathBuf>,
    #[serde(default)]
    pub remote: YamlRemote,
    #[serde(default)]
    pub write: YamlWrite,
    #[serde(default)]
    pub journal: YamlJournal,
}

/// `remote:` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YamlRemote {
    pub api_url: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub branch: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// `write:` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YamlWrite {
    pub max_conflict_retries: Option<u32>,
}

/// `journal:` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YamlJournal {
    pub recent_days: Option<u32>,
    pub search_limit: Option<usize>,
}

impl YamlConfig {
    /// Load YAML configuration from a file path
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        tracing::info!("Loading YAML configuration from: {:?}", path);

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(path, &content)
    }

    fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        // An empty file is valid and changes nothing.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| ConfigError::YamlParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Overlay the values present in the file onto `config`
    pub fn apply_to_config(&self, config: &mut KbConfig) {
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(root) = &self.root {
            config.root = root.clone();
        }

        let remote = &self.remote;
        if let Some(api_url) = &remote.api_url {
            config.remote.api_url = api_url.clone();
        }
        if let Some(owner) = &remote.owner {
            config.remote.owner = owner.clone();
        }
        if let Some(repo) = &remote.repo {
            config.remote.repo = repo.clone();
        }
        if let Some(branch) = &remote.branch {
            config.remote.branch = branch.clone();
        }
        if let Some(timeout) = remote.timeout_secs {
            config.remote.timeout_secs = timeout;
        }

        if let Some(retries) = self.write.max_conflict_retries {
            config.write.max_conflict_retries = retries;
        }
        if let Some(days) = self.journal.recent_days {
            config.journal.recent_days = days;
        }
        if let Some(limit) = self.journal.search_limit {
            config.journal.search_limit = limit;
        }
    }
}
