/// Player configuration
use cadence_core::{CadenceError, Locale, Result};
use cadence_metadata::UnresolvedLinkPolicy;
use cadence_pipeline::ExternalTools;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File read when no `--config` is given, if present in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "cadence.toml";

/// Prefix of configuration environment variables (`CADENCE_LOCALE`, ...)
pub const ENV_PREFIX: &str = "CADENCE";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CadenceConfig {
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Most queries played from one command line
    #[serde(default = "default_max_playlist_size")]
    pub max_playlist_size: usize,

    #[serde(default)]
    pub tools: ExternalTools,

    #[serde(default)]
    pub resolver: ResolverSettings,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResolverSettings {
    #[serde(default)]
    pub unresolved_link: UnresolvedLinkPolicy,
}

impl CadenceConfig {
    /// Load configuration from file and environment
    ///
    /// Sources, lowest precedence first: built-in defaults, the TOML file at
    /// `path` (which must exist) or else `cadence.toml` if present, then
    /// `CADENCE_*` variables with `__` between nesting levels.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`load`](Self::load), reading variables from `env` instead of the
    /// process environment when given
    pub fn load_with_env(path: Option<&Path>, env: Option<config::Map<String, String>>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                settings = settings.add_source(config::File::from(path).required(true));
            }
            None => {
                let config_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if config_path.exists() {
                    tracing::debug!("Loading configuration from {}", config_path.display());
                    settings = settings.add_source(config::File::from(config_path));
                }
            }
        }

        // Override with environment variables (CADENCE_TOOLS__FETCHER__PROGRAM, ...)
        settings = settings.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config = settings
            .build()
            .map_err(|e| CadenceError::config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| CadenceError::config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_playlist_size == 0 {
            return Err(CadenceError::config(
                "max_playlist_size must be at least 1 (set CADENCE_MAX_PLAYLIST_SIZE)",
            ));
        }

        if self.tools.fetcher.is_blank() {
            return Err(CadenceError::config("tools.fetcher.program is empty"));
        }
        if self.tools.transcoder.is_blank() {
            return Err(CadenceError::config("tools.transcoder.program is empty"));
        }

        if Locale::parse(&self.locale).is_none() {
            tracing::warn!("No messages for locale {:?}; using English", self.locale);
        }

        Ok(())
    }
}

// Default values
fn default_locale() -> String {
    "en".to_string()
}

fn default_max_playlist_size() -> usize {
    10
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            max_playlist_size: default_max_playlist_size(),
            tools: ExternalTools::default(),
            resolver: ResolverSettings::default(),
        }
    }
}
