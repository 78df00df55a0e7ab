// src/core/config.rs

use crate::constants::{CONFIG_ENV_VAR, CONFIG_FILENAME, DEFAULT_PROGRAM_NAME};
use crate::core::cache::FileCache;
use crate::core::entrypoint::{Entrypoint, EntrypointBuilder};
use log::debug;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Could not expand path '{path}': {source}")]
    Expand {
        path: String,
        #[source]
        source: shellexpand::LookupError<env::VarError>,
    },
    #[error("Could not find system cache directory.")]
    CacheDirNotFound,
}

/// The contents of `exo.toml`.
///
/// ```toml
/// name = "tool"
/// paths = ["~/.local/share/tool/commands", "$TOOL_HOME/commands"]
/// max_depth = 2
///
/// [cache]
/// expires_after_secs = 3600
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Program name shown in usage strings. Defaults to the executable's name.
    pub name: Option<String>,
    /// Search paths, in priority order. `~` and `$VARS` are expanded.
    pub paths: Vec<String>,
    pub max_depth: Option<i32>,
    pub module_metadata_filename: Option<String>,
    /// Enables the file cache for summaries and descriptors.
    pub cache: Option<CacheConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Defaults to `<cache dir>/<name>/cache.json`.
    pub path: Option<String>,
    /// Entries older than this are recomputed. No limit when unset.
    pub expires_after_secs: Option<u64>,
}

impl Config {
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("loading config from {}", path.display());
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content, path)
    }

    /// Loads the config from `explicit`, else `$EXO_CONFIG`, else the user's
    /// config directory. Only the last one may be missing, which yields the
    /// default config.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(path) = env::var_os(CONFIG_ENV_VAR).filter(|value| !value.is_empty()) {
            return Self::load(Path::new(&path));
        }
        match default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Turns the file settings into a builder, leaving everything the file
    /// does not mention at the builder's defaults.
    pub fn into_builder(self) -> Result<EntrypointBuilder, ConfigError> {
        let mut builder = Entrypoint::builder();

        let paths = self
            .paths
            .iter()
            .map(String::as_str)
            .map(expand)
            .collect::<Result<Vec<_>, _>>()?;
        builder = builder.paths(paths);

        if let Some(max_depth) = self.max_depth {
            builder = builder.max_depth(max_depth);
        }
        if let Some(filename) = self.module_metadata_filename {
            builder = builder.module_metadata_filename(filename);
        }

        if let Some(cache) = self.cache {
            let path = match &cache.path {
                Some(path) => expand(path)?,
                None => default_cache_path(self.name.as_deref().unwrap_or(DEFAULT_PROGRAM_NAME))?,
            };
            let mut file_cache = FileCache::new(path);
            if let Some(secs) = cache.expires_after_secs {
                file_cache = file_cache.expires_after(Duration::from_secs(secs));
            }
            debug!("caching in {}", file_cache.path().display());
            builder = builder.cache(Arc::new(file_cache));
        }

        if let Some(name) = self.name {
            builder = builder.name(name);
        }
        Ok(builder)
    }
}

/// `<config dir>/exo/exo.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(DEFAULT_PROGRAM_NAME).join(CONFIG_FILENAME))
}

fn default_cache_path(name: &str) -> Result<PathBuf, ConfigError> {
    dirs::cache_dir()
        .map(|dir| dir.join(name).join("cache.json"))
        .ok_or(ConfigError::CacheDirNotFound)
}

fn expand(path: &str) -> Result<PathBuf, ConfigError> {
    shellexpand::full(path)
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .map_err(|source| ConfigError::Expand {
            path: path.to_string(),
            source,
        })
}
