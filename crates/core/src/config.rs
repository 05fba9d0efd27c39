use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_DIRECTORY_URL: &str = "https://www.googleapis.com/webfonts/v1/webfonts";
pub const DEFAULT_MANIFEST_URL: &str = "https://fonts.googleapis.com/css2";

/// Runtime settings for the bundling service.
///
/// Built from defaults, then an optional TOML file, then environment
/// variables; the CLI applies its own flags last.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Family directory service, queried once at startup.
    pub directory_url: String,
    /// Style manifest service, queried per resolution.
    pub manifest_url: String,
    pub api_key: Option<String>,
    pub cache_dir: Option<PathBuf>,
    /// Load the catalog from a local TOML file instead of the directory service.
    pub catalog_file: Option<PathBuf>,
    /// Cache fills in flight per request.
    pub parallelism: usize,
    /// Archive chunks buffered between the assembler and the response body.
    pub stream_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            directory_url: DEFAULT_DIRECTORY_URL.to_string(),
            manifest_url: DEFAULT_MANIFEST_URL.to_string(),
            api_key: None,
            cache_dir: None,
            catalog_file: None,
            parallelism: 4,
            stream_capacity: 8,
        }
    }
}

impl ServiceConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid service configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file {:?}", path))?;
        Self::from_toml_str(&content)
    }

    pub fn apply_env(self) -> Self {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Overrides settings from `FONTBUNDLE_API_KEY` and `FONTBUNDLE_CACHE`.
    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup("FONTBUNDLE_API_KEY").filter(|k| !k.is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(cache) = lookup("FONTBUNDLE_CACHE").filter(|c| !c.is_empty()) {
            self.cache_dir = Some(PathBuf::from(cache));
        }
        self
    }

    /// Configured cache directory, or `<platform cache dir>/fontbundle`.
    pub fn resolved_cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(dirs::cache_dir()
                .context("Could not find cache directory")?
                .join("fontbundle")),
        }
    }
}
