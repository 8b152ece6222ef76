//! Configuration for the watchdog

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory tree to monitor
    pub watch_dir: PathBuf,

    /// Workspace root; `backup_<ts>` and `isolate_<ts>` are created under it
    pub base_dir: PathBuf,

    /// Extension allow-list; empty monitors every regular file
    #[serde(default)]
    pub extensions: ExtensionFilter,

    /// Alert receiver as `host:port`; `None` means local logging only
    #[serde(default)]
    pub api_endpoint: Option<String>,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Case-insensitive extension allow-list.
///
/// Every entry is normalized to lowercase with a leading dot, whatever the
/// input spelling. An empty filter accepts everything.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ExtensionFilter(Vec<String>);

impl ExtensionFilter {
    /// Parse a comma-separated list (`".php, JS"` becomes `[".php", ".js"]`).
    pub fn parse(spec: &str) -> Self {
        Self(spec.split(',').filter_map(normalize).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether `path` passes the filter. Files without an extension only
    /// pass when the filter is empty.
    pub fn matches(&self, path: &Path) -> bool {
        if self.0.is_empty() {
            return true;
        }

        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(e) => format!(".{}", e.to_ascii_lowercase()),
            None => return false,
        };

        self.0.iter().any(|allowed| *allowed == ext)
    }
}

// Deserialized entries go through the same normalization as CLI input.
impl<'de> Deserialize<'de> for ExtensionFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = Vec::<String>::deserialize(deserializer)?;
        Ok(Self(raw.iter().filter_map(|e| normalize(e)).collect()))
    }
}

fn normalize(ext: &str) -> Option<String> {
    let ext = ext.trim().to_ascii_lowercase();
    if ext.is_empty() {
        return None;
    }
    if ext.starts_with('.') {
        Some(ext)
    } else {
        Some(format!(".{ext}"))
    }
}
