use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Root configuration structure, deserialized from `.repo-depgraph/config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Analysis service settings (`serve`, `scan`).
    pub server: ServerConfig,
    /// Terminal client settings (`analyze`, `interactive`).
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP service listens on.
    pub bind: String,
    /// Where analysis results are saved and served from.
    pub output_dir: PathBuf,
    /// Parent directory for temporary clones. System temp dir when unset.
    pub clone_dir: Option<PathBuf>,
    /// Origins allowed by CORS.
    pub cors_origins: Vec<String>,
    /// Source text kept per component in responses, in characters.
    pub source_preview_chars: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            output_dir: PathBuf::from("./output"),
            clone_dir: None,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3001".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            source_preview_chars: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the analysis service.
    pub endpoint: String,
    /// Whole-request timeout; clones of large repositories are slow.
    pub timeout_secs: u64,
    /// Directory that exports are written to.
    pub export_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000".to_string(),
            timeout_secs: 300,
            export_dir: PathBuf::from("."),
        }
    }
}

/// Load configuration, searching in order:
///
/// 1. `config_override`, the path passed via `--config`
/// 2. `<base_dir>/.repo-depgraph/config.toml`
/// 3. `~/.config/repo-depgraph/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(base_dir: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let local_config = base_dir.join(".repo-depgraph").join("config.toml");
    if local_config.exists() {
        return read_config(&local_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home
            .join(".config")
            .join("repo-depgraph")
            .join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
}
