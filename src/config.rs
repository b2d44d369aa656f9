use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::client::DEFAULT_API_BASE;
use crate::pipeline::PipelineOptions;

pub const DEFAULT_CONFIG_FILENAME: &str = "docuglot.toml";
pub const CONFIG_ENV_VAR: &str = "DOCUGLOT_CONFIG";

const DEFAULT_MODEL: &str = "gemini-pro";
const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub client: ClientSection,
    #[serde(default)]
    pub chunking: ChunkingSection,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ClientSection {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    /// Name of the environment variable holding the API key. The key itself
    /// never lives in the config file.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ChunkingSection {
    #[serde(default)]
    pub docx_token_budget: Option<usize>,
    #[serde(default)]
    pub xlsx_token_budget: Option<usize>,
}

/// Effective settings after merging file values with defaults.
#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    pub model: String,
    pub api_base: String,
    pub api_key_env: String,
    pub timeout: Duration,
    pub options: PipelineOptions,
}

impl ResolvedConfig {
    /// Load and merge config for a run. Search order: explicit `--config`
    /// path, the env var, then an upward search for `docuglot.toml` from
    /// the input's directory. A missing file just means defaults.
    pub fn resolve(workdir: &Path, cli_config: Option<PathBuf>) -> anyhow::Result<Self> {
        let cfg_file = cli_config
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from))
            .or_else(|| find_config_upwards(workdir, DEFAULT_CONFIG_FILENAME));

        let mut file_cfg = AppConfig::default();
        if let Some(p) = cfg_file.as_ref() {
            if p.exists() {
                file_cfg = load_config(p)?;
            }
        }
        Ok(Self::from_file_config(&file_cfg))
    }

    pub fn from_file_config(cfg: &AppConfig) -> Self {
        let defaults = PipelineOptions::default();
        Self {
            model: cfg
                .client
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_base: cfg
                .client
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            api_key_env: cfg
                .client
                .api_key_env
                .clone()
                .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string()),
            timeout: Duration::from_secs(
                cfg.client.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS).max(1),
            ),
            options: PipelineOptions {
                docx_token_budget: cfg
                    .chunking
                    .docx_token_budget
                    .filter(|n| *n > 0)
                    .unwrap_or(defaults.docx_token_budget),
                xlsx_token_budget: cfg
                    .chunking
                    .xlsx_token_budget
                    .filter(|n| *n > 0)
                    .unwrap_or(defaults.xlsx_token_budget),
            },
        }
    }
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parse config: {}", path.display()))
}

pub fn find_config_upwards(start: &Path, filename: &str) -> Option<PathBuf> {
    let mut dir = Some(start.to_path_buf());
    while let Some(d) = dir {
        let candidate = d.join(filename);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = d.parent().map(|p| p.to_path_buf());
    }
    None
}

const DEFAULT_CONFIG_TEXT: &str = r#"# docuglot configuration

[client]
# Gemini model used for translation.
model = "gemini-pro"
# api_base = "https://generativelanguage.googleapis.com/v1beta"
# Environment variable that holds the API key.
api_key_env = "GEMINI_API_KEY"
timeout_secs = 120

[chunking]
# Approximate token budget per translation batch.
docx_token_budget = 2000
xlsx_token_budget = 1500
"#;

pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let path = dir.join(DEFAULT_CONFIG_FILENAME);
    if path.exists() && !force {
        anyhow::bail!(
            "config already exists: {} (use --force to overwrite)",
            path.display()
        );
    }
    std::fs::write(&path, DEFAULT_CONFIG_TEXT)
        .with_context(|| format!("write config: {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ResolvedConfig, DEFAULT_CONFIG_TEXT};
    use std::time::Duration;

    #[test]
    fn defaults_apply_when_sections_are_absent() {
        let cfg: AppConfig = toml::from_str("").expect("parse");
        let resolved = ResolvedConfig::from_file_config(&cfg);
        assert_eq!(resolved.model, "gemini-pro");
        assert_eq!(resolved.api_key_env, "GEMINI_API_KEY");
        assert_eq!(resolved.timeout, Duration::from_secs(120));
        assert_eq!(resolved.options.docx_token_budget, 2000);
        assert_eq!(resolved.options.xlsx_token_budget, 1500);
    }

    #[test]
    fn file_values_override_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [client]
            model = "gemini-1.5-flash"
            timeout_secs = 30

            [chunking]
            xlsx_token_budget = 800
            "#,
        )
        .expect("parse");
        let resolved = ResolvedConfig::from_file_config(&cfg);
        assert_eq!(resolved.model, "gemini-1.5-flash");
        assert_eq!(resolved.timeout, Duration::from_secs(30));
        assert_eq!(resolved.options.docx_token_budget, 2000);
        assert_eq!(resolved.options.xlsx_token_budget, 800);
    }

    #[test]
    fn shipped_default_config_parses() {
        let cfg: AppConfig = toml::from_str(DEFAULT_CONFIG_TEXT).expect("parse");
        assert_eq!(cfg.client.model.as_deref(), Some("gemini-pro"));
        assert_eq!(cfg.chunking.docx_token_budget, Some(2000));
    }
}
