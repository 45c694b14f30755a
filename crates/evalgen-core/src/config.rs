use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::evaluation::Evaluation;
use crate::format::Format;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            temperature: None,
        }
    }
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// A suite file: judge settings, the evaluations to run and optionally where the cases live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    #[serde(default)]
    pub judge: JudgeConfig,
    /// Directory of `*.jinja` prompt overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts_dir: Option<PathBuf>,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataConfig>,
    pub evaluations: Vec<Evaluation>,
}

fn default_concurrency() -> usize {
    8
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub path: PathBuf,
}

impl SuiteConfig {
    pub fn from_text(text: &str, format: Format) -> Result<Self> {
        let config = match format {
            Format::Json => serde_json::from_str(text)?,
            Format::Yaml => serde_yaml::from_str(text)?,
        };
        Ok(config)
    }

    /// Loads a suite file, picking JSON or YAML from its extension. Relative
    /// `prompts_dir` and `data.path` are resolved against the file's directory.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {:?}", path))?;
        let mut config = Self::from_text(&text, Format::from_path(path))
            .with_context(|| format!("Invalid suite file {:?}", path))?;

        if let Some(base) = path.parent() {
            if let Some(dir) = config.prompts_dir.as_mut() {
                *dir = base.join(&*dir);
            }
            if let Some(data) = config.data.as_mut() {
                data.path = base.join(&data.path);
            }
        }
        Ok(config)
    }
}
