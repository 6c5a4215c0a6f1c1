#[cfg(feature = "clap")]
pub mod cli;

use crate::adapters::pdf::TableDetection;
use crate::core::pipeline::ExtractionOptions;
use crate::core::table::{RowFilter, RowFilterKind, DEFAULT_DENYLIST};
use crate::utils::error::{PipelineError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub staging: StagingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            max_upload_mb: 20,
        }
    }
}

impl ServerConfig {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderKind {
    #[default]
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "groq")]
    Groq,
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
}

impl ProviderKind {
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-2.0-flash",
            ProviderKind::Groq => "llama-3.3-70b-versatile",
            ProviderKind::OpenAiCompatible => "gpt-4o-mini",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            ProviderKind::Groq => "https://api.groq.com/openai/v1",
            ProviderKind::OpenAiCompatible => "https://api.openai.com/v1",
        }
    }

    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GOOGLE_API_KEY",
            ProviderKind::Groq => "GROQ_API_KEY",
            ProviderKind::OpenAiCompatible => "OPENAI_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::Groq => "groq",
            ProviderKind::OpenAiCompatible => "openai_compatible",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key.
    pub api_key_env: Option<String>,
    pub temperature: f32,
    pub timeout_seconds: u64,
    /// Ask the provider for JSON-constrained output where it supports it.
    pub structured_output: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: None,
            base_url: None,
            api_key_env: None,
            temperature: 0.0,
            timeout_seconds: 60,
            structured_output: true,
        }
    }
}

/// Everything a provider adapter needs, with defaults and the secret resolved.
#[derive(Clone)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub temperature: f32,
    pub timeout: Duration,
    pub structured_output: bool,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .field("structured_output", &self.structured_output)
            .finish()
    }
}

impl LlmConfig {
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_key_env())
    }

    /// Reads the API key from the configured environment variable.
    pub fn resolve_api_key(&self) -> Result<String> {
        let var = self.api_key_env();
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(PipelineError::MissingConfigError {
                field: var.to_string(),
            }),
        }
    }

    pub fn resolve_settings(&self) -> Result<ProviderSettings> {
        Ok(ProviderSettings {
            kind: self.provider,
            model: self.model().to_string(),
            base_url: self.base_url().to_string(),
            api_key: self.resolve_api_key()?,
            temperature: self.temperature,
            timeout: Duration::from_secs(self.timeout_seconds),
            structured_output: self.structured_output,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub row_filter: RowFilterKind,
    pub denylist: Vec<String>,
    pub min_table_columns: usize,
    pub min_table_rows: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            row_filter: RowFilterKind::default(),
            denylist: DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect(),
            min_table_columns: 3,
            min_table_rows: 2,
        }
    }
}

impl ExtractionConfig {
    pub fn row_filter(&self) -> RowFilter {
        RowFilter::from_kind(self.row_filter, &self.denylist)
    }

    pub fn options(&self) -> ExtractionOptions {
        ExtractionOptions {
            row_filter: self.row_filter(),
        }
    }

    pub fn table_detection(&self) -> TableDetection {
        TableDetection {
            min_columns: self.min_table_columns,
            min_rows: self.min_table_rows,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    pub dir: String,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            dir: "./staging".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads the configuration file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PipelineError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| PipelineError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the variable's value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> String {
        static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
        let re = RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("env var regex is valid"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("server.bind", &self.server.bind)?;
        validation::validate_positive_number("server.max_upload_mb", self.server.max_upload_mb, 1)?;

        validation::validate_url("llm.base_url", self.llm.base_url())?;
        validation::validate_non_empty_string("llm.model", self.llm.model())?;
        validation::validate_non_empty_string("llm.api_key_env", self.llm.api_key_env())?;
        validation::validate_range("llm.temperature", self.llm.temperature, 0.0, 2.0)?;
        validation::validate_positive_number(
            "llm.timeout_seconds",
            self.llm.timeout_seconds as usize,
            1,
        )?;

        validation::validate_positive_number(
            "extraction.min_table_columns",
            self.extraction.min_table_columns,
            2,
        )?;
        validation::validate_positive_number(
            "extraction.min_table_rows",
            self.extraction.min_table_rows,
            2,
        )?;
        if self.extraction.row_filter == RowFilterKind::Denylist
            && self.extraction.denylist.iter().any(|s| s.is_empty())
        {
            return Err(PipelineError::InvalidConfigValueError {
                field: "extraction.denylist".to_string(),
                value: String::new(),
                reason: "An empty substring would reject every row".to_string(),
            });
        }

        validation::validate_path("staging.dir", &self.staging.dir)?;
        Ok(())
    }
}
