use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to read document '{document}': {message}")]
    Extraction { document: String, message: String },

    #[error("Classification via {provider} failed: {message}")]
    Classification { provider: String, message: String },

    #[error("Invalid upload: {message}")]
    InvalidUpload { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

/// The model answered, but no JSON object could be recovered from the text.
///
/// Both variants keep the raw response so it can be shown to a human.
#[derive(Error, Debug)]
pub enum NormalizationError {
    #[error("no JSON object found in model response")]
    NoJsonObject { raw: String },

    #[error("model response is not valid JSON: {source}")]
    InvalidJson {
        raw: String,
        #[source]
        source: serde_json::Error,
    },
}

impl NormalizationError {
    pub fn raw(&self) -> &str {
        match self {
            NormalizationError::NoJsonObject { raw } => raw,
            NormalizationError::InvalidJson { raw, .. } => raw,
        }
    }

    pub fn into_raw(self) -> String {
        match self {
            NormalizationError::NoJsonObject { raw } => raw,
            NormalizationError::InvalidJson { raw, .. } => raw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Document,
    Provider,
    Upload,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl PipelineError {
    pub fn extraction(document: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::Extraction {
            document: document.into(),
            message: message.into(),
        }
    }

    pub fn classification(provider: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::Classification {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            PipelineError::Extraction { .. } => ErrorCategory::Document,
            PipelineError::Classification { .. } => ErrorCategory::Provider,
            PipelineError::InvalidUpload { .. } => ErrorCategory::Upload,
            PipelineError::ConfigError { .. }
            | PipelineError::MissingConfigError { .. }
            | PipelineError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            PipelineError::IoError(_)
            | PipelineError::CsvError(_)
            | PipelineError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Provider => ErrorSeverity::Medium,
            ErrorCategory::Document | ErrorCategory::Upload => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Stable machine-readable tag used in API error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Extraction { .. } => "extraction",
            PipelineError::Classification { .. } => "classification",
            PipelineError::InvalidUpload { .. } => "invalid_upload",
            PipelineError::ConfigError { .. }
            | PipelineError::MissingConfigError { .. }
            | PipelineError::InvalidConfigValueError { .. } => "configuration",
            PipelineError::IoError(_)
            | PipelineError::CsvError(_)
            | PipelineError::SerializationError(_) => "internal",
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            PipelineError::Extraction { .. } => {
                "Check that the upload is a valid, unencrypted PDF document".to_string()
            }
            PipelineError::Classification { .. } => {
                "Check the API key, provider quota and network connectivity, then resubmit"
                    .to_string()
            }
            PipelineError::InvalidUpload { .. } => {
                "Send the PDF as a multipart form field named 'file'".to_string()
            }
            PipelineError::MissingConfigError { field } => {
                format!("Set {} before starting", field)
            }
            PipelineError::InvalidConfigValueError { field, .. } => {
                format!("Fix the value of {} in the configuration file", field)
            }
            PipelineError::ConfigError { .. } => {
                "Check the configuration file syntax".to_string()
            }
            PipelineError::IoError(_) => {
                "Check file permissions and available disk space".to_string()
            }
            PipelineError::CsvError(_) | PipelineError::SerializationError(_) => {
                "This is an internal error; please report it with the input document".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            PipelineError::Extraction { document, .. } => {
                format!("Could not read '{}' as a PDF bank statement", document)
            }
            PipelineError::Classification { provider, .. } => {
                format!("The language model step ({}) failed", provider)
            }
            PipelineError::InvalidUpload { message } => format!("Invalid upload: {}", message),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
