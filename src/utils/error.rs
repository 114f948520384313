use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Collector '{collector}' failed: {message}")]
    Collector { collector: String, message: String },

    #[error("Collector '{collector}' timed out after {seconds}s")]
    Timeout { collector: String, seconds: u64 },

    #[error("Command '{program}' exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Item store error: {message}")]
    Storage { message: String },

    #[error("Consolidation failed: {message}")]
    Consolidation { message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Chart rendering error: {message}")]
    Chart { message: String },

    #[error("Invalid CSS selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

impl From<rusqlite::Error> for HarvestError {
    fn from(e: rusqlite::Error) -> Self {
        HarvestError::Storage {
            message: e.to_string(),
        }
    }
}

/// 錯誤分類，同時作為 collector 結果中的 ErrorKind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Network,
    Timeout,
    Process,
    Parse,
    Storage,
    Io,
    Config,
    Chart,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl HarvestError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            HarvestError::Http(_) => ErrorCategory::Network,
            HarvestError::Timeout { .. } => ErrorCategory::Timeout,
            HarvestError::CommandFailed { .. } => ErrorCategory::Process,
            HarvestError::Collector { .. } => ErrorCategory::Internal,
            HarvestError::Selector { .. } | HarvestError::Serialization(_) => ErrorCategory::Parse,
            HarvestError::Storage { .. } | HarvestError::Consolidation { .. } => {
                ErrorCategory::Storage
            }
            HarvestError::Csv(_) | HarvestError::Io(_) => ErrorCategory::Io,
            HarvestError::Chart { .. } => ErrorCategory::Chart,
            HarvestError::ConfigError { .. }
            | HarvestError::ConfigValidationError { .. }
            | HarvestError::InvalidConfigValueError { .. } => ErrorCategory::Config,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network | ErrorCategory::Timeout => ErrorSeverity::Medium,
            ErrorCategory::Process | ErrorCategory::Parse | ErrorCategory::Internal => {
                ErrorSeverity::High
            }
            ErrorCategory::Config | ErrorCategory::Chart | ErrorCategory::Io => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            HarvestError::Storage { message } => {
                format!("The item database could not be used: {}", message)
            }
            HarvestError::Consolidation { message } => {
                format!("Stored items could not be read for the report: {}", message)
            }
            HarvestError::Io(e) => format!("Report files could not be written: {}", e),
            HarvestError::Csv(e) => format!("The item summary table could not be written: {}", e),
            HarvestError::Chart { message } => {
                format!("The price chart could not be rendered: {}", message)
            }
            HarvestError::Http(e) => format!("A network request failed: {}", e),
            HarvestError::Timeout { collector, seconds } => {
                format!("Collector '{}' did not finish within {}s", collector, seconds)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check network connectivity and the target site URL",
            ErrorCategory::Timeout => "Increase timeout_seconds for the collector",
            ErrorCategory::Process => "Run the collector command by hand and check its output",
            ErrorCategory::Parse => "Check the selectors or the collector's output format",
            ErrorCategory::Storage => "Check that the database path exists and is writable",
            ErrorCategory::Io => "Check disk space and permissions of the output directory",
            ErrorCategory::Config => "Fix the configuration file and try again",
            ErrorCategory::Chart => "Check the output directory and the ranked item titles",
            ErrorCategory::Internal => "Re-run with --verbose and inspect the logs",
        }
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;
