use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpecError {
    #[error("No bundled data file matches selector '{selector}'")]
    NotFound { selector: String },

    #[error("Failed to parse '{path}': {message}")]
    Parse { path: String, message: String },

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Directory walk error: {0}")]
    WalkError(#[from] walkdir::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Analysis error: {message}")]
    AnalysisError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Lookup,
    Data,
    Io,
    Configuration,
    Analysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SpecError {
    pub fn parse(path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        SpecError::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn analysis(message: impl Into<String>) -> Self {
        SpecError::AnalysisError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            SpecError::NotFound { .. } | SpecError::InvalidSelector { .. } => ErrorCategory::Lookup,
            SpecError::Parse { .. } | SpecError::CsvError(_) | SpecError::SerializationError(_) => {
                ErrorCategory::Data
            }
            SpecError::IoError(_) | SpecError::WalkError(_) => ErrorCategory::Io,
            SpecError::ConfigValidationError { .. } | SpecError::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            SpecError::AnalysisError { .. } => ErrorCategory::Analysis,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Lookup | ErrorCategory::Configuration => ErrorSeverity::High,
            // 擬合失敗通常換個 seed 或 resamples 就能重跑
            ErrorCategory::Analysis => ErrorSeverity::Medium,
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SpecError::NotFound { selector } => {
                format!("找不到資料: {}", selector)
            }
            SpecError::Parse { path, .. } => format!("資料檔格式錯誤: {}", path),
            SpecError::InvalidSelector { selector, .. } => {
                format!("選擇器格式錯誤: {}", selector)
            }
            SpecError::AnalysisError { message } => format!("分析失敗: {}", message),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Lookup => {
                "Run `qtm-spec list` to see available selectors (machine/date/experiment)"
            }
            ErrorCategory::Data => "Check that the data file is valid JSON or CSV with the expected layout",
            ErrorCategory::Io => "Check that the data directory exists and is readable",
            ErrorCategory::Configuration => "Review the configuration file and command line flags",
            ErrorCategory::Analysis => "Try a different seed or a larger number of bootstrap resamples",
        }
    }
}

pub type Result<T> = std::result::Result<T, SpecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_errors_are_high_severity() {
        let err = SpecError::NotFound {
            selector: "H9-9/2020_01_01/SPAM".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Lookup);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.user_friendly_message().contains("H9-9"));
    }

    #[test]
    fn test_io_errors_are_critical() {
        let err: SpecError = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }
}
