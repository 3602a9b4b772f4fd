use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsultError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Malformed response for table '{table}': {message}")]
    MalformedResponse { table: String, message: String },

    #[error("Fetching table '{table}' timed out after {seconds}s")]
    Timeout { table: String, seconds: u64 },

    #[error("Fetching table '{table}' was cancelled")]
    Cancelled { table: String },

    #[error("Consultation session has been shut down")]
    SessionClosed,

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

    #[error("Missing required configuration '{field}'")]
    MissingConfigError { field: String },

    #[error("Invalid measurement '{field}' = '{value}': {reason}")]
    InvalidMeasurement {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Transport,
    Data,
    Configuration,
    Input,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ConsultError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ConsultError::Http(_) | ConsultError::Timeout { .. } | ConsultError::Cancelled { .. } => {
                ErrorCategory::Transport
            }
            ConsultError::MalformedResponse { .. }
            | ConsultError::SerializationError(_)
            | ConsultError::CsvError(_) => ErrorCategory::Data,
            ConsultError::ConfigError { .. }
            | ConsultError::ConfigValidationError { .. }
            | ConsultError::InvalidConfigValueError { .. }
            | ConsultError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ConsultError::InvalidMeasurement { .. } => ErrorCategory::Input,
            ConsultError::IoError(_) | ConsultError::SessionClosed => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 傳輸與資料問題只會讓該表格視為無資料
            ErrorCategory::Transport => ErrorSeverity::Low,
            ErrorCategory::Data => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn is_transport(&self) -> bool {
        self.category() == ErrorCategory::Transport
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            ConsultError::Http(_) => {
                "Check network access and that the sheet is shared publicly".to_string()
            }
            ConsultError::Timeout { .. } => {
                "Increase [source] timeout_seconds or retry later".to_string()
            }
            ConsultError::Cancelled { .. } => "A newer evaluation superseded this one".to_string(),
            ConsultError::MalformedResponse { table, .. } => {
                format!("Verify the gid configured for table '{}' points at a data tab", table)
            }
            ConsultError::SerializationError(_) => {
                "The upstream payload is not valid JSON; check the sheet endpoint".to_string()
            }
            ConsultError::CsvError(_) => "Check the CSV table files for broken quoting".to_string(),
            ConsultError::ConfigError { .. }
            | ConsultError::ConfigValidationError { .. }
            | ConsultError::InvalidConfigValueError { .. } => {
                "Fix the configuration file and run again".to_string()
            }
            ConsultError::MissingConfigError { field } => {
                format!("Add '{}' to the configuration file", field)
            }
            ConsultError::InvalidMeasurement { field, .. } => {
                format!("Re-enter the '{}' measurement", field)
            }
            ConsultError::IoError(_) => "Check file paths and permissions".to_string(),
            ConsultError::SessionClosed => {
                "Create a new session; a shut-down session cannot evaluate".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Transport => format!("Reference data could not be fetched: {}", self),
            ErrorCategory::Data => format!("Reference data could not be read: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Input => format!("Measurement rejected: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConsultError>;
