use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("{service} returned HTTP {status}: {message}")]
    ServiceError {
        service: String,
        status: u16,
        message: String,
    },

    #[error("Unexpected {service} response: {message}")]
    ResponseFormatError { service: String, message: String },

    #[error("Image error for {path}: {reason}")]
    ImageError { path: String, reason: String },

    #[error("Template error: {message}")]
    TemplateError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Service,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BotError {
    pub fn service(service: &str, status: u16, message: impl Into<String>) -> Self {
        BotError::ServiceError {
            service: service.to_string(),
            status,
            message: message.into(),
        }
    }

    pub fn response_format(service: &str, message: impl Into<String>) -> Self {
        BotError::ResponseFormatError {
            service: service.to_string(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            BotError::MissingConfigError { .. }
            | BotError::InvalidConfigValueError { .. }
            | BotError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            BotError::ApiError(_) => ErrorCategory::Network,
            BotError::ServiceError { .. } | BotError::ResponseFormatError { .. } => {
                ErrorCategory::Service
            }
            BotError::CsvError(_)
            | BotError::SerializationError(_)
            | BotError::ImageError { .. }
            | BotError::TemplateError { .. }
            | BotError::ProcessingError { .. } => ErrorCategory::Data,
            BotError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BotError::ApiError(e) if e.is_timeout() || e.is_connect() => ErrorSeverity::Medium,
            BotError::ServiceError { status, .. } if *status == 429 || *status >= 500 => {
                ErrorSeverity::Medium
            }
            BotError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// 給操作人員看的簡短訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            BotError::MissingConfigError { field } => {
                format!("Required setting {} is not configured", field)
            }
            BotError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting {} is invalid: {}", field, reason)
            }
            BotError::ConfigValidationError { field, message } => {
                format!("Configuration problem in {}: {}", field, message)
            }
            BotError::ApiError(e) if e.is_timeout() => "The remote service timed out".to_string(),
            BotError::ApiError(e) if e.is_connect() => {
                "Could not connect to the remote service".to_string()
            }
            BotError::ApiError(e) => format!("Network request failed: {}", e),
            BotError::ServiceError {
                service, status, ..
            } => format!("{} rejected the request (HTTP {})", service, status),
            BotError::ResponseFormatError { service, .. } => {
                format!("{} returned a response that could not be understood", service)
            }
            BotError::ImageError { path, reason } => format!("{}: {}", path, reason),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            BotError::MissingConfigError { field } => {
                format!("Add {} to your environment or .env file", field)
            }
            BotError::InvalidConfigValueError { field, .. }
            | BotError::ConfigValidationError { field, .. } => {
                format!("Check the value of {} in your environment or config file", field)
            }
            BotError::ServiceError { message, .. } if message.contains("ExpiredToken") => {
                "Your credentials have expired. Refresh them and run again".to_string()
            }
            BotError::ServiceError { status, .. } if *status == 401 || *status == 403 => {
                "Check the API token and the permissions granted to it".to_string()
            }
            BotError::ServiceError { status: 404, .. } => {
                "Check the endpoint URL, model id or page identifiers".to_string()
            }
            BotError::ServiceError { status: 429, .. } => {
                "The service is rate limiting requests. Wait a moment and run again".to_string()
            }
            BotError::ServiceError { .. } | BotError::ApiError(_) => {
                "Verify network access and credentials, then run again".to_string()
            }
            BotError::ResponseFormatError { .. } => {
                "Run with --verbose to inspect the raw response".to_string()
            }
            BotError::ImageError { .. } => {
                "Double-check the image file path, format and size".to_string()
            }
            BotError::IoError(_) => "Check file paths and write permissions".to_string(),
            _ => "Re-run with --verbose for details".to_string(),
        }
    }

    /// 根據嚴重程度決定退出碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    /// Logs the error with its category and prints the operator-facing lines.
    pub fn report(&self, context: &str) {
        tracing::error!(
            "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
            context,
            self,
            self.category(),
            self.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", self.recovery_suggestion());
        eprintln!("❌ {}", self.user_friendly_message());
        eprintln!("💡 {}", self.recovery_suggestion());
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
