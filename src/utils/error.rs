use thiserror::Error;

#[derive(Error, Debug)]
pub enum OngkirError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Not found: {message}")]
    NotFoundError { message: String },

    #[error("Rate API error: {message}")]
    UpstreamError { message: String },

    #[error("Datastore error: {message}")]
    DatastoreError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Client,
    Network,
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

impl OngkirError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFoundError {
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamError {
            message: message.into(),
        }
    }

    pub fn datastore(message: impl Into<String>) -> Self {
        Self::DatastoreError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::ValidationError { .. } | Self::NotFoundError { .. } => ErrorCategory::Client,
            Self::HttpError(_) | Self::UpstreamError { .. } => ErrorCategory::Network,
            Self::DatastoreError { .. } => ErrorCategory::Data,
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Client => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 客戶端造成的錯誤（400/404），其餘一律視為內部錯誤
    pub fn is_client_error(&self) -> bool {
        self.category() == ErrorCategory::Client
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ConfigError { .. } | Self::ConfigValidationError { .. } => {
                "Check the TOML configuration file syntax and values"
            }
            Self::MissingConfigError { .. } => {
                "Add the missing field to the configuration or export the referenced environment variable"
            }
            Self::InvalidConfigValueError { .. } => "Correct the configuration value and restart",
            Self::ValidationError { .. } => "Check the request parameters and try again",
            Self::NotFoundError { .. } => "Verify the identifier exists in the datastore",
            Self::HttpError(_) | Self::UpstreamError { .. } => {
                "Check network connectivity and the rate API key"
            }
            Self::DatastoreError { .. } => "Check the datastore URL and API key",
            Self::IoError(_) => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ValidationError { message } | Self::NotFoundError { message } => message.clone(),
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => format!("Invalid configuration: {}", self),
            Self::HttpError(_) | Self::UpstreamError { .. } => {
                "The shipping rate service is unavailable".to_string()
            }
            Self::DatastoreError { .. } | Self::IoError(_) => {
                "An internal error occurred".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, OngkirError>;
