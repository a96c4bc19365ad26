use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Environment error: {0}")]
    EnvError(#[from] envy::Error),

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Feed error: {message}")]
    FeedError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Database,
    Processing,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::TomlError(_)
            | EtlError::EnvError(_) => ErrorCategory::Configuration,
            EtlError::XmlError(_) | EtlError::FeedError { .. } => ErrorCategory::Input,
            EtlError::DatabaseError(_) => ErrorCategory::Database,
            EtlError::CsvError(_) | EtlError::ProcessingError { .. } => ErrorCategory::Processing,
            EtlError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // Connection problems usually clear up on a rerun.
            EtlError::DatabaseError(sqlx::Error::PoolTimedOut)
            | EtlError::DatabaseError(sqlx::Error::PoolClosed)
            | EtlError::DatabaseError(sqlx::Error::Io(_)) => ErrorSeverity::Medium,
            EtlError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the .env file, the TOML config and the command line flags"
            }
            ErrorCategory::Input => {
                "Make sure TARGET_FILENAME points to a well-formed YML/XML feed in the data directory"
            }
            ErrorCategory::Database => {
                "Check that Postgres is running, POSTGRES_* variables are correct and the sku table exists (try --init-schema)"
            }
            ErrorCategory::Processing => "Rerun with --verbose to see which offer failed",
            ErrorCategory::System => "Check file permissions and free disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::MissingConfigError { field } => {
                format!("Required setting '{}' is not set", field)
            }
            EtlError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            EtlError::XmlError(e) => format!("The feed is not valid XML: {}", e),
            EtlError::DatabaseError(e) => format!("Database operation failed: {}", e),
            EtlError::IoError(e) => format!("File operation failed: {}", e),
            other => other.to_string(),
        }
    }
}

impl ErrorSeverity {
    /// Process exit code for a run that ended at this severity.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_configuration_category() {
        let err = EtlError::MissingConfigError {
            field: "TARGET_FILENAME".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.user_friendly_message().contains("TARGET_FILENAME"));
    }

    #[test]
    fn test_io_errors_are_critical() {
        let err = EtlError::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "feed.xml",
        ));
        assert_eq!(err.category(), ErrorCategory::System);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_pool_timeout_is_retryable() {
        let err = EtlError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.recovery_suggestion().contains("Postgres"));
    }

    #[test]
    fn test_every_severity_exits_non_zero() {
        assert_eq!(ErrorSeverity::Medium.exit_code(), 2);
        assert_eq!(ErrorSeverity::High.exit_code(), 1);
        assert_eq!(ErrorSeverity::Critical.exit_code(), 3);

        let closed = EtlError::from(sqlx::Error::PoolClosed);
        assert_ne!(closed.severity().exit_code(), 0);
    }
}
