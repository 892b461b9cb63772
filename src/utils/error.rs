use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("API request failed: {0}")]
    Api(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Timestamp parse error: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("Invalid configuration value for {field} ('{value}'): {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfig { field: String },

    #[error("Data processing error: {message}")]
    Processing { message: String },

    #[error("Chart rendering failed: {message}")]
    Chart { message: String },

    #[error("Git operation failed: {message}")]
    Git { message: String },
}

impl EtlError {
    /// Short operator-facing hint printed alongside the error message.
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::Api(_) => {
                "Check network connectivity and that the forge API is reachable; the scheduled run will retry"
            }
            EtlError::Csv(_) | EtlError::Processing { .. } => {
                "The CSV table may be malformed; inspect it or delete it to rebuild from scratch"
            }
            EtlError::Io(_) => "Check that the output directory exists and is writable",
            EtlError::Json(_) => "The metadata file may be corrupt; it is safe to delete",
            EtlError::Timestamp(_) => "An upstream timestamp did not match the expected format",
            EtlError::InvalidConfigValue { .. } | EtlError::MissingConfig { .. } => {
                "Fix the configuration value and re-run; see --help for defaults"
            }
            EtlError::Chart { .. } => {
                "Verify the output directory is writable and the table is non-empty"
            }
            EtlError::Git { .. } => "Check that --repo points at a git checkout and git is on PATH",
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
