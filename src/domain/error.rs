//! Domain error types.

/// Top-level error type for tradeblocks.
#[derive(Debug, thiserror::Error)]
pub enum TradeblocksError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("trade block not found: {block_id}")]
    BlockNotFound { block_id: String },

    #[error("validation error: {reason}")]
    Validation { reason: String },

    #[error("insufficient data for {context}: have {have} trades, need {minimum}")]
    InsufficientData {
        context: String,
        have: usize,
        minimum: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TradeblocksError> for std::process::ExitCode {
    fn from(err: &TradeblocksError) -> Self {
        let code: u8 = match err {
            TradeblocksError::Io(_) => 1,
            TradeblocksError::ConfigParse { .. }
            | TradeblocksError::ConfigMissing { .. }
            | TradeblocksError::ConfigInvalid { .. } => 2,
            TradeblocksError::Database { .. } | TradeblocksError::DatabaseQuery { .. } => 3,
            TradeblocksError::Validation { .. } => 4,
            TradeblocksError::BlockNotFound { .. }
            | TradeblocksError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
