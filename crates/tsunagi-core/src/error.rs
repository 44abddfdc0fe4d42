use thiserror::Error;

/// Errors that can occur during Tsunagi core operations.
#[derive(Debug, Error)]
pub enum TsunagiError {
    /// A record could not be coerced into an `AnimeRecord`.
    #[error("invalid record at index {index}: {reason}")]
    InvalidRecord {
        /// Position of the record in the input sequence.
        index: usize,
        /// Why the record was rejected.
        reason: String,
    },

    /// The record collection was not a JSON array.
    #[error("expected a list of records, found {found}")]
    NotARecordList {
        /// JSON type that was found instead.
        found: &'static str,
    },

    /// A regex pattern failed to compile (should not happen with static patterns).
    #[error("regex compilation error: {0}")]
    RegexError(#[from] regex::Error),
}

/// Result type alias for Tsunagi operations.
pub type Result<T> = std::result::Result<T, TsunagiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = TsunagiError::InvalidRecord {
            index: 4,
            reason: "missing id".into(),
        };
        assert_eq!(err.to_string(), "invalid record at index 4: missing id");

        let err = TsunagiError::NotARecordList { found: "object" };
        assert!(err.to_string().contains("object"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TsunagiError>();
    }
}
