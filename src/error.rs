//! Error types for the multiner crate.
//!
//! None of these are fatal to a request: engine errors degrade to an
//! empty contribution and offset errors drop a single mention. They exist
//! so every failure can be logged with its source and reason.

/// Errors that can occur while consulting engines or consolidating mentions.
#[derive(Debug, thiserror::Error)]
pub enum MultinerError {
    /// An engine could not be reached or refused the request.
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),

    /// An engine did not answer within its timeout.
    #[error("engine timed out: {0}")]
    Timeout(String),

    /// An HTTP request to an engine or document source failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// An engine response could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// A mention could not be located in the original text.
    #[error("offset mismatch: {0}")]
    OffsetMismatch(String),

    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for multiner results.
pub type Result<T> = std::result::Result<T, MultinerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_engine_unavailable() {
        let err = MultinerError::EngineUnavailable("stanford: connection refused".into());
        assert_eq!(
            err.to_string(),
            "engine unavailable: stanford: connection refused"
        );
    }

    #[test]
    fn display_timeout() {
        let err = MultinerError::Timeout("flair exceeded 10000ms".into());
        assert_eq!(err.to_string(), "engine timed out: flair exceeded 10000ms");
    }

    #[test]
    fn display_offset_mismatch() {
        let err = MultinerError::OffsetMismatch("'Einstein' near 37".into());
        assert_eq!(err.to_string(), "offset mismatch: 'Einstein' near 37");
    }

    #[test]
    fn display_config() {
        let err = MultinerError::Config("context window must be > 0".into());
        assert_eq!(err.to_string(), "config error: context window must be > 0");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: MultinerError = io.into();
        assert!(err.to_string().starts_with("I/O error"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MultinerError>();
    }
}
