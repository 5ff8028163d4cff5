use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlignmentError {
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON parse error while {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("audio error while {context}: {message}")]
    Audio { context: String, message: String },
    #[error("invalid normalization config: {message}")]
    Config { message: String },
    #[error("{context}: {message}")]
    Runtime {
        context: &'static str,
        message: String,
    },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("targets length is too long for CTC: {targets} targets need {required} frames, got {frames}")]
    TargetsTooLong {
        targets: usize,
        required: usize,
        frames: usize,
    },
}

impl AlignmentError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn audio(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Audio {
            context: context.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub(crate) fn runtime(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Runtime {
            context,
            message: err.to_string(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// True for failures that are a property of the inputs rather than of the
    /// environment. Pipelines skip such items instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. } | Self::TargetsTooLong { .. } | Self::Audio { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_too_long_message_mentions_ctc() {
        let err = AlignmentError::TargetsTooLong {
            targets: 12,
            required: 14,
            frames: 9,
        };
        let message = err.to_string();
        assert!(message.starts_with("targets length is too long for CTC"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn config_errors_are_not_recoverable() {
        assert!(!AlignmentError::config("bad pattern").is_recoverable());
    }
}
