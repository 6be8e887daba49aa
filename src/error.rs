//! Error types for the ladder service
//!
//! Fallible operations return `anyhow::Result`; the typed [`LadderError`]
//! travels inside it so callers can recover the kind with `downcast_ref`.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific ladder scenarios
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LadderError {
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid state: {reason}")]
    InvalidState { reason: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal service error: {message}")]
    Internal { message: String },
}

/// Coarse error classification, used for metrics labels and HTTP mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    InvalidState,
    Storage,
    Configuration,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::Storage => "storage",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LadderError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        LadderError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        LadderError::InvalidState {
            reason: reason.into(),
        }
    }

    pub fn team_not_found(name: impl Into<String>) -> Self {
        LadderError::NotFound {
            entity: "Team",
            id: name.into(),
        }
    }

    pub fn match_not_found(id: impl std::fmt::Display) -> Self {
        LadderError::NotFound {
            entity: "Match",
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LadderError::InvalidInput { .. } => ErrorKind::InvalidInput,
            LadderError::NotFound { .. } => ErrorKind::NotFound,
            LadderError::InvalidState { .. } => ErrorKind::InvalidState,
            LadderError::Storage { .. } => ErrorKind::Storage,
            LadderError::Configuration { .. } => ErrorKind::Configuration,
            LadderError::Internal { .. } => ErrorKind::Internal,
        }
    }
}

/// Classify an arbitrary error; anything that is not a [`LadderError`] is internal
pub fn error_kind(error: &anyhow::Error) -> ErrorKind {
    error
        .downcast_ref::<LadderError>()
        .map(LadderError::kind)
        .unwrap_or(ErrorKind::Internal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_survives_anyhow_wrapping() {
        let err: anyhow::Error = LadderError::match_not_found("abc").into();
        assert_eq!(error_kind(&err), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Match not found: abc");
    }

    #[test]
    fn test_foreign_errors_are_internal() {
        let err = anyhow::anyhow!("disk on fire");
        assert_eq!(error_kind(&err), ErrorKind::Internal);
    }
}
