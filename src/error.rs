//! Error types for the waiting-time board
//!
//! Operations return `anyhow`-backed results; the specific failure kinds below
//! are attached so callers can classify them with `downcast_ref`.

use crate::types::RecordKind;

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Failures surfaced to callers of store operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WaitingTimeError {
    #[error("Invalid value for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("No {kind} record or subject with id '{id}'")]
    NotFound { kind: RecordKind, id: String },

    #[error("Waiting-time source unavailable for {kind}: {message}")]
    SourceUnavailable { kind: RecordKind, message: String },

    #[error("{kind} catalog already contains '{id}'")]
    DuplicateEntry { kind: RecordKind, id: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal store error: {message}")]
    InternalError { message: String },
}

impl WaitingTimeError {
    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn lock_poisoned(what: &str) -> Self {
        Self::InternalError {
            message: format!("Failed to acquire {} lock", what),
        }
    }
}

/// A stored record whose subject is missing from the reference catalog.
///
/// Never returned as a failure; the record is left out of joined results and
/// this diagnostic travels with the snapshot instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} record '{record_id}' references unknown subject '{subject_id}'")]
pub struct IntegrityError {
    pub kind: RecordKind,
    pub record_id: String,
    pub subject_id: String,
}

/// Classify an error returned by a store operation
pub fn classify(error: &anyhow::Error) -> Option<&WaitingTimeError> {
    error.downcast_ref::<WaitingTimeError>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_roundtrips_through_anyhow() {
        let err: anyhow::Error = WaitingTimeError::NotFound {
            kind: RecordKind::Examination,
            id: "wait-999".to_string(),
        }
        .into();

        assert!(matches!(
            classify(&err),
            Some(WaitingTimeError::NotFound { id, .. }) if id == "wait-999"
        ));
        assert!(classify(&anyhow::anyhow!("plain")).is_none());
    }

    #[test]
    fn test_integrity_error_message() {
        let err = IntegrityError {
            kind: RecordKind::Room,
            record_id: "consult-009".to_string(),
            subject_id: "room-404".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "room record 'consult-009' references unknown subject 'room-404'"
        );
    }
}
