//! Error types for the VPS lifecycle engine.

use std::path::PathBuf;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the VPS lifecycle engine.
///
/// User-requested lifecycle failures surface the runtime's refusal verbatim
/// and leave the record in its prior confirmed state. Best-effort bootstrap
/// failures never appear here; they degrade the record's capability flag
/// instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Lookup Errors
    // =========================================================================
    /// No VPS record with the given container id.
    #[error("no VPS found with id '{0}'")]
    VpsNotFound(String),

    /// No giveaway record with the given id.
    #[error("no giveaway found with id '{0}'")]
    GiveawayNotFound(String),

    // =========================================================================
    // Authorization Errors
    // =========================================================================
    /// Caller is not an admin, the owner, or a shared-access grantee.
    #[error("user '{actor}' is not authorized to manage '{target}'")]
    Unauthorized { actor: String, target: String },

    /// Caller must own the target for this operation.
    #[error("user '{actor}' does not own '{target}'")]
    NotOwner { actor: String, target: String },

    // =========================================================================
    // Ledger Errors
    // =========================================================================
    /// Balance too low for a paid action.
    #[error(
        "insufficient points: need {required}, have {available} ({} short)",
        .required - .available
    )]
    InsufficientFunds { required: u64, available: u64 },

    // =========================================================================
    // Validation Errors
    // =========================================================================
    /// Argument rejected before any state change.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation would not change anything (already stopped, already shared,
    /// duplicate giveaway join, ...).
    #[error("'{id}' is already {state}")]
    AlreadyInState { id: String, state: String },

    /// Lifecycle operation attempted on a suspended lease.
    #[error("VPS '{0}' is suspended; renew it to reactivate")]
    Suspended(String),

    // =========================================================================
    // Runtime Adapter Errors
    // =========================================================================
    /// Container engine call failed or timed out.
    #[error("runtime refused {operation} for '{container}': {reason}")]
    RuntimeFailure {
        operation: &'static str,
        container: String,
        reason: String,
    },

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Store initialization failed.
    #[error("failed to initialize store at {path}: {reason}")]
    StoreInitFailed { path: PathBuf, reason: String },

    /// Store write failed.
    #[error("failed to write to store: {0}")]
    StoreWriteFailed(String),

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Builds a [`Error::RuntimeFailure`] for the given adapter call.
    pub(crate) fn runtime(
        operation: &'static str,
        container: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::RuntimeFailure {
            operation,
            container: container.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_reports_shortfall() {
        let err = Error::InsufficientFunds {
            required: 40,
            available: 15,
        };
        let msg = err.to_string();
        assert!(msg.contains("need 40"), "{msg}");
        assert!(msg.contains("have 15"), "{msg}");
        assert!(msg.contains("25 short"), "{msg}");
    }

    #[test]
    fn test_error_messages_are_specific() {
        assert_eq!(
            Error::VpsNotFound("abc123".into()).to_string(),
            "no VPS found with id 'abc123'"
        );
        assert_eq!(
            Error::Unauthorized {
                actor: "77".into(),
                target: "abc123".into()
            }
            .to_string(),
            "user '77' is not authorized to manage 'abc123'"
        );
        assert_eq!(
            Error::AlreadyInState {
                id: "abc123".into(),
                state: "stopped".into()
            }
            .to_string(),
            "'abc123' is already stopped"
        );
    }
}
