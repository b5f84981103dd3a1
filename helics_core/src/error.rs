//! Error kinds shared across every HELICS crate.

/// The single error type propagated across federate, core, and broker
/// boundaries. Variants mirror the HELICS error-code families so a
/// federate-facing API can map them back to a stable numeric code without
/// re-deriving the mapping at each call site.
#[derive(Debug, thiserror::Error)]
pub enum HelicsError {
    #[error("registration failure: {0}")]
    RegistrationFailure(String),

    #[error("connection failure: {0}")]
    ConnectionFailure(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("invalid state transition from {from:?} attempting {attempted}")]
    InvalidStateTransition { from: String, attempted: String },

    #[error("invalid function call: {0}")]
    InvalidFunctionCall(String),

    #[error("system failure: {0}")]
    SystemFailure(String),

    #[error("execution failure: {0}")]
    ExecutionFailure(String),

    /// Non-fatal: the caller should drop the message/command and continue.
    #[error("discarded: {0}")]
    Discard(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, HelicsError>;

impl HelicsError {
    /// Whether this error should abort the owning federate/core/broker, as
    /// opposed to being logged and absorbed.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, HelicsError::Discard(_))
    }
}
