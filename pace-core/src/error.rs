//! Error types for pace.
//!
//! Errors carry a stable code so that logs and tests can match on the
//! failure class without parsing the message. Cancellation is never an
//! error; it is observed through cancellers or [`crate::Settled::Canceled`].

use crate::types::{ChainId, ChainState};
use crate::value::Value;
use thiserror::Error;

/// The main error type for chain operations.
///
/// `Clone` because a fired chain keeps its error and hands copies to every
/// terminal listener.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChainError {
    // =========================================================================
    // Lifecycle Errors (E100-E199)
    // =========================================================================
    /// A lifecycle operation was called in a state that does not allow it.
    #[error("E101: Cannot {operation} chain in state {state}")]
    InvalidState {
        /// The operation that was attempted.
        operation: &'static str,
        /// The state the chain was in.
        state: ChainState,
    },

    /// A handler returned the chain it belongs to.
    #[error("E102: Chain {chain} cannot wait on itself")]
    CyclicChain {
        /// The chain that tried to adopt itself.
        chain: ChainId,
    },

    // =========================================================================
    // Application Errors (E200-E299)
    // =========================================================================
    /// A handler failed.
    #[error("E201: {message}")]
    Failed {
        /// Human-readable failure message.
        message: String,
    },

    /// A chain was raised with an arbitrary error value.
    #[error("E202: Raised {value}")]
    Raised {
        /// The value the chain was raised with.
        value: Value,
    },

    // =========================================================================
    // Registry Errors (E300-E399)
    // =========================================================================
    /// No verb with this name is registered.
    #[error("E301: Unknown verb '{name}'")]
    UnknownVerb {
        /// The verb that was called.
        name: String,
    },

    /// Attempted to register a verb that shadows a built-in chain verb.
    #[error("E302: Verb '{name}' is reserved")]
    ReservedVerb {
        /// The reserved name.
        name: String,
    },

    // =========================================================================
    // Iteration Errors (E400-E499)
    // =========================================================================
    /// The value cannot be iterated.
    #[error("E401: Cannot iterate over {kind}")]
    NotIterable {
        /// The kind of value that was given.
        kind: String,
    },

    /// An iteration operation received an argument it cannot work with.
    #[error("E402: Invalid argument to {operation}: {cause}")]
    InvalidArgument {
        /// The operation that rejected the argument.
        operation: &'static str,
        /// Why the argument was rejected.
        cause: String,
    },

    // =========================================================================
    // Configuration Errors (E500-E599)
    // =========================================================================
    /// Scheduler configuration could not be loaded or is inconsistent.
    #[error("E501: Invalid configuration: {cause}")]
    Config {
        /// Description of the problem.
        cause: String,
    },
}

impl ChainError {
    /// Create an application failure from a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Create an application failure carrying an arbitrary value.
    pub fn raised(value: impl Into<Value>) -> Self {
        Self::Raised {
            value: value.into(),
        }
    }

    /// Get the error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidState { .. } => "E101",
            Self::CyclicChain { .. } => "E102",
            Self::Failed { .. } => "E201",
            Self::Raised { .. } => "E202",
            Self::UnknownVerb { .. } => "E301",
            Self::ReservedVerb { .. } => "E302",
            Self::NotIterable { .. } => "E401",
            Self::InvalidArgument { .. } => "E402",
            Self::Config { .. } => "E501",
        }
    }

    /// The message without the code prefix.
    ///
    /// For [`ChainError::Failed`] this is exactly the message the handler
    /// gave; for [`ChainError::Raised`] it is the raised value rendered as
    /// text (strings are not quoted).
    pub fn message(&self) -> String {
        match self {
            Self::Failed { message } => message.clone(),
            Self::Raised { value } => match value.as_str() {
                Some(s) => s.to_string(),
                None => value.to_string(),
            },
            other => {
                let text = other.to_string();
                match text.split_once(": ") {
                    Some((_, rest)) => rest.to_string(),
                    None => text,
                }
            }
        }
    }

    /// The value this error was raised with, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Raised { value } => Some(value),
            _ => None,
        }
    }

    /// Check if this error is misuse of the chain lifecycle.
    pub fn is_state_violation(&self) -> bool {
        matches!(self, Self::InvalidState { .. } | Self::CyclicChain { .. })
    }

    /// Check if this error originated in user handler code.
    pub fn is_application(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Raised { .. })
    }
}

/// Result type alias for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;

/// Extension trait for turning foreign errors into chain failures.
pub trait ResultExt<T> {
    /// Convert the error into [`ChainError::Failed`] with a context prefix.
    fn context(self, context: &str) -> Result<T>;

    /// Convert the error into [`ChainError::Failed`] using its display text.
    fn or_fail(self) -> Result<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: &str) -> Result<T> {
        self.map_err(|e| ChainError::failed(format!("{context}: {e}")))
    }

    fn or_fail(self) -> Result<T> {
        self.map_err(|e| ChainError::failed(e.to_string()))
    }
}
