//! Error types for store composition.
//!
//! Every error is raised synchronously to the caller that triggered it. Nothing
//! in the engine performs I/O, so there is no retry path.

use crate::namespace::NamespaceKey;
use thiserror::Error;

/// Result type alias for composition operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while composing, updating or reading store units.
#[derive(Debug, Error)]
pub enum Error {
    /// The composition was built without a children renderer.
    #[error("composition requires children to render")]
    MissingChildren,

    /// Two units in the same composition derive the same namespace key.
    #[error("namespace collision on `{key}`: units `{first}` and `{second}`")]
    NamespaceCollision {
        /// The shared key
        key: NamespaceKey,
        /// Type name of the unit that claimed the key first
        first: &'static str,
        /// Type name of the unit that tried to claim it again
        second: &'static str,
    },

    /// A bound method was invoked after its instance was unmounted.
    #[error("operation `{operation}` invoked on unmounted unit `{unit}`")]
    UnboundOperation {
        unit: &'static str,
        operation: &'static str,
    },

    /// The unit's state could not be serialized.
    #[error("failed to serialize state of `{unit}`: {source}")]
    StateSerialization {
        unit: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The unit's state serialized to something other than an object.
    #[error("state of `{unit}` must serialize to an object, found {found}")]
    StateNotObject {
        unit: &'static str,
        found: &'static str,
    },

    /// An operation rejected its arguments.
    #[error("invalid argument for `{operation}`: {reason}")]
    InvalidArgument {
        operation: &'static str,
        reason: String,
    },

    /// A connected leaf was rendered outside of any provider scope.
    #[error("no provider in scope")]
    NoProvider,
}

impl Error {
    /// Shorthand for operations validating their arguments.
    pub fn invalid_argument(operation: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            operation,
            reason: reason.into(),
        }
    }
}
