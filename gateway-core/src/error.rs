//! Error types for the domain layer

use thiserror::Error;

/// Entity kind a transition error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// An invoice
    Invoice,
    /// A payment transaction
    Transaction,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Invoice => write!(f, "invoice"),
            EntityKind::Transaction => write!(f, "transaction"),
        }
    }
}

/// Status transition failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The target status is not reachable from the current one
    #[error("{entity} cannot transition from {from} to {to}")]
    Disallowed {
        /// Entity kind
        entity: EntityKind,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// A status string is not a recognized member of the enumeration
    #[error("unknown {entity} status: {value}")]
    UnknownStatus {
        /// Entity kind
        entity: EntityKind,
        /// The unrecognized value
        value: String,
    },
}
