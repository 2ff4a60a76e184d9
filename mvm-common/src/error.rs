//! Error handling for the MathVM IR
//! 
//! Every error here is a contract violation by the producer of the IR
//! (usually the front end). They are detected while nodes are built or
//! blocks are linked and are surfaced to the caller immediately.

use thiserror::Error;

/// Errors raised while constructing, linking or dispatching IR
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IrError {
    /// A required operand is absent or does not resolve in the owning function
    #[error("Malformed {kind} node: {message}")]
    MalformedNode {
        kind: String,
        message: String,
    },

    /// The block already has its single outgoing transition
    #[error("Block '{block}' is already linked")]
    AlreadyLinked {
        block: String,
    },

    /// A handle could not be resolved to any of the closed node kinds
    #[error("Cannot dispatch unknown node: {what}")]
    UnknownNodeKind {
        what: String,
    },
}

/// Result alias used by every fallible IR operation
pub type IrResult<T> = Result<T, IrError>;

impl IrError {
    /// Create a malformed node error
    pub fn malformed(kind: impl Into<String>, message: impl Into<String>) -> Self {
        IrError::MalformedNode {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create an already linked error
    pub fn already_linked(block: impl Into<String>) -> Self {
        IrError::AlreadyLinked { block: block.into() }
    }

    /// Create an unknown node kind error
    pub fn unknown_node(what: impl Into<String>) -> Self {
        IrError::UnknownNodeKind { what: what.into() }
    }
}
