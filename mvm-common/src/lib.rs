//! MathVM IR - Common Types and Utilities
//! 
//! This crate contains the leaf types shared by the IR core and its
//! collaborators: the scalar value-kind model, identifier aliases and
//! the error taxonomy raised while building IR.

pub mod error;
pub mod types;

pub use error::{IrError, IrResult};
pub use types::*;
