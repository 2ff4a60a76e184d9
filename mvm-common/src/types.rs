//! Common types used throughout the IR
//! 
//! This module defines the scalar type model and the identifier aliases
//! that the front end, the IR core and the back ends agree on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Variable (name slot) identifier
pub type VarId = u64;

/// Function identifier, unique within a module
pub type FunctionId = u16;

/// Index into a function's string pool
pub type PoolIndex = u64;

/// Scalar kind of every value-producing node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarType {
    /// No value (e.g. a function that returns nothing)
    Bottom,
    /// 64-bit signed integer
    Integer,
    /// IEEE double
    Double,
    /// Raw address or string pool reference
    Pointer,
}

impl VarType {
    /// Every kind, in declaration order
    pub const ALL: [VarType; 4] = [
        VarType::Bottom,
        VarType::Integer,
        VarType::Double,
        VarType::Pointer,
    ];

    /// Check if this kind carries a value at all
    pub fn is_value(&self) -> bool {
        !matches!(self, VarType::Bottom)
    }

    /// Check if a value of this kind can be tested for truthiness
    pub fn is_truthy_testable(&self) -> bool {
        matches!(self, VarType::Integer | VarType::Pointer)
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarType::Bottom => write!(f, "bot"),
            VarType::Integer => write!(f, "int"),
            VarType::Double => write!(f, "double"),
            VarType::Pointer => write!(f, "ptr"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_type_display() {
        let names: Vec<String> = VarType::ALL.iter().map(|t| t.to_string()).collect();
        assert_eq!(names, vec!["bot", "int", "double", "ptr"]);
    }

    #[test]
    fn test_var_type_predicates() {
        assert!(!VarType::Bottom.is_value());
        assert!(VarType::Double.is_value());
        assert!(VarType::Integer.is_truthy_testable());
        assert!(VarType::Pointer.is_truthy_testable());
        assert!(!VarType::Double.is_truthy_testable());
        assert!(!VarType::Bottom.is_truthy_testable());
    }
}
