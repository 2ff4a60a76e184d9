//! IR Operations
//! 
//! Defines the closed sets of binary and unary operators available in the IR.
//! The taxonomy does not encode which operand kinds are legal for an
//! operator; that belongs to the type checker.

use mvm_common::VarType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary operations in IR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add, Sub, Mul, Div, Mod,

    // Comparison
    Lt, Le, Eq, Neq,

    // Bitwise
    Or, And, Xor,

    // Logical
    LOr, LAnd,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 14] = [
        BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div, BinaryOp::Mod,
        BinaryOp::Lt, BinaryOp::Le, BinaryOp::Eq, BinaryOp::Neq,
        BinaryOp::Or, BinaryOp::And, BinaryOp::LOr, BinaryOp::LAnd, BinaryOp::Xor,
    ];

    /// Canonical display symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Eq => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::Or => "|",
            BinaryOp::And => "&",
            BinaryOp::LOr => "||",
            BinaryOp::LAnd => "&&",
            BinaryOp::Xor => "^",
        }
    }

    pub fn arity(&self) -> usize {
        2
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(self, BinaryOp::Lt | BinaryOp::Le | BinaryOp::Eq | BinaryOp::Neq)
    }

    pub fn is_bitwise(&self) -> bool {
        matches!(self, BinaryOp::Or | BinaryOp::And | BinaryOp::Xor)
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::LOr | BinaryOp::LAnd)
    }

    /// Result kind when it does not depend on the operands.
    /// Comparisons and logical connectives always produce an integer truth value.
    pub fn result_kind(&self) -> Option<VarType> {
        if self.is_comparison() || self.is_logical() {
            Some(VarType::Integer)
        } else {
            None
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Unary operations in IR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    CastI2D,  // Integer to double
    CastD2I,  // Double to integer
    CastP2I,  // Pointer to integer
    CastI2P,  // Integer to pointer
    Neg,      // Arithmetic negation
    Not,      // Logical not
}

impl UnaryOp {
    pub const ALL: [UnaryOp; 6] = [
        UnaryOp::CastI2D, UnaryOp::CastD2I, UnaryOp::CastP2I,
        UnaryOp::CastI2P, UnaryOp::Neg, UnaryOp::Not,
    ];

    /// Canonical display symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::CastI2D => "<i2d>",
            UnaryOp::CastD2I => "<d2i>",
            UnaryOp::CastP2I => "<p2i>",
            UnaryOp::CastI2P => "<i2p>",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }

    pub fn arity(&self) -> usize {
        1
    }

    pub fn is_cast(&self) -> bool {
        matches!(self, UnaryOp::CastI2D | UnaryOp::CastD2I | UnaryOp::CastP2I | UnaryOp::CastI2P)
    }

    /// Result kind of casts and logical not; negation keeps its operand's kind
    pub fn result_kind(&self) -> Option<VarType> {
        match self {
            UnaryOp::CastI2D => Some(VarType::Double),
            UnaryOp::CastD2I | UnaryOp::CastP2I | UnaryOp::Not => Some(VarType::Integer),
            UnaryOp::CastI2P => Some(VarType::Pointer),
            UnaryOp::Neg => None,
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Any operator of the closed taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Binary(BinaryOp),
    Unary(UnaryOp),
}

impl Operator {
    pub fn arity(&self) -> usize {
        match self {
            Operator::Binary(op) => op.arity(),
            Operator::Unary(op) => op.arity(),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Binary(op) => op.symbol(),
            Operator::Unary(op) => op.symbol(),
        }
    }
}

impl From<BinaryOp> for Operator {
    fn from(op: BinaryOp) -> Self {
        Operator::Binary(op)
    }
}

impl From<UnaryOp> for Operator {
    fn from(op: UnaryOp) -> Self {
        Operator::Unary(op)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
