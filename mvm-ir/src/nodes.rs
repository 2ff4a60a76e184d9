//! IR Nodes
//!
//! Defines the closed node hierarchy: atoms (leaf values), expressions,
//! statements and jumps, together with the arena handles that connect them.
//!
//! Nodes only expose their fields. Every semantic (evaluation, checking,
//! code emission) lives in visitors.

use mvm_common::{FunctionId, IrError, IrResult, VarId, VarType};
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::ops::{BinaryOp, UnaryOp};

/// Handle of an expression in its function's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExprId(u32);

impl ExprId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Handle of an expression that is known to be an atom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AtomId(ExprId);

impl AtomId {
    /// Only the arena hands these out; a forged one is re-checked on use
    pub(crate) fn from_expr(id: ExprId) -> Self {
        Self(id)
    }

    pub fn expr(&self) -> ExprId {
        self.0
    }
}

impl From<AtomId> for ExprId {
    fn from(atom: AtomId) -> Self {
        atom.0
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle of a block in its function's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(u32);

impl BlockId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// The closed set of node kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Variable,
    Int,
    Double,
    Ptr,
    BinOp,
    UnOp,
    Phi,
    Call,
    Assignment,
    Return,
    Print,
    JumpAlways,
    JumpCond,
    Block,
    FunctionRecord,
}

impl NodeKind {
    pub const ALL: [NodeKind; 15] = [
        NodeKind::Variable, NodeKind::Int, NodeKind::Double, NodeKind::Ptr,
        NodeKind::BinOp, NodeKind::UnOp, NodeKind::Phi, NodeKind::Call,
        NodeKind::Assignment, NodeKind::Return, NodeKind::Print,
        NodeKind::JumpAlways, NodeKind::JumpCond,
        NodeKind::Block, NodeKind::FunctionRecord,
    ];

    pub fn is_atom(&self) -> bool {
        matches!(self, NodeKind::Variable | NodeKind::Int | NodeKind::Double | NodeKind::Ptr)
    }

    /// Atoms are expressions too
    pub fn is_expression(&self) -> bool {
        self.is_atom() || matches!(self, NodeKind::BinOp | NodeKind::UnOp | NodeKind::Phi | NodeKind::Call)
    }

    pub fn is_statement(&self) -> bool {
        matches!(self, NodeKind::Assignment | NodeKind::Return | NodeKind::Print)
    }

    pub fn is_jump(&self) -> bool {
        matches!(self, NodeKind::JumpAlways | NodeKind::JumpCond)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

// ---------------------------------------------------------------------------
// Atoms
// ---------------------------------------------------------------------------

/// Reference to a name slot; identity is the id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    pub id: VarId,
}

impl Variable {
    pub fn new(id: VarId) -> Self {
        Self { id }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Int {
    pub value: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Double {
    pub value: f64,
}

/// Pointer constant: a raw address, or an index into the owning
/// function's string pool when `is_pooled_string` is set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ptr {
    pub value: u64,
    pub is_pooled_string: bool,
}

/// Leaf value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Atom {
    Variable(Variable),
    Int(Int),
    Double(Double),
    Ptr(Ptr),
}

impl Atom {
    pub fn kind(&self) -> NodeKind {
        match self {
            Atom::Variable(_) => NodeKind::Variable,
            Atom::Int(_) => NodeKind::Int,
            Atom::Double(_) => NodeKind::Double,
            Atom::Ptr(_) => NodeKind::Ptr,
        }
    }

    /// Kind of a constant; a variable's kind is the type checker's business
    pub fn value_kind(&self) -> Option<VarType> {
        match self {
            Atom::Variable(_) => None,
            Atom::Int(_) => Some(VarType::Integer),
            Atom::Double(_) => Some(VarType::Double),
            Atom::Ptr(_) => Some(VarType::Pointer),
        }
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Atom::Variable(var) => Some(var),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinOp {
    pub left: ExprId,
    pub right: ExprId,
    pub op: BinaryOp,
}

impl BinOp {
    /// Start an incremental construction; operands may be supplied in any order
    pub fn builder(op: BinaryOp) -> BinOpBuilder {
        BinOpBuilder { left: None, right: None, op }
    }
}

/// Collects the operands of a binary operation as the front end lowers them
#[derive(Debug, Clone, Copy)]
pub struct BinOpBuilder {
    left: Option<ExprId>,
    right: Option<ExprId>,
    op: BinaryOp,
}

impl BinOpBuilder {
    pub fn left(mut self, left: impl Into<ExprId>) -> Self {
        self.left = Some(left.into());
        self
    }

    pub fn right(mut self, right: impl Into<ExprId>) -> Self {
        self.right = Some(right.into());
        self
    }

    pub fn finish(self) -> IrResult<BinOp> {
        let left = self.left.ok_or_else(|| {
            IrError::malformed(NodeKind::BinOp.to_string(), format!("missing left operand of '{}'", self.op))
        })?;
        let right = self.right.ok_or_else(|| {
            IrError::malformed(NodeKind::BinOp.to_string(), format!("missing right operand of '{}'", self.op))
        })?;
        Ok(BinOp { left, right, op: self.op })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnOp {
    pub operand: ExprId,
    pub op: UnaryOp,
}

impl UnOp {
    pub fn builder(op: UnaryOp) -> UnOpBuilder {
        UnOpBuilder { operand: None, op }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UnOpBuilder {
    operand: Option<ExprId>,
    op: UnaryOp,
}

impl UnOpBuilder {
    pub fn operand(mut self, operand: impl Into<ExprId>) -> Self {
        self.operand = Some(operand.into());
        self
    }

    pub fn finish(self) -> IrResult<UnOp> {
        let operand = self.operand.ok_or_else(|| {
            IrError::malformed(NodeKind::UnOp.to_string(), format!("missing operand of '{}'", self.op))
        })?;
        Ok(UnOp { operand, op: self.op })
    }
}

/// Value chosen by the predecessor that transferred control.
/// By convention `vars` has one entry per predecessor of the block
/// that evaluates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phi {
    pub vars: Vec<Variable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub fun_id: FunctionId,
    pub params: Vec<AtomId>,
}

/// Value-producing node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Atom(Atom),
    BinOp(BinOp),
    UnOp(UnOp),
    Phi(Phi),
    Call(Call),
}

impl Expr {
    pub fn kind(&self) -> NodeKind {
        match self {
            Expr::Atom(atom) => atom.kind(),
            Expr::BinOp(_) => NodeKind::BinOp,
            Expr::UnOp(_) => NodeKind::UnOp,
            Expr::Phi(_) => NodeKind::Phi,
            Expr::Call(_) => NodeKind::Call,
        }
    }

    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Expr::Atom(atom) => Some(atom),
            _ => None,
        }
    }

    /// Handles this node reads, in field order
    pub fn operands(&self) -> Vec<ExprId> {
        match self {
            Expr::Atom(_) | Expr::Phi(_) => Vec::new(),
            Expr::BinOp(bin) => vec![bin.left, bin.right],
            Expr::UnOp(un) => vec![un.operand],
            Expr::Call(call) => call.params.iter().map(|p| p.expr()).collect(),
        }
    }

    /// Operand handles that must name atoms
    pub(crate) fn atom_operands(&self) -> Vec<AtomId> {
        match self {
            Expr::Call(call) => call.params.clone(),
            _ => Vec::new(),
        }
    }

    /// Rebuild with every operand handle passed through `map`
    pub fn map_operands(&self, mut map: impl FnMut(ExprId) -> IrResult<ExprId>) -> IrResult<Expr> {
        Ok(match self {
            Expr::Atom(atom) => Expr::Atom(atom.clone()),
            Expr::BinOp(bin) => Expr::BinOp(BinOp {
                left: map(bin.left)?,
                right: map(bin.right)?,
                op: bin.op,
            }),
            Expr::UnOp(un) => Expr::UnOp(UnOp {
                operand: map(un.operand)?,
                op: un.op,
            }),
            Expr::Phi(phi) => Expr::Phi(phi.clone()),
            Expr::Call(call) => {
                let mut params = Vec::with_capacity(call.params.len());
                for param in &call.params {
                    params.push(AtomId::from_expr(map(param.expr())?));
                }
                Expr::Call(Call { fun_id: call.fun_id, params })
            }
        })
    }
}

impl From<Atom> for Expr {
    fn from(atom: Atom) -> Self {
        Expr::Atom(atom)
    }
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub var: Variable,
    pub value: ExprId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Return {
    pub atom: AtomId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Print {
    pub atom: AtomId,
}

/// Side-effecting node, ordered within its block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statement {
    Assignment(Assignment),
    Return(Return),
    Print(Print),
}

impl Statement {
    pub fn kind(&self) -> NodeKind {
        match self {
            Statement::Assignment(_) => NodeKind::Assignment,
            Statement::Return(_) => NodeKind::Return,
            Statement::Print(_) => NodeKind::Print,
        }
    }

    pub fn operands(&self) -> Vec<ExprId> {
        match self {
            Statement::Assignment(assign) => vec![assign.value],
            Statement::Return(ret) => vec![ret.atom.expr()],
            Statement::Print(print) => vec![print.atom.expr()],
        }
    }

    pub(crate) fn atom_operands(&self) -> Vec<AtomId> {
        match self {
            Statement::Assignment(_) => Vec::new(),
            Statement::Return(ret) => vec![ret.atom],
            Statement::Print(print) => vec![print.atom],
        }
    }

    pub fn map_operands(&self, mut map: impl FnMut(ExprId) -> IrResult<ExprId>) -> IrResult<Statement> {
        Ok(match self {
            Statement::Assignment(assign) => Statement::Assignment(Assignment {
                var: assign.var,
                value: map(assign.value)?,
            }),
            Statement::Return(ret) => Statement::Return(Return {
                atom: AtomId::from_expr(map(ret.atom.expr())?),
            }),
            Statement::Print(print) => Statement::Print(Print {
                atom: AtomId::from_expr(map(print.atom.expr())?),
            }),
        })
    }
}

// ---------------------------------------------------------------------------
// Jumps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JumpAlways {
    pub destination: BlockId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JumpCond {
    pub yes: BlockId,
    pub no: BlockId,
    pub condition: AtomId,
}

/// Block-terminating control transfer. Targets are handles into the
/// function's block arena and never own the blocks they name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Jump {
    Always(JumpAlways),
    Cond(JumpCond),
}

impl Jump {
    pub fn kind(&self) -> NodeKind {
        match self {
            Jump::Always(_) => NodeKind::JumpAlways,
            Jump::Cond(_) => NodeKind::JumpCond,
        }
    }

    /// Distinct successor blocks, `yes` before `no`
    pub fn targets(&self) -> Vec<BlockId> {
        match self {
            Jump::Always(jump) => vec![jump.destination],
            Jump::Cond(jump) if jump.yes == jump.no => vec![jump.yes],
            Jump::Cond(jump) => vec![jump.yes, jump.no],
        }
    }

    pub fn condition(&self) -> Option<AtomId> {
        match self {
            Jump::Always(_) => None,
            Jump::Cond(jump) => Some(jump.condition),
        }
    }

    pub fn map_condition(&self, map: impl FnOnce(ExprId) -> IrResult<ExprId>) -> IrResult<Jump> {
        Ok(match self {
            Jump::Always(jump) => Jump::Always(*jump),
            Jump::Cond(jump) => Jump::Cond(JumpCond {
                yes: jump.yes,
                no: jump.no,
                condition: AtomId::from_expr(map(jump.condition.expr())?),
            }),
        })
    }
}
