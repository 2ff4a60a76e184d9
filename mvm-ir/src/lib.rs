//! MathVM IR - Intermediate Representation
//! 
//! This crate defines the typed, control-flow-graph based representation
//! that sits between the front end and the bytecode generator or
//! interpreter.
//! 
//! ## Architecture
//! 
//! - `ops` - Closed binary and unary operator taxonomy
//! - `nodes` - Atoms, expressions, statements, jumps and their arena handles
//! - `blocks` - Basic blocks with a single transition and predecessor list
//! - `function` - Function records owning the expression and block arenas
//! - `module` - The ordered list of functions of one program
//! - `visitor` - Double-dispatch visitor protocol and canonical walk
//! - `rewrite` - Driver for passes that produce a new function
//! - `printer` - Textual rendering
//! - `verify` - Structural invariant checks

pub mod ops;
pub mod nodes;
pub mod blocks;
pub mod function;
pub mod module;
pub mod visitor;
pub mod rewrite;
pub mod printer;
pub mod verify;

#[cfg(test)]
mod tests;

pub use ops::{BinaryOp, UnaryOp, Operator};
pub use nodes::{
    Assignment, Atom, AtomId, BinOp, BinOpBuilder, BlockId, Call, Double, Expr, ExprId, Int,
    Jump, JumpAlways, JumpCond, NodeKind, Phi, Print, Ptr, Return, Statement, UnOp,
    UnOpBuilder, Variable,
};
pub use blocks::Block;
pub use function::{FunctionRecord, StringPool};
pub use module::Module;
pub use visitor::{walk_function, walk_module, IrVisitor, NodeId, NodeRef};
pub use rewrite::{rewrite_function, rewrite_module, IdentityRewriter, Rewritten};
pub use printer::{print_function, PrintOptions};
pub use verify::{verify_function, verify_module, VerifyError, VerifyOptions, VerifyResult};
pub use mvm_common::{FunctionId, IrError, IrResult, PoolIndex, VarId, VarType};

/// Load a module persisted with serde's derived JSON shape.
///
/// Deserialization bypasses the builders, so callers should run
/// [`verify_module`] before handing the result to a pass.
pub fn module_from_json(text: &str) -> Result<Module, serde_json::Error> {
    serde_json::from_str(text)
}

/// Persist a module with serde's derived JSON shape
pub fn module_to_json(module: &Module) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(module)
}
