//! Rewriting passes
//!
//! A rewriting pass is any visitor whose output is [`Rewritten`]. The pass
//! driver never mutates its input: it builds a new function, asks the visitor
//! for a replacement of every expression, statement and transition, and
//! re-links the new blocks through the ordinary linking operations so that
//! predecessor lists are rebuilt rather than copied.
//!
//! Handles are preserved one-to-one: expression `%n` of the input becomes
//! expression `%n` of the output, block `bbn` stays `bbn`. A replacement may
//! therefore refer to any handle of the input that precedes it.

use log::{debug, trace};
use mvm_common::{IrError, IrResult};
use crate::blocks::Block;
use crate::function::FunctionRecord;
use crate::module::Module;
use crate::nodes::{
    Assignment, Atom, BinOp, Call, Double, Expr, ExprId, Int, Jump, JumpAlways, JumpCond,
    Phi, Print, Ptr, Return, Statement, UnOp, Variable,
};
use crate::visitor::IrVisitor;

/// Replacement produced by a rewriting visitor for one node
#[derive(Debug, Clone, PartialEq)]
pub enum Rewritten {
    /// Leave the node as it is
    Keep,
    Atom(Atom),
    Expr(Expr),
    Statement(Statement),
    Jump(Jump),
}

impl Rewritten {
    fn describe(&self) -> &'static str {
        match self {
            Rewritten::Keep => "nothing",
            Rewritten::Atom(_) => "an atom",
            Rewritten::Expr(_) => "an expression",
            Rewritten::Statement(_) => "a statement",
            Rewritten::Jump(_) => "a jump",
        }
    }
}

/// Returns a copy of every node it is given
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityRewriter;

impl IrVisitor for IdentityRewriter {
    type Output = Rewritten;

    fn visit_variable(&mut self, node: &Variable) -> Rewritten {
        Rewritten::Atom(Atom::Variable(*node))
    }

    fn visit_int(&mut self, node: &Int) -> Rewritten {
        Rewritten::Atom(Atom::Int(*node))
    }

    fn visit_double(&mut self, node: &Double) -> Rewritten {
        Rewritten::Atom(Atom::Double(*node))
    }

    fn visit_ptr(&mut self, node: &Ptr) -> Rewritten {
        Rewritten::Atom(Atom::Ptr(*node))
    }

    fn visit_bin_op(&mut self, node: &BinOp) -> Rewritten {
        Rewritten::Expr(Expr::BinOp(*node))
    }

    fn visit_un_op(&mut self, node: &UnOp) -> Rewritten {
        Rewritten::Expr(Expr::UnOp(*node))
    }

    fn visit_phi(&mut self, node: &Phi) -> Rewritten {
        Rewritten::Expr(Expr::Phi(node.clone()))
    }

    fn visit_call(&mut self, node: &Call) -> Rewritten {
        Rewritten::Expr(Expr::Call(node.clone()))
    }

    fn visit_assignment(&mut self, node: &Assignment) -> Rewritten {
        Rewritten::Statement(Statement::Assignment(node.clone()))
    }

    fn visit_return(&mut self, node: &Return) -> Rewritten {
        Rewritten::Statement(Statement::Return(node.clone()))
    }

    fn visit_print(&mut self, node: &Print) -> Rewritten {
        Rewritten::Statement(Statement::Print(node.clone()))
    }

    fn visit_jump_always(&mut self, node: &JumpAlways) -> Rewritten {
        Rewritten::Jump(Jump::Always(*node))
    }

    fn visit_jump_cond(&mut self, node: &JumpCond) -> Rewritten {
        Rewritten::Jump(Jump::Cond(*node))
    }

    fn visit_block(&mut self, _node: &Block) -> Rewritten {
        Rewritten::Keep
    }

    fn visit_function(&mut self, _node: &FunctionRecord) -> Rewritten {
        Rewritten::Keep
    }
}

/// Build a new function from `func` with every node passed through `rewriter`
pub fn rewrite_function<V>(func: &FunctionRecord, rewriter: &mut V) -> IrResult<FunctionRecord>
where
    V: IrVisitor<Output = Rewritten> + ?Sized,
{
    debug!("Rewriting function {}", func.id);
    if let Some(other) = structural(func.accept(rewriter)) {
        return Err(IrError::malformed("FunctionRecord", format!("function {} rewritten into {other}", func.id)));
    }

    let mut out = FunctionRecord::new(func.id, func.return_type);
    out.parameters = func.parameters.clone();
    out.pool = func.pool.clone();
    for (id, block) in func.block_iter() {
        if let Some(other) = structural(block.accept(rewriter)) {
            return Err(IrError::malformed("Block", format!("block '{}' rewritten into {other}", block.name)));
        }
        if id == func.entry() {
            out.rename_block(out.entry(), block.name.clone())?;
        } else {
            out.new_block(block.name.clone());
        }
    }

    for (id, expr) in func.expr_iter() {
        let replacement = match expr.accept(rewriter) {
            Rewritten::Keep => expr.clone(),
            Rewritten::Atom(atom) => Expr::Atom(atom),
            Rewritten::Expr(new) if expr.as_atom().is_some() && new.as_atom().is_none() => {
                return Err(IrError::malformed(
                    expr.kind().to_string(),
                    format!("atom {id} rewritten into a {} node", new.kind()),
                ));
            }
            Rewritten::Expr(new) => new,
            other => {
                return Err(IrError::malformed(
                    expr.kind().to_string(),
                    format!("expression {id} rewritten into {}", other.describe()),
                ));
            }
        };
        let replacement = replacement.map_operands(|operand| earlier(id, operand))?;
        trace!("fn {}: {id} -> {:?}", func.id, replacement);
        out.add_expr(replacement)?;
    }

    for (id, block) in func.block_iter() {
        for stmt in block.contents() {
            let replacement = match stmt.accept(rewriter) {
                Rewritten::Keep => stmt.clone(),
                Rewritten::Statement(new) => new,
                other => {
                    return Err(IrError::malformed(
                        stmt.kind().to_string(),
                        format!("statement in '{}' rewritten into {}", block.name, other.describe()),
                    ));
                }
            };
            out.push_statement(id, replacement)?;
        }
    }

    for (id, block) in func.block_iter() {
        let Some(jump) = block.transition() else {
            continue;
        };
        let replacement = match jump.accept(rewriter) {
            Rewritten::Keep => *jump,
            Rewritten::Jump(new) => new,
            other => {
                return Err(IrError::malformed(
                    jump.kind().to_string(),
                    format!("transition of '{}' rewritten into {}", block.name, other.describe()),
                ));
            }
        };
        out.apply_link(id, replacement)?;
    }

    Ok(out)
}

/// Rewrite every function of a module into a new module
pub fn rewrite_module<V>(module: &Module, rewriter: &mut V) -> IrResult<Module>
where
    V: IrVisitor<Output = Rewritten> + ?Sized,
{
    module
        .functions()
        .iter()
        .map(|func| rewrite_function(func, rewriter))
        .collect()
}

/// Blocks and functions are rebuilt by the driver, never replaced
fn structural(result: Rewritten) -> Option<&'static str> {
    match result {
        Rewritten::Keep => None,
        other => Some(other.describe()),
    }
}

fn earlier(user: ExprId, operand: ExprId) -> IrResult<ExprId> {
    if operand < user {
        Ok(operand)
    } else {
        Err(IrError::malformed(
            "Expr",
            format!("replacement for {user} refers to {operand}, which does not precede it"),
        ))
    }
}
