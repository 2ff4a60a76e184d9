//! Visitor protocol
//!
//! Double dispatch over the closed node-kind set. A node is borrowed as a
//! [`NodeRef`] and `accept` routes it to the visitor method of exactly its
//! kind. `IrVisitor` has no default methods, so adding a kind to the set is a
//! compile error in every visitor until it handles the new kind.
//!
//! [`walk_function`] drives a visitor over a whole function in a canonical
//! order, visiting every shared expression node once.

use log::trace;
use mvm_common::{IrError, IrResult};
use crate::blocks::Block;
use crate::function::FunctionRecord;
use crate::module::Module;
use crate::nodes::{
    Assignment, Atom, BinOp, BlockId, Call, Double, Expr, ExprId, Int, Jump, JumpAlways,
    JumpCond, NodeKind, Phi, Print, Ptr, Return, Statement, UnOp, Variable,
};

/// One operation per node kind
pub trait IrVisitor {
    type Output;

    fn visit_variable(&mut self, node: &Variable) -> Self::Output;
    fn visit_int(&mut self, node: &Int) -> Self::Output;
    fn visit_double(&mut self, node: &Double) -> Self::Output;
    fn visit_ptr(&mut self, node: &Ptr) -> Self::Output;
    fn visit_bin_op(&mut self, node: &BinOp) -> Self::Output;
    fn visit_un_op(&mut self, node: &UnOp) -> Self::Output;
    fn visit_phi(&mut self, node: &Phi) -> Self::Output;
    fn visit_call(&mut self, node: &Call) -> Self::Output;
    fn visit_assignment(&mut self, node: &Assignment) -> Self::Output;
    fn visit_return(&mut self, node: &Return) -> Self::Output;
    fn visit_print(&mut self, node: &Print) -> Self::Output;
    fn visit_jump_always(&mut self, node: &JumpAlways) -> Self::Output;
    fn visit_jump_cond(&mut self, node: &JumpCond) -> Self::Output;
    fn visit_block(&mut self, node: &Block) -> Self::Output;
    fn visit_function(&mut self, node: &FunctionRecord) -> Self::Output;
}

/// Borrowed view of any node, tagged with its concrete kind
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Variable(&'a Variable),
    Int(&'a Int),
    Double(&'a Double),
    Ptr(&'a Ptr),
    BinOp(&'a BinOp),
    UnOp(&'a UnOp),
    Phi(&'a Phi),
    Call(&'a Call),
    Assignment(&'a Assignment),
    Return(&'a Return),
    Print(&'a Print),
    JumpAlways(&'a JumpAlways),
    JumpCond(&'a JumpCond),
    Block(&'a Block),
    Function(&'a FunctionRecord),
}

impl<'a> NodeRef<'a> {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeRef::Variable(_) => NodeKind::Variable,
            NodeRef::Int(_) => NodeKind::Int,
            NodeRef::Double(_) => NodeKind::Double,
            NodeRef::Ptr(_) => NodeKind::Ptr,
            NodeRef::BinOp(_) => NodeKind::BinOp,
            NodeRef::UnOp(_) => NodeKind::UnOp,
            NodeRef::Phi(_) => NodeKind::Phi,
            NodeRef::Call(_) => NodeKind::Call,
            NodeRef::Assignment(_) => NodeKind::Assignment,
            NodeRef::Return(_) => NodeKind::Return,
            NodeRef::Print(_) => NodeKind::Print,
            NodeRef::JumpAlways(_) => NodeKind::JumpAlways,
            NodeRef::JumpCond(_) => NodeKind::JumpCond,
            NodeRef::Block(_) => NodeKind::Block,
            NodeRef::Function(_) => NodeKind::FunctionRecord,
        }
    }

    /// Route this node to the visitor method of its own kind
    pub fn accept<V: IrVisitor + ?Sized>(self, visitor: &mut V) -> V::Output {
        match self {
            NodeRef::Variable(node) => visitor.visit_variable(node),
            NodeRef::Int(node) => visitor.visit_int(node),
            NodeRef::Double(node) => visitor.visit_double(node),
            NodeRef::Ptr(node) => visitor.visit_ptr(node),
            NodeRef::BinOp(node) => visitor.visit_bin_op(node),
            NodeRef::UnOp(node) => visitor.visit_un_op(node),
            NodeRef::Phi(node) => visitor.visit_phi(node),
            NodeRef::Call(node) => visitor.visit_call(node),
            NodeRef::Assignment(node) => visitor.visit_assignment(node),
            NodeRef::Return(node) => visitor.visit_return(node),
            NodeRef::Print(node) => visitor.visit_print(node),
            NodeRef::JumpAlways(node) => visitor.visit_jump_always(node),
            NodeRef::JumpCond(node) => visitor.visit_jump_cond(node),
            NodeRef::Block(node) => visitor.visit_block(node),
            NodeRef::Function(node) => visitor.visit_function(node),
        }
    }
}

impl<'a> From<&'a Atom> for NodeRef<'a> {
    fn from(atom: &'a Atom) -> Self {
        match atom {
            Atom::Variable(node) => NodeRef::Variable(node),
            Atom::Int(node) => NodeRef::Int(node),
            Atom::Double(node) => NodeRef::Double(node),
            Atom::Ptr(node) => NodeRef::Ptr(node),
        }
    }
}

impl<'a> From<&'a Expr> for NodeRef<'a> {
    fn from(expr: &'a Expr) -> Self {
        match expr {
            Expr::Atom(atom) => atom.into(),
            Expr::BinOp(node) => NodeRef::BinOp(node),
            Expr::UnOp(node) => NodeRef::UnOp(node),
            Expr::Phi(node) => NodeRef::Phi(node),
            Expr::Call(node) => NodeRef::Call(node),
        }
    }
}

impl<'a> From<&'a Statement> for NodeRef<'a> {
    fn from(stmt: &'a Statement) -> Self {
        match stmt {
            Statement::Assignment(node) => NodeRef::Assignment(node),
            Statement::Return(node) => NodeRef::Return(node),
            Statement::Print(node) => NodeRef::Print(node),
        }
    }
}

impl<'a> From<&'a Jump> for NodeRef<'a> {
    fn from(jump: &'a Jump) -> Self {
        match jump {
            Jump::Always(node) => NodeRef::JumpAlways(node),
            Jump::Cond(node) => NodeRef::JumpCond(node),
        }
    }
}

impl<'a> From<&'a Block> for NodeRef<'a> {
    fn from(block: &'a Block) -> Self {
        NodeRef::Block(block)
    }
}

impl<'a> From<&'a FunctionRecord> for NodeRef<'a> {
    fn from(func: &'a FunctionRecord) -> Self {
        NodeRef::Function(func)
    }
}

macro_rules! impl_accept {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $ty {
                pub fn accept<V: IrVisitor + ?Sized>(&self, visitor: &mut V) -> V::Output {
                    NodeRef::from(self).accept(visitor)
                }
            }
        )*
    };
}

impl_accept!(Atom, Expr, Statement, Jump, Block, FunctionRecord);

/// Address of a node inside one function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Expr(ExprId),
    Statement(BlockId, usize),
    Transition(BlockId),
    Block(BlockId),
    Function,
}

impl FunctionRecord {
    /// Resolve a node address; a handle that names nothing cannot be dispatched
    pub fn node(&self, id: NodeId) -> IrResult<NodeRef<'_>> {
        let unknown = || IrError::unknown_node(format!("{id:?} in function {}", self.id));
        match id {
            NodeId::Expr(expr) => self.expr(expr).map(NodeRef::from).ok_or_else(unknown),
            NodeId::Statement(block, index) => self
                .block(block)
                .and_then(|b| b.contents().get(index))
                .map(NodeRef::from)
                .ok_or_else(unknown),
            NodeId::Transition(block) => self
                .block(block)
                .and_then(Block::transition)
                .map(NodeRef::from)
                .ok_or_else(unknown),
            NodeId::Block(block) => self.block(block).map(NodeRef::from).ok_or_else(unknown),
            NodeId::Function => Ok(NodeRef::Function(self)),
        }
    }

    /// Dispatch the node at `id` to `visitor`
    pub fn dispatch<V: IrVisitor + ?Sized>(&self, id: NodeId, visitor: &mut V) -> IrResult<V::Output> {
        Ok(self.node(id)?.accept(visitor))
    }
}

/// Visit a whole function in canonical order.
///
/// The function first, then each reachable block in preorder: the block,
/// for each statement the expressions it reaches (operands before users)
/// followed by the statement, then the transition's condition and the
/// transition. An expression shared by several users is visited once.
pub fn walk_function<V: IrVisitor + ?Sized>(func: &FunctionRecord, visitor: &mut V) -> IrResult<Vec<V::Output>> {
    let mut walker = Walker {
        func,
        seen: vec![false; func.exprs().len()],
        out: Vec::new(),
    };
    walker.out.push(func.accept(visitor));

    for id in func.reachable_blocks() {
        let block = &func.blocks()[id.index()];
        trace!("walk fn {} block '{}'", func.id, block.name);
        walker.out.push(block.accept(visitor));

        for stmt in block.contents() {
            for operand in stmt.operands() {
                walker.expr(operand, visitor)?;
            }
            walker.out.push(stmt.accept(visitor));
        }
        if let Some(jump) = block.transition() {
            if let Some(condition) = jump.condition() {
                walker.expr(condition.expr(), visitor)?;
            }
            walker.out.push(jump.accept(visitor));
        }
    }
    Ok(walker.out)
}

/// Walk every function of the module in order
pub fn walk_module<V: IrVisitor + ?Sized>(module: &Module, visitor: &mut V) -> IrResult<Vec<V::Output>> {
    let mut out = Vec::new();
    for func in module.functions() {
        out.extend(walk_function(func, visitor)?);
    }
    Ok(out)
}

struct Walker<'a, O> {
    func: &'a FunctionRecord,
    seen: Vec<bool>,
    out: Vec<O>,
}

impl<'a, O> Walker<'a, O> {
    /// Visit `root` and everything it reaches, operands before users.
    /// Explicit stack: operator chains may be arbitrarily long.
    fn expr<V: IrVisitor<Output = O> + ?Sized>(&mut self, root: ExprId, visitor: &mut V) -> IrResult<()> {
        let mut stack = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            let expr = self.func.expr(id).ok_or_else(|| {
                IrError::unknown_node(format!("expression {id} in function {}", self.func.id))
            })?;
            if expanded {
                self.out.push(expr.accept(visitor));
                continue;
            }
            if self.seen[id.index()] {
                continue;
            }
            self.seen[id.index()] = true;
            stack.push((id, true));
            for operand in expr.operands().into_iter().rev() {
                stack.push((operand, false));
            }
        }
        Ok(())
    }
}
