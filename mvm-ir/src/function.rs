//! Function Records
//!
//! A `FunctionRecord` is one compiled function: its identity, declared
//! return kind, parameter order, string pool and the two arenas that hold
//! its expression graph and its block graph.
//!
//! All construction goes through this type so that handles are checked
//! against the arena that owns them, and so that linking is the single
//! place where a transition and the matching predecessor entries are
//! written together.

use log::{debug, trace};
use mvm_common::{FunctionId, IrError, IrResult, PoolIndex, VarId, VarType};
use serde::{Deserialize, Serialize};
use crate::blocks::Block;
use crate::nodes::{
    Assignment, Atom, AtomId, BinOp, BlockId, Call, Double, Expr, ExprId, Int, Jump,
    JumpAlways, JumpCond, NodeKind, Phi, Print, Ptr, Return, Statement, UnOp, Variable,
};
use crate::ops::{BinaryOp, UnaryOp};

/// Ordered string constants referenced by pooled `Ptr` atoms
pub type StringPool = Vec<String>;

/// One compiled function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub id: FunctionId,
    pub return_type: VarType,
    /// Calling-convention order of the parameter variables
    pub parameters: Vec<VarId>,
    pub pool: StringPool,
    exprs: Vec<Expr>,
    blocks: Vec<Block>,
}

impl FunctionRecord {
    /// Create a function whose entry block is named after its id
    pub fn new(id: FunctionId, return_type: VarType) -> Self {
        debug!("Creating function {id} returning {return_type}");
        Self {
            id,
            return_type,
            parameters: Vec::new(),
            pool: Vec::new(),
            exprs: Vec::new(),
            blocks: vec![Block::new(id.to_string())],
        }
    }

    pub fn add_parameter(&mut self, var: VarId) {
        self.parameters.push(var);
    }

    /// Add a string to the pool, reusing an identical entry
    pub fn intern_string(&mut self, value: &str) -> PoolIndex {
        if let Some(index) = self.pool.iter().position(|s| s == value) {
            return index as PoolIndex;
        }
        self.pool.push(value.to_string());
        (self.pool.len() - 1) as PoolIndex
    }

    pub fn pool_string(&self, index: PoolIndex) -> Option<&str> {
        usize::try_from(index).ok()
            .and_then(|i| self.pool.get(i))
            .map(String::as_str)
    }

    // ---- expression arena --------------------------------------------------

    pub fn exprs(&self) -> &[Expr] {
        &self.exprs
    }

    pub fn expr(&self, id: ExprId) -> Option<&Expr> {
        self.exprs.get(id.index())
    }

    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.expr(id.expr()).and_then(Expr::as_atom)
    }

    /// Iterate the arena with handles; operands always precede their users
    pub fn expr_iter(&self) -> impl Iterator<Item = (ExprId, &Expr)> {
        self.exprs.iter().enumerate().map(|(i, e)| (ExprId::new(i as u32), e))
    }

    pub fn add_atom(&mut self, atom: Atom) -> AtomId {
        let id = self.next_expr_id();
        trace!("fn {}: {id} = {:?}", self.id, atom);
        self.exprs.push(Expr::Atom(atom));
        AtomId::from_expr(id)
    }

    /// Add an expression after checking that every operand resolves here
    pub fn add_expr(&mut self, expr: Expr) -> IrResult<ExprId> {
        self.check_expr(&expr)?;
        let id = self.next_expr_id();
        trace!("fn {}: {id} = {:?}", self.id, expr);
        self.exprs.push(expr);
        Ok(id)
    }

    pub fn var(&mut self, id: VarId) -> AtomId {
        self.add_atom(Atom::Variable(Variable::new(id)))
    }

    pub fn int(&mut self, value: i64) -> AtomId {
        self.add_atom(Atom::Int(Int { value }))
    }

    pub fn double(&mut self, value: f64) -> AtomId {
        self.add_atom(Atom::Double(Double { value }))
    }

    /// Raw address constant
    pub fn ptr(&mut self, address: u64) -> AtomId {
        self.add_atom(Atom::Ptr(Ptr { value: address, is_pooled_string: false }))
    }

    /// Intern `value` and reference it through a pooled pointer
    pub fn pooled_string(&mut self, value: &str) -> AtomId {
        let index = self.intern_string(value);
        self.add_atom(Atom::Ptr(Ptr { value: index, is_pooled_string: true }))
    }

    pub fn bin_op(&mut self, left: impl Into<ExprId>, right: impl Into<ExprId>, op: BinaryOp) -> IrResult<ExprId> {
        let node = BinOp::builder(op).left(left).right(right).finish()?;
        self.add_expr(Expr::BinOp(node))
    }

    pub fn un_op(&mut self, operand: impl Into<ExprId>, op: UnaryOp) -> IrResult<ExprId> {
        let node = UnOp::builder(op).operand(operand).finish()?;
        self.add_expr(Expr::UnOp(node))
    }

    pub fn phi(&mut self, vars: Vec<VarId>) -> IrResult<ExprId> {
        let vars = vars.into_iter().map(Variable::new).collect();
        self.add_expr(Expr::Phi(Phi { vars }))
    }

    pub fn call(&mut self, fun_id: FunctionId, params: Vec<AtomId>) -> IrResult<ExprId> {
        self.add_expr(Expr::Call(Call { fun_id, params }))
    }

    fn next_expr_id(&self) -> ExprId {
        ExprId::new(self.exprs.len() as u32)
    }

    fn check_expr(&self, expr: &Expr) -> IrResult<()> {
        let kind = expr.kind();
        for operand in expr.operands() {
            self.check_operand(kind, operand)?;
        }
        for atom in expr.atom_operands() {
            self.check_atom(kind, atom)?;
        }
        if let Expr::Phi(phi) = expr {
            if phi.vars.is_empty() {
                return Err(IrError::malformed(kind.to_string(), "phi without variables"));
            }
        }
        Ok(())
    }

    fn check_operand(&self, kind: NodeKind, operand: ExprId) -> IrResult<()> {
        if self.expr(operand).is_none() {
            return Err(IrError::malformed(
                kind.to_string(),
                format!("operand {operand} does not exist in function {}", self.id),
            ));
        }
        Ok(())
    }

    fn check_atom(&self, kind: NodeKind, atom: AtomId) -> IrResult<()> {
        self.check_operand(kind, atom.expr())?;
        if self.atom(atom).is_none() {
            return Err(IrError::malformed(
                kind.to_string(),
                format!("operand {atom} is not an atom"),
            ));
        }
        Ok(())
    }

    // ---- block arena -------------------------------------------------------

    pub fn entry(&self) -> BlockId {
        BlockId::new(0)
    }

    /// `None` only for a deserialized function that lost its blocks
    pub fn entry_block(&self) -> Option<&Block> {
        self.blocks.first()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index())
    }

    pub fn block_iter(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks.iter().enumerate().map(|(i, b)| (BlockId::new(i as u32), b))
    }

    /// Create an empty, unlinked block
    pub fn new_block(&mut self, name: impl Into<String>) -> BlockId {
        let id = BlockId::new(self.blocks.len() as u32);
        let block = Block::new(name);
        debug!("fn {}: new block {id} '{}'", self.id, block.name);
        self.blocks.push(block);
        id
    }

    /// Rename a block without touching its graph edges
    pub fn rename_block(&mut self, id: BlockId, name: impl Into<String>) -> IrResult<()> {
        self.block_mut(id, NodeKind::Block)?.name = name.into();
        Ok(())
    }

    /// Append a statement after checking that every operand resolves here
    pub fn push_statement(&mut self, block: BlockId, stmt: Statement) -> IrResult<()> {
        let kind = stmt.kind();
        for operand in stmt.operands() {
            self.check_operand(kind, operand)?;
        }
        for atom in stmt.atom_operands() {
            self.check_atom(kind, atom)?;
        }
        self.block_mut(block, kind)?.push_statement(stmt);
        Ok(())
    }

    pub fn assign(&mut self, block: BlockId, var: VarId, value: impl Into<ExprId>) -> IrResult<()> {
        let stmt = Statement::Assignment(Assignment { var: Variable::new(var), value: value.into() });
        self.push_statement(block, stmt)
    }

    pub fn ret(&mut self, block: BlockId, atom: AtomId) -> IrResult<()> {
        self.push_statement(block, Statement::Return(Return { atom }))
    }

    pub fn print(&mut self, block: BlockId, atom: AtomId) -> IrResult<()> {
        self.push_statement(block, Statement::Print(Print { atom }))
    }

    fn block_mut(&mut self, id: BlockId, kind: NodeKind) -> IrResult<&mut Block> {
        let func = self.id;
        self.blocks.get_mut(id.index()).ok_or_else(|| {
            IrError::malformed(kind.to_string(), format!("block {id} does not exist in function {func}"))
        })
    }

    fn check_block(&self, kind: NodeKind, id: BlockId) -> IrResult<()> {
        if self.block(id).is_none() {
            return Err(IrError::malformed(
                kind.to_string(),
                format!("block {id} does not exist in function {}", self.id),
            ));
        }
        Ok(())
    }

    // ---- linking -----------------------------------------------------------

    /// Close `block` with an unconditional jump to `target`
    pub fn link(&mut self, block: BlockId, target: BlockId) -> IrResult<()> {
        self.apply_link(block, Jump::Always(JumpAlways { destination: target }))
    }

    /// Close `block` with a conditional jump on `condition`
    pub fn link_cond(&mut self, block: BlockId, condition: AtomId, yes: BlockId, no: BlockId) -> IrResult<()> {
        self.apply_link(block, Jump::Cond(JumpCond { yes, no, condition }))
    }

    /// Validate everything first so a failed link leaves the graph untouched
    pub(crate) fn apply_link(&mut self, block: BlockId, jump: Jump) -> IrResult<()> {
        let kind = jump.kind();
        self.check_block(kind, block)?;
        let source = &self.blocks[block.index()];
        if source.is_linked() {
            return Err(IrError::already_linked(source.name.clone()));
        }
        for target in jump.targets() {
            self.check_block(kind, target)?;
        }
        if let Some(condition) = jump.condition() {
            self.check_atom(kind, condition)?;
        }

        for target in jump.targets() {
            self.blocks[target.index()].add_predecessor(block);
        }
        debug!(
            "fn {}: link '{}' -> {}",
            self.id,
            self.blocks[block.index()].name,
            jump.targets().iter().map(|t| self.blocks[t.index()].name.as_str()).collect::<Vec<_>>().join(", "),
        );
        self.blocks[block.index()].set_transition(jump);
        Ok(())
    }

    // ---- graph queries -----------------------------------------------------

    pub fn successors(&self, block: BlockId) -> Vec<BlockId> {
        self.block(block)
            .and_then(Block::transition)
            .map(Jump::targets)
            .unwrap_or_default()
    }

    /// Blocks reachable from the entry, depth-first preorder
    pub fn reachable_blocks(&self) -> Vec<BlockId> {
        let mut visited = vec![false; self.blocks.len()];
        let mut order = Vec::new();
        let mut stack = vec![self.entry()];

        while let Some(id) = stack.pop() {
            match visited.get(id.index()) {
                Some(false) => {}
                _ => continue,
            }
            visited[id.index()] = true;
            order.push(id);
            // Reverse so `yes` is explored before `no`
            for succ in self.successors(id).into_iter().rev() {
                if matches!(visited.get(succ.index()), Some(false)) {
                    stack.push(succ);
                }
            }
        }
        order
    }

    /// Dead blocks, in arena order
    pub fn unreachable_blocks(&self) -> Vec<BlockId> {
        let reachable = self.reachable_blocks();
        self.block_iter()
            .map(|(id, _)| id)
            .filter(|id| !reachable.contains(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_block_named_after_id() {
        let func = FunctionRecord::new(7, VarType::Bottom);
        assert_eq!(func.entry(), BlockId::new(0));
        assert_eq!(func.entry_block().unwrap().name, "7");
        assert!(func.entry_block().unwrap().predecessors().is_empty());
        assert!(func.entry_block().unwrap().transition().is_none());
    }

    #[test]
    fn test_intern_string_reuses_entries() {
        let mut func = FunctionRecord::new(0, VarType::Bottom);
        assert_eq!(func.intern_string("hello"), 0);
        assert_eq!(func.intern_string("world"), 1);
        assert_eq!(func.intern_string("hello"), 0);
        assert_eq!(func.pool, vec!["hello".to_string(), "world".to_string()]);
        assert_eq!(func.pool_string(1), Some("world"));
        assert_eq!(func.pool_string(2), None);
    }

    #[test]
    fn test_add_expr_rejects_dangling_operand() {
        let mut func = FunctionRecord::new(0, VarType::Integer);
        let one = func.int(1);
        let err = func.bin_op(one, ExprId::new(42), BinaryOp::Add).unwrap_err();
        assert!(matches!(err, IrError::MalformedNode { .. }));
        assert_eq!(func.exprs().len(), 1);
    }

    #[test]
    fn test_call_params_must_be_atoms() {
        let mut func = FunctionRecord::new(0, VarType::Integer);
        let a = func.var(1);
        let b = func.int(2);
        let sum = func.bin_op(a, b, BinaryOp::Add).unwrap();

        let forged = AtomId::from_expr(sum);
        let err = func.call(1, vec![a, forged]).unwrap_err();
        assert_eq!(err, IrError::malformed("Call", "operand %2 is not an atom"));

        assert!(func.call(1, vec![a, b]).is_ok());
    }

    #[test]
    fn test_empty_phi_is_malformed() {
        let mut func = FunctionRecord::new(0, VarType::Integer);
        assert!(func.phi(Vec::new()).is_err());
        assert!(func.phi(vec![1, 2]).is_ok());
    }

    #[test]
    fn test_push_statement_to_missing_block() {
        let mut func = FunctionRecord::new(0, VarType::Integer);
        let one = func.int(1);
        let err = func.ret(BlockId::new(5), one).unwrap_err();
        assert!(matches!(err, IrError::MalformedNode { ref kind, .. } if kind == "Return"));
    }

    #[test]
    fn test_link_to_missing_block_leaves_graph_untouched() {
        let mut func = FunctionRecord::new(0, VarType::Bottom);
        let entry = func.entry();
        assert!(func.link(entry, BlockId::new(9)).is_err());
        assert!(!func.entry_block().unwrap().is_linked());
        assert!(func.link(entry, entry).is_ok());
        assert_eq!(func.entry_block().unwrap().predecessors(), &[entry]);
    }

    #[test]
    fn test_reachability() {
        let mut func = FunctionRecord::new(0, VarType::Bottom);
        let entry = func.entry();
        let yes = func.new_block("yes");
        let no = func.new_block("no");
        let dead = func.new_block("dead");
        let join = func.new_block("join");
        let cond = func.var(1);

        func.link_cond(entry, cond, yes, no).unwrap();
        func.link(yes, join).unwrap();
        func.link(no, join).unwrap();
        func.link(dead, join).unwrap();

        assert_eq!(func.reachable_blocks(), vec![entry, yes, join, no]);
        assert_eq!(func.unreachable_blocks(), vec![dead]);
        // Dead blocks still count as predecessors until a pass prunes them
        assert_eq!(func.block(join).unwrap().predecessors(), &[yes, no, dead]);
    }
}
