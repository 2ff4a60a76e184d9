//! IR verifier: checks structural invariants of the IR.
//!
//! Graphs built through `FunctionRecord` satisfy most of these by
//! construction. The verifier exists for graphs that did not go through the
//! builders (deserialized modules, hand-written passes) and for the
//! conventions the core cannot enforce at construction time, such as phi
//! arity.

use std::collections::HashSet;
use std::fmt;
use log::warn;
use mvm_common::FunctionId;
use crate::function::FunctionRecord;
use crate::module::Module;
use crate::nodes::{Atom, AtomId, BlockId, Expr, Statement};

/// Which optional checks to run
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Reachable blocks must have a transition or end with `return`
    pub require_terminators: bool,
    /// A phi must have one variable per predecessor of its block
    pub check_phi_arity: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            require_terminators: true,
            check_phi_arity: true,
        }
    }
}

/// Result of IR verification.
#[derive(Debug, Default)]
pub struct VerifyResult {
    pub errors: Vec<VerifyError>,
}

impl VerifyResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A single verification error.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyError {
    pub message: String,
    pub function: FunctionId,
    pub block: Option<BlockId>,
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.block {
            Some(block) => write!(f, "verify error in fn {} {}: {}", self.function, block, self.message),
            None => write!(f, "verify error in fn {}: {}", self.function, self.message),
        }
    }
}

/// Verify an entire module.
pub fn verify_module(module: &Module, options: &VerifyOptions) -> VerifyResult {
    let mut result = VerifyResult::default();

    let mut ids = HashSet::new();
    for func in module.functions() {
        if !ids.insert(func.id) {
            result.errors.push(VerifyError {
                message: format!("duplicate function id {}", func.id),
                function: func.id,
                block: None,
            });
        }
    }

    for func in module.functions() {
        result.errors.extend(verify_function(func, options).errors);

        for (id, expr) in func.expr_iter() {
            if let Expr::Call(call) = expr {
                if !ids.contains(&call.fun_id) {
                    result.errors.push(VerifyError {
                        message: format!("call {id} targets unknown function {}", call.fun_id),
                        function: func.id,
                        block: None,
                    });
                }
            }
        }
    }

    result
}

/// Verify one function.
pub fn verify_function(func: &FunctionRecord, options: &VerifyOptions) -> VerifyResult {
    let mut checker = Checker { func, errors: Vec::new() };

    checker.check_expressions();
    checker.check_statements();
    checker.check_predecessors();
    if options.require_terminators {
        checker.check_terminators();
    }
    if options.check_phi_arity {
        checker.check_phi_arity();
    }

    if !checker.errors.is_empty() {
        warn!("fn {}: {} verification error(s)", func.id, checker.errors.len());
    }
    VerifyResult { errors: checker.errors }
}

struct Checker<'a> {
    func: &'a FunctionRecord,
    errors: Vec<VerifyError>,
}

impl Checker<'_> {
    fn error(&mut self, block: Option<BlockId>, message: String) {
        self.errors.push(VerifyError { message, function: self.func.id, block });
    }

    fn check_atom_handle(&mut self, block: Option<BlockId>, user: &str, atom: AtomId) {
        match self.func.expr(atom.expr()) {
            None => self.error(block, format!("{user} refers to missing expression {atom}")),
            Some(Expr::Atom(_)) => {}
            Some(other) => self.error(block, format!("{user} expects an atom at {atom}, found {}", other.kind())),
        }
    }

    fn check_block_handle(&mut self, block: BlockId, target: BlockId) {
        if self.func.block(target).is_none() {
            self.error(Some(block), format!("jump targets missing block {target}"));
        }
    }

    /// Operands exist, precede their users, and atom slots hold atoms
    fn check_expressions(&mut self) {
        let func = self.func;
        for (id, expr) in func.expr_iter() {
            for operand in expr.operands() {
                if operand >= id {
                    self.error(None, format!("{id} uses {operand}, which does not precede it"));
                }
            }
            match expr {
                Expr::Call(call) => {
                    for param in &call.params {
                        self.check_atom_handle(None, &format!("call {id}"), *param);
                    }
                }
                Expr::Phi(phi) if phi.vars.is_empty() => {
                    self.error(None, format!("phi {id} has no variables"));
                }
                Expr::Atom(Atom::Ptr(ptr)) if ptr.is_pooled_string && func.pool_string(ptr.value).is_none() => {
                    self.error(None, format!(
                        "{id} references pool entry {} but the pool has {} entries",
                        ptr.value,
                        func.pool.len(),
                    ));
                }
                _ => {}
            }
        }
    }

    fn check_statements(&mut self) {
        let func = self.func;
        if func.blocks().is_empty() {
            self.error(None, "function has no entry block".to_string());
        }
        for (id, block) in func.block_iter() {
            for stmt in block.contents() {
                match stmt {
                    Statement::Assignment(assign) => {
                        if func.expr(assign.value).is_none() {
                            self.error(Some(id), format!("assignment to {} uses missing {}", assign.var, assign.value));
                        }
                    }
                    Statement::Return(ret) => self.check_atom_handle(Some(id), "return", ret.atom),
                    Statement::Print(print) => self.check_atom_handle(Some(id), "print", print.atom),
                }
            }
            if let Some(jump) = block.transition() {
                for target in jump.targets() {
                    self.check_block_handle(id, target);
                }
                if let Some(condition) = jump.condition() {
                    self.check_atom_handle(Some(id), "conditional jump", condition);
                }
            }
        }
    }

    /// Predecessor lists must be exactly the inverse of the transition edges
    fn check_predecessors(&mut self) {
        let func = self.func;
        let mut expected: Vec<Vec<BlockId>> = vec![Vec::new(); func.blocks().len()];
        for (id, block) in func.block_iter() {
            if let Some(jump) = block.transition() {
                for target in jump.targets() {
                    if let Some(preds) = expected.get_mut(target.index()) {
                        preds.push(id);
                    }
                }
            }
        }

        for (id, block) in func.block_iter() {
            let actual = block.predecessors();
            let mut seen = HashSet::new();
            for pred in actual {
                if !seen.insert(*pred) {
                    self.error(Some(id), format!("predecessor {pred} listed twice"));
                }
            }
            let wanted = &expected[id.index()];
            for pred in wanted {
                if !actual.contains(pred) {
                    self.error(Some(id), format!("missing predecessor {pred}"));
                }
            }
            for pred in actual {
                if !wanted.contains(pred) {
                    self.error(Some(id), format!("{pred} is listed as predecessor but does not jump here"));
                }
            }
        }
    }

    fn check_terminators(&mut self) {
        let func = self.func;
        for id in func.reachable_blocks() {
            if !func.blocks()[id.index()].is_terminated() {
                self.error(Some(id), "block has no transition and does not return".to_string());
            }
        }
    }

    /// A phi assigned in a block has one variable per predecessor
    fn check_phi_arity(&mut self) {
        let func = self.func;
        for (id, block) in func.block_iter() {
            for stmt in block.contents() {
                let Statement::Assignment(assign) = stmt else {
                    continue;
                };
                if let Some(Expr::Phi(phi)) = func.expr(assign.value) {
                    let preds = block.predecessors().len();
                    if phi.vars.len() != preds {
                        self.error(Some(id), format!(
                            "phi {} assigned to {} has {} variables for {preds} predecessors",
                            assign.value,
                            assign.var,
                            phi.vars.len(),
                        ));
                    }
                }
            }
        }
    }
}
