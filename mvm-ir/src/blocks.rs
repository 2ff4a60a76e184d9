//! Basic Block Management
//!
//! Defines basic blocks - ordered statements closed by a single transition.
//! The transition and the predecessor list are written only by the linking
//! operations of the owning function.

use serde::{Deserialize, Serialize};
use crate::nodes::{BlockId, Jump, Statement};

/// Basic Block - a sequence of statements with a single exit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    contents: Vec<Statement>,
    transition: Option<Jump>,
    predecessors: Vec<BlockId>,
}

impl Block {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: Vec::new(),
            transition: None,
            predecessors: Vec::new(),
        }
    }

    /// Statements in program order
    pub fn contents(&self) -> &[Statement] {
        &self.contents
    }

    pub fn transition(&self) -> Option<&Jump> {
        self.transition.as_ref()
    }

    /// Blocks whose transition names this block, in link order
    pub fn predecessors(&self) -> &[BlockId] {
        &self.predecessors
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn is_linked(&self) -> bool {
        self.transition.is_some()
    }

    /// Check if the last statement leaves the function
    pub fn ends_with_return(&self) -> bool {
        matches!(self.contents.last(), Some(Statement::Return(_)))
    }

    /// A block is complete once it has a transition or returns
    pub fn is_terminated(&self) -> bool {
        self.is_linked() || self.ends_with_return()
    }

    pub(crate) fn push_statement(&mut self, stmt: Statement) {
        self.contents.push(stmt);
    }

    pub(crate) fn set_transition(&mut self, jump: Jump) {
        debug_assert!(self.transition.is_none(), "transition of '{}' set twice", self.name);
        self.transition = Some(jump);
    }

    pub(crate) fn add_predecessor(&mut self, pred: BlockId) {
        if !self.predecessors.contains(&pred) {
            self.predecessors.push(pred);
        }
    }
}
