//! IR Module
//!
//! The root of the representation: every function of one compiled program,
//! in emission order. Functions are read-only once added; resolving a call's
//! function id to a record is left to the consumer.

use log::debug;
use serde::{Deserialize, Serialize};
use crate::function::FunctionRecord;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    functions: Vec<FunctionRecord>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a finished function into the module
    pub fn add_function(&mut self, function: FunctionRecord) {
        debug!(
            "Emitting function {} ({} blocks, {} expressions)",
            function.id,
            function.blocks().len(),
            function.exprs().len(),
        );
        self.functions.push(function);
    }

    pub fn functions(&self) -> &[FunctionRecord] {
        &self.functions
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl FromIterator<FunctionRecord> for Module {
    fn from_iter<I: IntoIterator<Item = FunctionRecord>>(iter: I) -> Self {
        let mut module = Module::new();
        for function in iter {
            module.add_function(function);
        }
        module
    }
}
