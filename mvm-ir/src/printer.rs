//! Textual IR printer
//!
//! Renders functions and modules for debugging. The printer is itself a
//! visitor: every node kind knows how to render through `IrVisitor`, and
//! expression operands are rendered by dispatching on their handles.

use std::collections::HashSet;
use std::fmt;
use mvm_common::VarType;
use crate::blocks::Block;
use crate::function::FunctionRecord;
use crate::module::Module;
use crate::nodes::{
    Assignment, AtomId, BinOp, BlockId, Call, Double, ExprId, Int, JumpAlways, JumpCond, Phi,
    Print, Ptr, Return, UnOp, Variable,
};
use crate::visitor::IrVisitor;

/// Printer tunables
#[derive(Debug, Clone)]
pub struct PrintOptions {
    /// Annotate block labels with their predecessors
    pub show_predecessors: bool,
    /// Emit the string pool before the blocks
    pub show_pool: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            show_predecessors: false,
            show_pool: true,
        }
    }
}

/// Render one function
pub fn print_function(func: &FunctionRecord, options: &PrintOptions) -> String {
    let mut printer = Printer::new(func, options);
    let mut out = func.accept(&mut printer);

    if options.show_pool {
        for (index, entry) in func.pool.iter().enumerate() {
            out.push_str(&format!("  .pool {index} {entry:?}\n"));
        }
    }

    let reachable = func.reachable_blocks();
    let unreachable = func.unreachable_blocks();
    for id in reachable.iter().chain(unreachable.iter()) {
        let block = &func.blocks()[id.index()];
        out.push_str(&block.accept(&mut printer));
        if unreachable.contains(id) {
            out.push_str("  ; unreachable");
        }
        out.push('\n');
        for stmt in block.contents() {
            out.push_str(&format!("  {}\n", stmt.accept(&mut printer)));
        }
        if let Some(jump) = block.transition() {
            out.push_str(&format!("  {}\n", jump.accept(&mut printer)));
        }
    }
    out.push_str("}\n");
    out
}

struct Printer<'a> {
    func: &'a FunctionRecord,
    options: &'a PrintOptions,
    /// Text of every expression rendered so far, by arena index
    rendered: Vec<Option<String>>,
    /// Expression being rendered; its operands must precede it
    user: Option<ExprId>,
}

impl<'a> Printer<'a> {
    fn new(func: &'a FunctionRecord, options: &'a PrintOptions) -> Self {
        Self {
            func,
            options,
            rendered: vec![None; func.exprs().len()],
            user: None,
        }
    }

    fn expr(&mut self, id: ExprId) -> String {
        self.render(id);
        self.rendered
            .get(id.index())
            .cloned()
            .flatten()
            .unwrap_or_else(|| format!("<invalid {id}>"))
    }

    fn atom(&mut self, id: AtomId) -> String {
        self.expr(id.expr())
    }

    /// Render `root` and the operands it reaches in ascending arena order,
    /// so no expression is rendered before its operands
    fn render(&mut self, root: ExprId) {
        let func = self.func;
        let mut queued = HashSet::new();
        let mut pending = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(expr) = func.expr(id) else {
                continue;
            };
            if self.rendered[id.index()].is_some() || !queued.insert(id) {
                continue;
            }
            pending.push(id);
            stack.extend(expr.operands().into_iter().filter(|operand| *operand < id));
        }

        pending.sort_unstable();
        for id in pending {
            if let Some(expr) = func.expr(id) {
                self.user = Some(id);
                let text = expr.accept(self);
                self.rendered[id.index()] = Some(text);
            }
        }
        self.user = None;
    }

    /// An operand that does not precede its user is never followed
    fn operand(&self, id: ExprId) -> String {
        let text = match self.user {
            Some(user) if id < user => self.rendered.get(id.index()).cloned().flatten(),
            _ => None,
        };
        text.unwrap_or_else(|| format!("<invalid {id}>"))
    }

    fn block_name(&self, id: BlockId) -> String {
        self.func
            .block(id)
            .map(|b| b.name.clone())
            .unwrap_or_else(|| format!("<invalid {id}>"))
    }
}

impl IrVisitor for Printer<'_> {
    type Output = String;

    fn visit_variable(&mut self, node: &Variable) -> String {
        node.to_string()
    }

    fn visit_int(&mut self, node: &Int) -> String {
        node.value.to_string()
    }

    fn visit_double(&mut self, node: &Double) -> String {
        format!("{:?}", node.value)
    }

    fn visit_ptr(&mut self, node: &Ptr) -> String {
        if node.is_pooled_string {
            format!("str#{}", node.value)
        } else {
            format!("ptr:{:#x}", node.value)
        }
    }

    fn visit_bin_op(&mut self, node: &BinOp) -> String {
        let left = self.operand(node.left);
        let right = self.operand(node.right);
        format!("({left} {} {right})", node.op)
    }

    fn visit_un_op(&mut self, node: &UnOp) -> String {
        let operand = self.operand(node.operand);
        format!("{}{operand}", node.op)
    }

    fn visit_phi(&mut self, node: &Phi) -> String {
        let vars: Vec<String> = node.vars.iter().map(Variable::to_string).collect();
        format!("phi({})", vars.join(", "))
    }

    fn visit_call(&mut self, node: &Call) -> String {
        let params: Vec<String> = node.params.iter().map(|p| self.operand(p.expr())).collect();
        format!("call #{}({})", node.fun_id, params.join(", "))
    }

    fn visit_assignment(&mut self, node: &Assignment) -> String {
        let value = self.expr(node.value);
        format!("{} = {value}", node.var)
    }

    fn visit_return(&mut self, node: &Return) -> String {
        format!("return {}", self.atom(node.atom))
    }

    fn visit_print(&mut self, node: &Print) -> String {
        format!("print {}", self.atom(node.atom))
    }

    fn visit_jump_always(&mut self, node: &JumpAlways) -> String {
        format!("jump {}", self.block_name(node.destination))
    }

    fn visit_jump_cond(&mut self, node: &JumpCond) -> String {
        let condition = self.atom(node.condition);
        format!(
            "if {condition} jump {} else {}",
            self.block_name(node.yes),
            self.block_name(node.no),
        )
    }

    fn visit_block(&mut self, node: &Block) -> String {
        let mut label = format!("{}:", node.name);
        if self.options.show_predecessors && !node.predecessors().is_empty() {
            let preds: Vec<String> = node.predecessors().iter().map(|p| self.block_name(*p)).collect();
            label.push_str(&format!("  ; preds: {}", preds.join(", ")));
        }
        label
    }

    fn visit_function(&mut self, node: &FunctionRecord) -> String {
        let params: Vec<String> = node.parameters.iter().map(|p| format!("v{p}")).collect();
        let ret = match node.return_type {
            VarType::Bottom => String::new(),
            kind => format!(" -> {kind}"),
        };
        format!("fn {}({}){ret} {{\n", node.id, params.join(", "))
    }
}

impl fmt::Display for FunctionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", print_function(self, &PrintOptions::default()))
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, func) in self.functions().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{func}")?;
        }
        Ok(())
    }
}
