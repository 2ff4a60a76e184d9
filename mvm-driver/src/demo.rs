//! Built-in demo module
//!
//! A loop that squares its counter through a call, merges the counter with a
//! phi at the loop header and prints a pooled label.

use mvm_ir::{BinaryOp, FunctionRecord, IrResult, Module, UnaryOp, VarType};

pub fn demo_module() -> IrResult<Module> {
    Ok(vec![counting_loop()?, square()?].into_iter().collect())
}

/// fn 0: for (i = 0; i < 3; i++) print "square", square(i)
fn counting_loop() -> IrResult<FunctionRecord> {
    let mut func = FunctionRecord::new(0, VarType::Integer);
    let entry = func.entry();
    let head = func.new_block("head");
    let body = func.new_block("body");
    let done = func.new_block("done");

    let zero = func.int(0);
    func.assign(entry, 1, zero)?;
    func.link(entry, head)?;

    let counter = func.phi(vec![1, 5])?;
    func.assign(head, 2, counter)?;
    let i = func.var(2);
    let three = func.int(3);
    let lt = func.bin_op(i, three, BinaryOp::Lt)?;
    func.assign(head, 3, lt)?;
    let cond = func.var(3);
    func.link_cond(head, cond, body, done)?;

    let squared = func.call(1, vec![i])?;
    func.assign(body, 4, squared)?;
    let label = func.pooled_string("square");
    func.print(body, label)?;
    let v4 = func.var(4);
    func.print(body, v4)?;
    let one = func.int(1);
    let next = func.bin_op(i, one, BinaryOp::Add)?;
    func.assign(body, 5, next)?;
    func.link(body, head)?;

    let bye = func.pooled_string("done");
    func.print(done, bye)?;
    func.ret(done, i)?;
    Ok(func)
}

/// fn 1(v10) -> int: v10 * v10, also printed as a double
fn square() -> IrResult<FunctionRecord> {
    let mut func = FunctionRecord::new(1, VarType::Integer);
    func.add_parameter(10);
    let entry = func.entry();

    let x = func.var(10);
    let product = func.bin_op(x, x, BinaryOp::Mul)?;
    func.assign(entry, 11, product)?;
    let result = func.var(11);
    let widened = func.un_op(result, UnaryOp::CastI2D)?;
    func.assign(entry, 12, widened)?;
    let v12 = func.var(12);
    func.print(entry, v12)?;
    func.ret(entry, result)?;
    Ok(func)
}
