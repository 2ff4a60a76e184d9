//! Unit tests for dispatch and traversal

use super::*;
use pretty_assertions::assert_eq;

/// Answers every visit with the kind of the handler that ran
struct KindRecorder;

impl IrVisitor for KindRecorder {
    type Output = NodeKind;

    fn visit_variable(&mut self, _: &Variable) -> NodeKind { NodeKind::Variable }
    fn visit_int(&mut self, _: &Int) -> NodeKind { NodeKind::Int }
    fn visit_double(&mut self, _: &Double) -> NodeKind { NodeKind::Double }
    fn visit_ptr(&mut self, _: &Ptr) -> NodeKind { NodeKind::Ptr }
    fn visit_bin_op(&mut self, _: &BinOp) -> NodeKind { NodeKind::BinOp }
    fn visit_un_op(&mut self, _: &UnOp) -> NodeKind { NodeKind::UnOp }
    fn visit_phi(&mut self, _: &Phi) -> NodeKind { NodeKind::Phi }
    fn visit_call(&mut self, _: &Call) -> NodeKind { NodeKind::Call }
    fn visit_assignment(&mut self, _: &Assignment) -> NodeKind { NodeKind::Assignment }
    fn visit_return(&mut self, _: &Return) -> NodeKind { NodeKind::Return }
    fn visit_print(&mut self, _: &Print) -> NodeKind { NodeKind::Print }
    fn visit_jump_always(&mut self, _: &JumpAlways) -> NodeKind { NodeKind::JumpAlways }
    fn visit_jump_cond(&mut self, _: &JumpCond) -> NodeKind { NodeKind::JumpCond }
    fn visit_block(&mut self, _: &Block) -> NodeKind { NodeKind::Block }
    fn visit_function(&mut self, _: &FunctionRecord) -> NodeKind { NodeKind::FunctionRecord }
}

/// One node of every kind
fn every_kind() -> FunctionRecord {
    let mut func = FunctionRecord::new(1, VarType::Integer);
    let entry = func.entry();
    let body = func.new_block("body");
    let exit = func.new_block("exit");

    let v = func.var(1);
    let i = func.int(2);
    let d = func.double(1.5);
    let p = func.pooled_string("s");
    let bin = func.bin_op(v, i, BinaryOp::Mul).unwrap();
    let un = func.un_op(d, UnaryOp::CastD2I).unwrap();
    let phi = func.phi(vec![1]).unwrap();
    let call = func.call(1, vec![v, p]).unwrap();

    func.assign(entry, 2, bin).unwrap();
    func.assign(entry, 3, un).unwrap();
    func.assign(entry, 4, call).unwrap();
    func.link_cond(entry, v, body, exit).unwrap();
    func.assign(body, 5, phi).unwrap();
    func.print(body, p).unwrap();
    func.link(body, exit).unwrap();
    func.ret(exit, v).unwrap();
    func
}

#[test]
fn test_dispatch_routes_each_kind_to_its_handler() {
    let func = every_kind();
    let mut recorder = KindRecorder;

    for (id, expr) in func.expr_iter() {
        let routed = func.dispatch(NodeId::Expr(id), &mut recorder).unwrap();
        assert_eq!(routed, expr.kind());
        assert_eq!(expr.accept(&mut recorder), expr.kind());
    }
    for (id, block) in func.block_iter() {
        assert_eq!(func.dispatch(NodeId::Block(id), &mut recorder).unwrap(), NodeKind::Block);
        for (index, stmt) in block.contents().iter().enumerate() {
            let routed = func.dispatch(NodeId::Statement(id, index), &mut recorder).unwrap();
            assert_eq!(routed, stmt.kind());
        }
        if let Some(jump) = block.transition() {
            let routed = func.dispatch(NodeId::Transition(id), &mut recorder).unwrap();
            assert_eq!(routed, jump.kind());
        }
    }
    assert_eq!(func.dispatch(NodeId::Function, &mut recorder).unwrap(), NodeKind::FunctionRecord);
}

#[test]
fn test_walk_reaches_every_kind() {
    let func = every_kind();
    let kinds = walk_function(&func, &mut KindRecorder).unwrap();
    for kind in NodeKind::ALL {
        assert!(kinds.contains(&kind), "walk never dispatched {kind}");
    }
}

#[test]
fn test_walk_order() {
    let mut func = FunctionRecord::new(0, VarType::Integer);
    let entry = func.entry();
    let exit = func.new_block("exit");
    let a = func.var(1);
    let b = func.int(2);
    let sum = func.bin_op(a, b, BinaryOp::Add).unwrap();
    func.assign(entry, 3, sum).unwrap();
    func.link(entry, exit).unwrap();
    let result = func.var(3);
    func.ret(exit, result).unwrap();

    let kinds = walk_function(&func, &mut KindRecorder).unwrap();
    assert_eq!(kinds, vec![
        NodeKind::FunctionRecord,
        NodeKind::Block,
        NodeKind::Variable,
        NodeKind::Int,
        NodeKind::BinOp,
        NodeKind::Assignment,
        NodeKind::JumpAlways,
        NodeKind::Block,
        NodeKind::Variable,
        NodeKind::Return,
    ]);
}

#[test]
fn test_walk_skips_unreachable_blocks() {
    let mut func = FunctionRecord::new(0, VarType::Bottom);
    let dead = func.new_block("dead");
    let zero = func.int(0);
    func.print(dead, zero).unwrap();
    func.ret(func.entry(), zero).unwrap();

    let kinds = walk_function(&func, &mut KindRecorder).unwrap();
    assert!(!kinds.contains(&NodeKind::Print));
}

#[test]
fn test_dangling_handles_cannot_be_dispatched() {
    let func = every_kind();
    let mut recorder = KindRecorder;

    let err = func.dispatch(NodeId::Expr(ExprId::new(999)), &mut recorder).unwrap_err();
    assert!(matches!(err, IrError::UnknownNodeKind { .. }));

    let exit = BlockId::new(2);
    assert!(func.node(NodeId::Transition(exit)).is_err());
    assert!(func.node(NodeId::Statement(exit, 7)).is_err());
    assert!(func.node(NodeId::Block(BlockId::new(3))).is_err());
    assert_eq!(func.node(NodeId::Statement(exit, 0)).unwrap().kind(), NodeKind::Return);
}

#[test]
fn test_walk_module_visits_functions_in_order() {
    let module: Module = vec![
        FunctionRecord::new(0, VarType::Bottom),
        FunctionRecord::new(1, VarType::Bottom),
    ].into_iter().collect();

    struct Ids(Vec<FunctionId>);
    impl IrVisitor for Ids {
        type Output = ();
        fn visit_variable(&mut self, _: &Variable) {}
        fn visit_int(&mut self, _: &Int) {}
        fn visit_double(&mut self, _: &Double) {}
        fn visit_ptr(&mut self, _: &Ptr) {}
        fn visit_bin_op(&mut self, _: &BinOp) {}
        fn visit_un_op(&mut self, _: &UnOp) {}
        fn visit_phi(&mut self, _: &Phi) {}
        fn visit_call(&mut self, _: &Call) {}
        fn visit_assignment(&mut self, _: &Assignment) {}
        fn visit_return(&mut self, _: &Return) {}
        fn visit_print(&mut self, _: &Print) {}
        fn visit_jump_always(&mut self, _: &JumpAlways) {}
        fn visit_jump_cond(&mut self, _: &JumpCond) {}
        fn visit_block(&mut self, _: &Block) {}
        fn visit_function(&mut self, node: &FunctionRecord) {
            self.0.push(node.id);
        }
    }

    let mut ids = Ids(Vec::new());
    walk_module(&module, &mut ids).unwrap();
    assert_eq!(ids.0, vec![0, 1]);
}

#[test]
fn test_json_persistence_keeps_graph() {
    let module: Module = vec![every_kind()].into_iter().collect();
    let text = module_to_json(&module).unwrap();
    let loaded = module_from_json(&text).unwrap();
    assert_eq!(loaded, module);
    assert!(verify_module(&loaded, &VerifyOptions::default()).is_ok());
}

#[test]
fn test_walk_long_operator_chain() {
    let mut func = FunctionRecord::new(0, VarType::Integer);
    let mut value = func.var(1).expr();
    for _ in 0..100_000 {
        value = func.un_op(value, UnaryOp::Neg).unwrap();
    }
    func.assign(func.entry(), 2, value).unwrap();
    let result = func.var(2);
    func.ret(func.entry(), result).unwrap();
    assert!(verify_function(&func, &VerifyOptions::default()).is_ok());

    let kinds = walk_function(&func, &mut KindRecorder).unwrap();
    assert_eq!(kinds.len(), 100_006);
    assert_eq!(kinds[2], NodeKind::Variable);
    assert!(kinds[3..100_003].iter().all(|k| *k == NodeKind::UnOp));
    assert_eq!(kinds[100_003], NodeKind::Assignment);

    let copy = rewrite_function(&func, &mut IdentityRewriter).unwrap();
    assert_eq!(copy.exprs(), func.exprs());
}
