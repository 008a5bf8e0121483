//! End-to-end verification scenarios: procedures that must verify
//! cleanly, and procedures whose assertions must be reported at the
//! right source spans.

use rustc_hash::FxHashMap;
use std::sync::Arc;
use verdi_ir::TermGraph;
use verdi_types::testutil::MapResolver;
use verdi_types::{Budgets, NameResolver, ResolutionError, TrivialLifetimes, TypeExpr};
use verdi_verify::{
    verify, BinOp, Bytecode, Cmp, CodeBlock, Diagnostic, DiagnosticKind, Label, MethodCase,
    Namespace, Param, Reg, SourceSpan, UnOp,
};

/// A namespace backed by maps, for tests.
#[derive(Default)]
struct TestNamespace {
    types: MapResolver,
    methods: FxHashMap<String, Arc<MethodCase>>,
}

impl TestNamespace {
    fn define_method(&mut self, case: MethodCase) -> &mut Self {
        self.methods.insert(case.name.clone(), Arc::new(case));
        self
    }
}

impl NameResolver for TestNamespace {
    fn resolve_type(
        &self,
        name: &str,
        graph: &mut TermGraph,
    ) -> Result<verdi_ir::Term, ResolutionError> {
        self.types.resolve_type(name, graph)
    }
}

impl Namespace for TestNamespace {
    fn resolve_method(&self, name: &str) -> Result<Arc<MethodCase>, ResolutionError> {
        self.methods.get(name).cloned().ok_or(ResolutionError::Unknown {
            name: name.to_string(),
        })
    }
}

fn r(i: usize) -> Reg {
    Reg::new(i)
}

fn span(n: u32) -> SourceSpan {
    SourceSpan::new(n * 10, n * 10 + 9)
}

fn run(case: &MethodCase, ns: &TestNamespace) -> Vec<Diagnostic> {
    verify(case, ns, &TrivialLifetimes, Budgets::default())
}

/// `nat(x: int) where x >= 0 -> int { assert x + 1 > x; return x }`
/// verifies with no diagnostics.
#[test]
fn successor_assertion_verifies() {
    let mut pre = CodeBlock::new("nat.vd");
    pre.push(
        Bytecode::Const {
            dst: r(1),
            value: verdi_verify::ConstValue::Int(0),
        },
        span(0),
    );
    pre.push(
        Bytecode::Assert {
            op: Cmp::Ge,
            lhs: r(0),
            rhs: r(1),
            msg: "x >= 0".to_string(),
        },
        span(0),
    );

    let mut body = CodeBlock::new("nat.vd");
    body.push(
        Bytecode::Const {
            dst: r(1),
            value: verdi_verify::ConstValue::Int(1),
        },
        span(1),
    );
    body.push(
        Bytecode::BinOp {
            op: BinOp::Add,
            dst: r(2),
            lhs: r(0),
            rhs: r(1),
        },
        span(2),
    );
    body.push(
        Bytecode::Assert {
            op: Cmp::Gt,
            lhs: r(2),
            rhs: r(0),
            msg: "x + 1 > x".to_string(),
        },
        span(3),
    );
    body.push(Bytecode::Return { value: Some(r(0)) }, span(4));

    let case = MethodCase {
        name: "nat".to_string(),
        params: vec![Param {
            name: "x".to_string(),
            ty: TypeExpr::Int,
        }],
        ret: Some(TypeExpr::Int),
        precondition: Some(pre),
        postcondition: None,
        body,
    };
    let ns = TestNamespace::default();
    let diags = run(&case, &ns);
    assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
}

/// `div(x: int, y: int) -> int { return x / y }` reports exactly one
/// unverified assertion, at the division.
#[test]
fn unguarded_division_is_reported() {
    let mut body = CodeBlock::new("div.vd");
    body.push(
        Bytecode::BinOp {
            op: BinOp::Div,
            dst: r(2),
            lhs: r(0),
            rhs: r(1),
        },
        span(7),
    );
    body.push(Bytecode::Return { value: Some(r(2)) }, span(8));

    let case = MethodCase {
        name: "div".to_string(),
        params: vec![
            Param {
                name: "x".to_string(),
                ty: TypeExpr::Int,
            },
            Param {
                name: "y".to_string(),
                ty: TypeExpr::Int,
            },
        ],
        ret: Some(TypeExpr::Int),
        precondition: None,
        postcondition: None,
        body,
    };
    let ns = TestNamespace::default();
    let diags = run(&case, &ns);
    assert_eq!(diags.len(), 1, "diagnostics: {:?}", diags);
    assert_eq!(diags[0].kind, DiagnosticKind::UnverifiedAssertion);
    assert_eq!(diags[0].span, span(7));
    assert!(diags[0].message.contains("division"));
}

/// The same division guarded by `where y != 0` verifies cleanly.
#[test]
fn guarded_division_verifies() {
    let mut pre = CodeBlock::new("div.vd");
    pre.push(
        Bytecode::Const {
            dst: r(2),
            value: verdi_verify::ConstValue::Int(0),
        },
        span(0),
    );
    pre.push(
        Bytecode::Assert {
            op: Cmp::Ne,
            lhs: r(1),
            rhs: r(2),
            msg: "y != 0".to_string(),
        },
        span(0),
    );

    let mut body = CodeBlock::new("div.vd");
    body.push(
        Bytecode::BinOp {
            op: BinOp::Div,
            dst: r(2),
            lhs: r(0),
            rhs: r(1),
        },
        span(7),
    );
    body.push(Bytecode::Return { value: Some(r(2)) }, span(8));

    let case = MethodCase {
        name: "div".to_string(),
        params: vec![
            Param {
                name: "x".to_string(),
                ty: TypeExpr::Int,
            },
            Param {
                name: "y".to_string(),
                ty: TypeExpr::Int,
            },
        ],
        ret: Some(TypeExpr::Int),
        precondition: Some(pre),
        postcondition: None,
        body,
    };
    let ns = TestNamespace::default();
    let diags = run(&case, &ns);
    assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
}

/// `choose(b: bool, x: int) where x <= 0 ensures result >= 0:
/// if b then x else -x` — only the `return x` path is unprovable.
#[test]
fn postcondition_failure_points_at_the_offending_return() {
    let mut pre = CodeBlock::new("choose.vd");
    pre.push(
        Bytecode::Const {
            dst: r(3),
            value: verdi_verify::ConstValue::Int(0),
        },
        span(0),
    );
    pre.push(
        Bytecode::Assert {
            op: Cmp::Le,
            lhs: r(1),
            rhs: r(3),
            msg: "x <= 0".to_string(),
        },
        span(0),
    );

    // Postcondition frame: r0 = b, r1 = x, r2 = result.
    let mut post = CodeBlock::new("choose.vd");
    post.push(
        Bytecode::Const {
            dst: r(3),
            value: verdi_verify::ConstValue::Int(0),
        },
        span(1),
    );
    post.push(
        Bytecode::Assert {
            op: Cmp::Ge,
            lhs: r(2),
            rhs: r(3),
            msg: "result >= 0".to_string(),
        },
        span(1),
    );

    let exit = Label::new(0);
    let mut body = CodeBlock::new("choose.vd");
    body.push(
        Bytecode::Const {
            dst: r(2),
            value: verdi_verify::ConstValue::Bool(true),
        },
        span(2),
    );
    body.push(
        Bytecode::If {
            op: Cmp::Eq,
            lhs: r(0),
            rhs: r(2),
            target: exit,
        },
        span(3),
    );
    body.push(
        Bytecode::UnOp {
            op: UnOp::Neg,
            dst: r(3),
            src: r(1),
        },
        span(4),
    );
    body.push(Bytecode::Return { value: Some(r(3)) }, span(5));
    body.push(Bytecode::Label { label: exit }, span(6));
    body.push(Bytecode::Return { value: Some(r(1)) }, span(7));

    let case = MethodCase {
        name: "choose".to_string(),
        params: vec![
            Param {
                name: "b".to_string(),
                ty: TypeExpr::Bool,
            },
            Param {
                name: "x".to_string(),
                ty: TypeExpr::Int,
            },
        ],
        ret: Some(TypeExpr::Int),
        precondition: Some(pre),
        postcondition: Some(post),
        body,
    };
    let ns = TestNamespace::default();
    let diags = run(&case, &ns);
    assert_eq!(diags.len(), 1, "diagnostics: {:?}", diags);
    assert_eq!(diags[0].kind, DiagnosticKind::UnverifiedAssertion);
    // Reported at the `return x`, not inside the postcondition block.
    assert_eq!(diags[0].span, span(7));
}

/// Loops havoc what they modify and honour their invariant: code after
/// the loop can rely on the invariant but nothing else.
#[test]
fn loop_invariant_survives_the_loop() {
    let exit = Label::new(0);
    let mut inv = CodeBlock::new("loop.vd");
    inv.push(
        Bytecode::Const {
            dst: r(9),
            value: verdi_verify::ConstValue::Int(0),
        },
        span(0),
    );
    inv.push(
        Bytecode::Assert {
            op: Cmp::Ge,
            lhs: r(1),
            rhs: r(9),
            msg: "x >= 0".to_string(),
        },
        span(0),
    );

    let mut body = CodeBlock::new("loop.vd");
    body.push(
        Bytecode::Const {
            dst: r(1),
            value: verdi_verify::ConstValue::Int(0),
        },
        span(1),
    );
    body.push(
        Bytecode::Loop {
            modified: vec![r(1)],
            invariant: Some(Arc::new(inv)),
            exit,
        },
        span(2),
    );
    body.push(
        Bytecode::Const {
            dst: r(2),
            value: verdi_verify::ConstValue::Int(1),
        },
        span(3),
    );
    body.push(
        Bytecode::BinOp {
            op: BinOp::Add,
            dst: r(1),
            lhs: r(1),
            rhs: r(2),
        },
        span(4),
    );
    body.push(Bytecode::LoopEnd, span(5));
    body.push(Bytecode::Label { label: exit }, span(6));
    body.push(
        Bytecode::Const {
            dst: r(3),
            value: verdi_verify::ConstValue::Int(0),
        },
        span(7),
    );
    body.push(
        Bytecode::Assert {
            op: Cmp::Ge,
            lhs: r(1),
            rhs: r(3),
            msg: "x >= 0 after loop".to_string(),
        },
        span(8),
    );
    body.push(Bytecode::Return { value: None }, span(9));

    let case = MethodCase {
        name: "count".to_string(),
        params: vec![],
        ret: None,
        precondition: None,
        postcondition: None,
        body,
    };
    let ns = TestNamespace::default();
    let diags = run(&case, &ns);
    assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
}

/// Without the invariant the havocked register proves nothing.
#[test]
fn havocked_register_is_unknown_after_the_loop() {
    let exit = Label::new(0);
    let mut body = CodeBlock::new("loop.vd");
    body.push(
        Bytecode::Const {
            dst: r(1),
            value: verdi_verify::ConstValue::Int(0),
        },
        span(1),
    );
    body.push(
        Bytecode::Loop {
            modified: vec![r(1)],
            invariant: None,
            exit,
        },
        span(2),
    );
    body.push(Bytecode::LoopEnd, span(3));
    body.push(Bytecode::Label { label: exit }, span(4));
    body.push(
        Bytecode::Const {
            dst: r(2),
            value: verdi_verify::ConstValue::Int(0),
        },
        span(5),
    );
    body.push(
        Bytecode::Assert {
            op: Cmp::Ge,
            lhs: r(1),
            rhs: r(2),
            msg: "x >= 0 after loop".to_string(),
        },
        span(6),
    );
    body.push(Bytecode::Return { value: None }, span(7));

    let case = MethodCase {
        name: "count".to_string(),
        params: vec![],
        ret: None,
        precondition: None,
        postcondition: None,
        body,
    };
    let ns = TestNamespace::default();
    let diags = run(&case, &ns);
    assert_eq!(diags.len(), 1, "diagnostics: {:?}", diags);
    assert_eq!(diags[0].kind, DiagnosticKind::UnverifiedAssertion);
    assert_eq!(diags[0].span, span(6));
}

/// An imported postcondition makes the callee's guarantee available to
/// the caller.
#[test]
fn invoke_imports_the_callee_postcondition() {
    // abs(x: int) -> int ensures result >= 0. Postcondition frame:
    // r0 = x, r1 = result.
    let mut abs_post = CodeBlock::new("abs.vd");
    abs_post.push(
        Bytecode::Const {
            dst: r(2),
            value: verdi_verify::ConstValue::Int(0),
        },
        span(0),
    );
    abs_post.push(
        Bytecode::Assert {
            op: Cmp::Ge,
            lhs: r(1),
            rhs: r(2),
            msg: "result >= 0".to_string(),
        },
        span(0),
    );
    let abs = MethodCase {
        name: "abs".to_string(),
        params: vec![Param {
            name: "x".to_string(),
            ty: TypeExpr::Int,
        }],
        ret: Some(TypeExpr::Int),
        precondition: None,
        postcondition: Some(abs_post),
        body: CodeBlock::new("abs.vd"),
    };

    let mut body = CodeBlock::new("caller.vd");
    body.push(
        Bytecode::Invoke {
            dst: Some(r(1)),
            name: "abs".to_string(),
            args: vec![r(0)],
        },
        span(1),
    );
    body.push(
        Bytecode::Const {
            dst: r(2),
            value: verdi_verify::ConstValue::Int(0),
        },
        span(2),
    );
    body.push(
        Bytecode::Assert {
            op: Cmp::Ge,
            lhs: r(1),
            rhs: r(2),
            msg: "abs result is non-negative".to_string(),
        },
        span(3),
    );
    body.push(Bytecode::Return { value: None }, span(4));

    let case = MethodCase {
        name: "caller".to_string(),
        params: vec![Param {
            name: "x".to_string(),
            ty: TypeExpr::Int,
        }],
        ret: None,
        precondition: None,
        postcondition: None,
        body,
    };
    let mut ns = TestNamespace::default();
    ns.define_method(abs);
    let diags = run(&case, &ns);
    assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
}

/// Calling an unknown method is a resolution error at the call site, and
/// verification continues.
#[test]
fn unknown_callee_is_a_resolution_error() {
    let mut body = CodeBlock::new("caller.vd");
    body.push(
        Bytecode::Invoke {
            dst: Some(r(1)),
            name: "missing".to_string(),
            args: vec![],
        },
        span(1),
    );
    body.push(Bytecode::Return { value: None }, span(2));

    let case = MethodCase {
        name: "caller".to_string(),
        params: vec![],
        ret: None,
        precondition: None,
        postcondition: None,
        body,
    };
    let ns = TestNamespace::default();
    let diags = run(&case, &ns);
    assert_eq!(diags.len(), 1, "diagnostics: {:?}", diags);
    assert_eq!(diags[0].kind, DiagnosticKind::ResolutionError);
    assert_eq!(diags[0].span, span(1));
}

/// Bytecodes with no specified transformation surface as indeterminate
/// rather than being guessed at.
#[test]
fn unspecified_bytecodes_are_indeterminate() {
    let mut body = CodeBlock::new("deref.vd");
    body.push(
        Bytecode::Dereference {
            dst: r(1),
            src: r(0),
        },
        span(1),
    );
    body.push(Bytecode::Return { value: None }, span(2));

    let case = MethodCase {
        name: "deref".to_string(),
        params: vec![Param {
            name: "p".to_string(),
            ty: TypeExpr::Ref(Box::new(TypeExpr::Int), "a".to_string()),
        }],
        ret: None,
        precondition: None,
        postcondition: None,
        body,
    };
    let ns = TestNamespace::default();
    let diags = run(&case, &ns);
    assert_eq!(diags.len(), 1, "diagnostics: {:?}", diags);
    assert_eq!(diags[0].kind, DiagnosticKind::Indeterminate);
    assert_eq!(diags[0].span, span(1));
}

/// A type refinement fork: the refined branch may rely on the tested
/// type, the other branch on its complement.
#[test]
fn type_refinement_forks_both_ways() {
    let is_int = Label::new(0);
    let mut body = CodeBlock::new("refine.vd");
    body.push(
        Bytecode::IfIs {
            src: r(0),
            ty: TypeExpr::Int,
            target: is_int,
        },
        span(1),
    );
    body.push(Bytecode::Return { value: None }, span(2));
    body.push(Bytecode::Label { label: is_int }, span(3));
    body.push(
        Bytecode::Const {
            dst: r(1),
            value: verdi_verify::ConstValue::Int(1),
        },
        span(4),
    );
    body.push(
        Bytecode::Assert {
            op: Cmp::Ge,
            lhs: r(1),
            rhs: r(1),
            msg: "trivial".to_string(),
        },
        span(5),
    );
    body.push(Bytecode::Return { value: Some(r(1)) }, span(6));

    let case = MethodCase {
        name: "refine".to_string(),
        params: vec![Param {
            name: "x".to_string(),
            ty: TypeExpr::Int.or(TypeExpr::Null),
        }],
        ret: None,
        precondition: None,
        postcondition: None,
        body,
    };
    let ns = TestNamespace::default();
    let diags = run(&case, &ns);
    assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
}
