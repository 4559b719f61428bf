//! End-to-end scenarios against the engine facade: the full pipeline from
//! source text to typed value.

use std::sync::Arc;

use gridlang_common::{CellRef, ErrorKind, Value};
use gridlang_eval::test_sheet::TestSheet;
use gridlang_eval::Engine;
use gridlang_parse::{parse, BinaryOp, Expr};

fn t(s: &str) -> Value {
    Value::Text(s.into())
}
fn n(v: f64) -> Value {
    Value::Number(v)
}
fn err(kind: ErrorKind) -> Value {
    Value::Error(kind.into())
}

fn eval(src: &str) -> Value {
    Engine::new()
        .evaluate_string(src, &TestSheet::new())
        .unwrap()
}

fn eval_on(sheet: &TestSheet, src: &str) -> Value {
    Engine::new().evaluate_string(src, sheet).unwrap()
}

#[test]
fn arithmetic_ast_and_print() {
    assert_eq!(eval("=1+2"), n(3.0));
    let ast = parse("=1+2").unwrap();
    assert_eq!(
        ast,
        Expr::BinaryOp {
            op: BinaryOp::Add,
            left: Box::new(Expr::Number(1.0)),
            right: Box::new(Expr::Number(2.0)),
        }
    );
    assert_eq!(ast.to_formula_string(), "1+2");
}

#[test]
fn sum_skips_uncoercible_text_in_ranges() {
    let sheet = TestSheet::new()
        .with_cell_a1("A1", n(10.0))
        .with_cell_a1("B1", n(20.0))
        .with_cell_a1("A2", n(30.0))
        .with_cell_a1("B2", t("text"));
    assert_eq!(eval_on(&sheet, "=SUM(A1:B2)"), n(60.0));
}

#[test]
fn if_branches() {
    assert_eq!(eval("=IF(TRUE,\"yes\",\"no\")"), t("yes"));
    assert_eq!(eval("=IF(FALSE,\"yes\")"), Value::Boolean(false));
}

#[test]
fn vlookup_table_literals() {
    let table = "{1,\"apple\",10;2,\"banana\",20;3,\"cherry\",30}";
    assert_eq!(eval(&format!("=VLOOKUP(2,{table},2,FALSE)")), t("banana"));
    assert_eq!(eval(&format!("=VLOOKUP(99,{table},2,FALSE)")), err(ErrorKind::Na));
    assert_eq!(eval(&format!("=VLOOKUP(2,{table},5,FALSE)")), err(ErrorKind::Ref));
}

#[test]
fn database_functions() {
    let sheet = TestSheet::new()
        .with_range(
            1,
            1,
            vec![
                vec![t("Name"), t("Department"), t("Salary")],
                vec![t("Ann"), t("Sales"), n(60000.0)],
                vec![t("Bob"), t("Ops"), n(48000.0)],
                vec![t("Cid"), t("Sales"), n(55000.0)],
                vec![t("Dee"), t("Sales"), n(50000.0)],
                vec![t("Eve"), t("Ops"), n(52000.0)],
            ],
        )
        .with_cell_a1("E1", t("Department"))
        .with_cell_a1("E2", t("Sales"))
        .with_cell_a1("F1", t("Salary"))
        .with_cell_a1("F2", t(">50000"));
    assert_eq!(eval_on(&sheet, "=DSUM(A1:C6,\"Salary\",E1:F2)"), n(115000.0));
    assert_eq!(eval_on(&sheet, "=DSUM(A1:C6,\"Salary\",E1:E2)"), n(165000.0));
    assert_eq!(
        eval_on(&sheet, "=DGET(A1:C6,\"Salary\",E1:E2)"),
        err(ErrorKind::Num)
    );
}

#[test]
fn lambda_let_map() {
    assert_eq!(eval("=LAMBDA(x,x+1)(5)"), n(6.0));
    assert_eq!(eval("=LET(x,10,y,x+5,y*2)"), n(30.0));

    let sheet = TestSheet::new()
        .with_cell_a1("A1", n(1.0))
        .with_cell_a1("B1", n(2.0))
        .with_cell_a1("C1", n(3.0));
    match eval_on(&sheet, "=MAP(A1:C1,LAMBDA(x,x*2))") {
        Value::Range(r) => {
            assert_eq!(r.dims(), (1, 3));
            assert_eq!(r.get(0, 0), &n(2.0));
            assert_eq!(r.get(0, 1), &n(4.0));
            assert_eq!(r.get(0, 2), &n(6.0));
        }
        other => panic!("expected range, got {other:?}"),
    }
}

#[test]
fn convert_and_regex() {
    assert_eq!(eval("=CONVERT(100,\"C\",\"F\")"), n(212.0));
    assert_eq!(eval("=CONVERT(1,\"m\",\"kg\")"), err(ErrorKind::Na));
    assert_eq!(
        eval("=REGEXEXTRACT(\"name: John\",\"name: (\\w+)\")"),
        t("John")
    );
    assert_eq!(
        eval("=REGEXEXTRACT(\"name: John\",\"[invalid\")"),
        err(ErrorKind::Value)
    );
}

#[test]
fn mixed_expression_pipeline() {
    let sheet = TestSheet::new()
        .with_cell_a1("A1", n(10.0))
        .with_cell_a1("B1", n(20.0))
        .with_cell_a1("A2", n(30.0))
        .with_cell_a1("B2", n(40.0))
        .with_cell_a1("C1", n(1.0));
    assert_eq!(
        eval_on(&sheet, "=SUM(A1:B2)*IF(C1>0,\"2\",\"0\")"),
        n(200.0)
    );
}

/* ──────────────────── universal invariants ────────────────────── */

#[test]
fn parse_round_trip_structural_equality() {
    for src in [
        "=1+2*3",
        "=SUM(A1:B2)*IF(C1>0,\"y\",\"n\")",
        "=LAMBDA(x,x+1)(5)",
        "=-2^2%",
        "=(1+2)*(3-4)",
        "={1,\"two\";3,TRUE}",
        "=Sheet1!$A$1:B2&\"\"",
        "=LET(x,1,x)=1",
    ] {
        let once = parse(src).unwrap();
        let twice = parse(&once.to_formula_string()).unwrap();
        assert_eq!(once, twice, "round trip failed for {src}");
    }
}

#[test]
fn cache_identity() {
    let engine = Engine::new();
    let a = engine.parse("=SUM(A1:A3)").unwrap();
    let b = engine.parse("=SUM(A1:A3)").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    engine.clear_cache();
    let c = engine.parse("=SUM(A1:A3)").unwrap();
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(*a, *c);
}

#[test]
fn error_precedence_left_wins() {
    assert_eq!(eval("=#NUM!+#REF!"), err(ErrorKind::Num));
    assert_eq!(eval("=#REF!&#N/A"), err(ErrorKind::Ref));
    assert_eq!(eval("=#N/A=#VALUE!"), err(ErrorKind::Na));
}

#[test]
fn dimension_preservation() {
    match eval("=SCAN(0,{1,2;3,4},LAMBDA(a,x,a+x))") {
        Value::Range(r) => assert_eq!(r.dims(), (2, 2)),
        other => panic!("{other:?}"),
    }
    match eval("=TRANSPOSE(TRANSPOSE({1,2;3,4}))") {
        Value::Range(r) => {
            assert_eq!(r.dims(), (2, 2));
            assert_eq!(r.get(0, 1), &n(2.0));
        }
        other => panic!("{other:?}"),
    }
    // BYCOL then TRANSPOSE turns a row of column sums into a column
    match eval("=TRANSPOSE(BYCOL({1,2;3,4},LAMBDA(c,SUM(c))))") {
        Value::Range(r) => assert_eq!(r.dims(), (2, 1)),
        other => panic!("{other:?}"),
    }
}

#[test]
fn case_insensitive_names() {
    let sheet = TestSheet::new().with_variable("Answer", n(42.0));
    assert_eq!(eval_on(&sheet, "=answer"), n(42.0));
    assert_eq!(eval_on(&sheet, "=ANSWER"), n(42.0));
    assert_eq!(eval_on(&sheet, "=AnSwEr"), n(42.0));
}

#[test]
fn aggregation_robustness() {
    let base = TestSheet::new()
        .with_cell_a1("A1", n(1.0))
        .with_cell_a1("A2", n(2.0));
    let with_text = TestSheet::new()
        .with_cell_a1("A1", n(1.0))
        .with_cell_a1("A2", n(2.0))
        .with_cell_a1("A3", t("not a number"));
    assert_eq!(
        eval_on(&base, "=SUM(A1:A2)"),
        eval_on(&with_text, "=SUM(A1:A3)")
    );
    let with_err = TestSheet::new()
        .with_cell_a1("A1", n(1.0))
        .with_cell_a1("A2", err(ErrorKind::Num));
    assert_eq!(eval_on(&with_err, "=SUM(A1:A2)"), err(ErrorKind::Num));
}

#[test]
fn reference_discovery() {
    let engine = Engine::new();
    let refs = engine
        .get_cell_references("=A1+SUM(Sheet2!B1:B2)+IF(C3>0,D4,E5)")
        .unwrap();
    let expected: Vec<CellRef> = vec![
        "A1".parse().unwrap(),
        "Sheet2!B1".parse().unwrap(),
        "Sheet2!B2".parse().unwrap(),
        "C3".parse().unwrap(),
        "D4".parse().unwrap(),
        "E5".parse().unwrap(),
    ];
    assert_eq!(refs.len(), expected.len());
    for cell in expected {
        assert!(refs.contains(&cell), "missing {cell}");
    }
}

#[test]
fn host_function_override() {
    use gridlang_common::FormulaError;
    use gridlang_eval::{ArgumentHandle, EvaluationContext, Function};

    struct TwiceFn;
    impl Function for TwiceFn {
        fn name(&self) -> &'static str {
            "TWICE"
        }
        fn min_args(&self) -> usize {
            1
        }
        fn max_args(&self) -> Option<usize> {
            Some(1)
        }
        fn eval(
            &self,
            args: &[ArgumentHandle<'_, '_>],
            _ctx: &dyn EvaluationContext,
        ) -> Result<Value, FormulaError> {
            Ok(Value::Number(args[0].number()? * 2.0))
        }
    }

    let engine = Engine::new();
    engine.register_function(Arc::new(TwiceFn));
    assert_eq!(eval_on(&TestSheet::new(), "=1"), n(1.0)); // unrelated engine untouched
    assert_eq!(
        engine
            .evaluate_string("=TWICE(21)", &TestSheet::new())
            .unwrap(),
        n(42.0)
    );
    assert!(engine.functions().has("twice"));
}

#[test]
fn registry_copy_with_leaves_base_alone() {
    let engine = Engine::new();
    let snapshot = engine.functions().copy_with(Vec::new());
    assert_eq!(snapshot.names().len(), engine.functions().names().len());
}

#[test]
fn validation_entry_points() {
    let engine = Engine::new();
    assert!(engine.is_valid_formula("=SUM(1,2)"));
    assert!(!engine.is_valid_formula("=SUM(1,"));
    assert!(engine.try_parse("=)").is_none());
    let parse_err = engine.parse("=1 ~ 2").unwrap_err();
    assert!(parse_err.offset >= 3);
    assert!(engine
        .evaluate_string("=1+", &TestSheet::new())
        .is_err());
}
