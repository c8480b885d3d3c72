use rstest::rstest;

use parselets::{ParseOptions, Value};

use crate::helpers::calc::{assign, binary, calc, num, print, reference};
use crate::helpers::source_fixtures::{SIMPLE, WITH_BINARY};

#[test]
fn test_parse_statements_into_objects() {
    let calc = calc();
    let g = &calc.grammar;
    assert!(g.diagnostics().is_empty(), "{:?}", g.diagnostics());

    let doc = g.parse(SIMPLE).unwrap();
    let expected = Value::list([
        assign(g, "x", num(g, "1")),
        assign(g, "y", num(g, "2")),
        print(g, reference(g, "x")),
    ]);
    assert_eq!(doc.value(), &expected);
    assert_eq!(doc.text(), SIMPLE);
    assert_eq!(doc.root().text(), SIMPLE);
    assert!(!doc.root().has_errors());
}

#[test]
fn test_chain_builds_left_nested_binaries() {
    let calc = calc();
    let g = &calc.grammar;
    let doc = g.parse(WITH_BINARY).unwrap();
    let expected = Value::list([
        assign(g, "x", binary(g, num(g, "1"), "+", reference(g, "y"))),
        print(g, binary(g, reference(g, "x"), "-", num(g, "2"))),
    ]);
    assert_eq!(doc.value(), &expected);

    let doc = g.parse_rule(calc.sum, "a + 1 - b", ParseOptions::default()).unwrap();
    let inner = binary(g, reference(g, "a"), "+", num(g, "1"));
    assert_eq!(doc.value(), &binary(g, inner, "-", reference(g, "b")));
}

#[test]
fn test_values_carry_declared_types() {
    let calc = calc();
    let g = &calc.grammar;
    let doc = g.parse("print 7;\n").unwrap();
    let first = doc.value().as_list().unwrap()[0].as_object().unwrap().clone();
    let print_type = g.types().lookup("Print").unwrap();
    let stmt_type = g.types().lookup("Stmt").unwrap();
    assert_eq!(first.borrow().type_id(), Some(print_type));
    assert!(g.types().is_assignable(stmt_type, print_type));
    // the outermost node carrying the object is the whole line
    let bound = first.borrow().parse_node().unwrap();
    assert_eq!(bound.text(), "print 7;\n");
}

#[rstest]
#[case("x = 1;\n")]
#[case("x\t=  10 + y;\n\n\nprint x;\n")]
#[case("print a - b + c;\n")]
fn test_tree_text_is_lossless(#[case] source: &str) {
    let calc = calc();
    let doc = calc.grammar.parse(source).unwrap();
    assert_eq!(doc.root().text(), source);
    assert_eq!(doc.syntax().text().to_string(), source);
}

#[test]
fn test_stats_count_matches() {
    let calc = calc();
    let doc = calc.grammar.parse(SIMPLE).unwrap();
    assert!(doc.stats().matched > 0);
    assert_eq!(doc.stats().reused, 0);
    assert_eq!(doc.stats().recoveries, 0);
}
