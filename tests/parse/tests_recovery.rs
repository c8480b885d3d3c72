use rstest::rstest;

use parselets::{ErrorCode, ParseOptions, Value};

use crate::helpers::calc::{assign, calc, num, print, reference};
use crate::helpers::source_fixtures::{GARBAGE_LINE, MISSING_VALUE, SIMPLE};

#[test]
fn test_garbage_line_is_skipped() {
    let calc = calc();
    let g = &calc.grammar;
    let err = g.parse_with(GARBAGE_LINE, ParseOptions::partial()).unwrap_err();
    assert!(!err.is_multiple());
    assert_eq!(err.code, ErrorCode::E0201);
    assert_eq!(err.start(), 7);

    let expected = Value::list([assign(g, "x", num(g, "1")), print(g, reference(g, "x"))]);
    assert_eq!(err.partial_value(), Some(expected));
    // the partial tree still covers every byte
    assert_eq!(err.partial.as_ref().unwrap().text(), GARBAGE_LINE);
    assert!(err.partial.as_ref().unwrap().has_errors());
}

#[test]
fn test_recovery_needs_partial_mode() {
    let calc = calc();
    let err = calc.grammar.parse(GARBAGE_LINE).unwrap_err();
    assert_eq!(err.start(), 7);
    assert!(err.partial.is_none());
}

#[rstest]
#[case::default_skip(ParseOptions::partial())]
#[case::no_skip(ParseOptions { max_recovery_skip: 0, ..ParseOptions::partial() })]
fn test_broken_statement_keeps_its_partial_object(#[case] options: ParseOptions) {
    let calc = calc();
    let g = &calc.grammar;
    let err = g.parse_with(MISSING_VALUE, options).unwrap_err();
    assert!(!err.is_multiple());
    assert_eq!(err.code, ErrorCode::E0201);
    assert_eq!(err.start(), 11);

    let value = err.partial_value().unwrap();
    let items = value.as_list().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0], assign(g, "x", num(g, "1")));
    assert_eq!(items[1].get("target"), Value::str("y"));
    assert!(items[1].get("value").is_null());
    assert_eq!(items[2], print(g, reference(g, "x")));
}

#[test]
fn test_missing_child_is_skipped_not_the_next_statement() {
    let calc = calc();
    let g = &calc.grammar;
    let source = "x = 1;\ny = ;\nz = 2;\n";
    let err = g.parse_with(source, ParseOptions::partial()).unwrap_err();
    let value = err.partial_value().unwrap();
    let items = value.as_list().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0], assign(g, "x", num(g, "1")));
    assert_eq!(items[1].get("target"), Value::str("y"));
    assert!(items[1].get("value").is_null());
    assert_eq!(items[2], assign(g, "z", num(g, "2")));
    assert_eq!(err.partial.as_ref().unwrap().text(), source);
}

#[test]
fn test_stray_input_is_absorbed_by_the_previous_child() {
    let calc = calc();
    let g = &calc.grammar;
    let source = "print x y;\nx = 1;\n";
    let err = g.parse_with(source, ParseOptions::partial()).unwrap_err();
    assert!(!err.is_multiple(), "{err:?}");
    assert_eq!(err.code, ErrorCode::E0102);
    assert_eq!((err.start(), err.end()), (7, 9));

    let expected = Value::list([print(g, reference(g, "x")), assign(g, "x", num(g, "1"))]);
    assert_eq!(err.partial_value(), Some(expected));
    assert_eq!(err.partial.as_ref().unwrap().text(), source);
}

#[test]
fn test_clean_input_in_partial_mode() {
    let calc = calc();
    let doc = calc.grammar.parse_with(SIMPLE, ParseOptions::partial()).unwrap();
    assert_eq!(doc.value().as_list().map(|items| items.len()), Some(3));
    assert_eq!(doc.stats().recoveries, 0);
}
