use parselets::{ErrorCode, LineIndex, ParseOptions};

use crate::helpers::calc::calc;

#[test]
fn test_missing_semicolon_is_expected() {
    let calc = calc();
    let err = calc
        .grammar
        .parse_rule(calc.stmt, "x = 1", ParseOptions::default())
        .unwrap_err();
    assert_eq!(err.start(), 5);
    assert!(
        err.flatten()
            .iter()
            .any(|e| e.code == ErrorCode::E0101 && e.message.contains("';'")),
        "{err:?}"
    );
}

#[test]
fn test_keyword_rejected_as_identifier() {
    let calc = calc();
    let ident = calc.grammar.lookup("ident").unwrap();
    let err = calc
        .grammar
        .parse_rule(ident, "print", ParseOptions::default())
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::E0104);
    assert_eq!(err.message, "'print' is a keyword");
    assert!(calc.grammar.parse_rule(ident, "printer", ParseOptions::default()).is_ok());
}

#[test]
fn test_error_position_is_reported_by_line() {
    let calc = calc();
    let source = "x = 1;\n%%%\n";
    let err = calc.grammar.parse(source).unwrap_err();
    assert_eq!(err.start(), 7);
    let rendered = err.display_with(&LineIndex::new(source));
    assert!(rendered.starts_with("2:1: E0"), "{rendered}");
}

#[test]
fn test_unterminated_input() {
    let calc = calc();
    let err = calc.grammar.parse("x = 1;\nprint").unwrap_err();
    assert!(err.start() >= 7, "{err:?}");
}
