use std::rc::Rc;

use rstest::rstest;

use parselets::{ParseElement, ParseNodeRef, ParseOptions, ParsedDocument};

use crate::helpers::calc::calc;
use crate::helpers::source_fixtures::SIMPLE;

/// The first line node under the program node
fn first_line(doc: &ParsedDocument) -> ParseNodeRef {
    let program = doc.root().child_nodes().next().unwrap();
    program.child_nodes().next().unwrap().clone()
}

#[test]
fn test_unchanged_text_reuses_the_root() {
    let calc = calc();
    let old = calc.grammar.parse(SIMPLE).unwrap();
    let new = calc.grammar.reparse(&old, SIMPLE, ParseOptions::default()).unwrap();
    assert!(Rc::ptr_eq(old.root(), new.root()));
    assert_eq!(new.stats().reused, 1);
    assert_eq!(new.stats().matched, 0);
}

#[test]
fn test_edit_inside_one_line_keeps_the_others() {
    let calc = calc();
    let g = &calc.grammar;
    let old = g.parse(SIMPLE).unwrap();
    let edited = "x = 1;\ny = 42;\nprint x;\n";

    let new = g.reparse(&old, edited, ParseOptions::default()).unwrap();
    let fresh = g.parse(edited).unwrap();
    assert_eq!(new.value(), fresh.value());
    assert_eq!(new.root().text(), edited);
    assert!(Rc::ptr_eq(&first_line(&old), &first_line(&new)));
    assert!(new.stats().reused >= 2, "{:?}", new.stats());
    assert!(new.stats().matched < fresh.stats().matched, "{:?} vs {:?}", new.stats(), fresh.stats());
}

/// Parselets matched afresh when the middle line of a `lines` long
/// document changes
fn matched_after_middle_edit(lines: usize) -> usize {
    let calc = calc();
    let g = &calc.grammar;
    let line = "v = 1;\n";
    let old_text = line.repeat(lines);
    let middle = lines / 2 * line.len();
    let edited = format!("{}v = 42;\n{}", &old_text[..middle], &old_text[middle + line.len()..]);

    let old = g.parse(&old_text).unwrap();
    let new = g.reparse(&old, &edited, ParseOptions::default()).unwrap();
    assert_eq!(new.value(), g.parse(&edited).unwrap().value());
    assert!(new.stats().reused >= lines - 1, "{:?}", new.stats());
    new.stats().matched
}

#[rstest]
#[case(200)]
#[case(2000)]
fn test_reparse_work_does_not_grow_with_the_document(#[case] lines: usize) {
    assert_eq!(matched_after_middle_edit(lines), matched_after_middle_edit(20));
}

#[rstest]
#[case("x = 1;\ny = 2;\nprint x;\nprint y;\n")]
#[case("z = 0;\nx = 1;\ny = 2;\nprint x;\n")]
#[case("x = 1;\nprint x;\n")]
#[case("x = 1 + 2;\ny = 2;\nprint x;\n")]
#[case("x = 1;\ny = 2;\nprint xy;\n")]
fn test_reparse_matches_fresh_parse(#[case] edited: &str) {
    let calc = calc();
    let g = &calc.grammar;
    let old = g.parse(SIMPLE).unwrap();
    let new = g.reparse(&old, edited, ParseOptions::default()).unwrap();
    assert_eq!(new.value(), g.parse(edited).unwrap().value());
    assert_eq!(new.root().text(), edited);
    assert_eq!(new.text(), edited);
}

#[test]
fn test_reparse_into_broken_text_fails_like_a_parse() {
    let calc = calc();
    let g = &calc.grammar;
    let old = g.parse(SIMPLE).unwrap();
    let edited = "x = 1;\ny = ;\nprint x;\n";
    let err = g.reparse(&old, edited, ParseOptions::default()).unwrap_err();
    assert_eq!(err.start(), g.parse(edited).unwrap_err().start());
}

#[test]
fn test_old_document_is_untouched() {
    let calc = calc();
    let g = &calc.grammar;
    let old = g.parse(SIMPLE).unwrap();
    let _ = g.reparse(&old, "x = 5;\n", ParseOptions::default()).unwrap();
    assert_eq!(old.root().text(), SIMPLE);
    assert_eq!(old.value(), g.parse(SIMPLE).unwrap().value());
    assert!(matches!(old.root().children().first(), Some(ParseElement::Node(_))));
}
