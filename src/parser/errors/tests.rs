//! Tests for the errors module

use super::*;
use crate::base::LineIndex;
use rstest::rstest;

#[rstest]
#[case((0, 5), (2, 5), true)]
#[case((2, 5), (0, 5), false)]
#[case((0, 5), (0, 8), true)]
#[case((0, 8), (0, 5), false)]
#[case((3, 4), (1, 6), true)]
#[case((4, 4), (4, 4), false)]
fn test_is_better_error(
    #[case] current: (usize, usize),
    #[case] candidate: (usize, usize),
    #[case] expected: bool,
) {
    assert_eq!(
        is_better_error(current.0, current.1, candidate.0, candidate.1),
        expected
    );
}

#[test]
fn test_leading_error_yields_to_later_empty_error() {
    // (0,5) is long and starts at 0; an empty error at its end is further along
    assert!(is_better_error(0, 5, 5, 5));
    assert!(!is_better_error(5, 5, 0, 5));
    // Short leading errors fall back to the ordinary rule
    assert!(is_better_error(0, 2, 2, 2));
}

#[test]
fn test_error_set_keeps_most_advanced() {
    let mut set = ErrorSet::new();
    assert!(set.offer(&ParseError::new(ErrorCode::E0101, 0, 5)));
    assert!(set.offer(&ParseError::new(ErrorCode::E0101, 2, 5)));
    assert_eq!(set.len(), 1);
    assert_eq!(set.errors()[0].start(), 2);

    assert!(!set.offer(&ParseError::new(ErrorCode::E0101, 0, 3)));
    assert!(set.offer(&ParseError::new(ErrorCode::E0204, 0, 8)));
    assert_eq!(set.errors()[0].end(), 8);
}

#[test]
fn test_error_set_accumulates_ties() {
    let mut set = ErrorSet::new();
    set.offer(&ParseError::new(ErrorCode::E0101, 4, 5));
    set.offer(&ParseError::new(ErrorCode::E0201, 4, 5));
    // exact duplicate is dropped
    assert!(!set.offer(&ParseError::new(ErrorCode::E0101, 4, 5)));
    assert_eq!(set.len(), 2);

    let multi = set.to_error().unwrap();
    assert!(multi.is_multiple());
    assert_eq!(multi.errors.len(), 2);
    assert_eq!(multi.start(), 4);
    assert_eq!(multi.flatten().len(), 3);
}

#[test]
fn test_builder_and_display() {
    let err = ParseError::builder(ErrorCode::E0101)
        .message("expected ';'")
        .arg(";")
        .range(4, 5)
        .eof(true)
        .build();
    assert_eq!(err.args.len(), 1);
    assert!(err.eof);
    assert_eq!(err.to_string(), "E0101: expected ';' at 4..5");

    let index = LineIndex::new("ab\ncdef");
    assert_eq!(err.display_with(&index), "2:2: E0101: expected ';'");
    assert_eq!(ShortError(&err).to_string(), "E0101@4..5");
}
