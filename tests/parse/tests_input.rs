use std::fs::File;
use std::io::{Cursor, Write};

use parselets::parser::InputError;
use parselets::{Error, ParseOptions};

use crate::helpers::calc::calc;
use crate::helpers::source_fixtures::SIMPLE;

#[test]
fn test_parse_from_file() {
    let calc = calc();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SIMPLE.as_bytes()).unwrap();
    file.flush().unwrap();

    let reader = File::open(file.path()).unwrap();
    let doc = calc.grammar.parse_reader(reader, ParseOptions::default()).unwrap();
    assert_eq!(doc.text(), SIMPLE);
    assert_eq!(doc.value(), calc.grammar.parse(SIMPLE).unwrap().value());
}

#[test]
fn test_invalid_utf8_is_an_input_error() {
    let calc = calc();
    let mut bytes = b"x = 1;\n".to_vec();
    bytes.push(0xff);
    let result = calc.grammar.parse_reader(Cursor::new(bytes), ParseOptions::default());
    assert!(matches!(result, Err(Error::Input(InputError::InvalidUtf8(7)))), "{result:?}");
}
