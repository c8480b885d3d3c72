use parselets::{FormatOptions, Generator, GenerateError, Value, format};

use crate::helpers::calc::{assign, binary, calc, num, print, reference};
use crate::helpers::source_fixtures::{SIMPLE, WITH_BINARY};

#[test]
fn test_generate_statement_with_binary() {
    let calc = calc();
    let g = &calc.grammar;
    let value = assign(g, "z", binary(g, reference(g, "x"), "+", num(g, "2")));
    let node = Generator::new(g).generate(calc.stmt, &value).unwrap();
    assert_eq!(format(&node, &FormatOptions::default()), "z = x + 2;");
}

#[test]
fn test_generate_document() {
    let calc = calc();
    let g = &calc.grammar;
    let value = Value::list([assign(g, "x", num(g, "1")), print(g, reference(g, "x"))]);
    let text = g.generate_text(&value).unwrap();
    assert_eq!(text, "x = 1;\nprint x;\n");
    assert_eq!(g.parse(&text).unwrap().value(), &value);
}

#[test]
fn test_parsed_value_round_trips() {
    let calc = calc();
    let g = &calc.grammar;
    for source in [SIMPLE, WITH_BINARY] {
        let doc = g.parse(source).unwrap();
        let text = g.generate_text(doc.value()).unwrap();
        assert_eq!(text, source);
    }
}

#[test]
fn test_mutated_value_regenerates_one_statement() {
    let calc = calc();
    let g = &calc.grammar;
    let source = "x  =  1;\ny = 2;\n";
    let doc = g.parse(source).unwrap();
    let second = doc.value().as_list().unwrap()[1].as_object().unwrap().clone();
    second.set("value", reference(g, "x"));

    let node = Generator::new(g).regenerate(&doc, &second).unwrap();
    // the untouched first line keeps its original spacing
    assert_eq!(g.format(&node, &FormatOptions::default()), "x  =  1;\ny = x;\n");
}

#[test]
fn test_wrong_statement_type() {
    let calc = calc();
    let g = &calc.grammar;
    let err = Generator::new(g).generate(calc.stmt, &num(g, "1")).unwrap_err();
    assert!(matches!(err, GenerateError::NoAlternative { ref rule, .. } if rule == "stmt"), "{err:?}");
}
