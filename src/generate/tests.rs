use std::rc::Rc;

use rstest::rstest;

use super::*;
use crate::grammar::{GrammarBuilder, LiteralSet, Modifiers};
use crate::value::Object;

/// `x = 1;` statements, one per line
struct Assignments {
    grammar: Grammar,
    program: ParseletId,
    assign: ParseletId,
    expr: ParseletId,
}

fn assignments() -> Assignments {
    let mut b = GrammarBuilder::new("assignments");
    b.declare_type("Assign", None);
    b.declare_type("Expr", None);
    b.declare_type("Num", Some("Expr"));
    b.declare_type("Var", Some("Expr"));

    let word = b.literal_set("word", LiteralSet::char_range('a', 'z'), Modifiers::new().repeat());
    let digits = b.literal_set("digits", LiteralSet::char_range('0', '9'), Modifiers::new().repeat());
    let sp = b.literal_set("sp", LiteralSet::new([" "]), Modifiers::new().many());
    b.options_mut(sp).format = Some(FormatHint::Space);
    let nl = b.literal_set("nl", LiteralSet::new(["\n"]), Modifiers::new().many());
    b.options_mut(nl).format = Some(FormatHint::Newline);
    let eq = b.literal("eq", "=", Modifiers::NONE);
    let semi = b.literal("semi", ";", Modifiers::NONE);

    let num = b.sequence("Num(value)", &[digits], Modifiers::NONE);
    let var = b.sequence("Var(name)", &[word], Modifiers::NONE);
    let expr = b.choice("expr", &[num, var], Modifiers::NONE);
    let assign = b.sequence("Assign(target,,,,value,)", &[word, sp, eq, sp, expr, semi], Modifiers::NONE);
    let line = b.sequence("line(.,)", &[assign, nl], Modifiers::NONE);
    let program = b.choice("program", &[line], Modifiers::new().repeat());
    b.set_root(program);

    let grammar = b.build();
    assert!(grammar.diagnostics().is_empty(), "{:?}", grammar.diagnostics());
    Assignments {
        grammar,
        program,
        assign,
        expr,
    }
}

fn object(grammar: &Grammar, type_name: &str, props: &[(&str, Value)]) -> Value {
    let obj = ObjectRef::new(Object::new(grammar.types().lookup(type_name), Some(type_name.into())));
    for (key, value) in props {
        obj.set(key, value.clone());
    }
    Value::Object(obj)
}

fn assign(grammar: &Grammar, target: &str, value: Value) -> Value {
    object(grammar, "Assign", &[("target", Value::str(target)), ("value", value)])
}

fn num(grammar: &Grammar, digits: &str) -> Value {
    object(grammar, "Num", &[("value", Value::str(digits))])
}

fn var(grammar: &Grammar, name: &str) -> Value {
    object(grammar, "Var", &[("name", Value::str(name))])
}

// ============================================================================
// Formatting
// ============================================================================

#[test]
fn test_format_block_layout() {
    let options = FormatOptions::default();
    let mut ctx = FormatContext::new(&options);
    ctx.push_text("fn");
    ctx.push_hint(FormatHint::Space);
    ctx.push_text("main");
    ctx.push_hint(FormatHint::Space);
    ctx.push_text("{");
    ctx.push_hint(FormatHint::Indent);
    ctx.push_text("x");
    ctx.push_text(";");
    ctx.push_hint(FormatHint::Outdent);
    ctx.push_text("}");
    assert_eq!(ctx.finish(), "fn main {\n    x;\n}");
}

#[rstest]
#[case("a", ",", "a,")]
#[case("(", "x", "(x")]
#[case("a", ".", "a.")]
#[case("a", "b", "a b")]
fn test_space_hint_respects_punctuation(#[case] before: &str, #[case] after: &str, #[case] expected: &str) {
    let options = FormatOptions::default();
    let mut ctx = FormatContext::new(&options);
    ctx.push_text(before);
    ctx.push_hint(FormatHint::Space);
    ctx.push_text(after);
    assert_eq!(ctx.finish(), expected);
}

#[test]
fn test_format_hint_edge_cases() {
    let options = FormatOptions {
        insert_spaces: false,
        ..FormatOptions::default()
    };
    let mut ctx = FormatContext::new(&options);
    ctx.push_hint(FormatHint::Newline);
    ctx.push_text("a");
    ctx.push_hint(FormatHint::Space);
    ctx.push_hint(FormatHint::None);
    ctx.push_text("b");
    ctx.push_hint(FormatHint::Space);
    ctx.push_hint(FormatHint::Indent);
    ctx.push_text("c");
    ctx.push_hint(FormatHint::Newline);
    ctx.push_hint(FormatHint::Newline);
    // trailing space hints are never flushed
    ctx.push_hint(FormatHint::Space);
    assert_eq!(ctx.finish(), "ab\n\tc\n");
    assert_eq!(FormatOptions::default().indent(2), "        ");
}

#[test]
fn test_parsed_tree_prints_verbatim() {
    let fixture = assignments();
    let source = "x  =1;\n\ny = x;\n";
    let doc = fixture.grammar.parse(source).unwrap();
    assert!(!doc.root().has_placeholders());
    assert_eq!(format(doc.root(), &FormatOptions::default()), source);
}

// ============================================================================
// Generation
// ============================================================================

#[test]
fn test_generate_and_parse_back() {
    let fixture = assignments();
    let g = &fixture.grammar;
    let value = Value::list([assign(g, "x", num(g, "1")), assign(g, "y", var(g, "x"))]);

    let node = g.generate(&value).unwrap();
    assert!(node.has_placeholders());
    assert_eq!(node.text(), "x=1;y=x;");

    let text = g.generate_text(&value).unwrap();
    assert_eq!(text, "x = 1;\ny = x;\n");
    assert_eq!(g.parse(&text).unwrap().value(), &value);
}

#[test]
fn test_missing_property_uses_default_literal() {
    let fixture = assignments();
    let g = &fixture.grammar;
    let partial = object(g, "Assign", &[("target", Value::str("x"))]);
    assert_eq!(g.generate_text(&Value::list([partial])).unwrap(), "x = 0;\n");
}

#[test]
fn test_generation_errors() {
    let fixture = assignments();
    let g = &fixture.grammar;
    let generator = Generator::new(g);

    assert_eq!(
        generator.generate(fixture.assign, &num(g, "1")).unwrap_err(),
        GenerateError::TypeMismatch {
            rule: "Assign".to_string(),
            expected: "Assign".to_string(),
            found: "Num".to_string(),
        }
    );
    assert!(matches!(
        generator.generate(fixture.assign, &Value::str("x")),
        Err(GenerateError::TypeMismatch { found, .. }) if found == "string"
    ));
    assert!(matches!(
        generator.generate(fixture.expr, &Value::str("42")),
        Err(GenerateError::NoAlternative { rule, .. }) if rule == "expr"
    ));

    let value = Value::list([assign(g, "x", num(g, "1")), Value::str("junk")]);
    assert_eq!(
        generator.generate(fixture.program, &value).unwrap_err(),
        GenerateError::Unconsumed {
            rule: "program".to_string(),
            remaining: 1,
        }
    );
}

#[test]
fn test_string_values_are_parsed_by_literals() {
    let fixture = assignments();
    let g = &fixture.grammar;
    let bad = assign(g, "x1", num(g, "1"));
    assert!(matches!(
        g.generate(&Value::list([bad])),
        Err(GenerateError::Mismatch { rule, .. }) if rule == "word"
    ));
}

#[test]
fn test_list_of_words_round_trip() {
    let mut b = GrammarBuilder::new("words");
    let word = b.literal_set("word", LiteralSet::char_range('a', 'z'), Modifiers::new().repeat());
    let space = b.literal("space", " ", Modifiers::new().optional());
    b.options_mut(space).format = Some(FormatHint::Space);
    let item = b.sequence("item(.,)", &[word, space], Modifiers::NONE);
    let list = b.sequence("list([])", &[item], Modifiers::new().repeat());
    b.set_root(list);
    let grammar = b.build();

    let value = Value::list([Value::str("ab"), Value::str("cd")]);
    let text = grammar.generate_text(&value).unwrap();
    assert_eq!(text, "ab cd");
    assert_eq!(grammar.parse(&text).unwrap().value(), &value);
}

#[test]
fn test_chain_unfolds_into_head_and_tail() {
    let mut b = GrammarBuilder::new("members");
    b.declare_type("Ref", None);
    b.declare_type("Member", None);
    let word = b.literal_set("word", LiteralSet::char_range('a', 'z'), Modifiers::new().repeat());
    let dot = b.literal("dot", ".", Modifiers::NONE);
    let head = b.sequence("Ref(name)", &[word], Modifiers::NONE);
    let member = b.sequence("Member(,name)", &[dot, word], Modifiers::new().many());
    let path = b.sequence("path", &[head, member], Modifiers::NONE);
    b.options_mut(path).chain_slot = Some("target".into());
    b.set_root(path);
    let grammar = b.build();

    let doc = grammar.parse("a.b.c").unwrap();
    assert_eq!(grammar.generate_text(doc.value()).unwrap(), "a.b.c");
}

#[test]
fn test_inherited_slot_generates_from_the_parent_object() {
    let mut b = GrammarBuilder::new("fields");
    b.declare_type("Field", None);
    let word = b.literal_set("word", LiteralSet::char_range('a', 'z'), Modifiers::new().repeat());
    let colon = b.literal("colon", ":", Modifiers::NONE);
    let eq = b.literal("eq", "=", Modifiers::NONE);
    let annotation = b.sequence("annotation(,kind)", &[colon, word], Modifiers::new().optional());
    let field = b.sequence("Field(name,*,,init)", &[word, annotation, eq, word], Modifiers::NONE);
    b.set_root(field);
    let grammar = b.build();

    let doc = grammar.parse_rule(field, "a:int=b", ParseOptions::default()).unwrap();
    let obj = doc.value().as_object().unwrap().clone();
    obj.set("kind", "long");

    let node = Generator::new(&grammar).generate(field, doc.value()).unwrap();
    assert_eq!(format(&node, &FormatOptions::default()), "a:long=b");

    let reparsed = grammar.parse_rule(field, &node.text(), ParseOptions::default()).unwrap();
    assert_eq!(reparsed.value().get("kind").as_str(), Some("long"));
    assert_eq!(reparsed.value().get("name").as_str(), Some("a"));
}

// ============================================================================
// Regeneration
// ============================================================================

#[test]
fn test_regenerate_rebuilds_only_the_mutated_object() {
    let fixture = assignments();
    let g = &fixture.grammar;
    let doc = g.parse("x = 1;\ny = 2;\n").unwrap();
    let second = doc.value().as_list().unwrap()[1].as_object().unwrap().clone();
    second.set("target", "z");

    let regenerated = Generator::new(g).regenerate(&doc, &second).unwrap();
    assert_eq!(format(&regenerated, &FormatOptions::default()), "x = 1;\nz = 2;\n");

    let (old_first, new_first) = (&doc.root().children()[0], &regenerated.children()[0]);
    match (old_first, new_first) {
        (ParseElement::Node(a), ParseElement::Node(b)) => assert!(Rc::ptr_eq(a, b)),
        _ => panic!("expected nodes"),
    }
    let bound = second.borrow().parse_node().unwrap();
    assert!(matches!(&regenerated.children()[1], ParseElement::Node(n) if Rc::ptr_eq(n, &bound)));
}

#[test]
fn test_regenerate_foreign_object() {
    let fixture = assignments();
    let g = &fixture.grammar;
    let doc = g.parse("x = 1;\n").unwrap();
    let stranger = ObjectRef::new(Object::anonymous());
    assert_eq!(
        Generator::new(g).regenerate(&doc, &stranger).unwrap_err(),
        GenerateError::NotInDocument
    );
}
