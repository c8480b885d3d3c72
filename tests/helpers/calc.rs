//! A small statement language used across the integration tests.
//!
//! ```text
//! x = 1 + y;
//! print x;
//! ```

use parselets::{FormatHint, Grammar, GrammarBuilder, LiteralSet, Modifiers, ParseletId, ParseletOptions, Value};

/// The calc grammar plus the rules tests address directly
pub struct Calc {
    pub grammar: Grammar,
    pub stmt: ParseletId,
    pub sum: ParseletId,
    pub program: ParseletId,
}

pub fn calc() -> Calc {
    let mut b = GrammarBuilder::new("calc");
    b.declare_type("Stmt", None);
    b.declare_type("Assign", Some("Stmt"));
    b.declare_type("Print", Some("Stmt"));
    b.declare_type("Expr", None);
    b.declare_type("Num", Some("Expr"));
    b.declare_type("Ref", Some("Expr"));
    b.declare_type("Binary", Some("Expr"));

    // tokens
    let ident = b.literal_set("ident", LiteralSet::char_range('a', 'z'), Modifiers::new().repeat());
    *b.options_mut(ident) = ParseletOptions::default().accept(|_, text| {
        if text == "print" {
            Err("'print' is a keyword".to_string())
        } else {
            Ok(())
        }
    });
    let number = b.literal_set("number", LiteralSet::char_range('0', '9'), Modifiers::new().repeat());
    let ws = b.literal_set("ws", LiteralSet::new([" ", "\t"]), Modifiers::new().many());
    b.options_mut(ws).format = Some(FormatHint::Space);
    let nl = b.literal_set("nl", LiteralSet::new(["\n"]), Modifiers::new().many());
    b.options_mut(nl).format = Some(FormatHint::Newline);
    let eq = b.literal("eq", "=", Modifiers::NONE);
    let semi = b.literal("semi", ";", Modifiers::NONE);
    let print_kw = b.literal("print_kw", "print", Modifiers::NONE);
    let op = b.literal_set("op", LiteralSet::new(["+", "-"]), Modifiers::NONE);
    let eof = b.literal_set("eof", LiteralSet::end_of_input(), Modifiers::NONE);

    // expressions
    let num = b.sequence("Num(value)", &[number], Modifiers::NONE);
    let reference = b.sequence("Ref(name)", &[ident], Modifiers::NONE);
    let atom = b.choice("atom", &[num, reference], Modifiers::NONE);
    let tail = b.sequence("Binary(,op,,right)", &[ws, op, ws, atom], Modifiers::new().many());
    let sum = b.sequence("sum", &[atom, tail], Modifiers::NONE);
    b.options_mut(sum).chain_slot = Some("left".into());

    // statements
    let print = b.sequence("Print(,,value,)", &[print_kw, ws, sum, semi], Modifiers::NONE);
    let assign = b.sequence("Assign(target,,,,value,)", &[ident, ws, eq, ws, sum, semi], Modifiers::NONE);
    let stmt = b.choice("stmt", &[print, assign], Modifiers::NONE);
    let line = b.sequence("line(.,)", &[stmt, nl], Modifiers::NONE);

    // a broken line is skipped up to and including its newline
    let rest = b.literal_set("rest", LiteralSet::new(["\n"]), Modifiers::new().negated().many());
    let eol = b.literal("eol", "\n", Modifiers::new().optional());
    let junk = b.sequence("junk", &[rest, eol], Modifiers::NONE);

    let program = b.choice("program", &[line], Modifiers::new().many());
    b.options_mut(program).skip_on_error = Some(junk);
    b.options_mut(program).exit = Some(eof);
    let document = b.sequence("document(.,)", &[program, eof], Modifiers::NONE);
    b.set_root(document);

    Calc {
        grammar: b.build(),
        stmt,
        sum,
        program,
    }
}

/// Build an object of one of the grammar's declared types
pub fn object(grammar: &Grammar, type_name: &str, props: &[(&str, Value)]) -> Value {
    let obj = parselets::ObjectRef::new(parselets::Object::new(
        grammar.types().lookup(type_name),
        Some(type_name.into()),
    ));
    for (key, value) in props {
        obj.set(key, value.clone());
    }
    Value::Object(obj)
}

pub fn num(grammar: &Grammar, digits: &str) -> Value {
    object(grammar, "Num", &[("value", Value::str(digits))])
}

pub fn reference(grammar: &Grammar, name: &str) -> Value {
    object(grammar, "Ref", &[("name", Value::str(name))])
}

pub fn assign(grammar: &Grammar, target: &str, value: Value) -> Value {
    object(grammar, "Assign", &[("target", Value::str(target)), ("value", value)])
}

pub fn print(grammar: &Grammar, value: Value) -> Value {
    object(grammar, "Print", &[("value", value)])
}

pub fn binary(grammar: &Grammar, left: Value, op: &str, right: Value) -> Value {
    object(
        grammar,
        "Binary",
        &[("left", left), ("op", Value::str(op)), ("right", right)],
    )
}
