//! Slot descriptor mini-language embedded in parselet names.
//!
//! ```text
//! descriptor := name? params? (':' params)?
//! name       := ident | '<' ident '>'          // <..> marks a positional name
//! params     := '(' param (',' param)* ')'
//! param      := ''                              // SKIP
//!             | '.'                             // PROPAGATE
//!             | "''"                            // STRING
//!             | '[]'                            // ARRAY
//!             | '*'                             // INHERIT
//!             | ident                           // NAMED_SLOT
//! ```
//!
//! The optional `:(...)` segment overrides slots for generation only.

use logos::Logos;
use smol_str::SmolStr;
use thiserror::Error;

use super::slots::SlotKind;

/// A parsed descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Descriptor {
    pub name: SmolStr,
    /// Name was written as `<name>`
    pub positional: bool,
    pub slots: Option<Vec<SlotKind>>,
    pub generate_slots: Option<Vec<SlotKind>>,
}

/// Malformed descriptor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("invalid character at {0}")]
    InvalidChar(usize),
    #[error("unexpected '{found}' at {offset}, expected {expected}")]
    Unexpected {
        found: String,
        offset: usize,
        expected: &'static str,
    },
    #[error("unterminated descriptor, expected {0}")]
    Unterminated(&'static str),
    #[error("more than one propagate slot")]
    MultiplePropagate,
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t]+")]
enum DescToken {
    #[token("<")]
    LAngle,
    #[token(">")]
    RAngle,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("''")]
    Quotes,
    #[token("[]")]
    Brackets,
    #[token("*")]
    Star,
    #[regex(r"[A-Za-z_$][A-Za-z0-9_$\-]*")]
    Ident,
}

struct Cursor<'a> {
    tokens: Vec<(DescToken, &'a str, usize)>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<DescToken> {
        self.tokens.get(self.pos).map(|t| t.0)
    }

    fn bump(&mut self) -> Option<(DescToken, &'a str, usize)> {
        let token = self.tokens.get(self.pos).copied();
        self.pos += 1;
        token
    }

    fn expect(&mut self, kind: DescToken, expected: &'static str) -> Result<&'a str, DescriptorError> {
        match self.bump() {
            Some((found, text, _)) if found == kind => Ok(text),
            Some((_, text, offset)) => Err(DescriptorError::Unexpected {
                found: text.to_string(),
                offset,
                expected,
            }),
            None => Err(DescriptorError::Unterminated(expected)),
        }
    }
}

/// Parse a parselet name with its optional slot descriptors.
pub fn parse_descriptor(text: &str) -> Result<Descriptor, DescriptorError> {
    let mut tokens = Vec::new();
    for (token, span) in DescToken::lexer(text).spanned() {
        match token {
            Ok(kind) => tokens.push((kind, &text[span.clone()], span.start)),
            Err(()) => return Err(DescriptorError::InvalidChar(span.start)),
        }
    }
    let mut cursor = Cursor { tokens, pos: 0 };
    let mut descriptor = Descriptor::default();

    match cursor.peek() {
        Some(DescToken::LAngle) => {
            cursor.bump();
            descriptor.name = SmolStr::new(cursor.expect(DescToken::Ident, "a name")?);
            cursor.expect(DescToken::RAngle, "'>'")?;
            descriptor.positional = true;
        }
        Some(DescToken::Ident) => {
            if let Some((_, name, _)) = cursor.bump() {
                descriptor.name = SmolStr::new(name);
            }
        }
        _ => {}
    }

    if cursor.peek() == Some(DescToken::LParen) {
        descriptor.slots = Some(parse_params(&mut cursor)?);
    }
    if cursor.peek() == Some(DescToken::Colon) {
        cursor.bump();
        if cursor.peek() != Some(DescToken::LParen) {
            return match cursor.bump() {
                Some((_, found, offset)) => Err(DescriptorError::Unexpected {
                    found: found.to_string(),
                    offset,
                    expected: "'('",
                }),
                None => Err(DescriptorError::Unterminated("'('")),
            };
        }
        descriptor.generate_slots = Some(parse_params(&mut cursor)?);
    }
    if let Some((_, found, offset)) = cursor.bump() {
        return Err(DescriptorError::Unexpected {
            found: found.to_string(),
            offset,
            expected: "end of descriptor",
        });
    }
    Ok(descriptor)
}

fn parse_params(cursor: &mut Cursor<'_>) -> Result<Vec<SlotKind>, DescriptorError> {
    cursor.expect(DescToken::LParen, "'('")?;
    let mut slots = Vec::new();
    loop {
        let slot = match cursor.peek() {
            Some(DescToken::Comma) | Some(DescToken::RParen) => SlotKind::Skip,
            Some(_) => {
                let Some((kind, text, offset)) = cursor.bump() else {
                    return Err(DescriptorError::Unterminated("')'"));
                };
                match kind {
                    DescToken::Dot => SlotKind::Propagate,
                    DescToken::Quotes => SlotKind::Str,
                    DescToken::Brackets => SlotKind::Array,
                    DescToken::Star => SlotKind::Inherit,
                    DescToken::Ident => SlotKind::Named(SmolStr::new(text)),
                    _ => {
                        return Err(DescriptorError::Unexpected {
                            found: text.to_string(),
                            offset,
                            expected: "a slot",
                        });
                    }
                }
            }
            None => return Err(DescriptorError::Unterminated("')'")),
        };
        slots.push(slot);
        match cursor.bump() {
            Some((DescToken::Comma, _, _)) => continue,
            Some((DescToken::RParen, _, _)) => break,
            Some((_, found, offset)) => {
                return Err(DescriptorError::Unexpected {
                    found: found.to_string(),
                    offset,
                    expected: "',' or ')'",
                });
            }
            None => return Err(DescriptorError::Unterminated("')'")),
        }
    }
    if slots.iter().filter(|s| matches!(s, SlotKind::Propagate)).count() > 1 {
        return Err(DescriptorError::MultiplePropagate);
    }
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_plain_name() {
        let d = parse_descriptor("statement").unwrap();
        assert_eq!(d.name, "statement");
        assert!(!d.positional);
        assert!(d.slots.is_none());
    }

    #[test]
    fn test_positional_name() {
        let d = parse_descriptor("<identifier>('')").unwrap();
        assert_eq!(d.name, "identifier");
        assert!(d.positional);
        assert_eq!(d.slots, Some(vec![SlotKind::Str]));
    }

    #[test]
    fn test_all_slot_kinds() {
        let d = parse_descriptor("Binary(lhs, ,.,'',[],*)").unwrap();
        assert_eq!(
            d.slots.unwrap(),
            vec![
                SlotKind::Named("lhs".into()),
                SlotKind::Skip,
                SlotKind::Propagate,
                SlotKind::Str,
                SlotKind::Array,
                SlotKind::Inherit,
            ]
        );
    }

    #[test]
    fn test_generation_overrides() {
        let d = parse_descriptor("list([],[]):(.,[])").unwrap();
        assert_eq!(d.slots, Some(vec![SlotKind::Array, SlotKind::Array]));
        assert_eq!(
            d.generate_slots,
            Some(vec![SlotKind::Propagate, SlotKind::Array])
        );
    }

    #[test]
    fn test_empty_params_are_skips() {
        let d = parse_descriptor("paren(,.,)").unwrap();
        assert_eq!(
            d.slots,
            Some(vec![SlotKind::Skip, SlotKind::Propagate, SlotKind::Skip])
        );
        assert_eq!(parse_descriptor("x()").unwrap().slots, Some(vec![SlotKind::Skip]));
    }

    #[rstest]
    #[case("a(.,.)")]
    #[case("a(b c)")]
    #[case("a(b")]
    #[case("<a")]
    #[case("a(b):c")]
    #[case("a(#)")]
    #[case("a(b) c")]
    fn test_malformed(#[case] text: &str) {
        assert!(parse_descriptor(text).is_err(), "{text} should be rejected");
    }
}
