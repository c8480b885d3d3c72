//! Resolution of format placeholders into text.
//!
//! Generated trees hold [`FormatHint`] placeholders where the grammar only
//! describes layout. Printing walks the finished tree left to right and turns
//! each hint into spaces, newlines and indentation. Text from parsed nodes is
//! copied verbatim, so a tree without placeholders prints its source text.

use crate::tree::{NodeKind, ParseElement, ParseNode};

/// Layout produced by a placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatHint {
    /// One space between the neighbouring tokens, unless punctuation forbids it
    Space,
    /// Line break at the current indentation
    Newline,
    /// Line break one level deeper
    Indent,
    /// Line break one level shallower
    Outdent,
    /// Nothing; also cancels a pending space
    None,
}

/// Formatting configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    /// Number of spaces per indentation level (or tab width if using tabs)
    pub tab_size: usize,
    /// Use spaces for indentation (false = use tabs)
    pub insert_spaces: bool,
    /// A hinted space is dropped before these chars
    pub no_space_before: String,
    /// A hinted space is dropped after these chars
    pub no_space_after: String,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            tab_size: 4,
            insert_spaces: true,
            no_space_before: ",;)]}.".to_string(),
            no_space_after: "([{.".to_string(),
        }
    }
}

impl FormatOptions {
    /// Generate indentation string for the given level
    pub fn indent(&self, level: usize) -> String {
        if self.insert_spaces {
            " ".repeat(self.tab_size * level)
        } else {
            "\t".repeat(level)
        }
    }
}

/// Output state while printing one tree
pub struct FormatContext<'a> {
    options: &'a FormatOptions,
    output: String,
    indent_level: usize,
    at_line_start: bool,
    pending_space: bool,
}

impl<'a> FormatContext<'a> {
    pub fn new(options: &'a FormatOptions) -> Self {
        Self {
            options,
            output: String::new(),
            indent_level: 0,
            at_line_start: false,
            pending_space: false,
        }
    }

    pub fn push_text(&mut self, text: &str) {
        let Some(first) = text.chars().next() else {
            return;
        };
        if self.at_line_start {
            let indent = self.options.indent(self.indent_level);
            self.output.push_str(&indent);
        } else if self.pending_space && self.wants_space(first) {
            self.output.push(' ');
        }
        self.output.push_str(text);
        self.at_line_start = false;
        self.pending_space = false;
    }

    fn wants_space(&self, next: char) -> bool {
        match self.output.chars().last() {
            None => false,
            Some(prev) => {
                !prev.is_whitespace()
                    && !next.is_whitespace()
                    && !self.options.no_space_before.contains(next)
                    && !self.options.no_space_after.contains(prev)
            }
        }
    }

    pub fn push_hint(&mut self, hint: FormatHint) {
        match hint {
            FormatHint::Space => self.pending_space = !self.at_line_start,
            FormatHint::None => self.pending_space = false,
            FormatHint::Newline => self.newline(),
            FormatHint::Indent => {
                self.indent_level += 1;
                self.newline();
            }
            FormatHint::Outdent => {
                self.indent_level = self.indent_level.saturating_sub(1);
                self.newline();
            }
        }
    }

    fn newline(&mut self) {
        self.pending_space = false;
        if self.at_line_start || self.output.is_empty() {
            return;
        }
        while self.output.ends_with(' ') || self.output.ends_with('\t') {
            self.output.pop();
        }
        self.output.push('\n');
        self.at_line_start = true;
    }

    /// Print `node` and everything below it
    pub fn write_node(&mut self, node: &ParseNode) {
        match node.kind() {
            NodeKind::Leaf(text) => self.push_text(text),
            NodeKind::Formatted(hint) => self.push_hint(*hint),
            NodeKind::Parent(children) | NodeKind::Error { children, .. } => {
                for child in children {
                    match child {
                        ParseElement::Node(child) => self.write_node(child),
                        ParseElement::Text(text) => self.push_text(text),
                        ParseElement::Empty => {}
                    }
                }
            }
        }
    }

    pub fn finish(self) -> String {
        self.output
    }
}

/// Print a tree, resolving its placeholders
pub fn format(node: &ParseNode, options: &FormatOptions) -> String {
    let mut ctx = FormatContext::new(options);
    ctx.write_node(node);
    ctx.finish()
}
