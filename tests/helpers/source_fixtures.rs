//! Calc sources shared by the integration tests.

pub const SIMPLE: &str = "x = 1;\ny = 2;\nprint x;\n";

pub const WITH_BINARY: &str = "x = 1 + y;\nprint x - 2;\n";

/// The middle statement has no value
pub const MISSING_VALUE: &str = "x = 1;\ny = ;\nprint x;\n";

/// The middle line is not a statement at all
pub const GARBAGE_LINE: &str = "x = 1;\n%%%\nprint x;\n";
