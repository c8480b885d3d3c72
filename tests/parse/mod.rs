mod tests_errors;
mod tests_input;
mod tests_parse;
mod tests_recovery;
