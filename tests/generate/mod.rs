mod tests_generate;
