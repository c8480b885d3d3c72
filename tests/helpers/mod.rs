#![allow(dead_code)]

pub mod calc;
pub mod source_fixtures;
