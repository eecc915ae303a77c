//! Library half of the `chwire` binary: argument parsing and the JSON view of values.

pub mod cli;
pub mod json;
