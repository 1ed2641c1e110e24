//! Command-line interface

mod cli;

pub use cli::*;
