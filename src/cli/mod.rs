//! CLI module
//!
//! `org-crawler <ORG>` fetches every repository of the organization and
//! prints the total plus the first few records. A partial result is
//! printed with a note and still exits successfully.

mod commands;
mod runner;

pub use commands::{Cli, OutputFormat};
pub use runner::Runner;
