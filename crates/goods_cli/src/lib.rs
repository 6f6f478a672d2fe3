//! Command-line front end of the goods migration tool.

pub mod args;
pub mod cli;
pub mod commands;
pub mod output;

pub use args::{ArgError, Env, Resolver};
pub use cli::{Cli, Command};
pub use commands::{Connector, Report, run};
