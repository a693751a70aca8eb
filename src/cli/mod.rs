pub mod args;
pub mod commands;

pub use args::{Cli, Commands, Selection};
pub use commands::{block_on, run};
