pub mod cli;
pub mod config;
pub mod date;
pub mod error;
pub mod models;
pub mod renamer;
pub mod runtime;
pub mod scanner;
pub mod session;
pub mod util;
pub mod validate;
pub mod watcher;

pub use cli::run_cli;
