pub mod app;
pub mod command;
pub mod prompts;
pub mod render;
pub mod repl;

pub use app::Cli;
