pub mod cli;
pub mod config;
pub mod dirty_form;
pub mod fetch;
pub mod frame;
pub mod history;
pub mod messages;
pub mod navigation;
pub mod overlay;
pub mod shell;

pub use config::{Config, ShellSettings};
pub use fetch::{ErrorKind, FetchError, FrameFetcher, FrameRequest, HttpFetcher};
pub use frame::{Frame, FrameId, Message, MessageLevel, Response};
pub use shell::{Shell, ShellUpdate};
