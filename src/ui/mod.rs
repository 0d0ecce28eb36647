pub mod app;
pub mod command;
pub mod render;

pub use app::App;
pub use command::{Command, CommandError, SessionRef};
