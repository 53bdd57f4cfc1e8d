//! Terminal client driving a room session.

mod command;
mod formatter;
mod runner;
mod ui;

pub use command::{ParseError, Role, UserCommand, parse_command};
pub use formatter::SnapshotFormatter;
pub use runner::{ClientOptions, NoticeTracker, run_client};
