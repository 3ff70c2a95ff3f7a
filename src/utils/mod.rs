pub mod command;
pub mod locker;

pub use command::{run_shell_command, CommandError};
pub use locker::RunLock;
