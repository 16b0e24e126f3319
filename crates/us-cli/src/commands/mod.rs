//! Command implementations for the UnderSight CLI.

mod check;
mod process;

pub use check::{cmd_check, CheckArgs};
pub use process::{cmd_process, ProcessArgs};
