//! External command supervision: spawning, polling and process group termination

mod error;
mod handle;
mod shutdown;

pub use error::ProcessError;
pub use handle::{CompletionState, ProcessHandle, KILLED_EXIT_CODE, TERMINATION_GRACE};
pub use shutdown::ShutdownSignal;
