mod error;
pub use error::ExecError;

mod sandbox;
pub use sandbox::{Sandbox, SandboxError};

mod proc;
pub use proc::{ProcSpec, run_to_exit, spawn_detached};

mod tail;
pub use tail::{DEFAULT_TAIL_LINES, read_tail};
