//! The command interpreter.
//!
//! A [`Shell`] parses one line at a time and runs it against a
//! [`Namespace`](crate::vfs::Namespace). Builtins that touch session state
//! (`cd`, `export`, ...) run in-process; every other command is looked up
//! on `PATH` and executed through the namespace.

mod builtins;
mod expand;
mod result;
mod session;
mod shell;

pub use builtins::{is_builtin, names as builtin_names};
pub use result::ExecResult;
pub use session::{PostExecHook, Session};
pub use shell::{CANCELLED_CODE, NOT_EXECUTABLE_CODE, NOT_FOUND_CODE, Shell, ShellError};
