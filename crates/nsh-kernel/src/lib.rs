//! nsh-kernel: one path namespace over many backends, and the shell that
//! drives it.
//!
//! This crate provides:
//!
//! - **Namespace** ([`vfs`]): mount table with longest-prefix resolution,
//!   the capability-checked façade, and the change-event hub
//! - **Backends**: memory, host directory, and the `/bin` utility table
//! - **Lexer** / **Parser**: logos tokens and a chumsky grammar for
//!   pipelines, `&&`/`||`, groups, redirects and here-documents
//! - **Interpreter**: expansion, execution and per-shell sessions
//! - **Kernel**: the standard layout, ready to hand out shells

pub mod ast;
pub mod cx;
pub mod glob;
pub mod interpreter;
pub mod kernel;
pub mod lexer;
pub mod parser;
pub mod tools;
pub mod vfs;

pub use cx::Cx;
pub use interpreter::{ExecResult, Session, Shell, ShellError};
pub use kernel::{Kernel, KernelConfig};
pub use vfs::{Namespace, VfsError, VfsResult};
