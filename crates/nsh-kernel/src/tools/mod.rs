//! Utilities: thin callers of the namespace, exposed as executables under `/bin`.

mod args;
pub mod builtin;
mod context;
mod registry;
mod traits;

pub use args::ToolArgs;
pub use context::ExecContext;
pub use registry::ToolRegistry;
pub use traits::{Tool, ToolSchema};
