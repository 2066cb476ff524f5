//! rm — Remove files and directories.

use async_trait::async_trait;

use crate::interpreter::ExecResult;
use crate::tools::{ExecContext, Tool, ToolArgs, ToolSchema};

/// Rm tool: remove files and directories.
pub struct Rm;

#[async_trait]
impl Tool for Rm {
    fn name(&self) -> &str {
        "rm"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("rm", "Remove files and directories").usage("rm [-r] [-f] PATH...")
    }

    async fn execute(&self, args: ToolArgs, ctx: &mut ExecContext) -> ExecResult {
        if args.positional.is_empty() {
            return ExecResult::failure(2, "rm: missing operand\n");
        }
        let recursive = args.has_flag("r") || args.has_flag("R");
        let force = args.has_flag("f");

        let mut errors = String::new();
        for target in &args.positional {
            let resolved = ctx.resolve_path(target);
            match ctx.ns.remove(&ctx.cx, &resolved, recursive).await {
                Ok(()) => {}
                Err(e) if force && e.is_not_found() => {}
                Err(e) => errors.push_str(&format!("rm: {}: {}\n", target, e)),
            }
        }
        if errors.is_empty() {
            ExecResult::success("")
        } else {
            ExecResult::failure(1, errors)
        }
    }
}
