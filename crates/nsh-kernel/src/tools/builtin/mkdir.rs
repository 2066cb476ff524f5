//! mkdir — Create directories.

use async_trait::async_trait;

use crate::interpreter::ExecResult;
use crate::tools::{ExecContext, Tool, ToolArgs, ToolSchema};
use crate::vfs::{VfsError, VfsResult};

/// Mkdir tool: create directories.
pub struct Mkdir;

/// Create `full` and any missing ancestors. Existing directories are fine.
async fn mkdir_parents(ctx: &ExecContext, full: &str) -> VfsResult<()> {
    let mut current = String::new();
    for segment in full.split('/').filter(|s| !s.is_empty()) {
        current.push('/');
        current.push_str(segment);
        match ctx.ns.stat(&ctx.cx, &current).await {
            Ok(entry) if entry.is_dir => continue,
            Ok(_) => return Err(VfsError::not_a_directory(current)),
            Err(e) if e.is_not_found() => ctx.ns.mkdir(&ctx.cx, &current).await?,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[async_trait]
impl Tool for Mkdir {
    fn name(&self) -> &str {
        "mkdir"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("mkdir", "Create directories").usage("mkdir [-p] DIR...")
    }

    async fn execute(&self, args: ToolArgs, ctx: &mut ExecContext) -> ExecResult {
        if args.positional.is_empty() {
            return ExecResult::failure(2, "mkdir: missing operand\n");
        }
        let parents = args.has_flag("p");
        let mut errors = String::new();
        for dir in &args.positional {
            let full = ctx.resolve_path(dir);
            let result = if parents {
                mkdir_parents(ctx, &full).await
            } else {
                ctx.ns.mkdir(&ctx.cx, &full).await
            };
            if let Err(e) = result {
                errors.push_str(&format!("mkdir: {}: {}\n", dir, e));
            }
        }
        if errors.is_empty() {
            ExecResult::success("")
        } else {
            ExecResult::failure(1, errors)
        }
    }
}
