//! touch — Update timestamps, creating empty files.

use async_trait::async_trait;

use crate::interpreter::ExecResult;
use crate::tools::{ExecContext, Tool, ToolArgs, ToolSchema};

pub struct Touch;

#[async_trait]
impl Tool for Touch {
    fn name(&self) -> &str {
        "touch"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("touch", "Update timestamps, creating missing files").usage("touch FILE...")
    }

    async fn execute(&self, args: ToolArgs, ctx: &mut ExecContext) -> ExecResult {
        if args.positional.is_empty() {
            return ExecResult::failure(2, "touch: missing file operand\n");
        }
        let mut errors = String::new();
        for target in &args.positional {
            let resolved = ctx.resolve_path(target);
            if let Err(e) = ctx.ns.touch(&ctx.cx, &resolved).await {
                errors.push_str(&format!("touch: {}: {}\n", target, e));
            }
        }
        if errors.is_empty() {
            ExecResult::success("")
        } else {
            ExecResult::failure(1, errors)
        }
    }
}
