//! cat — Concatenate files (or stdin) to stdout.

use async_trait::async_trait;

use crate::interpreter::ExecResult;
use crate::tools::{ExecContext, Tool, ToolArgs, ToolSchema};

/// Cat tool: read and output file contents.
pub struct Cat;

#[async_trait]
impl Tool for Cat {
    fn name(&self) -> &str {
        "cat"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("cat", "Concatenate files to standard output").usage("cat [FILE]...")
    }

    async fn execute(&self, args: ToolArgs, ctx: &mut ExecContext) -> ExecResult {
        if args.positional.is_empty() {
            return ExecResult::success(ctx.take_stdin().unwrap_or_default());
        }

        let mut out = String::new();
        let mut errors = String::new();
        for path in &args.positional {
            if path == "-" {
                out.push_str(&ctx.take_stdin().unwrap_or_default());
                continue;
            }
            match ctx.read_text(path).await {
                Ok(text) => out.push_str(&text),
                Err(e) => errors.push_str(&format!("cat: {}: {}\n", path, e)),
            }
        }
        let code = if errors.is_empty() { 0 } else { 1 };
        ExecResult::from_output(code, out, errors)
    }
}
