//! head / tail — first or last lines of input.

use async_trait::async_trait;

use crate::interpreter::ExecResult;
use crate::tools::{ExecContext, Tool, ToolArgs, ToolSchema};

const DEFAULT_LINES: usize = 10;

/// Head tool: output the first lines.
pub struct Head;

/// Tail tool: output the last lines.
pub struct Tail;

fn first_lines(text: &str, n: usize) -> String {
    text.split_inclusive('\n').take(n).collect()
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    lines[lines.len().saturating_sub(n)..].concat()
}

async fn run(
    name: &str,
    args: ToolArgs,
    ctx: &mut ExecContext,
    select: fn(&str, usize) -> String,
) -> ExecResult {
    let count = match args.option_usize("n") {
        Ok(n) => n.unwrap_or(DEFAULT_LINES),
        Err(e) => return ExecResult::failure(2, format!("{name}: {e}\n")),
    };
    let inputs = match ctx.read_inputs(&args.positional).await {
        Ok(inputs) => inputs,
        Err(e) => return ExecResult::failure(1, format!("{name}: {e}\n")),
    };
    let headers = inputs.len() > 1;
    let mut out = String::new();
    for (i, (label, text)) in inputs.iter().enumerate() {
        if headers {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&format!("==> {label} <==\n"));
        }
        out.push_str(&select(text, count));
    }
    ExecResult::success(out)
}

#[async_trait]
impl Tool for Head {
    fn name(&self) -> &str {
        "head"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("head", "Output the first lines of input").usage("head [-n N] [FILE]...")
    }

    fn value_options(&self) -> &'static [&'static str] {
        &["n"]
    }

    async fn execute(&self, args: ToolArgs, ctx: &mut ExecContext) -> ExecResult {
        run("head", args, ctx, first_lines).await
    }
}

#[async_trait]
impl Tool for Tail {
    fn name(&self) -> &str {
        "tail"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("tail", "Output the last lines of input").usage("tail [-n N] [FILE]...")
    }

    fn value_options(&self) -> &'static [&'static str] {
        &["n"]
    }

    async fn execute(&self, args: ToolArgs, ctx: &mut ExecContext) -> ExecResult {
        run("tail", args, ctx, last_lines).await
    }
}
