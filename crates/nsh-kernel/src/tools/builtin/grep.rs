//! grep — Print lines matching a regular expression.

use async_trait::async_trait;
use regex::RegexBuilder;

use crate::interpreter::ExecResult;
use crate::tools::{ExecContext, Tool, ToolArgs, ToolSchema};

pub struct Grep;

#[async_trait]
impl Tool for Grep {
    fn name(&self) -> &str {
        "grep"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("grep", "Print lines matching a pattern")
            .usage("grep [-i] [-v] [-c] [-n] PATTERN [FILE]...")
    }

    async fn execute(&self, args: ToolArgs, ctx: &mut ExecContext) -> ExecResult {
        let Some(pattern) = args.get(0) else {
            return ExecResult::failure(2, "grep: missing pattern\n");
        };
        let regex = match RegexBuilder::new(pattern)
            .case_insensitive(args.has_flag("i"))
            .build()
        {
            Ok(regex) => regex,
            Err(e) => return ExecResult::failure(2, format!("grep: {e}\n")),
        };
        let invert = args.has_flag("v");
        let count_only = args.has_flag("c");
        let numbered = args.has_flag("n");

        let inputs = match ctx.read_inputs(&args.positional[1..]).await {
            Ok(inputs) => inputs,
            Err(e) => return ExecResult::failure(2, format!("grep: {e}\n")),
        };
        let prefixed = inputs.len() > 1;

        let mut out = String::new();
        let mut matched_any = false;
        for (label, text) in &inputs {
            let mut count = 0usize;
            for (idx, line) in text.lines().enumerate() {
                if regex.is_match(line) == invert {
                    continue;
                }
                count += 1;
                if count_only {
                    continue;
                }
                if prefixed {
                    out.push_str(label);
                    out.push(':');
                }
                if numbered {
                    out.push_str(&format!("{}:", idx + 1));
                }
                out.push_str(line);
                out.push('\n');
            }
            if count_only {
                if prefixed {
                    out.push_str(&format!("{label}:"));
                }
                out.push_str(&format!("{count}\n"));
            }
            matched_any |= count > 0;
        }
        ExecResult::from_output(if matched_any { 0 } else { 1 }, out, "")
    }
}
