//! ls / stat — inspect directories and entries.

use async_trait::async_trait;
use chrono::{DateTime, Local};

use crate::interpreter::ExecResult;
use crate::tools::{ExecContext, Tool, ToolArgs, ToolSchema};
use crate::vfs::{Entry, ListOptions};

/// Ls tool: list directory contents.
pub struct Ls;

/// Stat tool: print an entry as JSON.
pub struct Stat;

fn long_line(entry: &Entry) -> String {
    let kind = if entry.is_dir { 'd' } else { '-' };
    let modified = match entry.modified {
        Some(t) => DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M").to_string(),
        None => "-".repeat(16),
    };
    format!("{}{} {:>8} {} {}", kind, entry.perm, entry.size, modified, entry.name)
}

#[async_trait]
impl Tool for Ls {
    fn name(&self) -> &str {
        "ls"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("ls", "List directory contents").usage("ls [-l] [-a] [PATH]...")
    }

    async fn execute(&self, args: ToolArgs, ctx: &mut ExecContext) -> ExecResult {
        let long = args.has_flag("l");
        let opts = ListOptions {
            all: args.has_flag("a"),
            limit: None,
        };
        let targets = if args.positional.is_empty() {
            vec![".".to_string()]
        } else {
            args.positional.clone()
        };
        let headers = targets.len() > 1;

        let mut out = String::new();
        let mut errors = String::new();
        for (i, target) in targets.iter().enumerate() {
            let resolved = ctx.resolve_path(target);
            let entry = match ctx.ns.stat(&ctx.cx, &resolved).await {
                Ok(entry) => entry,
                Err(e) => {
                    errors.push_str(&format!("ls: {}: {}\n", target, e));
                    continue;
                }
            };
            let entries = if entry.is_dir {
                match ctx.ns.list(&ctx.cx, &resolved, &opts).await {
                    Ok(entries) => entries,
                    Err(e) => {
                        errors.push_str(&format!("ls: {}: {}\n", target, e));
                        continue;
                    }
                }
            } else {
                vec![entry]
            };

            if headers {
                if i > 0 {
                    out.push('\n');
                }
                out.push_str(&format!("{target}:\n"));
            }
            for entry in &entries {
                if long {
                    out.push_str(&long_line(entry));
                } else {
                    out.push_str(&entry.name);
                }
                out.push('\n');
            }
        }
        let code = if errors.is_empty() { 0 } else { 1 };
        ExecResult::from_output(code, out, errors)
    }
}

#[async_trait]
impl Tool for Stat {
    fn name(&self) -> &str {
        "stat"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("stat", "Show an entry as JSON").usage("stat PATH")
    }

    async fn execute(&self, args: ToolArgs, ctx: &mut ExecContext) -> ExecResult {
        let Some(target) = args.get(0) else {
            return ExecResult::failure(2, "stat: missing path argument\n");
        };
        let resolved = ctx.resolve_path(target);
        match ctx.ns.stat(&ctx.cx, &resolved).await {
            Ok(entry) => match serde_json::to_string_pretty(&entry) {
                Ok(json) => ExecResult::success(json + "\n"),
                Err(e) => ExecResult::failure(1, format!("stat: {}: {}\n", target, e)),
            },
            Err(e) => ExecResult::failure(1, format!("stat: {}: {}\n", target, e)),
        }
    }
}
