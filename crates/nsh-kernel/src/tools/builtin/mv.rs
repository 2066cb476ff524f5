//! mv / cp — move within a backend, copy anywhere.

use async_trait::async_trait;

use crate::interpreter::ExecResult;
use crate::tools::{ExecContext, Tool, ToolArgs, ToolSchema};
use crate::vfs::{path, VfsResult, WriteMode};

/// Mv tool: rename an entry. Refused across backends.
pub struct Mv;

/// Cp tool: copy a file by reading and writing it, so it works across backends.
pub struct Cp;

/// If `dest` is an existing directory, the target is `dest/<basename of src>`.
async fn final_target(ctx: &ExecContext, src: &str, dest: &str) -> VfsResult<String> {
    match ctx.ns.stat(&ctx.cx, dest).await {
        Ok(entry) if entry.is_dir => Ok(path::join(dest, path::base_name(src))),
        Ok(_) => Ok(dest.to_string()),
        Err(e) if e.is_not_found() => Ok(dest.to_string()),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl Tool for Mv {
    fn name(&self) -> &str {
        "mv"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("mv", "Move or rename an entry").usage("mv SRC DEST")
    }

    async fn execute(&self, args: ToolArgs, ctx: &mut ExecContext) -> ExecResult {
        let (Some(src), Some(dest)) = (args.get(0), args.get(1)) else {
            return ExecResult::failure(2, "mv: usage: mv SRC DEST\n");
        };
        let from = ctx.resolve_path(src);
        let dest = ctx.resolve_path(dest);
        let result = match final_target(ctx, &from, &dest).await {
            Ok(to) => ctx.ns.rename(&ctx.cx, &from, &to).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => ExecResult::success(""),
            Err(e) => ExecResult::failure(1, format!("mv: {}: {}\n", src, e)),
        }
    }
}

#[async_trait]
impl Tool for Cp {
    fn name(&self) -> &str {
        "cp"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("cp", "Copy a file").usage("cp SRC DEST")
    }

    async fn execute(&self, args: ToolArgs, ctx: &mut ExecContext) -> ExecResult {
        let (Some(src), Some(dest)) = (args.get(0), args.get(1)) else {
            return ExecResult::failure(2, "cp: usage: cp SRC DEST\n");
        };
        let from = ctx.resolve_path(src);
        let dest = ctx.resolve_path(dest);
        let copy = async {
            let to = final_target(ctx, &from, &dest).await?;
            let data = ctx.ns.open(&ctx.cx, &from).await?;
            ctx.ns.write(&ctx.cx, &to, &data, WriteMode::Truncate).await
        };
        match copy.await {
            Ok(()) => ExecResult::success(""),
            Err(e) => ExecResult::failure(1, format!("cp: {}: {}\n", src, e)),
        }
    }
}
