//! mount / umount / mounts — manage the mount table at runtime.

use async_trait::async_trait;

use crate::interpreter::ExecResult;
use crate::tools::{ExecContext, Tool, ToolArgs, ToolSchema};
use crate::vfs::MountInfo;

pub struct Mount;

pub struct Umount;

pub struct Mounts;

fn render_table(infos: &[MountInfo]) -> String {
    let width = infos.iter().map(|i| i.path.len()).max().unwrap_or(0);
    let mut out = String::new();
    for info in infos {
        let search = if info.searchable { "search" } else { "-" };
        out.push_str(&format!(
            "{:<width$}  {}  {:<8} {:<6}  {}\n",
            info.path, info.perm, info.kind, search, info.source
        ));
    }
    out
}

#[async_trait]
impl Tool for Mount {
    fn name(&self) -> &str {
        "mount"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("mount", "Attach a new backend to the namespace")
            .usage("mount [KIND PATH [ARG]...]")
    }

    async fn execute(&self, args: ToolArgs, ctx: &mut ExecContext) -> ExecResult {
        let Some(kind) = args.get(0) else {
            return ExecResult::success(render_table(&ctx.ns.mount_info()));
        };
        let Some(target) = args.get(1) else {
            let mut usage = String::from("mount: usage: mount KIND PATH [ARG]...\n");
            for kind in ctx.backends.kinds() {
                if let Some(factory) = ctx.backends.get(kind) {
                    usage.push_str(&format!("  {:<8} {}\n", kind, factory.describe()));
                }
            }
            return ExecResult::failure(2, usage);
        };
        let backend = match ctx.backends.create(kind, &args.positional[2..]) {
            Ok(backend) => backend,
            Err(e) => return ExecResult::failure(1, format!("mount: {e}\n")),
        };
        let resolved = ctx.resolve_path(target);
        match ctx.ns.mount(&resolved, backend) {
            Ok(()) => ExecResult::success(""),
            Err(e) => ExecResult::failure(1, format!("mount: {}: {}\n", target, e)),
        }
    }
}

#[async_trait]
impl Tool for Umount {
    fn name(&self) -> &str {
        "umount"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("umount", "Detach a backend").usage("umount PATH")
    }

    async fn execute(&self, args: ToolArgs, ctx: &mut ExecContext) -> ExecResult {
        let Some(target) = args.get(0) else {
            return ExecResult::failure(2, "umount: missing path\n");
        };
        let resolved = ctx.resolve_path(target);
        match ctx.ns.unmount(&resolved) {
            Ok(()) => ExecResult::success(""),
            Err(e) => ExecResult::failure(1, format!("umount: {}: {}\n", target, e)),
        }
    }
}

#[async_trait]
impl Tool for Mounts {
    fn name(&self) -> &str {
        "mounts"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("mounts", "Show the mount table").usage("mounts [--json]")
    }

    async fn execute(&self, args: ToolArgs, ctx: &mut ExecContext) -> ExecResult {
        let infos = ctx.ns.mount_info();
        if !args.has_flag("json") {
            return ExecResult::success(render_table(&infos));
        }
        match serde_json::to_string_pretty(&infos) {
            Ok(json) => ExecResult::success(json + "\n"),
            Err(e) => ExecResult::failure(1, format!("mounts: {e}\n")),
        }
    }
}
