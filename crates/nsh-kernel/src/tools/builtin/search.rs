//! search — Ranked search across every searchable mount.

use async_trait::async_trait;

use crate::interpreter::ExecResult;
use crate::tools::{ExecContext, Tool, ToolArgs, ToolSchema};
use crate::vfs::SearchOptions;

pub struct Search;

#[async_trait]
impl Tool for Search {
    fn name(&self) -> &str {
        "search"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("search", "Search every searchable mount, best matches first")
            .usage("search [-n MAX] [-s SCOPE] QUERY...")
    }

    fn value_options(&self) -> &'static [&'static str] {
        &["n", "s"]
    }

    async fn execute(&self, args: ToolArgs, ctx: &mut ExecContext) -> ExecResult {
        if args.positional.is_empty() {
            return ExecResult::failure(2, "search: missing query\n");
        }
        let max_results = match args.option_usize("n") {
            Ok(n) => n,
            Err(e) => return ExecResult::failure(2, format!("search: {e}\n")),
        };
        let opts = SearchOptions {
            scope: args.option("s").map(|s| ctx.resolve_path(s)),
            max_results,
        };
        let query = args.positional.join(" ");

        let results = ctx.ns.search(&ctx.cx, &query, &opts).await;
        let mut out = String::new();
        for hit in &results.hits {
            out.push_str(&format!("{}\t{:.2}", hit.path, hit.score));
            if let Some(snippet) = &hit.snippet {
                out.push('\t');
                out.push_str(snippet);
            }
            out.push('\n');
        }
        let err = match results.error() {
            Some(e) => format!("search: {e}\n"),
            None => String::new(),
        };
        let code = if results.hits.is_empty() && !err.is_empty() { 1 } else { 0 };
        ExecResult::from_output(code, out, err)
    }
}
