//! wc — Count lines, words and bytes.

use async_trait::async_trait;

use crate::interpreter::ExecResult;
use crate::tools::{ExecContext, Tool, ToolArgs, ToolSchema};

pub struct Wc;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Counts {
    lines: usize,
    words: usize,
    bytes: usize,
}

impl Counts {
    fn of(text: &str) -> Self {
        Self {
            lines: text.matches('\n').count(),
            words: text.split_whitespace().count(),
            bytes: text.len(),
        }
    }

    fn add(&mut self, other: Counts) {
        self.lines += other.lines;
        self.words += other.words;
        self.bytes += other.bytes;
    }
}

#[async_trait]
impl Tool for Wc {
    fn name(&self) -> &str {
        "wc"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new("wc", "Count lines, words and bytes").usage("wc [-l] [-w] [-c] [FILE]...")
    }

    async fn execute(&self, args: ToolArgs, ctx: &mut ExecContext) -> ExecResult {
        let inputs = match ctx.read_inputs(&args.positional).await {
            Ok(inputs) => inputs,
            Err(e) => return ExecResult::failure(1, format!("wc: {e}\n")),
        };

        let (mut lines, mut words, mut bytes) =
            (args.has_flag("l"), args.has_flag("w"), args.has_flag("c"));
        if !lines && !words && !bytes {
            (lines, words, bytes) = (true, true, true);
        }
        let render = |counts: Counts, label: Option<&str>| {
            let mut fields = Vec::new();
            if lines {
                fields.push(counts.lines.to_string());
            }
            if words {
                fields.push(counts.words.to_string());
            }
            if bytes {
                fields.push(counts.bytes.to_string());
            }
            if let Some(label) = label {
                fields.push(label.to_string());
            }
            fields.join(" ") + "\n"
        };

        let named = !args.positional.is_empty();
        let mut total = Counts::default();
        let mut out = String::new();
        for (label, text) in &inputs {
            let counts = Counts::of(text);
            total.add(counts);
            out.push_str(&render(counts, named.then_some(label.as_str())));
        }
        if inputs.len() > 1 {
            out.push_str(&render(total, Some("total")));
        }
        ExecResult::success(out)
    }
}
