//! Tool trait and schema.

use async_trait::async_trait;
use serde::Serialize;

use super::{ExecContext, ToolArgs};
use crate::interpreter::ExecResult;

/// A utility that runs against the namespace.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the tool is registered (and mounted) under.
    fn name(&self) -> &str;

    fn schema(&self) -> ToolSchema;

    /// Option names that take a value (`-n 5`). Everything else is a flag.
    fn value_options(&self) -> &'static [&'static str] {
        &[]
    }

    async fn execute(&self, args: ToolArgs, ctx: &mut ExecContext) -> ExecResult;
}

/// Human-facing description of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub usage: String,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            usage: name.clone(),
            name,
            description: description.into(),
        }
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    /// One-line descriptor served when a tool entry is read.
    pub fn descriptor(&self) -> String {
        format!("{}: {}\nusage: {}\n", self.name, self.description, self.usage)
    }
}
