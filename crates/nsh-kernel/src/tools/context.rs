//! Execution context for tools.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cx::Cx;
use crate::vfs::{path, BackendRegistry, Namespace, VfsResult};

/// Execution context passed to tools.
///
/// Built per invocation from the caller's [`ExecRequest`](crate::vfs::ExecRequest).
pub struct ExecContext {
    /// The namespace the tool operates on.
    pub ns: Arc<Namespace>,
    /// Backend kinds available to `mount`.
    pub backends: Arc<BackendRegistry>,
    pub cx: Cx,
    /// Caller's working directory.
    pub cwd: String,
    pub env: HashMap<String, String>,
    /// Standard input for the tool (from pipeline or redirect).
    pub stdin: Option<String>,
}

impl ExecContext {
    pub fn new(ns: Arc<Namespace>, backends: Arc<BackendRegistry>, cx: Cx) -> Self {
        Self {
            ns,
            backends,
            cx,
            cwd: "/".to_string(),
            env: HashMap::new(),
            stdin: None,
        }
    }

    pub fn set_stdin(&mut self, stdin: impl Into<String>) {
        self.stdin = Some(stdin.into());
    }

    /// Get stdin, consuming it.
    pub fn take_stdin(&mut self) -> Option<String> {
        self.stdin.take()
    }

    /// Resolve a path relative to cwd.
    pub fn resolve_path(&self, p: &str) -> String {
        path::join(&self.cwd, p)
    }

    /// Read a file as text, replacing invalid UTF-8.
    pub async fn read_text(&self, p: &str) -> VfsResult<String> {
        let data = self.ns.open(&self.cx, &self.resolve_path(p)).await?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    /// Inputs for filter-style tools: the named files, or stdin when none.
    ///
    /// Each item is `(label, text)`; stdin is labelled `-`.
    pub async fn read_inputs(&mut self, files: &[String]) -> Result<Vec<(String, String)>, String> {
        if files.is_empty() {
            return Ok(vec![("-".to_string(), self.take_stdin().unwrap_or_default())]);
        }
        let mut inputs = Vec::with_capacity(files.len());
        for file in files {
            if file == "-" {
                inputs.push((file.clone(), self.take_stdin().unwrap_or_default()));
                continue;
            }
            let text = self
                .read_text(file)
                .await
                .map_err(|e| format!("{file}: {e}"))?;
            inputs.push((file.clone(), text));
        }
        Ok(inputs)
    }
}
