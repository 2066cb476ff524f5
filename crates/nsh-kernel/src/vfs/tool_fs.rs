//! ToolFs: presents registered utilities as executable entries.
//!
//! Mounted at `/bin` by the kernel. Every entry is `r-x`; reading one returns
//! a short descriptor, executing one runs the utility against the namespace.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tracing::debug;

use super::error::{VfsError, VfsResult};
use super::namespace::Namespace;
use super::registry::BackendRegistry;
use super::traits::{Backend, Capabilities, Describe, Executable, Readable};
use super::types::{Entry, ExecOutput, ExecRequest, ListOptions, Perm};
use crate::cx::Cx;
use crate::interpreter::ExecResult;
use crate::tools::{ExecContext, Tool, ToolArgs, ToolRegistry};

/// A read-only backend exposing each registered tool as an entry.
pub struct ToolFs {
    ns: Weak<Namespace>,
    tools: Arc<ToolRegistry>,
    backends: Arc<BackendRegistry>,
}

impl ToolFs {
    /// `ns` is weak because this backend is itself mounted in that namespace.
    pub fn new(ns: Weak<Namespace>, tools: Arc<ToolRegistry>, backends: Arc<BackendRegistry>) -> Self {
        Self { ns, tools, backends }
    }

    fn tool(&self, path: &str) -> VfsResult<Arc<dyn Tool>> {
        if path.is_empty() {
            return Err(VfsError::is_a_directory(path));
        }
        self.tools
            .get(path)
            .ok_or_else(|| VfsError::not_found(path))
    }

    fn entry_for(&self, name: &str, tool: &dyn Tool) -> Entry {
        let descriptor = tool.schema().descriptor();
        Entry::file(name, descriptor.len() as u64)
            .with_perm(Perm::RX)
            .with_meta("tool", name)
    }
}

#[async_trait]
impl Backend for ToolFs {
    async fn stat(&self, cx: &Cx, path: &str) -> VfsResult<Entry> {
        cx.check()?;
        if path.is_empty() {
            return Ok(Entry::directory("").with_perm(Perm::RX));
        }
        let tool = self.tool(path)?;
        Ok(self.entry_for(path, tool.as_ref()))
    }

    async fn list(&self, cx: &Cx, path: &str, opts: &ListOptions) -> VfsResult<Vec<Entry>> {
        cx.check()?;
        if !path.is_empty() {
            if self.tools.contains(path) {
                return Err(VfsError::not_a_directory(path));
            }
            return Err(VfsError::not_found(path));
        }
        let mut entries: Vec<Entry> = self
            .tools
            .iter()
            .map(|(name, tool)| self.entry_for(name, tool.as_ref()))
            .collect();
        if let Some(limit) = opts.limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    fn capabilities(self: Arc<Self>) -> Capabilities {
        Capabilities::new()
            .reader(self.clone())
            .executor(self.clone())
            .describer(self)
    }
}

#[async_trait]
impl Readable for ToolFs {
    async fn open(&self, cx: &Cx, path: &str) -> VfsResult<Vec<u8>> {
        cx.check()?;
        let tool = self.tool(path)?;
        Ok(tool.schema().descriptor().into_bytes())
    }
}

#[async_trait]
impl Executable for ToolFs {
    async fn exec(&self, cx: &Cx, path: &str, req: ExecRequest) -> VfsResult<ExecOutput> {
        cx.check()?;
        let tool = self.tool(path)?;
        let ns = self
            .ns
            .upgrade()
            .ok_or_else(|| VfsError::other("namespace is gone"))?;

        let args = match ToolArgs::parse(&req.args, tool.value_options()) {
            Ok(args) => args,
            Err(e) => return Ok(ExecResult::failure(2, format!("{path}: {e}\n")).into()),
        };
        debug!(tool = path, args = ?req.args, cwd = %req.cwd, "exec tool");

        let mut ctx = ExecContext::new(ns, self.backends.clone(), cx.clone());
        ctx.cwd = req.cwd;
        ctx.env = req.env;
        if !req.stdin.is_empty() {
            ctx.set_stdin(String::from_utf8_lossy(&req.stdin).into_owned());
        }
        Ok(tool.execute(args, &mut ctx).await.into())
    }
}

impl Describe for ToolFs {
    fn kind(&self) -> &str {
        "tools"
    }

    fn source(&self) -> String {
        format!("{} utilities", self.tools.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::MemoryFs;

    fn setup() -> Arc<Namespace> {
        let ns = Arc::new(Namespace::new());
        ns.mount("/", Arc::new(MemoryFs::new())).unwrap();
        let tools = Arc::new(ToolRegistry::with_builtins());
        let backends = Arc::new(BackendRegistry::with_defaults());
        let bin = ToolFs::new(Arc::downgrade(&ns), tools, backends);
        ns.mount("/bin", Arc::new(bin)).unwrap();
        ns
    }

    #[tokio::test]
    async fn test_entries_are_executable() {
        let ns = setup();
        let cx = Cx::new();
        let entry = ns.stat(&cx, "/bin/cat").await.unwrap();
        assert_eq!(entry.perm, Perm::RX);
        assert!(!entry.is_dir);

        let names: Vec<String> = ns
            .list(&cx, "/bin", &ListOptions::default())
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert!(names.contains(&"grep".to_string()));
    }

    #[tokio::test]
    async fn test_read_descriptor() {
        let ns = setup();
        let body = ns.open(&Cx::new(), "/bin/head").await.unwrap();
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("head: "));
        assert!(text.contains("usage: head [-n N]"));
    }

    #[tokio::test]
    async fn test_exec_runs_against_namespace() {
        let ns = setup();
        let cx = Cx::new();
        ns.mkdir(&cx, "/work").await.unwrap();
        ns.write(&cx, "/work/notes.txt", b"a\nb\nc\n", Default::default())
            .await
            .unwrap();

        let req = ExecRequest::new(vec!["-n".into(), "2".into(), "notes.txt".into()]).cwd("/work");
        let out = ns.exec(&cx, "/bin/head", req).await.unwrap();
        assert_eq!(out.code, 0);
        assert_eq!(out.stdout, b"a\nb\n");
    }

    #[tokio::test]
    async fn test_exec_with_stdin_and_bad_args() {
        let ns = setup();
        let cx = Cx::new();
        let req = ExecRequest::new(vec!["-l".into()]).stdin("x\ny\n");
        let out = ns.exec(&cx, "/bin/wc", req).await.unwrap();
        assert_eq!(out.stdout, b"2\n");

        let req = ExecRequest::new(vec!["-n".into()]);
        let out = ns.exec(&cx, "/bin/head", req).await.unwrap();
        assert_eq!(out.code, 2);
    }

    #[tokio::test]
    async fn test_write_not_supported() {
        let ns = setup();
        let err = ns
            .write(&Cx::new(), "/bin/cat", b"x", Default::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VfsError::NotSupported { .. }));
    }
}
