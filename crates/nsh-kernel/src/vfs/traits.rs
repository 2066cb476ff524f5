//! Backend contract: a required base trait plus optional capabilities.
//!
//! Every backend implements [`Backend`] (stat + list). Anything beyond that
//! is a separate capability trait. A backend advertises what it implements
//! once, through [`Backend::capabilities`], and the mount table caches the
//! resulting [`Capabilities`] alongside the mount record.
//!
//! All paths handed to a backend are *inner* paths: relative to its mount
//! point, without a leading slash, and `""` for the backend root.
//!
//! Backends must be safe to call concurrently from independent sessions.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::error::VfsResult;
use super::types::{
    Entry, ExecOutput, ExecRequest, ListOptions, Perm, SearchHit, SearchOptions, WriteMode,
};
use crate::cx::Cx;

/// Base contract every mountable backend satisfies.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Inspect one entry.
    async fn stat(&self, cx: &Cx, path: &str) -> VfsResult<Entry>;

    /// List a directory's immediate children.
    async fn list(&self, cx: &Cx, path: &str, opts: &ListOptions) -> VfsResult<Vec<Entry>>;

    /// Optional behaviors this backend implements.
    ///
    /// Called once at mount time.
    fn capabilities(self: Arc<Self>) -> Capabilities {
        Capabilities::default()
    }
}

/// Read capability.
#[async_trait]
pub trait Readable: Send + Sync {
    async fn open(&self, cx: &Cx, path: &str) -> VfsResult<Vec<u8>>;
}

/// Write capability.
#[async_trait]
pub trait Writable: Send + Sync {
    async fn write(&self, cx: &Cx, path: &str, data: &[u8], mode: WriteMode) -> VfsResult<()>;
}

/// Execute capability.
#[async_trait]
pub trait Executable: Send + Sync {
    async fn exec(&self, cx: &Cx, path: &str, req: ExecRequest) -> VfsResult<ExecOutput>;
}

/// Search capability. Hit paths are inner paths.
#[async_trait]
pub trait Searchable: Send + Sync {
    async fn search(&self, cx: &Cx, query: &str, opts: &SearchOptions) -> VfsResult<Vec<SearchHit>>;
}

/// Structural mutation: mkdir / remove / rename.
#[async_trait]
pub trait Mutable: Send + Sync {
    async fn mkdir(&self, cx: &Cx, path: &str) -> VfsResult<()>;

    async fn remove(&self, cx: &Cx, path: &str, recursive: bool) -> VfsResult<()>;

    async fn rename(&self, cx: &Cx, from: &str, to: &str) -> VfsResult<()>;
}

/// Fast path for updating a timestamp (creating an empty file if absent).
#[async_trait]
pub trait Touchable: Send + Sync {
    async fn touch(&self, cx: &Cx, path: &str) -> VfsResult<()>;
}

/// Self-description for mount listings.
pub trait Describe: Send + Sync {
    fn kind(&self) -> &str;

    fn source(&self) -> String {
        String::new()
    }
}

/// The optional behaviors a mounted backend implements.
///
/// Built once per mount from [`Backend::capabilities`].
#[derive(Clone, Default)]
pub struct Capabilities {
    pub reader: Option<Arc<dyn Readable>>,
    pub writer: Option<Arc<dyn Writable>>,
    pub executor: Option<Arc<dyn Executable>>,
    pub searcher: Option<Arc<dyn Searchable>>,
    pub mutator: Option<Arc<dyn Mutable>>,
    pub toucher: Option<Arc<dyn Touchable>>,
    pub describer: Option<Arc<dyn Describe>>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reader(mut self, reader: Arc<dyn Readable>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn writer(mut self, writer: Arc<dyn Writable>) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn executor(mut self, executor: Arc<dyn Executable>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn searcher(mut self, searcher: Arc<dyn Searchable>) -> Self {
        self.searcher = Some(searcher);
        self
    }

    pub fn mutator(mut self, mutator: Arc<dyn Mutable>) -> Self {
        self.mutator = Some(mutator);
        self
    }

    pub fn toucher(mut self, toucher: Arc<dyn Touchable>) -> Self {
        self.toucher = Some(toucher);
        self
    }

    pub fn describer(mut self, describer: Arc<dyn Describe>) -> Self {
        self.describer = Some(describer);
        self
    }

    /// Permission bits implied by read/write/execute support.
    pub fn perm(&self) -> Perm {
        let mut perm = Perm::NONE;
        if self.reader.is_some() {
            perm = perm | Perm::READ;
        }
        if self.writer.is_some() {
            perm = perm | Perm::WRITE;
        }
        if self.executor.is_some() {
            perm = perm | Perm::EXEC;
        }
        perm
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("read", &self.reader.is_some())
            .field("write", &self.writer.is_some())
            .field("exec", &self.executor.is_some())
            .field("search", &self.searcher.is_some())
            .field("mutate", &self.mutator.is_some())
            .field("touch", &self.toucher.is_some())
            .finish()
    }
}
