//! The namespace façade: every operation on the unified path tree.
//!
//! Each operation follows the same order:
//!
//! 1. resolve the path through the [`MountTable`];
//! 2. fall back to a synthetic directory when the path only exists because
//!    mounts sit beneath it;
//! 3. check the backend implements the needed capability
//!    ([`VfsError::NotSupported`] otherwise);
//! 4. check the entry's permission bits ([`VfsError::NotReadable`],
//!    [`VfsError::NotWritable`], [`VfsError::NotExecutable`]);
//! 5. dispatch, then publish a [`ChangeEvent`] for mutations.
//!
//! The façade adds no locking of its own.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::error::{VfsError, VfsResult};
use super::events::{ChangeEvent, EventHub, EventKind, EventMask, Watch};
use super::mount::{MountTable, Resolved};
use super::path;
use super::traits::Backend;
use super::types::{
    Entry, ExecOutput, ExecRequest, ListOptions, MountInfo, Perm, SearchHit, SearchOptions,
    WriteMode,
};
use crate::cx::Cx;

/// One failed branch of a fanned-out search.
#[derive(Debug)]
pub struct SearchFailure {
    pub mount: String,
    pub error: VfsError,
}

/// Merged search results plus any per-mount failures.
#[derive(Debug, Default)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    pub failures: Vec<SearchFailure>,
}

impl SearchResults {
    /// All branch failures joined into one error, if any occurred.
    pub fn error(&self) -> Option<VfsError> {
        if self.failures.is_empty() {
            return None;
        }
        let joined: Vec<String> = self
            .failures
            .iter()
            .map(|f| format!("{}: {}", f.mount, f.error))
            .collect();
        Some(VfsError::Other(joined.join("; ")))
    }
}

/// The single entry point for namespace operations.
#[derive(Debug)]
pub struct Namespace {
    mounts: MountTable,
    events: EventHub,
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

impl Namespace {
    pub fn new() -> Self {
        Self {
            mounts: MountTable::new(),
            events: EventHub::new(),
        }
    }

    pub fn mounts(&self) -> &MountTable {
        &self.mounts
    }

    pub fn events(&self) -> &EventHub {
        &self.events
    }

    // ========================================================================
    // Mount management
    // ========================================================================

    pub fn mount(&self, mount_path: &str, backend: Arc<dyn Backend>) -> VfsResult<()> {
        self.mounts.mount(mount_path, backend)
    }

    pub fn unmount(&self, mount_path: &str) -> VfsResult<()> {
        self.mounts.unmount(mount_path)
    }

    pub fn mount_info(&self) -> Vec<MountInfo> {
        self.mounts.all_info()
    }

    pub fn watch(&self, prefix: &str, mask: EventMask) -> Watch {
        self.events.watch(prefix, mask)
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Inspect one path.
    pub async fn stat(&self, cx: &Cx, full_path: &str) -> VfsResult<Entry> {
        cx.check()?;
        let full_path = path::normalize(full_path);
        let resolved = match self.mounts.resolve(&full_path) {
            Ok(r) => r,
            Err(e) => return self.virtual_entry(&full_path).ok_or(e),
        };
        match resolved.mount.backend.stat(cx, &resolved.inner).await {
            Ok(entry) => Ok(entry.at_path(&full_path)),
            Err(e) if e.is_not_found() => self.virtual_entry(&full_path).ok_or(e),
            Err(e) => Err(e),
        }
    }

    /// True if the path exists (as an entry or a virtual directory).
    pub async fn exists(&self, cx: &Cx, full_path: &str) -> bool {
        self.stat(cx, full_path).await.is_ok()
    }

    /// List a directory, merging in directories synthesized from deeper mounts.
    pub async fn list(&self, cx: &Cx, dir: &str, opts: &ListOptions) -> VfsResult<Vec<Entry>> {
        cx.check()?;
        let dir = path::normalize(dir);
        let mut merged: BTreeMap<String, Entry> = BTreeMap::new();

        let backend_result = match self.mounts.resolve(&dir) {
            Ok(r) => {
                let backend_opts = ListOptions {
                    all: opts.all,
                    limit: None,
                };
                r.mount
                    .backend
                    .list(cx, &r.inner, &backend_opts)
                    .await
                    .map(|entries| {
                        for entry in entries {
                            let full = path::join(&dir, &entry.name);
                            merged.insert(entry.name.clone(), entry.at_path(&full));
                        }
                    })
            }
            Err(e) => Err(e),
        };

        let children = self.mounts.child_mounts(&dir);
        if let Err(e) = backend_result {
            if children.is_empty() && dir != "/" {
                return Err(e);
            }
            debug!(path = %dir, error = %e, "listing virtual children only");
        }
        for child in children {
            merged.insert(child.name.clone(), child);
        }

        let mut entries: Vec<Entry> = merged
            .into_values()
            .filter(|e| opts.all || !e.name.starts_with('.'))
            .collect();
        if let Some(limit) = opts.limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    // ========================================================================
    // Data
    // ========================================================================

    /// Read a file's contents.
    pub async fn open(&self, cx: &Cx, full_path: &str) -> VfsResult<Vec<u8>> {
        cx.check()?;
        let full_path = path::normalize(full_path);
        let resolved = self.resolve_file(&full_path)?;
        let reader = resolved
            .mount
            .caps
            .reader
            .clone()
            .ok_or_else(|| VfsError::not_supported("read", &full_path))?;
        let entry = self.stat(cx, &full_path).await?;
        if entry.is_dir {
            return Err(VfsError::is_a_directory(full_path));
        }
        if !entry.perm.allows(Perm::READ) {
            return Err(VfsError::NotReadable(full_path));
        }
        reader.open(cx, &resolved.inner).await
    }

    /// Write a file, creating it if needed.
    ///
    /// Emits `Create` for a new file, then `Write`.
    pub async fn write(
        &self,
        cx: &Cx,
        full_path: &str,
        data: &[u8],
        mode: WriteMode,
    ) -> VfsResult<()> {
        cx.check()?;
        let full_path = path::normalize(full_path);
        let resolved = self.resolve_file(&full_path)?;
        let writer = resolved
            .mount
            .caps
            .writer
            .clone()
            .ok_or_else(|| VfsError::not_supported("write", &full_path))?;
        let existed = self.check_write_target(cx, &full_path).await?;

        writer.write(cx, &resolved.inner, data, mode).await?;

        if !existed {
            self.events.emit(ChangeEvent::new(EventKind::Create, &full_path));
        }
        self.events.emit(ChangeEvent::new(EventKind::Write, &full_path));
        Ok(())
    }

    /// Run an executable entry.
    pub async fn exec(&self, cx: &Cx, full_path: &str, req: ExecRequest) -> VfsResult<ExecOutput> {
        cx.check()?;
        let full_path = path::normalize(full_path);
        let resolved = self.resolve_file(&full_path)?;
        let executor = resolved
            .mount
            .caps
            .executor
            .clone()
            .ok_or_else(|| VfsError::not_supported("exec", &full_path))?;
        let entry = self.stat(cx, &full_path).await?;
        if entry.is_dir {
            return Err(VfsError::is_a_directory(full_path));
        }
        if !entry.perm.allows(Perm::EXEC) {
            return Err(VfsError::NotExecutable(full_path));
        }
        debug!(path = %full_path, args = ?req.args, "exec");
        executor.exec(cx, &resolved.inner, req).await
    }

    // ========================================================================
    // Structure
    // ========================================================================

    /// Create a directory.
    pub async fn mkdir(&self, cx: &Cx, full_path: &str) -> VfsResult<()> {
        cx.check()?;
        let full_path = path::normalize(full_path);
        let resolved = match self.mounts.resolve(&full_path) {
            Ok(r) => r,
            Err(_) if self.mounts.is_virtual_dir(&full_path) => {
                return Err(VfsError::already_exists(full_path));
            }
            Err(e) => return Err(e),
        };
        let mutator = resolved
            .mount
            .caps
            .mutator
            .clone()
            .ok_or_else(|| VfsError::not_supported("mkdir", &full_path))?;
        match self.stat(cx, &full_path).await {
            Ok(_) => return Err(VfsError::already_exists(full_path)),
            Err(e) if e.is_not_found() => self.check_parent(cx, &full_path).await?,
            Err(e) => return Err(e),
        }

        mutator.mkdir(cx, &resolved.inner).await?;
        self.events.emit(ChangeEvent::new(EventKind::Mkdir, &full_path));
        Ok(())
    }

    /// Remove a file or directory.
    pub async fn remove(&self, cx: &Cx, full_path: &str, recursive: bool) -> VfsResult<()> {
        cx.check()?;
        let full_path = path::normalize(full_path);
        let resolved = self.resolve_mutable(&full_path)?;
        let mutator = resolved
            .mount
            .caps
            .mutator
            .clone()
            .ok_or_else(|| VfsError::not_supported("remove", &full_path))?;
        let entry = self.stat(cx, &full_path).await?;
        if !entry.perm.allows(Perm::WRITE) {
            return Err(VfsError::NotWritable(full_path));
        }

        mutator.remove(cx, &resolved.inner, recursive).await?;
        self.events.emit(ChangeEvent::new(EventKind::Remove, &full_path));
        Ok(())
    }

    /// Rename within a single backend. Crossing backends is refused.
    pub async fn rename(&self, cx: &Cx, from: &str, to: &str) -> VfsResult<()> {
        cx.check()?;
        let from = path::normalize(from);
        let to = path::normalize(to);
        let source = self.resolve_mutable(&from)?;
        let target = self.resolve_mutable(&to)?;
        if source.mount.path != target.mount.path {
            return Err(VfsError::not_supported("cross-backend rename", format!("{from} -> {to}")));
        }
        let mutator = source
            .mount
            .caps
            .mutator
            .clone()
            .ok_or_else(|| VfsError::not_supported("rename", &from))?;
        let entry = self.stat(cx, &from).await?;
        if !entry.perm.allows(Perm::WRITE) {
            return Err(VfsError::NotWritable(from));
        }
        self.check_parent(cx, &to).await?;

        mutator.rename(cx, &source.inner, &target.inner).await?;
        self.events.emit(ChangeEvent::renamed(&from, &to));
        Ok(())
    }

    /// Update a file's timestamp, creating it empty if absent.
    ///
    /// Uses the backend's touch fast path when it has one, otherwise
    /// rewrites the existing content (or writes nothing, for a new file).
    pub async fn touch(&self, cx: &Cx, full_path: &str) -> VfsResult<()> {
        cx.check()?;
        let full_path = path::normalize(full_path);
        let resolved = self.resolve_file(&full_path)?;
        let caps = &resolved.mount.caps;
        if caps.toucher.is_none() && caps.writer.is_none() {
            return Err(VfsError::not_supported("touch", &full_path));
        }
        let existed = match self.stat(cx, &full_path).await {
            Ok(entry) if entry.is_dir => true,
            Ok(entry) => {
                if !entry.perm.allows(Perm::WRITE) {
                    return Err(VfsError::NotWritable(full_path));
                }
                true
            }
            Err(e) if e.is_not_found() => {
                self.check_parent(cx, &full_path).await?;
                false
            }
            Err(e) => return Err(e),
        };

        if let Some(toucher) = caps.toucher.clone() {
            toucher.touch(cx, &resolved.inner).await?;
        } else if let Some(writer) = caps.writer.clone() {
            let content = if existed {
                let reader = caps
                    .reader
                    .clone()
                    .ok_or_else(|| VfsError::not_supported("touch", &full_path))?;
                reader.open(cx, &resolved.inner).await?
            } else {
                Vec::new()
            };
            writer
                .write(cx, &resolved.inner, &content, WriteMode::Truncate)
                .await?;
        }

        if !existed {
            self.events.emit(ChangeEvent::new(EventKind::Create, &full_path));
        }
        self.events.emit(ChangeEvent::new(EventKind::Write, &full_path));
        Ok(())
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Fan a query out to every searchable mount in scope and merge the hits.
    ///
    /// One task per mount. Failed branches are collected, not fatal.
    pub async fn search(&self, cx: &Cx, query: &str, opts: &SearchOptions) -> SearchResults {
        let mut results = SearchResults::default();
        if let Err(e) = cx.check() {
            results.failures.push(SearchFailure {
                mount: "/".into(),
                error: e,
            });
            return results;
        }
        let scope = opts.scope.as_deref().map(path::normalize);

        let mut tasks = JoinSet::new();
        for record in self.mounts.records() {
            let Some(searcher) = record.caps.searcher.clone() else {
                continue;
            };
            // A scope inside this mount narrows the backend's own scope;
            // a scope elsewhere excludes the mount entirely.
            let inner_scope = match &scope {
                None => None,
                Some(s) if path::has_prefix(&record.path, s) => None,
                Some(s) if path::has_prefix(s, &record.path) => {
                    let inner = if record.path == "/" {
                        s.trim_start_matches('/')
                    } else {
                        s[record.path.len()..].trim_start_matches('/')
                    };
                    Some(inner.to_string())
                }
                Some(_) => continue,
            };
            let branch_opts = SearchOptions {
                scope: inner_scope,
                max_results: opts.max_results,
            };
            let cx = cx.child();
            let query = query.to_string();
            tasks.spawn(async move {
                let outcome = searcher.search(&cx, &query, &branch_opts).await;
                (record.path, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((mount, Ok(hits))) => {
                    for mut hit in hits {
                        hit.path = path::join(&mount, &hit.path);
                        // Deeper mounts shadow the same path in a shallower one.
                        if self.owner_of(&hit.path).as_deref() == Some(mount.as_str()) {
                            results.hits.push(hit);
                        }
                    }
                }
                Ok((mount, Err(error))) => {
                    warn!(mount = %mount, error = %error, "search branch failed");
                    results.failures.push(SearchFailure { mount, error });
                }
                Err(join_err) => {
                    warn!(error = %join_err, "search task panicked");
                    results.failures.push(SearchFailure {
                        mount: "?".into(),
                        error: VfsError::other(join_err.to_string()),
                    });
                }
            }
        }

        results
            .hits
            .sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.path.cmp(&b.path)));
        if let Some(max) = opts.max_results {
            results.hits.truncate(max);
        }
        results
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn owner_of(&self, full_path: &str) -> Option<String> {
        self.mounts.resolve(full_path).ok().map(|r| r.mount.path)
    }

    fn virtual_entry(&self, full_path: &str) -> Option<Entry> {
        if full_path == "/" || self.mounts.is_virtual_dir(full_path) {
            Some(Entry::virtual_dir(full_path))
        } else {
            None
        }
    }

    /// Resolve for an operation on file content; virtual directories are
    /// directories, so they reject it.
    fn resolve_file(&self, full_path: &str) -> VfsResult<Resolved> {
        match self.mounts.resolve(full_path) {
            Ok(r) => Ok(r),
            Err(_) if self.virtual_entry(full_path).is_some() => {
                Err(VfsError::is_a_directory(full_path))
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve for remove/rename; mount points and virtual directories are
    /// structure of the namespace itself, not of a backend.
    fn resolve_mutable(&self, full_path: &str) -> VfsResult<Resolved> {
        let resolved = match self.mounts.resolve(full_path) {
            Ok(r) => r,
            Err(_) if self.virtual_entry(full_path).is_some() => {
                return Err(VfsError::MountPoint(full_path.to_string()));
            }
            Err(e) => return Err(e),
        };
        if resolved.inner.is_empty() {
            return Err(VfsError::MountPoint(full_path.to_string()));
        }
        Ok(resolved)
    }

    /// Check an entry that may be about to be created or replaced.
    ///
    /// Returns whether it already existed.
    async fn check_write_target(&self, cx: &Cx, full_path: &str) -> VfsResult<bool> {
        match self.stat(cx, full_path).await {
            Ok(entry) if entry.is_dir => Err(VfsError::is_a_directory(full_path)),
            Ok(entry) if !entry.perm.allows(Perm::WRITE) => {
                Err(VfsError::NotWritable(full_path.to_string()))
            }
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => {
                self.check_parent(cx, full_path).await?;
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn check_parent(&self, cx: &Cx, full_path: &str) -> VfsResult<()> {
        let parent = path::parent(full_path);
        if parent == full_path {
            return Ok(());
        }
        match self.stat(cx, parent).await {
            Ok(entry) if entry.is_dir => Ok(()),
            Ok(_) => Err(VfsError::not_a_directory(parent)),
            Err(e) if e.is_not_found() => Err(VfsError::ParentNotFound(full_path.to_string())),
            Err(e) => Err(e),
        }
    }
}
