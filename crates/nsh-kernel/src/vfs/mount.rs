//! Mount table with longest-prefix resolution.
//!
//! Records are kept sorted by descending path length, so the first record
//! that matches a path is the most specific one. Resolutions are memoized in
//! a separate cache which every mount or unmount clears wholesale.
//!
//! Mounting beneath an existing mount is always allowed. Mounting *above*
//! one (at a strict ancestor of an already-mounted path) is refused.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::error::{VfsError, VfsResult};
use super::path;
use super::traits::{Backend, Capabilities};
use super::types::{Entry, MountInfo};

/// One (path, backend) binding, with its capabilities computed at mount time.
#[derive(Clone)]
pub struct MountRecord {
    pub path: String,
    pub backend: Arc<dyn Backend>,
    pub caps: Capabilities,
}

impl std::fmt::Debug for MountRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountRecord")
            .field("path", &self.path)
            .field("caps", &self.caps)
            .finish()
    }
}

/// The outcome of resolving a namespace path.
#[derive(Clone, Debug)]
pub struct Resolved {
    pub mount: MountRecord,
    /// Path relative to the mount point; `""` for the mount point itself.
    pub inner: String,
}

/// Routes namespace paths to mounted backends.
#[derive(Default)]
pub struct MountTable {
    records: RwLock<Vec<MountRecord>>,
    cache: RwLock<HashMap<String, Resolved>>,
}

impl std::fmt::Debug for MountTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let paths: Vec<String> = self.records.read().iter().map(|r| r.path.clone()).collect();
        f.debug_struct("MountTable").field("mounts", &paths).finish()
    }
}

impl MountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `backend` at `mount_path`.
    pub fn mount(&self, mount_path: &str, backend: Arc<dyn Backend>) -> VfsResult<()> {
        let mount_path = path::normalize(mount_path);
        let caps = backend.clone().capabilities();

        let mut records = self.records.write();
        if records.iter().any(|r| r.path == mount_path) {
            return Err(VfsError::AlreadyMounted(mount_path));
        }
        if let Some(deeper) = records
            .iter()
            .find(|r| path::is_strict_descendant(&r.path, &mount_path))
        {
            return Err(VfsError::MountUnderMount {
                path: mount_path,
                existing: deeper.path.clone(),
            });
        }

        debug!(path = %mount_path, caps = ?caps, "mount");
        records.push(MountRecord {
            path: mount_path,
            backend,
            caps,
        });
        records.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        self.cache.write().clear();
        Ok(())
    }

    /// Remove the binding at `mount_path`.
    pub fn unmount(&self, mount_path: &str) -> VfsResult<()> {
        let mount_path = path::normalize(mount_path);
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| r.path != mount_path);
        if records.len() == before {
            return Err(VfsError::NotFound(mount_path));
        }
        debug!(path = %mount_path, "unmount");
        self.cache.write().clear();
        Ok(())
    }

    /// Resolve a path to its backend and inner path.
    pub fn resolve(&self, full_path: &str) -> VfsResult<Resolved> {
        let full_path = path::normalize(full_path);
        if let Some(hit) = self.cache.read().get(&full_path) {
            return Ok(hit.clone());
        }

        // Hold the record lock while filling the cache so a concurrent
        // mount cannot clear it between our scan and our insert.
        let records = self.records.read();
        let resolved = records
            .iter()
            .find_map(|r| Self::match_record(r, &full_path))
            .ok_or_else(|| VfsError::NotFound(full_path.clone()))?;
        self.cache.write().insert(full_path, resolved.clone());
        Ok(resolved)
    }

    fn match_record(record: &MountRecord, full_path: &str) -> Option<Resolved> {
        let inner = if record.path == full_path {
            String::new()
        } else if record.path == "/" {
            full_path.trim_start_matches('/').to_string()
        } else {
            full_path
                .strip_prefix(record.path.as_str())?
                .strip_prefix('/')?
                .to_string()
        };
        Some(Resolved {
            mount: record.clone(),
            inner,
        })
    }

    /// Synthetic directory entries for the next segment of every mount
    /// strictly beneath `dir`.
    pub fn child_mounts(&self, dir: &str) -> Vec<Entry> {
        let dir = path::normalize(dir);
        let records = self.records.read();
        let names: BTreeSet<&str> = records
            .iter()
            .filter(|r| path::is_strict_descendant(&r.path, &dir))
            .filter_map(|r| {
                let rest = if dir == "/" {
                    r.path.strip_prefix('/')
                } else {
                    r.path.strip_prefix(dir.as_str()).and_then(|s| s.strip_prefix('/'))
                };
                rest.and_then(|s| s.split('/').next())
            })
            .collect();
        names
            .into_iter()
            .map(|name| Entry::virtual_dir(&path::join(&dir, name)))
            .collect()
    }

    /// True if some mount lies strictly beneath `dir`.
    pub fn is_virtual_dir(&self, dir: &str) -> bool {
        let dir = path::normalize(dir);
        self.records
            .read()
            .iter()
            .any(|r| path::is_strict_descendant(&r.path, &dir))
    }

    /// True if `full_path` is exactly a mount point.
    pub fn is_mount_point(&self, full_path: &str) -> bool {
        let full_path = path::normalize(full_path);
        self.records.read().iter().any(|r| r.path == full_path)
    }

    /// Per-mount summaries, shallowest path first.
    pub fn all_info(&self) -> Vec<MountInfo> {
        let records = self.records.read();
        let mut infos: Vec<MountInfo> = records
            .iter()
            .map(|r| {
                let (kind, source) = match &r.caps.describer {
                    Some(d) => (d.kind().to_string(), d.source()),
                    None => ("unknown".to_string(), String::new()),
                };
                MountInfo {
                    path: r.path.clone(),
                    kind,
                    source,
                    perm: r.caps.perm().to_string(),
                    searchable: r.caps.searcher.is_some(),
                }
            })
            .collect();
        infos.sort_by(|a, b| a.path.cmp(&b.path));
        infos
    }

    /// Snapshot of all mount records, longest path first.
    pub fn records(&self) -> Vec<MountRecord> {
        self.records.read().clone()
    }

    #[cfg(test)]
    fn cached(&self, full_path: &str) -> bool {
        self.cache.read().contains_key(full_path)
    }
}
