//! Local filesystem backend.
//!
//! Exposes a host directory. A read-only instance simply does not advertise
//! the write, mutate and touch capabilities.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::error::{VfsError, VfsResult};
use super::traits::{Backend, Capabilities, Describe, Mutable, Readable, Touchable, Writable};
use super::types::{Entry, ListOptions, Perm, WriteMode};
use crate::cx::Cx;

/// Local filesystem backend.
///
/// All operations are relative to `root`. If `root` is `/home/amy/project`,
/// then `open("src/main.rs")` reads `/home/amy/project/src/main.rs`.
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
    read_only: bool,
}

impl LocalFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            read_only: false,
        }
    }

    pub fn read_only(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            read_only: true,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an inner path onto the host, refusing anything that climbs out
    /// of the root.
    fn resolve(&self, path: &str) -> VfsResult<PathBuf> {
        let mut full = self.root.clone();
        let mut depth = 0usize;
        for component in Path::new(path.trim_start_matches('/')).components() {
            match component {
                Component::Normal(c) => {
                    full.push(c);
                    depth += 1;
                }
                Component::ParentDir => {
                    if depth == 0 {
                        return Err(VfsError::PathEscapesRoot(path.to_string()));
                    }
                    full.pop();
                    depth -= 1;
                }
                Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            }
        }
        Ok(full)
    }

    fn entry_from_meta(&self, name: &str, inner: &str, meta: &std::fs::Metadata) -> Entry {
        let entry = if meta.is_dir() {
            Entry::directory(name)
        } else {
            Entry::file(name, meta.len())
        };
        let mut perm = Self::perm_of(meta);
        if self.read_only {
            perm = Perm::from_bits(perm.bits() & !Perm::WRITE.bits());
        }
        let mut entry = entry.with_perm(perm);
        entry.path = inner.to_string();
        entry.modified = meta.modified().ok();
        entry
    }

    #[cfg(unix)]
    fn perm_of(meta: &std::fs::Metadata) -> Perm {
        use std::os::unix::fs::PermissionsExt;
        Perm::from_mode(meta.permissions().mode())
    }

    #[cfg(not(unix))]
    fn perm_of(meta: &std::fs::Metadata) -> Perm {
        let base = if meta.permissions().readonly() { Perm::READ } else { Perm::RW };
        if meta.is_dir() { base | Perm::EXEC } else { base }
    }
}

fn io_err(path: &str) -> impl FnOnce(io::Error) -> VfsError + '_ {
    move |e| VfsError::from_io(e, path)
}

#[async_trait]
impl Backend for LocalFs {
    async fn stat(&self, cx: &Cx, path: &str) -> VfsResult<Entry> {
        cx.check()?;
        let full = self.resolve(path)?;
        let meta = fs::metadata(&full).await.map_err(io_err(path))?;
        let name = path.rsplit('/').next().unwrap_or(path);
        Ok(self.entry_from_meta(name, path, &meta))
    }

    async fn list(&self, cx: &Cx, path: &str, opts: &ListOptions) -> VfsResult<Vec<Entry>> {
        cx.check()?;
        let full = self.resolve(path)?;
        let mut dir = fs::read_dir(&full).await.map_err(io_err(path))?;
        let mut entries = Vec::new();
        while let Some(child) = dir.next_entry().await.map_err(io_err(path))? {
            cx.check()?;
            let name = child.file_name().to_string_lossy().into_owned();
            if !opts.all && name.starts_with('.') {
                continue;
            }
            let meta = match child.metadata().await {
                Ok(meta) => meta,
                Err(_) => continue,
            };
            let inner = if path.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", path.trim_end_matches('/'), name)
            };
            entries.push(self.entry_from_meta(&name, &inner, &meta));
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(limit) = opts.limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    fn capabilities(self: Arc<Self>) -> Capabilities {
        let caps = Capabilities::new().reader(self.clone());
        if self.read_only {
            caps.describer(self)
        } else {
            caps.writer(self.clone())
                .mutator(self.clone())
                .toucher(self.clone())
                .describer(self)
        }
    }
}

#[async_trait]
impl Readable for LocalFs {
    async fn open(&self, cx: &Cx, path: &str) -> VfsResult<Vec<u8>> {
        cx.check()?;
        let full = self.resolve(path)?;
        fs::read(&full).await.map_err(io_err(path))
    }
}

#[async_trait]
impl Writable for LocalFs {
    async fn write(&self, cx: &Cx, path: &str, data: &[u8], mode: WriteMode) -> VfsResult<()> {
        cx.check()?;
        let full = self.resolve(path)?;
        let mut options = fs::OpenOptions::new();
        options.create(true);
        match mode {
            WriteMode::Truncate => options.write(true).truncate(true),
            WriteMode::Append => options.append(true),
        };
        let mut file = options.open(&full).await.map_err(io_err(path))?;
        file.write_all(data).await.map_err(io_err(path))?;
        file.flush().await.map_err(io_err(path))?;
        Ok(())
    }
}

#[async_trait]
impl Mutable for LocalFs {
    async fn mkdir(&self, cx: &Cx, path: &str) -> VfsResult<()> {
        cx.check()?;
        let full = self.resolve(path)?;
        fs::create_dir(&full).await.map_err(io_err(path))
    }

    async fn remove(&self, cx: &Cx, path: &str, recursive: bool) -> VfsResult<()> {
        cx.check()?;
        if path.trim_matches('/').is_empty() {
            return Err(VfsError::MountPoint(path.to_string()));
        }
        let full = self.resolve(path)?;
        let meta = fs::symlink_metadata(&full).await.map_err(io_err(path))?;
        if !meta.is_dir() {
            fs::remove_file(&full).await.map_err(io_err(path))
        } else if recursive {
            fs::remove_dir_all(&full).await.map_err(io_err(path))
        } else {
            fs::remove_dir(&full).await.map_err(io_err(path))
        }
    }

    async fn rename(&self, cx: &Cx, from: &str, to: &str) -> VfsResult<()> {
        cx.check()?;
        let source = self.resolve(from)?;
        let target = self.resolve(to)?;
        fs::rename(&source, &target).await.map_err(io_err(from))
    }
}

#[async_trait]
impl Touchable for LocalFs {
    async fn touch(&self, cx: &Cx, path: &str) -> VfsResult<()> {
        cx.check()?;
        let full = self.resolve(path)?;
        let owned = path.to_string();
        tokio::task::spawn_blocking(move || {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&full)?;
            file.set_modified(SystemTime::now())
        })
        .await
        .map_err(|e| VfsError::other(e.to_string()))?
        .map_err(|e| VfsError::from_io(e, &owned))
    }
}

impl Describe for LocalFs {
    fn kind(&self) -> &str {
        "local"
    }

    fn source(&self) -> String {
        let mode = if self.read_only { " (ro)" } else { "" };
        format!("{}{}", self.root.display(), mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_write_read_list() {
        let dir = tempdir().unwrap();
        let fs = LocalFs::new(dir.path());
        let cx = Cx::new();

        fs.write(&cx, "a.txt", b"hello", WriteMode::Truncate).await.unwrap();
        fs.write(&cx, "a.txt", b" world", WriteMode::Append).await.unwrap();
        assert_eq!(fs.open(&cx, "a.txt").await.unwrap(), b"hello world");

        fs.mkdir(&cx, "sub").await.unwrap();
        let names: Vec<String> = fs
            .list(&cx, "", &ListOptions::default())
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a.txt", "sub"]);
    }

    #[tokio::test]
    async fn test_stat_reports_entry() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("f.md"), "# hi").unwrap();
        let fs = LocalFs::new(dir.path());
        let entry = fs.stat(&Cx::new(), "f.md").await.unwrap();
        assert_eq!(entry.name, "f.md");
        assert_eq!(entry.size, 4);
        assert_eq!(entry.mime.as_deref(), Some("text/markdown"));
        assert!(entry.perm.allows(Perm::READ));
    }

    #[tokio::test]
    async fn test_escape_rejected() {
        let dir = tempdir().unwrap();
        let fs = LocalFs::new(dir.path());
        let result = fs.open(&Cx::new(), "../etc/passwd").await;
        assert!(matches!(result, Err(VfsError::PathEscapesRoot(_))));
    }

    #[tokio::test]
    async fn test_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let fs = LocalFs::new(dir.path());
        let result = fs.stat(&Cx::new(), "nope").await;
        assert!(matches!(result, Err(VfsError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rename_and_remove() {
        let dir = tempdir().unwrap();
        let fs = LocalFs::new(dir.path());
        let cx = Cx::new();
        fs.write(&cx, "old", b"x", WriteMode::Truncate).await.unwrap();
        fs.rename(&cx, "old", "new").await.unwrap();
        assert!(dir.path().join("new").exists());
        fs.remove(&cx, "new", false).await.unwrap();
        assert!(!dir.path().join("new").exists());
    }

    #[tokio::test]
    async fn test_touch_creates_file() {
        let dir = tempdir().unwrap();
        let fs = LocalFs::new(dir.path());
        fs.touch(&Cx::new(), "stamp").await.unwrap();
        assert!(dir.path().join("stamp").exists());
    }

    #[test]
    fn test_read_only_capabilities() {
        let dir = tempdir().unwrap();
        let caps = Arc::new(LocalFs::read_only(dir.path())).capabilities();
        assert!(caps.reader.is_some());
        assert!(caps.writer.is_none());
        assert!(caps.mutator.is_none());
        assert_eq!(caps.perm(), Perm::READ);
    }

    #[tokio::test]
    async fn test_read_only_strips_write_bit() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("f"), "x").unwrap();
        let fs = LocalFs::read_only(dir.path());
        let entry = fs.stat(&Cx::new(), "f").await.unwrap();
        assert!(!entry.perm.allows(Perm::WRITE));
    }
}
