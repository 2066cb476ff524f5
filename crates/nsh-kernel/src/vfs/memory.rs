//! In-memory backend.
//!
//! Used for `/`, `/tmp` and testing. All data is ephemeral.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::error::{VfsError, VfsResult};
use super::traits::{Backend, Capabilities, Describe, Mutable, Readable, Searchable, Touchable, Writable};
use super::types::{Entry, ListOptions, Perm, SearchHit, SearchOptions, WriteMode};
use crate::cx::Cx;

#[derive(Debug, Clone)]
enum Body {
    File(Vec<u8>),
    Dir,
}

#[derive(Debug, Clone)]
struct Node {
    body: Body,
    perm: Perm,
    modified: SystemTime,
    meta: BTreeMap<String, String>,
}

impl Node {
    fn file(data: Vec<u8>) -> Self {
        Self {
            body: Body::File(data),
            perm: Perm::RW,
            modified: SystemTime::now(),
            meta: BTreeMap::new(),
        }
    }

    fn dir() -> Self {
        Self {
            body: Body::Dir,
            perm: Perm::RWX,
            modified: SystemTime::now(),
            meta: BTreeMap::new(),
        }
    }

    fn is_dir(&self) -> bool {
        matches!(self.body, Body::Dir)
    }

    fn to_entry(&self, key: &str) -> Entry {
        let name = key.rsplit('/').next().unwrap_or(key);
        let entry = match &self.body {
            Body::File(data) => Entry::file(name, data.len() as u64),
            Body::Dir => Entry::directory(name),
        };
        let mut entry = entry.with_perm(self.perm).with_modified(self.modified);
        entry.path = key.to_string();
        entry.meta = self.meta.clone();
        entry
    }
}

/// In-memory tree.
///
/// Thread-safe via an internal `RwLock`. All data is lost when dropped.
#[derive(Debug)]
pub struct MemoryFs {
    label: String,
    nodes: RwLock<HashMap<String, Node>>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::labelled("memory")
    }

    /// A store whose mount listing shows `label` as its source.
    pub fn labelled(label: impl Into<String>) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(String::new(), Node::dir());
        Self {
            label: label.into(),
            nodes: RwLock::new(nodes),
        }
    }

    /// Normalize an inner path: no leading slash, `.` and `..` resolved.
    fn key(path: &str) -> String {
        let mut parts: Vec<&str> = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                s => parts.push(s),
            }
        }
        parts.join("/")
    }

    fn parent_key(key: &str) -> &str {
        match key.rfind('/') {
            Some(idx) => &key[..idx],
            None => "",
        }
    }

    fn ensure_parents(nodes: &mut HashMap<String, Node>, key: &str) -> VfsResult<()> {
        let mut current = String::new();
        let parent = Self::parent_key(key);
        if parent.is_empty() {
            return Ok(());
        }
        for segment in parent.split('/') {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);
            match nodes.get(&current) {
                Some(node) if !node.is_dir() => return Err(VfsError::not_a_directory(current)),
                Some(_) => {}
                None => {
                    nodes.insert(current.clone(), Node::dir());
                }
            }
        }
        Ok(())
    }

    /// Write a file directly, creating parents. Convenience for seeding.
    pub async fn insert_file(&self, path: &str, data: impl Into<Vec<u8>>) -> VfsResult<()> {
        let key = Self::key(path);
        let mut nodes = self.nodes.write().await;
        Self::ensure_parents(&mut nodes, &key)?;
        nodes.insert(key, Node::file(data.into()));
        Ok(())
    }

    /// Change the permission bits of an existing entry.
    pub async fn set_perm(&self, path: &str, perm: Perm) -> VfsResult<()> {
        let key = Self::key(path);
        let mut nodes = self.nodes.write().await;
        let node = nodes.get_mut(&key).ok_or_else(|| VfsError::not_found(path))?;
        node.perm = perm;
        Ok(())
    }

    /// Attach a metadata key to an existing entry.
    pub async fn set_meta(&self, path: &str, key: &str, value: &str) -> VfsResult<()> {
        let k = Self::key(path);
        let mut nodes = self.nodes.write().await;
        let node = nodes.get_mut(&k).ok_or_else(|| VfsError::not_found(path))?;
        node.meta.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn is_child_of(key: &str, dir: &str) -> bool {
        !key.is_empty() && key != dir && Self::parent_key(key) == dir
    }

    fn is_under(key: &str, dir: &str) -> bool {
        if dir.is_empty() {
            return !key.is_empty();
        }
        key.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/'))
    }
}

#[async_trait]
impl Backend for MemoryFs {
    async fn stat(&self, cx: &Cx, path: &str) -> VfsResult<Entry> {
        cx.check()?;
        let key = Self::key(path);
        let nodes = self.nodes.read().await;
        nodes
            .get(&key)
            .map(|node| node.to_entry(&key))
            .ok_or_else(|| VfsError::not_found(path))
    }

    async fn list(&self, cx: &Cx, path: &str, opts: &ListOptions) -> VfsResult<Vec<Entry>> {
        cx.check()?;
        let key = Self::key(path);
        let nodes = self.nodes.read().await;

        match nodes.get(&key) {
            Some(node) if node.is_dir() => {}
            Some(_) => return Err(VfsError::not_a_directory(path)),
            None => return Err(VfsError::not_found(path)),
        }

        let mut result: Vec<Entry> = nodes
            .iter()
            .filter(|(k, _)| Self::is_child_of(k, &key))
            .map(|(k, node)| node.to_entry(k))
            .filter(|e| opts.all || !e.name.starts_with('.'))
            .collect();
        result.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(limit) = opts.limit {
            result.truncate(limit);
        }
        Ok(result)
    }

    fn capabilities(self: Arc<Self>) -> Capabilities {
        Capabilities::new()
            .reader(self.clone())
            .writer(self.clone())
            .mutator(self.clone())
            .toucher(self.clone())
            .searcher(self.clone())
            .describer(self)
    }
}

#[async_trait]
impl Readable for MemoryFs {
    async fn open(&self, cx: &Cx, path: &str) -> VfsResult<Vec<u8>> {
        cx.check()?;
        let key = Self::key(path);
        let nodes = self.nodes.read().await;
        match nodes.get(&key) {
            Some(Node {
                body: Body::File(data),
                ..
            }) => Ok(data.clone()),
            Some(_) => Err(VfsError::is_a_directory(path)),
            None => Err(VfsError::not_found(path)),
        }
    }
}

#[async_trait]
impl Writable for MemoryFs {
    async fn write(&self, cx: &Cx, path: &str, data: &[u8], mode: WriteMode) -> VfsResult<()> {
        cx.check()?;
        let key = Self::key(path);
        if key.is_empty() {
            return Err(VfsError::is_a_directory(path));
        }
        let mut nodes = self.nodes.write().await;
        Self::ensure_parents(&mut nodes, &key)?;

        match nodes.get_mut(&key) {
            Some(Node { body: Body::Dir, .. }) => Err(VfsError::is_a_directory(path)),
            Some(node) => {
                if let Body::File(existing) = &mut node.body {
                    match mode {
                        WriteMode::Truncate => *existing = data.to_vec(),
                        WriteMode::Append => existing.extend_from_slice(data),
                    }
                }
                node.modified = SystemTime::now();
                Ok(())
            }
            None => {
                nodes.insert(key, Node::file(data.to_vec()));
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Mutable for MemoryFs {
    async fn mkdir(&self, cx: &Cx, path: &str) -> VfsResult<()> {
        cx.check()?;
        let key = Self::key(path);
        let mut nodes = self.nodes.write().await;
        Self::ensure_parents(&mut nodes, &key)?;

        match nodes.get(&key) {
            Some(node) if node.is_dir() => Ok(()),
            Some(_) => Err(VfsError::already_exists(path)),
            None => {
                nodes.insert(key, Node::dir());
                Ok(())
            }
        }
    }

    async fn remove(&self, cx: &Cx, path: &str, recursive: bool) -> VfsResult<()> {
        cx.check()?;
        let key = Self::key(path);
        if key.is_empty() {
            return Err(VfsError::MountPoint(path.to_string()));
        }
        let mut nodes = self.nodes.write().await;

        let is_dir = match nodes.get(&key) {
            Some(node) => node.is_dir(),
            None => return Err(VfsError::not_found(path)),
        };
        if is_dir {
            let has_children = nodes.keys().any(|k| Self::is_under(k, &key));
            if has_children && !recursive {
                return Err(VfsError::DirectoryNotEmpty(path.to_string()));
            }
            nodes.retain(|k, _| !Self::is_under(k, &key));
        }
        nodes.remove(&key);
        Ok(())
    }

    async fn rename(&self, cx: &Cx, from: &str, to: &str) -> VfsResult<()> {
        cx.check()?;
        let from_key = Self::key(from);
        let to_key = Self::key(to);
        if from_key.is_empty() || to_key.is_empty() {
            return Err(VfsError::MountPoint("/".to_string()));
        }
        if Self::is_under(&to_key, &from_key) {
            return Err(VfsError::invalid(format!("cannot move {from} into itself")));
        }

        let mut nodes = self.nodes.write().await;
        let node = nodes.get(&from_key).cloned().ok_or_else(|| VfsError::not_found(from))?;

        if let Some(existing) = nodes.get(&to_key) {
            match (node.is_dir(), existing.is_dir()) {
                (false, true) => return Err(VfsError::is_a_directory(to)),
                (true, false) => return Err(VfsError::not_a_directory(to)),
                (true, true) if nodes.keys().any(|k| Self::is_under(k, &to_key)) => {
                    return Err(VfsError::DirectoryNotEmpty(to.to_string()));
                }
                _ => {}
            }
        }
        Self::ensure_parents(&mut nodes, &to_key)?;

        if node.is_dir() {
            let children: Vec<(String, Node)> = nodes
                .iter()
                .filter(|(k, _)| Self::is_under(k, &from_key))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            for (old_key, child) in children {
                nodes.remove(&old_key);
                let relative = &old_key[from_key.len()..];
                nodes.insert(format!("{to_key}{relative}"), child);
            }
        }
        nodes.remove(&from_key);
        nodes.insert(to_key, node);
        Ok(())
    }
}

#[async_trait]
impl Touchable for MemoryFs {
    async fn touch(&self, cx: &Cx, path: &str) -> VfsResult<()> {
        cx.check()?;
        let key = Self::key(path);
        let mut nodes = self.nodes.write().await;
        match nodes.get_mut(&key) {
            Some(node) => node.modified = SystemTime::now(),
            None => {
                Self::ensure_parents(&mut nodes, &key)?;
                nodes.insert(key, Node::file(Vec::new()));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Searchable for MemoryFs {
    /// Case-insensitive substring match over names and file contents.
    ///
    /// Score is the number of content occurrences, plus two for a name match.
    async fn search(&self, cx: &Cx, query: &str, opts: &SearchOptions) -> VfsResult<Vec<SearchHit>> {
        cx.check()?;
        let needle = query.to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let scope = opts.scope.as_deref().map(Self::key).unwrap_or_default();
        let nodes = self.nodes.read().await;

        let mut hits = Vec::new();
        for (key, node) in nodes.iter() {
            if key.is_empty() || !(scope.is_empty() || *key == scope || Self::is_under(key, &scope)) {
                continue;
            }
            let name = key.rsplit('/').next().unwrap_or(key).to_lowercase();
            let mut score = if name.contains(&needle) { 2.0 } else { 0.0 };
            let mut snippet = None;
            if let Body::File(data) = &node.body {
                let text = String::from_utf8_lossy(data);
                let lower = text.to_lowercase();
                score += lower.matches(&needle).count() as f64;
                snippet = text
                    .lines()
                    .find(|line| line.to_lowercase().contains(&needle))
                    .map(|line| line.trim().to_string());
            }
            if score > 0.0 {
                hits.push(SearchHit {
                    path: key.clone(),
                    score,
                    snippet,
                });
            }
        }
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.path.cmp(&b.path)));
        if let Some(max) = opts.max_results {
            hits.truncate(max);
        }
        Ok(hits)
    }
}

impl Describe for MemoryFs {
    fn kind(&self) -> &str {
        "memory"
    }

    fn source(&self) -> String {
        self.label.clone()
    }
}
