//! Data types shared by the namespace and its backends.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::BitOr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::path;

/// Flat read/write/execute permission bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Perm(u8);

impl Perm {
    pub const NONE: Perm = Perm(0);
    pub const EXEC: Perm = Perm(0b001);
    pub const WRITE: Perm = Perm(0b010);
    pub const READ: Perm = Perm(0b100);
    pub const RW: Perm = Perm(0b110);
    pub const RX: Perm = Perm(0b101);
    pub const RWX: Perm = Perm(0b111);

    /// Build from the low three bits; higher bits are ignored.
    pub const fn from_bits(bits: u8) -> Self {
        Perm(bits & 0b111)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True if every bit of `verb` is set.
    pub const fn allows(self, verb: Perm) -> bool {
        self.0 & verb.0 == verb.0
    }

    /// Owner bits of a Unix mode (`0o754` → `rwx`).
    pub const fn from_mode(mode: u32) -> Self {
        Perm(((mode >> 6) & 0b111) as u8)
    }

    /// Parse `"rwx"`, `"r-x"`, `"rw"`, ...
    pub fn parse(s: &str) -> Option<Self> {
        let mut bits = 0u8;
        for c in s.chars() {
            match c {
                'r' => bits |= Self::READ.0,
                'w' => bits |= Self::WRITE.0,
                'x' => bits |= Self::EXEC.0,
                '-' => {}
                _ => return None,
            }
        }
        Some(Perm(bits))
    }
}

impl BitOr for Perm {
    type Output = Perm;

    fn bitor(self, rhs: Perm) -> Perm {
        Perm(self.0 | rhs.0)
    }
}

impl fmt::Display for Perm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = if self.allows(Perm::READ) { 'r' } else { '-' };
        let w = if self.allows(Perm::WRITE) { 'w' } else { '-' };
        let x = if self.allows(Perm::EXEC) { 'x' } else { '-' };
        write!(f, "{r}{w}{x}")
    }
}

/// A file or directory in the namespace.
///
/// Backends produce these on demand; the namespace never caches them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    /// Full namespace path once returned by the façade; backend-relative before that.
    pub path: String,
    pub is_dir: bool,
    pub perm: Perm,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<SystemTime>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
}

impl Entry {
    /// A regular file entry with `rw-` permissions and a MIME hint from its name.
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        let name = name.into();
        Self {
            mime: mime_hint(&name).map(str::to_string),
            path: name.clone(),
            name,
            is_dir: false,
            perm: Perm::RW,
            size,
            modified: None,
            meta: BTreeMap::new(),
        }
    }

    /// A directory entry with `rwx` permissions.
    pub fn directory(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: name.clone(),
            name,
            is_dir: true,
            perm: Perm::RWX,
            size: 0,
            mime: None,
            modified: None,
            meta: BTreeMap::new(),
        }
    }

    /// Directory that exists only because mounts sit beneath it.
    pub fn virtual_dir(full_path: &str) -> Self {
        let mut entry = Self::directory(path::base_name(full_path));
        entry.path = full_path.to_string();
        entry.perm = Perm::RX;
        entry.meta.insert("virtual".into(), "true".into());
        entry
    }

    pub fn with_perm(mut self, perm: Perm) -> Self {
        self.perm = perm;
        self
    }

    pub fn with_modified(mut self, modified: SystemTime) -> Self {
        self.modified = Some(modified);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Rebind to a full namespace path, fixing up `name` to match.
    pub fn at_path(mut self, full_path: &str) -> Self {
        self.name = path::base_name(full_path).to_string();
        self.path = full_path.to_string();
        self
    }

    pub fn is_virtual(&self) -> bool {
        self.meta.get("virtual").is_some_and(|v| v == "true")
    }
}

/// Guess a MIME type from a file extension.
pub fn mime_hint(name: &str) -> Option<&'static str> {
    let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
    Some(match ext.as_str() {
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "json" => "application/json",
        "toml" => "application/toml",
        "yaml" | "yml" => "application/yaml",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "rs" => "text/x-rust",
        "sh" => "application/x-sh",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => return None,
    })
}

/// Options for directory listing.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Include dot-entries.
    pub all: bool,
    /// Cap the number of returned entries.
    pub limit: Option<usize>,
}

/// How a write treats existing content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Create or truncate.
    #[default]
    Truncate,
    /// Create or append.
    Append,
}

/// Input to an executable entry.
#[derive(Debug, Clone, Default)]
pub struct ExecRequest {
    pub args: Vec<String>,
    pub stdin: Vec<u8>,
    /// Caller's working directory, for resolving relative arguments.
    pub cwd: String,
    pub env: HashMap<String, String>,
}

impl ExecRequest {
    pub fn new(args: Vec<String>) -> Self {
        Self {
            args,
            cwd: "/".to_string(),
            ..Self::default()
        }
    }

    pub fn stdin(mut self, stdin: impl Into<Vec<u8>>) -> Self {
        self.stdin = stdin.into();
        self
    }

    pub fn cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }
}

/// What an executable entry produced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecOutput {
    pub code: i64,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Options for a search query.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Only search beneath this path.
    pub scope: Option<String>,
    /// Keep at most this many hits after ranking.
    pub max_results: Option<usize>,
}

/// A single ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub path: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Summary line for one mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountInfo {
    pub path: String,
    pub kind: String,
    pub source: String,
    /// Derived from the backend's capabilities, e.g. `r-x`.
    pub perm: String,
    pub searchable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perm_display_and_parse() {
        assert_eq!(Perm::RWX.to_string(), "rwx");
        assert_eq!(Perm::RX.to_string(), "r-x");
        assert_eq!(Perm::NONE.to_string(), "---");
        assert_eq!(Perm::parse("r-x"), Some(Perm::RX));
        assert_eq!(Perm::parse("rq"), None);
    }

    #[test]
    fn perm_allows() {
        assert!(Perm::RW.allows(Perm::WRITE));
        assert!(!Perm::READ.allows(Perm::WRITE));
        assert!(Perm::RWX.allows(Perm::RX));
        assert_eq!(Perm::READ | Perm::EXEC, Perm::RX);
    }

    #[test]
    fn perm_from_mode_uses_owner_bits() {
        assert_eq!(Perm::from_mode(0o644), Perm::RW);
        assert_eq!(Perm::from_mode(0o755), Perm::RWX);
        assert_eq!(Perm::from_mode(0o444), Perm::READ);
    }

    #[test]
    fn virtual_dir_entry() {
        let e = Entry::virtual_dir("/mnt/remote");
        assert_eq!(e.name, "remote");
        assert!(e.is_dir);
        assert!(e.is_virtual());
        assert!(!e.perm.allows(Perm::WRITE));
    }

    #[test]
    fn mime_hints() {
        assert_eq!(mime_hint("a.TXT"), Some("text/plain"));
        assert_eq!(mime_hint("noext"), None);
    }
}
