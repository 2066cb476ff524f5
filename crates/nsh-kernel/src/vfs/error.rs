//! Namespace error types.
//!
//! Every failure the façade can report is a distinct variant, so callers
//! match on the kind instead of parsing message text.

use std::io;
use thiserror::Error;

/// Namespace error type.
#[derive(Debug, Error)]
pub enum VfsError {
    /// Path absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Entry exists but its permission bits deny reading.
    #[error("permission denied (not readable): {0}")]
    NotReadable(String),

    /// Entry exists but its permission bits deny writing.
    #[error("permission denied (not writable): {0}")]
    NotWritable(String),

    /// Entry exists but its permission bits deny execution.
    #[error("permission denied (not executable): {0}")]
    NotExecutable(String),

    /// The bound backend never implements this capability.
    #[error("{op} not supported by backend: {path}")]
    NotSupported { op: &'static str, path: String },

    /// A mount already exists at exactly this path.
    #[error("already mounted: {0}")]
    AlreadyMounted(String),

    /// Mounting here would sit above an existing deeper mount.
    #[error("cannot mount {path}: {existing} is already mounted beneath it")]
    MountUnderMount { path: String, existing: String },

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Creating an entry whose parent is missing.
    #[error("parent directory does not exist: {0}")]
    ParentNotFound(String),

    /// Path already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Directory not empty.
    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// The path is a mount point and cannot be removed or renamed.
    #[error("is a mount point: {0}")]
    MountPoint(String),

    /// Path escapes a backend's root.
    #[error("path escapes root: {0}")]
    PathEscapesRoot(String),

    /// Bad argument to a backend or factory.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation's context was cancelled or its deadline passed.
    #[error("operation cancelled")]
    Cancelled,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl VfsError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn not_supported(op: &'static str, path: impl Into<String>) -> Self {
        Self::NotSupported {
            op,
            path: path.into(),
        }
    }

    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// True for the not-found kind, including I/O errors that carry it.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Map an I/O error from a host filesystem call onto the namespace taxonomy.
    pub fn from_io(err: io::Error, path: &str) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_string()),
            io::ErrorKind::AlreadyExists => Self::AlreadyExists(path.to_string()),
            io::ErrorKind::IsADirectory => Self::IsADirectory(path.to_string()),
            io::ErrorKind::NotADirectory => Self::NotADirectory(path.to_string()),
            io::ErrorKind::DirectoryNotEmpty => Self::DirectoryNotEmpty(path.to_string()),
            io::ErrorKind::PermissionDenied => Self::NotWritable(path.to_string()),
            _ => Self::Io(err),
        }
    }
}

impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        let kind = match &e {
            VfsError::NotFound(_) => io::ErrorKind::NotFound,
            VfsError::NotReadable(_)
            | VfsError::NotWritable(_)
            | VfsError::NotExecutable(_)
            | VfsError::PathEscapesRoot(_) => io::ErrorKind::PermissionDenied,
            VfsError::NotSupported { .. } => io::ErrorKind::Unsupported,
            VfsError::AlreadyMounted(_) | VfsError::AlreadyExists(_) => {
                io::ErrorKind::AlreadyExists
            }
            VfsError::IsADirectory(_) => io::ErrorKind::IsADirectory,
            VfsError::NotADirectory(_) | VfsError::ParentNotFound(_) => {
                io::ErrorKind::NotADirectory
            }
            VfsError::DirectoryNotEmpty(_) => io::ErrorKind::DirectoryNotEmpty,
            VfsError::MountPoint(_) | VfsError::MountUnderMount { .. } => {
                io::ErrorKind::ResourceBusy
            }
            VfsError::InvalidArgument(_) => io::ErrorKind::InvalidInput,
            VfsError::Cancelled => io::ErrorKind::Interrupted,
            VfsError::Io(inner) => return io::Error::new(inner.kind(), e.to_string()),
            VfsError::Other(_) => io::ErrorKind::Other,
        };
        io::Error::new(kind, e.to_string())
    }
}

/// Result type for namespace operations.
pub type VfsResult<T> = Result<T, VfsError>;
