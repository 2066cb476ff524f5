//! The namespace: one path tree over many backends.
//!
//! ```text
//! /                 MemoryFs (root)
//! ├── /bin/         ToolFs (utilities, r-x)
//! ├── /tmp/         MemoryFs
//! └── /mnt/host/    LocalFs (optional)
//! ```
//!
//! [`MountTable`] maps paths to backends by longest prefix. [`Namespace`] is
//! the façade every caller goes through: it checks capabilities and
//! permission bits, dispatches, and publishes change events on its
//! [`EventHub`].

mod error;
mod events;
mod local;
mod memory;
mod mount;
mod namespace;
pub mod path;
mod registry;
mod tool_fs;
mod traits;
mod types;

pub use error::{VfsError, VfsResult};
pub use events::{ChangeEvent, EventHub, EventKind, EventMask, Watch, DEFAULT_CAPACITY};
pub use local::LocalFs;
pub use memory::MemoryFs;
pub use mount::{MountRecord, MountTable, Resolved};
pub use namespace::{Namespace, SearchFailure, SearchResults};
pub use registry::{BackendFactory, BackendRegistry};
pub use tool_fs::ToolFs;
pub use traits::{
    Backend, Capabilities, Describe, Executable, Mutable, Readable, Searchable, Touchable, Writable,
};
pub use types::{
    mime_hint, Entry, ExecOutput, ExecRequest, ListOptions, MountInfo, Perm, SearchHit,
    SearchOptions, WriteMode,
};
