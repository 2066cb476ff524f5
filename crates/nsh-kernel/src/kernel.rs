//! The Kernel — wires a namespace, its utilities and shells together.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                        Kernel                        │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────┐  │
//! │  │  Namespace  │  │ ToolRegistry │  │  Backend    │  │
//! │  │ (mounts,    │  │  (/bin)      │  │  Registry   │  │
//! │  │  events)    │  │              │  │  (mount)    │  │
//! │  └─────────────┘  └──────────────┘  └─────────────┘  │
//! │        ▲ shared by every Shell the kernel hands out  │
//! └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::interpreter::{Session, Shell};
use crate::tools::ToolRegistry;
use crate::vfs::{
    BackendRegistry, DEFAULT_CAPACITY, EventMask, LocalFs, MemoryFs, Namespace, ToolFs, Watch,
};

/// Configuration for kernel initialization.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Name of this kernel, shown in the prompt.
    pub name: String,
    /// Initial working directory.
    pub cwd: String,
    /// Value of `HOME`.
    pub home: String,
    /// Value of `PATH`.
    pub path: String,
    /// Mount a memory store at `/tmp`.
    pub mount_tmp: bool,
    /// Host directory to expose, if any.
    pub local_root: Option<PathBuf>,
    /// Where `local_root` is mounted.
    pub local_mount: String,
    /// Mailbox size for watches made through [`Kernel::watch`].
    pub event_capacity: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            cwd: "/".to_string(),
            home: "/".to_string(),
            path: "/bin".to_string(),
            mount_tmp: true,
            local_root: None,
            local_mount: "/mnt/local".to_string(),
            event_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl KernelConfig {
    /// Memory-only configuration, nothing from the host.
    pub fn transient() -> Self {
        Self {
            name: "transient".to_string(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `NSH_HOME`, `NSH_PATH`, `NSH_LOCAL_ROOT` and
    /// `NSH_LOCAL_MOUNT`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(home) = std::env::var("NSH_HOME") {
            config.cwd = home.clone();
            config.home = home;
        }
        if let Ok(path) = std::env::var("NSH_PATH") {
            config.path = path;
        }
        if let Ok(root) = std::env::var("NSH_LOCAL_ROOT") {
            config.local_root = Some(PathBuf::from(root));
        }
        if let Ok(mount) = std::env::var("NSH_LOCAL_MOUNT") {
            config.local_mount = mount;
        }
        config
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn with_home(mut self, home: impl Into<String>) -> Self {
        self.home = home.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_tmp(mut self, mount_tmp: bool) -> Self {
        self.mount_tmp = mount_tmp;
        self
    }

    pub fn with_local(mut self, root: impl Into<PathBuf>, mount: impl Into<String>) -> Self {
        self.local_root = Some(root.into());
        self.local_mount = mount.into();
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

/// Owns the namespace and hands out shells over it.
pub struct Kernel {
    config: KernelConfig,
    ns: Arc<Namespace>,
    tools: Arc<ToolRegistry>,
    backends: Arc<BackendRegistry>,
}

impl Kernel {
    /// Build the standard layout: memory root, `/bin`, optional `/tmp` and
    /// optional host directory.
    pub fn new(config: KernelConfig) -> Result<Self> {
        let ns = Arc::new(Namespace::new());
        let tools = Arc::new(ToolRegistry::with_builtins());
        let backends = Arc::new(BackendRegistry::with_defaults());

        let root = MemoryFs::labelled("root");
        ns.mount("/", Arc::new(root)).context("mounting root")?;
        ns.mount(
            "/bin",
            Arc::new(ToolFs::new(Arc::downgrade(&ns), tools.clone(), backends.clone())),
        )
        .context("mounting /bin")?;

        if config.mount_tmp {
            ns.mount("/tmp", Arc::new(MemoryFs::labelled("tmp")))
                .context("mounting /tmp")?;
        }

        if let Some(root) = &config.local_root {
            if !root.is_dir() {
                anyhow::bail!("local root {} is not a directory", root.display());
            }
            ns.mount(&config.local_mount, Arc::new(LocalFs::new(root)))
                .with_context(|| format!("mounting {} at {}", root.display(), config.local_mount))?;
        }

        debug!(name = %config.name, mounts = ns.mount_info().len(), "kernel ready");
        Ok(Self {
            config,
            ns,
            tools,
            backends,
        })
    }

    pub fn transient() -> Result<Self> {
        Self::new(KernelConfig::transient())
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn namespace(&self) -> &Arc<Namespace> {
        &self.ns
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn backends(&self) -> &Arc<BackendRegistry> {
        &self.backends
    }

    /// A fresh session with `HOME`, `PATH` and the configured working
    /// directory.
    pub fn session(&self) -> Session {
        let mut session = Session::new(self.config.cwd.clone());
        session.set_var("HOME", self.config.home.clone());
        session.set_var("PATH", self.config.path.clone());
        session
    }

    /// A new shell with its own session over the shared namespace.
    pub fn shell(&self) -> Shell {
        Shell::new(self.ns.clone(), self.session())
    }

    /// Subscribe to changes using the configured mailbox size.
    pub fn watch(&self, prefix: &str, mask: EventMask) -> Watch {
        self.ns
            .events()
            .watch_with_capacity(prefix, mask, self.config.event_capacity)
    }
}
