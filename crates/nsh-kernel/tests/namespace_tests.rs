//! Mount table and façade behavior seen from outside the crate.

use std::sync::Arc;

use async_trait::async_trait;
use nsh_kernel::vfs::{
    Backend, Capabilities, Entry, EventKind, EventMask, ListOptions, MemoryFs, Namespace, Perm,
    Readable, SearchHit, SearchOptions, Searchable, VfsError, VfsResult, Writable, WriteMode,
};
use nsh_kernel::Cx;
use proptest::prelude::*;
use rstest::rstest;

fn mem() -> Arc<MemoryFs> {
    Arc::new(MemoryFs::new())
}

/// A memory store that only offers plain reads and writes, so the façade
/// has to emulate touch on top of them.
struct PlainFs(Arc<MemoryFs>);

#[async_trait]
impl Backend for PlainFs {
    async fn stat(&self, cx: &Cx, path: &str) -> VfsResult<Entry> {
        self.0.stat(cx, path).await
    }

    async fn list(&self, cx: &Cx, path: &str, opts: &ListOptions) -> VfsResult<Vec<Entry>> {
        self.0.list(cx, path, opts).await
    }

    fn capabilities(self: Arc<Self>) -> Capabilities {
        Capabilities::new().reader(self.clone()).writer(self)
    }
}

#[async_trait]
impl Readable for PlainFs {
    async fn open(&self, cx: &Cx, path: &str) -> VfsResult<Vec<u8>> {
        self.0.open(cx, path).await
    }
}

#[async_trait]
impl Writable for PlainFs {
    async fn write(&self, cx: &Cx, path: &str, data: &[u8], mode: WriteMode) -> VfsResult<()> {
        self.0.write(cx, path, data, mode).await
    }
}

/// Searchable, but every query fails.
struct BrokenIndex;

#[async_trait]
impl Backend for BrokenIndex {
    async fn stat(&self, _cx: &Cx, path: &str) -> VfsResult<Entry> {
        if path.is_empty() {
            Ok(Entry::directory(""))
        } else {
            Err(VfsError::not_found(path))
        }
    }

    async fn list(&self, _cx: &Cx, _path: &str, _opts: &ListOptions) -> VfsResult<Vec<Entry>> {
        Ok(Vec::new())
    }

    fn capabilities(self: Arc<Self>) -> Capabilities {
        Capabilities::new().searcher(self)
    }
}

#[async_trait]
impl Searchable for BrokenIndex {
    async fn search(&self, _cx: &Cx, _query: &str, _opts: &SearchOptions) -> VfsResult<Vec<SearchHit>> {
        Err(VfsError::other("index offline"))
    }
}

// ============================================================================
// Resolution
// ============================================================================

#[rstest]
#[case::exact("/data", "/data", "")]
#[case::child("/data/x", "/data", "x")]
#[case::deep("/data/x/y.txt", "/data", "x/y.txt")]
#[case::root_fallback("/other/file", "/", "other/file")]
#[case::sibling_prefix("/database", "/", "database")]
#[case::nested("/data/deep/z", "/data/deep", "z")]
fn longest_prefix_wins(#[case] query: &str, #[case] mount: &str, #[case] inner: &str) {
    let ns = Namespace::new();
    ns.mount("/", mem()).unwrap();
    ns.mount("/data", mem()).unwrap();
    ns.mount("/data/deep", mem()).unwrap();

    let resolved = ns.mounts().resolve(query).unwrap();
    assert_eq!(resolved.mount.path, mount);
    assert_eq!(resolved.inner, inner);
}

#[test]
fn unmount_invalidates_cache() {
    let ns = Namespace::new();
    ns.mount("/data", mem()).unwrap();
    assert!(ns.mounts().resolve("/data/x").is_ok());
    ns.unmount("/data").unwrap();
    assert!(matches!(ns.mounts().resolve("/data/x"), Err(VfsError::NotFound(_))));
    assert!(matches!(ns.mounts().resolve("/data"), Err(VfsError::NotFound(_))));
}

#[test]
fn shadowing_from_above_is_refused() {
    let ns = Namespace::new();
    ns.mount("/a/b/c", mem()).unwrap();
    assert!(matches!(ns.mount("/a", mem()), Err(VfsError::MountUnderMount { .. })));
    assert!(matches!(ns.mount("/", mem()), Err(VfsError::MountUnderMount { .. })));
    ns.mount("/a/b/c/d", mem()).unwrap();
    assert!(matches!(ns.mount("/a/b/c", mem()), Err(VfsError::AlreadyMounted(_))));
}

proptest! {
    #[test]
    fn every_mount_resolves_to_itself(segments in prop::collection::vec("[a-z]{1,6}", 1..4)) {
        let mount = format!("/{}", segments.join("/"));
        let ns = Namespace::new();
        ns.mount("/", mem()).unwrap();
        ns.mount(&mount, mem()).unwrap();

        let exact = ns.mounts().resolve(&mount).unwrap();
        prop_assert_eq!(&exact.mount.path, &mount);
        prop_assert_eq!(exact.inner, "");

        let child = ns.mounts().resolve(&format!("{mount}/x")).unwrap();
        prop_assert_eq!(&child.mount.path, &mount);
        prop_assert_eq!(child.inner, "x");
    }

    #[test]
    fn descendant_mounts_always_succeed(
        base in prop::collection::vec("[a-z]{1,4}", 1..3),
        extra in prop::collection::vec("[a-z]{1,4}", 1..3),
    ) {
        let parent = format!("/{}", base.join("/"));
        let child = format!("{parent}/{}", extra.join("/"));
        let ns = Namespace::new();
        ns.mount(&parent, mem()).unwrap();
        prop_assert!(ns.mount(&child, mem()).is_ok());
    }
}

// ============================================================================
// Virtual directories
// ============================================================================

#[tokio::test]
async fn virtual_dirs_compose_deep_mounts() {
    let ns = Namespace::new();
    ns.mount("/srv/a/one", mem()).unwrap();
    ns.mount("/srv/b", mem()).unwrap();
    let cx = Cx::new();

    let entry = ns.stat(&cx, "/srv").await.unwrap();
    assert!(entry.is_dir);

    let names: Vec<String> = ns
        .list(&cx, "/srv", &ListOptions::default())
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["a", "b"]);

    let names: Vec<String> = ns
        .list(&cx, "/", &ListOptions::default())
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["srv"]);
}

// ============================================================================
// Capability and permission checks
// ============================================================================

#[tokio::test]
async fn read_only_bits_block_writes() {
    let store = MemoryFs::new();
    store.insert_file("locked.txt", "keep").await.unwrap();
    store.set_perm("locked.txt", Perm::READ).await.unwrap();
    let ns = Namespace::new();
    ns.mount("/", Arc::new(store)).unwrap();
    let cx = Cx::new();

    let err = ns
        .write(&cx, "/locked.txt", b"nope", WriteMode::Truncate)
        .await
        .unwrap_err();
    assert!(matches!(err, VfsError::NotWritable(_)));
    assert_eq!(ns.open(&cx, "/locked.txt").await.unwrap(), b"keep");
}

#[tokio::test]
async fn missing_capability_is_not_a_permission_error() {
    let ns = Namespace::new();
    ns.mount("/", mem()).unwrap();
    let cx = Cx::new();
    ns.write(&cx, "/f", b"x", WriteMode::Truncate).await.unwrap();

    let err = ns
        .exec(&cx, "/f", nsh_kernel::vfs::ExecRequest::new(vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, VfsError::NotSupported { .. }));
}

#[tokio::test]
async fn cross_backend_rename_is_refused() {
    let ns = Namespace::new();
    ns.mount("/", mem()).unwrap();
    ns.mount("/other", mem()).unwrap();
    let cx = Cx::new();
    ns.write(&cx, "/f", b"x", WriteMode::Truncate).await.unwrap();

    let err = ns.rename(&cx, "/f", "/other/f").await.unwrap_err();
    assert!(matches!(err, VfsError::NotSupported { .. }));
    assert!(ns.exists(&cx, "/f").await);
    assert!(!ns.exists(&cx, "/other/f").await);
}

#[tokio::test]
async fn cancelled_context_stops_dispatch() {
    let ns = Namespace::new();
    ns.mount("/", mem()).unwrap();
    let cx = Cx::new();
    cx.cancel();
    assert!(matches!(ns.stat(&cx, "/").await, Err(VfsError::Cancelled)));
    assert!(matches!(
        ns.write(&cx, "/f", b"x", WriteMode::Truncate).await,
        Err(VfsError::Cancelled)
    ));
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn search_merges_mounts_by_score() {
    let a = MemoryFs::new();
    a.insert_file("alpha.txt", "needle").await.unwrap();
    let b = MemoryFs::new();
    b.insert_file("needle.txt", "needle needle").await.unwrap();
    let ns = Namespace::new();
    ns.mount("/a", Arc::new(a)).unwrap();
    ns.mount("/b", Arc::new(b)).unwrap();
    let cx = Cx::new();

    let results = ns.search(&cx, "needle", &SearchOptions::default()).await;
    assert!(results.failures.is_empty());
    assert_eq!(results.hits.len(), 2);
    assert!(results.hits[0].score >= results.hits[1].score);

    let scoped = ns
        .search(
            &cx,
            "needle",
            &SearchOptions {
                scope: Some("/a".to_string()),
                max_results: None,
            },
        )
        .await;
    assert_eq!(scoped.hits.len(), 1);
    assert!(scoped.hits[0].path.starts_with("/a/"));
}

#[tokio::test]
async fn failed_search_branch_keeps_other_hits() {
    let good = MemoryFs::new();
    good.insert_file("notes.txt", "needle").await.unwrap();
    let ns = Namespace::new();
    ns.mount("/good", Arc::new(good)).unwrap();
    ns.mount("/bad", Arc::new(BrokenIndex)).unwrap();

    let results = ns.search(&Cx::new(), "needle", &SearchOptions::default()).await;
    assert_eq!(results.hits.len(), 1);
    assert_eq!(results.hits[0].path, "/good/notes.txt");
    assert_eq!(results.failures.len(), 1);
    assert_eq!(results.failures[0].mount, "/bad");
    let joined = results.error().unwrap().to_string();
    assert!(joined.contains("/bad: "), "{joined}");
    assert!(joined.contains("index offline"), "{joined}");
}

// ============================================================================
// Touch without a native fast path
// ============================================================================

#[tokio::test]
async fn touch_rewrites_existing_content() {
    let inner = mem();
    inner.insert_file("f", "keep me").await.unwrap();
    let ns = Namespace::new();
    ns.mount("/", Arc::new(PlainFs(inner))).unwrap();
    let cx = Cx::new();
    let mut watch = ns.watch("/", EventMask::ALL);

    ns.touch(&cx, "/f").await.unwrap();
    assert_eq!(ns.open(&cx, "/f").await.unwrap(), b"keep me");
    let seen: Vec<(EventKind, String)> = watch.drain().into_iter().map(|e| (e.kind, e.path)).collect();
    assert_eq!(seen, vec![(EventKind::Write, "/f".to_string())]);
}

#[tokio::test]
async fn touch_creates_missing_file_empty() {
    let ns = Namespace::new();
    ns.mount("/", Arc::new(PlainFs(mem()))).unwrap();
    let cx = Cx::new();
    let mut watch = ns.watch("/", EventMask::ALL);

    ns.touch(&cx, "/g").await.unwrap();
    assert!(ns.open(&cx, "/g").await.unwrap().is_empty());
    let seen: Vec<(EventKind, String)> = watch.drain().into_iter().map(|e| (e.kind, e.path)).collect();
    assert_eq!(
        seen,
        vec![(EventKind::Create, "/g".to_string()), (EventKind::Write, "/g".to_string())]
    );
}

// ============================================================================
// Events
// ============================================================================

#[tokio::test]
async fn write_events_reach_matching_watchers_only() {
    let ns = Namespace::new();
    ns.mount("/", mem()).unwrap();
    let cx = Cx::new();
    ns.mkdir(&cx, "/watched").await.unwrap();
    ns.mkdir(&cx, "/elsewhere").await.unwrap();

    let mut inside = ns.watch("/watched", EventMask::CREATE | EventMask::WRITE);
    let mut outside = ns.watch("/elsewhere", EventMask::ALL);

    ns.write(&cx, "/watched/new.txt", b"x", WriteMode::Truncate)
        .await
        .unwrap();

    let kinds: Vec<EventKind> = inside.drain().into_iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::Create, EventKind::Write]);
    assert!(outside.drain().is_empty());
}

#[tokio::test]
async fn rename_event_carries_both_paths() {
    let ns = Namespace::new();
    ns.mount("/", mem()).unwrap();
    let cx = Cx::new();
    ns.write(&cx, "/old", b"x", WriteMode::Truncate).await.unwrap();
    let mut watch = ns.watch("/", EventMask::RENAME);

    ns.rename(&cx, "/old", "/new").await.unwrap();
    let event = watch.try_recv().unwrap();
    assert_eq!(event.kind, EventKind::Rename);
    assert_eq!(event.path, "/new");
    assert_eq!(event.old_path.as_deref(), Some("/old"));
}

#[tokio::test]
async fn full_mailbox_drops_without_blocking() {
    let ns = Namespace::new();
    ns.mount("/", mem()).unwrap();
    let cx = Cx::new();
    let mut watch = ns.events().watch_with_capacity("/", EventMask::WRITE, 2);

    for i in 0..10 {
        ns.write(&cx, &format!("/f{i}"), b"x", WriteMode::Truncate)
            .await
            .unwrap();
    }
    assert_eq!(watch.drain().len(), 2);
}
