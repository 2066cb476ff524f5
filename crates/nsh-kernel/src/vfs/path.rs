//! Namespace path helpers.
//!
//! Namespace paths are POSIX-style strings, always absolute and normalized:
//! backslashes become `/`, `.` and `..` are resolved, trailing slashes are
//! stripped, and the empty path maps to `/`.

/// Normalize a path into canonical absolute form.
///
/// `..` never climbs above the root.
pub fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
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
    if parts.is_empty() {
        return "/".to_string();
    }
    let mut out = String::with_capacity(path.len() + 1);
    for part in parts {
        out.push('/');
        out.push_str(part);
    }
    out
}

/// Join `rel` onto `base`. Absolute `rel` replaces `base` entirely.
pub fn join(base: &str, rel: &str) -> String {
    if rel.starts_with('/') || rel.starts_with('\\') {
        normalize(rel)
    } else {
        normalize(&format!("{}/{}", base, rel))
    }
}

/// Parent of a normalized path. The root is its own parent.
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

/// Final segment of a normalized path; `/` for the root.
pub fn base_name(path: &str) -> &str {
    if path == "/" {
        return "/";
    }
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// True if `path` equals `prefix` or lies beneath it.
///
/// Matching is segment-aware: `/database` does not have prefix `/data`.
pub fn has_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// True if `path` lies strictly beneath `ancestor`.
pub fn is_strict_descendant(path: &str, ancestor: &str) -> bool {
    path != ancestor && has_prefix(path, ancestor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalizes_common_forms() {
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("."), "/");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("/a/b/"), "/a/b");
        assert_eq!(normalize("a/./b"), "/a/b");
        assert_eq!(normalize("/a/b/../c"), "/a/c");
        assert_eq!(normalize("/../.."), "/");
        assert_eq!(normalize("\\data\\x.txt"), "/data/x.txt");
        assert_eq!(normalize("//a//b"), "/a/b");
    }

    #[test]
    fn join_relative_and_absolute() {
        assert_eq!(join("/home/x", "notes.txt"), "/home/x/notes.txt");
        assert_eq!(join("/home/x", "../y"), "/home/y");
        assert_eq!(join("/home/x", "/etc"), "/etc");
        assert_eq!(join("/", "."), "/");
    }

    #[test]
    fn parent_and_base() {
        assert_eq!(parent("/a/b"), "/a");
        assert_eq!(parent("/a"), "/");
        assert_eq!(parent("/"), "/");
        assert_eq!(base_name("/a/b.txt"), "b.txt");
        assert_eq!(base_name("/"), "/");
    }

    #[test]
    fn prefix_is_segment_aware() {
        assert!(has_prefix("/data/x", "/data"));
        assert!(has_prefix("/data", "/data"));
        assert!(!has_prefix("/database", "/data"));
        assert!(has_prefix("/anything", "/"));
        assert!(is_strict_descendant("/a/b", "/a"));
        assert!(!is_strict_descendant("/a", "/a"));
        assert!(is_strict_descendant("/a", "/"));
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in "[a-z./\\\\]{0,24}") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once.clone());
            prop_assert!(once.starts_with('/'));
            prop_assert!(once == "/" || !once.ends_with('/'));
        }

        #[test]
        fn joined_paths_stay_under_root(base in "(/[a-z]{1,4}){0,3}", rel in "[a-z.]{0,4}(/[a-z.]{1,4}){0,3}") {
            let joined = join(&normalize(&base), &rel);
            prop_assert!(joined.starts_with('/'));
            prop_assert!(!joined.contains("/./"));
            prop_assert!(!joined.split('/').any(|s| s == ".."));
        }
    }
}
