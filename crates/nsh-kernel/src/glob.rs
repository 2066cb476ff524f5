//! Pathname expansion against live namespace listings.
//!
//! Supports `*`, `?` and `[...]` (with `!` or `^` negation) in any path
//! segment. Segments are matched one directory at a time through the
//! façade, so mounts and virtual directories glob like anything else.

use regex::Regex;

use crate::cx::Cx;
use crate::vfs::{path, ListOptions, Namespace, VfsError, VfsResult};

/// True if `s` contains an unescaped glob metacharacter.
pub fn has_glob_chars(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Compile one path segment into an anchored regex.
pub fn segment_regex(segment: &str) -> Result<Regex, regex::Error> {
    let mut re = String::with_capacity(segment.len() * 2 + 2);
    re.push('^');
    let chars: Vec<char> = segment.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    re.push('[');
                    let mut j = i + 1;
                    if matches!(chars.get(j), Some('!' | '^')) {
                        re.push('^');
                        j += 1;
                    }
                    for &c in &chars[j..end] {
                        if matches!(c, '\\' | '[' | ']' | '^') {
                            re.push('\\');
                        }
                        re.push(c);
                    }
                    re.push(']');
                    i = end;
                }
                None => re.push_str(r"\["),
            },
            c => re.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }
    re.push('$');
    Regex::new(&re)
}

/// Index of the `]` closing the class opened at `start`.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    if matches!(chars.get(j), Some('!' | '^')) {
        j += 1;
    }
    // A leading `]` is part of the class.
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    while j < chars.len() {
        if chars[j] == ']' {
            return Some(j);
        }
        j += 1;
    }
    None
}

/// Expand `pattern` relative to `cwd`.
///
/// Returns matches sorted, spelled the way the pattern was (relative
/// patterns give relative results). A pattern matching nothing comes back
/// unchanged as the only element.
pub async fn expand(ns: &Namespace, cx: &Cx, cwd: &str, pattern: &str) -> VfsResult<Vec<String>> {
    if !has_glob_chars(pattern) {
        return Ok(vec![pattern.to_string()]);
    }
    let absolute = pattern.starts_with('/');
    let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();

    // (spelling, full namespace path)
    let start_shown = if absolute { "/".to_string() } else { String::new() };
    let start_full = if absolute { "/".to_string() } else { path::normalize(cwd) };
    let mut frontier: Vec<(String, String)> = vec![(start_shown, start_full)];

    for (idx, segment) in segments.iter().enumerate() {
        cx.check()?;
        let last = idx + 1 == segments.len();
        let mut next = Vec::new();

        if !has_glob_chars(segment) {
            for (shown, full) in frontier {
                let shown = join_shown(&shown, segment);
                let full = path::join(&full, segment);
                if last && !ns.exists(cx, &full).await {
                    continue;
                }
                next.push((shown, full));
            }
            frontier = next;
            continue;
        }

        // A class the regex engine rejects (`[z-a]`) can match nothing.
        let Ok(regex) = segment_regex(segment) else {
            return Ok(vec![pattern.to_string()]);
        };
        let opts = ListOptions {
            all: segment.starts_with('.'),
            limit: None,
        };
        for (shown, full) in frontier {
            let entries = match ns.list(cx, &full, &opts).await {
                Ok(entries) => entries,
                Err(VfsError::Cancelled) => return Err(VfsError::Cancelled),
                Err(_) => continue,
            };
            for entry in entries {
                if !regex.is_match(&entry.name) || (!last && !entry.is_dir) {
                    continue;
                }
                next.push((join_shown(&shown, &entry.name), path::join(&full, &entry.name)));
            }
        }
        frontier = next;
    }

    if frontier.is_empty() {
        return Ok(vec![pattern.to_string()]);
    }
    let mut matches: Vec<String> = frontier.into_iter().map(|(shown, _)| shown).collect();
    matches.sort();
    matches.dedup();
    Ok(matches)
}

fn join_shown(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else if prefix.ends_with('/') {
        format!("{prefix}{name}")
    } else {
        format!("{prefix}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::MemoryFs;
    use rstest::rstest;
    use std::sync::Arc;

    #[rstest]
    #[case("*.txt", "a.txt", true)]
    #[case("*.txt", "a.log", false)]
    #[case("?.txt", "ab.txt", false)]
    #[case("[ab].rs", "b.rs", true)]
    #[case("[!ab].rs", "b.rs", false)]
    #[case("[a-c]*", "cat", true)]
    #[case("a+b(c)", "a+b(c)", true)]
    #[case("x[", "x[", true)]
    #[case("[]]", "]", true)]
    fn segment_matching(#[case] pattern: &str, #[case] name: &str, #[case] expected: bool) {
        assert_eq!(segment_regex(pattern).unwrap().is_match(name), expected);
    }

    async fn fixture() -> Namespace {
        let mem = MemoryFs::new();
        for file in ["d/a.txt", "d/b.txt", "d/c.log", "d/.hidden.txt", "d/sub/x.txt", "e/x.txt"] {
            mem.insert_file(file, b"".to_vec()).await.unwrap();
        }
        let ns = Namespace::new();
        ns.mount("/", Arc::new(mem)).unwrap();
        ns
    }

    #[tokio::test]
    async fn expands_relative_to_cwd() {
        let ns = fixture().await;
        let got = expand(&ns, &Cx::new(), "/d", "*.txt").await.unwrap();
        assert_eq!(got, vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn keeps_directory_prefix() {
        let ns = fixture().await;
        let got = expand(&ns, &Cx::new(), "/", "d/*.log").await.unwrap();
        assert_eq!(got, vec!["d/c.log"]);
        let got = expand(&ns, &Cx::new(), "/e", "/d/?.txt").await.unwrap();
        assert_eq!(got, vec!["/d/a.txt", "/d/b.txt"]);
    }

    #[tokio::test]
    async fn multi_segment() {
        let ns = fixture().await;
        let got = expand(&ns, &Cx::new(), "/", "/*/x.txt").await.unwrap();
        assert_eq!(got, vec!["/e/x.txt"]);
        let got = expand(&ns, &Cx::new(), "/", "/d/*/*.txt").await.unwrap();
        assert_eq!(got, vec!["/d/sub/x.txt"]);
    }

    #[tokio::test]
    async fn hidden_needs_leading_dot() {
        let ns = fixture().await;
        let got = expand(&ns, &Cx::new(), "/d", ".*.txt").await.unwrap();
        assert_eq!(got, vec![".hidden.txt"]);
    }

    #[tokio::test]
    async fn no_match_stays_literal() {
        let ns = fixture().await;
        let got = expand(&ns, &Cx::new(), "/d", "*.md").await.unwrap();
        assert_eq!(got, vec!["*.md"]);
        let got = expand(&ns, &Cx::new(), "/", "/missing/*").await.unwrap();
        assert_eq!(got, vec!["/missing/*"]);
    }

    #[tokio::test]
    async fn unusable_class_stays_literal() {
        let ns = fixture().await;
        assert!(segment_regex("[z-a]").is_err());
        let got = expand(&ns, &Cx::new(), "/d", "[z-a]").await.unwrap();
        assert_eq!(got, vec!["[z-a]"]);
        let got = expand(&ns, &Cx::new(), "/", "/d/[z-a]*.txt").await.unwrap();
        assert_eq!(got, vec!["/d/[z-a]*.txt"]);
    }

    #[tokio::test]
    async fn sees_mount_points() {
        let ns = fixture().await;
        ns.mount("/mnt/data", Arc::new(MemoryFs::new())).unwrap();
        let got = expand(&ns, &Cx::new(), "/", "/mnt/*").await.unwrap();
        assert_eq!(got, vec!["/mnt/data"]);
    }
}
