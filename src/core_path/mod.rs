//! Virtual path handling for the FTP namespace.
//!
//! The client sees an absolute namespace rooted at the configured directory.
//! Resolution is lexical: `.` and `..` are collapsed without consulting
//! symlinks, so `CWD ..` after entering a symlink returns to the logical
//! parent. The kernel `realpath` is deliberately not used.
//!
//! On the wire a path may contain any byte except CR, LF and NUL; an embedded
//! LF is carried as NUL and translated back on receipt.

use std::io;
use std::path::{Path, PathBuf};

/// Join `args` onto `cwd`, coalescing consecutive slashes.
pub fn build_path(cwd: &str, args: &str) -> String {
    let joined = if args.starts_with('/') {
        args.to_string()
    } else {
        format!("{}/{}", cwd, args)
    };

    let mut path = String::with_capacity(joined.len());
    let mut last_slash = false;
    for c in joined.chars() {
        if c == '/' && last_slash {
            continue;
        }
        last_slash = c == '/';
        path.push(c);
    }

    path
}

/// Everything before the final `/`, or `/` for a top-level path.
pub fn dir_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(pos) => &path[..pos],
    }
}

/// Lexically collapse `.` and `..` components of an absolute path.
pub fn normalize(path: &str) -> String {
    debug_assert!(path.starts_with('/'));

    let mut components: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                components.pop();
            }
            other => components.push(other),
        }
    }

    if components.is_empty() {
        return String::from("/");
    }

    let mut out = String::new();
    for component in components {
        out.push('/');
        out.push_str(component);
    }

    out
}

/// Map a virtual absolute path onto the configured root directory.
pub fn real_path(root: &Path, virtual_path: &str) -> PathBuf {
    root.join(virtual_path.trim_start_matches('/'))
}

/// Resolve a virtual path, verifying that its immediate parent exists and is
/// a directory under `root`. The path is normalized before the parent is
/// located, so literal `..` components can never make the check stat a host
/// directory above the root.
pub async fn resolve_path(root: &Path, path: &str) -> io::Result<String> {
    let resolved = normalize(path);

    let parent = real_path(root, dir_name(&resolved));
    let st = tokio::fs::metadata(&parent).await?;
    if !st.is_dir() {
        return Err(io::Error::new(io::ErrorKind::Other, "Not a directory"));
    }

    Ok(resolved)
}

/// `build_path` followed by `resolve_path`.
pub async fn build_resolved_path(root: &Path, cwd: &str, args: &str) -> io::Result<String> {
    resolve_path(root, &build_path(cwd, args)).await
}

/// Encode a path for reply text: embedded LF becomes NUL, and with `quotes`
/// every `"` is doubled (needed inside the 257 reply).
pub fn encode_path(path: &str, quotes: bool) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            '\n' => out.push('\0'),
            '"' if quotes => {
                out.push('"');
                out.push('"');
            }
            other => out.push(other),
        }
    }

    out
}

/// Decode inbound command bytes in place: NUL carries an embedded LF.
pub fn decode_path(line: &mut [u8]) {
    for byte in line.iter_mut() {
        if *byte == 0 {
            *byte = b'\n';
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_path_relative_and_absolute() {
        assert_eq!(build_path("/music", "album"), "/music/album");
        assert_eq!(build_path("/music", "/other"), "/other");
        assert_eq!(build_path("/", "a"), "/a");
        assert_eq!(build_path("/a//b", "c//d"), "/a/b/c/d");
    }

    #[test]
    fn test_normalize_collapses_dots() {
        assert_eq!(normalize("/a/b/../c"), "/a/c");
        assert_eq!(normalize("/a/./b"), "/a/b");
        assert_eq!(normalize("/../.."), "/");
        assert_eq!(normalize("/a/b/.."), "/a");
        assert_eq!(normalize("/"), "/");
    }

    #[test]
    fn test_normalize_never_leaves_dots_or_doubled_slashes() {
        for path in ["/x/../../y", "/./a/.././b/c/..", "//a///b/./c"] {
            let resolved = normalize(path);
            assert!(resolved.starts_with('/'));
            assert!(!resolved.contains("//"), "{resolved}");
            assert!(!resolved.split('/').any(|c| c == "." || c == ".."));
        }
    }

    #[test]
    fn test_dir_name() {
        assert_eq!(dir_name("/a/b"), "/a");
        assert_eq!(dir_name("/a"), "/");
        assert_eq!(dir_name("/"), "/");
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let original = "line\nfeed";
        let encoded = encode_path(original, false);
        assert_eq!(encoded, "line\0feed");

        let mut bytes = encoded.into_bytes();
        decode_path(&mut bytes);
        assert_eq!(String::from_utf8(bytes).unwrap(), original);
    }

    #[test]
    fn test_encode_doubles_quotes() {
        assert_eq!(encode_path("a\"b", true), "a\"\"b");
        assert_eq!(encode_path("a\"b", false), "a\"b");
    }

    fn scratch_root(tag: &str) -> std::path::PathBuf {
        let root = std::env::temp_dir().join(format!("pocketftpd-path-{}-{}", tag, std::process::id()));
        std::fs::create_dir_all(&root).unwrap();
        root
    }

    #[tokio::test]
    async fn test_resolve_path_requires_directory_parent() {
        let root = scratch_root("parent");
        assert_eq!(resolve_path(&root, "/").await.unwrap(), "/");
        assert!(resolve_path(&root, "/no-such-dir/x/y").await.is_err());
    }

    #[tokio::test]
    async fn test_resolve_path_stays_inside_root() {
        let root = scratch_root("clamp");

        // the host has an /etc, the virtual tree does not; a dot-dot escape
        // must consult the virtual parent, not the host one
        assert!(resolve_path(&root, "/../../../../../etc/passwd").await.is_err());
        assert!(
            build_resolved_path(&root, "/", "../../etc/passwd").await.is_err()
        );

        // popping above the root stops at the root itself
        assert_eq!(resolve_path(&root, "/../..").await.unwrap(), "/");
        assert_eq!(
            build_resolved_path(&root, "/", "../x").await.unwrap(),
            "/x"
        );
    }
}
