use std::path::Path;

/// Normalize a path the way the rest of the system expects to compare it:
/// forward slashes, lower-cased Windows drive letter, no trailing slash
/// except at the filesystem root. Grounded on `path_utils.normalize_path`.
pub fn normalize_path(path: impl AsRef<Path>) -> String {
    let raw = path.as_ref().to_string_lossy().replace('\\', "/");
    let mut s = raw.as_str();

    // Lower-case a Windows drive letter prefix ("C:/..." -> "c:/...").
    let mut owned;
    if s.len() >= 2 && s.as_bytes()[1] == b':' && s.as_bytes()[0].is_ascii_alphabetic() {
        owned = String::with_capacity(s.len());
        owned.push(s.as_bytes()[0].to_ascii_lowercase() as char);
        owned.push_str(&s[1..]);
        s = &owned;
    } else {
        owned = s.to_string();
        s = &owned;
    }

    // Collapse duplicate slashes.
    let mut collapsed = String::with_capacity(s.len());
    let mut prev_slash = false;
    for c in s.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        collapsed.push(c);
    }

    // Strip a trailing slash unless the whole path IS the root.
    if collapsed.len() > 1 && collapsed.ends_with('/') {
        collapsed.pop();
    }

    collapsed
}

/// True if `child` is `parent` itself or nested somewhere underneath it,
/// comparing on normalized forms.
pub fn is_subpath(parent: &str, child: &str) -> bool {
    let parent = normalize_path(parent);
    let child = normalize_path(child);
    if parent == child {
        return true;
    }
    let prefix = if parent.ends_with('/') {
        parent
    } else {
        format!("{}/", parent)
    };
    child.starts_with(&prefix)
}

/// Join a parent path and a relative component, normalizing the result.
pub fn join_paths(parent: &str, child: &str) -> String {
    if child.is_empty() {
        return normalize_path(parent);
    }
    let mut combined = normalize_path(parent);
    combined.push('/');
    combined.push_str(child);
    normalize_path(combined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_backslashes_and_drive() {
        assert_eq!(normalize_path("C:\\repo\\src\\lib.rs"), "c:/repo/src/lib.rs");
    }

    #[test]
    fn strips_trailing_slash() {
        assert_eq!(normalize_path("/repo/src/"), "/repo/src");
    }

    #[test]
    fn keeps_root_slash() {
        assert_eq!(normalize_path("/"), "/");
    }

    #[test]
    fn collapses_double_slashes() {
        assert_eq!(normalize_path("/repo//src///lib.rs"), "/repo/src/lib.rs");
    }

    #[test]
    fn subpath_detection() {
        assert!(is_subpath("/repo/src", "/repo/src/lib.rs"));
        assert!(is_subpath("/repo/src", "/repo/src"));
        assert!(!is_subpath("/repo/src", "/repo/srcfoo"));
        assert!(!is_subpath("/repo/src", "/repo/other"));
    }

    #[test]
    fn join_normalizes() {
        assert_eq!(join_paths("/repo/src/", "lib.rs"), "/repo/src/lib.rs");
    }
}
