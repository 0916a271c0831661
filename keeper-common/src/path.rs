//! Slash-delimited node path helpers.
//!
//! Logical paths are what callers pass in; physical paths carry the session
//! namespace as their first segment.

/// Ensure a path starts with exactly one `/`
pub fn normalize(path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    let trimmed = trimmed.trim_end_matches('/');
    format!("/{}", trimmed)
}

/// Join a parent path and a child name
pub fn join(parent: &str, child: &str) -> String {
    let parent = normalize(parent);
    let child = child.trim_matches('/');
    if parent == "/" {
        format!("/{}", child)
    } else {
        format!("{}/{}", parent, child)
    }
}

/// Prefix a logical path with the namespace
pub fn with_namespace(namespace: &str, path: &str) -> String {
    let namespace = namespace.trim_matches('/');
    let path = normalize(path);
    if namespace.is_empty() {
        path
    } else if path == "/" {
        format!("/{}", namespace)
    } else {
        format!("/{}{}", namespace, path)
    }
}

/// Remove the namespace prefix from a physical path
///
/// Returns `None` when the path lies outside the namespace.
pub fn strip_namespace(namespace: &str, full: &str) -> Option<String> {
    let namespace = namespace.trim_matches('/');
    if namespace.is_empty() {
        return Some(normalize(full));
    }

    let prefix = format!("/{}", namespace);
    let rest = full.strip_prefix(&prefix)?;
    if rest.is_empty() {
        Some("/".to_string())
    } else if rest.starts_with('/') {
        Some(rest.to_string())
    } else {
        None
    }
}

/// Parent of a path, `None` for the root
pub fn parent(path: &str) -> Option<String> {
    let path = normalize(path);
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(idx) => Some(path[..idx].to_string()),
        None => None,
    }
}

/// Last segment of a path
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Every ancestor of a path plus the path itself, shallowest first, root excluded
pub fn ancestors(path: &str) -> Vec<String> {
    let path = normalize(path);
    let mut out = Vec::new();
    let mut current = String::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        current.push('/');
        current.push_str(segment);
        out.push(current.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("locks"), "/locks");
        assert_eq!(normalize("/locks/"), "/locks");
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("gateway/route"), "/gateway/route");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/locks", "seq-0000000001"), "/locks/seq-0000000001");
        assert_eq!(join("/", "locks"), "/locks");
        assert_eq!(join("routes", "/r1"), "/routes/r1");
    }

    #[test]
    fn test_namespace_round_trip() {
        let full = with_namespace("com.start.default", "/locks/seq-0000000003");
        assert_eq!(full, "/com.start.default/locks/seq-0000000003");
        assert_eq!(
            strip_namespace("com.start.default", &full).as_deref(),
            Some("/locks/seq-0000000003")
        );
        assert_eq!(with_namespace("ns", "/"), "/ns");
        assert_eq!(strip_namespace("ns", "/ns").as_deref(), Some("/"));
    }

    #[test]
    fn test_strip_namespace_outside() {
        assert_eq!(strip_namespace("ns", "/other/locks"), None);
        assert_eq!(strip_namespace("ns", "/nsx/locks"), None);
        assert_eq!(strip_namespace("", "/locks").as_deref(), Some("/locks"));
    }

    #[test]
    fn test_parent_and_file_name() {
        assert_eq!(parent("/locks/seq-1").as_deref(), Some("/locks"));
        assert_eq!(parent("/locks").as_deref(), Some("/"));
        assert_eq!(parent("/"), None);
        assert_eq!(file_name("/locks/seq-1"), "seq-1");
    }

    #[test]
    fn test_ancestors() {
        assert_eq!(ancestors("/a/b/c"), vec!["/a", "/a/b", "/a/b/c"]);
        assert!(ancestors("/").is_empty());
    }
}
