//! Key-to-path resolution against a session-scoped working directory
//! (§4.2, testable property 3).

/// Resolve `key` against `cwd`. A leading `/` is absolute; `..` drops the
/// last segment (never below `/`); otherwise `key` is appended under `cwd`
/// with exactly one `/` separator.
pub fn resolve(cwd: &str, key: &str) -> String {
    if key == ".." {
        return parent(cwd);
    }
    if let Some(stripped) = key.strip_prefix("/") {
        return normalize(&format!("/{stripped}"));
    }
    if key.starts_with("..") {
        // "../foo" style: pop one segment then resolve the remainder under it.
        let up = parent(cwd);
        let rest = key.trim_start_matches("..").trim_start_matches('/');
        return join(&up, rest);
    }
    join(cwd, key)
}

fn parent(cwd: &str) -> String {
    if cwd == "/" || cwd.is_empty() {
        return "/".to_string();
    }
    let trimmed = cwd.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => trimmed[..idx].to_string(),
        None => "/".to_string(),
    }
}

fn join(cwd: &str, key: &str) -> String {
    if key.is_empty() {
        return normalize(cwd);
    }
    let base = if cwd == "/" { "" } else { cwd.trim_end_matches('/') };
    normalize(&format!("{base}/{key}"))
}

fn normalize(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    let mut segments: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        if seg.is_empty() {
            continue;
        }
        segments.push(seg);
    }
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_key_joins_under_cwd() {
        assert_eq!(resolve("/a/b", "c"), "/a/b/c");
    }

    #[test]
    fn absolute_key_ignores_cwd() {
        assert_eq!(resolve("/a/b", "/x"), "/x");
    }

    #[test]
    fn dotdot_moves_up_one_segment() {
        assert_eq!(resolve("/a/b", ".."), "/a");
    }

    #[test]
    fn dotdot_twice_reaches_root() {
        let once = resolve("/a/b", "..");
        let twice = resolve(&once, "..");
        assert_eq!(twice, "/");
    }

    #[test]
    fn dotdot_at_root_stays_at_root() {
        assert_eq!(resolve("/", ".."), "/");
    }

    #[test]
    fn double_slashes_collapse() {
        assert_eq!(resolve("/a/", "c"), "/a/c");
    }
}
