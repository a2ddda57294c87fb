/// Splits a repository path into its non-empty segments.
///
/// Backslashes are treated as separators, `.` segments are dropped and `..`
/// pops the previous segment, so `"./src//a.ts"` and `"/src/a.ts"` agree.
pub fn path_segments(path: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            x => parts.push(x),
        }
    }
    parts
}

/// `/`-rooted form of a segment prefix, e.g. `["src", "a.ts"]` -> `"/src/a.ts"`.
pub fn join_segments(segments: &[&str]) -> String {
    let mut out = String::with_capacity(segments.iter().map(|s| s.len() + 1).sum::<usize>().max(1));
    for segment in segments {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_skip_empty_and_dot_parts() {
        assert_eq!(path_segments("./src//a.ts"), vec!["src", "a.ts"]);
        assert_eq!(path_segments("src\\win\\b.rs"), vec!["src", "win", "b.rs"]);
        assert_eq!(path_segments("a/../b"), vec!["b"]);
        assert!(path_segments("//./").is_empty());
    }

    #[test]
    fn joined_paths_are_slash_rooted() {
        assert_eq!(join_segments(&path_segments("src/a.ts")), "/src/a.ts");
        assert_eq!(join_segments(&path_segments("/docs/")), "/docs");
        assert_eq!(join_segments(&[]), "/");
    }
}
