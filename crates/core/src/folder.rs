//! Folder path normalization (spec §3 "Folder").

/// Normalizes a folder path: backslashes become `/`, repeated separators
/// collapse, and leading/trailing separators are stripped. The empty string
/// denotes the root and normalizes to itself.
pub fn normalize(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|seg| !seg.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// True if `candidate` equals `prefix` or is a descendant of it. The root
/// (`""`) is an ancestor of every folder, including itself.
pub fn is_descendant_or_equal(candidate: &str, prefix: &str) -> bool {
    let candidate = normalize(candidate);
    let prefix = normalize(prefix);
    if prefix.is_empty() {
        return true;
    }
    candidate == prefix || candidate.starts_with(&format!("{prefix}/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_separators_and_trims() {
        assert_eq!(normalize("a/b"), "a/b");
        assert_eq!(normalize("/a/b/"), "a/b");
        assert_eq!(normalize("a\\b"), "a/b");
        assert_eq!(normalize("a//b"), "a/b");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("///"), "");
    }

    #[test]
    fn root_is_ancestor_of_everything() {
        assert!(is_descendant_or_equal("a/b", ""));
        assert!(is_descendant_or_equal("", ""));
    }

    #[test]
    fn descendant_matching_is_prefix_bounded() {
        assert!(is_descendant_or_equal("a/b", "a"));
        assert!(is_descendant_or_equal("a", "a"));
        assert!(!is_descendant_or_equal("ab", "a"));
        assert!(!is_descendant_or_equal("a", "a/b"));
    }

    #[test]
    fn deeply_nested_paths() {
        assert!(is_descendant_or_equal("a/b/c/d/e", "a/b"));
        assert!(!is_descendant_or_equal("a/bb/c", "a/b"));
    }

    proptest::proptest! {
        /// `normalize` is idempotent: normalizing an already-normal path is a no-op.
        #[test]
        fn normalize_is_idempotent(segments in proptest::collection::vec("[a-zA-Z0-9]{1,6}", 0..6)) {
            let path = segments.join("/");
            let once = normalize(&path);
            let twice = normalize(&once);
            proptest::prop_assert_eq!(once, twice);
        }

        /// Swapping `/` for `\` anywhere never changes the normalized result.
        #[test]
        fn normalize_is_separator_agnostic(segments in proptest::collection::vec("[a-zA-Z0-9]{1,6}", 1..6)) {
            let forward = segments.join("/");
            let backward = segments.join("\\");
            proptest::prop_assert_eq!(normalize(&forward), normalize(&backward));
        }

        /// A path is always its own descendant-or-equal, once normalized.
        #[test]
        fn every_path_is_descendant_of_itself(segments in proptest::collection::vec("[a-zA-Z0-9]{1,6}", 0..6)) {
            let path = segments.join("/");
            proptest::prop_assert!(is_descendant_or_equal(&path, &path));
        }
    }
}
