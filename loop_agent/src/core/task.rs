//! Pure predicates over task documents.

/// Marker the task filter appends to a task whose requirements are all implemented.
pub const OUTDATED_SENTINEL: &str = "[OUTDATED]";

/// Returns true if the task body carries the outdated sentinel.
///
/// This is plain substring containment. A task that quotes `[OUTDATED]` for
/// any other reason is treated as outdated too.
pub fn is_outdated(body: &str) -> bool {
    body.contains(OUTDATED_SENTINEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_sentinel_anywhere_in_body() {
        assert!(is_outdated("# Add parser [OUTDATED]\n\nbody"));
        assert!(is_outdated("body\n[OUTDATED]"));
    }

    #[test]
    fn near_misses_are_not_outdated() {
        assert!(!is_outdated("# Add parser\n\nOUTDATED"));
        assert!(!is_outdated("[outdated]"));
        assert!(!is_outdated("[COMPLETED]"));
    }
}
