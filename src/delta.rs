// ============================================================================
// Association Delta
// ============================================================================
//
// Pending links and unlinks are never logged as they happen; they are
// recomputed on demand as plain differences between the working set and
// the baseline captured at load time.
//
// ============================================================================

use serde::{Deserialize, Serialize};

/// Elements of `left` that are not equal to any element of `right`.
///
/// Order follows `left`, and duplicates in `left` survive as long as the
/// value is absent from `right`.
pub fn difference<R: PartialEq + Clone>(left: &[R], right: &[R]) -> Vec<R> {
    left.iter()
        .filter(|item| !right.contains(*item))
        .cloned()
        .collect()
}

/// Links and unlinks needed to bring storage in line with a working set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationDelta<R> {
    /// Records present now but absent from the baseline
    pub links: Vec<R>,
    /// Records in the baseline that are no longer present
    pub unlinks: Vec<R>,
}

impl<R: PartialEq + Clone> AssociationDelta<R> {
    pub fn between(working: &[R], baseline: &[R]) -> Self {
        Self {
            links: difference(working, baseline),
            unlinks: difference(baseline, working),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty() && self.unlinks.is_empty()
    }

    /// Total number of storage operations the delta implies
    pub fn len(&self) -> usize {
        self.links.len() + self.unlinks.len()
    }
}

impl<R> Default for AssociationDelta<R> {
    fn default() -> Self {
        Self {
            links: Vec::new(),
            unlinks: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difference_keeps_left_order() {
        assert_eq!(difference(&[3, 1, 4, 5], &[1, 5]), vec![3, 4]);
    }

    #[test]
    fn test_difference_keeps_duplicates_absent_from_right() {
        assert_eq!(difference(&[7, 7, 2], &[2]), vec![7, 7]);
        assert_eq!(difference(&[2, 2, 7], &[2]), vec![7]);
    }

    #[test]
    fn test_delta_between() {
        let delta = AssociationDelta::between(&["b", "c"], &["a", "b"]);
        assert_eq!(delta.links, vec!["c"]);
        assert_eq!(delta.unlinks, vec!["a"]);
        assert_eq!(delta.len(), 2);
        assert!(!delta.is_empty());
    }

    #[test]
    fn test_delta_serializes_to_json() {
        let delta = AssociationDelta::between(&[1, 2], &[2, 3]);
        let json = serde_json::to_value(&delta).unwrap();
        assert_eq!(json, serde_json::json!({"links": [1], "unlinks": [3]}));
    }
}
