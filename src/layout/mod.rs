//! Anchor layout engine
//!
//! Elements declare their edges, sizes and centers as expressions over the
//! geometry of their container and their siblings. A [`LayoutTree`] resolves
//! those declarations whenever an input changes and pushes the resulting
//! physical values to a [`Host`].

pub mod condition;
pub mod config;
pub mod constraints;
pub mod dock;
pub mod error;
pub mod expr;
pub mod graph;
pub mod host;
pub mod resolve;
pub mod scheduler;
pub mod tree;
pub mod types;

pub use condition::{ConditionScope, ConditionStack, GroupId};
pub use config::LayoutConfig;
pub use constraints::ElementConstraints;
pub use dock::Dock;
pub use error::LayoutError;
pub use expr::{format_number, AggregateKind, Anchor, BinaryOp, Comparison, Expr, Guard, Predicate};
pub use host::{Host, HostCall, RecordingHost};
pub use tree::LayoutTree;
pub use types::*;

/// Names within a small edit distance of `target`, closest first
pub(crate) fn find_similar<'a>(
    names: impl IntoIterator<Item = &'a str>,
    target: &str,
    max_distance: usize,
) -> Vec<String> {
    let mut candidates: Vec<(&str, usize)> = names
        .into_iter()
        .filter_map(|name| {
            let distance = levenshtein_distance(name, target);
            (distance > 0 && distance <= max_distance).then_some((name, distance))
        })
        .collect();

    candidates.sort_by_key(|(_, distance)| *distance);
    candidates
        .into_iter()
        .take(3)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Edit distance between two names
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();

    for (i, a_char) in a.chars().enumerate() {
        let mut current = vec![i + 1; b_chars.len() + 1];
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != *b_char);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        previous = current;
    }

    previous[b_chars.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_same() {
        assert_eq!(levenshtein_distance("menu", "menu"), 0);
    }

    #[test]
    fn test_levenshtein_one_off() {
        assert_eq!(levenshtein_distance("content", "contnt"), 1);
        assert_eq!(levenshtein_distance("app_bar", "app_baz"), 1);
    }

    #[test]
    fn test_levenshtein_different() {
        assert_eq!(levenshtein_distance("top", "left"), 4);
        assert_eq!(levenshtein_distance("", "abc"), 3);
    }

    #[test]
    fn test_find_similar() {
        let names = ["menu", "content", "app_bar"];
        let suggestions = find_similar(names, "mneu", 2);
        assert_eq!(suggestions, vec!["menu".to_string()]);
        assert!(find_similar(names, "sidebar", 2).is_empty());
    }
}
