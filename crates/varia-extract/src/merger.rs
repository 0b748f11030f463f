//! Deterministic merge, deduplication and counting of result trees.

use std::collections::{BTreeMap, HashSet};
use varia_core::{Framework, LeafEntry, MajorVersion, ResultNode, ResultTree};

/// Deep-merge `partial` into `accumulator`.
///
/// Containers are created on demand and leaves concatenate their snippets,
/// incoming after existing. When one side has a leaf where the other has a
/// container the existing node is kept.
pub fn merge(accumulator: &mut ResultTree, partial: ResultTree) {
    let mut path = Vec::new();
    merge_level(&mut accumulator.groups, partial.groups, &mut path);
}

fn merge_level(
    into: &mut BTreeMap<String, ResultNode>,
    from: BTreeMap<String, ResultNode>,
    path: &mut Vec<String>,
) {
    for (key, incoming) in from {
        let Some(existing) = into.get_mut(&key) else {
            into.insert(key, incoming);
            continue;
        };

        path.push(key);
        match (existing, incoming) {
            (ResultNode::Container(children), ResultNode::Container(more)) => {
                merge_level(children, more, path);
            }
            (ResultNode::Leaf(entry), ResultNode::Leaf(more)) => {
                entry.snippets.extend(more.snippets);
            }
            (existing, _) => {
                tracing::warn!(
                    path = %path.join("/"),
                    existing = kind(existing),
                    "Shape conflict while merging, keeping existing node"
                );
            }
        }
        path.pop();
    }
}

fn kind(node: &ResultNode) -> &'static str {
    match node {
        ResultNode::Leaf(_) => "leaf",
        ResultNode::Container(_) => "container",
    }
}

/// Drop repeated variants within each leaf, keeping the first.
///
/// A variant is identified by framework, version and dark flag; the theme
/// mode is not part of the key. Applied only to unthemed categories, where
/// the account mode does not change what a page returns.
pub fn deduplicate(tree: &mut ResultTree) {
    fn walk(level: &mut BTreeMap<String, ResultNode>) {
        for node in level.values_mut() {
            match node {
                ResultNode::Leaf(entry) => dedup_leaf(entry),
                ResultNode::Container(children) => walk(children),
            }
        }
    }
    walk(&mut tree.groups);
}

fn dedup_leaf(entry: &mut LeafEntry) {
    let mut seen: HashSet<(Framework, MajorVersion, bool)> = HashSet::new();
    let before = entry.snippets.len();
    entry
        .snippets
        .retain(|s| seen.insert((s.framework, s.version, s.dark_mode)));
    if entry.snippets.len() != before {
        tracing::debug!(
            "Removed {} duplicate snippets from {}",
            before - entry.snippets.len(),
            entry.name
        );
    }
}

/// Number of leaf entries in `tree`.
#[must_use]
pub fn count(tree: &ResultTree) -> usize {
    let mut leaves = 0;
    tree.for_each_leaf(|_| leaves += 1);
    leaves
}

#[cfg(test)]
mod tests {
    use super::*;
    use varia_core::{Snippet, ThemeMode};

    fn path(sub: &str) -> [String; 3] {
        ["ecommerce".into(), "components".into(), sub.into()]
    }

    fn snippet(code: &str, framework: Framework, dark_mode: bool) -> Snippet {
        Snippet {
            code: code.to_string(),
            framework,
            version: MajorVersion::V4,
            mode: None,
            dark_mode,
            downloadable: true,
        }
    }

    fn tree_with(sub: &str, leaf: &str, snippets: Vec<Snippet>) -> ResultTree {
        let mut tree = ResultTree::new();
        for s in snippets {
            tree.insert_snippet(&path(sub), leaf, s);
        }
        tree
    }

    fn codes(tree: &ResultTree, sub: &str, leaf: &str) -> Vec<String> {
        tree.leaf(&path(sub), leaf)
            .map(|e| e.snippets.iter().map(|s| s.code.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_merge_concatenates_leaf_snippets() {
        let mut acc = tree_with("lists", "Grid", vec![snippet("X", Framework::Html, false)]);
        merge(
            &mut acc,
            tree_with("lists", "Grid", vec![snippet("Y", Framework::React, false)]),
        );
        assert_eq!(codes(&acc, "lists", "Grid"), vec!["X", "Y"]);
    }

    #[test]
    fn test_merge_into_empty_copies_tree() {
        let partial = tree_with("lists", "Grid", vec![snippet("X", Framework::Html, false)]);
        let mut acc = ResultTree::new();
        merge(&mut acc, partial.clone());
        assert_eq!(acc, partial);
    }

    #[test]
    fn test_merge_creates_sibling_branches() {
        let mut acc = tree_with("lists", "Grid", vec![snippet("X", Framework::Html, false)]);
        merge(
            &mut acc,
            tree_with("overviews", "Split", vec![snippet("Y", Framework::Vue, false)]),
        );
        assert_eq!(count(&acc), 2);
        assert_eq!(codes(&acc, "overviews", "Split"), vec!["Y"]);
    }

    #[test]
    fn test_merge_order_keeps_same_snippet_multiset() {
        let a = tree_with("lists", "Grid", vec![snippet("A", Framework::Html, false)]);
        let b = tree_with(
            "lists",
            "Grid",
            vec![
                snippet("B", Framework::React, false),
                snippet("C", Framework::Vue, true),
            ],
        );
        let mut c = tree_with("lists", "Grid", vec![snippet("D", Framework::Html, true)]);
        c.insert_snippet(&path("overviews"), "Split", snippet("E", Framework::Vue, false));
        let partials = [a, b, c];

        let orders = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        let merged: Vec<ResultTree> = orders
            .iter()
            .map(|order| {
                let mut acc = ResultTree::new();
                for &i in order {
                    merge(&mut acc, partials[i].clone());
                }
                acc
            })
            .collect();

        let sorted = |tree: &ResultTree, sub: &str, leaf: &str| {
            let mut found = codes(tree, sub, leaf);
            found.sort();
            found
        };
        for tree in &merged {
            assert_eq!(sorted(tree, "lists", "Grid"), vec!["A", "B", "C", "D"]);
            assert_eq!(sorted(tree, "overviews", "Split"), vec!["E"]);
            assert_eq!(count(tree), 2);
            assert_eq!(tree.snippet_count(), 5);
        }
    }

    #[test]
    fn test_merge_shape_conflict_keeps_existing() {
        let mut acc = tree_with("lists", "Grid", vec![snippet("X", Framework::Html, false)]);

        // A partial with a leaf where the accumulator has a container.
        let mut partial = ResultTree::new();
        partial.groups.insert(
            "ecommerce".to_string(),
            ResultNode::Leaf(LeafEntry::new("ecommerce")),
        );
        merge(&mut acc, partial);

        assert_eq!(codes(&acc, "lists", "Grid"), vec!["X"]);
    }

    #[test]
    fn test_deduplicate_keeps_first_variant() {
        let mut tree = tree_with(
            "lists",
            "Grid",
            vec![
                snippet("first", Framework::React, false),
                snippet("dark", Framework::React, true),
                snippet("again", Framework::React, false),
                snippet("html", Framework::Html, false),
            ],
        );
        deduplicate(&mut tree);
        assert_eq!(codes(&tree, "lists", "Grid"), vec!["first", "dark", "html"]);
    }

    #[test]
    fn test_deduplicate_ignores_mode() {
        let mut light = snippet("light", Framework::Vue, false);
        light.mode = Some(ThemeMode::Light);
        let mut system = snippet("system", Framework::Vue, false);
        system.mode = Some(ThemeMode::System);

        let mut tree = tree_with("lists", "Grid", vec![light, system]);
        deduplicate(&mut tree);
        assert_eq!(codes(&tree, "lists", "Grid"), vec!["light"]);
    }

    #[test]
    fn test_deduplicate_is_idempotent() {
        let mut tree = tree_with(
            "lists",
            "Grid",
            vec![
                snippet("a", Framework::React, false),
                snippet("b", Framework::React, false),
                snippet("c", Framework::Html, true),
            ],
        );
        deduplicate(&mut tree);
        let once = tree.clone();
        deduplicate(&mut tree);
        assert_eq!(tree, once);
    }

    #[test]
    fn test_count_leaves() {
        let mut tree = tree_with("lists", "Grid", vec![snippet("a", Framework::Html, false)]);
        tree.insert_snippet(&path("lists"), "Table", snippet("b", Framework::Html, false));
        tree.insert_snippet(&path("lists"), "Table", snippet("c", Framework::Vue, false));
        assert_eq!(count(&tree), 2);
        assert_eq!(count(&ResultTree::new()), 0);
    }
}
