//! Result tree shared by extractors, workers and the merger.
//!
//! A tree is four levels deep: group → subgroup → sub-subgroup → leaf name.
//! Nodes are an explicit tagged union so merge logic branches on a known
//! shape.

use crate::types::Snippet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named item carrying every captured variant of its code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafEntry {
    /// Display name of the item
    pub name: String,
    /// Captured variants, in capture order
    pub snippets: Vec<Snippet>,
}

impl LeafEntry {
    /// Create an empty leaf.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            snippets: Vec::new(),
        }
    }
}

/// One node of a [`ResultTree`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultNode {
    /// An item with its snippets
    Leaf(LeafEntry),
    /// A named group of child nodes
    Container(BTreeMap<String, ResultNode>),
}

/// Partial (one job) or accumulated (whole run) extraction output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultTree {
    /// Top-level groups keyed by name
    pub groups: BTreeMap<String, ResultNode>,
}

impl ResultTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the tree holds no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Append a snippet to the leaf at `path`/`leaf`, creating nodes on demand.
    ///
    /// A container found where a leaf is expected (or the reverse) is
    /// replaced; extractors only ever build well-formed trees with this.
    pub fn insert_snippet(&mut self, path: &[String; 3], leaf: &str, snippet: Snippet) {
        let mut level = &mut self.groups;
        for segment in path {
            let node = level
                .entry(segment.clone())
                .or_insert_with(|| ResultNode::Container(BTreeMap::new()));
            if matches!(node, ResultNode::Leaf(_)) {
                *node = ResultNode::Container(BTreeMap::new());
            }
            let ResultNode::Container(children) = node else {
                unreachable!("node was just made a container")
            };
            level = children;
        }

        let node = level
            .entry(leaf.to_string())
            .or_insert_with(|| ResultNode::Leaf(LeafEntry::new(leaf)));
        if matches!(node, ResultNode::Container(_)) {
            *node = ResultNode::Leaf(LeafEntry::new(leaf));
        }
        if let ResultNode::Leaf(entry) = node {
            entry.snippets.push(snippet);
        }
    }

    /// Look up the leaf at `path`/`leaf`.
    #[must_use]
    pub fn leaf(&self, path: &[String; 3], leaf: &str) -> Option<&LeafEntry> {
        let mut level = &self.groups;
        for segment in path {
            match level.get(segment)? {
                ResultNode::Container(children) => level = children,
                ResultNode::Leaf(_) => return None,
            }
        }
        match level.get(leaf)? {
            ResultNode::Leaf(entry) => Some(entry),
            ResultNode::Container(_) => None,
        }
    }

    /// Visit every leaf in key order.
    pub fn for_each_leaf(&self, mut f: impl FnMut(&LeafEntry)) {
        fn walk(level: &BTreeMap<String, ResultNode>, f: &mut impl FnMut(&LeafEntry)) {
            for node in level.values() {
                match node {
                    ResultNode::Leaf(entry) => f(entry),
                    ResultNode::Container(children) => walk(children, f),
                }
            }
        }
        walk(&self.groups, &mut f);
    }

    /// Total number of snippets across all leaves.
    #[must_use]
    pub fn snippet_count(&self) -> usize {
        let mut total = 0;
        self.for_each_leaf(|entry| total += entry.snippets.len());
        total
    }
}
