//! Output types: the mind-map tree returned to callers.

use serde::{Deserialize, Serialize};

/// A node in the mind-map tree.
///
/// The root branch is the document's overarching topic; its children are the
/// major sections, and so on down. Every branch produced by
/// [`crate::pipeline::validate::parse_mind_map`] carries a non-empty `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Unique identifier, unique within the tree.
    pub id: String,
    /// Short topic title.
    pub topic: String,
    /// One or two sentence summary of the topic.
    pub summary: String,
    /// Sub-topics in document order. Empty for a leaf.
    #[serde(default)]
    pub children: Vec<Branch>,
}

impl Branch {
    /// Create a branch with no children.
    pub fn leaf(
        id: impl Into<String>,
        topic: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
            summary: summary.into(),
            children: Vec::new(),
        }
    }

    /// Append a child and return `self`, for building trees in tests and examples.
    pub fn with_child(mut self, child: Branch) -> Self {
        self.children.push(child);
        self
    }

    /// True when this branch has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Total number of branches in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Branch::node_count).sum::<usize>()
    }

    /// Number of levels in this subtree. A leaf has depth 1.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(Branch::depth).max().unwrap_or(0)
    }

    /// Pre-order traversal over every branch in this subtree.
    pub fn iter(&self) -> BranchIter<'_> {
        BranchIter { stack: vec![self] }
    }
}

/// Pre-order iterator returned by [`Branch::iter`].
pub struct BranchIter<'a> {
    stack: Vec<&'a Branch>,
}

impl<'a> Iterator for BranchIter<'a> {
    type Item = &'a Branch;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Branch {
        Branch::leaf("r", "Root", "The document.")
            .with_child(
                Branch::leaf("a", "A", "First section.")
                    .with_child(Branch::leaf("a1", "A1", "Detail.")),
            )
            .with_child(Branch::leaf("b", "B", "Second section."))
    }

    #[test]
    fn counts_and_depth() {
        let tree = sample();
        assert_eq!(tree.node_count(), 4);
        assert_eq!(tree.depth(), 3);
        assert!(!tree.is_leaf());
        assert!(tree.children[1].is_leaf());
    }

    #[test]
    fn iter_is_pre_order() {
        let tree = sample();
        let ids: Vec<&str> = tree.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["r", "a", "a1", "b"]);
    }

    #[test]
    fn serialises_with_empty_children() {
        let json = serde_json::to_value(Branch::leaf("x", "T", "S")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "x", "topic": "T", "summary": "S", "children": []})
        );
    }
}
