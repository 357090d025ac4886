//! Series path value type
//!
//! A `Path` is the hierarchical dotted name of one time series, e.g.
//! `root.group1.device1.s1`. Paths are immutable once built and compare
//! structurally. No schema lookup happens here; any sequence of non-empty
//! segments is accepted.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ast::{AstNode, TokenKind};
use super::error::{PlanError, PlanResult};

/// Name of the reserved root marker that anchors absolute paths
pub const ROOT: &str = "root";

/// Name of the reserved pseudo-column holding a data point's timestamp
pub const RESERVED_TIME: &str = "time";

/// An ordered, non-empty sequence of name segments identifying a series
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    pub fn new(segments: Vec<String>) -> Self {
        debug_assert!(!segments.is_empty(), "a path must have at least one segment");
        Self { segments }
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(segments.into_iter().map(Into::into).collect())
    }

    /// Flatten a path expression node into a `Path`.
    ///
    /// If the node's single child is the root wildcard marker, the result is
    /// `root` followed by that marker's children's texts. Otherwise the
    /// result is the literal text of each child, in order, with no root
    /// prefix. A node yielding no segments, or a segment with empty text,
    /// is a structural error.
    pub fn from_ast(node: &AstNode) -> PlanResult<Self> {
        let segments: Vec<String> =
            if node.child_count() == 1 && node.children[0].is(TokenKind::Root) {
                let root_node = &node.children[0];
                let mut segments = Vec::with_capacity(root_node.child_count() + 1);
                segments.push(ROOT.to_string());
                for child in &root_node.children {
                    segments.push(child.text().to_string());
                }
                segments
            } else {
                node.children.iter().map(|c| c.text().to_string()).collect()
            };
        if segments.is_empty() {
            return Err(PlanError::structure("path expression has no segments"));
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(PlanError::structure(format!(
                "path expression has an empty segment: {}",
                segments.join(".")
            )));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The dotted full name, e.g. `root.group1.device1.s1`
    pub fn full_path(&self) -> String {
        self.segments.join(".")
    }

    /// Whether this path is the reserved `time` pseudo-column
    pub fn is_reserved_time(&self) -> bool {
        self.segments.len() == 1 && self.segments[0] == RESERVED_TIME
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::AstNode;

    #[test]
    fn test_plain_path_round_trip() {
        let node = AstNode::keyword(TokenKind::Path).with_children(vec![
            AstNode::literal("group1"),
            AstNode::literal("device1"),
            AstNode::literal("s1"),
        ]);
        let path = Path::from_ast(&node).unwrap();
        assert_eq!(path.segments(), &["group1", "device1", "s1"]);
        assert_eq!(path.full_path(), "group1.device1.s1");
    }

    #[test]
    fn test_root_wildcard_prepends_root() {
        let node = AstNode::keyword(TokenKind::Path).with_children(vec![AstNode::keyword(
            TokenKind::Root,
        )
        .with_children(vec![
            AstNode::literal("group1"),
            AstNode::literal("device1"),
            AstNode::literal("s1"),
        ])]);
        let path = Path::from_ast(&node).unwrap();
        assert_eq!(path.full_path(), "root.group1.device1.s1");
    }

    #[test]
    fn test_childless_node_rejected() {
        let node = AstNode::keyword(TokenKind::Path);
        assert!(matches!(
            Path::from_ast(&node),
            Err(PlanError::Structure(_))
        ));
    }

    #[test]
    fn test_empty_segment_rejected() {
        let node = AstNode::keyword(TokenKind::Path)
            .with_children(vec![AstNode::literal("root"), AstNode::literal("")]);
        assert!(matches!(
            Path::from_ast(&node),
            Err(PlanError::Structure(_))
        ));
    }

    #[test]
    fn test_structural_equality_and_hash() {
        use std::collections::HashSet;
        let a = Path::from_segments(["root", "g", "s1"]);
        let b = Path::from_segments(["root", "g", "s1"]);
        assert_eq!(a, b);
        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_reserved_time_detection() {
        assert!(Path::from_segments(["time"]).is_reserved_time());
        assert!(!Path::from_segments(["root", "time"]).is_reserved_time());
        assert!(!Path::from_segments(["root", "g", "s1"]).is_reserved_time());
    }
}
