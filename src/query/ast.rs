//! Statement AST contract
//!
//! The external lexer/grammar produces this tree; the planner consumes it.
//! The token vocabulary below is a fixed contract between the two sides:
//! every statement keyword, clause marker, and comparator the grammar can
//! emit has exactly one kind here.

use serde::{Deserialize, Serialize};

/// Token kinds the grammar may attach to an AST node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    // Statement roots
    Insert,
    Query,
    Select,
    From,
    Where,
    Update,
    Delete,
    Set,
    Add,
    Link,
    Unlink,
    Create,
    Drop,
    Grant,
    Revoke,
    Load,

    // Entity and clause markers
    Timeseries,
    User,
    Role,
    Property,
    Index,
    Label,
    UpdatePassword,
    Path,
    Root,
    Time,
    DateTime,
    With,
    Cluster,

    // Boolean connectives
    Not,
    And,
    Or,

    // Comparators
    LessThan,           // <
    LessThanOrEqual,    // <=
    Equal,              // =
    NotEqual,           // <>
    GreaterThan,        // >
    GreaterThanOrEqual, // >=

    // Bare leaf text: identifiers, numbers, quoted strings
    Literal,
}

/// A single token: its kind plus the matched source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

/// One node of the statement tree: an optional token and ordered children.
///
/// The grammar may emit a bare list node with no token of its own (e.g. the
/// synthetic root wrapping a statement); the planner reports that as a
/// structural error when it needs a kind to dispatch on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstNode {
    pub token: Option<Token>,
    pub children: Vec<AstNode>,
}

impl AstNode {
    /// A leaf node carrying a token with text
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            token: Some(Token {
                kind,
                text: text.into(),
            }),
            children: Vec::new(),
        }
    }

    /// A keyword node: token with no meaningful text
    pub fn keyword(kind: TokenKind) -> Self {
        Self::new(kind, "")
    }

    /// A bare `Literal` leaf
    pub fn literal(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Literal, text)
    }

    /// A node with no token of its own, only children
    pub fn nil(children: Vec<AstNode>) -> Self {
        Self {
            token: None,
            children,
        }
    }

    pub fn with_children(mut self, children: Vec<AstNode>) -> Self {
        self.children = children;
        self
    }

    pub fn kind(&self) -> Option<TokenKind> {
        self.token.as_ref().map(|t| t.kind)
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind() == Some(kind)
    }

    /// Token text, or the empty string for token-less nodes
    pub fn text(&self) -> &str {
        self.token.as_ref().map(|t| t.text.as_str()).unwrap_or("")
    }

    pub fn child(&self, idx: usize) -> Option<&AstNode> {
        self.children.get(idx)
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_accessors() {
        let node = AstNode::literal("s1");
        assert_eq!(node.kind(), Some(TokenKind::Literal));
        assert_eq!(node.text(), "s1");
        assert_eq!(node.child_count(), 0);
        assert!(node.child(0).is_none());
    }

    #[test]
    fn test_nil_node_has_no_kind() {
        let node = AstNode::nil(vec![AstNode::keyword(TokenKind::Select)]);
        assert_eq!(node.kind(), None);
        assert_eq!(node.text(), "");
        assert_eq!(node.child_count(), 1);
    }

    #[test]
    fn test_children_preserve_order() {
        let node = AstNode::keyword(TokenKind::Path).with_children(vec![
            AstNode::literal("root"),
            AstNode::literal("group1"),
            AstNode::literal("device1"),
        ]);
        let texts: Vec<&str> = node.children.iter().map(|c| c.text()).collect();
        assert_eq!(texts, vec!["root", "group1", "device1"]);
    }
}
