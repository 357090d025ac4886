//! WHERE-clause filter trees
//!
//! A filter is a binary tree of boolean connectives over comparison leaves,
//! built recursively from the WHERE subtree the grammar hands us. Leaf
//! values stay raw strings here; type checking against the series schema is
//! the planner/executor's job. The one exception is the reserved `time`
//! pseudo-column, whose date literals are resolved to epoch millis at build
//! time.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ast::{AstNode, TokenKind};
use super::error::{PlanError, PlanResult};
use super::path::Path;
use super::time;

/// Comparison operator at a filter leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    LessThan,
    LessThanOrEqual,
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl Comparator {
    /// The comparator for a token kind, if that kind is one
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::LessThan => Some(Comparator::LessThan),
            TokenKind::LessThanOrEqual => Some(Comparator::LessThanOrEqual),
            TokenKind::Equal => Some(Comparator::Equal),
            TokenKind::NotEqual => Some(Comparator::NotEqual),
            TokenKind::GreaterThan => Some(Comparator::GreaterThan),
            TokenKind::GreaterThanOrEqual => Some(Comparator::GreaterThanOrEqual),
            _ => None,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Comparator::LessThan => "<",
            Comparator::LessThanOrEqual => "<=",
            Comparator::Equal => "=",
            Comparator::NotEqual => "<>",
            Comparator::GreaterThan => ">",
            Comparator::GreaterThanOrEqual => ">=",
        };
        write!(f, "{}", symbol)
    }
}

/// A node of the boolean filter tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterNode {
    Leaf {
        path: Path,
        comparator: Comparator,
        value: String,
    },
    And(Box<FilterNode>, Box<FilterNode>),
    Or(Box<FilterNode>, Box<FilterNode>),
    Not(Box<FilterNode>),
}

impl FilterNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self, FilterNode::Leaf { .. })
    }
}

/// Recursively build a filter tree from a WHERE subtree.
///
/// Arity mismatches are hard errors; so is any token kind that is neither a
/// connective nor a comparator at this position.
pub fn build_filter(node: &AstNode, tz: &FixedOffset) -> PlanResult<FilterNode> {
    let kind = node
        .kind()
        .ok_or_else(|| PlanError::structure("filter node has no token"))?;
    match kind {
        TokenKind::Not => {
            if node.child_count() != 1 {
                return Err(PlanError::structure(format!(
                    "NOT operator requires one operand, found {}",
                    node.child_count()
                )));
            }
            let child = build_filter(&node.children[0], tz)?;
            Ok(FilterNode::Not(Box::new(child)))
        }
        TokenKind::And | TokenKind::Or => {
            if node.child_count() != 2 {
                return Err(PlanError::structure(format!(
                    "{:?} operator requires two operands, found {}",
                    kind,
                    node.child_count()
                )));
            }
            let left = Box::new(build_filter(&node.children[0], tz)?);
            let right = Box::new(build_filter(&node.children[1], tz)?);
            if kind == TokenKind::And {
                Ok(FilterNode::And(left, right))
            } else {
                Ok(FilterNode::Or(left, right))
            }
        }
        _ => match Comparator::from_token(kind) {
            Some(comparator) => build_leaf(node, comparator, tz),
            None => Err(PlanError::unsupported(kind, "in where clause")),
        },
    }
}

fn build_leaf(node: &AstNode, comparator: Comparator, tz: &FixedOffset) -> PlanResult<FilterNode> {
    if node.child_count() != 2 {
        return Err(PlanError::structure(format!(
            "comparison requires a path and a value, found {} operands",
            node.child_count()
        )));
    }
    let left = &node.children[0];
    if !left.is(TokenKind::Path) {
        return Err(PlanError::structure(format!(
            "left side of a comparison must be a path, actual: {:?}",
            left.kind()
        )));
    }
    let path = Path::from_ast(left)?;
    let right = &node.children[1];
    let value = match right.kind() {
        Some(TokenKind::Path) => Path::from_ast(right)?.full_path(),
        Some(TokenKind::DateTime) => {
            if !path.is_reserved_time() {
                return Err(PlanError::semantic(format!(
                    "a date literal can only be compared against time, not {}",
                    path
                )));
            }
            time::resolve_datetime_node(right, tz)?.to_string()
        }
        _ => right.text().to_string(),
    };
    Ok(FilterNode::Leaf {
        path,
        comparator,
        value,
    })
}

/// Extract the inclusive end time of a DELETE statement's filter.
///
/// The filter must be a single leaf binding the reserved `time` path with
/// `<` or `<=`. An exclusive `<` bound is lowered by one to the inclusive
/// value actually deleted; the adjusted bound must be strictly positive.
pub fn delete_end_time(filter: &FilterNode) -> PlanResult<i64> {
    let (path, comparator, value) = single_time_bound(filter, "delete")?;
    if !path.is_reserved_time() {
        return Err(PlanError::semantic(format!(
            "delete time filter must bind the time column, actual: {}",
            path
        )));
    }
    if !matches!(
        comparator,
        Comparator::LessThan | Comparator::LessThanOrEqual
    ) {
        return Err(PlanError::semantic(format!(
            "delete time filter must use < or <=, actual: {}",
            comparator
        )));
    }
    let mut end_time = parse_bound(value)?;
    if comparator == Comparator::LessThan {
        end_time = end_time.checked_sub(1).ok_or_else(|| {
            PlanError::semantic(format!("delete time {}: time must be > 0", value))
        })?;
    }
    if end_time <= 0 {
        return Err(PlanError::semantic(format!(
            "delete time {}: time must be > 0",
            end_time
        )));
    }
    Ok(end_time)
}

/// Extract the inclusive start time of a CREATE INDEX statement's filter.
///
/// Absence of a filter means the index starts at 0. Otherwise the filter
/// must be a single leaf binding `time` with `>` or `>=`; an exclusive `>`
/// bound is raised by one, and the adjusted bound must be non-negative.
pub fn index_start_time(filter: Option<&FilterNode>) -> PlanResult<i64> {
    let filter = match filter {
        Some(filter) => filter,
        None => return Ok(0),
    };
    let (path, comparator, value) = single_time_bound(filter, "create index")?;
    if !path.is_reserved_time() {
        return Err(PlanError::semantic(format!(
            "index time filter must bind the time column, actual: {}",
            path
        )));
    }
    if !matches!(
        comparator,
        Comparator::GreaterThan | Comparator::GreaterThanOrEqual
    ) {
        return Err(PlanError::semantic(format!(
            "index time filter must use > or >=, actual: {}",
            comparator
        )));
    }
    let mut start_time = parse_bound(value)?;
    if comparator == Comparator::GreaterThan {
        start_time = start_time.checked_add(1).ok_or_else(|| {
            PlanError::semantic(format!("index time bound {} is out of range", value))
        })?;
    }
    if start_time < 0 {
        return Err(PlanError::semantic(format!(
            "index time {}: time must be >= 0",
            start_time
        )));
    }
    Ok(start_time)
}

fn single_time_bound<'a>(
    filter: &'a FilterNode,
    command: &str,
) -> PlanResult<(&'a Path, Comparator, &'a str)> {
    match filter {
        FilterNode::Leaf {
            path,
            comparator,
            value,
        } => Ok((path, *comparator, value.as_str())),
        _ => Err(PlanError::semantic(format!(
            "for {} command, where clause must be a single time bound, not a boolean combination",
            command
        ))),
    }
}

fn parse_bound(value: &str) -> PlanResult<i64> {
    value
        .parse::<i64>()
        .map_err(|e| PlanError::value(value, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::AstNode;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn path_node(segments: &[&str]) -> AstNode {
        AstNode::keyword(TokenKind::Path)
            .with_children(segments.iter().map(|s| AstNode::literal(*s)).collect())
    }

    fn comparison(kind: TokenKind, segments: &[&str], value: &str) -> AstNode {
        AstNode::keyword(kind)
            .with_children(vec![path_node(segments), AstNode::literal(value)])
    }

    fn time_leaf(comparator: Comparator, value: &str) -> FilterNode {
        FilterNode::Leaf {
            path: Path::from_segments(["time"]),
            comparator,
            value: value.to_string(),
        }
    }

    #[test]
    fn test_comparison_builds_leaf() {
        let node = comparison(TokenKind::GreaterThan, &["root", "d1", "s1"], "5");
        let filter = build_filter(&node, &utc()).unwrap();
        assert_eq!(
            filter,
            FilterNode::Leaf {
                path: Path::from_segments(["root", "d1", "s1"]),
                comparator: Comparator::GreaterThan,
                value: "5".to_string(),
            }
        );
    }

    #[test]
    fn test_nested_boolean_tree() {
        let node = AstNode::keyword(TokenKind::And).with_children(vec![
            comparison(TokenKind::LessThan, &["time"], "100"),
            AstNode::keyword(TokenKind::Not)
                .with_children(vec![comparison(TokenKind::Equal, &["root", "s1"], "7")]),
        ]);
        let filter = build_filter(&node, &utc()).unwrap();
        match filter {
            FilterNode::And(left, right) => {
                assert!(left.is_leaf());
                assert!(matches!(*right, FilterNode::Not(_)));
            }
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_and_arity_enforced() {
        let node = AstNode::keyword(TokenKind::And)
            .with_children(vec![comparison(TokenKind::LessThan, &["time"], "100")]);
        assert!(matches!(
            build_filter(&node, &utc()),
            Err(PlanError::Structure(_))
        ));
    }

    #[test]
    fn test_not_arity_enforced() {
        let node = AstNode::keyword(TokenKind::Not).with_children(vec![
            comparison(TokenKind::LessThan, &["time"], "1"),
            comparison(TokenKind::LessThan, &["time"], "2"),
        ]);
        assert!(matches!(
            build_filter(&node, &utc()),
            Err(PlanError::Structure(_))
        ));
    }

    #[test]
    fn test_unsupported_filter_token() {
        let node = AstNode::keyword(TokenKind::Select)
            .with_children(vec![path_node(&["time"]), AstNode::literal("1")]);
        assert!(matches!(
            build_filter(&node, &utc()),
            Err(PlanError::UnsupportedToken { .. })
        ));
    }

    #[test]
    fn test_leaf_requires_path_on_left() {
        let node = AstNode::keyword(TokenKind::LessThan)
            .with_children(vec![AstNode::literal("time"), AstNode::literal("1")]);
        assert!(matches!(
            build_filter(&node, &utc()),
            Err(PlanError::Structure(_))
        ));
    }

    #[test]
    fn test_date_literal_resolved_for_time_path() {
        let node = AstNode::keyword(TokenKind::LessThan).with_children(vec![
            path_node(&["time"]),
            AstNode::keyword(TokenKind::DateTime)
                .with_children(vec![AstNode::literal("2018-01-01 00:00:00")]),
        ]);
        let filter = build_filter(&node, &utc()).unwrap();
        assert_eq!(
            filter,
            time_leaf(Comparator::LessThan, "1514764800000")
        );
    }

    #[test]
    fn test_date_literal_rejected_for_other_paths() {
        let node = AstNode::keyword(TokenKind::LessThan).with_children(vec![
            path_node(&["root", "d1", "s1"]),
            AstNode::keyword(TokenKind::DateTime)
                .with_children(vec![AstNode::literal("2018-01-01 00:00:00")]),
        ]);
        assert!(matches!(
            build_filter(&node, &utc()),
            Err(PlanError::Semantic(_))
        ));
    }

    #[test]
    fn test_path_on_right_uses_full_name() {
        let node = AstNode::keyword(TokenKind::Equal).with_children(vec![
            path_node(&["root", "d1", "s1"]),
            path_node(&["root", "d1", "s2"]),
        ]);
        let filter = build_filter(&node, &utc()).unwrap();
        match filter {
            FilterNode::Leaf { value, .. } => assert_eq!(value, "root.d1.s2"),
            other => panic!("expected Leaf, got {:?}", other),
        }
    }

    #[test]
    fn test_delete_bound_adjustment() {
        assert_eq!(
            delete_end_time(&time_leaf(Comparator::LessThan, "100")).unwrap(),
            99
        );
        assert_eq!(
            delete_end_time(&time_leaf(Comparator::LessThanOrEqual, "100")).unwrap(),
            100
        );
    }

    #[test]
    fn test_delete_bound_must_stay_positive() {
        assert!(matches!(
            delete_end_time(&time_leaf(Comparator::LessThan, "1")),
            Err(PlanError::Semantic(_))
        ));
        assert!(matches!(
            delete_end_time(&time_leaf(Comparator::LessThanOrEqual, "0")),
            Err(PlanError::Semantic(_))
        ));
    }

    #[test]
    fn test_delete_bound_at_i64_min_rejected() {
        // < i64::MIN cannot be lowered to an inclusive bound; it must come
        // back as the usual out-of-range error, never wrap around.
        let bound = i64::MIN.to_string();
        assert!(matches!(
            delete_end_time(&time_leaf(Comparator::LessThan, &bound)),
            Err(PlanError::Semantic(_))
        ));
    }

    #[test]
    fn test_delete_rejects_wrong_comparator() {
        let err = delete_end_time(&time_leaf(Comparator::Equal, "100")).unwrap_err();
        assert!(err.to_string().contains("< or <="));
        assert!(delete_end_time(&time_leaf(Comparator::GreaterThan, "100")).is_err());
    }

    #[test]
    fn test_delete_rejects_compound_filter() {
        let filter = FilterNode::And(
            Box::new(time_leaf(Comparator::LessThan, "100")),
            Box::new(time_leaf(Comparator::GreaterThan, "10")),
        );
        assert!(matches!(
            delete_end_time(&filter),
            Err(PlanError::Semantic(_))
        ));
    }

    #[test]
    fn test_delete_rejects_non_time_path() {
        let filter = FilterNode::Leaf {
            path: Path::from_segments(["root", "d1", "s1"]),
            comparator: Comparator::LessThan,
            value: "100".to_string(),
        };
        assert!(matches!(
            delete_end_time(&filter),
            Err(PlanError::Semantic(_))
        ));
    }

    #[test]
    fn test_delete_bound_must_be_numeric() {
        assert!(matches!(
            delete_end_time(&time_leaf(Comparator::LessThan, "soon")),
            Err(PlanError::ValueParse { .. })
        ));
    }

    #[test]
    fn test_index_bound_adjustment() {
        assert_eq!(
            index_start_time(Some(&time_leaf(Comparator::GreaterThan, "50"))).unwrap(),
            51
        );
        assert_eq!(
            index_start_time(Some(&time_leaf(Comparator::GreaterThanOrEqual, "50"))).unwrap(),
            50
        );
        assert_eq!(index_start_time(None).unwrap(), 0);
    }

    #[test]
    fn test_index_bound_must_be_non_negative() {
        assert!(matches!(
            index_start_time(Some(&time_leaf(Comparator::GreaterThanOrEqual, "-1"))),
            Err(PlanError::Semantic(_))
        ));
        // > -1 adjusts to 0, which is allowed
        assert_eq!(
            index_start_time(Some(&time_leaf(Comparator::GreaterThan, "-1"))).unwrap(),
            0
        );
    }

    #[test]
    fn test_index_bound_at_i64_max_rejected() {
        let bound = i64::MAX.to_string();
        assert!(matches!(
            index_start_time(Some(&time_leaf(Comparator::GreaterThan, &bound))),
            Err(PlanError::Semantic(_))
        ));
    }

    #[test]
    fn test_index_rejects_wrong_comparator() {
        let err =
            index_start_time(Some(&time_leaf(Comparator::LessThan, "50"))).unwrap_err();
        assert!(err.to_string().contains("> or >="));
    }
}
