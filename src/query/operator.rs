//! Logical operator model
//!
//! One `LogicalOperator` variant per statement kind, each carrying only the
//! fields that statement needs. The tree is built bottom-up in a single
//! planning pass, owns all its sub-structures, and is immutable once the
//! planner returns it. Downstream components (physical planner, cluster
//! dispatch) consume it as an already-validated payload; cluster deployments
//! serialize it for consensus-log replication, hence the serde derives.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::filter::FilterNode;
use super::path::Path;
use super::schema::{DataType, Encoding};

/// Paths a statement selects, plain or aggregated
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectClause {
    /// Plain series paths
    pub paths: Vec<Path>,
    /// (series path, aggregation function name) pairs
    pub aggregated: Vec<(Path, String)>,
}

impl SelectClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_path(&mut self, path: Path) {
        self.paths.push(path);
    }

    pub fn add_aggregated(&mut self, path: Path, function: String) {
        self.aggregated.push((path, function));
    }
}

/// SELECT ... FROM ... WHERE ...
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub select: SelectClause,
    pub from: Vec<Path>,
    pub filter: Option<FilterNode>,
}

/// INSERT of one row into one device's measurements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertPlan {
    /// The target device path, SELECT-shaped because the grammar reuses the
    /// select production for it
    pub target: SelectClause,
    pub timestamp: i64,
    pub measurements: Vec<String>,
    pub values: Vec<String>,
}

/// UPDATE of one series' values under a filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePlan {
    pub from: Vec<Path>,
    pub target: Path,
    pub value: String,
    pub filter: FilterNode,
}

/// DELETE of data rows up to an inclusive end time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletePlan {
    pub select: SelectClause,
    pub filter: FilterNode,
    /// Inclusive upper bound, already adjusted from the filter's comparator
    pub end_time: i64,
}

/// CREATE TIMESERIES definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesDefinition {
    pub path: Path,
    pub data_type: DataType,
    pub encoding: Encoding,
    /// Extra `key=value` encoding arguments, kept verbatim
    pub encoding_args: Vec<String>,
}

/// What a property statement does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyKind {
    Create,
    AddLabel,
    DeleteLabel,
    Link,
    Unlink,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyPlan {
    pub kind: PropertyKind,
    /// `property.label` path (or just the property name for Create)
    pub property_path: Path,
    /// The series path a label is linked to or unlinked from
    pub metadata_path: Option<Path>,
}

/// Supported index implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    KvMatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPlan {
    pub path: Path,
    pub kind: IndexKind,
    pub parameters: HashMap<String, i64>,
    /// Inclusive start time, already adjusted from the filter's comparator
    pub start_time: i64,
    pub filter: Option<FilterNode>,
}

/// What an authorization statement does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorKind {
    CreateUser,
    CreateRole,
    UpdateUserPassword,
    DropUser,
    DropRole,
    GrantUser,
    GrantRole,
    GrantRoleToUser,
    RevokeUser,
    RevokeRole,
    RevokeRoleFromUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorPlan {
    pub kind: AuthorKind,
    pub user_name: Option<String>,
    pub role_name: Option<String>,
    pub password: Option<String>,
    pub new_password: Option<String>,
    pub privileges: Vec<String>,
    pub node_path: Option<Path>,
}

impl AuthorPlan {
    /// An author plan with every optional field empty
    pub fn new(kind: AuthorKind) -> Self {
        Self {
            kind,
            user_name: None,
            role_name: None,
            password: None,
            new_password: None,
            privileges: Vec::new(),
            node_path: None,
        }
    }
}

/// LOAD of a csv file into a series subtree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadDataPlan {
    pub csv_path: String,
    pub target_path: Path,
}

/// The validated result of planning one statement.
///
/// Exactly one variant instance comes out of one analysis pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOperator {
    Query(QueryPlan),
    Insert(InsertPlan),
    Update(UpdatePlan),
    Delete(DeletePlan),
    CreateSeries(SeriesDefinition),
    DeleteSeries { paths: Vec<Path> },
    SetFileLevel { path: Path },
    Property(PropertyPlan),
    CreateIndex(IndexPlan),
    Author(AuthorPlan),
    LoadData(LoadDataPlan),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filter::Comparator;

    fn sample_query() -> LogicalOperator {
        let mut select = SelectClause::new();
        select.add_path(Path::from_segments(["root", "g", "d1", "s1"]));
        select.add_aggregated(Path::from_segments(["root", "g", "d1", "s2"]), "count".to_string());
        LogicalOperator::Query(QueryPlan {
            select,
            from: vec![Path::from_segments(["root", "g"])],
            filter: Some(FilterNode::Leaf {
                path: Path::from_segments(["time"]),
                comparator: Comparator::GreaterThan,
                value: "100".to_string(),
            }),
        })
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(sample_query(), sample_query());
    }

    #[test]
    fn test_serde_round_trip() {
        let plan = sample_query();
        let json = serde_json::to_string(&plan).unwrap();
        let back: LogicalOperator = serde_json::from_str(&json).unwrap();
        assert_eq!(plan, back);
    }

    #[test]
    fn test_author_plan_starts_empty() {
        let plan = AuthorPlan::new(AuthorKind::CreateRole);
        assert_eq!(plan.kind, AuthorKind::CreateRole);
        assert!(plan.user_name.is_none());
        assert!(plan.privileges.is_empty());
    }
}
