//! Query front end
//! Converts a parsed statement AST into a logical operator tree.

pub mod ast;
pub mod error;
pub mod filter;
pub mod operator;
pub mod path;
pub mod planner;
pub mod schema;
pub mod time;

pub use ast::{AstNode, Token, TokenKind};
pub use error::{PlanError, PlanResult};
pub use filter::{Comparator, FilterNode};
pub use operator::{
    AuthorKind, AuthorPlan, DeletePlan, IndexKind, IndexPlan, InsertPlan, LoadDataPlan,
    LogicalOperator, PropertyKind, PropertyPlan, QueryPlan, SelectClause, SeriesDefinition,
    UpdatePlan,
};
pub use path::Path;
pub use planner::LogicalPlanner;
pub use schema::{check_series_args, DataType, Encoding};
