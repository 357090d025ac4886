//! Statement planner
//!
//! Walks a parsed statement AST once, classifies the root token, and builds
//! the matching `LogicalOperator`. Nested clauses (SELECT/FROM/WHERE inside
//! a compound statement) are analyzed by recursive calls that fill an
//! explicit in-progress builder, so each `plan` call is a pure function of
//! its AST and the configured timezone: no shared state, no I/O, no
//! suspension points. Planner instances are cheap and safe to use from any
//! thread.

use chrono::FixedOffset;
use std::collections::HashMap;
use tracing::debug;

use super::ast::{AstNode, TokenKind};
use super::error::{PlanError, PlanResult};
use super::filter::{self, FilterNode};
use super::operator::{
    AuthorKind, AuthorPlan, DeletePlan, IndexKind, IndexPlan, InsertPlan, LoadDataPlan,
    LogicalOperator, PropertyKind, PropertyPlan, QueryPlan, SelectClause, SeriesDefinition,
    UpdatePlan,
};
use super::path::{Path, ROOT};
use super::schema;
use super::time;

/// Converts statement ASTs into logical operator trees
pub struct LogicalPlanner {
    tz: FixedOffset,
}

impl LogicalPlanner {
    /// A planner resolving calendar time literals against `tz`
    pub fn new(tz: FixedOffset) -> Self {
        Self { tz }
    }

    /// Plan one statement: one AST in, one operator tree or one error out.
    pub fn plan(&self, root: &AstNode) -> PlanResult<LogicalOperator> {
        let token = root
            .token
            .as_ref()
            .ok_or_else(|| PlanError::structure("statement root has no token"))?;
        debug!("planning statement token {:?}", token.kind);
        match token.kind {
            TokenKind::Query => self.plan_query(root),
            TokenKind::Insert => self.plan_insert(root),
            TokenKind::Select | TokenKind::From | TokenKind::Where => Err(PlanError::structure(
                format!("{:?} clause outside a statement", token.kind),
            )),
            TokenKind::Update => {
                if child(root, 0)?.is(TokenKind::UpdatePassword) {
                    self.plan_author_update(root)
                } else {
                    self.plan_update(root)
                }
            }
            TokenKind::Delete => match child(root, 0)?.kind() {
                Some(TokenKind::Timeseries) => self.plan_series_delete(root),
                Some(TokenKind::Label) => self.plan_property_label(root, PropertyKind::DeleteLabel),
                _ => self.plan_delete(root),
            },
            TokenKind::Set => self.plan_set_file_level(root),
            TokenKind::Add => self.plan_property_label(root, PropertyKind::AddLabel),
            TokenKind::Link => self.plan_property_link(root, PropertyKind::Link),
            TokenKind::Unlink => self.plan_property_link(root, PropertyKind::Unlink),
            TokenKind::Create => match child(root, 0)?.kind() {
                Some(TokenKind::User) | Some(TokenKind::Role) => self.plan_author_create(root),
                Some(TokenKind::Timeseries) => self.plan_series_create(root),
                Some(TokenKind::Property) => self.plan_property_create(root),
                Some(TokenKind::Index) => self.plan_index_create(root),
                Some(other) => Err(PlanError::unsupported(other, "after CREATE")),
                None => Err(PlanError::structure("CREATE entity node has no token")),
            },
            TokenKind::Drop => self.plan_author_drop(root),
            TokenKind::Grant => self.plan_author_grant(root),
            TokenKind::Revoke => self.plan_author_revoke(root),
            TokenKind::Load => self.plan_load_data(root),
            other => Err(PlanError::unsupported(other, "as statement root")),
        }
    }

    fn plan_query(&self, root: &AstNode) -> PlanResult<LogicalOperator> {
        let mut plan = QueryPlan::default();
        for clause in &root.children {
            match clause.kind() {
                Some(TokenKind::Select) => plan.select = self.analyze_select(clause)?,
                Some(TokenKind::From) => plan.from = analyze_from(clause)?,
                Some(TokenKind::Where) => plan.filter = Some(self.analyze_where(clause)?),
                Some(other) => return Err(PlanError::unsupported(other, "in query statement")),
                None => return Err(PlanError::structure("query clause has no token")),
            }
        }
        Ok(LogicalOperator::Query(plan))
    }

    fn plan_insert(&self, root: &AstNode) -> PlanResult<LogicalOperator> {
        let target = self.analyze_select(child(root, 0)?)?;
        let measurement_node = child(root, 1)?;
        if !child(measurement_node, 0)?.is(TokenKind::Time) {
            return Err(PlanError::structure("insert statement needs keyword 'timestamp'"));
        }
        let value_node = child(root, 2)?;
        let time_value = child(value_node, 0)?;
        let timestamp = if time_value.is(TokenKind::DateTime) {
            time::resolve_datetime_node(time_value, &self.tz)?
        } else {
            time_value.text().parse::<i64>().map_err(|_| {
                PlanError::value(
                    time_value.text(),
                    "insert clause needs a signed integer timestamp",
                )
            })?
        };
        if measurement_node.child_count() != value_node.child_count() {
            return Err(PlanError::semantic(
                "number of measurements is not equal to the number of values",
            ));
        }
        let measurements = measurement_node
            .children
            .iter()
            .skip(1)
            .map(|c| c.text().to_string())
            .collect();
        let values = value_node
            .children
            .iter()
            .skip(1)
            .map(|c| c.text().to_string())
            .collect();
        Ok(LogicalOperator::Insert(InsertPlan {
            target,
            timestamp,
            measurements,
            values,
        }))
    }

    fn plan_update(&self, root: &AstNode) -> PlanResult<LogicalOperator> {
        if root.child_count() > 3 {
            return Err(PlanError::semantic(
                "UPDATE statement does not support multi-update yet",
            ));
        }
        let from = vec![Path::from_ast(child(root, 0)?)?];
        let assignment = child(root, 1)?;
        let target = Path::from_ast(child(assignment, 0)?)?;
        let value = child(assignment, 1)?.text().to_string();
        let filter = self.analyze_where(child(root, 2)?)?;
        Ok(LogicalOperator::Update(UpdatePlan {
            from,
            target,
            value,
            filter,
        }))
    }

    fn plan_delete(&self, root: &AstNode) -> PlanResult<LogicalOperator> {
        let (where_node, path_nodes) = match root.children.split_last() {
            Some(split) => split,
            None => return Err(PlanError::structure("delete statement requires a where clause")),
        };
        let mut select = SelectClause::new();
        for node in path_nodes {
            if !node.is(TokenKind::Path) {
                return Err(PlanError::structure(format!(
                    "delete statement children except the last must be paths like root.a.b, actual: {}",
                    node.text()
                )));
            }
            select.add_path(Path::from_ast(node)?);
        }
        let filter = self.analyze_where(where_node)?;
        let end_time = filter::delete_end_time(&filter)?;
        Ok(LogicalOperator::Delete(DeletePlan {
            select,
            filter,
            end_time,
        }))
    }

    fn plan_series_create(&self, root: &AstNode) -> PlanResult<LogicalOperator> {
        let path = Path::from_ast(child(child(root, 0)?, 0)?)?;
        let params = child(root, 1)?;
        let data_type = child(child(params, 0)?, 0)?.text();
        let encoding = child(child(params, 1)?, 0)?.text();
        let (data_type, encoding) = schema::check_series_args(data_type, encoding)?;
        let mut encoding_args = Vec::with_capacity(params.child_count().saturating_sub(2));
        for arg in params.children.iter().skip(2) {
            let key = child(arg, 0)?.text();
            let value = child(arg, 1)?.text();
            encoding_args.push(format!("{}={}", key, value));
        }
        Ok(LogicalOperator::CreateSeries(SeriesDefinition {
            path,
            data_type,
            encoding,
            encoding_args,
        }))
    }

    fn plan_series_delete(&self, root: &AstNode) -> PlanResult<LogicalOperator> {
        let series_node = child(root, 0)?;
        let paths = series_node
            .children
            .iter()
            .map(Path::from_ast)
            .collect::<PlanResult<Vec<_>>>()?;
        Ok(LogicalOperator::DeleteSeries { paths })
    }

    fn plan_set_file_level(&self, root: &AstNode) -> PlanResult<LogicalOperator> {
        let path = Path::from_ast(child(child(root, 0)?, 0)?)?;
        Ok(LogicalOperator::SetFileLevel { path })
    }

    fn plan_property_create(&self, root: &AstNode) -> PlanResult<LogicalOperator> {
        let name = child(child(root, 0)?, 0)?.text().to_string();
        Ok(LogicalOperator::Property(PropertyPlan {
            kind: PropertyKind::Create,
            property_path: Path::new(vec![name]),
            metadata_path: None,
        }))
    }

    fn plan_property_label(&self, root: &AstNode, kind: PropertyKind) -> PlanResult<LogicalOperator> {
        let property_path = parse_property_label(root, 0)?;
        Ok(LogicalOperator::Property(PropertyPlan {
            kind,
            property_path,
            metadata_path: None,
        }))
    }

    fn plan_property_link(&self, root: &AstNode, kind: PropertyKind) -> PlanResult<LogicalOperator> {
        let metadata_path = Path::from_ast(child(root, 0)?)?;
        let property_path = parse_property_label(root, 1)?;
        Ok(LogicalOperator::Property(PropertyPlan {
            kind,
            property_path,
            metadata_path: Some(metadata_path),
        }))
    }

    fn plan_index_create(&self, root: &AstNode) -> PlanResult<LogicalOperator> {
        let base = child(root, 0)?;
        let path = Path::from_ast(child(base, 0)?)?;
        let definition = child(base, 1)?;
        let index_name = child(definition, 0)?.text();
        if index_name != "kv-match" {
            return Err(PlanError::semantic(format!(
                "index kind {} is not supported, only kv-match is",
                index_name
            )));
        }
        let mut parameters = HashMap::new();
        let mut index_filter = None;
        for clause in definition.children.iter().skip(1) {
            match clause.kind() {
                Some(TokenKind::With) => {
                    for pair in &clause.children {
                        let key = child(pair, 0)?.text().to_string();
                        let value_text = child(pair, 1)?.text();
                        let value = value_text.parse::<i64>().map_err(|_| {
                            PlanError::value(value_text, "index parameter must be an integer")
                        })?;
                        parameters.insert(key, value);
                    }
                }
                Some(TokenKind::Where) => {
                    index_filter = Some(self.analyze_where(clause)?);
                }
                Some(other) => return Err(PlanError::unsupported(other, "in create index")),
                None => return Err(PlanError::structure("create index clause has no token")),
            }
        }
        let start_time = filter::index_start_time(index_filter.as_ref())?;
        Ok(LogicalOperator::CreateIndex(IndexPlan {
            path,
            kind: IndexKind::KvMatch,
            parameters,
            start_time,
            filter: index_filter,
        }))
    }

    fn plan_author_create(&self, root: &AstNode) -> PlanResult<LogicalOperator> {
        let plan = match root.child_count() {
            2 => {
                let mut plan = AuthorPlan::new(AuthorKind::CreateUser);
                plan.user_name = Some(child(child(root, 0)?, 0)?.text().to_string());
                plan.password = Some(child(child(root, 1)?, 0)?.text().to_string());
                plan
            }
            1 => {
                let mut plan = AuthorPlan::new(AuthorKind::CreateRole);
                plan.role_name = Some(child(child(root, 0)?, 0)?.text().to_string());
                plan
            }
            count => {
                return Err(PlanError::structure(format!(
                    "create user/role statement has {} children, expected 1 or 2",
                    count
                )))
            }
        };
        Ok(LogicalOperator::Author(plan))
    }

    fn plan_author_update(&self, root: &AstNode) -> PlanResult<LogicalOperator> {
        if root.child_count() != 1 {
            return Err(PlanError::structure(
                "update password statement must have exactly one child",
            ));
        }
        let user = child(root, 0)?;
        if user.child_count() != 3 {
            return Err(PlanError::structure(format!(
                "update password node has {} children, expected 3",
                user.child_count()
            )));
        }
        let mut plan = AuthorPlan::new(AuthorKind::UpdateUserPassword);
        plan.user_name = Some(unquote(child(user, 0)?.text())?);
        plan.new_password = Some(unquote(child(user, 1)?.text())?);
        Ok(LogicalOperator::Author(plan))
    }

    fn plan_author_drop(&self, root: &AstNode) -> PlanResult<LogicalOperator> {
        if root.child_count() != 1 {
            return Err(PlanError::structure(
                "drop statement must name exactly one user or role",
            ));
        }
        let entity = child(root, 0)?;
        let name = child(entity, 0)?.text().to_string();
        let plan = match entity.kind() {
            Some(TokenKind::User) => {
                let mut plan = AuthorPlan::new(AuthorKind::DropUser);
                plan.user_name = Some(name);
                plan
            }
            Some(TokenKind::Role) => {
                let mut plan = AuthorPlan::new(AuthorKind::DropRole);
                plan.role_name = Some(name);
                plan
            }
            _ => {
                return Err(PlanError::structure(
                    "drop statement must name a user or a role",
                ))
            }
        };
        Ok(LogicalOperator::Author(plan))
    }

    fn plan_author_grant(&self, root: &AstNode) -> PlanResult<LogicalOperator> {
        self.plan_author_privileges(
            root,
            AuthorKind::GrantRoleToUser,
            AuthorKind::GrantUser,
            AuthorKind::GrantRole,
            "grant",
        )
    }

    fn plan_author_revoke(&self, root: &AstNode) -> PlanResult<LogicalOperator> {
        self.plan_author_privileges(
            root,
            AuthorKind::RevokeRoleFromUser,
            AuthorKind::RevokeUser,
            AuthorKind::RevokeRole,
            "revoke",
        )
    }

    /// GRANT and REVOKE share their shape: the two-child form moves a role
    /// to/from a user, the three-child form carries a privilege list and a
    /// target path and sub-dispatches on USER vs ROLE.
    fn plan_author_privileges(
        &self,
        root: &AstNode,
        role_user_kind: AuthorKind,
        user_kind: AuthorKind,
        role_kind: AuthorKind,
        statement: &str,
    ) -> PlanResult<LogicalOperator> {
        let plan = match root.child_count() {
            2 => {
                let mut plan = AuthorPlan::new(role_user_kind);
                plan.role_name = Some(child(child(root, 0)?, 0)?.text().to_string());
                plan.user_name = Some(child(child(root, 1)?, 0)?.text().to_string());
                plan
            }
            3 => {
                let privilege_node = child(root, 1)?;
                let mut privileges = Vec::with_capacity(privilege_node.child_count());
                for privilege in &privilege_node.children {
                    privileges.push(unquote(privilege.text())?);
                }
                let node_path = Path::from_ast(child(root, 2)?)?;
                let entity = child(root, 0)?;
                let name = child(entity, 0)?.text().to_string();
                let mut plan = match entity.kind() {
                    Some(TokenKind::User) => {
                        let mut plan = AuthorPlan::new(user_kind);
                        plan.user_name = Some(name);
                        plan
                    }
                    Some(TokenKind::Role) => {
                        let mut plan = AuthorPlan::new(role_kind);
                        plan.role_name = Some(name);
                        plan
                    }
                    _ => {
                        return Err(PlanError::structure(format!(
                            "{} statement must name a user or a role",
                            statement
                        )))
                    }
                };
                plan.privileges = privileges;
                plan.node_path = Some(node_path);
                plan
            }
            count => {
                return Err(PlanError::structure(format!(
                    "{} statement has {} children, expected 2 or 3",
                    statement, count
                )))
            }
        };
        Ok(LogicalOperator::Author(plan))
    }

    fn plan_load_data(&self, root: &AstNode) -> PlanResult<LogicalOperator> {
        if root.child_count() < 3 {
            return Err(PlanError::structure(
                "load data statement requires a csv path and an absolute series path",
            ));
        }
        if child(root, 1)?.text() != ROOT {
            return Err(PlanError::structure(
                "load data target path must start at root",
            ));
        }
        let csv_path = unquote(child(root, 0)?.text())?;
        let mut segments = vec![ROOT.to_string()];
        for node in root.children.iter().skip(2) {
            segments.push(node.text().to_string());
        }
        Ok(LogicalOperator::LoadData(LoadDataPlan {
            csv_path,
            target_path: Path::new(segments),
        }))
    }

    fn analyze_select(&self, node: &AstNode) -> PlanResult<SelectClause> {
        let mut select = SelectClause::new();
        match node.kind() {
            Some(TokenKind::Select) => {
                for item in &node.children {
                    let first = item.child(0);
                    if first.map(|c| c.is(TokenKind::Cluster)).unwrap_or(false) {
                        let cluster = &item.children[0];
                        let path = Path::from_ast(child(cluster, 0)?)?;
                        let function = child(cluster, 1)?.text().to_string();
                        select.add_aggregated(path, function);
                    } else {
                        select.add_path(Path::from_ast(item)?);
                    }
                }
            }
            Some(TokenKind::Path) => select.add_path(Path::from_ast(node)?),
            other => {
                return Err(PlanError::structure(format!(
                    "select clause children must all be paths like root.a.b, actual: {:?}",
                    other
                )))
            }
        }
        Ok(select)
    }

    fn analyze_where(&self, node: &AstNode) -> PlanResult<FilterNode> {
        if !node.is(TokenKind::Where) {
            return Err(PlanError::structure(format!(
                "expected a where clause, actual: {:?}",
                node.kind()
            )));
        }
        if node.child_count() != 1 {
            return Err(PlanError::structure(format!(
                "where clause has {} children, expected exactly one",
                node.child_count()
            )));
        }
        filter::build_filter(&node.children[0], &self.tz)
    }
}

fn analyze_from(node: &AstNode) -> PlanResult<Vec<Path>> {
    let mut paths = Vec::with_capacity(node.child_count());
    for item in &node.children {
        if !item.is(TokenKind::Path) {
            return Err(PlanError::structure(format!(
                "from clause children must all be paths like root.a.b, actual: {}",
                item.text()
            )));
        }
        paths.push(Path::from_ast(item)?);
    }
    Ok(paths)
}

/// `property.label` path from two sibling nodes starting at `start`
fn parse_property_label(node: &AstNode, start: usize) -> PlanResult<Path> {
    let label = child(child(node, start)?, 0)?.text().to_string();
    let property = child(child(node, start + 1)?, 0)?.text().to_string();
    Ok(Path::new(vec![property, label]))
}

fn child<'a>(node: &'a AstNode, idx: usize) -> PlanResult<&'a AstNode> {
    node.child(idx).ok_or_else(|| {
        PlanError::structure(format!(
            "{:?} node is missing child {}",
            node.kind(),
            idx
        ))
    })
}

/// Strip the single quotes around passwords, privilege names and file paths
fn unquote(src: &str) -> PlanResult<String> {
    if src.len() < 3 || !src.starts_with('\'') || !src.ends_with('\'') {
        return Err(PlanError::structure(format!(
            "error format for quoted string: {}",
            src
        )));
    }
    Ok(src[1..src.len() - 1].to_string())
}
