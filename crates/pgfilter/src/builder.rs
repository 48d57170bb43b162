//! Stateful SELECT builder.
//!
//! Mutators can be called any number of times, in any order. [`QueryBuilder::get_query`]
//! assembles the statement in a fixed clause order
//! (`SELECT` → `FROM` → `JOIN` → `WHERE` → `GROUP BY` → `ORDER BY` → `LIMIT/OFFSET`)
//! and is idempotent between mutations.
//!
//! A builder is a short-lived, single-owner value; share it across threads only
//! behind your own lock.


use crate::clause::{self, Direction, Join, JoinKind};
use crate::config::BuilderConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink, NoopSink};
use crate::error::{FilterError, FilterResult};
use crate::filter::{self, WhereCompiler, WhereTree};
use crate::key::CacheKey;
use crate::pagination::Pagination;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// SQL text with `?` placeholders and its positional bind values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub values: Vec<Value>,
}

impl CompiledQuery {
    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.values)
    }
}

/// Accumulates selection, joins, filters, grouping, sorting and pagination.
///
/// # Example
///
/// ```
/// use pgfilter::{Direction, Pagination, QueryBuilder};
///
/// let mut qb = QueryBuilder::new();
/// qb.add_where("status", "=", "active")
///     .add_sort(Direction::Desc, ["created_at"])
///     .add_pagination(Pagination::new(2, 10));
///
/// let query = qb.get_query("orders", "o").unwrap();
/// assert_eq!(
///     query.sql,
///     "SELECT * FROM orders o WHERE status = ? ORDER BY created_at DESC LIMIT 10 OFFSET 10"
/// );
/// assert_eq!(query.values, vec![serde_json::json!("active")]);
/// ```
#[derive(Clone)]
pub struct QueryBuilder {
    selection: Vec<String>,
    joins: Vec<Join>,
    where_tree: Option<WhereTree>,
    group: Vec<String>,
    sort: Vec<(String, Direction)>,
    pagination: Option<Pagination>,
    key: CacheKey,
    config: BuilderConfig,
    sink: Arc<dyn DiagnosticSink>,
    /// First deferred error, returned by every `get_query`
    build_error: Option<FilterError>,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("selection", &self.selection)
            .field("joins", &self.joins)
            .field("where_tree", &self.where_tree)
            .field("group", &self.group)
            .field("sort", &self.sort)
            .field("pagination", &self.pagination)
            .field("key", &self.key)
            .field("config", &self.config)
            .field("build_error", &self.build_error)
            .finish_non_exhaustive()
    }
}

impl QueryBuilder {
    /// Create an empty builder with default config and a no-op sink.
    pub fn new() -> Self {
        Self {
            selection: Vec::new(),
            joins: Vec::new(),
            where_tree: None,
            group: Vec::new(),
            sort: Vec::new(),
            pagination: None,
            key: CacheKey::new(),
            config: BuilderConfig::default(),
            sink: Arc::new(NoopSink),
            build_error: None,
        }
    }

    pub fn with_config(mut self, config: BuilderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    // ==================== SELECT ====================

    /// Append a selection expression. No selection means `SELECT *`.
    pub fn add_selection(&mut self, expr: impl Into<String>) -> &mut Self {
        self.selection.push(expr.into());
        self
    }

    /// Append `SUM(column) alias`.
    pub fn add_sum(&mut self, column: &str, alias: &str) -> &mut Self {
        self.add_selection(aliased(format!("SUM({column})"), alias))
    }

    /// Append `COUNT(DISTINCT column) alias`.
    pub fn add_count(&mut self, column: &str, alias: &str) -> &mut Self {
        self.add_selection(aliased(format!("COUNT(DISTINCT {column})"), alias))
    }

    // ==================== JOIN ====================

    pub fn add_join(
        &mut self,
        kind: JoinKind,
        table: impl Into<String>,
        alias: impl Into<String>,
        on: impl Into<String>,
    ) -> &mut Self {
        self.joins.push(Join {
            kind,
            table: table.into(),
            alias: alias.into(),
            on: on.into(),
        });
        self
    }

    // ==================== WHERE ====================

    /// Filter `attribute` with `operator` against `value`.
    ///
    /// An empty operator, `eq` or `=` stores a plain equality entry (null
    /// compiles to `IS NULL`). Any other operator joins the attribute's operator
    /// mapping, so `age gte 18` then `age lte 30` keeps both. Different
    /// attributes are ANDed.
    ///
    /// A reserved attribute name (`AND`, `OR`, `NOT`, `BETWEEN`) is rejected
    /// and kept as the builder's build error.
    pub fn add_where(
        &mut self,
        attribute: impl Into<String>,
        operator: &str,
        value: impl Into<Value>,
    ) -> &mut Self {
        let attribute = attribute.into();
        if filter::is_reserved(&attribute) {
            return self.defer_error(FilterError::malformed(format!(
                "'{attribute}' is a reserved key and cannot name a column"
            )));
        }
        let value = value.into();
        let tree = self.where_tree.get_or_insert_with(WhereTree::new);

        if operator.is_empty() || operator == "eq" || operator == "=" {
            self.key.push([Value::from(attribute.as_str()), value.clone()]);
            tree.set_value(attribute, value);
        } else {
            self.key
                .push([Value::from(attribute.as_str()), Value::from(operator), value.clone()]);
            tree.set_operator(attribute, operator, value);
        }
        self
    }

    /// Merge a where-tree into the current one; entries with the same key are replaced.
    ///
    /// This is the way to add `AND` / `OR` / `NOT` and `BETWEEN` nodes. The
    /// tree's [`key_value`](WhereTree::key_value) joins the cache key.
    pub fn add_raw_where(&mut self, tree: WhereTree) -> &mut Self {
        if !tree.is_empty() {
            self.key.push([tree.key_value()]);
        }
        self.where_tree
            .get_or_insert_with(WhereTree::new)
            .merge(tree);
        self
    }

    /// Parse a JSON filter and merge it.
    ///
    /// A malformed filter is reported to the sink and kept as the builder's
    /// build error; `get_query` then fails with it.
    pub fn add_raw_where_json(&mut self, filter: &Value) -> &mut Self {
        match WhereTree::from_json(filter) {
            Ok(tree) => self.add_raw_where(tree),
            Err(err) => self.defer_error(err),
        }
    }

    /// Report `err` and keep it for `get_query`; the first error wins.
    fn defer_error(&mut self, err: FilterError) -> &mut Self {
        self.sink
            .report(&Diagnostic::error("rejected where filter").with_field("error", err.to_string()));
        self.build_error.get_or_insert(err);
        self
    }

    // ==================== GROUP / ORDER / LIMIT ====================

    pub fn add_group<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Sort by each column in `direction`. Calls accumulate.
    pub fn add_sort<I, S>(&mut self, direction: Direction, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for column in columns {
            let column = column.into();
            self.key
                .push([Value::from(column.as_str()), Value::from(direction.as_str())]);
            self.sort.push((column, direction));
        }
        self
    }

    /// Set pagination, replacing any previous one.
    pub fn add_pagination(&mut self, pagination: Pagination) -> &mut Self {
        self.key.push([Value::from("limit"), Value::from(pagination.limit())]);
        self.key.push([Value::from("offset"), Value::from(pagination.offset())]);
        self.pagination = Some(pagination);
        self
    }

    // ==================== Cache key ====================

    /// Append caller-defined parts to the cache key.
    pub fn add_key<I>(&mut self, parts: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.key.push(parts);
        self
    }

    pub fn remove_key(&mut self) -> &mut Self {
        self.key.clear();
        self
    }

    /// Dash-joined cache key.
    pub fn key(&self) -> &str {
        self.key.as_str()
    }

    /// Collision-free digest of the cache key parts.
    pub fn key_fingerprint(&self) -> String {
        self.key.fingerprint()
    }

    pub fn cache_key(&self) -> &CacheKey {
        &self.key
    }

    // ==================== Accessors ====================

    pub fn where_tree(&self) -> Option<&WhereTree> {
        self.where_tree.as_ref()
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.pagination
    }

    pub fn build_error(&self) -> Option<&FilterError> {
        self.build_error.as_ref()
    }

    // ==================== Build ====================

    /// Assemble `SELECT ... FROM table [alias] ...`.
    ///
    /// On error no SQL is returned; the caller must not execute anything.
    pub fn get_query(&self, table: &str, alias: &str) -> FilterResult<CompiledQuery> {
        if let Some(err) = &self.build_error {
            return Err(err.clone());
        }

        let mut sql = String::from("SELECT ");
        if self.selection.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.selection.join(", "));
        }

        sql.push_str(" FROM ");
        sql.push_str(table);
        if !alias.is_empty() {
            sql.push(' ');
            sql.push_str(alias);
        }

        if !self.joins.is_empty() {
            sql.push(' ');
            sql.push_str(&clause::join_clause(&self.joins));
        }

        let mut values = Vec::new();
        if let Some(tree) = &self.where_tree {
            let compiled = WhereCompiler::new(&self.config, self.sink.as_ref())
                .compile(tree)
                .inspect_err(|err| {
                    self.sink.report(
                        &Diagnostic::error("failed to compile where clause")
                            .with_field("table", table)
                            .with_field("error", err.to_string()),
                    );
                })?;
            if !compiled.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&compiled.sql);
                values = compiled.values;
            }
        }

        if !self.group.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&clause::group_clause(&self.group));
        }

        if !self.sort.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&clause::sort_clause(&self.sort));
        }

        if let Some(pagination) = &self.pagination {
            sql.push(' ');
            sql.push_str(&clause::pagination_clause(pagination));
        }

        Ok(CompiledQuery { sql, values })
    }
}

fn aliased(expr: String, alias: &str) -> String {
    if alias.is_empty() {
        expr
    } else {
        format!("{expr} {alias}")
    }
}
