//! # pgfilter
//!
//! Composable, parameterized `SELECT` construction from request-shaped filters.
//!
//! ## Features
//!
//! - **Nested filters**: `AND` / `OR` / `NOT` combinators, `BETWEEN` ranges and
//!   26 comparison operators, compiled into one parenthesized `WHERE` expression
//! - **Bound values only**: every caller value becomes a `?` placeholder; nulls
//!   degrade to `IS [NOT] NULL`
//! - **Deterministic output**: where-trees keep insertion order, so SQL text and
//!   bind order are reproducible
//! - **Cache keys**: each mutation feeds a key identifying the query's content
//! - **Postgres adapter**: `$n` placeholders and a `ToSql` wrapper for tokio-postgres
//!
//! ## Usage
//!
//! ```
//! use pgfilter::{Direction, Pagination, QueryBuilder};
//! use serde_json::json;
//!
//! let mut qb = QueryBuilder::new();
//! qb.add_where("status", "=", "active")
//!     .add_raw_where_json(&json!({"OR": {"role": "admin", "karma": {"gte": 100}}}))
//!     .add_sort(Direction::Desc, ["created_at"])
//!     .add_pagination(Pagination::new(1, 20));
//!
//! let query = qb.get_query("users", "u").unwrap();
//! assert_eq!(
//!     query.sql,
//!     "SELECT * FROM users u WHERE (status = ? AND (role = ? OR karma >= ?)) \
//!      ORDER BY created_at DESC LIMIT 20 OFFSET 0"
//! );
//! assert_eq!(query.values, vec![json!("active"), json!("admin"), json!(100)]);
//! ```
//!
//! Column names, table names, aliases and join conditions are written into the
//! SQL as given. Never pass untrusted input in those positions.

pub mod builder;
pub mod clause;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod filter;
pub mod key;
pub mod operator;
pub mod pagination;
pub mod prelude;
pub mod request;

#[cfg(feature = "postgres")]
pub mod pg;

pub use builder::{CompiledQuery, QueryBuilder};
pub use clause::{Direction, Join, JoinKind};
pub use config::{BuilderConfig, UnknownOperatorPolicy};
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, Level, NoopSink};
pub use error::{FilterError, FilterResult};
pub use filter::{BoolOp, CompiledWhere, Condition, Node, Range, WhereTree};
pub use key::CacheKey;
pub use operator::{Operator, resolve};
pub use pagination::Pagination;
pub use request::{RequestOption, RequestParams};

#[cfg(feature = "tracing")]
pub use diagnostics::TracingSink;

#[cfg(feature = "postgres")]
pub use pg::{PgParams, PgValue};

// Bind values are JSON values.
pub use serde_json::Value;
