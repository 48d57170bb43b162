//! Where-trees: the nested filter description compiled into a `WHERE` clause.
//!
//! A [`WhereTree`] is an insertion-ordered mapping whose entries are one of
//! three node shapes:
//!
//! - a boolean combinator (`AND` / `OR` / `NOT`) over one or more child mappings,
//! - a `BETWEEN` node holding `column → lower..upper` ranges,
//! - an attribute compared against a literal or an operator mapping.
//!
//! Keys are unique per node kind; inserting a node whose key already exists
//! replaces it in place, so compiled SQL and bind order follow insertion order.
//! `AND`, `OR`, `NOT` and `BETWEEN` are reserved and cannot name a column.
//!
//! # Example
//!
//! ```
//! use pgfilter::filter::{compile, WhereTree};
//! use serde_json::json;
//!
//! let tree = WhereTree::new()
//!     .eq("status", "active")
//!     .or(vec![WhereTree::new().eq("role", "admin").op("karma", "gte", 100)]);
//!
//! let compiled = compile(&tree).unwrap();
//! assert_eq!(compiled.sql, "(status = ? AND (role = ? OR karma >= ?))");
//! assert_eq!(compiled.values, vec![json!("active"), json!("admin"), json!(100)]);
//! ```

mod compile;
mod json;

#[cfg(test)]
mod tests;

pub use compile::{CompiledWhere, WhereCompiler, compile};

use crate::error::{FilterError, FilterResult};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Keys with structural meaning in a filter mapping. They cannot name a column.
pub const RESERVED_KEYS: [&str; 4] = ["AND", "OR", "NOT", "BETWEEN"];

/// Whether `key` is a combinator or range key rather than a column name.
pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Boolean combinator keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolOp {
    And,
    Or,
    /// Negated disjunction of the mapping's entries.
    ///
    /// Only the direct entries are ORed. A nested combinator keeps its own
    /// joiner, so `{"NOT": {"AND": {"a": 1, "b": 2}}}` compiles to
    /// `NOT ((a = ? AND b = ?))`. With several mappings each is negated on its
    /// own and the results are ANDed.
    Not,
}

impl BoolOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BoolOp::And => "AND",
            BoolOp::Or => "OR",
            BoolOp::Not => "NOT",
        }
    }
}

impl fmt::Display for BoolOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoolOp {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AND" => Ok(BoolOp::And),
            "OR" => Ok(BoolOp::Or),
            "NOT" => Ok(BoolOp::Not),
            other => Err(FilterError::InvalidBooleanOperator(other.to_string())),
        }
    }
}

/// One `column BETWEEN lower AND upper` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    pub column: String,
    pub lower: Value,
    pub upper: Value,
}

/// Right-hand side of an attribute entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Plain literal: equality, or `IS NULL` for null.
    Value(Value),
    /// `{operator: operand}` pairs, ANDed. Operator keys are unique.
    Operators(Vec<(String, Value)>),
}

impl Condition {
    /// Insert or replace an operator entry. A literal is replaced wholesale.
    fn set_operator(&mut self, operator: String, value: Value) {
        match self {
            Condition::Operators(ops) => match ops.iter_mut().find(|(op, _)| *op == operator) {
                Some(slot) => slot.1 = value,
                None => ops.push((operator, value)),
            },
            Condition::Value(_) => *self = Condition::Operators(vec![(operator, value)]),
        }
    }
}

/// An entry of a [`WhereTree`].
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// One group is the single-mapping form, several the sequence form.
    Bool { op: BoolOp, groups: Vec<WhereTree> },
    Between(Vec<Range>),
    Attr { column: String, condition: Condition },
}

impl Node {
    /// The mapping key this node is stored under.
    pub fn key(&self) -> &str {
        match self {
            Node::Bool { op, .. } => op.as_str(),
            Node::Between(_) => "BETWEEN",
            Node::Attr { column, .. } => column,
        }
    }

    /// Same kind and same key. An attribute never takes the slot of a
    /// combinator or range node, even under a reserved name.
    fn same_slot(&self, other: &Node) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other) && self.key() == other.key()
    }
}

/// Insertion-ordered filter mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereTree {
    nodes: Vec<Node>,
}

impl WhereTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Look up a node by key.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.key() == key)
    }

    /// Insert a node, replacing any node of the same kind and key in place.
    ///
    /// An attribute named after a reserved key is kept next to the structural
    /// node and fails compilation.
    pub fn insert(&mut self, node: Node) -> &mut Self {
        match self.nodes.iter_mut().find(|n| n.same_slot(&node)) {
            Some(slot) => *slot = node,
            None => self.nodes.push(node),
        }
        self
    }

    /// Merge every node of `other` into this tree.
    pub fn merge(&mut self, other: WhereTree) -> &mut Self {
        for node in other.nodes {
            self.insert(node);
        }
        self
    }

    /// Set `column` to a literal.
    pub fn set_value(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.insert(Node::Attr {
            column: column.into(),
            condition: Condition::Value(value.into()),
        })
    }

    /// Add `operator: value` to the operator mapping of `column`.
    ///
    /// Operators already set on the column are kept unless `operator` is one of them.
    pub fn set_operator(
        &mut self,
        column: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        let column = column.into();
        let (operator, value) = (operator.into(), value.into());
        let existing = self.nodes.iter_mut().find_map(|n| match n {
            Node::Attr { column: c, condition } if *c == column => Some(condition),
            _ => None,
        });
        match existing {
            Some(condition) => condition.set_operator(operator, value),
            None => self.nodes.push(Node::Attr {
                column,
                condition: Condition::Operators(vec![(operator, value)]),
            }),
        }
        self
    }

    /// Add a range to the `BETWEEN` node, replacing an existing range on `column`.
    pub fn set_range(
        &mut self,
        column: impl Into<String>,
        lower: impl Into<Value>,
        upper: impl Into<Value>,
    ) -> &mut Self {
        let range = Range {
            column: column.into(),
            lower: lower.into(),
            upper: upper.into(),
        };
        let ranges = self.nodes.iter_mut().find_map(|n| match n {
            Node::Between(ranges) => Some(ranges),
            _ => None,
        });
        match ranges {
            Some(ranges) => match ranges.iter_mut().find(|r| r.column == range.column) {
                Some(slot) => *slot = range,
                None => ranges.push(range),
            },
            None => self.nodes.push(Node::Between(vec![range])),
        }
        self
    }

    /// Set a combinator node over `groups`.
    pub fn set_bool(&mut self, op: BoolOp, groups: Vec<WhereTree>) -> &mut Self {
        self.insert(Node::Bool { op, groups })
    }

    // ==================== Consuming helpers ====================

    /// `column = value` (or `IS NULL`).
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_value(column, value);
        self
    }

    /// `column <operator> value`.
    pub fn op(
        mut self,
        column: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.set_operator(column, operator, value);
        self
    }

    /// `(column BETWEEN lower AND upper)`.
    pub fn between(
        mut self,
        column: impl Into<String>,
        lower: impl Into<Value>,
        upper: impl Into<Value>,
    ) -> Self {
        self.set_range(column, lower, upper);
        self
    }

    pub fn and(mut self, groups: Vec<WhereTree>) -> Self {
        self.set_bool(BoolOp::And, groups);
        self
    }

    pub fn or(mut self, groups: Vec<WhereTree>) -> Self {
        self.set_bool(BoolOp::Or, groups);
        self
    }

    /// `NOT (a OR b ...)` per group.
    pub fn not(mut self, groups: Vec<WhereTree>) -> Self {
        self.set_bool(BoolOp::Not, groups);
        self
    }

    // ==================== JSON ====================

    /// Parse a request-shaped JSON filter.
    ///
    /// ```
    /// use pgfilter::filter::WhereTree;
    /// use serde_json::json;
    ///
    /// let tree = WhereTree::from_json(&json!({
    ///     "status": "active",
    ///     "age": {"gte": 18},
    ///     "BETWEEN": {"created_at": {"2024-01-01": "2024-12-31"}},
    /// }))
    /// .unwrap();
    /// assert_eq!(tree.len(), 3);
    /// ```
    pub fn from_json(value: &Value) -> FilterResult<Self> {
        json::parse_tree(value)
    }

    /// Canonical JSON form, accepted back by [`WhereTree::from_json`].
    pub fn to_json(&self) -> Value {
        json::tree_to_json(self)
    }

    /// Tagged encoding that identifies the tree for cache keys.
    ///
    /// Unlike [`to_json`](Self::to_json) it tells a literal object from an
    /// operator mapping and keeps the JSON type of range bounds, so two trees
    /// share a key value only when they compile to the same SQL and binds.
    pub fn key_value(&self) -> Value {
        json::tree_to_key(self)
    }
}

impl TryFrom<&Value> for WhereTree {
    type Error = FilterError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Self::from_json(value)
    }
}

impl TryFrom<Value> for WhereTree {
    type Error = FilterError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_json(&value)
    }
}

impl From<&WhereTree> for Value {
    fn from(tree: &WhereTree) -> Self {
        tree.to_json()
    }
}

impl serde::Serialize for WhereTree {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for WhereTree {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value).map_err(serde::de::Error::custom)
    }
}
