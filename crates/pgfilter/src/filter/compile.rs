//! Recursive where-tree compiler.
//!
//! Fragments are folded left to right, and each additional fragment wraps the
//! accumulation in parentheses: `a`, `(a AND b)`, `((a AND b) AND c)`.
//! Bind values are pushed in the same depth-first order their placeholders
//! appear in the SQL text.

use super::{BoolOp, Condition, Node, Range, WhereTree, is_reserved};
use crate::config::{BuilderConfig, UnknownOperatorPolicy};
use crate::diagnostics::{Diagnostic, DiagnosticSink, NoopSink};
use crate::error::{FilterError, FilterResult};
use crate::operator::{Arity, Operator};
use serde_json::Value;

/// A compiled boolean expression and its positional bind values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledWhere {
    pub sql: String,
    pub values: Vec<Value>,
}

impl CompiledWhere {
    /// No condition was compiled (the tree was empty).
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Compile with default configuration and no diagnostics.
pub fn compile(tree: &WhereTree) -> FilterResult<CompiledWhere> {
    WhereCompiler::new(&BuilderConfig::default(), &NoopSink).compile(tree)
}

/// Where-tree compiler bound to a configuration and a diagnostic sink.
pub struct WhereCompiler<'a> {
    config: &'a BuilderConfig,
    sink: &'a dyn DiagnosticSink,
}

impl<'a> WhereCompiler<'a> {
    pub fn new(config: &'a BuilderConfig, sink: &'a dyn DiagnosticSink) -> Self {
        Self { config, sink }
    }

    /// Compile `tree` into a single boolean expression.
    ///
    /// An empty tree yields an empty fragment; callers omit `WHERE` for it.
    /// On error nothing partial is returned.
    pub fn compile(&self, tree: &WhereTree) -> FilterResult<CompiledWhere> {
        let mut values = Vec::new();
        let sql = if tree.is_empty() {
            String::new()
        } else {
            self.mapping(tree, "AND", 0, &mut values)?
        };
        Ok(CompiledWhere { sql, values })
    }

    fn mapping(
        &self,
        tree: &WhereTree,
        joiner: &str,
        depth: usize,
        values: &mut Vec<Value>,
    ) -> FilterResult<String> {
        if tree.is_empty() {
            return Err(FilterError::malformed("empty mapping"));
        }
        let mut acc = None;
        for node in tree.nodes() {
            let sql = self.node(node, depth, values)?;
            acc = Some(fold(acc, sql, joiner));
        }
        Ok(acc.unwrap_or_default())
    }

    fn node(&self, node: &Node, depth: usize, values: &mut Vec<Value>) -> FilterResult<String> {
        match node {
            Node::Bool { op, groups } => self.bool_op(*op, groups, depth + 1, values),
            Node::Between(ranges) => between(ranges, values),
            Node::Attr { column, condition } => self.attr(column, condition, values),
        }
    }

    fn bool_op(
        &self,
        op: BoolOp,
        groups: &[WhereTree],
        depth: usize,
        values: &mut Vec<Value>,
    ) -> FilterResult<String> {
        if depth > self.config.max_depth {
            return Err(FilterError::malformed(format!(
                "nesting exceeds {} levels",
                self.config.max_depth
            )));
        }
        if groups.is_empty() {
            return Err(FilterError::malformed(format!("{op} requires at least one mapping")));
        }

        let (inner, outer) = match op {
            BoolOp::And => ("AND", "AND"),
            BoolOp::Or => ("OR", "OR"),
            BoolOp::Not => ("OR", "AND"),
        };

        let mut acc = None;
        for group in groups {
            if group.is_empty() {
                return Err(FilterError::malformed(format!("{op} mapping is empty")));
            }
            let sql = self.mapping(group, inner, depth, values)?;
            let sql = match op {
                BoolOp::Not => format!("NOT ({sql})"),
                _ => sql,
            };
            acc = Some(fold(acc, sql, outer));
        }
        Ok(acc.unwrap_or_default())
    }

    fn attr(
        &self,
        column: &str,
        condition: &Condition,
        values: &mut Vec<Value>,
    ) -> FilterResult<String> {
        if is_reserved(column) {
            return Err(FilterError::malformed(format!(
                "'{column}' is a reserved key and cannot name a column"
            )));
        }
        match condition {
            Condition::Value(value) => Ok(leaf(Operator::Eq, column, value, values)),
            Condition::Operators(ops) if ops.is_empty() => Err(FilterError::malformed(format!(
                "operator mapping on '{column}' is empty"
            ))),
            Condition::Operators(ops) => {
                let mut acc = None;
                for (token, operand) in ops {
                    let op = self.operator(column, token)?;
                    let sql = operand_sql(op, column, operand, values)?;
                    acc = Some(fold(acc, sql, "AND"));
                }
                Ok(acc.unwrap_or_default())
            }
        }
    }

    fn operator(&self, column: &str, token: &str) -> FilterResult<Operator> {
        if let Some(op) = Operator::from_token(token) {
            return Ok(op);
        }
        match self.config.unknown_operator {
            UnknownOperatorPolicy::Reject => Err(FilterError::UnknownOperator {
                column: column.to_string(),
                operator: token.to_string(),
            }),
            UnknownOperatorPolicy::Equality => {
                self.sink.report(
                    &Diagnostic::warn("unknown operator, comparing with equality")
                        .with_field("column", column)
                        .with_field("operator", token),
                );
                Ok(Operator::Eq)
            }
        }
    }
}

fn fold(acc: Option<String>, sql: String, joiner: &str) -> String {
    match acc {
        None => sql,
        Some(prev) => format!("({prev} {joiner} {sql})"),
    }
}

fn between(ranges: &[Range], values: &mut Vec<Value>) -> FilterResult<String> {
    if ranges.is_empty() {
        return Err(FilterError::malformed("BETWEEN mapping is empty"));
    }
    let mut acc = None;
    for range in ranges {
        values.push(range.lower.clone());
        values.push(range.upper.clone());
        acc = Some(fold(acc, format!("({} BETWEEN ? AND ?)", range.column), "AND"));
    }
    Ok(acc.unwrap_or_default())
}

fn operand_sql(
    op: Operator,
    column: &str,
    operand: &Value,
    values: &mut Vec<Value>,
) -> FilterResult<String> {
    if op.takes_range() {
        return match operand.as_array().map(Vec::as_slice) {
            Some([lower, upper]) => {
                let frag = op.fragment(column, operand);
                values.push(lower.clone());
                values.push(upper.clone());
                Ok(frag.sql)
            }
            _ => Err(FilterError::malformed(format!(
                "{op} on '{column}' expects [lower, upper]"
            ))),
        };
    }

    match operand {
        Value::Array(items) if !op.takes_array() => {
            if items.is_empty() {
                return Err(FilterError::malformed(format!(
                    "{op} on '{column}' has an empty operand list"
                )));
            }
            let mut acc = None;
            for item in items {
                acc = Some(fold(acc, leaf(op, column, item, values), "AND"));
            }
            Ok(acc.unwrap_or_default())
        }
        _ => Ok(leaf(op, column, operand, values)),
    }
}

/// Single-operand fragment; binds `value` only when a placeholder is declared.
fn leaf(op: Operator, column: &str, value: &Value, values: &mut Vec<Value>) -> String {
    let frag = op.fragment(column, value);
    if frag.arity == Arity::One {
        values.push(value.clone());
    }
    frag.sql
}
