//! JSON ⇄ [`WhereTree`] conversion for request-shaped filters.

use super::{BoolOp, Condition, Node, Range, WhereTree};
use crate::error::{FilterError, FilterResult};
use crate::key::stringify;
use serde_json::{Map, Value};

pub(super) fn parse_tree(value: &Value) -> FilterResult<WhereTree> {
    let map = value
        .as_object()
        .ok_or_else(|| FilterError::malformed(format!("expected a mapping, got {}", kind(value))))?;

    let mut tree = WhereTree::new();
    for (key, value) in map {
        let node = match key.as_str() {
            "AND" | "OR" | "NOT" => parse_bool(key.parse()?, value)?,
            "BETWEEN" => parse_between(value)?,
            _ => parse_attr(key, value)?,
        };
        tree.insert(node);
    }
    Ok(tree)
}

fn parse_bool(op: BoolOp, value: &Value) -> FilterResult<Node> {
    let groups = match value {
        Value::Object(_) => vec![parse_group(op, value)?],
        Value::Array(items) if !items.is_empty() => items
            .iter()
            .map(|item| parse_group(op, item))
            .collect::<FilterResult<Vec<_>>>()?,
        Value::Array(_) => {
            return Err(FilterError::malformed(format!("{op} requires at least one mapping")));
        }
        other => {
            return Err(FilterError::malformed(format!(
                "{op} expects a mapping or a list of mappings, got {}",
                kind(other)
            )));
        }
    };
    Ok(Node::Bool { op, groups })
}

fn parse_group(op: BoolOp, value: &Value) -> FilterResult<WhereTree> {
    if !value.is_object() {
        return Err(FilterError::malformed(format!(
            "{op} list entries must be mappings, got {}",
            kind(value)
        )));
    }
    let tree = parse_tree(value)?;
    if tree.is_empty() {
        return Err(FilterError::malformed(format!("{op} mapping is empty")));
    }
    Ok(tree)
}

fn parse_between(value: &Value) -> FilterResult<Node> {
    let columns = value.as_object().ok_or_else(|| {
        FilterError::malformed(format!(
            "BETWEEN expects a mapping of columns, got {}",
            kind(value)
        ))
    })?;

    let mut ranges = Vec::new();
    for (column, bounds) in columns {
        let bounds = match bounds.as_object() {
            Some(bounds) if !bounds.is_empty() => bounds,
            _ => {
                return Err(FilterError::malformed(format!(
                    "BETWEEN on '{column}' expects a {{lower: upper}} mapping"
                )));
            }
        };
        for (lower, upper) in bounds {
            ranges.push(Range {
                column: column.clone(),
                lower: parse_bound(lower),
                upper: upper.clone(),
            });
        }
    }

    if ranges.is_empty() {
        return Err(FilterError::malformed("BETWEEN mapping is empty"));
    }
    Ok(Node::Between(ranges))
}

fn parse_attr(column: &str, value: &Value) -> FilterResult<Node> {
    let condition = match value {
        Value::Object(ops) if ops.is_empty() => {
            return Err(FilterError::malformed(format!(
                "operator mapping on '{column}' is empty"
            )));
        }
        Value::Object(ops) => Condition::Operators(
            ops.iter()
                .map(|(op, operand)| (op.clone(), operand.clone()))
                .collect(),
        ),
        literal => Condition::Value(literal.clone()),
    };
    Ok(Node::Attr {
        column: column.to_string(),
        condition,
    })
}

/// Mapping keys are strings; numeric and boolean lower bounds come back typed.
fn parse_bound(key: &str) -> Value {
    match serde_json::from_str::<Value>(key) {
        Ok(v @ (Value::Number(_) | Value::Bool(_))) => v,
        _ => Value::String(key.to_string()),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

pub(super) fn tree_to_json(tree: &WhereTree) -> Value {
    let mut map = Map::new();
    for node in tree.nodes() {
        map.insert(node.key().to_string(), node_to_json(node));
    }
    Value::Object(map)
}

fn node_to_json(node: &Node) -> Value {
    match node {
        Node::Bool { groups, .. } => match groups.as_slice() {
            [single] => tree_to_json(single),
            many => Value::Array(many.iter().map(tree_to_json).collect()),
        },
        Node::Between(ranges) => {
            let mut columns = Map::new();
            for range in ranges {
                let bounds = columns
                    .entry(range.column.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(bounds) = bounds {
                    bounds.insert(stringify(&range.lower), range.upper.clone());
                }
            }
            Value::Object(columns)
        }
        Node::Attr { condition, .. } => match condition {
            Condition::Value(v) => v.clone(),
            Condition::Operators(ops) => Value::Object(
                ops.iter()
                    .map(|(op, operand)| (op.clone(), operand.clone()))
                    .collect(),
            ),
        },
    }
}

pub(super) fn tree_to_key(tree: &WhereTree) -> Value {
    Value::Array(tree.nodes().iter().map(node_to_key).collect())
}

/// `["bool", op, [groups]]`, `["between", [[column, lower, upper]]]`,
/// `["value", column, literal]` or `["ops", column, [[op, operand]]]`.
fn node_to_key(node: &Node) -> Value {
    let tagged = match node {
        Node::Bool { op, groups } => vec![
            "bool".into(),
            op.as_str().into(),
            Value::Array(groups.iter().map(tree_to_key).collect()),
        ],
        Node::Between(ranges) => vec![
            "between".into(),
            Value::Array(
                ranges
                    .iter()
                    .map(|r| {
                        Value::Array(vec![
                            r.column.as_str().into(),
                            r.lower.clone(),
                            r.upper.clone(),
                        ])
                    })
                    .collect(),
            ),
        ],
        Node::Attr {
            column,
            condition: Condition::Value(v),
        } => vec!["value".into(), column.as_str().into(), v.clone()],
        Node::Attr {
            column,
            condition: Condition::Operators(ops),
        } => vec![
            "ops".into(),
            column.as_str().into(),
            Value::Array(
                ops.iter()
                    .map(|(op, operand)| Value::Array(vec![op.as_str().into(), operand.clone()]))
                    .collect(),
            ),
        ],
    };
    Value::Array(tagged)
}
