//! Where-tree parsing and compilation tests.

use super::*;
use crate::config::{BuilderConfig, UnknownOperatorPolicy};
use crate::diagnostics::{CollectingSink, Level};
use serde_json::json;

fn compiled(filter: Value) -> CompiledWhere {
    compile(&WhereTree::from_json(&filter).unwrap()).unwrap()
}

fn parse_err(filter: Value) -> FilterError {
    WhereTree::from_json(&filter).unwrap_err()
}

// ==================== Compilation ====================

#[test]
fn test_empty_tree_compiles_to_nothing() {
    let out = compile(&WhereTree::new()).unwrap();
    assert!(out.is_empty());
    assert!(out.values.is_empty());
}

#[test]
fn test_left_fold_parenthesization() {
    let out = compiled(json!({"a": {"gte": 1, "lte": 5}, "b": null, "c": "x"}));
    assert_eq!(out.sql, "(((a >= ? AND a <= ?) AND b IS NULL) AND c = ?)");
    assert_eq!(out.values, vec![json!(1), json!(5), json!("x")]);
}

#[test]
fn test_and_single_mapping() {
    let out = compiled(json!({"AND": {"a": 1, "b": 2}}));
    assert_eq!(out.sql, "(a = ? AND b = ?)");
}

#[test]
fn test_or_sequence() {
    let out = compiled(json!({"OR": [{"a": 1, "b": 2}, {"c": 3}]}));
    assert_eq!(out.sql, "((a = ? OR b = ?) OR c = ?)");
    assert_eq!(out.values, vec![json!(1), json!(2), json!(3)]);
}

#[test]
fn test_not_sequence_negates_each_group() {
    let out = compiled(json!({"NOT": [{"a": 1}, {"b": 2, "c": 3}]}));
    assert_eq!(out.sql, "(NOT (a = ?) AND NOT ((b = ? OR c = ?)))");
    assert_eq!(out.values, vec![json!(1), json!(2), json!(3)]);
}

#[test]
fn test_combinator_beside_attributes() {
    let out = compiled(json!({"status": "open", "OR": {"owner": 7, "public": true}}));
    assert_eq!(out.sql, "(status = ? AND (owner = ? OR public = ?))");
    assert_eq!(out.values, vec![json!("open"), json!(7), json!(true)]);
}

#[test]
fn test_between_ranges() {
    let out = compiled(json!({
        "BETWEEN": {
            "age": {"18": 30},
            "created_at": {"2024-01-01": "2024-12-31"}
        }
    }));
    assert_eq!(
        out.sql,
        "((age BETWEEN ? AND ?) AND (created_at BETWEEN ? AND ?))"
    );
    assert_eq!(
        out.values,
        vec![json!(18), json!(30), json!("2024-01-01"), json!("2024-12-31")]
    );
}

#[test]
fn test_between_bound_keys_are_typed() {
    let tree = WhereTree::from_json(&json!({"BETWEEN": {"flag": {"false": true}, "x": {"1.5": 2}}}))
        .unwrap();
    match tree.get("BETWEEN") {
        Some(Node::Between(ranges)) => {
            assert_eq!(ranges[0].lower, json!(false));
            assert_eq!(ranges[1].lower, json!(1.5));
        }
        other => panic!("unexpected node: {other:?}"),
    }
}

#[test]
fn test_placeholders_match_values_for_every_operator() {
    for op in crate::operator::Operator::ALL {
        let operand = if op.takes_range() || op.takes_array() {
            json!([1, 2])
        } else {
            json!("v")
        };
        let tree = WhereTree::new().op("col", op.token(), operand);
        let out = compile(&tree).unwrap();
        assert_eq!(
            out.sql.matches('?').count(),
            out.values.len(),
            "{op}: {}",
            out.sql
        );
    }
}

#[test]
fn test_literal_object_binds_as_value() {
    let tree = WhereTree::new().eq("meta", json!({"gte": 1}));
    let out = compile(&tree).unwrap();
    assert_eq!(out.sql, "meta = ?");
    assert_eq!(out.values, vec![json!({"gte": 1})]);
}

// ==================== Malformed trees ====================

#[test]
fn test_empty_groups_are_malformed() {
    assert!(compile(&WhereTree::new().or(vec![])).unwrap_err().is_malformed());
    assert!(
        compile(&WhereTree::new().and(vec![WhereTree::new()]))
            .unwrap_err()
            .is_malformed()
    );
}

#[test]
fn test_empty_operator_mapping_is_malformed() {
    let mut tree = WhereTree::new();
    tree.insert(Node::Attr {
        column: "a".into(),
        condition: Condition::Operators(Vec::new()),
    });
    assert!(compile(&tree).unwrap_err().is_malformed());

    let mut tree = WhereTree::new();
    tree.insert(Node::Between(Vec::new()));
    assert!(compile(&tree).unwrap_err().is_malformed());
}

#[test]
fn test_empty_operand_list_is_malformed() {
    let tree = WhereTree::new().op("a", "gt", json!([]));
    assert!(compile(&tree).unwrap_err().is_malformed());
}

#[test]
fn test_depth_limit() {
    let mut tree = WhereTree::new().eq("a", 1);
    for _ in 0..4 {
        tree = WhereTree::new().and(vec![tree]);
    }

    let sink = CollectingSink::new();
    let strict = BuilderConfig::new().with_max_depth(3);
    let err = WhereCompiler::new(&strict, &sink).compile(&tree).unwrap_err();
    assert!(err.is_malformed());

    let loose = BuilderConfig::new().with_max_depth(4);
    assert_eq!(
        WhereCompiler::new(&loose, &sink).compile(&tree).unwrap().sql,
        "a = ?"
    );
}

#[test]
fn test_unknown_operator_policies() {
    let tree = WhereTree::new().op("a", "approximately", 3);

    let sink = CollectingSink::new();
    let lenient = BuilderConfig::new();
    let out = WhereCompiler::new(&lenient, &sink).compile(&tree).unwrap();
    assert_eq!(out.sql, "a = ?");
    assert_eq!(sink.entries()[0].level, Level::Warn);

    let strict = BuilderConfig::new().with_unknown_operator(UnknownOperatorPolicy::Reject);
    let err = WhereCompiler::new(&strict, &sink).compile(&tree).unwrap_err();
    assert!(err.is_unknown_operator());
}

// ==================== JSON ====================

#[test]
fn test_json_shape_errors() {
    assert!(parse_err(json!([1, 2])).is_malformed());
    assert!(parse_err(json!({"OR": 5})).is_malformed());
    assert!(parse_err(json!({"OR": []})).is_malformed());
    assert!(parse_err(json!({"OR": [{}]})).is_malformed());
    assert!(parse_err(json!({"NOT": [1]})).is_malformed());
    assert!(parse_err(json!({"AND": {}})).is_malformed());
    assert!(parse_err(json!({"BETWEEN": {}})).is_malformed());
    assert!(parse_err(json!({"BETWEEN": {"age": 5}})).is_malformed());
    assert!(parse_err(json!({"BETWEEN": {"age": {}}})).is_malformed());
    assert!(parse_err(json!({"a": {}})).is_malformed());
}

#[test]
fn test_json_error_message_names_the_shape() {
    let err = parse_err(json!({"OR": "x"}));
    assert_eq!(
        err.to_string(),
        "Malformed where clause: OR expects a mapping or a list of mappings, got a string"
    );
}

#[test]
fn test_canonical_json_round_trip() {
    let tree = WhereTree::new()
        .eq("status", "active")
        .op("age", "gte", 18)
        .between("score", 1, 10)
        .or(vec![
            WhereTree::new().eq("a", 1),
            WhereTree::new().eq("b", Value::Null),
        ])
        .not(vec![WhereTree::new().op("name", "like", "x%")]);

    let value = tree.to_json();
    assert_eq!(
        value,
        json!({
            "status": "active",
            "age": {"gte": 18},
            "BETWEEN": {"score": {"1": 10}},
            "OR": [{"a": 1}, {"b": null}],
            "NOT": {"name": {"like": "x%"}}
        })
    );
    assert_eq!(WhereTree::from_json(&value).unwrap(), tree);
}

#[test]
fn test_key_value_is_tagged() {
    let tree = WhereTree::new()
        .eq("meta", json!({"gte": 1}))
        .op("age", "gte", 18)
        .between("code", "18", 30)
        .not(vec![WhereTree::new().eq("a", 1)]);
    assert_eq!(
        tree.key_value(),
        json!([
            ["value", "meta", {"gte": 1}],
            ["ops", "age", [["gte", 18]]],
            ["between", [["code", "18", 30]]],
            ["bool", "NOT", [[["value", "a", 1]]]]
        ])
    );
}

#[test]
fn test_key_value_separates_what_json_merges() {
    let literal = WhereTree::new().eq("meta", json!({"gte": 1}));
    let operator = WhereTree::new().op("meta", "gte", 1);
    assert_eq!(literal.to_json(), operator.to_json());
    assert_ne!(literal.key_value(), operator.key_value());

    let text = WhereTree::new().between("code", "18", "30");
    let number = WhereTree::new().between("code", 18, "30");
    assert_eq!(text.to_json(), number.to_json());
    assert_ne!(text.key_value(), number.key_value());
}

#[test]
fn test_serde_impls() {
    let tree: WhereTree = serde_json::from_str(r#"{"a":{"in":[1,2]},"OR":{"b":1}}"#).unwrap();
    assert_eq!(tree.len(), 2);
    assert_eq!(
        serde_json::to_string(&tree).unwrap(),
        r#"{"a":{"in":[1,2]},"OR":{"b":1}}"#
    );

    let err = serde_json::from_str::<WhereTree>(r#"{"OR":[]}"#).unwrap_err();
    assert!(err.to_string().contains("OR requires at least one mapping"));
}

// ==================== Mutation ====================

#[test]
fn test_insert_replaces_in_place() {
    let mut tree = WhereTree::new().eq("a", 1).eq("b", 2);
    tree.merge(WhereTree::new().eq("a", 3).eq("c", 4));

    let keys: Vec<_> = tree.nodes().iter().map(Node::key).collect();
    assert_eq!(keys, ["a", "b", "c"]);
    assert_eq!(compile(&tree).unwrap().values, vec![json!(3), json!(2), json!(4)]);
}

#[test]
fn test_set_operator_merges_and_replaces() {
    let tree = WhereTree::new()
        .op("age", "gte", 18)
        .op("age", "lte", 65)
        .op("age", "gte", 21);
    assert_eq!(
        tree.get("age"),
        Some(&Node::Attr {
            column: "age".into(),
            condition: Condition::Operators(vec![
                ("gte".into(), json!(21)),
                ("lte".into(), json!(65)),
            ]),
        })
    );

    let tree = WhereTree::new().eq("age", 30).op("age", "lt", 40);
    assert_eq!(compile(&tree).unwrap().sql, "age < ?");
}

#[test]
fn test_set_range_replaces_by_column() {
    let tree = WhereTree::new()
        .between("age", 1, 2)
        .between("score", 3, 4)
        .between("age", 5, 6);
    let out = compile(&tree).unwrap();
    assert_eq!(out.sql, "((age BETWEEN ? AND ?) AND (score BETWEEN ? AND ?))");
    assert_eq!(out.values, vec![json!(5), json!(6), json!(3), json!(4)]);
}

#[test]
fn test_reserved_attribute_keeps_structural_node() {
    let mut tree = WhereTree::new().or(vec![WhereTree::new().eq("a", 1)]);
    tree.set_value("OR", 1);
    assert_eq!(tree.len(), 2);
    assert!(matches!(tree.nodes()[0], Node::Bool { op: BoolOp::Or, .. }));
    assert!(compile(&tree).unwrap_err().is_malformed());

    let mut tree = WhereTree::new().between("age", 18, 30);
    tree.set_value("BETWEEN", json!({"age": {"0": 99}}));
    assert_eq!(
        tree.nodes()[0],
        Node::Between(vec![Range {
            column: "age".into(),
            lower: json!(18),
            upper: json!(30),
        }])
    );
    let err = compile(&tree).unwrap_err();
    assert!(err.to_string().contains("'BETWEEN' is a reserved key"));
}

#[test]
fn test_reserved_names() {
    for key in RESERVED_KEYS {
        assert!(is_reserved(key));
    }
    assert!(!is_reserved("and"));
    assert!(!is_reserved("status"));
}

#[test]
fn test_bool_op_parsing() {
    assert_eq!("NOT".parse::<BoolOp>().unwrap(), BoolOp::Not);
    assert_eq!(
        "XOR".parse::<BoolOp>().unwrap_err(),
        FilterError::InvalidBooleanOperator("XOR".into())
    );
}
