//! Example turning REST-style list requests into parameterized SELECTs.
//!
//! Run with:
//!   cargo run --example rest_filter -p pgfilter
//!
//! Set `RUST_LOG=pgfilter=warn` to see diagnostics for rejected filters and
//! unknown operators.

use pgfilter::{
    BuilderConfig, FilterResult, JoinKind, QueryBuilder, RequestOption, RequestParams,
    TracingSink, WhereTree,
};
use serde_json::json;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn print_query(label: &str, qb: &QueryBuilder, table: &str, alias: &str) -> FilterResult<()> {
    let query = qb.get_query(table, alias)?;
    println!("[{label}]");
    println!("  SQL:    {}", query.to_numbered_sql());
    println!("  params: {:?}", query.values);
    println!("  key:    {}", qb.key());
    println!();
    Ok(())
}

fn builder() -> QueryBuilder {
    QueryBuilder::new().with_sink(Arc::new(TracingSink::new()))
}

// ─── Single-attribute convenience path ──────────────────────────────────────

fn demo_add_where() -> FilterResult<()> {
    let mut qb = builder();
    qb.add_where("status", "=", "active")
        .add_where("age", "gte", 18)
        .add_where("age", "lt", 65)
        .add_where("email", "ends_with", "@example.com")
        .add_where("deleted_at", "eq", serde_json::Value::Null);
    print_query("add_where", &qb, "users", "")
}

// ─── Nested filter from a request body ──────────────────────────────────────

fn demo_request_body() -> FilterResult<()> {
    let params: RequestParams = serde_json::from_value(json!({
        "page": 3,
        "limit": 25,
        "sort_by": "o.created_at,o.id",
        "sort_dir": "desc"
    }))
    .map_err(|e| pgfilter::FilterError::malformed(e.to_string()))?;
    let option = RequestOption::try_from(params)?;

    let filter = json!({
        "o.state": {"in": ["paid", "shipped"]},
        "OR": [
            {"c.vip": true},
            {"o.total": {"gte": 500}}
        ],
        "NOT": {"c.country": "XX", "c.banned": true},
        "BETWEEN": {"o.created_at": {"2024-01-01": "2024-12-31"}}
    });

    let mut qb = builder();
    qb.add_selection("o.id")
        .add_selection("o.total")
        .add_selection("c.name")
        .add_join(JoinKind::Inner, "customers", "c", "c.id = o.customer_id")
        .add_raw_where_json(&filter);

    let (qb, page, limit) = option.set_pagination_with_sort(qb);
    println!("page {page}, limit {limit}");
    print_query("request body", &qb, "orders", "o")
}

// ─── Aggregation ────────────────────────────────────────────────────────────

fn demo_aggregate() -> FilterResult<()> {
    let mut qb = builder();
    qb.add_selection("status")
        .add_sum("total", "revenue")
        .add_count("customer_id", "buyers")
        .add_raw_where(WhereTree::new().between("created_at", "2024-01-01", "2024-03-31"))
        .add_group(["status"]);
    print_query("aggregate", &qb, "orders", "")
}

// ─── Failure modes ──────────────────────────────────────────────────────────

fn demo_failures() {
    let mut qb = builder();
    qb.add_raw_where_json(&json!({"OR": []}));
    if let Err(err) = qb.get_query("orders", "") {
        println!("[malformed filter] {err}");
    }

    let mut qb = builder();
    qb.add_where("age", "older_than", 30);
    println!(
        "[unknown operator, lenient] {}",
        qb.get_query("users", "").map(|q| q.sql).unwrap_or_default()
    );

    let strict = BuilderConfig::from_toml_str("unknown_operator = \"reject\"").unwrap_or_default();
    let mut qb = builder().with_config(strict);
    qb.add_where("age", "older_than", 30);
    if let Err(err) = qb.get_query("users", "") {
        println!("[unknown operator, strict] {err}");
    }
    println!();
}

fn main() -> FilterResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    demo_add_where()?;
    demo_request_body()?;
    demo_aggregate()?;
    demo_failures();
    Ok(())
}
