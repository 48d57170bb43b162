//! tokio-postgres adapter.
//!
//! The builder emits `?` placeholders and JSON bind values. PostgreSQL wants
//! `$n` placeholders and typed parameters; [`CompiledQuery::to_numbered_sql`]
//! and [`PgParams`] bridge the two.
//!
//! ```ignore
//! let query = qb.get_query("users", "u")?;
//! let params = query.pg_params();
//! let rows = client.query(&query.to_numbered_sql(), &params.as_refs()).await?;
//! ```

use crate::builder::CompiledQuery;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Number, Value};
use std::error::Error;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type};
use uuid::Uuid;

type BoxError = Box<dyn Error + Sync + Send>;

/// Rewrite `?` placeholders to `$1, $2, ...`, leaving quoted literals alone.
///
/// Every other `?` is taken as a placeholder, including any in caller-supplied
/// selection, join or `ON` text. Write the jsonb key operators there as
/// functions (`jsonb_exists(doc, 'k')` instead of `doc ? 'k'`), otherwise the
/// parameter numbering shifts.
pub fn number_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut index = 0usize;
    let mut in_literal = false;
    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_literal = !in_literal;
                out.push(ch);
            }
            '?' if !in_literal => {
                index += 1;
                out.push('$');
                out.push_str(&index.to_string());
            }
            _ => out.push(ch),
        }
    }
    out
}

impl CompiledQuery {
    /// SQL with PostgreSQL `$n` placeholders.
    pub fn to_numbered_sql(&self) -> String {
        number_placeholders(&self.sql)
    }

    /// Bind values wrapped for tokio-postgres.
    pub fn pg_params(&self) -> PgParams {
        PgParams::from_values(&self.values)
    }
}

/// A JSON bind value encoded according to the parameter type the server infers.
///
/// Null binds SQL `NULL`; booleans, strings and numbers use the matching
/// scalar encoding; arrays bind to array parameters element-wise. Any value
/// binds to `json` / `jsonb` as a document.
///
/// Strings are parsed when the parameter is `date`, `time`, `timestamp`,
/// `timestamptz` or `uuid`. A bare date binds to the timestamp types as
/// midnight UTC. `numeric` parameters need the `rust_decimal` feature.
#[derive(Debug, Clone, PartialEq)]
pub struct PgValue(pub Value);

impl ToSql for PgValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        if *ty == Type::JSON || *ty == Type::JSONB {
            return self.0.to_sql(ty, out);
        }
        match &self.0 {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql_checked(ty, out),
            Value::String(s) => string_to_sql(s, ty, out),
            Value::Number(n) => number_to_sql(n, ty, out),
            Value::Array(items) => match ty.kind() {
                Kind::Array(_) => {
                    let items: Vec<PgValue> = items.iter().cloned().map(PgValue).collect();
                    items.to_sql(ty, out)
                }
                _ => Err(format!("cannot bind a list as {ty}").into()),
            },
            Value::Object(_) => Err(format!("cannot bind a mapping as {ty}").into()),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

fn number_to_sql(n: &Number, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    let int = || n.as_i64().ok_or_else(|| format!("{n} is not an integer"));
    let float = || n.as_f64().ok_or_else(|| format!("{n} is not a float"));
    match *ty {
        Type::INT2 => i16::try_from(int()?)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(int()?)?.to_sql(ty, out),
        Type::INT8 => int()?.to_sql(ty, out),
        Type::FLOAT4 => (float()? as f32).to_sql(ty, out),
        Type::FLOAT8 => float()?.to_sql(ty, out),
        Type::TEXT | Type::VARCHAR => n.to_string().to_sql(ty, out),
        #[cfg(feature = "rust_decimal")]
        Type::NUMERIC => parse_decimal(&n.to_string())?.to_sql(ty, out),
        _ => Err(format!("cannot bind number {n} as {ty}").into()),
    }
}

fn string_to_sql(s: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::DATE => parse_date(s)?.to_sql(ty, out),
        Type::TIME => s
            .parse::<NaiveTime>()
            .map_err(|e| format!("'{s}' is not a time: {e}"))?
            .to_sql(ty, out),
        Type::TIMESTAMP => parse_timestamp(s)?.to_sql(ty, out),
        Type::TIMESTAMPTZ => parse_timestamptz(s)?.to_sql(ty, out),
        Type::UUID => Uuid::parse_str(s)
            .map_err(|e| format!("'{s}' is not a uuid: {e}"))?
            .to_sql(ty, out),
        #[cfg(feature = "rust_decimal")]
        Type::NUMERIC => parse_decimal(s)?.to_sql(ty, out),
        _ => s.to_sql_checked(ty, out),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, BoxError> {
    Ok(s.parse::<NaiveDate>()
        .map_err(|e| format!("'{s}' is not a date: {e}"))?)
}

/// `2024-01-01T10:00:00`, `2024-01-01 10:00:00` or a bare date.
fn parse_timestamp(s: &str) -> Result<NaiveDateTime, BoxError> {
    if let Ok(ts) = s.parse::<NaiveDateTime>() {
        return Ok(ts);
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(ts);
    }
    Ok(parse_date(s)?.and_time(NaiveTime::MIN))
}

/// RFC 3339, or a zoneless timestamp taken as UTC.
fn parse_timestamptz(s: &str) -> Result<DateTime<Utc>, BoxError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    Ok(parse_timestamp(s)?.and_utc())
}

#[cfg(feature = "rust_decimal")]
fn parse_decimal(s: &str) -> Result<rust_decimal::Decimal, BoxError> {
    use std::str::FromStr;

    rust_decimal::Decimal::from_str(s)
        .or_else(|_| rust_decimal::Decimal::from_scientific(s))
        .map_err(|e| format!("'{s}' is not a decimal: {e}").into())
}

/// Positional parameters for one statement.
#[derive(Debug, Clone, Default)]
pub struct PgParams {
    values: Vec<PgValue>,
}

impl PgParams {
    pub fn from_values(values: &[Value]) -> Self {
        Self {
            values: values.iter().cloned().map(PgValue).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get all parameters as references for tokio-postgres.
    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.values.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::QueryBuilder;
    use serde_json::json;

    fn encode(value: Value, ty: &Type) -> Result<(IsNull, BytesMut), BoxError> {
        let mut buf = BytesMut::new();
        let is_null = PgValue(value).to_sql_checked(ty, &mut buf)?;
        Ok((is_null, buf))
    }

    #[test]
    fn numbers_placeholders_outside_literals() {
        assert_eq!(
            number_placeholders("(a = ? AND b LIKE '%' || ? || '%')"),
            "(a = $1 AND b LIKE '%' || $2 || '%')"
        );
        assert_eq!(number_placeholders("x = '?' AND y = ?"), "x = '?' AND y = $1");
    }

    #[test]
    fn jsonb_key_operator_is_numbered_like_a_placeholder() {
        assert_eq!(
            number_placeholders("doc ? 'tier' AND a = ?"),
            "doc $1 'tier' AND a = $2"
        );

        let mut qb = QueryBuilder::new();
        qb.add_selection("jsonb_exists(doc, 'tier') AS has_tier")
            .add_where("a", "=", 1);
        let query = qb.get_query("t", "").unwrap();
        assert_eq!(
            query.to_numbered_sql(),
            "SELECT jsonb_exists(doc, 'tier') AS has_tier FROM t WHERE a = $1"
        );
        assert_eq!(query.values.len(), 1);
    }

    #[test]
    fn compiled_query_to_postgres() {
        let mut qb = QueryBuilder::new();
        qb.add_where("status", "=", "active").add_where("id", "in", json!([1, 2]));
        let query = qb.get_query("users", "").unwrap();

        assert_eq!(
            query.to_numbered_sql(),
            "SELECT * FROM users WHERE (status = $1 AND id = ANY($2))"
        );
        let params = query.pg_params();
        assert_eq!(params.len(), 2);
        assert_eq!(params.as_refs().len(), 2);
    }

    #[test]
    fn scalar_encodings() {
        let (_, buf) = encode(json!(5), &Type::INT4).unwrap();
        assert_eq!(&buf[..], &5i32.to_be_bytes());

        let (_, buf) = encode(json!(7), &Type::INT8).unwrap();
        assert_eq!(&buf[..], &7i64.to_be_bytes());

        let (_, buf) = encode(json!(true), &Type::BOOL).unwrap();
        assert_eq!(&buf[..], &[1]);

        let (_, buf) = encode(json!("hi"), &Type::TEXT).unwrap();
        assert_eq!(&buf[..], b"hi");
    }

    #[test]
    fn null_binds_sql_null() {
        let (is_null, buf) = encode(Value::Null, &Type::INT4).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
        assert!(buf.is_empty());
    }

    #[test]
    fn mismatches_are_errors() {
        assert!(encode(json!(70000), &Type::INT2).is_err());
        assert!(encode(json!(1.5), &Type::INT4).is_err());
        assert!(encode(json!("x"), &Type::INT4).is_err());
        assert!(encode(json!({"a": 1}), &Type::TEXT).is_err());
        assert!(encode(json!([1, 2]), &Type::INT4).is_err());
    }

    #[test]
    fn temporal_strings() {
        // 2024-01-01 is 8766 days after the 2000-01-01 epoch.
        let (_, buf) = encode(json!("2024-01-01"), &Type::DATE).unwrap();
        assert_eq!(&buf[..], &8766i32.to_be_bytes());

        let (_, rfc) = encode(json!("2024-01-01T00:00:00Z"), &Type::TIMESTAMPTZ).unwrap();
        let (_, offset) = encode(json!("2024-01-01T02:00:00+02:00"), &Type::TIMESTAMPTZ).unwrap();
        let (_, bare) = encode(json!("2024-01-01"), &Type::TIMESTAMPTZ).unwrap();
        assert_eq!(rfc, offset);
        assert_eq!(rfc, bare);

        let (_, spaced) = encode(json!("2024-01-01 12:30:00"), &Type::TIMESTAMP).unwrap();
        let (_, iso) = encode(json!("2024-01-01T12:30:00"), &Type::TIMESTAMP).unwrap();
        assert_eq!(spaced, iso);

        assert!(encode(json!("12:30:00"), &Type::TIME).is_ok());
        assert!(encode(json!(["2024-01-01", "2024-12-31"]), &Type::DATE_ARRAY).is_ok());
    }

    #[test]
    fn between_bounds_bind_to_a_date_column() {
        let mut qb = QueryBuilder::new();
        qb.add_raw_where_json(&json!({"BETWEEN": {"created_at": {"2024-01-01": "2024-12-31"}}}));
        let query = qb.get_query("orders", "").unwrap();
        let params = query.pg_params();
        for (value, ty) in params.as_refs().into_iter().zip([Type::DATE, Type::TIMESTAMPTZ]) {
            let mut buf = BytesMut::new();
            assert!(value.to_sql_checked(&ty, &mut buf).is_ok(), "{ty}");
        }
    }

    #[test]
    fn uuid_strings() {
        let id = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        let (_, buf) = encode(json!(id), &Type::UUID).unwrap();
        assert_eq!(&buf[..], Uuid::parse_str(id).unwrap().as_bytes());
        assert!(encode(json!("not-a-uuid"), &Type::UUID).is_err());
    }

    #[test]
    fn malformed_temporal_strings_are_errors() {
        assert!(encode(json!("2024-13-01"), &Type::DATE).is_err());
        assert!(encode(json!("yesterday"), &Type::TIMESTAMPTZ).is_err());
    }

    #[cfg(feature = "rust_decimal")]
    #[test]
    fn numeric_parameters() {
        use rust_decimal::Decimal;
        use std::str::FromStr;

        let expected = |s: &str| {
            let mut buf = BytesMut::new();
            Decimal::from_str(s).unwrap().to_sql(&Type::NUMERIC, &mut buf).unwrap();
            buf
        };

        assert_eq!(encode(json!(9.99), &Type::NUMERIC).unwrap().1, expected("9.99"));
        assert_eq!(encode(json!(18), &Type::NUMERIC).unwrap().1, expected("18"));
        assert_eq!(encode(json!("12.50"), &Type::NUMERIC).unwrap().1, expected("12.50"));
        assert!(encode(json!("ten"), &Type::NUMERIC).is_err());
    }

    #[cfg(not(feature = "rust_decimal"))]
    #[test]
    fn numeric_needs_the_decimal_feature() {
        assert!(encode(json!(9.99), &Type::NUMERIC).is_err());
    }

    #[test]
    fn arrays_and_documents() {
        assert!(encode(json!([1, 2, 3]), &Type::INT4_ARRAY).is_ok());

        let (_, buf) = encode(json!({"a": 1}), &Type::JSONB).unwrap();
        assert_eq!(buf[0], 1);
        assert_eq!(&buf[1..], br#"{"a":1}"#);
    }
}
