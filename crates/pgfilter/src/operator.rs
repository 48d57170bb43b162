//! Operator resolution: `(column, operator, value)` → SQL comparison fragment.
//!
//! Fragments use `?` positional placeholders and PostgreSQL constructs
//! (`= ANY(?)`, `ILIKE`, `||` concatenation, `~` regex matching). Porting to
//! another dialect means swapping the templates in [`Operator::fragment`];
//! the where-clause compiler does not depend on them.

use serde_json::Value;
use std::fmt;

/// Comparison operators understood by the resolver.
///
/// # Example
/// ```
/// use pgfilter::Operator;
///
/// assert_eq!(Operator::from_token("<="), Some(Operator::Lte));
/// assert_eq!(Operator::from_token("lte"), Some(Operator::Lte));
/// assert_eq!(Operator::from_token("nope"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=` (null-aware)
    Eq,
    /// `IS` (null-aware)
    Is,
    /// `!=` (null-aware)
    Neq,
    /// `IS NOT` (null-aware)
    IsNot,
    Lt,
    Lte,
    Gt,
    Gte,
    /// `= ANY(?)`, bound value is an array
    In,
    /// `NOT ... = ANY(?)`, bound value is an array
    NotIn,
    Between,
    NotBetween,
    StartsWith,
    EndsWith,
    Substring,
    IStartsWith,
    IEndsWith,
    ISubstring,
    Like,
    ILike,
    NotLike,
    NotILike,
    Regexp,
    NotRegexp,
    IRegexp,
    NotIRegexp,
}

/// Number of placeholders a fragment declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// `IS NULL` / `IS NOT NULL`
    Zero,
    One,
    /// `BETWEEN ? AND ?`
    Two,
}

impl Arity {
    /// The count as a number.
    pub fn count(self) -> usize {
        match self {
            Arity::Zero => 0,
            Arity::One => 1,
            Arity::Two => 2,
        }
    }
}

/// A resolved comparison fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub sql: String,
    pub arity: Arity,
}

impl Fragment {
    fn new(sql: String, arity: Arity) -> Self {
        Self { sql, arity }
    }
}

impl Operator {
    /// Every supported operator, in declaration order.
    pub const ALL: [Operator; 26] = [
        Operator::Eq,
        Operator::Is,
        Operator::Neq,
        Operator::IsNot,
        Operator::Lt,
        Operator::Lte,
        Operator::Gt,
        Operator::Gte,
        Operator::In,
        Operator::NotIn,
        Operator::Between,
        Operator::NotBetween,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::Substring,
        Operator::IStartsWith,
        Operator::IEndsWith,
        Operator::ISubstring,
        Operator::Like,
        Operator::ILike,
        Operator::NotLike,
        Operator::NotILike,
        Operator::Regexp,
        Operator::NotRegexp,
        Operator::IRegexp,
        Operator::NotIRegexp,
    ];

    /// Parse an operator token, including symbolic aliases.
    pub fn from_token(token: &str) -> Option<Self> {
        let op = match token {
            "eq" | "=" => Operator::Eq,
            "is" => Operator::Is,
            "neq" | "!=" | "<>" => Operator::Neq,
            "is_not" => Operator::IsNot,
            "lt" | "<" => Operator::Lt,
            "lte" | "<=" => Operator::Lte,
            "gt" | ">" => Operator::Gt,
            "gte" | ">=" => Operator::Gte,
            "in" => Operator::In,
            "not_in" => Operator::NotIn,
            "between" => Operator::Between,
            "not_between" => Operator::NotBetween,
            "starts_with" => Operator::StartsWith,
            "ends_with" => Operator::EndsWith,
            "substring" => Operator::Substring,
            "i_starts_with" => Operator::IStartsWith,
            "i_ends_with" => Operator::IEndsWith,
            "i_substring" => Operator::ISubstring,
            "like" => Operator::Like,
            "i_like" | "ilike" => Operator::ILike,
            "not_like" => Operator::NotLike,
            "not_ilike" | "not_i_like" => Operator::NotILike,
            "regexp" => Operator::Regexp,
            "not_regexp" => Operator::NotRegexp,
            "i_regexp" => Operator::IRegexp,
            "not_i_regexp" => Operator::NotIRegexp,
            _ => return None,
        };
        Some(op)
    }

    /// Canonical token for this operator.
    pub fn token(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Is => "is",
            Operator::Neq => "neq",
            Operator::IsNot => "is_not",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::Between => "between",
            Operator::NotBetween => "not_between",
            Operator::StartsWith => "starts_with",
            Operator::EndsWith => "ends_with",
            Operator::Substring => "substring",
            Operator::IStartsWith => "i_starts_with",
            Operator::IEndsWith => "i_ends_with",
            Operator::ISubstring => "i_substring",
            Operator::Like => "like",
            Operator::ILike => "i_like",
            Operator::NotLike => "not_like",
            Operator::NotILike => "not_ilike",
            Operator::Regexp => "regexp",
            Operator::NotRegexp => "not_regexp",
            Operator::IRegexp => "i_regexp",
            Operator::NotIRegexp => "not_i_regexp",
        }
    }

    /// Whether the bound value is an array parameter rather than a list of operands.
    pub fn takes_array(self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    /// Whether the operand is a `[lower, upper]` pair.
    pub fn takes_range(self) -> bool {
        matches!(self, Operator::Between | Operator::NotBetween)
    }

    /// Render the fragment for `column`.
    ///
    /// The four null-aware operators degrade to `IS [NOT] NULL` when `value`
    /// is null and then declare no placeholder.
    pub fn fragment(self, column: &str, value: &Value) -> Fragment {
        use Arity::{One, Two, Zero};

        let null = value.is_null();
        let (sql, arity) = match self {
            Operator::Eq if null => (format!("{column} IS NULL"), Zero),
            Operator::Eq => (format!("{column} = ?"), One),
            Operator::Is if null => (format!("{column} IS NULL"), Zero),
            Operator::Is => (format!("{column} IS ?"), One),
            Operator::Neq if null => (format!("{column} IS NOT NULL"), Zero),
            Operator::Neq => (format!("{column} != ?"), One),
            Operator::IsNot if null => (format!("{column} IS NOT NULL"), Zero),
            Operator::IsNot => (format!("{column} IS NOT ?"), One),
            Operator::Lt => (format!("{column} < ?"), One),
            Operator::Lte => (format!("{column} <= ?"), One),
            Operator::Gt => (format!("{column} > ?"), One),
            Operator::Gte => (format!("{column} >= ?"), One),
            Operator::In => (format!("{column} = ANY(?)"), One),
            Operator::NotIn => (format!("NOT {column} = ANY(?)"), One),
            Operator::Between => (format!("{column} BETWEEN ? AND ?"), Two),
            Operator::NotBetween => (format!("{column} NOT BETWEEN ? AND ?"), Two),
            Operator::StartsWith => (format!("{column} LIKE ? || '%'"), One),
            Operator::EndsWith => (format!("{column} LIKE '%' || ?"), One),
            Operator::Substring => (format!("{column} LIKE '%' || ? || '%'"), One),
            Operator::IStartsWith => (format!("{column} ILIKE ? || '%'"), One),
            Operator::IEndsWith => (format!("{column} ILIKE '%' || ?"), One),
            Operator::ISubstring => (format!("{column} ILIKE '%' || ? || '%'"), One),
            Operator::Like => (format!("{column} LIKE ?"), One),
            Operator::ILike => (format!("{column} ILIKE ?"), One),
            Operator::NotLike => (format!("{column} NOT LIKE ?"), One),
            Operator::NotILike => (format!("{column} NOT ILIKE ?"), One),
            Operator::Regexp => (format!("{column} ~ ?"), One),
            Operator::NotRegexp => (format!("{column} !~ ?"), One),
            Operator::IRegexp => (format!("{column} ~* ?"), One),
            Operator::NotIRegexp => (format!("{column} !~* ?"), One),
        };
        Fragment::new(sql, arity)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Resolve an operator token against a column and value.
///
/// Total over all inputs: a token outside the supported set falls back to
/// null-aware equality. Builders configured with
/// [`UnknownOperatorPolicy::Reject`](crate::UnknownOperatorPolicy::Reject)
/// refuse such tokens before they reach this function.
pub fn resolve(column: &str, operator: &str, value: &Value) -> Fragment {
    Operator::from_token(operator)
        .unwrap_or(Operator::Eq)
        .fragment(column, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn placeholder_count_matches_arity() {
        for op in Operator::ALL {
            for value in [json!(1), json!("x"), json!([1, 2]), Value::Null] {
                let frag = op.fragment("col", &value);
                assert_eq!(
                    frag.sql.matches('?').count(),
                    frag.arity.count(),
                    "{op} with {value}: {}",
                    frag.sql
                );
            }
        }
    }

    #[test]
    fn tokens_round_trip() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_token(op.token()), Some(op));
        }
    }

    #[test]
    fn symbolic_aliases() {
        assert_eq!(Operator::from_token("<"), Some(Operator::Lt));
        assert_eq!(Operator::from_token(">="), Some(Operator::Gte));
        assert_eq!(Operator::from_token("!="), Some(Operator::Neq));
        assert_eq!(Operator::from_token("<>"), Some(Operator::Neq));
        assert_eq!(Operator::from_token("ilike"), Some(Operator::ILike));
    }

    #[test]
    fn null_aware_operators() {
        assert_eq!(resolve("x", "eq", &Value::Null).sql, "x IS NULL");
        assert_eq!(resolve("x", "is", &Value::Null).sql, "x IS NULL");
        assert_eq!(resolve("x", "neq", &Value::Null).sql, "x IS NOT NULL");
        assert_eq!(resolve("x", "is_not", &Value::Null).sql, "x IS NOT NULL");
        assert_eq!(resolve("x", "is", &json!(true)).sql, "x IS ?");
        assert_eq!(resolve("x", "is_not", &json!(true)).sql, "x IS NOT ?");
    }

    #[test]
    fn null_under_ordering_operator_keeps_placeholder() {
        let frag = resolve("x", "gt", &Value::Null);
        assert_eq!(frag.sql, "x > ?");
        assert_eq!(frag.arity, Arity::One);
    }

    #[test]
    fn pattern_wildcards_live_in_sql() {
        assert_eq!(resolve("name", "starts_with", &json!("al")).sql, "name LIKE ? || '%'");
        assert_eq!(resolve("name", "ends_with", &json!("al")).sql, "name LIKE '%' || ?");
        assert_eq!(
            resolve("name", "i_substring", &json!("al")).sql,
            "name ILIKE '%' || ? || '%'"
        );
        assert_eq!(resolve("name", "not_ilike", &json!("a%")).sql, "name NOT ILIKE ?");
    }

    #[test]
    fn set_membership_uses_any() {
        assert_eq!(resolve("id", "in", &json!([1, 2])).sql, "id = ANY(?)");
        assert_eq!(resolve("id", "not_in", &json!([1, 2])).sql, "NOT id = ANY(?)");
    }

    #[test]
    fn regex_operators() {
        assert_eq!(resolve("s", "regexp", &json!("^a")).sql, "s ~ ?");
        assert_eq!(resolve("s", "not_regexp", &json!("^a")).sql, "s !~ ?");
        assert_eq!(resolve("s", "i_regexp", &json!("^a")).sql, "s ~* ?");
        assert_eq!(resolve("s", "not_i_regexp", &json!("^a")).sql, "s !~* ?");
    }

    #[test]
    fn unknown_operator_falls_back_to_equality() {
        assert_eq!(resolve("x", "equals", &json!(1)).sql, "x = ?");
        assert_eq!(resolve("x", "equals", &Value::Null).sql, "x IS NULL");
    }
}
