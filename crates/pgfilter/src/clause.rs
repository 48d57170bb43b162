//! `JOIN`, `GROUP BY`, `ORDER BY` and `LIMIT/OFFSET` assemblers.
//!
//! Each assembler is stateless and returns the clause body; the builder owns
//! the keywords' placement and omits clauses whose input is empty.

use crate::error::FilterError;
use crate::pagination::Pagination;
use std::fmt;
use std::str::FromStr;

/// Join kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
        }
    }
}

/// A join specification. Table, alias and condition are caller-supplied SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub alias: String,
    pub on: String,
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} JOIN {}", self.kind.as_str(), self.table)?;
        if !self.alias.is_empty() {
            write!(f, " {}", self.alias)?;
        }
        write!(f, " ON {}", self.on)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = FilterError;

    /// Case-insensitive `asc` / `desc`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Direction::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Direction::Desc)
        } else {
            Err(FilterError::InvalidSortDirection(s.to_string()))
        }
    }
}

/// `<KIND> JOIN <table>[ <alias>] ON <cond>` per join, in order.
pub fn join_clause(joins: &[Join]) -> String {
    joins
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Comma-joined group columns.
pub fn group_clause(columns: &[String]) -> String {
    columns.join(", ")
}

/// Comma-joined `<column> <DIRECTION>` entries.
pub fn sort_clause(sorts: &[(String, Direction)]) -> String {
    sorts
        .iter()
        .map(|(column, dir)| format!("{column} {dir}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Literal `LIMIT n OFFSET m`; both are server-side integers, never bound.
pub fn pagination_clause(pagination: &Pagination) -> String {
    format!(
        "LIMIT {} OFFSET {}",
        pagination.limit(),
        pagination.offset()
    )
}
