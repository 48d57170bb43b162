//! Couples a list request's pagination and sorting to a [`QueryBuilder`].

use crate::builder::QueryBuilder;
use crate::clause::Direction;
use crate::error::{FilterError, FilterResult};
use crate::pagination::Pagination;
use serde::Deserialize;

/// Pagination and sort options taken from a request.
///
/// # Example
///
/// ```
/// use pgfilter::{Direction, Pagination, QueryBuilder, RequestOption};
///
/// let mut opt = RequestOption::new();
/// opt.set_pagination(Pagination::new(2, 25))
///     .set_sort_by(Direction::Asc, ["name"]);
///
/// let (qb, page, limit) = opt.set_pagination_with_sort(QueryBuilder::new());
/// assert_eq!((page, limit), (2, 25));
/// assert_eq!(
///     qb.get_query("users", "").unwrap().sql,
///     "SELECT * FROM users ORDER BY name ASC LIMIT 25 OFFSET 25"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOption {
    pagination: Option<Pagination>,
    sort_by: Vec<(String, Direction)>,
}

impl RequestOption {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.pagination
    }

    /// Sort columns in the order they were first requested.
    pub fn sort_by(&self) -> &[(String, Direction)] {
        &self.sort_by
    }

    pub fn set_pagination(&mut self, pagination: Pagination) -> &mut Self {
        self.pagination = Some(pagination);
        self
    }

    /// Sort `columns` in `direction`. A column already present keeps its
    /// position and takes the new direction.
    pub fn set_sort_by<I, S>(&mut self, direction: Direction, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for column in columns {
            let column = column.into();
            match self.sort_by.iter_mut().find(|(c, _)| *c == column) {
                Some(slot) => slot.1 = direction,
                None => self.sort_by.push((column, direction)),
            }
        }
        self
    }

    /// Like [`set_sort_by`](Self::set_sort_by) with a textual direction.
    ///
    /// Fails with [`FilterError::InvalidSortDirection`] and leaves the
    /// options untouched when `direction` is not `asc` / `desc`.
    pub fn set_sort_by_name<I, S>(&mut self, direction: &str, columns: I) -> FilterResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let direction: Direction = direction.parse()?;
        Ok(self.set_sort_by(direction, columns))
    }

    /// Apply to `builder` and return it with the resolved page and limit
    /// (both 0 without pagination).
    pub fn set_pagination_with_sort(&self, mut builder: QueryBuilder) -> (QueryBuilder, i64, i64) {
        let (page, limit) = self.apply(&mut builder);
        (builder, page, limit)
    }

    /// In-place variant of [`set_pagination_with_sort`](Self::set_pagination_with_sort).
    pub fn apply(&self, builder: &mut QueryBuilder) -> (i64, i64) {
        if let Some(pagination) = self.pagination {
            builder.add_pagination(pagination);
        }
        for (column, direction) in &self.sort_by {
            builder.add_sort(*direction, [column.as_str()]);
        }
        self.pagination
            .map(|p| (p.page(), p.limit()))
            .unwrap_or((0, 0))
    }
}

/// Query-string shaped list parameters, e.g. `?page=2&limit=20&sort_by=name,id&sort_dir=desc`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RequestParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Comma-separated columns.
    pub sort_by: Option<String>,
    /// `asc` (default) or `desc`.
    pub sort_dir: Option<String>,
}

impl TryFrom<RequestParams> for RequestOption {
    type Error = FilterError;

    fn try_from(params: RequestParams) -> Result<Self, Self::Error> {
        let direction = match params.sort_dir.as_deref() {
            Some(dir) => dir.parse()?,
            None => Direction::Asc,
        };

        let mut opt = RequestOption::new();
        if params.page.is_some() || params.limit.is_some() {
            opt.set_pagination(Pagination::new(
                params.page.unwrap_or(1),
                params.limit.unwrap_or(0),
            ));
        }
        if let Some(sort_by) = params.sort_by.as_deref() {
            let columns = sort_by.split(',').map(str::trim).filter(|c| !c.is_empty());
            opt.set_sort_by(direction, columns);
        }
        Ok(opt)
    }
}
