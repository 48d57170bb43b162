//! Convenient imports for typical `pgfilter` usage.
//!
//! ```
//! use pgfilter::prelude::*;
//!
//! let mut qb = QueryBuilder::new();
//! qb.add_sort(Direction::Asc, ["id"]);
//! ```

pub use crate::{
    Direction, FilterError, FilterResult, JoinKind, Pagination, QueryBuilder, RequestOption,
    WhereTree,
};

#[cfg(feature = "postgres")]
pub use crate::PgParams;
