//! Convenient imports for typical `fluxsql` usage.
//!
//! ```ignore
//! use fluxsql::prelude::*;
//! ```

pub use crate::{
    Connection, ConnectionConfig, DatePart, DialectKind, Direction, Driver, FromRow, JoinKind,
    LikeSide, QbError, QbResult, QueryBuilder, QueryResult, RawSql, Row, Value,
};
