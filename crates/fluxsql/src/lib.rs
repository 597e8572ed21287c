//! # fluxsql
//!
//! A fluent, mutable SQL query builder for MySQL, PostgreSQL and SQLite.
//!
//! ## Features
//!
//! - **One builder, every statement**: SELECT / INSERT / UPDATE / DELETE / REPLACE / TRUNCATE
//! - **Condition grammar**: operators in the field string (`"age >="`, `"tags @"`, `"name %"`)
//! - **Alias and prefix resolution**: `jobs.id` becomes `j.id` after `from("jobs j")`
//! - **Dialect policies**: IGNORE forms, LIMIT legality, REPLACE emulation, ILIKE, random order
//! - **Subqueries**: FROM / SELECT / EXISTS / IN, from a callback or another builder
//! - **Aggregates**: `count` / `sum` / `avg` / `min` / `max`, with derived tables where needed
//!
//! ## Quick start
//!
//! ```ignore
//! use fluxsql::prelude::*;
//!
//! let conn = Connection::new(ConnectionConfig::new(DialectKind::MySql));
//!
//! let sql = conn
//!     .table("jobs j")
//!     .where_("jobs.id", 3)?
//!     .or_where("name", "dev")?
//!     .sql()?;
//! assert_eq!(sql, "SELECT * FROM jobs AS j WHERE j.id = 3 OR name = 'dev'");
//!
//! // Writes
//! let sql = conn
//!     .table("jobs")
//!     .insert([("name", Value::from("dev")), ("level", Value::from(2))])?
//!     .sql()?;
//! assert_eq!(sql, "INSERT INTO jobs (name,level) VALUES ('dev',2)");
//! ```
//!
//! Executing statements needs a [`Driver`] attached with [`Connection::with_driver`].

pub mod builder;
pub mod compiled;
pub mod condition;
pub mod config;
pub mod connection;
pub mod dialect;
pub mod error;
pub mod ident;
pub mod prelude;
pub mod row;
pub mod value;

pub use builder::{Direction, JoinKind, QueryBuilder};
pub use compiled::{CompiledQuery, ReplaceFallback, StatementKind};
pub use condition::{Connector, LikeSide, Operator};
pub use config::ConnectionConfig;
pub use connection::{AliasRegistry, Connection, Driver};
pub use dialect::{DatePart, Dialect, DialectKind};
pub use error::{QbError, QbResult};
pub use ident::FieldResolver;
pub use row::{FromRow, QueryResult, Row};
pub use value::{RawSql, Value};
