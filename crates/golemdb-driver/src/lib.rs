//! # golemdb-driver
//!
//! The adapter façade: what a host application or ORM binding talks to.
//!
//! A [`Connection`] is opened from validated [`ConnectionParams`] plus any
//! backing-store client implementation; it loads the schema catalog for the
//! connection's `schema_id` and hands out [`Cursor`]s. Cursors execute SQL
//! with named parameters (`%(name)s` or `:name`), expose fetched rows, and
//! surface errors through the `golemdb-common` taxonomy.
//!
//! Statement execution is strictly sequential per cursor; the only
//! suspension points are backing-store calls. There are no transactions:
//! writes apply immediately, `commit` is a no-op and `rollback` can undo
//! nothing.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod connection;
mod cursor;
mod executor;
mod params;

pub use connection::{ConnectOptions, Connection};
pub use cursor::{ColumnDesc, Cursor};
pub use params::ConnectionParams;

pub use golemdb_common::{DbError, DbResult, ErrorKind};
pub use golemdb_sql::bind::{ParamValue, Params};
pub use golemdb_sql::Value;
