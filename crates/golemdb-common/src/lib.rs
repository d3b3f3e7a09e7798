//! # golemdb-common
//!
//! Shared building blocks for the GolemDB SQL adapter:
//! - the unified error type and DB-adapter error classification
//! - constants for reserved annotation keys and operational defaults

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod error;

pub use error::{DbError, DbResult, ErrorKind};
