//! # golemdb-sql
//!
//! The core of the GolemDB SQL adapter: everything between SQL text and
//! backing-store entities.
//!
//! - [`parser`] — SQL parsing and lowering into a typed internal form
//! - [`bind`] — named-parameter substitution (`%(name)s`, `:name`)
//! - [`codec`] — order-preserving encodings of SQL values onto the store's
//!   annotation types
//! - [`value`] — the runtime value representation and its JSON forms
//! - [`catalog`] — the persistent per-schema table registry
//! - [`translate`] — lowering analyzed statements into predicate strings,
//!   post-filters and write plans
//! - [`row`] — row ↔ entity serialization

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bind;
pub mod catalog;
pub mod codec;
pub mod parser;
pub mod row;
pub mod translate;
pub mod value;

pub use value::Value;
