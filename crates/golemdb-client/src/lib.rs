//! # golemdb-client
//!
//! The backing-store surface consumed by the GolemDB SQL adapter.
//!
//! GolemBase is modeled as an opaque asynchronous RPC endpoint: entities
//! carry payload bytes, a block time-to-live, and two maps of typed
//! annotations, and are queried with a small boolean predicate language.
//! This crate defines:
//!
//! - the entity/receipt wire shapes ([`entity`])
//! - the async [`GolemBaseClient`] trait and the [`RetryPolicy`] wrapper
//!   that applies per-call timeouts and read retries ([`client`])
//! - [`MockClient`], an in-memory store with a full predicate-grammar
//!   evaluator, used by the adapter's test suites ([`mock`])
//!
//! Transport implementations (JSON-RPC over HTTP/WebSocket) live outside
//! this workspace; anything implementing [`GolemBaseClient`] plugs in.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod entity;
pub mod mock;

pub use client::{GolemBaseClient, RetryPolicy};
pub use entity::{Entity, EntityMetadata, EntityUpdate, QueryHit, Receipt};
pub use mock::MockClient;
