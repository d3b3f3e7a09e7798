//! The asynchronous backing-store client trait and its retry wrapper.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use golemdb_common::constants::{
    DEFAULT_MAX_READ_RETRIES, DEFAULT_OP_TIMEOUT_MS, DEFAULT_RETRY_BACKOFF_MS,
};
use golemdb_common::{DbError, DbResult};

use super::entity::{Entity, EntityMetadata, EntityUpdate, QueryHit, Receipt};

/// Asynchronous RPC surface of the GolemBase store.
///
/// All operations suspend at the network boundary; everything else in the
/// adapter is synchronous. Implementations must be safe to share behind an
/// `Arc` across cursors of one connection.
#[async_trait]
pub trait GolemBaseClient: Send + Sync {
    /// Creates a batch of entities; one receipt per entity, in order.
    async fn create_entities(&self, entities: Vec<Entity>) -> DbResult<Vec<Receipt>>;

    /// Replaces a batch of existing entities in place.
    async fn update_entities(&self, updates: Vec<EntityUpdate>) -> DbResult<Vec<Receipt>>;

    /// Deletes entities by key.
    async fn delete_entities(&self, keys: Vec<Vec<u8>>) -> DbResult<Vec<Receipt>>;

    /// Runs a predicate query and returns all matching entities.
    async fn query_entities(&self, predicate: &str) -> DbResult<Vec<QueryHit>>;

    /// Fetches annotation and expiry metadata for one entity.
    async fn get_entity_metadata(&self, key: &[u8]) -> DbResult<EntityMetadata>;

    /// Fetches the payload bytes of one entity.
    async fn get_storage_value(&self, key: &[u8]) -> DbResult<Vec<u8>>;

    /// Returns the address of the account this client authenticates as.
    async fn get_account_address(&self) -> DbResult<String>;
}

/// Timeout and retry configuration applied around every client call.
///
/// Reads are retried with exponential backoff on retryable failures; writes
/// never are, because the store offers no idempotency tokens and a timed-out
/// write may still have landed.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Per-call timeout.
    pub op_timeout: Duration,
    /// Maximum retries for read operations.
    pub max_read_retries: u32,
    /// Backoff before the first retry. Doubled after each attempt.
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            op_timeout: Duration::from_millis(DEFAULT_OP_TIMEOUT_MS),
            max_read_retries: DEFAULT_MAX_READ_RETRIES,
            base_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// Runs a read operation with timeout and bounded retries.
    pub async fn read<T, F, Fut>(&self, op_name: &str, mut op: F) -> DbResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = DbResult<T>>,
    {
        let mut backoff = self.base_backoff;
        let mut attempt = 0u32;

        loop {
            match self.once(op()).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_read_retries => {
                    attempt += 1;
                    warn!(
                        op = op_name,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "retrying read operation"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Runs a write operation with timeout and no retries.
    pub async fn write<T, Fut>(&self, op_name: &str, op: Fut) -> DbResult<T>
    where
        Fut: std::future::Future<Output = DbResult<T>>,
    {
        debug!(op = op_name, "dispatching write operation");
        self.once(op).await
    }

    async fn once<T, Fut>(&self, op: Fut) -> DbResult<T>
    where
        Fut: std::future::Future<Output = DbResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(DbError::Timeout {
                duration_ms: self.op_timeout.as_millis() as u64,
            }),
        }
    }
}
