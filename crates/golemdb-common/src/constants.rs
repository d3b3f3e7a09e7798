//! Constants shared across the adapter.

/// String annotation marking an entity as a serialized table row.
pub const ROW_TYPE_KEY: &str = "row_type";

/// `row_type` value for row entities.
pub const ROW_TYPE_JSON: &str = "json";

/// `row_type` value for autoincrement counter entities.
pub const ROW_TYPE_COUNTER: &str = "counter";

/// String annotation carrying the tenant-scoped relation (`<app_id>.<table>`).
pub const RELATION_KEY: &str = "relation";

/// Prefix for per-column index annotations (`idx_<column>`).
pub const INDEX_ANNOTATION_PREFIX: &str = "idx_";

/// Numeric annotation on counter entities holding the next value to assign.
pub const COUNTER_NEXT_KEY: &str = "next";

/// Default block time-to-live applied to row entities when a table does not
/// declare one.
pub const DEFAULT_ENTITY_TTL: u64 = 86_400;

/// BTL applied to autoincrement counter entities. Counters must outlive the
/// rows they number.
pub const COUNTER_ENTITY_TTL: u64 = 1_000_000_000;

/// Default per-operation timeout for backing-store calls, in milliseconds.
pub const DEFAULT_OP_TIMEOUT_MS: u64 = 30_000;

/// Default maximum number of retries for read operations.
pub const DEFAULT_MAX_READ_RETRIES: u32 = 3;

/// Default base backoff between read retries, in milliseconds. Doubled on
/// each attempt.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 100;

/// Builds the index annotation key for a column.
pub fn index_key(column: &str) -> String {
    format!("{INDEX_ANNOTATION_PREFIX}{column}")
}

/// Builds the relation annotation value for a tenant and table.
pub fn relation(app_id: &str, table: &str) -> String {
    format!("{app_id}.{table}")
}

/// Builds the relation annotation value for an autoincrement counter.
pub fn counter_relation(app_id: &str, table: &str, column: &str) -> String {
    format!("{app_id}.{table}.{column}")
}
