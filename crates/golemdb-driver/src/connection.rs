//! Connection management.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use golemdb_client::{GolemBaseClient, RetryPolicy};
use golemdb_common::{DbError, DbResult};
use golemdb_sql::catalog::SchemaCatalog;

use super::cursor::Cursor;
use super::params::ConnectionParams;

/// Optional knobs for [`Connection::connect_with`].
#[derive(Debug, Default)]
pub struct ConnectOptions {
    /// Overrides the catalog directory (tests point this at a temp dir).
    pub schema_dir: Option<PathBuf>,
    /// Timeout/retry policy for backing-store calls.
    pub retry: Option<RetryPolicy>,
}

/// A connection to one tenant's view of the backing store.
///
/// The connection owns the schema catalog and the client handle; cursors
/// borrow it. Statements across cursors of one connection are not ordered
/// with respect to each other — callers serialize DDL themselves.
pub struct Connection {
    params: ConnectionParams,
    client: Arc<dyn GolemBaseClient>,
    retry: RetryPolicy,
    catalog: RwLock<SchemaCatalog>,
    account_address: String,
    closed: AtomicBool,
}

impl Connection {
    /// Opens a connection with default options.
    pub async fn connect(
        params: ConnectionParams,
        client: Arc<dyn GolemBaseClient>,
    ) -> DbResult<Self> {
        Self::connect_with(params, client, ConnectOptions::default()).await
    }

    /// Opens a connection, loading the catalog for `schema_id` and probing
    /// the client for its account address.
    pub async fn connect_with(
        params: ConnectionParams,
        client: Arc<dyn GolemBaseClient>,
        options: ConnectOptions,
    ) -> DbResult<Self> {
        let retry = options.retry.unwrap_or_default();

        let catalog = match &options.schema_dir {
            Some(dir) => SchemaCatalog::open_in(dir, &params.schema_id)?,
            None => SchemaCatalog::open(&params.schema_id)?,
        };

        let account_address = retry
            .read("get_account_address", || client.get_account_address())
            .await?;

        info!(
            app_id = %params.app_id,
            schema_id = %params.schema_id,
            account = %account_address,
            "connected to backing store"
        );

        Ok(Self {
            params,
            client,
            retry,
            catalog: RwLock::new(catalog),
            account_address,
            closed: AtomicBool::new(false),
        })
    }

    /// Opens a cursor on this connection.
    pub fn cursor(&self) -> DbResult<Cursor<'_>> {
        self.check_open()?;
        Ok(Cursor::new(self))
    }

    /// Accepted for interface compatibility. Writes apply immediately, so
    /// there is nothing to flush.
    pub fn commit(&self) -> DbResult<()> {
        self.check_open()?;
        debug!("commit is a no-op; statements apply immediately");
        Ok(())
    }

    /// Accepted for interface compatibility. The backing store has no
    /// transactions, so nothing can be undone.
    pub fn rollback(&self) -> DbResult<()> {
        self.check_open()?;
        warn!("rollback has no effect; statements were applied immediately");
        Ok(())
    }

    /// Closes the connection. Subsequent operations fail with an interface
    /// error.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// The address of the account this connection writes as.
    pub fn account_address(&self) -> &str {
        &self.account_address
    }

    /// The connection's tenant prefix.
    pub fn app_id(&self) -> &str {
        &self.params.app_id
    }

    pub(crate) fn check_open(&self) -> DbResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(DbError::Closed {
                handle: "connection",
            })
        } else {
            Ok(())
        }
    }

    pub(crate) fn client(&self) -> &dyn GolemBaseClient {
        self.client.as_ref()
    }

    pub(crate) fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    pub(crate) fn catalog(&self) -> &RwLock<SchemaCatalog> {
        &self.catalog
    }
}
