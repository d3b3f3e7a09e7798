//! Cursors.

use std::collections::VecDeque;

use golemdb_common::{DbError, DbResult};
use golemdb_sql::bind::{self, Params};
use golemdb_sql::parser::{self, Statement};
use golemdb_sql::Value;

use super::connection::Connection;
use super::executor::{self, ExecuteOutcome};

/// Describes one column of a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDesc {
    /// Column name.
    pub name: String,
    /// Rendered SQL type (`INTEGER`, `VARCHAR(50)`, ...).
    pub type_name: String,
    /// DECIMAL precision.
    pub precision: Option<u8>,
    /// DECIMAL scale.
    pub scale: Option<u8>,
    /// Whether NULL may appear.
    pub nullable: bool,
}

/// A cursor over one connection.
///
/// Statements execute strictly in submission order; results are fully
/// materialized before `execute` returns, so the fetch methods never
/// suspend.
pub struct Cursor<'conn> {
    conn: &'conn Connection,
    results: VecDeque<Vec<Value>>,
    description: Option<Vec<ColumnDesc>>,
    rowcount: i64,
    arraysize: usize,
    closed: bool,
}

impl<'conn> std::fmt::Debug for Cursor<'conn> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("results", &self.results)
            .field("description", &self.description)
            .field("rowcount", &self.rowcount)
            .field("arraysize", &self.arraysize)
            .field("closed", &self.closed)
            .finish()
    }
}

impl<'conn> Cursor<'conn> {
    pub(crate) fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            results: VecDeque::new(),
            description: None,
            rowcount: -1,
            arraysize: 1,
            closed: false,
        }
    }

    /// Executes one statement with named parameters.
    pub async fn execute(&mut self, sql: &str, params: &Params) -> DbResult<()> {
        self.check_open()?;
        let bound = bind::substitute(sql, params)?;
        let statement = parser::parse_statement(&bound)?;
        let outcome = executor::execute_statement(self.conn, statement).await?;
        self.absorb(outcome);
        Ok(())
    }

    /// Executes one statement once per parameter set.
    ///
    /// Consecutive INSERTs into the same table are collapsed into a single
    /// backing-store write batch; everything else runs sequentially.
    /// `rowcount` afterwards is the total across all sets.
    pub async fn executemany(&mut self, sql: &str, param_sets: &[Params]) -> DbResult<()> {
        self.check_open()?;

        let mut statements = Vec::with_capacity(param_sets.len());
        for params in param_sets {
            let bound = bind::substitute(sql, params)?;
            statements.push(parser::parse_statement(&bound)?);
        }

        let all_inserts_into = statements.iter().all(|s| matches!(s, Statement::Insert(_)));
        if all_inserts_into && !statements.is_empty() {
            let inserts: Vec<_> = statements
                .into_iter()
                .map(|s| match s {
                    Statement::Insert(i) => i,
                    _ => unreachable!(),
                })
                .collect();
            if inserts.windows(2).all(|w| w[0].table == w[1].table) {
                let outcome = executor::execute_insert_batch(self.conn, &inserts).await?;
                self.absorb(outcome);
                return Ok(());
            }
            // Mixed target tables: fall back to sequential execution.
            let mut total = 0i64;
            for insert in inserts {
                let outcome =
                    executor::execute_statement(self.conn, Statement::Insert(insert)).await?;
                total += outcome.rowcount.max(0);
            }
            self.absorb(ExecuteOutcome::command(total));
            return Ok(());
        }

        let mut total = 0i64;
        for statement in statements {
            let outcome = executor::execute_statement(self.conn, statement).await?;
            total += outcome.rowcount.max(0);
        }
        self.absorb(ExecuteOutcome::command(total));
        Ok(())
    }

    fn absorb(&mut self, outcome: ExecuteOutcome) {
        self.results = outcome.rows.into();
        self.description = outcome.description;
        self.rowcount = outcome.rowcount;
    }

    /// Fetches the next row, or `None` when the result set is exhausted.
    pub fn fetchone(&mut self) -> Option<Vec<Value>> {
        self.results.pop_front()
    }

    /// Fetches up to `size` rows (default: [`arraysize`](Self::arraysize)).
    pub fn fetchmany(&mut self, size: Option<usize>) -> Vec<Vec<Value>> {
        let size = size.unwrap_or(self.arraysize);
        let take = size.min(self.results.len());
        self.results.drain(..take).collect()
    }

    /// Fetches all remaining rows.
    pub fn fetchall(&mut self) -> Vec<Vec<Value>> {
        self.results.drain(..).collect()
    }

    /// Number of rows produced or affected by the last statement, or -1
    /// before any execution.
    pub fn rowcount(&self) -> i64 {
        self.rowcount
    }

    /// Column metadata of the last result set, if it had one.
    pub fn description(&self) -> Option<&[ColumnDesc]> {
        self.description.as_deref()
    }

    /// Default fetch size for [`fetchmany`](Self::fetchmany).
    pub fn arraysize(&self) -> usize {
        self.arraysize
    }

    /// Sets the default fetch size. Zero is rejected.
    pub fn set_arraysize(&mut self, size: usize) -> DbResult<()> {
        if size == 0 {
            return Err(DbError::Parameter {
                message: "arraysize must be positive".to_string(),
            });
        }
        self.arraysize = size;
        Ok(())
    }

    /// Closes the cursor; further operations fail.
    pub fn close(&mut self) {
        self.closed = true;
        self.results.clear();
        self.description = None;
        self.rowcount = -1;
    }

    fn check_open(&self) -> DbResult<()> {
        if self.closed {
            return Err(DbError::Closed { handle: "cursor" });
        }
        self.conn.check_open()
    }
}
