//! Statement execution.
//!
//! Routes analyzed statements: DDL mutates the catalog, introspection is
//! answered from the catalog without touching the store, and DML/SELECT go
//! through the translator, serializer and client. Catalog locks are never
//! held across a suspension point; table definitions are cloned out before
//! any backing-store call.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use golemdb_client::{Entity, EntityUpdate};
use golemdb_common::constants::{
    counter_relation, COUNTER_ENTITY_TTL, COUNTER_NEXT_KEY, RELATION_KEY, ROW_TYPE_COUNTER,
    ROW_TYPE_KEY,
};
use golemdb_common::{DbError, DbResult};
use golemdb_sql::catalog::TableDef;
use golemdb_sql::parser::{
    DefaultSpec, DeleteStatement, InsertStatement, Literal, SelectStatement, Statement,
    UpdateStatement,
};
use golemdb_sql::row::RowSerializer;
use golemdb_sql::translate::{
    escape_string, row_matches, QueryTranslator, Row, SelectPlan,
};
use golemdb_sql::Value;

use super::connection::Connection;
use super::cursor::ColumnDesc;

/// What one statement produced.
pub(crate) struct ExecuteOutcome {
    /// Result rows (empty for commands).
    pub rows: Vec<Vec<Value>>,
    /// Result-set metadata, when there is a result set.
    pub description: Option<Vec<ColumnDesc>>,
    /// Rows produced or affected.
    pub rowcount: i64,
}

impl ExecuteOutcome {
    /// Outcome of a statement without a result set.
    pub fn command(rowcount: i64) -> Self {
        Self {
            rows: Vec::new(),
            description: None,
            rowcount,
        }
    }

    fn result_set(rows: Vec<Vec<Value>>, description: Vec<ColumnDesc>) -> Self {
        let rowcount = rows.len() as i64;
        Self {
            rows,
            description: Some(description),
            rowcount,
        }
    }
}

/// Executes one statement to completion.
pub(crate) async fn execute_statement(
    conn: &Connection,
    statement: Statement,
) -> DbResult<ExecuteOutcome> {
    if statement.is_ddl() {
        conn.catalog().write().apply_ddl(&statement)?;
        return Ok(ExecuteOutcome::command(0));
    }

    match statement {
        Statement::ShowTables => show_tables(conn),
        Statement::DescribeTable { table } => describe_table(conn, &table),
        Statement::SelectConstant(literals) => select_constant(&literals),
        Statement::Select(select) => run_select(conn, &select).await,
        Statement::Insert(insert) => execute_insert_batch(conn, std::slice::from_ref(&insert)).await,
        Statement::Update(update) => run_update(conn, &update).await,
        Statement::Delete(delete) => run_delete(conn, &delete).await,
        ddl => Err(DbError::internal(format!(
            "unrouted statement {ddl:?}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Introspection
// ---------------------------------------------------------------------------

fn text_desc(name: &str) -> ColumnDesc {
    ColumnDesc {
        name: name.to_string(),
        type_name: "TEXT".to_string(),
        precision: None,
        scale: None,
        nullable: false,
    }
}

fn show_tables(conn: &Connection) -> DbResult<ExecuteOutcome> {
    let catalog = conn.catalog().read();
    let rows = catalog
        .table_names()
        .into_iter()
        .map(|name| vec![Value::String(name.to_string())])
        .collect();
    Ok(ExecuteOutcome::result_set(rows, vec![text_desc("table_name")]))
}

fn describe_table(conn: &Connection, table_name: &str) -> DbResult<ExecuteOutcome> {
    let catalog = conn.catalog().read();
    let table = catalog.table(table_name)?;

    let rows = table
        .columns
        .iter()
        .map(|column| {
            vec![
                Value::String(column.name.clone()),
                Value::String(column.type_display()),
                Value::String(if column.nullable { "YES" } else { "NO" }.to_string()),
                Value::String(if column.primary_key { "PRI" } else { "" }.to_string()),
                column
                    .default
                    .clone()
                    .map_or(Value::Null, Value::String),
            ]
        })
        .collect();

    let description = ["Field", "Type", "Null", "Key", "Default"]
        .into_iter()
        .map(text_desc)
        .collect();
    Ok(ExecuteOutcome::result_set(rows, description))
}

fn select_constant(literals: &[Literal]) -> DbResult<ExecuteOutcome> {
    let mut row = Vec::with_capacity(literals.len());
    let mut description = Vec::with_capacity(literals.len());
    for literal in literals {
        let (value, type_name) = match literal {
            Literal::Null => (Value::Null, "TEXT"),
            Literal::Boolean(b) => (Value::Boolean(*b), "BOOLEAN"),
            Literal::Integer(i) => (Value::BigInt(*i), "BIGINT"),
            Literal::Number(n) => (
                Value::Double(n.parse().map_err(|_| DbError::ParseFailure {
                    message: format!("invalid numeric literal: {n}"),
                })?),
                "DOUBLE",
            ),
            Literal::String(s) => (Value::String(s.clone()), "TEXT"),
            Literal::Blob(b) => (Value::Bytes(b.clone()), "BLOB"),
        };
        description.push(ColumnDesc {
            name: literal.to_string(),
            type_name: type_name.to_string(),
            precision: None,
            scale: None,
            nullable: matches!(literal, Literal::Null),
        });
        row.push(value);
    }
    Ok(ExecuteOutcome::result_set(vec![row], description))
}

// ---------------------------------------------------------------------------
// Read path
// ---------------------------------------------------------------------------

async fn run_select(conn: &Connection, stmt: &SelectStatement) -> DbResult<ExecuteOutcome> {
    let (plan, table) = {
        let catalog = conn.catalog().read();
        let translator = QueryTranslator::new(&catalog, conn.app_id());
        let plan = translator.translate_select(stmt)?;
        let table = catalog.table(&plan.table)?.clone();
        (plan, table)
    };

    let rows = fetch_rows(conn, &table, &plan).await?;

    let description = plan
        .columns
        .iter()
        .map(|name| {
            let column = table.column_required(name)?;
            Ok(ColumnDesc {
                name: column.name.clone(),
                type_name: column.type_display(),
                precision: column.precision,
                scale: column.scale,
                nullable: column.nullable,
            })
        })
        .collect::<DbResult<Vec<_>>>()?;

    let projected = rows
        .into_iter()
        .map(|mut row| {
            plan.columns
                .iter()
                .map(|name| row.remove(name).unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    Ok(ExecuteOutcome::result_set(projected, description))
}

/// Runs a select plan and returns decoded, filtered, sorted and windowed
/// rows.
async fn fetch_rows(conn: &Connection, table: &TableDef, plan: &SelectPlan) -> DbResult<Vec<Row>> {
    debug!(predicate = %plan.predicate, "querying entities");
    let hits = conn
        .retry()
        .read("query_entities", || {
            conn.client().query_entities(&plan.predicate)
        })
        .await?;

    let serializer = RowSerializer::new(conn.app_id());
    let mut rows = Vec::with_capacity(hits.len());
    for hit in &hits {
        let row = serializer.deserialize(table, &hit.storage_value)?;
        if plan.post_filters.iter().all(|f| row_matches(f, &row)) {
            rows.push(row);
        }
    }

    if let Some(order) = &plan.order_by {
        rows.sort_by(|a, b| {
            let left = a.get(&order.column).unwrap_or(&Value::Null);
            let right = b.get(&order.column).unwrap_or(&Value::Null);
            if order.descending {
                right.cmp(left)
            } else {
                left.cmp(right)
            }
        });
    }

    let offset = plan.offset.unwrap_or(0) as usize;
    let mut rows: Vec<Row> = rows.into_iter().skip(offset).collect();
    if let Some(limit) = plan.limit {
        rows.truncate(limit as usize);
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Write path
// ---------------------------------------------------------------------------

/// Inserts the rows of one or more INSERT statements targeting the same
/// table as a single `create_entities` batch.
pub(crate) async fn execute_insert_batch(
    conn: &Connection,
    statements: &[InsertStatement],
) -> DbResult<ExecuteOutcome> {
    if statements.is_empty() {
        return Ok(ExecuteOutcome::command(0));
    }
    let (plans, table) = {
        let catalog = conn.catalog().read();
        let translator = QueryTranslator::new(&catalog, conn.app_id());
        let plans = statements
            .iter()
            .map(|stmt| translator.translate_insert(stmt))
            .collect::<DbResult<Vec<_>>>()?;
        let table = catalog.table(&statements[0].table)?.clone();
        (plans, table)
    };
    if plans.iter().any(|p| p.table != table.name) {
        return Err(DbError::internal(
            "insert batch spans multiple tables".to_string(),
        ));
    }

    let serializer = RowSerializer::new(conn.app_id());
    let mut entities = Vec::new();
    for plan in plans {
        for mut row in plan.rows {
            complete_row(conn, &table, &mut row).await?;
            entities.push(serializer.serialize(&table, &row)?);
        }
    }

    debug!(table = %table.name, count = entities.len(), "creating row entities");
    let receipts = conn
        .retry()
        .write("create_entities", conn.client().create_entities(entities))
        .await?;
    Ok(ExecuteOutcome::command(receipts.len() as i64))
}

/// Fills in declared defaults for columns the statement did not provide and
/// enforces NOT NULL.
async fn complete_row(conn: &Connection, table: &TableDef, row: &mut Row) -> DbResult<()> {
    for column in &table.columns {
        if !row.contains_key(&column.name) {
            let ty = column.sql_type()?;
            let value = match column.default_spec()? {
                Some(DefaultSpec::Literal(literal)) => {
                    Value::from_literal(&literal, &ty, &column.name)?
                }
                Some(DefaultSpec::CurrentTimestamp) => Value::Timestamp(unix_now()?),
                Some(DefaultSpec::Autoincrement) => {
                    let next = next_autoincrement(conn, &table.name, &column.name).await?;
                    Value::from_literal(&Literal::Integer(next), &ty, &column.name)?
                }
                None => Value::Null,
            };
            row.insert(column.name.clone(), value);
        }

        if !column.nullable && row.get(&column.name).is_some_and(|v| v.is_null()) {
            return Err(DbError::data(format!(
                "NULL value in NOT NULL column '{}'",
                column.name
            )));
        }
    }
    Ok(())
}

fn unix_now() -> DbResult<i64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .map_err(|_| DbError::internal("system clock precedes the Unix epoch".to_string()))
}

/// Claims the next value from a table/column counter entity.
///
/// The counter is read, incremented and written back without any locking;
/// two racing inserts can claim the same value. Callers that need unique
/// keys must supply them explicitly.
async fn next_autoincrement(conn: &Connection, table: &str, column: &str) -> DbResult<i64> {
    let rel = counter_relation(conn.app_id(), table, column);
    let predicate = format!(
        "{ROW_TYPE_KEY}=\"{ROW_TYPE_COUNTER}\" && {RELATION_KEY}=\"{}\"",
        escape_string(&rel)
    );

    let hits = conn
        .retry()
        .read("query_entities", || conn.client().query_entities(&predicate))
        .await?;

    match hits.into_iter().next() {
        None => {
            let entity = counter_entity(&rel, 2)?;
            conn.retry()
                .write("create_entities", conn.client().create_entities(vec![entity]))
                .await?;
            Ok(1)
        }
        Some(hit) => {
            let payload: serde_json::Value =
                serde_json::from_slice(&hit.storage_value).map_err(|e| {
                    DbError::internal(format!("counter entity for {rel} is corrupt: {e}"))
                })?;
            let next = payload
                .get(COUNTER_NEXT_KEY)
                .and_then(serde_json::Value::as_i64)
                .ok_or_else(|| {
                    DbError::internal(format!("counter entity for {rel} is corrupt"))
                })?;

            let entity = counter_entity(&rel, next + 1)?;
            conn.retry()
                .write(
                    "update_entities",
                    conn.client().update_entities(vec![EntityUpdate {
                        entity_key: hit.entity_key,
                        entity,
                    }]),
                )
                .await?;
            Ok(next)
        }
    }
}

fn counter_entity(rel: &str, next: i64) -> DbResult<Entity> {
    let payload = serde_json::to_vec(&serde_json::json!({ COUNTER_NEXT_KEY: next }))
        .map_err(|e| DbError::internal(format!("cannot serialize counter payload: {e}")))?;
    Ok(Entity::new(payload, COUNTER_ENTITY_TTL)
        .with_string_annotation(ROW_TYPE_KEY, ROW_TYPE_COUNTER)
        .with_string_annotation(RELATION_KEY, rel)
        .with_numeric_annotation(COUNTER_NEXT_KEY, next.max(0) as u64))
}

async fn run_update(conn: &Connection, stmt: &UpdateStatement) -> DbResult<ExecuteOutcome> {
    let (plan, table) = {
        let catalog = conn.catalog().read();
        let translator = QueryTranslator::new(&catalog, conn.app_id());
        let plan = translator.translate_update(stmt)?;
        let table = catalog.table(&plan.table)?.clone();
        (plan, table)
    };

    let hits = conn
        .retry()
        .read("query_entities", || {
            conn.client().query_entities(&plan.predicate)
        })
        .await?;

    let serializer = RowSerializer::new(conn.app_id());
    let mut updates = Vec::new();
    for hit in hits {
        let row = serializer.deserialize(&table, &hit.storage_value)?;
        if !plan.post_filters.iter().all(|f| row_matches(f, &row)) {
            continue;
        }
        let mut merged = row;
        for (column, value) in &plan.assignments {
            merged.insert(column.clone(), value.clone());
        }
        updates.push(EntityUpdate {
            entity_key: hit.entity_key,
            entity: serializer.serialize(&table, &merged)?,
        });
    }

    let count = updates.len() as i64;
    if !updates.is_empty() {
        debug!(table = %table.name, count, "updating row entities");
        conn.retry()
            .write("update_entities", conn.client().update_entities(updates))
            .await?;
    }
    Ok(ExecuteOutcome::command(count))
}

async fn run_delete(conn: &Connection, stmt: &DeleteStatement) -> DbResult<ExecuteOutcome> {
    let (plan, table) = {
        let catalog = conn.catalog().read();
        let translator = QueryTranslator::new(&catalog, conn.app_id());
        let plan = translator.translate_delete(stmt)?;
        let table = catalog.table(&plan.table)?.clone();
        (plan, table)
    };

    let hits = conn
        .retry()
        .read("query_entities", || {
            conn.client().query_entities(&plan.predicate)
        })
        .await?;

    let serializer = RowSerializer::new(conn.app_id());
    let mut keys = Vec::with_capacity(hits.len());
    for hit in hits {
        if !plan.post_filters.is_empty() {
            let row = serializer.deserialize(&table, &hit.storage_value)?;
            if !plan.post_filters.iter().all(|f| row_matches(f, &row)) {
                continue;
            }
        }
        keys.push(hit.entity_key);
    }

    let count = keys.len() as i64;
    if !keys.is_empty() {
        debug!(table = %table.name, count, "deleting row entities");
        conn.retry()
            .write("delete_entities", conn.client().delete_entities(keys))
            .await?;
    }
    Ok(ExecuteOutcome::command(count))
}
