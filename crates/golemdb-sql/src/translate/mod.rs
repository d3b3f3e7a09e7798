//! Statement translation.
//!
//! Lowers analyzed statements into backing-store plans: a predicate string
//! plus in-core work for reads, typed row maps for writes. Every query is
//! tenant-scoped: the predicate always begins with
//! `row_type="json" && relation="<app_id>.<table>"`.

pub mod filter;
pub mod predicate;

use std::collections::BTreeMap;

use tracing::debug;

use golemdb_common::constants::{relation, ROW_TYPE_JSON, ROW_TYPE_KEY, RELATION_KEY};
use golemdb_common::{DbError, DbResult};

use crate::catalog::{SchemaCatalog, TableDef};
use crate::parser::{
    DeleteStatement, Expr, InsertStatement, Literal, OrderBy, Projection, SelectStatement,
    UpdateStatement,
};
use crate::value::Value;

pub use filter::{like_match, row_matches};
pub use predicate::{escape_string, CompareOp, Condition, Lowered, PredicateNode};

/// A decoded row keyed by column name.
pub type Row = BTreeMap<String, Value>;

/// Plan for a SELECT.
#[derive(Debug)]
pub struct SelectPlan {
    /// Target table.
    pub table: String,
    /// Output columns, in order.
    pub columns: Vec<String>,
    /// Backing-store predicate string.
    pub predicate: String,
    /// Residual conditions, evaluated on decoded rows.
    pub post_filters: Vec<PredicateNode>,
    /// In-core sort.
    pub order_by: Option<OrderBy>,
    /// Row cap, applied after sorting.
    pub limit: Option<u64>,
    /// Rows skipped before the cap.
    pub offset: Option<u64>,
}

/// Plan for an INSERT: typed rows with only the caller-supplied columns.
#[derive(Debug)]
pub struct InsertPlan {
    /// Target table.
    pub table: String,
    /// Rows to insert.
    pub rows: Vec<Row>,
}

/// Plan for an UPDATE.
#[derive(Debug)]
pub struct UpdatePlan {
    /// Target table.
    pub table: String,
    /// Typed assignments to merge into matching rows.
    pub assignments: BTreeMap<String, Value>,
    /// Predicate locating the rows.
    pub predicate: String,
    /// Residual conditions.
    pub post_filters: Vec<PredicateNode>,
}

/// Plan for a DELETE.
#[derive(Debug)]
pub struct DeletePlan {
    /// Target table.
    pub table: String,
    /// Predicate locating the rows.
    pub predicate: String,
    /// Residual conditions.
    pub post_filters: Vec<PredicateNode>,
}

/// Lowers analyzed statements against a catalog and tenant.
pub struct QueryTranslator<'a> {
    catalog: &'a SchemaCatalog,
    app_id: &'a str,
}

impl<'a> QueryTranslator<'a> {
    /// Creates a translator for one tenant.
    pub fn new(catalog: &'a SchemaCatalog, app_id: &'a str) -> Self {
        Self { catalog, app_id }
    }

    /// The predicate prefix scoping a query to one tenant's table.
    fn scope(&self, table: &str) -> String {
        format!(
            "{ROW_TYPE_KEY}=\"{ROW_TYPE_JSON}\" && {RELATION_KEY}=\"{}\"",
            escape_string(&relation(self.app_id, table))
        )
    }

    fn lower_where(
        &self,
        table: &TableDef,
        where_clause: Option<&Expr>,
    ) -> DbResult<(String, Vec<PredicateNode>)> {
        let mut predicate = self.scope(&table.name);
        let mut post_filters = Vec::new();

        if let Some(expr) = where_clause {
            let tree = predicate::normalize(predicate::build(expr, table)?);
            let lowered = predicate::lower(&tree, table)?;
            for fragment in lowered.fragments {
                predicate.push_str(" && ");
                predicate.push_str(&fragment);
            }
            post_filters = lowered.post_filters;
        }

        Ok((predicate, post_filters))
    }

    /// Translates a SELECT into a read plan.
    pub fn translate_select(&self, stmt: &SelectStatement) -> DbResult<SelectPlan> {
        let table = self.catalog.table(&stmt.table)?;

        let columns = match &stmt.projection {
            Projection::All => table.column_names().iter().map(|s| s.to_string()).collect(),
            Projection::Columns(names) => {
                for name in names {
                    table.column_required(name)?;
                }
                names.clone()
            }
        };

        if let Some(order) = &stmt.order_by {
            table.column_required(&order.column)?;
        }

        let (predicate, post_filters) = self.lower_where(table, stmt.where_clause.as_ref())?;
        debug!(table = %stmt.table, predicate = %predicate, "translated SELECT");

        Ok(SelectPlan {
            table: stmt.table.clone(),
            columns,
            predicate,
            post_filters,
            order_by: stmt.order_by.clone(),
            limit: stmt.limit,
            offset: stmt.offset,
        })
    }

    /// Translates an INSERT into typed rows.
    pub fn translate_insert(&self, stmt: &InsertStatement) -> DbResult<InsertPlan> {
        let table = self.catalog.table(&stmt.table)?;

        let columns: Vec<String> = if stmt.columns.is_empty() {
            table.column_names().iter().map(|s| s.to_string()).collect()
        } else {
            let mut seen = std::collections::BTreeSet::new();
            for name in &stmt.columns {
                table.column_required(name)?;
                if !seen.insert(name.as_str()) {
                    return Err(DbError::ParseFailure {
                        message: format!("column '{name}' listed twice in INSERT"),
                    });
                }
            }
            stmt.columns.clone()
        };

        let mut rows = Vec::with_capacity(stmt.rows.len());
        for values in &stmt.rows {
            if values.len() != columns.len() {
                return Err(DbError::data(format!(
                    "column count ({}) does not match value count ({})",
                    columns.len(),
                    values.len()
                )));
            }
            let mut row = Row::new();
            for (column, expr) in columns.iter().zip(values) {
                let literal = expr_literal(expr)?;
                let ty = table.column_required(column)?.sql_type()?;
                row.insert(column.clone(), Value::from_literal(literal, &ty, column)?);
            }
            rows.push(row);
        }

        Ok(InsertPlan {
            table: stmt.table.clone(),
            rows,
        })
    }

    /// Translates an UPDATE into assignments plus a row-locating plan.
    pub fn translate_update(&self, stmt: &UpdateStatement) -> DbResult<UpdatePlan> {
        let table = self.catalog.table(&stmt.table)?;

        let mut assignments = BTreeMap::new();
        for (column, expr) in &stmt.assignments {
            let column_def = table.column_required(column)?;
            let literal = expr_literal(expr)?;
            let value = Value::from_literal(literal, &column_def.sql_type()?, column)?;
            if value.is_null() && !column_def.nullable {
                return Err(DbError::data(format!(
                    "cannot assign NULL to NOT NULL column '{column}'"
                )));
            }
            assignments.insert(column.clone(), value);
        }

        let (predicate, post_filters) = self.lower_where(table, stmt.where_clause.as_ref())?;
        debug!(table = %stmt.table, predicate = %predicate, "translated UPDATE");

        Ok(UpdatePlan {
            table: stmt.table.clone(),
            assignments,
            predicate,
            post_filters,
        })
    }

    /// Translates a DELETE into a row-locating plan.
    pub fn translate_delete(&self, stmt: &DeleteStatement) -> DbResult<DeletePlan> {
        let table = self.catalog.table(&stmt.table)?;
        let (predicate, post_filters) = self.lower_where(table, stmt.where_clause.as_ref())?;
        debug!(table = %stmt.table, predicate = %predicate, "translated DELETE");

        Ok(DeletePlan {
            table: stmt.table.clone(),
            predicate,
            post_filters,
        })
    }
}

fn expr_literal(expr: &Expr) -> DbResult<&Literal> {
    match expr {
        Expr::Literal(lit) => Ok(lit),
        Expr::Nested(inner) => expr_literal(inner),
        other => Err(DbError::not_supported(format!(
            "non-literal value {other} in DML"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_statement, Statement};

    fn catalog_with(ddl: &[&str]) -> SchemaCatalog {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = SchemaCatalog::open_in(dir.path(), "translate_tests").unwrap();
        for sql in ddl {
            catalog.apply_ddl(&parse_statement(sql).unwrap()).unwrap();
        }
        // The tempdir is dropped here; the catalog stays usable in memory.
        catalog
    }

    fn select_plan(catalog: &SchemaCatalog, app_id: &str, sql: &str) -> DbResult<SelectPlan> {
        let Statement::Select(stmt) = parse_statement(sql).unwrap() else {
            panic!("expected SELECT");
        };
        QueryTranslator::new(catalog, app_id).translate_select(&stmt)
    }

    fn users_catalog() -> SchemaCatalog {
        catalog_with(&[
            "CREATE TABLE t (
                id INTEGER PRIMARY KEY,
                age INTEGER,
                name VARCHAR(100),
                price DECIMAL(8,2),
                score DOUBLE,
                note TEXT
            )",
            "CREATE INDEX idx_t_age ON t (age)",
            "CREATE INDEX idx_t_name ON t (name)",
            "CREATE INDEX idx_t_price ON t (price)",
        ])
    }

    #[test]
    fn test_scope_only() {
        let catalog = users_catalog();
        let plan = select_plan(&catalog, "app", "SELECT * FROM t").unwrap();
        assert_eq!(plan.predicate, r#"row_type="json" && relation="app.t""#);
        assert!(plan.post_filters.is_empty());
        assert_eq!(
            plan.columns,
            vec!["id", "age", "name", "price", "score", "note"]
        );
    }

    #[test]
    fn test_numeric_and_string_conjunction() {
        let catalog = users_catalog();
        let plan = select_plan(
            &catalog,
            "app",
            "SELECT * FROM t WHERE age > 30 AND name = 'Al'",
        )
        .unwrap();
        assert_eq!(
            plan.predicate,
            r#"row_type="json" && relation="app.t" && idx_age>9223372036854775838 && idx_name="Al""#
        );
        assert!(plan.post_filters.is_empty());
    }

    #[test]
    fn test_like_prefix_glob() {
        let catalog = users_catalog();
        let plan =
            select_plan(&catalog, "app", "SELECT * FROM t WHERE name LIKE 'Al%'").unwrap();
        assert_eq!(
            plan.predicate,
            r#"row_type="json" && relation="app.t" && idx_name ~ "Al*""#
        );
    }

    #[test]
    fn test_decimal_range() {
        let catalog = users_catalog();
        let plan =
            select_plan(&catalog, "app", "SELECT * FROM t WHERE price >= 10.50").unwrap();
        assert_eq!(
            plan.predicate,
            r#"row_type="json" && relation="app.t" && idx_price>=".000010.50""#
        );
    }

    #[test]
    fn test_or_parenthesized() {
        let catalog = users_catalog();
        let plan = select_plan(
            &catalog,
            "app",
            "SELECT * FROM t WHERE age = 1 OR age = 2",
        )
        .unwrap();
        let e1 = crate::codec::encode_signed(1, 32).unwrap();
        let e2 = crate::codec::encode_signed(2, 32).unwrap();
        assert_eq!(
            plan.predicate,
            format!(r#"row_type="json" && relation="app.t" && (idx_age={e1} || idx_age={e2})"#)
        );
    }

    #[test]
    fn test_in_list_becomes_or() {
        let catalog = users_catalog();
        let plan = select_plan(
            &catalog,
            "app",
            "SELECT * FROM t WHERE age IN (25, 30, 35)",
        )
        .unwrap();
        assert!(plan.predicate.contains("||"));
        assert!(plan.predicate.contains(&crate::codec::encode_signed(25, 32).unwrap().to_string()));
        assert!(plan.predicate.contains(&crate::codec::encode_signed(35, 32).unwrap().to_string()));
    }

    #[test]
    fn test_between_becomes_range() {
        let catalog = users_catalog();
        let plan = select_plan(
            &catalog,
            "app",
            "SELECT * FROM t WHERE age BETWEEN 25 AND 65",
        )
        .unwrap();
        let lo = crate::codec::encode_signed(25, 32).unwrap();
        let hi = crate::codec::encode_signed(65, 32).unwrap();
        assert!(plan.predicate.contains(&format!("idx_age>={lo}")));
        assert!(plan.predicate.contains(&format!("idx_age<={hi}")));
    }

    #[test]
    fn test_not_equal_splits_range() {
        let catalog = users_catalog();
        let plan = select_plan(&catalog, "app", "SELECT * FROM t WHERE age != 30").unwrap();
        let e = crate::codec::encode_signed(30, 32).unwrap();
        assert!(plan
            .predicate
            .contains(&format!("(idx_age<{e} || idx_age>{e})")));
    }

    #[test]
    fn test_not_pushdown_inverts() {
        let catalog = users_catalog();
        let plan =
            select_plan(&catalog, "app", "SELECT * FROM t WHERE NOT age > 30").unwrap();
        let e = crate::codec::encode_signed(30, 32).unwrap();
        assert!(plan.predicate.contains(&format!("idx_age<={e}")));
    }

    #[test]
    fn test_is_null_post_filtered() {
        let catalog = users_catalog();
        let plan =
            select_plan(&catalog, "app", "SELECT * FROM t WHERE name IS NULL").unwrap();
        assert_eq!(plan.predicate, r#"row_type="json" && relation="app.t""#);
        assert_eq!(plan.post_filters.len(), 1);
    }

    #[test]
    fn test_non_indexed_column_post_filtered() {
        let catalog = users_catalog();
        let plan =
            select_plan(&catalog, "app", "SELECT * FROM t WHERE note = 'x'").unwrap();
        assert_eq!(plan.predicate, r#"row_type="json" && relation="app.t""#);
        assert_eq!(plan.post_filters.len(), 1);
    }

    #[test]
    fn test_float_predicate_rejected() {
        let catalog = users_catalog();
        let err =
            select_plan(&catalog, "app", "SELECT * FROM t WHERE score > 1.0").unwrap_err();
        assert_eq!(err.kind(), golemdb_common::ErrorKind::NotSupported);
        assert!(err.to_string().contains("column score is not indexable"));
    }

    #[test]
    fn test_non_prefix_like_rejected() {
        let catalog = users_catalog();
        let err =
            select_plan(&catalog, "app", "SELECT * FROM t WHERE name LIKE '%son'").unwrap_err();
        assert_eq!(err.kind(), golemdb_common::ErrorKind::NotSupported);
    }

    #[test]
    fn test_or_with_unpushable_branch_post_filters_whole_group() {
        let catalog = users_catalog();
        let plan = select_plan(
            &catalog,
            "app",
            "SELECT * FROM t WHERE age = 1 OR note = 'x'",
        )
        .unwrap();
        // The OR cannot be split: it moves wholesale to the post-filter.
        assert_eq!(plan.predicate, r#"row_type="json" && relation="app.t""#);
        assert_eq!(plan.post_filters.len(), 1);
    }

    #[test]
    fn test_tenant_isolation_in_predicate() {
        let catalog = users_catalog();
        let a = select_plan(&catalog, "tenant_a", "SELECT * FROM t").unwrap();
        let b = select_plan(&catalog, "tenant_b", "SELECT * FROM t").unwrap();
        assert!(a.predicate.contains(r#"relation="tenant_a.t""#));
        assert!(b.predicate.contains(r#"relation="tenant_b.t""#));
        assert_ne!(a.predicate, b.predicate);
    }

    #[test]
    fn test_unknown_column_rejected() {
        let catalog = users_catalog();
        let err = select_plan(&catalog, "app", "SELECT missing FROM t").unwrap_err();
        assert!(matches!(err, DbError::ColumnNotFound { .. }));

        let err = select_plan(&catalog, "app", "SELECT * FROM t WHERE missing = 1").unwrap_err();
        assert!(matches!(err, DbError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_insert_translation() {
        let catalog = users_catalog();
        let Statement::Insert(stmt) =
            parse_statement("INSERT INTO t (id, name) VALUES (1, 'a'), (2, 'b')").unwrap()
        else {
            panic!("expected INSERT");
        };
        let plan = QueryTranslator::new(&catalog, "app")
            .translate_insert(&stmt)
            .unwrap();
        assert_eq!(plan.rows.len(), 2);
        assert_eq!(plan.rows[0].get("id"), Some(&Value::Int(1)));
        assert_eq!(
            plan.rows[1].get("name"),
            Some(&Value::String("b".to_string()))
        );
    }

    #[test]
    fn test_insert_arity_mismatch() {
        let catalog = users_catalog();
        let Statement::Insert(stmt) =
            parse_statement("INSERT INTO t (id, name) VALUES (1)").unwrap()
        else {
            panic!("expected INSERT");
        };
        let err = QueryTranslator::new(&catalog, "app")
            .translate_insert(&stmt)
            .unwrap_err();
        assert_eq!(err.kind(), golemdb_common::ErrorKind::Data);
    }

    #[test]
    fn test_update_translation() {
        let catalog = users_catalog();
        let Statement::Update(stmt) =
            parse_statement("UPDATE t SET name = 'Jane' WHERE id = 1").unwrap()
        else {
            panic!("expected UPDATE");
        };
        let plan = QueryTranslator::new(&catalog, "app")
            .translate_update(&stmt)
            .unwrap();
        assert_eq!(
            plan.assignments.get("name"),
            Some(&Value::String("Jane".to_string()))
        );
        let e = crate::codec::encode_signed(1, 32).unwrap();
        assert!(plan.predicate.contains(&format!("idx_id={e}")));
    }

    #[test]
    fn test_delete_translation() {
        let catalog = users_catalog();
        let Statement::Delete(stmt) =
            parse_statement("DELETE FROM t WHERE age < 18").unwrap()
        else {
            panic!("expected DELETE");
        };
        let plan = QueryTranslator::new(&catalog, "app")
            .translate_delete(&stmt)
            .unwrap();
        let e = crate::codec::encode_signed(18, 32).unwrap();
        assert!(plan.predicate.contains(&format!("idx_age<{e}")));
    }

    #[test]
    fn test_value_out_of_column_range() {
        let catalog = users_catalog();
        let err = select_plan(
            &catalog,
            "app",
            "SELECT * FROM t WHERE age > 9999999999999",
        )
        .unwrap_err();
        assert_eq!(err.kind(), golemdb_common::ErrorKind::Data);
    }
}
