//! DDL application.
//!
//! `apply_ddl` is the catalog's only mutator. Every successful application
//! persists the catalog before returning, so readers opening the same
//! schema file observe the change.

use std::collections::BTreeSet;

use tracing::info;

use golemdb_common::constants::DEFAULT_ENTITY_TTL;
use golemdb_common::{DbError, DbResult};

use crate::parser::{
    AlterOperation, AlterTableStatement, ColumnSpec, CreateIndexStatement, CreateTableStatement,
    DefaultSpec, DropIndexStatement, DropTableStatement, Statement,
};

use super::{ColumnDef, ForeignKeyDef, IndexDef, SchemaCatalog, TableDef, UniqueDef};

impl SchemaCatalog {
    /// Applies a DDL statement and persists the catalog.
    pub fn apply_ddl(&mut self, stmt: &Statement) -> DbResult<()> {
        match stmt {
            Statement::CreateTable(create) => self.create_table(create)?,
            Statement::DropTable(drop) => self.drop_table(drop)?,
            Statement::CreateIndex(create) => self.create_index(create)?,
            Statement::DropIndex(drop) => self.drop_index(drop)?,
            Statement::AlterTable(alter) => self.alter_table(alter)?,
            other => {
                return Err(DbError::internal(format!(
                    "apply_ddl called with non-DDL statement {other:?}"
                )))
            }
        }
        self.save()
    }

    fn create_table(&mut self, stmt: &CreateTableStatement) -> DbResult<()> {
        if self.table_exists(&stmt.name) {
            if stmt.if_not_exists {
                return Ok(());
            }
            return Err(DbError::TableExists {
                table: stmt.name.clone(),
            });
        }

        let mut seen = BTreeSet::new();
        for column in &stmt.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(DbError::ParseFailure {
                    message: format!(
                        "duplicate column '{}' in table '{}'",
                        column.name, stmt.name
                    ),
                });
            }
            check_indexable_flags(column)?;
        }

        let mut columns: Vec<ColumnDef> = stmt.columns.iter().map(ColumnDef::from_spec).collect();

        let mut unique_constraints = Vec::new();
        for unique in &stmt.unique_constraints {
            // A single-column UNIQUE constraint behaves like an inline
            // UNIQUE column; wider ones are metadata only.
            if let [column_name] = unique.columns.as_slice() {
                let column = columns
                    .iter_mut()
                    .find(|c| &c.name == column_name)
                    .ok_or_else(|| DbError::ColumnNotFound {
                        column: column_name.clone(),
                        table: stmt.name.clone(),
                    })?;
                column.unique = true;
                column.indexed = true;
            }
            unique_constraints.push(UniqueDef {
                name: unique.name.clone(),
                columns: unique.columns.clone(),
            });
        }

        let foreign_keys = stmt
            .foreign_keys
            .iter()
            .map(|fk| ForeignKeyDef {
                name: fk.name.clone(),
                columns: fk.columns.clone(),
                referenced_table: fk.referenced_table.clone(),
                referenced_columns: fk.referenced_columns.clone(),
            })
            .collect();

        let table = TableDef {
            name: stmt.name.clone(),
            entity_ttl: stmt.entity_ttl.unwrap_or(DEFAULT_ENTITY_TTL),
            columns,
            indexes: Vec::new(),
            unique_constraints,
            foreign_keys,
        };

        info!(table = %stmt.name, schema_id = %self.schema_id(), "creating table");
        self.tables_mut().insert(stmt.name.clone(), table);
        Ok(())
    }

    fn drop_table(&mut self, stmt: &DropTableStatement) -> DbResult<()> {
        for name in &stmt.names {
            if self.tables_mut().remove(name).is_none() && !stmt.if_exists {
                return Err(DbError::TableNotFound { table: name.clone() });
            }
            info!(table = %name, schema_id = %self.schema_id(), "dropped table");
        }
        Ok(())
    }

    fn create_index(&mut self, stmt: &CreateIndexStatement) -> DbResult<()> {
        // Index names are unique across the schema.
        let exists = self
            .tables_mut()
            .values()
            .any(|t| t.indexes.iter().any(|i| i.name == stmt.name));
        if exists {
            if stmt.if_not_exists {
                return Ok(());
            }
            return Err(DbError::ParseFailure {
                message: format!("index '{}' already exists", stmt.name),
            });
        }

        let schema_id = self.schema_id().to_string();
        let table = self
            .tables_mut()
            .get_mut(&stmt.table)
            .ok_or_else(|| DbError::TableNotFound {
                table: stmt.table.clone(),
            })?;
        let column = table
            .columns
            .iter()
            .find(|c| c.name == stmt.column)
            .ok_or_else(|| DbError::ColumnNotFound {
                column: stmt.column.clone(),
                table: stmt.table.clone(),
            })?;
        if !column.sql_type()?.is_indexable() {
            return Err(DbError::ParseFailure {
                message: format!(
                    "column '{}' of type {} cannot be indexed",
                    stmt.column,
                    column.type_display()
                ),
            });
        }

        info!(index = %stmt.name, table = %stmt.table, schema_id = %schema_id, "creating index");
        table.indexes.push(IndexDef {
            name: stmt.name.clone(),
            column: stmt.column.clone(),
            unique: stmt.unique,
        });
        Ok(())
    }

    fn drop_index(&mut self, stmt: &DropIndexStatement) -> DbResult<()> {
        for name in &stmt.names {
            let mut found = false;
            for table in self.tables_mut().values_mut() {
                let before = table.indexes.len();
                table.indexes.retain(|i| &i.name != name);
                if table.indexes.len() < before {
                    found = true;
                    break;
                }
            }
            if !found && !stmt.if_exists {
                return Err(DbError::ParseFailure {
                    message: format!("index '{name}' not found"),
                });
            }
        }
        Ok(())
    }

    fn alter_table(&mut self, stmt: &AlterTableStatement) -> DbResult<()> {
        if !self.table_exists(&stmt.table) {
            return Err(DbError::TableNotFound {
                table: stmt.table.clone(),
            });
        }

        for op in &stmt.operations {
            match op {
                AlterOperation::AddColumn(spec) => self.add_column(&stmt.table, spec)?,
                AlterOperation::AddUnique(unique) => {
                    let table = self.tables_mut().get_mut(&stmt.table).ok_or_else(|| {
                        DbError::TableNotFound {
                            table: stmt.table.clone(),
                        }
                    })?;
                    for column_name in &unique.columns {
                        if table.columns.iter().all(|c| &c.name != column_name) {
                            return Err(DbError::ColumnNotFound {
                                column: column_name.clone(),
                                table: stmt.table.clone(),
                            });
                        }
                    }
                    if let [column_name] = unique.columns.as_slice() {
                        if let Some(column) =
                            table.columns.iter_mut().find(|c| &c.name == column_name)
                        {
                            column.unique = true;
                            column.indexed = true;
                        }
                    }
                    table.unique_constraints.push(UniqueDef {
                        name: unique.name.clone(),
                        columns: unique.columns.clone(),
                    });
                }
                AlterOperation::AddForeignKey(fk) => {
                    let table = self.tables_mut().get_mut(&stmt.table).ok_or_else(|| {
                        DbError::TableNotFound {
                            table: stmt.table.clone(),
                        }
                    })?;
                    table.foreign_keys.push(ForeignKeyDef {
                        name: fk.name.clone(),
                        columns: fk.columns.clone(),
                        referenced_table: fk.referenced_table.clone(),
                        referenced_columns: fk.referenced_columns.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn add_column(&mut self, table_name: &str, spec: &ColumnSpec) -> DbResult<()> {
        if spec.primary_key {
            return Err(DbError::not_supported(
                "adding a primary key column".to_string(),
            ));
        }
        check_indexable_flags(spec)?;

        let table = self
            .tables_mut()
            .get_mut(table_name)
            .ok_or_else(|| DbError::TableNotFound {
                table: table_name.to_string(),
            })?;
        if table.columns.iter().any(|c| c.name == spec.name) {
            return Err(DbError::ParseFailure {
                message: format!(
                    "column '{}' already exists in table '{table_name}'",
                    spec.name
                ),
            });
        }
        // Existing rows have no value for the new column; without a default
        // they would all violate NOT NULL.
        if !spec.nullable && spec.default.is_none() {
            return Err(DbError::ParseFailure {
                message: format!(
                    "cannot add NOT NULL column '{}' without a default",
                    spec.name
                ),
            });
        }

        table.columns.push(ColumnDef::from_spec(spec));
        Ok(())
    }
}

/// Primary-key and UNIQUE columns must be indexable, and autoincrement only
/// makes sense for integer defaults.
fn check_indexable_flags(spec: &ColumnSpec) -> DbResult<()> {
    if (spec.primary_key || spec.unique) && !spec.sql_type.is_indexable() {
        return Err(DbError::ParseFailure {
            message: format!(
                "column '{}' of type {} cannot be indexed",
                spec.name, spec.sql_type
            ),
        });
    }
    if matches!(spec.default, Some(DefaultSpec::Autoincrement)) && !spec.sql_type.is_integer() {
        return Err(DbError::ParseFailure {
            message: format!("autoincrement column '{}' must be an integer", spec.name),
        });
    }
    Ok(())
}
