//! The persistent schema catalog.
//!
//! One catalog per `schema_id`, persisted as a TOML file in the platform
//! user-data directory (`golembase/schemas/<schema_id>.toml`). The file is
//! declarative and forward-extensible: unknown keys are ignored on load, so
//! older readers tolerate newer writers. Writes go through a temp file and
//! an atomic rename.
//!
//! The catalog does not serialize concurrent writers; DDL is expected to be
//! confined to a single administrative session, and readers observe the
//! most recent successful save.

mod ddl;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use golemdb_common::constants::DEFAULT_ENTITY_TTL;
use golemdb_common::{DbError, DbResult};

use crate::parser::{ColumnSpec, DefaultSpec, SqlType};

/// A column record as persisted in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Base type name (`INTEGER`, `VARCHAR`, `DECIMAL`, ...).
    #[serde(rename = "type")]
    pub type_name: String,
    /// DECIMAL precision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u8>,
    /// DECIMAL scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u8>,
    /// CHAR/VARCHAR length limit, in characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    /// NULL allowed.
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// Rendered default: a SQL literal or a generator tag
    /// (`current_timestamp`, `autoincrement`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Primary key column. At most one per table; always indexed.
    #[serde(default)]
    pub primary_key: bool,
    /// UNIQUE column (recorded, not enforced; implies indexed).
    #[serde(default)]
    pub unique: bool,
    /// Carries an `idx_` annotation.
    #[serde(default)]
    pub indexed: bool,
}

fn default_true() -> bool {
    true
}

fn default_entity_ttl() -> u64 {
    DEFAULT_ENTITY_TTL
}

impl ColumnDef {
    /// Builds a column record from a parsed column spec.
    pub fn from_spec(spec: &ColumnSpec) -> Self {
        let (precision, scale, length) = match &spec.sql_type {
            SqlType::Decimal { precision, scale } => (Some(*precision), Some(*scale), None),
            SqlType::Char(len) | SqlType::Varchar(len) => (None, None, *len),
            _ => (None, None, None),
        };
        Self {
            name: spec.name.clone(),
            type_name: spec.sql_type.base_name().to_string(),
            precision,
            scale,
            length,
            nullable: spec.nullable,
            default: spec.default.as_ref().map(DefaultSpec::render),
            primary_key: spec.primary_key,
            unique: spec.unique,
            indexed: spec.primary_key || spec.unique,
        }
    }

    /// Reconstructs the declared SQL type.
    pub fn sql_type(&self) -> DbResult<SqlType> {
        let ty = match self.type_name.to_ascii_uppercase().as_str() {
            "BOOLEAN" | "BOOL" => SqlType::Boolean,
            "TINYINT" => SqlType::TinyInt,
            "SMALLINT" => SqlType::SmallInt,
            "INTEGER" | "INT" => SqlType::Int,
            "BIGINT" => SqlType::BigInt,
            "FLOAT" | "REAL" => SqlType::Float,
            "DOUBLE" => SqlType::Double,
            "DECIMAL" | "NUMERIC" => SqlType::Decimal {
                precision: self.precision.unwrap_or(18),
                scale: self.scale.unwrap_or(0),
            },
            "CHAR" => SqlType::Char(self.length),
            "VARCHAR" => SqlType::Varchar(self.length),
            "TEXT" => SqlType::Text,
            "BLOB" | "VARBINARY" => SqlType::Blob,
            "DATETIME" | "TIMESTAMP" => SqlType::Timestamp,
            other => {
                return Err(DbError::internal(format!(
                    "catalog column '{}' has unknown type {other:?}",
                    self.name
                )))
            }
        };
        Ok(ty)
    }

    /// Parses the stored default, if any.
    pub fn default_spec(&self) -> DbResult<Option<DefaultSpec>> {
        self.default.as_deref().map(DefaultSpec::parse).transpose()
    }

    /// Human-readable type rendering for DESCRIBE output.
    pub fn type_display(&self) -> String {
        match self.sql_type() {
            Ok(ty) => ty.to_string(),
            Err(_) => self.type_name.clone(),
        }
    }
}

/// A single-column index record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDef {
    /// Index name, unique within the schema.
    pub name: String,
    /// Indexed column.
    pub column: String,
    /// UNIQUE index (recorded, not enforced).
    #[serde(default)]
    pub unique: bool,
}

/// A UNIQUE constraint record. Accepted and persisted, never enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniqueDef {
    /// Constraint name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Constrained columns.
    pub columns: Vec<String>,
}

/// A FOREIGN KEY record. Accepted and persisted, never enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyDef {
    /// Constraint name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Local columns.
    pub columns: Vec<String>,
    /// Referenced table.
    pub referenced_table: String,
    /// Referenced columns.
    pub referenced_columns: Vec<String>,
}

/// A table definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    /// Table name, unique within the schema.
    pub name: String,
    /// Block time-to-live applied to row entities.
    #[serde(default = "default_entity_ttl")]
    pub entity_ttl: u64,
    /// Columns, in declaration order.
    pub columns: Vec<ColumnDef>,
    /// Secondary indexes.
    #[serde(default)]
    pub indexes: Vec<IndexDef>,
    /// UNIQUE constraints (metadata only).
    #[serde(default)]
    pub unique_constraints: Vec<UniqueDef>,
    /// FOREIGN KEY constraints (metadata only).
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyDef>,
}

impl TableDef {
    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Looks up a column, failing with the proper error.
    pub fn column_required(&self, name: &str) -> DbResult<&ColumnDef> {
        self.column(name).ok_or_else(|| DbError::ColumnNotFound {
            column: name.to_string(),
            table: self.name.clone(),
        })
    }

    /// The primary key column, if any.
    pub fn primary_key(&self) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.primary_key)
    }

    /// True if the column carries an `idx_` annotation.
    pub fn is_indexed(&self, column: &str) -> bool {
        self.column(column).is_some_and(|c| {
            c.primary_key || c.unique || c.indexed
        }) || self.indexes.iter().any(|i| i.column == column)
    }

    /// Names of all columns in declaration order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    tables: BTreeMap<String, TableDef>,
}

/// The per-schema table registry.
#[derive(Debug)]
pub struct SchemaCatalog {
    schema_id: String,
    path: PathBuf,
    tables: BTreeMap<String, TableDef>,
}

impl SchemaCatalog {
    /// Opens the catalog for `schema_id` in the platform user-data
    /// directory, loading the persisted file when present.
    pub fn open(schema_id: &str) -> DbResult<Self> {
        Self::open_in(&Self::default_dir(), schema_id)
    }

    /// Opens the catalog under an explicit directory. Tests use this to
    /// isolate schema files.
    pub fn open_in(dir: &Path, schema_id: &str) -> DbResult<Self> {
        let path = dir.join(format!("{schema_id}.toml"));
        let tables = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| DbError::Catalog {
                schema_id: schema_id.to_string(),
                message: format!("cannot read {}: {e}", path.display()),
            })?;
            let file: CatalogFile = toml::from_str(&content).map_err(|e| DbError::Catalog {
                schema_id: schema_id.to_string(),
                message: format!("corrupt catalog file {}: {e}", path.display()),
            })?;
            file.tables
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            schema_id: schema_id.to_string(),
            path,
            tables,
        })
    }

    /// The platform-appropriate catalog directory.
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("golembase")
            .join("schemas")
    }

    /// The schema identifier this catalog serves.
    pub fn schema_id(&self) -> &str {
        &self.schema_id
    }

    /// Path of the persisted catalog file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persists the catalog atomically (temp file + rename).
    pub fn save(&self) -> DbResult<()> {
        let io_err = |message: String| DbError::Catalog {
            schema_id: self.schema_id.clone(),
            message,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| io_err(format!("cannot create {}: {e}", parent.display())))?;
        }

        let file = CatalogFile {
            tables: self.tables.clone(),
        };
        let content = toml::to_string_pretty(&file)
            .map_err(|e| io_err(format!("cannot serialize catalog: {e}")))?;

        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, content)
            .map_err(|e| io_err(format!("cannot write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| io_err(format!("cannot rename into {}: {e}", self.path.display())))?;

        debug!(schema_id = %self.schema_id, path = %self.path.display(), "catalog saved");
        Ok(())
    }

    /// Looks up a table by name.
    pub fn get_table(&self, name: &str) -> Option<&TableDef> {
        self.tables.get(name)
    }

    /// Looks up a table, failing with the proper error.
    pub fn table(&self, name: &str) -> DbResult<&TableDef> {
        self.get_table(name).ok_or_else(|| DbError::TableNotFound {
            table: name.to_string(),
        })
    }

    /// True if the table exists.
    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// All table names, sorted.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// BTL for a table's row entities; the default when the table is
    /// unknown.
    pub fn ttl_for_table(&self, name: &str) -> u64 {
        self.tables
            .get(name)
            .map_or(DEFAULT_ENTITY_TTL, |t| t.entity_ttl)
    }

    pub(crate) fn tables_mut(&mut self) -> &mut BTreeMap<String, TableDef> {
        &mut self.tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_statement;

    fn catalog(dir: &Path) -> SchemaCatalog {
        SchemaCatalog::open_in(dir, "test_schema").unwrap()
    }

    fn apply(catalog: &mut SchemaCatalog, sql: &str) -> DbResult<()> {
        catalog.apply_ddl(&parse_statement(sql).unwrap())
    }

    #[test]
    fn test_empty_when_file_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cat = catalog(dir.path());
        assert!(cat.table_names().is_empty());
        assert!(!cat.path().exists());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut cat = catalog(dir.path());
        apply(
            &mut cat,
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR(50) NOT NULL)",
        )
        .unwrap();
        assert!(cat.path().exists());

        let reloaded = catalog(dir.path());
        let table = reloaded.table("users").unwrap();
        assert_eq!(table.columns.len(), 2);
        assert!(table.columns[0].primary_key);
        assert!(!table.columns[0].nullable);
        assert_eq!(table.columns[1].length, Some(50));
        assert_eq!(table.entity_ttl, DEFAULT_ENTITY_TTL);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut cat = catalog(dir.path());
        apply(&mut cat, "CREATE TABLE t (id INTEGER)").unwrap();

        // A newer writer adds a key this reader does not know.
        let content = fs::read_to_string(cat.path()).unwrap();
        let content = content.replace("[tables.t]", "[tables.t]\nfuture_field = \"x\"");
        fs::write(cat.path(), content).unwrap();

        let reloaded = catalog(dir.path());
        assert!(reloaded.table_exists("t"));
    }

    #[test]
    fn test_corrupt_file_is_internal_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "tables = 3").unwrap();
        let err = SchemaCatalog::open_in(dir.path(), "bad").unwrap_err();
        assert_eq!(err.kind(), golemdb_common::ErrorKind::Internal);
    }

    #[test]
    fn test_ttl_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let mut cat = catalog(dir.path());
        apply(&mut cat, "CREATE TABLE t (id INTEGER) WITH (entity_ttl = 3600)").unwrap();
        assert_eq!(cat.ttl_for_table("t"), 3600);
        assert_eq!(cat.ttl_for_table("missing"), DEFAULT_ENTITY_TTL);
    }

    #[test]
    fn test_is_indexed_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let mut cat = catalog(dir.path());
        apply(
            &mut cat,
            "CREATE TABLE t (id INTEGER PRIMARY KEY, email VARCHAR(100) UNIQUE, age INTEGER, note TEXT)",
        )
        .unwrap();
        apply(&mut cat, "CREATE INDEX idx_t_age ON t (age)").unwrap();

        let table = cat.table("t").unwrap();
        assert!(table.is_indexed("id"));
        assert!(table.is_indexed("email"));
        assert!(table.is_indexed("age"));
        assert!(!table.is_indexed("note"));
    }

    #[test]
    fn test_column_type_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut cat = catalog(dir.path());
        apply(
            &mut cat,
            "CREATE TABLE t (price DECIMAL(8,2), ts DATETIME, flag BOOLEAN, data BLOB)",
        )
        .unwrap();

        let reloaded = catalog(dir.path());
        let table = reloaded.table("t").unwrap();
        assert_eq!(
            table.column("price").unwrap().sql_type().unwrap(),
            SqlType::Decimal {
                precision: 8,
                scale: 2
            }
        );
        assert_eq!(
            table.column("ts").unwrap().sql_type().unwrap(),
            SqlType::Timestamp
        );
        assert_eq!(
            table.column("flag").unwrap().sql_type().unwrap(),
            SqlType::Boolean
        );
        assert_eq!(
            table.column("data").unwrap().sql_type().unwrap(),
            SqlType::Blob
        );
    }
}
