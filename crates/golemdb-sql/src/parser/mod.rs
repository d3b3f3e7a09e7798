//! SQL parsing.
//!
//! The front end is the `sqlparser` crate with the generic dialect; its AST
//! is lowered into the adapter's internal [`Statement`] form, which carries
//! only what the backing store can serve. Parse failures classify as
//! programming errors; recognizable-but-untranslatable constructs classify
//! as not-supported.

use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser as SqlParser;

use golemdb_common::{DbError, DbResult};

pub mod expr;
pub mod statement;
pub mod types;

pub use expr::{BinaryOperator, Expr};
pub use statement::{
    AlterOperation, AlterTableStatement, ColumnSpec, CreateIndexStatement, CreateTableStatement,
    DefaultSpec, DeleteStatement, DropIndexStatement, DropTableStatement, ForeignKeySpec,
    InsertStatement, OrderBy, Projection, SelectStatement, Statement, UniqueSpec, UpdateStatement,
};
pub use types::{Literal, SqlType};

/// Parses a single SQL statement.
pub fn parse_statement(sql: &str) -> DbResult<Statement> {
    if sql.trim().is_empty() {
        return Err(DbError::ParseFailure {
            message: "empty statement".to_string(),
        });
    }

    let dialect = GenericDialect {};
    let mut ast = SqlParser::parse_sql(&dialect, sql).map_err(|e| DbError::ParseFailure {
        message: e.to_string(),
    })?;

    match ast.len() {
        0 => Err(DbError::ParseFailure {
            message: "empty statement".to_string(),
        }),
        1 => Statement::from_sql_ast(ast.remove(0)),
        n => Err(DbError::ParseFailure {
            message: format!("expected a single statement, got {n}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        assert!(parse_statement("").is_err());
        assert!(parse_statement("   ").is_err());
    }

    #[test]
    fn test_parse_garbage() {
        let err = parse_statement("INVALID SQL STATEMENT").unwrap_err();
        assert_eq!(err.kind(), golemdb_common::ErrorKind::Programming);
    }

    #[test]
    fn test_multiple_statements_rejected() {
        let err = parse_statement("SELECT 1; SELECT 2").unwrap_err();
        assert!(err.to_string().contains("single statement"));
    }
}
