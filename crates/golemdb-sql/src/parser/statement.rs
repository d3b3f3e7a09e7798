//! SQL statements supported by the adapter.
//!
//! sqlparser's AST is lowered into these types. The surface is the one the
//! backing store can serve: single-table DML and SELECT, the DDL the catalog
//! understands, and the introspection statements answered from the catalog.

use serde::{Deserialize, Serialize};
use sqlparser::ast as sql_ast;
use sqlparser::tokenizer::Token;

use golemdb_common::{DbError, DbResult};

use super::expr::Expr;
use super::types::{validate_identifier, Literal, SqlType};

/// A parsed SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// SELECT from a table.
    Select(SelectStatement),
    /// SELECT of constant expressions with no FROM clause (`SELECT 1`).
    SelectConstant(Vec<Literal>),
    /// INSERT.
    Insert(InsertStatement),
    /// UPDATE.
    Update(UpdateStatement),
    /// DELETE.
    Delete(DeleteStatement),
    /// CREATE TABLE.
    CreateTable(CreateTableStatement),
    /// DROP TABLE.
    DropTable(DropTableStatement),
    /// CREATE INDEX.
    CreateIndex(CreateIndexStatement),
    /// DROP INDEX.
    DropIndex(DropIndexStatement),
    /// ALTER TABLE.
    AlterTable(AlterTableStatement),
    /// SHOW TABLES.
    ShowTables,
    /// DESCRIBE <table>.
    DescribeTable {
        /// Table to describe.
        table: String,
    },
}

impl Statement {
    /// True for DDL statements, which mutate the catalog.
    pub fn is_ddl(&self) -> bool {
        matches!(
            self,
            Statement::CreateTable(_)
                | Statement::DropTable(_)
                | Statement::CreateIndex(_)
                | Statement::DropIndex(_)
                | Statement::AlterTable(_)
        )
    }

    /// Converts from sqlparser's Statement.
    pub fn from_sql_ast(stmt: sql_ast::Statement) -> DbResult<Self> {
        match stmt {
            sql_ast::Statement::Query(query) => select_from_query(*query),
            sql_ast::Statement::Insert {
                table_name,
                columns,
                source,
                ..
            } => Ok(Statement::Insert(InsertStatement::from_parts(
                table_name, columns, source,
            )?)),
            sql_ast::Statement::Update {
                table,
                assignments,
                from,
                selection,
                ..
            } => {
                if from.is_some() {
                    return Err(DbError::not_supported("UPDATE ... FROM".to_string()));
                }
                Ok(Statement::Update(UpdateStatement::from_parts(
                    table,
                    assignments,
                    selection,
                )?))
            }
            sql_ast::Statement::Delete {
                from, selection, ..
            } => Ok(Statement::Delete(DeleteStatement::from_parts(
                from, selection,
            )?)),
            sql_ast::Statement::CreateTable {
                name,
                columns,
                constraints,
                if_not_exists,
                with_options,
                ..
            } => Ok(Statement::CreateTable(CreateTableStatement::from_parts(
                name,
                columns,
                constraints,
                if_not_exists,
                with_options,
            )?)),
            sql_ast::Statement::Drop {
                object_type: sql_ast::ObjectType::Table,
                if_exists,
                names,
                ..
            } => Ok(Statement::DropTable(DropTableStatement {
                names: names.iter().map(object_table_name).collect::<DbResult<_>>()?,
                if_exists,
            })),
            sql_ast::Statement::Drop {
                object_type: sql_ast::ObjectType::Index,
                if_exists,
                names,
                ..
            } => Ok(Statement::DropIndex(DropIndexStatement {
                names: names.iter().map(|n| n.to_string()).collect(),
                if_exists,
            })),
            sql_ast::Statement::CreateIndex {
                name,
                table_name,
                columns,
                unique,
                if_not_exists,
                ..
            } => Ok(Statement::CreateIndex(CreateIndexStatement::from_parts(
                name,
                table_name,
                columns,
                unique,
                if_not_exists,
            )?)),
            sql_ast::Statement::AlterTable {
                name, operations, ..
            } => Ok(Statement::AlterTable(AlterTableStatement::from_parts(
                name, operations,
            )?)),
            sql_ast::Statement::ShowTables { .. } => Ok(Statement::ShowTables),
            sql_ast::Statement::ExplainTable { table_name, .. } => Ok(Statement::DescribeTable {
                table: object_table_name(&table_name)?,
            }),
            other => Err(DbError::not_supported(format!("statement {other}"))),
        }
    }
}

/// Extracts the bare table name from a possibly schema-qualified name.
fn object_table_name(name: &sql_ast::ObjectName) -> DbResult<String> {
    let table = name
        .0
        .last()
        .ok_or_else(|| DbError::ParseFailure {
            message: "empty table name".to_string(),
        })?
        .value
        .clone();
    validate_identifier(&table)?;
    Ok(table)
}

fn table_from_factor(factor: &sql_ast::TableFactor) -> DbResult<String> {
    match factor {
        sql_ast::TableFactor::Table { name, .. } => object_table_name(name),
        _ => Err(DbError::not_supported(
            "derived tables and subqueries in FROM".to_string(),
        )),
    }
}

fn extract_limit(expr: &sql_ast::Expr) -> DbResult<u64> {
    match expr {
        sql_ast::Expr::Value(sql_ast::Value::Number(n, _)) => {
            n.parse().map_err(|_| DbError::ParseFailure {
                message: format!("invalid LIMIT/OFFSET value: {n}"),
            })
        }
        other => Err(DbError::ParseFailure {
            message: format!("LIMIT/OFFSET must be an integer literal, got {other}"),
        }),
    }
}

// ---------------------------------------------------------------------------
// SELECT
// ---------------------------------------------------------------------------

/// Projection of a SELECT.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// `SELECT *`
    All,
    /// An explicit column list.
    Columns(Vec<String>),
}

/// ORDER BY clause (single column).
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// Sort column.
    pub column: String,
    /// DESC if true.
    pub descending: bool,
}

/// A single-table SELECT.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// Target table.
    pub table: String,
    /// Selected columns.
    pub projection: Projection,
    /// WHERE clause.
    pub where_clause: Option<Expr>,
    /// ORDER BY clause.
    pub order_by: Option<OrderBy>,
    /// LIMIT.
    pub limit: Option<u64>,
    /// OFFSET.
    pub offset: Option<u64>,
}

fn select_from_query(query: sql_ast::Query) -> DbResult<Statement> {
    if query.with.is_some() {
        return Err(DbError::not_supported("common table expressions".to_string()));
    }

    let select = match *query.body {
        sql_ast::SetExpr::Select(select) => select,
        _ => return Err(DbError::not_supported("set operations".to_string())),
    };

    if select.distinct.is_some() {
        return Err(DbError::not_supported("SELECT DISTINCT".to_string()));
    }
    if !select.group_by_is_empty() {
        return Err(DbError::not_supported("GROUP BY".to_string()));
    }
    if select.having.is_some() {
        return Err(DbError::not_supported("HAVING".to_string()));
    }

    // SELECT with no FROM clause: a constant row, answered without touching
    // the backing store.
    if select.from.is_empty() {
        let mut literals = Vec::with_capacity(select.projection.len());
        for item in select.projection {
            match item {
                sql_ast::SelectItem::UnnamedExpr(expr)
                | sql_ast::SelectItem::ExprWithAlias { expr, .. } => {
                    match Expr::from_sql_ast(expr)? {
                        Expr::Literal(lit) => literals.push(lit),
                        other => {
                            return Err(DbError::not_supported(format!(
                                "non-literal constant SELECT item {other}"
                            )))
                        }
                    }
                }
                _ => {
                    return Err(DbError::not_supported(
                        "wildcard in constant SELECT".to_string(),
                    ))
                }
            }
        }
        return Ok(Statement::SelectConstant(literals));
    }

    if select.from.len() > 1 {
        return Err(DbError::not_supported("JOIN queries".to_string()));
    }
    let from = &select.from[0];
    if !from.joins.is_empty() {
        return Err(DbError::not_supported("JOIN queries".to_string()));
    }
    let table = table_from_factor(&from.relation)?;

    let mut wildcard = false;
    let mut columns = Vec::new();
    for item in select.projection {
        match item {
            sql_ast::SelectItem::Wildcard(_) | sql_ast::SelectItem::QualifiedWildcard(_, _) => {
                wildcard = true;
            }
            sql_ast::SelectItem::UnnamedExpr(expr)
            | sql_ast::SelectItem::ExprWithAlias { expr, .. } => match Expr::from_sql_ast(expr)? {
                Expr::Column(name) => columns.push(name),
                other => {
                    return Err(DbError::not_supported(format!(
                        "SELECT item {other}; only plain columns are supported"
                    )))
                }
            },
        }
    }
    if wildcard && !columns.is_empty() {
        return Err(DbError::not_supported(
            "mixing * with named columns".to_string(),
        ));
    }

    let where_clause = select.selection.map(Expr::from_sql_ast).transpose()?;

    let order_by = match query.order_by.len() {
        0 => None,
        1 => {
            let order = query.order_by.into_iter().next().unwrap();
            let column = match Expr::from_sql_ast(order.expr)? {
                Expr::Column(name) => name,
                other => {
                    return Err(DbError::not_supported(format!(
                        "ORDER BY expression {other}; only plain columns are supported"
                    )))
                }
            };
            Some(OrderBy {
                column,
                descending: !order.asc.unwrap_or(true),
            })
        }
        _ => {
            return Err(DbError::not_supported(
                "ORDER BY on multiple columns".to_string(),
            ))
        }
    };

    let limit = query.limit.as_ref().map(extract_limit).transpose()?;
    let offset = query
        .offset
        .as_ref()
        .map(|o| extract_limit(&o.value))
        .transpose()?;

    Ok(Statement::Select(SelectStatement {
        table,
        projection: if wildcard {
            Projection::All
        } else {
            Projection::Columns(columns)
        },
        where_clause,
        order_by,
        limit,
        offset,
    }))
}

// ---------------------------------------------------------------------------
// DML
// ---------------------------------------------------------------------------

/// An INSERT of literal rows.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// Target table.
    pub table: String,
    /// Column list; empty means all columns in declaration order.
    pub columns: Vec<String>,
    /// Literal rows from the VALUES clause.
    pub rows: Vec<Vec<Expr>>,
}

impl InsertStatement {
    fn from_parts(
        table_name: sql_ast::ObjectName,
        columns: Vec<sql_ast::Ident>,
        source: Option<Box<sql_ast::Query>>,
    ) -> DbResult<Self> {
        let table = object_table_name(&table_name)?;
        let columns: Vec<String> = columns.into_iter().map(|c| c.value).collect();
        for column in &columns {
            validate_identifier(column)?;
        }

        let source = source.ok_or_else(|| DbError::ParseFailure {
            message: "INSERT without VALUES".to_string(),
        })?;
        let rows = match *source.body {
            sql_ast::SetExpr::Values(values) => {
                let rows: DbResult<Vec<Vec<Expr>>> = values
                    .rows
                    .into_iter()
                    .map(|row| row.into_iter().map(Expr::from_sql_ast).collect())
                    .collect();
                rows?
            }
            _ => {
                return Err(DbError::not_supported(
                    "INSERT ... SELECT".to_string(),
                ))
            }
        };
        if rows.is_empty() {
            return Err(DbError::ParseFailure {
                message: "INSERT with empty VALUES".to_string(),
            });
        }

        Ok(Self {
            table,
            columns,
            rows,
        })
    }
}

/// An UPDATE with literal assignments.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    /// Target table.
    pub table: String,
    /// `SET column = value` pairs.
    pub assignments: Vec<(String, Expr)>,
    /// WHERE clause.
    pub where_clause: Option<Expr>,
}

impl UpdateStatement {
    fn from_parts(
        table: sql_ast::TableWithJoins,
        assignments: Vec<sql_ast::Assignment>,
        selection: Option<sql_ast::Expr>,
    ) -> DbResult<Self> {
        if !table.joins.is_empty() {
            return Err(DbError::not_supported("UPDATE with JOIN".to_string()));
        }
        let table = table_from_factor(&table.relation)?;

        let assignments: DbResult<Vec<_>> = assignments
            .into_iter()
            .map(|assign| {
                let column = assign
                    .id
                    .last()
                    .ok_or_else(|| DbError::ParseFailure {
                        message: "empty assignment target".to_string(),
                    })?
                    .value
                    .clone();
                validate_identifier(&column)?;
                Ok((column, Expr::from_sql_ast(assign.value)?))
            })
            .collect();

        Ok(Self {
            table,
            assignments: assignments?,
            where_clause: selection.map(Expr::from_sql_ast).transpose()?,
        })
    }
}

/// A DELETE.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    /// Target table.
    pub table: String,
    /// WHERE clause.
    pub where_clause: Option<Expr>,
}

impl DeleteStatement {
    fn from_parts(
        from: Vec<sql_ast::TableWithJoins>,
        selection: Option<sql_ast::Expr>,
    ) -> DbResult<Self> {
        let table = from.first().ok_or_else(|| DbError::ParseFailure {
            message: "DELETE requires FROM".to_string(),
        })?;
        if from.len() > 1 || !table.joins.is_empty() {
            return Err(DbError::not_supported("DELETE with JOIN".to_string()));
        }

        Ok(Self {
            table: table_from_factor(&table.relation)?,
            where_clause: selection.map(Expr::from_sql_ast).transpose()?,
        })
    }
}

// ---------------------------------------------------------------------------
// DDL
// ---------------------------------------------------------------------------

/// A column default: a literal or a generator tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DefaultSpec {
    /// A literal value.
    Literal(Literal),
    /// Current time at insert, as Unix seconds.
    CurrentTimestamp,
    /// Value assigned from the table's counter entity.
    Autoincrement,
}

impl DefaultSpec {
    /// Renders this default for catalog storage.
    pub fn render(&self) -> String {
        match self {
            DefaultSpec::Literal(lit) => lit.to_string(),
            DefaultSpec::CurrentTimestamp => "current_timestamp".to_string(),
            DefaultSpec::Autoincrement => "autoincrement".to_string(),
        }
    }

    /// Parses a default rendered by [`render`](Self::render).
    pub fn parse(text: &str) -> DbResult<Self> {
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case("current_timestamp") {
            return Ok(DefaultSpec::CurrentTimestamp);
        }
        if trimmed.eq_ignore_ascii_case("autoincrement") {
            return Ok(DefaultSpec::Autoincrement);
        }
        if trimmed.eq_ignore_ascii_case("null") {
            return Ok(DefaultSpec::Literal(Literal::Null));
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Ok(DefaultSpec::Literal(Literal::Boolean(true)));
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Ok(DefaultSpec::Literal(Literal::Boolean(false)));
        }
        if let Some(inner) = trimmed
            .strip_prefix('\'')
            .and_then(|s| s.strip_suffix('\''))
        {
            return Ok(DefaultSpec::Literal(Literal::String(
                inner.replace("''", "'"),
            )));
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Ok(DefaultSpec::Literal(Literal::Integer(i)));
        }
        if trimmed.parse::<f64>().is_ok() {
            return Ok(DefaultSpec::Literal(Literal::Number(trimmed.to_string())));
        }
        Err(DbError::internal(format!(
            "unparseable column default: {text:?}"
        )))
    }

    fn from_sql_expr(expr: sql_ast::Expr) -> DbResult<Self> {
        match &expr {
            sql_ast::Expr::Identifier(ident)
                if ident.value.eq_ignore_ascii_case("current_timestamp") =>
            {
                return Ok(DefaultSpec::CurrentTimestamp);
            }
            sql_ast::Expr::Function(func)
                if func.name.to_string().eq_ignore_ascii_case("current_timestamp") =>
            {
                return Ok(DefaultSpec::CurrentTimestamp);
            }
            _ => {}
        }
        match Expr::from_sql_ast(expr)? {
            Expr::Literal(lit) => Ok(DefaultSpec::Literal(lit)),
            other => Err(DbError::not_supported(format!(
                "non-literal column default {other}"
            ))),
        }
    }
}

/// A column in CREATE TABLE / ALTER TABLE ADD COLUMN.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Declared type.
    pub sql_type: SqlType,
    /// NULL allowed.
    pub nullable: bool,
    /// Declared default.
    pub default: Option<DefaultSpec>,
    /// PRIMARY KEY.
    pub primary_key: bool,
    /// UNIQUE.
    pub unique: bool,
}

impl ColumnSpec {
    fn from_sql_ast(col: sql_ast::ColumnDef) -> DbResult<Self> {
        validate_identifier(&col.name.value)?;
        let sql_type = SqlType::from_sql_ast(&col.data_type)?;

        let mut nullable = true;
        let mut default = None;
        let mut primary_key = false;
        let mut unique = false;

        for opt in col.options {
            match opt.option {
                sql_ast::ColumnOption::Null => nullable = true,
                sql_ast::ColumnOption::NotNull => nullable = false,
                sql_ast::ColumnOption::Default(expr) => {
                    default = Some(DefaultSpec::from_sql_expr(expr)?);
                }
                sql_ast::ColumnOption::Unique { is_primary, .. } => {
                    if is_primary {
                        primary_key = true;
                        nullable = false;
                    } else {
                        unique = true;
                    }
                }
                sql_ast::ColumnOption::DialectSpecific(tokens) => {
                    let autoincrement = tokens.iter().any(|t| {
                        matches!(t, Token::Word(w)
                            if w.value.eq_ignore_ascii_case("AUTOINCREMENT")
                                || w.value.eq_ignore_ascii_case("AUTO_INCREMENT"))
                    });
                    if autoincrement {
                        default = Some(DefaultSpec::Autoincrement);
                    }
                }
                // Inline REFERENCES and CHECK are accepted and ignored; the
                // store cannot enforce them.
                sql_ast::ColumnOption::ForeignKey { .. } | sql_ast::ColumnOption::Check(_) => {}
                _ => {}
            }
        }

        if matches!(default, Some(DefaultSpec::Autoincrement)) && !sql_type.is_integer() {
            return Err(DbError::ParseFailure {
                message: format!(
                    "autoincrement requires an integer column, {} is {sql_type}",
                    col.name.value
                ),
            });
        }

        Ok(Self {
            name: col.name.value,
            sql_type,
            nullable,
            default,
            primary_key,
            unique,
        })
    }
}

/// A UNIQUE constraint record.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueSpec {
    /// Constraint name, if given.
    pub name: Option<String>,
    /// Constrained columns.
    pub columns: Vec<String>,
}

/// A FOREIGN KEY constraint record.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeySpec {
    /// Constraint name, if given.
    pub name: Option<String>,
    /// Local columns.
    pub columns: Vec<String>,
    /// Referenced table.
    pub referenced_table: String,
    /// Referenced columns.
    pub referenced_columns: Vec<String>,
}

/// CREATE TABLE.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    /// Table name.
    pub name: String,
    /// IF NOT EXISTS.
    pub if_not_exists: bool,
    /// Column definitions.
    pub columns: Vec<ColumnSpec>,
    /// UNIQUE constraint records (metadata only).
    pub unique_constraints: Vec<UniqueSpec>,
    /// FOREIGN KEY constraint records (metadata only).
    pub foreign_keys: Vec<ForeignKeySpec>,
    /// Entity BTL from `WITH (entity_ttl = N)`.
    pub entity_ttl: Option<u64>,
}

impl CreateTableStatement {
    fn from_parts(
        name: sql_ast::ObjectName,
        columns: Vec<sql_ast::ColumnDef>,
        constraints: Vec<sql_ast::TableConstraint>,
        if_not_exists: bool,
        with_options: Vec<sql_ast::SqlOption>,
    ) -> DbResult<Self> {
        let name = object_table_name(&name)?;
        let mut columns: Vec<ColumnSpec> = columns
            .into_iter()
            .map(ColumnSpec::from_sql_ast)
            .collect::<DbResult<_>>()?;

        let mut unique_constraints = Vec::new();
        let mut foreign_keys = Vec::new();

        for constraint in constraints {
            match constraint {
                sql_ast::TableConstraint::Unique {
                    name,
                    columns: cols,
                    is_primary,
                    ..
                } => {
                    let cols: Vec<String> = cols.into_iter().map(|c| c.value).collect();
                    if is_primary {
                        if cols.len() != 1 {
                            return Err(DbError::not_supported(
                                "composite primary keys".to_string(),
                            ));
                        }
                        let column = columns
                            .iter_mut()
                            .find(|c| c.name == cols[0])
                            .ok_or_else(|| DbError::ColumnNotFound {
                                column: cols[0].clone(),
                                table: String::new(),
                            })?;
                        column.primary_key = true;
                        column.nullable = false;
                    } else {
                        unique_constraints.push(UniqueSpec {
                            name: name.map(|n| n.value),
                            columns: cols,
                        });
                    }
                }
                sql_ast::TableConstraint::ForeignKey {
                    name,
                    columns: cols,
                    foreign_table,
                    referred_columns,
                    ..
                } => foreign_keys.push(ForeignKeySpec {
                    name: name.map(|n| n.value),
                    columns: cols.into_iter().map(|c| c.value).collect(),
                    referenced_table: foreign_table.to_string(),
                    referenced_columns: referred_columns.into_iter().map(|c| c.value).collect(),
                }),
                other => {
                    return Err(DbError::not_supported(format!(
                        "table constraint {other}"
                    )))
                }
            }
        }

        if columns.iter().filter(|c| c.primary_key).count() > 1 {
            return Err(DbError::not_supported("composite primary keys".to_string()));
        }

        let mut entity_ttl = None;
        for opt in with_options {
            if opt.name.value.eq_ignore_ascii_case("entity_ttl") {
                let rendered = opt.value.to_string();
                entity_ttl = Some(rendered.parse::<u64>().map_err(|_| {
                    DbError::ParseFailure {
                        message: format!("entity_ttl must be an unsigned integer, got {rendered}"),
                    }
                })?);
            }
        }

        Ok(Self {
            name,
            if_not_exists,
            columns,
            unique_constraints,
            foreign_keys,
            entity_ttl,
        })
    }
}

/// DROP TABLE.
#[derive(Debug, Clone, PartialEq)]
pub struct DropTableStatement {
    /// Tables to drop.
    pub names: Vec<String>,
    /// IF EXISTS.
    pub if_exists: bool,
}

/// CREATE INDEX (single column).
#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndexStatement {
    /// Index name.
    pub name: String,
    /// Indexed table.
    pub table: String,
    /// Indexed column. Composite indexes are not expressible.
    pub column: String,
    /// UNIQUE index (recorded, not enforced).
    pub unique: bool,
    /// IF NOT EXISTS.
    pub if_not_exists: bool,
}

impl CreateIndexStatement {
    fn from_parts(
        name: Option<sql_ast::ObjectName>,
        table_name: sql_ast::ObjectName,
        columns: Vec<sql_ast::OrderByExpr>,
        unique: bool,
        if_not_exists: bool,
    ) -> DbResult<Self> {
        let table = object_table_name(&table_name)?;
        if columns.len() != 1 {
            return Err(DbError::not_supported("composite indexes".to_string()));
        }
        let column = match Expr::from_sql_ast(columns.into_iter().next().unwrap().expr)? {
            Expr::Column(name) => name,
            other => {
                return Err(DbError::not_supported(format!(
                    "index expression {other}; only plain columns are supported"
                )))
            }
        };

        let name = match name {
            Some(n) => n.to_string(),
            None => format!("idx_{table}_{column}"),
        };

        Ok(Self {
            name,
            table,
            column,
            unique,
            if_not_exists,
        })
    }
}

/// DROP INDEX.
#[derive(Debug, Clone, PartialEq)]
pub struct DropIndexStatement {
    /// Indexes to drop.
    pub names: Vec<String>,
    /// IF EXISTS.
    pub if_exists: bool,
}

/// ALTER TABLE.
#[derive(Debug, Clone, PartialEq)]
pub struct AlterTableStatement {
    /// Target table.
    pub table: String,
    /// Operations, applied in order.
    pub operations: Vec<AlterOperation>,
}

/// Supported ALTER TABLE operations.
#[derive(Debug, Clone, PartialEq)]
pub enum AlterOperation {
    /// ADD COLUMN.
    AddColumn(ColumnSpec),
    /// ADD CONSTRAINT UNIQUE (metadata only).
    AddUnique(UniqueSpec),
    /// ADD CONSTRAINT FOREIGN KEY (metadata only).
    AddForeignKey(ForeignKeySpec),
}

impl AlterTableStatement {
    fn from_parts(
        name: sql_ast::ObjectName,
        operations: Vec<sql_ast::AlterTableOperation>,
    ) -> DbResult<Self> {
        let table = object_table_name(&name)?;
        let operations: DbResult<Vec<_>> = operations
            .into_iter()
            .map(|op| match op {
                sql_ast::AlterTableOperation::AddColumn { column_def, .. } => {
                    Ok(AlterOperation::AddColumn(ColumnSpec::from_sql_ast(
                        column_def,
                    )?))
                }
                sql_ast::AlterTableOperation::AddConstraint(constraint) => match constraint {
                    sql_ast::TableConstraint::Unique {
                        name,
                        columns,
                        is_primary: false,
                        ..
                    } => Ok(AlterOperation::AddUnique(UniqueSpec {
                        name: name.map(|n| n.value),
                        columns: columns.into_iter().map(|c| c.value).collect(),
                    })),
                    sql_ast::TableConstraint::ForeignKey {
                        name,
                        columns,
                        foreign_table,
                        referred_columns,
                        ..
                    } => Ok(AlterOperation::AddForeignKey(ForeignKeySpec {
                        name: name.map(|n| n.value),
                        columns: columns.into_iter().map(|c| c.value).collect(),
                        referenced_table: foreign_table.to_string(),
                        referenced_columns: referred_columns
                            .into_iter()
                            .map(|c| c.value)
                            .collect(),
                    })),
                    other => Err(DbError::not_supported(format!(
                        "ALTER TABLE ADD CONSTRAINT {other}"
                    ))),
                },
                other => Err(DbError::not_supported(format!(
                    "ALTER TABLE operation {other:?}"
                ))),
            })
            .collect();

        Ok(Self {
            table,
            operations: operations?,
        })
    }
}

// sqlparser 0.43 models GROUP BY as an enum; treat "no expressions" as empty.
trait GroupByIsEmpty {
    fn group_by_is_empty(&self) -> bool;
}

impl GroupByIsEmpty for sql_ast::Select {
    fn group_by_is_empty(&self) -> bool {
        match &self.group_by {
            sql_ast::GroupByExpr::Expressions(exprs) => exprs.is_empty(),
            sql_ast::GroupByExpr::All => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_statement;

    #[test]
    fn test_select_statement() {
        let stmt =
            parse_statement("SELECT id, name FROM users WHERE age > 30 ORDER BY name LIMIT 10 OFFSET 5")
                .unwrap();
        match stmt {
            Statement::Select(select) => {
                assert_eq!(select.table, "users");
                assert_eq!(
                    select.projection,
                    Projection::Columns(vec!["id".to_string(), "name".to_string()])
                );
                assert!(select.where_clause.is_some());
                assert_eq!(
                    select.order_by,
                    Some(OrderBy {
                        column: "name".to_string(),
                        descending: false
                    })
                );
                assert_eq!(select.limit, Some(10));
                assert_eq!(select.offset, Some(5));
            }
            other => panic!("expected SELECT, got {other:?}"),
        }
    }

    #[test]
    fn test_select_constant() {
        let stmt = parse_statement("SELECT 1").unwrap();
        assert_eq!(stmt, Statement::SelectConstant(vec![Literal::Integer(1)]));

        let stmt = parse_statement("SELECT 'ping', 2").unwrap();
        assert_eq!(
            stmt,
            Statement::SelectConstant(vec![
                Literal::String("ping".to_string()),
                Literal::Integer(2)
            ])
        );
    }

    #[test]
    fn test_insert_statement() {
        let stmt =
            parse_statement("INSERT INTO users (id, name) VALUES (1, 'Alice'), (2, 'Bob')").unwrap();
        match stmt {
            Statement::Insert(insert) => {
                assert_eq!(insert.table, "users");
                assert_eq!(insert.columns, vec!["id", "name"]);
                assert_eq!(insert.rows.len(), 2);
            }
            other => panic!("expected INSERT, got {other:?}"),
        }
    }

    #[test]
    fn test_update_statement() {
        let stmt = parse_statement("UPDATE users SET name = 'Jane', age = 26 WHERE id = 1").unwrap();
        match stmt {
            Statement::Update(update) => {
                assert_eq!(update.table, "users");
                assert_eq!(update.assignments.len(), 2);
                assert!(update.where_clause.is_some());
            }
            other => panic!("expected UPDATE, got {other:?}"),
        }
    }

    #[test]
    fn test_create_table_statement() {
        let stmt = parse_statement(
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY,
                name VARCHAR(50) NOT NULL,
                email VARCHAR(255) UNIQUE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .unwrap();
        match stmt {
            Statement::CreateTable(create) => {
                assert_eq!(create.name, "users");
                assert_eq!(create.columns.len(), 4);
                assert!(create.columns[0].primary_key);
                assert!(!create.columns[0].nullable);
                assert!(!create.columns[1].nullable);
                assert!(create.columns[2].unique);
                assert_eq!(
                    create.columns[3].default,
                    Some(DefaultSpec::CurrentTimestamp)
                );
            }
            other => panic!("expected CREATE TABLE, got {other:?}"),
        }
    }

    #[test]
    fn test_create_table_autoincrement() {
        let stmt = parse_statement(
            "CREATE TABLE posts (id INTEGER PRIMARY KEY AUTOINCREMENT, title VARCHAR(200))",
        )
        .unwrap();
        match stmt {
            Statement::CreateTable(create) => {
                assert_eq!(create.columns[0].default, Some(DefaultSpec::Autoincrement));
            }
            other => panic!("expected CREATE TABLE, got {other:?}"),
        }
    }

    #[test]
    fn test_autoincrement_requires_integer() {
        let err = parse_statement("CREATE TABLE t (name VARCHAR(10) AUTOINCREMENT)").unwrap_err();
        assert!(err.to_string().contains("autoincrement"));
    }

    #[test]
    fn test_create_index_single_column() {
        let stmt = parse_statement("CREATE INDEX idx_users_age ON users (age)").unwrap();
        match stmt {
            Statement::CreateIndex(index) => {
                assert_eq!(index.name, "idx_users_age");
                assert_eq!(index.table, "users");
                assert_eq!(index.column, "age");
            }
            other => panic!("expected CREATE INDEX, got {other:?}"),
        }

        let err = parse_statement("CREATE INDEX i ON users (a, b)").unwrap_err();
        assert!(err.to_string().contains("composite"));
    }

    #[test]
    fn test_alter_table_add_column() {
        let stmt =
            parse_statement("ALTER TABLE users ADD COLUMN bio TEXT").unwrap();
        match stmt {
            Statement::AlterTable(alter) => {
                assert_eq!(alter.table, "users");
                assert!(matches!(&alter.operations[0], AlterOperation::AddColumn(c) if c.name == "bio"));
            }
            other => panic!("expected ALTER TABLE, got {other:?}"),
        }
    }

    #[test]
    fn test_introspection_statements() {
        assert_eq!(parse_statement("SHOW TABLES").unwrap(), Statement::ShowTables);
        assert_eq!(
            parse_statement("DESCRIBE users").unwrap(),
            Statement::DescribeTable {
                table: "users".to_string()
            }
        );
    }

    #[test]
    fn test_join_rejected() {
        let err =
            parse_statement("SELECT * FROM users u JOIN posts p ON u.id = p.user_id").unwrap_err();
        assert!(err.to_string().contains("JOIN"));
    }

    #[test]
    fn test_group_by_rejected() {
        let err = parse_statement("SELECT age FROM users GROUP BY age").unwrap_err();
        assert!(err.to_string().contains("GROUP BY"));
    }

    #[test]
    fn test_default_spec_round_trip() {
        for spec in [
            DefaultSpec::CurrentTimestamp,
            DefaultSpec::Autoincrement,
            DefaultSpec::Literal(Literal::Integer(0)),
            DefaultSpec::Literal(Literal::String("active".to_string())),
            DefaultSpec::Literal(Literal::Boolean(true)),
            DefaultSpec::Literal(Literal::Null),
        ] {
            let rendered = spec.render();
            assert_eq!(DefaultSpec::parse(&rendered).unwrap(), spec, "{rendered}");
        }
    }
}
