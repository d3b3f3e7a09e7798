//! End-to-end tests against the in-memory mock store.

use std::sync::Arc;

use tempfile::TempDir;

use golemdb_client::MockClient;
use golemdb_driver::{
    ConnectOptions, Connection, ConnectionParams, DbError, ErrorKind, ParamValue, Params, Value,
};

const KEY: &str = "0x0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

struct TestDb {
    conn: Connection,
    // Holds the catalog directory alive for the connection's lifetime.
    _dir: TempDir,
    client: Arc<MockClient>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn connect(app_id: &str, schema_id: &str) -> TestDb {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(MockClient::new());
    let conn = connect_in(&dir, client.clone(), app_id, schema_id).await;
    TestDb {
        conn,
        _dir: dir,
        client,
    }
}

async fn connect_in(
    dir: &TempDir,
    client: Arc<MockClient>,
    app_id: &str,
    schema_id: &str,
) -> Connection {
    let params = ConnectionParams::new(
        "https://rpc.example/rpc",
        "wss://rpc.example/ws",
        KEY,
        app_id,
        schema_id,
    )
    .unwrap();
    Connection::connect_with(
        params,
        client,
        ConnectOptions {
            schema_dir: Some(dir.path().to_path_buf()),
            retry: None,
        },
    )
    .await
    .unwrap()
}

async fn exec(conn: &Connection, sql: &str) -> i64 {
    let mut cursor = conn.cursor().unwrap();
    cursor.execute(sql, &Params::new()).await.unwrap();
    cursor.rowcount()
}

async fn query(conn: &Connection, sql: &str) -> Vec<Vec<Value>> {
    let mut cursor = conn.cursor().unwrap();
    cursor.execute(sql, &Params::new()).await.unwrap();
    cursor.fetchall()
}

#[tokio::test]
async fn test_ddl_persistence_and_introspection() {
    let db = connect("app", "ddl_schema").await;
    exec(
        &db.conn,
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR(50))",
    )
    .await;

    // The catalog file lands on disk and a fresh connection sees the table.
    let conn2 = connect_in(&db._dir, db.client.clone(), "app", "ddl_schema").await;
    let tables = query(&conn2, "SHOW TABLES").await;
    assert_eq!(tables, vec![vec![Value::String("users".to_string())]]);

    let columns = query(&conn2, "DESCRIBE users").await;
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0][0], Value::String("id".to_string()));
    assert_eq!(columns[0][1], Value::String("INTEGER".to_string()));
    assert_eq!(columns[0][3], Value::String("PRI".to_string()));
    assert_eq!(columns[1][0], Value::String("name".to_string()));
    assert_eq!(columns[1][1], Value::String("VARCHAR(50)".to_string()));

    let err = conn2
        .cursor()
        .unwrap()
        .execute("DESCRIBE missing", &Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::TableNotFound { .. }));
}

#[tokio::test]
async fn test_insert_then_select_range() {
    let db = connect("app", "s1").await;
    exec(
        &db.conn,
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR(50))",
    )
    .await;
    assert_eq!(
        exec(&db.conn, "INSERT INTO users (id, name) VALUES (1, 'a')").await,
        1
    );
    assert_eq!(
        exec(&db.conn, "INSERT INTO users (id, name) VALUES (2, 'b')").await,
        1
    );

    let rows = query(&db.conn, "SELECT * FROM users WHERE id > 1").await;
    assert_eq!(
        rows,
        vec![vec![Value::Int(2), Value::String("b".to_string())]]
    );
}

#[tokio::test]
async fn test_negative_integer_range() {
    let db = connect("app", "s2").await;
    exec(&db.conn, "CREATE TABLE t (delta INTEGER)").await;
    exec(&db.conn, "CREATE INDEX idx_t_delta ON t (delta)").await;
    for v in [-5, 0, 5] {
        exec(&db.conn, &format!("INSERT INTO t (delta) VALUES ({v})")).await;
    }

    let rows = query(
        &db.conn,
        "SELECT delta FROM t WHERE delta >= -1 ORDER BY delta",
    )
    .await;
    assert_eq!(rows, vec![vec![Value::Int(0)], vec![Value::Int(5)]]);
}

#[tokio::test]
async fn test_decimal_range_and_order() {
    let db = connect("app", "s3").await;
    exec(&db.conn, "CREATE TABLE t (price DECIMAL(6,2))").await;
    exec(&db.conn, "CREATE INDEX idx_t_price ON t (price)").await;
    for v in ["-10.50", "0.00", "10.50"] {
        exec(&db.conn, &format!("INSERT INTO t (price) VALUES ({v})")).await;
    }

    let rows = query(
        &db.conn,
        "SELECT price FROM t WHERE price > -1.00 ORDER BY price",
    )
    .await;
    assert_eq!(
        rows,
        vec![
            vec![Value::Decimal {
                unscaled: 0,
                scale: 2
            }],
            vec![Value::Decimal {
                unscaled: 1050,
                scale: 2
            }],
        ]
    );
}

#[tokio::test]
async fn test_tenant_isolation() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(MockClient::new());
    let conn_a = connect_in(&dir, client.clone(), "tenant_a", "schema_a").await;
    let conn_b = connect_in(&dir, client.clone(), "tenant_b", "schema_b").await;

    exec(&conn_a, "CREATE TABLE items (id INTEGER PRIMARY KEY, label VARCHAR(20))").await;
    exec(&conn_b, "CREATE TABLE items (id INTEGER PRIMARY KEY, label VARCHAR(20))").await;

    exec(&conn_a, "INSERT INTO items (id, label) VALUES (1, 'from_a')").await;
    exec(&conn_b, "INSERT INTO items (id, label) VALUES (1, 'from_b')").await;

    let rows_a = query(&conn_a, "SELECT label FROM items").await;
    assert_eq!(rows_a, vec![vec![Value::String("from_a".to_string())]]);

    let rows_b = query(&conn_b, "SELECT label FROM items").await;
    assert_eq!(rows_b, vec![vec![Value::String("from_b".to_string())]]);

    // Both rows exist in the shared store; only the relation scope differs.
    assert_eq!(client.entity_count(), 2);
}

#[tokio::test]
async fn test_non_indexable_predicate_rejected() {
    let db = connect("app", "s6").await;
    exec(&db.conn, "CREATE TABLE t (x DOUBLE)").await;

    let err = db
        .conn
        .cursor()
        .unwrap()
        .execute("SELECT * FROM t WHERE x > 1.0", &Params::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);
    assert!(err.to_string().contains("column x is not indexable"));
}

#[tokio::test]
async fn test_autoincrement_assigns_sequential_ids() {
    let db = connect("app", "auto").await;
    exec(
        &db.conn,
        "CREATE TABLE posts (id INTEGER PRIMARY KEY AUTOINCREMENT, title VARCHAR(100))",
    )
    .await;

    exec(&db.conn, "INSERT INTO posts (title) VALUES ('first')").await;
    exec(&db.conn, "INSERT INTO posts (title) VALUES ('second')").await;
    exec(&db.conn, "INSERT INTO posts (title) VALUES ('third')").await;

    let rows = query(&db.conn, "SELECT id, title FROM posts ORDER BY id").await;
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0][0], Value::Int(1));
    assert_eq!(rows[1][0], Value::Int(2));
    assert_eq!(rows[2][0], Value::Int(3));

    // An explicit id bypasses the counter.
    exec(&db.conn, "INSERT INTO posts (id, title) VALUES (42, 'pinned')").await;
    let rows = query(&db.conn, "SELECT id FROM posts WHERE id = 42").await;
    assert_eq!(rows, vec![vec![Value::Int(42)]]);
}

#[tokio::test]
async fn test_update_and_delete() {
    let db = connect("app", "dml").await;
    exec(
        &db.conn,
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR(50), age INTEGER)",
    )
    .await;
    exec(&db.conn, "CREATE INDEX idx_users_age ON users (age)").await;
    exec(
        &db.conn,
        "INSERT INTO users (id, name, age) VALUES (1, 'Alice', 30)",
    )
    .await;
    exec(
        &db.conn,
        "INSERT INTO users (id, name, age) VALUES (2, 'Bob', 17)",
    )
    .await;

    let updated = exec(&db.conn, "UPDATE users SET name = 'Alicia' WHERE id = 1").await;
    assert_eq!(updated, 1);
    let rows = query(&db.conn, "SELECT name FROM users WHERE id = 1").await;
    assert_eq!(rows, vec![vec![Value::String("Alicia".to_string())]]);

    let deleted = exec(&db.conn, "DELETE FROM users WHERE age < 18").await;
    assert_eq!(deleted, 1);
    let rows = query(&db.conn, "SELECT id FROM users ORDER BY id").await;
    assert_eq!(rows, vec![vec![Value::Int(1)]]);
}

#[tokio::test]
async fn test_like_prefix_and_post_filter() {
    let db = connect("app", "like").await;
    exec(
        &db.conn,
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR(50), bio TEXT)",
    )
    .await;
    exec(&db.conn, "CREATE INDEX idx_users_name ON users (name)").await;
    exec(
        &db.conn,
        "INSERT INTO users (id, name, bio) VALUES (1, 'Alice', 'writes rust')",
    )
    .await;
    exec(
        &db.conn,
        "INSERT INTO users (id, name, bio) VALUES (2, 'Bob', 'writes go')",
    )
    .await;

    // Indexed prefix LIKE pushes down as a glob.
    let rows = query(&db.conn, "SELECT id FROM users WHERE name LIKE 'Al%'").await;
    assert_eq!(rows, vec![vec![Value::Int(1)]]);

    // Non-indexed column: evaluated in-core with full pattern support.
    let rows = query(&db.conn, "SELECT id FROM users WHERE bio LIKE '%rust%'").await;
    assert_eq!(rows, vec![vec![Value::Int(1)]]);

    // Non-prefix LIKE on an indexed column cannot be pushed down.
    let err = db
        .conn
        .cursor()
        .unwrap()
        .execute("SELECT id FROM users WHERE name LIKE '%ce'", &Params::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);
}

#[tokio::test]
async fn test_is_null_post_filter() {
    let db = connect("app", "nulls").await;
    exec(
        &db.conn,
        "CREATE TABLE t (id INTEGER PRIMARY KEY, note VARCHAR(50))",
    )
    .await;
    exec(&db.conn, "INSERT INTO t (id, note) VALUES (1, 'x')").await;
    exec(&db.conn, "INSERT INTO t (id) VALUES (2)").await;

    let rows = query(&db.conn, "SELECT id FROM t WHERE note IS NULL").await;
    assert_eq!(rows, vec![vec![Value::Int(2)]]);

    let rows = query(&db.conn, "SELECT id FROM t WHERE note IS NOT NULL").await;
    assert_eq!(rows, vec![vec![Value::Int(1)]]);
}

#[tokio::test]
async fn test_named_parameters() {
    let db = connect("app", "params").await;
    exec(
        &db.conn,
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR(50))",
    )
    .await;

    let mut cursor = db.conn.cursor().unwrap();
    let params: Params = [
        ("id".to_string(), ParamValue::Int(7)),
        ("name".to_string(), ParamValue::Str("O'Brien".to_string())),
    ]
    .into();
    cursor
        .execute(
            "INSERT INTO users (id, name) VALUES (%(id)s, %(name)s)",
            &params,
        )
        .await
        .unwrap();

    let mut cursor = db.conn.cursor().unwrap();
    let params: Params = [("name".to_string(), ParamValue::Str("O'Brien".to_string()))].into();
    cursor
        .execute("SELECT id FROM users WHERE name = :name", &params)
        .await
        .unwrap();
    assert_eq!(cursor.fetchall(), vec![vec![Value::Int(7)]]);
}

#[tokio::test]
async fn test_executemany_batches_inserts() {
    let db = connect("app", "many").await;
    exec(
        &db.conn,
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR(50))",
    )
    .await;

    let sets: Vec<Params> = (1..=3)
        .map(|i| {
            [
                ("id".to_string(), ParamValue::Int(i)),
                ("name".to_string(), ParamValue::Str(format!("user{i}"))),
            ]
            .into()
        })
        .collect();

    let mut cursor = db.conn.cursor().unwrap();
    cursor
        .executemany(
            "INSERT INTO users (id, name) VALUES (%(id)s, %(name)s)",
            &sets,
        )
        .await
        .unwrap();
    assert_eq!(cursor.rowcount(), 3);

    let rows = query(&db.conn, "SELECT id FROM users ORDER BY id").await;
    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn test_defaults_applied() {
    let db = connect("app", "defaults").await;
    exec(
        &db.conn,
        "CREATE TABLE jobs (
            id INTEGER PRIMARY KEY,
            status VARCHAR(20) NOT NULL DEFAULT 'queued',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .await;
    exec(&db.conn, "INSERT INTO jobs (id) VALUES (1)").await;

    let rows = query(&db.conn, "SELECT status, created_at FROM jobs").await;
    assert_eq!(rows[0][0], Value::String("queued".to_string()));
    assert!(matches!(rows[0][1], Value::Timestamp(t) if t > 0));
}

#[tokio::test]
async fn test_not_null_enforced() {
    let db = connect("app", "notnull").await;
    exec(
        &db.conn,
        "CREATE TABLE t (id INTEGER PRIMARY KEY, name VARCHAR(20) NOT NULL)",
    )
    .await;

    let err = db
        .conn
        .cursor()
        .unwrap()
        .execute("INSERT INTO t (id) VALUES (1)", &Params::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Data);
}

#[tokio::test]
async fn test_select_constant_answers_without_store() {
    let db = connect("app", "const").await;
    let rows = query(&db.conn, "SELECT 1").await;
    assert_eq!(rows, vec![vec![Value::BigInt(1)]]);
    // No entity was ever created.
    assert_eq!(db.client.entity_count(), 0);
}

#[tokio::test]
async fn test_order_limit_offset() {
    let db = connect("app", "paging").await;
    exec(&db.conn, "CREATE TABLE t (n INTEGER PRIMARY KEY)").await;
    for n in [5, 3, 1, 4, 2] {
        exec(&db.conn, &format!("INSERT INTO t (n) VALUES ({n})")).await;
    }

    let rows = query(&db.conn, "SELECT n FROM t ORDER BY n DESC LIMIT 2 OFFSET 1").await;
    assert_eq!(rows, vec![vec![Value::Int(4)], vec![Value::Int(3)]]);
}

#[tokio::test]
async fn test_fetch_interface() {
    let db = connect("app", "fetch").await;
    exec(&db.conn, "CREATE TABLE t (n INTEGER PRIMARY KEY)").await;
    for n in 1..=5 {
        exec(&db.conn, &format!("INSERT INTO t (n) VALUES ({n})")).await;
    }

    let mut cursor = db.conn.cursor().unwrap();
    cursor
        .execute("SELECT n FROM t ORDER BY n", &Params::new())
        .await
        .unwrap();
    assert_eq!(cursor.rowcount(), 5);
    assert_eq!(cursor.fetchone(), Some(vec![Value::Int(1)]));

    cursor.set_arraysize(2).unwrap();
    assert_eq!(cursor.fetchmany(None).len(), 2);
    assert_eq!(cursor.fetchall().len(), 2);
    assert_eq!(cursor.fetchone(), None);

    let description = cursor.description().unwrap();
    assert_eq!(description[0].name, "n");
    assert_eq!(description[0].type_name, "INTEGER");
}

#[tokio::test]
async fn test_closed_handles_rejected() {
    let db = connect("app", "closed").await;
    let mut cursor = db.conn.cursor().unwrap();
    cursor.close();
    let err = cursor.execute("SELECT 1", &Params::new()).await.unwrap_err();
    assert!(matches!(err, DbError::Closed { handle: "cursor" }));

    db.conn.close();
    let err = db.conn.cursor().unwrap_err();
    assert!(matches!(err, DbError::Closed { handle: "connection" }));
}

#[tokio::test]
async fn test_commit_rollback_are_noops() {
    let db = connect("app", "txn").await;
    exec(&db.conn, "CREATE TABLE t (n INTEGER PRIMARY KEY)").await;
    exec(&db.conn, "INSERT INTO t (n) VALUES (1)").await;

    db.conn.commit().unwrap();
    db.conn.rollback().unwrap();

    // The insert was applied immediately; rollback cannot undo it.
    let rows = query(&db.conn, "SELECT n FROM t").await;
    assert_eq!(rows, vec![vec![Value::Int(1)]]);
}

#[tokio::test]
async fn test_unique_accepted_not_enforced() {
    let db = connect("app", "uniq").await;
    exec(
        &db.conn,
        "CREATE TABLE t (id INTEGER PRIMARY KEY, email VARCHAR(100) UNIQUE)",
    )
    .await;

    exec(&db.conn, "INSERT INTO t (id, email) VALUES (1, 'a@x')").await;
    // The duplicate is silently accepted; the store cannot enforce it.
    exec(&db.conn, "INSERT INTO t (id, email) VALUES (2, 'a@x')").await;

    let rows = query(&db.conn, "SELECT id FROM t WHERE email = 'a@x' ORDER BY id").await;
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_varchar_overflow_is_data_error() {
    let db = connect("app", "overflow").await;
    exec(&db.conn, "CREATE TABLE t (name VARCHAR(3))").await;

    let err = db
        .conn
        .cursor()
        .unwrap()
        .execute("INSERT INTO t (name) VALUES ('toolong')", &Params::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Data);
}

#[tokio::test]
async fn test_boolean_and_datetime_filters() {
    let db = connect("app", "mixed").await;
    exec(
        &db.conn,
        "CREATE TABLE events (
            id INTEGER PRIMARY KEY,
            important BOOLEAN,
            at DATETIME
        )",
    )
    .await;
    exec(&db.conn, "CREATE INDEX idx_events_important ON events (important)").await;
    exec(&db.conn, "CREATE INDEX idx_events_at ON events (at)").await;

    exec(
        &db.conn,
        "INSERT INTO events (id, important, at) VALUES (1, TRUE, 1703509800)",
    )
    .await;
    exec(
        &db.conn,
        "INSERT INTO events (id, important, at) VALUES (2, FALSE, 1703509900)",
    )
    .await;

    let rows = query(&db.conn, "SELECT id FROM events WHERE important = TRUE").await;
    assert_eq!(rows, vec![vec![Value::Int(1)]]);

    let rows = query(&db.conn, "SELECT id FROM events WHERE at > 1703509850").await;
    assert_eq!(rows, vec![vec![Value::Int(2)]]);
}
