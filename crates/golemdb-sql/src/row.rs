//! Row ↔ entity serialization.
//!
//! A row becomes one backing-store entity: the payload is a canonical JSON
//! object whose keys are exactly the table's column names (NULL columns are
//! omitted), and every indexed, non-NULL column contributes an `idx_`
//! annotation encoded per the codec. The payload is the source of truth on
//! the way back; annotations are never read during decoding.

use std::collections::BTreeMap;

use golemdb_client::Entity;
use golemdb_common::constants::{index_key, relation, ROW_TYPE_JSON, ROW_TYPE_KEY, RELATION_KEY};
use golemdb_common::{DbError, DbResult};

use crate::catalog::TableDef;
use crate::codec::{self, EncodedValue};
use crate::translate::Row;
use crate::value::Value;

/// Serializes rows of one tenant's tables into entities and back.
pub struct RowSerializer<'a> {
    app_id: &'a str,
}

impl<'a> RowSerializer<'a> {
    /// Creates a serializer for a tenant.
    pub fn new(app_id: &'a str) -> Self {
        Self { app_id }
    }

    /// Encodes a complete, validated row into an entity carrying the
    /// table's BTL.
    pub fn serialize(&self, table: &TableDef, row: &Row) -> DbResult<Entity> {
        let mut payload = serde_json::Map::new();
        let mut string_annotations = BTreeMap::new();
        let mut numeric_annotations = BTreeMap::new();

        string_annotations.insert(ROW_TYPE_KEY.to_string(), ROW_TYPE_JSON.to_string());
        string_annotations.insert(
            RELATION_KEY.to_string(),
            relation(self.app_id, &table.name),
        );

        for column in &table.columns {
            let value = row.get(&column.name).unwrap_or(&Value::Null);
            if value.is_null() {
                continue;
            }
            payload.insert(column.name.clone(), value.to_json());

            if table.is_indexed(&column.name) {
                let ty = column.sql_type()?;
                match codec::encode_value(value, &ty)? {
                    EncodedValue::Numeric(u) => {
                        numeric_annotations.insert(index_key(&column.name), u);
                    }
                    EncodedValue::Str(s) => {
                        string_annotations.insert(index_key(&column.name), s);
                    }
                }
            }
        }

        let payload = serde_json::to_vec(&serde_json::Value::Object(payload))
            .map_err(|e| DbError::internal(format!("cannot serialize row payload: {e}")))?;

        Ok(Entity {
            payload,
            btl: table.entity_ttl,
            string_annotations,
            numeric_annotations,
        })
    }

    /// Decodes an entity payload back into a row. Columns missing from the
    /// payload are NULL; keys that are not columns of the table are
    /// ignored.
    pub fn deserialize(&self, table: &TableDef, payload: &[u8]) -> DbResult<Row> {
        let json: serde_json::Value = serde_json::from_slice(payload).map_err(|e| {
            DbError::data(format!(
                "entity payload for table '{}' is not valid JSON: {e}",
                table.name
            ))
        })?;
        let object = json.as_object().ok_or_else(|| {
            DbError::data(format!(
                "entity payload for table '{}' is not a JSON object",
                table.name
            ))
        })?;

        let mut row = Row::new();
        for column in &table.columns {
            let value = match object.get(&column.name) {
                Some(json_value) => {
                    Value::from_json(json_value, &column.sql_type()?, &column.name)?
                }
                None => Value::Null,
            };
            row.insert(column.name.clone(), value);
        }
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SchemaCatalog;
    use crate::parser::parse_statement;

    fn table() -> TableDef {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = SchemaCatalog::open_in(dir.path(), "row_tests").unwrap();
        catalog
            .apply_ddl(
                &parse_statement(
                    "CREATE TABLE users (
                        id INTEGER PRIMARY KEY,
                        name VARCHAR(100),
                        balance DECIMAL(8,2),
                        rating DOUBLE,
                        joined_at DATETIME,
                        avatar BLOB
                    ) WITH (entity_ttl = 7200)",
                )
                .unwrap(),
            )
            .unwrap();
        catalog
            .apply_ddl(&parse_statement("CREATE INDEX idx_users_name ON users (name)").unwrap())
            .unwrap();
        catalog
            .apply_ddl(
                &parse_statement("CREATE INDEX idx_users_balance ON users (balance)").unwrap(),
            )
            .unwrap();
        catalog.table("users").unwrap().clone()
    }

    fn sample_row() -> Row {
        Row::from([
            ("id".to_string(), Value::Int(-5)),
            ("name".to_string(), Value::String("Alice".to_string())),
            (
                "balance".to_string(),
                Value::Decimal {
                    unscaled: 1050,
                    scale: 2,
                },
            ),
            ("rating".to_string(), Value::Double(4.5)),
            ("joined_at".to_string(), Value::Timestamp(1_703_509_800)),
            ("avatar".to_string(), Value::Bytes(vec![1, 2, 3])),
        ])
    }

    #[test]
    fn test_serialize_annotations() {
        let table = table();
        let serializer = RowSerializer::new("app");
        let entity = serializer.serialize(&table, &sample_row()).unwrap();

        assert_eq!(entity.btl, 7200);
        assert_eq!(
            entity.string_annotations.get("row_type"),
            Some(&"json".to_string())
        );
        assert_eq!(
            entity.string_annotations.get("relation"),
            Some(&"app.users".to_string())
        );
        assert_eq!(
            entity.numeric_annotations.get("idx_id"),
            Some(&codec::encode_signed(-5, 32).unwrap())
        );
        assert_eq!(
            entity.string_annotations.get("idx_name"),
            Some(&"Alice".to_string())
        );
        assert_eq!(
            entity.string_annotations.get("idx_balance"),
            Some(&".000010.50".to_string())
        );

        // Non-indexed columns never reach the annotations.
        assert!(!entity.string_annotations.contains_key("idx_avatar"));
        assert!(!entity.numeric_annotations.contains_key("idx_rating"));
        assert!(!entity.numeric_annotations.contains_key("idx_joined_at"));
    }

    #[test]
    fn test_null_columns_absent() {
        let table = table();
        let serializer = RowSerializer::new("app");
        let row = Row::from([("id".to_string(), Value::Int(1))]);
        let entity = serializer.serialize(&table, &row).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&entity.payload).unwrap();
        assert!(json.get("name").is_none());
        assert!(!entity.string_annotations.contains_key("idx_name"));
    }

    #[test]
    fn test_round_trip() {
        let table = table();
        let serializer = RowSerializer::new("app");
        let row = sample_row();
        let entity = serializer.serialize(&table, &row).unwrap();
        let decoded = serializer.deserialize(&table, &entity.payload).unwrap();
        assert_eq!(decoded, row);
    }

    #[test]
    fn test_missing_columns_decode_as_null() {
        let table = table();
        let serializer = RowSerializer::new("app");
        let decoded = serializer.deserialize(&table, br#"{"id": 7}"#).unwrap();
        assert_eq!(decoded.get("id"), Some(&Value::Int(7)));
        assert_eq!(decoded.get("name"), Some(&Value::Null));
    }

    #[test]
    fn test_extra_keys_ignored() {
        let table = table();
        let serializer = RowSerializer::new("app");
        let decoded = serializer
            .deserialize(&table, br#"{"id": 7, "unknown_key": "x"}"#)
            .unwrap();
        assert!(!decoded.contains_key("unknown_key"));
    }

    #[test]
    fn test_malformed_payload() {
        let table = table();
        let serializer = RowSerializer::new("app");

        let err = serializer.deserialize(&table, b"not json").unwrap_err();
        assert_eq!(err.kind(), golemdb_common::ErrorKind::Data);

        let err = serializer.deserialize(&table, b"[1,2,3]").unwrap_err();
        assert_eq!(err.kind(), golemdb_common::ErrorKind::Data);

        // A column with the wrong JSON shape is a data error.
        let err = serializer
            .deserialize(&table, br#"{"id": "seven"}"#)
            .unwrap_err();
        assert_eq!(err.kind(), golemdb_common::ErrorKind::Data);
    }
}
