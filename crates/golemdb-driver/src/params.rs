//! Connection parameters.

use std::collections::BTreeMap;
use std::env;

use golemdb_common::{DbError, DbResult};

/// Validated parameters for one connection.
///
/// All five fields are required; the constructor and the connection-string
/// parser reject anything missing or malformed before a client is touched.
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    /// HTTP(S) RPC endpoint of the backing store.
    pub rpc_url: String,
    /// WebSocket endpoint for store events.
    pub ws_url: String,
    /// Hex private key (64 hex characters, `0x` prefix optional).
    pub private_key: String,
    /// Tenant prefix; rows of different app_ids never meet.
    pub app_id: String,
    /// Selects which schema catalog file to load.
    pub schema_id: String,
}

impl ConnectionParams {
    /// Builds and validates parameters.
    pub fn new(
        rpc_url: impl Into<String>,
        ws_url: impl Into<String>,
        private_key: impl Into<String>,
        app_id: impl Into<String>,
        schema_id: impl Into<String>,
    ) -> DbResult<Self> {
        let params = Self {
            rpc_url: rpc_url.into(),
            ws_url: ws_url.into(),
            private_key: private_key.into(),
            app_id: app_id.into(),
            schema_id: schema_id.into(),
        };
        params.validate()?;
        Ok(params)
    }

    /// Parses a `key=value` connection string, e.g.
    ///
    /// ```text
    /// rpc_url=https://rpc.example/rpc ws_url=wss://rpc.example/ws \
    ///     private_key=0x<64 hex> app_id=myapp schema_id=myschema
    /// ```
    ///
    /// `${VAR}` sequences are expanded from the environment before parsing.
    pub fn from_connection_string(connection_string: &str) -> DbResult<Self> {
        let expanded = expand_env_vars(connection_string);

        let mut pairs = BTreeMap::new();
        for part in expanded.split_whitespace() {
            let Some((key, value)) = part.split_once('=') else {
                return Err(DbError::InvalidConnection {
                    message: format!("expected key=value, got {part:?}"),
                });
            };
            pairs.insert(key.trim().to_string(), value.trim().to_string());
        }

        let mut take = |key: &str| {
            pairs.remove(key).ok_or_else(|| DbError::InvalidConnection {
                message: format!("{key} is required"),
            })
        };

        Self::new(
            take("rpc_url")?,
            take("ws_url")?,
            take("private_key")?,
            take("app_id")?,
            take("schema_id")?,
        )
    }

    fn validate(&self) -> DbResult<()> {
        let required = [
            ("rpc_url", &self.rpc_url),
            ("ws_url", &self.ws_url),
            ("private_key", &self.private_key),
            ("app_id", &self.app_id),
            ("schema_id", &self.schema_id),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(DbError::InvalidConnection {
                    message: format!("{name} is required"),
                });
            }
        }

        if !self.rpc_url.starts_with("http://") && !self.rpc_url.starts_with("https://") {
            return Err(DbError::InvalidConnection {
                message: "rpc_url must be an HTTP or HTTPS URL".to_string(),
            });
        }
        if !self.ws_url.starts_with("ws://") && !self.ws_url.starts_with("wss://") {
            return Err(DbError::InvalidConnection {
                message: "ws_url must be a WebSocket URL".to_string(),
            });
        }

        let key = self.private_key.strip_prefix("0x").unwrap_or(&self.private_key);
        if key.len() != 64 {
            return Err(DbError::InvalidConnection {
                message: "private_key must be 32 bytes (64 hex characters)".to_string(),
            });
        }
        if !key.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(DbError::InvalidConnection {
                message: "private_key must be a valid hex string".to_string(),
            });
        }

        Ok(())
    }

    /// The private key as raw bytes.
    pub fn private_key_bytes(&self) -> Vec<u8> {
        let key = self.private_key.strip_prefix("0x").unwrap_or(&self.private_key);
        key.as_bytes()
            .chunks(2)
            .map(|pair| {
                let hex = std::str::from_utf8(pair).expect("validated hex");
                u8::from_str_radix(hex, 16).expect("validated hex")
            })
            .collect()
    }
}

/// Expands `${VAR}` sequences from the environment. Unset variables are
/// left in place so validation reports them.
fn expand_env_vars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match env::var(name) {
                    Ok(value) => out.push_str(&value),
                    Err(_) => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str("${");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
