//! Named connection registry.
//!
//! External systems (the finance API, the warehouse database) are addressed
//! through named connections resolved from the environment, so pipeline code
//! never hard-codes hosts or credentials. A connection with id `stock_api` is
//! read from `STOCKFLOW_CONN_STOCK_API`, whose value is a JSON document:
//!
//! ```json
//! {"host": "https://example.com", "login": "user", "password": "secret",
//!  "schema": "public", "port": 5432, "extra": {"endpoint": "/v1/ping"}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Environment variable prefix for connection definitions.
const CONN_ENV_PREFIX: &str = "STOCKFLOW_CONN_";

/// Errors that can occur while resolving connections.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Connection '{}' not found (set STOCKFLOW_CONN_{})", .0, .0.to_uppercase())]
    NotFound(String),

    #[error("Connection '{id}' is not valid JSON: {message}")]
    Malformed { id: String, message: String },

    #[error("Connection '{id}' is missing required field '{field}'")]
    MissingField { id: String, field: String },
}

/// A named connection to an external system.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Connection {
    /// Base host, including scheme for HTTP connections.
    #[serde(default)]
    pub host: String,
    /// Database schema or HTTP path prefix.
    #[serde(default)]
    pub schema: Option<String>,
    /// Login / user name.
    #[serde(default)]
    pub login: Option<String>,
    /// Password or API secret.
    #[serde(default)]
    pub password: Option<String>,
    /// Port, where the host alone is not enough.
    #[serde(default)]
    pub port: Option<u16>,
    /// Free-form extra fields (endpoint paths, headers, flags).
    #[serde(default)]
    pub extra: Value,
}

impl Connection {
    /// Resolves a connection by id from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::NotFound` if the variable is unset and
    /// `ConnectionError::Malformed` if it does not hold valid JSON.
    pub fn get(id: &str) -> Result<Self, ConnectionError> {
        let var = format!("{}{}", CONN_ENV_PREFIX, id.to_uppercase());
        let raw = std::env::var(&var).map_err(|_| ConnectionError::NotFound(id.to_string()))?;
        Self::from_json(id, &raw)
    }

    /// Parses a connection from its JSON definition.
    pub fn from_json(id: &str, raw: &str) -> Result<Self, ConnectionError> {
        let conn: Connection =
            serde_json::from_str(raw).map_err(|e| ConnectionError::Malformed {
                id: id.to_string(),
                message: e.to_string(),
            })?;

        if conn.host.is_empty() {
            return Err(ConnectionError::MissingField {
                id: id.to_string(),
                field: "host".to_string(),
            });
        }

        Ok(conn)
    }

    /// Returns a string field from `extra`.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    /// Returns an object field from `extra` as a string map, skipping
    /// non-string values.
    pub fn extra_map(&self, key: &str) -> HashMap<String, String> {
        self.extra
            .get(key)
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Builds a Postgres connection URL from this connection.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::MissingField` if login or password is unset.
    pub fn postgres_url(&self, id: &str) -> Result<String, ConnectionError> {
        let login = self
            .login
            .as_deref()
            .ok_or_else(|| ConnectionError::MissingField {
                id: id.to_string(),
                field: "login".to_string(),
            })?;
        let password = self
            .password
            .as_deref()
            .ok_or_else(|| ConnectionError::MissingField {
                id: id.to_string(),
                field: "password".to_string(),
            })?;

        let port = self.port.unwrap_or(5432);
        let database = self.schema.as_deref().unwrap_or("postgres");

        Ok(format!(
            "postgres://{}:{}@{}:{}/{}",
            login, password, self.host, port, database
        ))
    }
}
