//! Database backend selection and connection settings.

use crate::dialect::{MySqlDialect, PostgresDialect, SqlDialect, SqliteDialect};
use crate::error::{PersistenceError, PersistenceResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Supported relational backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[serde(alias = "postgres")]
    Postgresql,
    Mysql,
    Sqlite,
}

impl Backend {
    /// Dialect object for this backend.
    pub fn dialect(self) -> &'static dyn SqlDialect {
        match self {
            Self::Postgresql => &PostgresDialect,
            Self::Mysql => &MySqlDialect,
            Self::Sqlite => &SqliteDialect,
        }
    }

    pub fn default_port(self) -> Option<u16> {
        match self {
            Self::Postgresql => Some(5432),
            Self::Mysql => Some(3306),
            Self::Sqlite => None,
        }
    }

    fn scheme(self) -> &'static str {
        match self {
            Self::Postgresql => "postgres",
            Self::Mysql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dialect().name())
    }
}

impl FromStr for Backend {
    type Err = PersistenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" => Ok(Self::Postgresql),
            "mysql" => Ok(Self::Mysql),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(PersistenceError::InvalidSettings(format!(
                "unsupported database backend: {other:?} (expected postgresql, mysql or sqlite)"
            ))),
        }
    }
}

/// Connection settings for one database.
///
/// For SQLite, `name` is a file path (created if missing) or `:memory:`.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub backend: Backend,
    pub host: String,
    pub port: Option<u16>,
    pub name: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Upper bound for pool acquisition and for each store operation.
    pub op_timeout: Duration,
}

impl DatabaseSettings {
    pub const IN_MEMORY: &'static str = ":memory:";

    /// SQLite settings for `path`.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            backend: Backend::Sqlite,
            host: String::new(),
            port: None,
            name: path.into(),
            user: None,
            password: None,
            op_timeout: Duration::from_secs(10),
        }
    }

    /// In-memory SQLite, used by tests and dry runs.
    pub fn in_memory() -> Self {
        Self::sqlite(Self::IN_MEMORY)
    }

    /// Port to connect to, falling back to the backend default.
    pub fn effective_port(&self) -> Option<u16> {
        self.port.or_else(|| self.backend.default_port())
    }

    /// Connection URL with credentials percent-encoded.
    pub fn connection_url(&self) -> PersistenceResult<String> {
        if self.name.trim().is_empty() {
            return Err(PersistenceError::InvalidSettings(
                "database name must not be empty".to_string(),
            ));
        }

        if self.backend == Backend::Sqlite {
            if self.name == Self::IN_MEMORY {
                return Ok("sqlite::memory:".to_string());
            }
            return Ok(format!("sqlite://{}?mode=rwc", self.name));
        }

        if self.host.trim().is_empty() {
            return Err(PersistenceError::InvalidSettings(
                "database host must not be empty".to_string(),
            ));
        }

        let invalid = |what: &str| PersistenceError::InvalidSettings(format!("invalid {what}"));
        let mut url = Url::parse(&format!("{}://{}", self.backend.scheme(), self.host))
            .map_err(|e| PersistenceError::InvalidSettings(format!("invalid host: {e}")))?;
        url.set_port(self.effective_port())
            .map_err(|()| invalid("port"))?;
        if let Some(user) = &self.user {
            url.set_username(user).map_err(|()| invalid("user"))?;
        }
        if let Some(password) = &self.password {
            url.set_password(Some(password))
                .map_err(|()| invalid("password"))?;
        }
        url.set_path(&format!("/{}", self.name.trim_start_matches('/')));
        Ok(url.to_string())
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("op_timeout", &self.op_timeout)
            .finish()
    }
}
