//! Store configuration - connection parameters and pool sizing
//!
//! Loaded from environment variables:
//! - `DB_HOST`, `DB_USER`, `DB_DATABASE`: required
//! - `DB_PASSWORD`: optional
//! - `DB_PORT`: default 5432
//! - `DB_CONNECTION_LIMIT`: max pool size, default 10
//! - `DB_CONNECT_TIMEOUT`: milliseconds, default 10000
//! - `DB_WAIT_FOR_CONNECTIONS`: `false` makes a full pool fail fast, default true
//! - `DB_SCHEMA`: optional Postgres search_path

use std::fmt;
use std::time::Duration;

/// Default maximum connections for the pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default time allowed to open or wait for a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default Postgres port.
pub const DEFAULT_PORT: u16 = 5432;

/// Configuration error, fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// What `acquire()` does when every connection is lent out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Queue until a connection frees up or the connect timeout elapses.
    #[default]
    Wait,
    /// Fail immediately with `PoolExhausted`.
    FailFast,
}

/// Connection parameters for the counter store.
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub user: String,
    pub password: Option<String>,
    pub port: u16,
    pub database: String,
    pub max_connections: u32,
    pub connect_timeout: Duration,
    pub wait_policy: WaitPolicy,
    pub schema: Option<String>,
}

impl DbConfig {
    /// Config with the required parameters and defaults for everything else.
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: None,
            port: DEFAULT_PORT,
            database: database.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            wait_policy: WaitPolicy::Wait,
            schema: None,
        }
    }

    /// Load config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load config through an arbitrary key lookup (for testing).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = get("DB_HOST").ok_or(ConfigError::Missing("DB_HOST"))?;
        let user = get("DB_USER").ok_or(ConfigError::Missing("DB_USER"))?;
        let database = get("DB_DATABASE").ok_or(ConfigError::Missing("DB_DATABASE"))?;

        let mut config = Self::new(host, user, database);
        config.password = lookup("DB_PASSWORD");
        config.schema = get("DB_SCHEMA");

        if let Some(port) = get("DB_PORT") {
            config.port = parse_number("DB_PORT", &port)?;
        }
        if let Some(limit) = get("DB_CONNECTION_LIMIT") {
            config.max_connections = parse_number("DB_CONNECTION_LIMIT", &limit)?;
        }
        if let Some(ms) = get("DB_CONNECT_TIMEOUT") {
            config.connect_timeout = Duration::from_millis(parse_number("DB_CONNECT_TIMEOUT", &ms)?);
        }
        if let Some(wait) = get("DB_WAIT_FOR_CONNECTIONS") {
            config.wait_policy = match wait.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => WaitPolicy::Wait,
                "false" | "0" | "no" => WaitPolicy::FailFast,
                other => {
                    return Err(ConfigError::Invalid {
                        var: "DB_WAIT_FOR_CONNECTIONS",
                        reason: format!("expected true or false, got '{other}'"),
                    })
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configs that cannot produce a usable pool.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Missing("DB_HOST"));
        }
        if self.user.trim().is_empty() {
            return Err(ConfigError::Missing("DB_USER"));
        }
        if self.database.trim().is_empty() {
            return Err(ConfigError::Missing("DB_DATABASE"));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_CONNECTION_LIMIT",
                reason: "must be at least 1".into(),
            });
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: "DB_CONNECT_TIMEOUT",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

// Password stays out of logs.
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("port", &self.port)
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .field("connect_timeout", &self.connect_timeout)
            .field("wait_policy", &self.wait_policy)
            .field("schema", &self.schema)
            .finish()
    }
}

fn parse_number<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("DB_HOST", "db.internal"),
        ("DB_USER", "portfolio"),
        ("DB_DATABASE", "visits"),
    ];

    #[test]
    fn defaults_apply() {
        let config = DbConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.port, 5432);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.wait_policy, WaitPolicy::Wait);
        assert!(config.password.is_none());
        assert!(config.schema.is_none());
    }

    #[test]
    fn missing_required_settings_are_reported() {
        for missing in ["DB_HOST", "DB_USER", "DB_DATABASE"] {
            let pairs: Vec<_> = REQUIRED.iter().copied().filter(|(k, _)| *k != missing).collect();
            let err = DbConfig::from_lookup(lookup(&pairs)).unwrap_err();
            assert_eq!(err, ConfigError::Missing(missing));
        }
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs[0] = ("DB_HOST", "   ");
        let err = DbConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DB_HOST"));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("DB_PASSWORD", "hunter2"),
            ("DB_PORT", "6543"),
            ("DB_CONNECTION_LIMIT", "3"),
            ("DB_CONNECT_TIMEOUT", "2500"),
            ("DB_WAIT_FOR_CONNECTIONS", "false"),
            ("DB_SCHEMA", "portfolio"),
        ]);
        let config = DbConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.password.as_deref(), Some("hunter2"));
        assert_eq!(config.port, 6543);
        assert_eq!(config.max_connections, 3);
        assert_eq!(config.connect_timeout, Duration::from_millis(2500));
        assert_eq!(config.wait_policy, WaitPolicy::FailFast);
        assert_eq!(config.schema.as_deref(), Some("portfolio"));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("DB_PORT", "not-a-port"));
        let err = DbConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "DB_PORT", .. }));
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("DB_CONNECTION_LIMIT", "0"));
        let err = DbConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "DB_CONNECTION_LIMIT", .. }));
    }

    #[test]
    fn debug_hides_password() {
        let mut config = DbConfig::new("h", "u", "d");
        config.password = Some("hunter2".into());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
    }
}
