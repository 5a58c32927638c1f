use crate::{env_or_default, env_parse_or, ConfigError, FromEnv};

/// Redis broker configuration.
///
/// The same connection settings are shared by the job queues, the fan-out
/// publisher and the cache.
#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: u8,
}

impl RedisConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            password: None,
            db: 0,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_db(mut self, db: u8) -> Self {
        self.db = db;
        self
    }

    /// Build the connection URL understood by the `redis` crate.
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

impl FromEnv for RedisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let password = std::env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty());

        Ok(Self {
            host: env_or_default("REDIS_HOST", "127.0.0.1"),
            port: env_parse_or("REDIS_PORT", 6379)?,
            password,
            db: env_parse_or("REDIS_DB", 0)?,
        })
    }
}
