//! Server configuration

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// HTTP server settings
///
/// | Env Var                 | Default   |
/// |-------------------------|-----------|
/// | `SERVER_HOST`           | `0.0.0.0` |
/// | `SERVER_PORT`           | `3001`    |
/// | `SERVER_RUN_MIGRATIONS` | `true`    |
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Apply the embedded migrations before serving
    pub run_migrations: bool,
}

impl ServerConfig {
    /// Load configuration from `SERVER_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 3001_i64)?
            .set_default("run_migrations", true)?
            .add_source(Environment::with_prefix("SERVER").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
