//! Environment-driven configuration.

use std::env;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub jwt_secret: String,
}

impl ServerConfig {
    /// Read configuration from the environment. `JWT_SECRET` is required;
    /// the rest fall back to local-development defaults.
    pub fn from_env() -> Result<Self, String> {
        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| "JWT_SECRET must be set".to_owned())?;
        Ok(Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_owned()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://clientbay.db".to_owned()),
            jwt_secret,
        })
    }
}
