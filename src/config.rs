use std::env;
use thiserror::Error;

pub const DEFAULT_TEMPLATE_KEY: &str = "template";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in .env")]
    Missing(&'static str),
}

/// Server-side settings, loaded once at startup and handed to server functions as context.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub admin_key: String,
    /// Key of the season template new weeks are created from when none is given.
    pub default_template: String,
}

impl AppConfig {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        Ok(AppConfig {
            database_url: required("DATABASE_URL")?,
            admin_key: required("ADMIN_KEY")?,
            default_template: lookup("SQUARES_DEFAULT_TEMPLATE")
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TEMPLATE_KEY.to_string()),
        })
    }
}
