//! Environment-driven configuration.

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// `DATABASE_URL` wins when set; otherwise the URL is assembled from the
    /// individual `DB_*` variables with local-development defaults.
    pub fn from_env() -> Self {
        let server_address = env_or_default("SERVER_ADDRESS", "0.0.0.0:8080");

        let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
            format!(
                "postgres://{}:{}@{}:{}/{}",
                env_or_default("DB_USER", "postgres"),
                env_or_default("DB_PASSWORD", "postgres"),
                env_or_default("DB_HOST", "localhost"),
                env_or_default("DB_PORT", "5432"),
                env_or_default("DB_NAME", "api_db"),
            )
        });

        Self {
            server_address,
            database_url,
        }
    }
}

fn env_or_default(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}
