use crate::auth::MAX_ACCESS_TOKEN_TTL_SECONDS;
use crate::error::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Token and credential settings. Read once at startup.
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    pub secret: String,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64, // seconds, at most one hour
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry: i64, // seconds
    #[serde(default = "default_hash_cost")]
    pub hash_cost: u32,
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    #[serde(default)]
    pub rotate_refresh_tokens: bool,
}

fn default_issuer() -> String {
    "chirpy".to_string()
}

fn default_access_token_expiry() -> i64 {
    MAX_ACCESS_TOKEN_TTL_SECONDS
}

fn default_refresh_token_expiry() -> i64 {
    60 * 24 * 60 * 60
}

fn default_hash_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_store_timeout_ms() -> u64 {
    5_000
}

impl AuthSettings {
    /// Settings with every default applied, for embedding and tests.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: default_issuer(),
            access_token_expiry: default_access_token_expiry(),
            refresh_token_expiry: default_refresh_token_expiry(),
            hash_cost: default_hash_cost(),
            store_timeout_ms: default_store_timeout_ms(),
            rotate_refresh_tokens: false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("auth.secret".to_string()));
        }
        if self.issuer.is_empty() {
            return Err(ConfigError::MissingRequired("auth.issuer".to_string()));
        }
        if self.access_token_expiry <= 0 || self.access_token_expiry > MAX_ACCESS_TOKEN_TTL_SECONDS {
            return Err(ConfigError::InvalidValue(format!(
                "auth.access_token_expiry must be in 1..={} seconds",
                MAX_ACCESS_TOKEN_TTL_SECONDS
            )));
        }
        if self.refresh_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "auth.refresh_token_expiry must be positive".to_string(),
            ));
        }
        if !(4..=31).contains(&self.hash_cost) {
            return Err(ConfigError::InvalidValue(
                "auth.hash_cost must be in 4..=31".to_string(),
            ));
        }
        if self.store_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "auth.store_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.access_token_expiry)
    }

    pub fn refresh_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.refresh_token_expiry)
    }

    pub fn store_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.store_timeout_ms)
    }
}

/// Load `configuration.{yaml,toml,json}` then overlay `APP__SECTION__KEY` variables.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;
    let settings = settings.try_deserialize::<Settings>()?;
    settings.auth.validate()?;
    Ok(settings)
}
