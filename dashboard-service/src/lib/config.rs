use std::env;
use std::time::Duration;

use auth::HashingCost;
use auth::LockoutPolicy;
use auth::TokenConfig;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

const MIN_SECRET_LENGTH: usize = 32;
/// Secret shipped in `config/default.toml`; real deployments must replace it.
const PLACEHOLDER_SECRET: &str = "change-me-change-me-change-me-change-me";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub password: PasswordConfig,
    #[serde(default)]
    pub lockout: LockoutConfig,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
    #[serde(default)]
    pub bootstrap: Option<BootstrapConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    /// Take the client address from `X-Forwarded-For` (only behind a trusted proxy)
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LockoutConfig {
    pub max_attempts: u32,
    pub window_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MaintenanceConfig {
    pub cleanup_interval_secs: u64,
}

/// Admin account created at startup when no account with that name exists.
#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapConfig {
    pub admin_username: String,
    pub admin_password: String,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for PasswordConfig {
    fn default() -> Self {
        let cost = HashingCost::default();
        Self {
            memory_kib: cost.memory_kib,
            iterations: cost.iterations,
            parallelism: cost.parallelism,
        }
    }
}

impl Default for LockoutConfig {
    fn default() -> Self {
        let policy = LockoutPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            window_secs: policy.window.as_secs(),
        }
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_secs: 60,
        }
    }
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (JWT__SECRET, SERVER__HTTP_PORT, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: JWT__SECRET=... overrides jwt.secret
            .add_source(Environment::default().separator("__"))
            .build()?;

        let config: Config = configuration.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Reject settings that would leave the service insecure or unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::Message(format!(
                "jwt.secret must be at least {} bytes",
                MIN_SECRET_LENGTH
            )));
        }

        if self.jwt.secret == PLACEHOLDER_SECRET {
            return Err(ConfigError::Message(
                "jwt.secret still holds the default placeholder, set JWT__SECRET".to_string(),
            ));
        }

        if self.jwt.access_token_ttl_secs == 0 || self.jwt.refresh_token_ttl_secs == 0 {
            return Err(ConfigError::Message(
                "token lifetimes must be greater than zero".to_string(),
            ));
        }

        if self.lockout.max_attempts == 0 || self.lockout.window_secs == 0 {
            return Err(ConfigError::Message(
                "lockout.max_attempts and lockout.window_secs must be greater than zero"
                    .to_string(),
            ));
        }

        if self.maintenance.cleanup_interval_secs == 0 {
            return Err(ConfigError::Message(
                "maintenance.cleanup_interval_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn token_config(&self) -> TokenConfig {
        TokenConfig {
            access_ttl: Duration::from_secs(self.jwt.access_token_ttl_secs),
            refresh_ttl: Duration::from_secs(self.jwt.refresh_token_ttl_secs),
        }
    }

    pub fn lockout_policy(&self) -> LockoutPolicy {
        LockoutPolicy {
            max_attempts: self.lockout.max_attempts,
            window: Duration::from_secs(self.lockout.window_secs),
        }
    }

    pub fn hashing_cost(&self) -> HashingCost {
        HashingCost {
            memory_kib: self.password.memory_kib,
            iterations: self.password.iterations,
            parallelism: self.password.parallelism,
        }
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance.cleanup_interval_secs)
    }
}
