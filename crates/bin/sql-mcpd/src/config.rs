use clap::Parser;
use datashift_core::store::PostgresConfig;
use std::error::Error;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_POSTGRES_HOST: &str = "postgres";
const DEFAULT_POSTGRES_PORT: u16 = 5432;
const DEFAULT_POSTGRES_DB: &str = "transformation_db";
const DEFAULT_POSTGRES_USER: &str = "admin";
const DEFAULT_POSTGRES_PASSWORD: &str = "admin123";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

#[derive(Parser, Debug)]
#[command(name = "sql-mcpd", version, about = "PostgreSQL MCP adapter.")]
struct CliArgs {
    #[arg(long, env = "POSTGRES_HOST", default_value = DEFAULT_POSTGRES_HOST)]
    postgres_host: String,

    #[arg(long, env = "POSTGRES_PORT", default_value_t = DEFAULT_POSTGRES_PORT)]
    postgres_port: u16,

    #[arg(long, env = "POSTGRES_DB", default_value = DEFAULT_POSTGRES_DB)]
    postgres_db: String,

    #[arg(long, env = "POSTGRES_USER", default_value = DEFAULT_POSTGRES_USER)]
    postgres_user: String,

    #[arg(
        long,
        env = "POSTGRES_PASSWORD",
        default_value = DEFAULT_POSTGRES_PASSWORD,
        hide_env_values = true
    )]
    postgres_password: String,

    /// Full connection URL; overrides the discrete settings.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    #[arg(
        long,
        env = "POSTGRES_MAX_CONNECTIONS",
        default_value_t = DEFAULT_MAX_CONNECTIONS
    )]
    max_connections: u32,

    #[arg(
        long,
        env = "POSTGRES_ACQUIRE_TIMEOUT_SECS",
        default_value_t = DEFAULT_ACQUIRE_TIMEOUT_SECS
    )]
    acquire_timeout_secs: u64,

    /// Serve streamable HTTP on this address instead of stdio.
    #[arg(long, env = "SQL_MCP_HTTP_ADDR")]
    http_addr: Option<String>,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Debug, Clone)]
pub struct SqlConfig {
    pub postgres: PostgresConfig,
    pub http_addr: Option<SocketAddr>,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingSetting(&'static str),
    InvalidSetting { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSetting(name) => write!(f, "missing required setting: {name}"),
            Self::InvalidSetting { name, value } => {
                write!(f, "invalid {name} value: {value}")
            }
        }
    }
}

impl Error for ConfigError {}

impl SqlConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        Self::try_from(CliArgs::parse())
    }
}

impl TryFrom<CliArgs> for SqlConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let database_url = args
            .database_url
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        if database_url.is_none() {
            if args.postgres_host.trim().is_empty() {
                return Err(ConfigError::MissingSetting("POSTGRES_HOST"));
            }
            if args.postgres_db.trim().is_empty() {
                return Err(ConfigError::MissingSetting("POSTGRES_DB"));
            }
            if args.postgres_user.trim().is_empty() {
                return Err(ConfigError::MissingSetting("POSTGRES_USER"));
            }
        }
        if args.max_connections == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "POSTGRES_MAX_CONNECTIONS",
                value: args.max_connections.to_string(),
            });
        }

        let postgres = PostgresConfig::new(
            args.postgres_host.trim(),
            args.postgres_port,
            args.postgres_db.trim(),
            args.postgres_user.trim(),
            args.postgres_password,
        )
        .with_url(database_url)
        .with_max_connections(args.max_connections)
        .with_acquire_timeout(Duration::from_secs(args.acquire_timeout_secs));

        let http_addr = match args.http_addr.filter(|value| !value.trim().is_empty()) {
            Some(value) => Some(value.trim().parse().map_err(|_| ConfigError::InvalidSetting {
                name: "SQL_MCP_HTTP_ADDR",
                value,
            })?),
            None => None,
        };

        Ok(Self {
            postgres,
            http_addr,
        })
    }
}
