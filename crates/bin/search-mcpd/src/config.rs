use clap::Parser;
use datashift_core::store::ElasticsearchConfig;
use std::error::Error;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_ELASTICSEARCH_URL: &str = "http://elasticsearch:9200";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Parser, Debug)]
#[command(name = "search-mcpd", version, about = "Elasticsearch MCP adapter.")]
struct CliArgs {
    #[arg(long, env = "ELASTICSEARCH_URL", default_value = DEFAULT_ELASTICSEARCH_URL)]
    elasticsearch_url: String,

    #[arg(long, env = "ELASTICSEARCH_USERNAME")]
    elasticsearch_username: Option<String>,

    #[arg(long, env = "ELASTICSEARCH_PASSWORD", hide_env_values = true)]
    elasticsearch_password: Option<String>,

    #[arg(
        long,
        env = "ELASTICSEARCH_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    elasticsearch_timeout_secs: u64,

    /// Serve streamable HTTP on this address instead of stdio.
    #[arg(long, env = "SEARCH_MCP_HTTP_ADDR")]
    http_addr: Option<String>,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub elasticsearch: ElasticsearchConfig,
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

impl SearchConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        Self::try_from(CliArgs::parse())
    }
}

impl TryFrom<CliArgs> for SearchConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let url = args.elasticsearch_url.trim().to_string();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidSetting {
                name: "ELASTICSEARCH_URL",
                value: args.elasticsearch_url,
            });
        }
        if args.elasticsearch_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "ELASTICSEARCH_TIMEOUT_SECS",
                value: args.elasticsearch_timeout_secs.to_string(),
            });
        }

        let username = args
            .elasticsearch_username
            .filter(|value| !value.trim().is_empty());
        let password = args
            .elasticsearch_password
            .filter(|value| !value.is_empty());

        let mut elasticsearch = ElasticsearchConfig::new(url)
            .with_request_timeout(Duration::from_secs(args.elasticsearch_timeout_secs));
        match (username, password) {
            (Some(username), password) => {
                elasticsearch = elasticsearch.with_basic_auth(username, password);
            }
            (None, Some(_)) => return Err(ConfigError::MissingSetting("ELASTICSEARCH_USERNAME")),
            (None, None) => {}
        }

        let http_addr = match args.http_addr.filter(|value| !value.trim().is_empty()) {
            Some(value) => Some(value.trim().parse().map_err(|_| ConfigError::InvalidSetting {
                name: "SEARCH_MCP_HTTP_ADDR",
                value,
            })?),
            None => None,
        };

        Ok(Self {
            elasticsearch,
            http_addr,
        })
    }
}
