use clap::{Args, Parser, Subcommand};
use datashift_core::store::{ElasticsearchConfig, PostgresConfig};
use datashift_ingest::{DEFAULT_BASELINE_ROWS, DEFAULT_CHUNK_SIZE, LoadRequest, VerifyOptions};
use datashift_store::schema::{
    DEFAULT_BASELINE_ID, DEFAULT_ID_FIELD, DEFAULT_SAMPLE_INDEX, DEFAULT_SAMPLE_TABLE,
};
use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_ELASTICSEARCH_URL: &str = "http://localhost:9200";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POSTGRES_HOST: &str = "localhost";
const DEFAULT_POSTGRES_PORT: u16 = 5432;
const DEFAULT_POSTGRES_DB: &str = "transformation_db";
const DEFAULT_POSTGRES_USER: &str = "admin";
const DEFAULT_POSTGRES_PASSWORD: &str = "admin123";

#[derive(Parser, Debug)]
#[command(
    name = "datashift",
    version,
    about = "Load, verify, and probe the datashift adapters."
)]
struct CliArgs {
    /// Print reports as JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    search: SearchArgs,

    #[command(flatten)]
    sql: SqlArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct SearchArgs {
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
}

#[derive(Args, Debug)]
struct SqlArgs {
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

    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bulk-index a JSON array file into the search engine.
    Load(LoadArgs),
    /// Compare the search index with the SQL table after a transfer.
    Verify(VerifyArgs),
    /// Start an adapter process and list the tools it advertises.
    Probe(ProbeArgs),
}

#[derive(Args, Debug)]
struct LoadArgs {
    file: PathBuf,

    #[arg(long, default_value = DEFAULT_SAMPLE_INDEX)]
    index: String,

    #[arg(long, default_value = DEFAULT_ID_FIELD)]
    id_field: String,

    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    #[arg(long, default_value = DEFAULT_SAMPLE_INDEX)]
    index: String,

    #[arg(long, default_value = DEFAULT_SAMPLE_TABLE)]
    table: String,

    #[arg(long, default_value = DEFAULT_ID_FIELD)]
    id_field: String,

    /// Id of the seed row that predates the transfer.
    #[arg(long, default_value = DEFAULT_BASELINE_ID)]
    baseline_id: String,

    #[arg(long, default_value_t = DEFAULT_BASELINE_ROWS)]
    baseline_rows: i64,
}

#[derive(Args, Debug)]
struct ProbeArgs {
    /// Adapter executable to spawn.
    program: String,

    /// Arguments passed through to the adapter.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

/// A fully validated unit of work.
#[derive(Debug, Clone)]
pub enum Task {
    Load {
        elasticsearch: ElasticsearchConfig,
        request: LoadRequest,
    },
    Verify {
        elasticsearch: ElasticsearchConfig,
        postgres: PostgresConfig,
        options: VerifyOptions,
    },
    Probe {
        program: String,
        args: Vec<String>,
    },
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub task: Task,
    pub json: bool,
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

impl CliConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        Self::try_from(CliArgs::parse())
    }
}

impl TryFrom<CliArgs> for CliConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let task = match args.command {
            Command::Load(load) => {
                if load.chunk_size == 0 {
                    return Err(ConfigError::InvalidSetting {
                        name: "chunk-size",
                        value: load.chunk_size.to_string(),
                    });
                }
                Task::Load {
                    elasticsearch: elasticsearch_config(args.search)?,
                    request: LoadRequest::new(load.file)
                        .with_index(required("index", load.index)?)
                        .with_id_field(required("id-field", load.id_field)?)
                        .with_chunk_size(load.chunk_size),
                }
            }
            Command::Verify(verify) => {
                if verify.baseline_rows < 0 {
                    return Err(ConfigError::InvalidSetting {
                        name: "baseline-rows",
                        value: verify.baseline_rows.to_string(),
                    });
                }
                Task::Verify {
                    elasticsearch: elasticsearch_config(args.search)?,
                    postgres: postgres_config(args.sql)?,
                    options: VerifyOptions {
                        index: required("index", verify.index)?,
                        table: required("table", verify.table)?,
                        id_field: required("id-field", verify.id_field)?,
                        baseline_id: verify.baseline_id,
                        baseline_rows: verify.baseline_rows,
                    },
                }
            }
            Command::Probe(probe) => Task::Probe {
                program: required("program", probe.program)?,
                args: probe.args,
            },
        };

        Ok(Self {
            task,
            json: args.json,
        })
    }
}

fn required(name: &'static str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingSetting(name));
    }
    Ok(trimmed.to_string())
}

fn elasticsearch_config(args: SearchArgs) -> Result<ElasticsearchConfig, ConfigError> {
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

    let config = ElasticsearchConfig::new(url)
        .with_request_timeout(Duration::from_secs(args.elasticsearch_timeout_secs));
    let username = args
        .elasticsearch_username
        .filter(|value| !value.trim().is_empty());
    let password = args
        .elasticsearch_password
        .filter(|value| !value.is_empty());
    match (username, password) {
        (Some(username), password) => Ok(config.with_basic_auth(username, password)),
        (None, Some(_)) => Err(ConfigError::MissingSetting("ELASTICSEARCH_USERNAME")),
        (None, None) => Ok(config),
    }
}

fn postgres_config(args: SqlArgs) -> Result<PostgresConfig, ConfigError> {
    let database_url = args
        .database_url
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    if database_url.is_none() && args.postgres_host.trim().is_empty() {
        return Err(ConfigError::MissingSetting("POSTGRES_HOST"));
    }

    Ok(PostgresConfig::new(
        args.postgres_host.trim(),
        args.postgres_port,
        args.postgres_db.trim(),
        args.postgres_user.trim(),
        args.postgres_password,
    )
    .with_url(database_url)
    .with_max_connections(1))
}
