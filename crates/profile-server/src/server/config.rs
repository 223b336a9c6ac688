use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use core::{fmt, time::Duration};
use std::net::SocketAddr;

/// Storage backend selected at startup.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Postgres through a pooled `sqlx` connection.
    Postgres,
    /// Process-local map. Nothing survives a restart.
    Memory,
}

/// Runtime configuration for the `profile-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file is loaded first), with defaults suitable for local development.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "profile-server",
    version,
    about = "A gRPC + HTTP/JSON CRUD service for user profiles"
)]
pub struct CliArgs {
    /// Address the gRPC listener binds to.
    ///
    /// Environment variable: `GRPC_ADDR`
    #[arg(long, env = "GRPC_ADDR", default_value_t = String::from("0.0.0.0:50051"))]
    pub grpc_addr: String,

    /// Address the HTTP/JSON gateway binds to.
    ///
    /// Environment variable: `HTTP_ADDR`
    #[arg(long, env = "HTTP_ADDR", default_value_t = String::from("0.0.0.0:8081"))]
    pub http_addr: String,

    /// Storage backend.
    ///
    /// Environment variable: `STORE`
    #[arg(long, env = "STORE", value_enum, default_value_t = StoreKind::Postgres)]
    pub store: StoreKind,

    /// Postgres connection string. Required when `--store postgres`.
    ///
    /// Environment variable: `DATABASE_URL`
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Upper bound on pooled database connections.
    ///
    /// Environment variable: `DATABASE_MAX_CONNECTIONS`
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 10)]
    pub database_max_connections: u32,

    /// Connections the pool keeps open while idle. `0` lets every idle
    /// connection expire. Must not exceed `DATABASE_MAX_CONNECTIONS`.
    ///
    /// Environment variable: `DATABASE_MAX_IDLE_CONNECTIONS`
    #[arg(long, env = "DATABASE_MAX_IDLE_CONNECTIONS", default_value_t = 0)]
    pub database_max_idle_connections: u32,

    /// Maximum lifetime of a pooled connection in seconds. `0` keeps
    /// connections until they fail.
    ///
    /// Environment variable: `DATABASE_CONN_MAX_LIFETIME_SECS`
    #[arg(long, env = "DATABASE_CONN_MAX_LIFETIME_SECS", default_value_t = 0)]
    pub database_conn_max_lifetime_secs: u64,

    /// Verify the database is reachable before any listener starts.
    ///
    /// Environment variable: `DATABASE_PING_ON_START`
    #[arg(long, env = "DATABASE_PING_ON_START", default_value_t = true, action = clap::ArgAction::Set)]
    pub database_ping_on_start: bool,

    /// Seconds the listeners get to finish in-flight requests after a
    /// shutdown request before they are aborted.
    ///
    /// Environment variable: `DRAIN_TIMEOUT_SECS`
    #[arg(long, env = "DRAIN_TIMEOUT_SECS", default_value_t = 10)]
    pub drain_timeout_secs: u64,

    /// Log request and response payloads at debug level.
    ///
    /// Environment variable: `LOG_PAYLOAD`
    #[arg(long, env = "LOG_PAYLOAD", default_value_t = false)]
    pub log_payload: bool,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub idle_connections: u32,
    pub conn_max_lifetime: Option<Duration>,
    pub ping_on_start: bool,
}

// The connection string usually carries credentials.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("idle_connections", &self.idle_connections)
            .field("conn_max_lifetime", &self.conn_max_lifetime)
            .field("ping_on_start", &self.ping_on_start)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub grpc_addr: SocketAddr,
    pub http_addr: SocketAddr,
    pub store: StoreKind,
    pub database: Option<DatabaseConfig>,
    pub drain_timeout: Duration,
    pub log_payload: bool,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let grpc_addr = args
            .grpc_addr
            .parse()
            .with_context(|| format!("GRPC_ADDR `{}` is not a socket address", args.grpc_addr))?;
        let http_addr = args
            .http_addr
            .parse()
            .with_context(|| format!("HTTP_ADDR `{}` is not a socket address", args.http_addr))?;

        if args.drain_timeout_secs == 0 {
            bail!("DRAIN_TIMEOUT_SECS must be greater than 0");
        }

        let database = match args.store {
            StoreKind::Memory => None,
            StoreKind::Postgres => {
                let Some(url) = args.database_url else {
                    bail!("DATABASE_URL is required when STORE=postgres");
                };
                if args.database_max_connections == 0 {
                    bail!("DATABASE_MAX_CONNECTIONS must be greater than 0");
                }
                if args.database_max_idle_connections > args.database_max_connections {
                    bail!(
                        "DATABASE_MAX_IDLE_CONNECTIONS ({}) exceeds DATABASE_MAX_CONNECTIONS ({})",
                        args.database_max_idle_connections,
                        args.database_max_connections
                    );
                }
                Some(DatabaseConfig {
                    url,
                    max_connections: args.database_max_connections,
                    idle_connections: args.database_max_idle_connections,
                    conn_max_lifetime: (args.database_conn_max_lifetime_secs > 0)
                        .then(|| Duration::from_secs(args.database_conn_max_lifetime_secs)),
                    ping_on_start: args.database_ping_on_start,
                })
            }
        };

        Ok(Self {
            grpc_addr,
            http_addr,
            store: args.store,
            database,
            drain_timeout: Duration::from_secs(args.drain_timeout_secs),
            log_payload: args.log_payload,
        })
    }
}
