use anyhow::bail;
use clap::Parser;
use core::{fmt, time::Duration};
use dorsal::{AllocatorConfig, Backoff};

/// Runtime configuration for the `dorsal-axum` binary.
///
/// These settings control where the service listens, which store backs the
/// sequences, and how hard the allocator retries a contended partition. All
/// values are parsed from CLI arguments or environment variables (a `.env`
/// file is loaded first), with defaults suitable for local development.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dorsal-axum",
    version,
    about = "An HTTP service for gapless per-partition sequence numbers"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:3000"))]
    pub server_addr: String,

    /// PostgreSQL connection string. When unset, sequences live in memory
    /// and are lost on exit.
    ///
    /// Environment variable: `DATABASE_URL`
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Size of the PostgreSQL connection pool.
    ///
    /// Environment variable: `DATABASE_MAX_CONNECTIONS`
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 10)]
    pub database_max_connections: u32,

    /// Read/write passes per allocation before reporting contention.
    ///
    /// Environment variable: `MAX_ATTEMPTS`
    #[arg(long, env = "MAX_ATTEMPTS", default_value_t = 8)]
    pub max_attempts: u32,

    /// Upper bound on each store round trip, in milliseconds.
    ///
    /// Environment variable: `STORE_TIMEOUT_MS`
    #[arg(long, env = "STORE_TIMEOUT_MS", default_value_t = 2_000)]
    pub store_timeout_ms: u64,

    /// First backoff pause after a conflicting write, in milliseconds.
    ///
    /// Environment variable: `BACKOFF_INITIAL_MS`
    #[arg(long, env = "BACKOFF_INITIAL_MS", default_value_t = 5)]
    pub backoff_initial_ms: u64,

    /// Longest backoff pause, in milliseconds.
    ///
    /// Environment variable: `BACKOFF_MAX_MS`
    #[arg(long, env = "BACKOFF_MAX_MS", default_value_t = 200)]
    pub backoff_max_ms: u64,
}

#[derive(Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub allocator: AllocatorConfig,
}

// The database URL may carry credentials; only its presence is printed.
impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("server_addr", &self.server_addr)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "<redacted>"),
            )
            .field("database_max_connections", &self.database_max_connections)
            .field("allocator", &self.allocator)
            .finish()
    }
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.max_attempts == 0 {
            bail!("MAX_ATTEMPTS must be greater than 0");
        }
        if args.store_timeout_ms == 0 {
            bail!("STORE_TIMEOUT_MS must be greater than 0");
        }
        if args.database_max_connections == 0 {
            bail!("DATABASE_MAX_CONNECTIONS must be greater than 0");
        }
        if args.backoff_initial_ms > args.backoff_max_ms {
            bail!(
                "BACKOFF_INITIAL_MS ({}) exceeds BACKOFF_MAX_MS ({})",
                args.backoff_initial_ms,
                args.backoff_max_ms
            );
        }

        let backoff = Backoff::default()
            .with_initial(Duration::from_millis(args.backoff_initial_ms))
            .with_max(Duration::from_millis(args.backoff_max_ms));
        let allocator = AllocatorConfig::default()
            .with_max_attempts(args.max_attempts)
            .with_store_timeout(Duration::from_millis(args.store_timeout_ms))
            .with_backoff(backoff);

        Ok(Self {
            server_addr: args.server_addr,
            database_url: args.database_url.filter(|url| !url.trim().is_empty()),
            database_max_connections: args.database_max_connections,
            allocator,
        })
    }
}
