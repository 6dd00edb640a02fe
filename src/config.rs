use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, fmt};

const MIN_SECRET_LEN: usize = 2;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth_secret: String,
    pub token_ttl_secs: i64,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Multi-tenant to-do list API")]
pub struct Args {
    /// Host to bind to (overrides TODO_API_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides TODO_API_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides TODO_API_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Lifetime of issued access tokens in seconds (overrides TODO_API_TOKEN_TTL_SECS)
    #[arg(long)]
    pub token_ttl_secs: Option<i64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::merge(args, |key| env::var(key))?;
        Ok((cfg, migrate))
    }

    /// Merge CLI args over values read through `lookup`.
    fn merge<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        // --- Environment fallback ---
        let env_host = lookup("TODO_API_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match lookup("TODO_API_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing TODO_API_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading TODO_API_PORT"),
        };
        let env_db = lookup("TODO_API_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/todo.db".into());
        let env_ttl = match lookup("TODO_API_TOKEN_TTL_SECS") {
            Ok(value) => value
                .parse::<i64>()
                .with_context(|| format!("parsing TODO_API_TOKEN_TTL_SECS value `{}`", value))?,
            Err(env::VarError::NotPresent) => 24 * 60 * 60,
            Err(err) => return Err(err).context("reading TODO_API_TOKEN_TTL_SECS"),
        };
        let auth_secret = lookup("TODO_API_AUTH_SECRET").context("reading TODO_API_AUTH_SECRET")?;
        if auth_secret.len() < MIN_SECRET_LEN {
            bail!("TODO_API_AUTH_SECRET must be at least {MIN_SECRET_LEN} bytes");
        }

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            auth_secret,
            token_ttl_secs: args.token_ttl_secs.unwrap_or(env_ttl),
        };
        if cfg.token_ttl_secs <= 0 {
            bail!("token TTL must be positive, got {}", cfg.token_ttl_secs);
        }

        Ok(cfg)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("auth_secret", &"<redacted>")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .finish()
    }
}
