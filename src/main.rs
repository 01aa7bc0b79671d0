//! Stateless CLI - Issue and inspect signed principal tokens
//!
//! Useful for operators debugging sign-in problems and for scripting tokens in
//! test environments.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use stateless_token::{
    ExpirationPolicy, TimeUnit, TokenConfig, TokenError, TokenParser, TokenState,
};
use tracing::{debug, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const VERSION: &str = concat!(
    env!("GIT_TAG"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_TIME"),
    ")"
);

/// Stateless - Issue and inspect signed principal tokens
#[derive(Parser, Debug)]
#[command(name = "stateless")]
#[command(about = "Stateless - Issue and inspect signed principal tokens")]
#[command(version = VERSION)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Issue a token for a JSON principal
    #[command(long_about = r#"
Issue a signed token carrying the given JSON principal.

EXAMPLES:
  # Token that never expires
  stateless issue --secret $SECRET --principal '{"username":"alice"}'

  # Token valid for 30 minutes, with issuer and audience claims
  stateless issue --secret $SECRET --expire-after 30 --unit minutes \
    --issuer auth.example.com --audience api.example.com \
    --principal '{"username":"alice","roles":["admin"]}'

ENVIRONMENT VARIABLES:
  STATELESS_TOKEN_SECRET  Signing secret
    "#)]
    Issue {
        /// Signing secret shared with every service that parses the token
        #[arg(long, env = "STATELESS_TOKEN_SECRET", hide_env_values = true)]
        secret: String,

        /// Principal as JSON
        #[arg(long)]
        principal: String,

        /// Token lifetime, in --unit units (tokens never expire if omitted)
        #[arg(long)]
        expire_after: Option<u64>,

        /// Unit for --expire-after (e.g. seconds, minutes, hours, days)
        #[arg(long)]
        unit: Option<TimeUnit>,

        /// Issuer claim
        #[arg(long)]
        issuer: Option<String>,

        /// Audience claim
        #[arg(long)]
        audience: Option<String>,
    },

    /// Verify a token and print its principal as JSON
    Inspect {
        /// Signing secret the token was issued with
        #[arg(long, env = "STATELESS_TOKEN_SECRET", hide_env_values = true)]
        secret: String,

        /// Token to inspect
        token: String,
    },
}

fn setup_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };

    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn issue(config: TokenConfig, principal: &str) -> Result<String> {
    let principal: Value =
        serde_json::from_str(principal).context("Principal must be valid JSON")?;

    let parser = config
        .build::<Value>()
        .context("Invalid token configuration")?;

    parser.create(&principal).context("Failed to create token")
}

fn inspect(secret: String, token: &str) -> Result<Value> {
    let parser = TokenConfig::new(secret).build::<Value>()?;

    match parser.parse(token.trim()) {
        Ok(TokenState::Valid(principal)) => Ok(principal),
        Ok(TokenState::Expired { expired_at }) => {
            bail!("Token expired at {}", expired_at.to_rfc3339())
        }
        Err(TokenError::Verification(reason)) => {
            warn!("Token failed verification");
            bail!("Token rejected: {}", reason)
        }
        Err(e) => Err(e).context("Token payload could not be decoded"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Issue {
            secret,
            principal,
            expire_after,
            unit,
            issuer,
            audience,
        } => {
            let mut config = TokenConfig::new(secret);
            if expire_after.is_some() || unit.is_some() {
                let policy = ExpirationPolicy::from_parts(expire_after, unit)
                    .context("--expire-after and --unit must be given together")?;
                config = config.with_expiration(policy);
            }
            config.issuer = issuer;
            config.audience = audience;

            debug!(?config, "Issuing token");
            println!("{}", issue(config, &principal)?);
        }
        Commands::Inspect { secret, token } => {
            let principal = inspect(secret, &token)?;
            println!("{}", serde_json::to_string_pretty(&principal)?);
        }
    }

    Ok(())
}
