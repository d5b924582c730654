//! sqlcache operator tool.
//!
//! Rewrites query templates, parses TTL expressions, prints cache key
//! identities and validates configuration. Logging goes to stderr so
//! command output on stdout stays machine-readable.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use sqlcache_core::cache::{CacheKey, ParamKey, Window};
use sqlcache_core::{AppConfig, Clock, SystemClock, Value};
use sqlcache_rewrite::{Conditions, Record, RewriteConfig, Rewriter};
use tracing_subscriber::EnvFilter;

/// Query-result cache tooling
#[derive(Parser)]
#[command(name = "sqlcache")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to SQLCACHE_CONFIG_FILE)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite a query template against JSON conditions
    Rewrite {
        /// Query text containing $if, :name[] and $sort constructs
        sql: String,
        /// Conditions as a JSON object
        #[arg(long, default_value = "{}")]
        conditions: String,
        /// Treat the conditions as a loosely-typed map
        #[arg(long)]
        map: bool,
    },

    /// Parse a TTL expression such as 100ms or 5min
    Ttl {
        expression: String,
    },

    /// Print the identity of a cache key
    Key {
        /// Query id
        query_id: String,
        /// Bound parameter as name=value or #index=value (value parsed as JSON, else text)
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(ParamKey, Value)>,
        /// 1-based start position
        #[arg(long, default_value_t = 1)]
        start: usize,
        /// Maximum rows (0 = no limit)
        #[arg(long, default_value_t = 0)]
        max_rows: usize,
    },

    /// Load and validate configuration
    CheckConfig {
        /// Configuration file (overrides --config)
        path: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr);
    if cli.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Rewrite { sql, conditions, map } => cmd_rewrite(cli.config, &sql, &conditions, map),
        Commands::Ttl { expression } => cmd_ttl(cli.config, &expression),
        Commands::Key { query_id, params, start, max_rows } => {
            cmd_key(&query_id, params, Window::new(start, max_rows));
            Ok(())
        }
        Commands::CheckConfig { path } => cmd_check_config(path.or(cli.config)),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load_from(&path).with_context(|| format!("loading {}", path.display()))?,
        None => AppConfig::load().context("loading configuration")?,
    };
    Ok(config)
}

fn cmd_rewrite(config: Option<PathBuf>, sql: &str, conditions: &str, map: bool) -> Result<()> {
    let config = load_config(config)?;
    let json: serde_json::Value = serde_json::from_str(conditions).context("conditions are not valid JSON")?;
    let record = Record::from_json(json)?;

    let rewriter = Rewriter::new(RewriteConfig::from(&config));
    let source: Box<dyn Conditions> = if map { Box::new(record.into_map()) } else { Box::new(record) };
    let rewritten = rewriter.rewrite(sql, &*source).map_err(sqlcache_core::Error::from)?;

    println!("{rewritten}");
    Ok(())
}

fn cmd_ttl(config: Option<PathBuf>, expression: &str) -> Result<()> {
    let config = load_config(config)?;
    let ttl = config.unit_table()?.parse(expression)?;
    let now = SystemClock.now();

    println!("ttl:        {ttl}");
    println!("millis:     {}", ttl.duration().num_milliseconds());
    println!("expires_at: {}", ttl.expiry_from(now).to_rfc3339_opts(chrono::SecondsFormat::Millis, true));
    Ok(())
}

fn cmd_key(query_id: &str, params: Vec<(ParamKey, Value)>, window: Window) {
    let mut builder = CacheKey::builder(query_id);
    builder.window(window);
    for (key, value) in params {
        builder.add_param(key, value);
    }
    let key = builder.build();

    println!("key:    {key}");
    println!("digest: {}", key.digest());
}

fn cmd_check_config(path: Option<PathBuf>) -> Result<()> {
    let config = load_config(path)?;
    let rules = config.expiration_rules()?;

    println!("capacity:                 {}", config.capacity);
    println!("allow_array_empty_string: {}", config.allow_array_empty_string);
    println!("queries:                  {}", config.queries.len());
    for id in config.expiration.keys() {
        if let Ok(ttl) = rules.ttl_for(id) {
            println!("  {id}: {ttl}");
        }
    }
    Ok(())
}

/// Parse `name=value` or `#index=value`.
fn parse_param(raw: &str) -> Result<(ParamKey, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("expected name=value, got '{raw}'");
    };

    let key = match key.strip_prefix('#') {
        Some(index) => ParamKey::Index(index.parse().with_context(|| format!("invalid parameter index '{index}'"))?),
        None if key.is_empty() => bail!("parameter name must not be empty"),
        None => ParamKey::Name(key.to_string()),
    };

    let value = serde_json::from_str::<serde_json::Value>(value).map_or_else(|_| Value::from(value), Value::from);
    Ok((key, value))
}
