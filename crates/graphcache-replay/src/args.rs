use std::{fs, path::PathBuf};

use anyhow::anyhow;
use clap::Parser;
use graphcache::{CacheConfig, CacheSettings, SchemaPredicates};
use tracing_subscriber::EnvFilter;

mod log;

pub(crate) use log::LogLevel;

#[derive(Debug, Parser)]
#[command(name = "graphcache-replay", version)]
/// Replays a script of operations and network results through a cache and
/// prints everything the cache emits and forwards, one JSON object per step
pub(crate) struct Args {
    /// Path to the JSON script to replay
    pub script: PathBuf,
    /// Path to the TOML cache settings
    #[arg(long, short, env = "GRAPHCACHE_SETTINGS")]
    pub settings: Option<PathBuf>,
    /// Path to an introspection result of the schema. Without it, any missing
    /// field makes a query a miss.
    #[arg(long, env = "GRAPHCACHE_SCHEMA")]
    pub schema: Option<PathBuf>,
    /// Set the logging level
    #[arg(long, env = "GRAPHCACHE_LOG", default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,
}

impl Args {
    pub fn config(&self) -> anyhow::Result<CacheConfig> {
        let mut builder = CacheConfig::builder();

        if let Some(path) = &self.settings {
            let source = fs::read_to_string(path).map_err(|e| anyhow!("error loading settings:\n{e}"))?;
            builder = builder.settings(CacheSettings::from_toml(&source)?);
        }

        if let Some(path) = &self.schema {
            let source = fs::read_to_string(path).map_err(|e| anyhow!("error loading schema:\n{e}"))?;
            builder = builder.schema(SchemaPredicates::from_introspection_json(&source)?);
        }

        Ok(builder.build()?)
    }

    /// Logs go to stderr, stdout is reserved for the replay output
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_env("GRAPHCACHE_RUST_LOG")
            .unwrap_or_else(|_| EnvFilter::new(self.log_level.as_filter_str()));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .without_time()
            .with_target(true)
            .init();
    }
}

pub(crate) fn parse() -> Args {
    Args::parse()
}
