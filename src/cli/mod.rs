//! CLI argument definitions
//!
//! Every option can also come from an environment variable; a flag on the
//! command line wins over the variable. Options left unset fall back to the
//! config file, then to built-in defaults (see [`crate::config::Settings`]).
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "s3-tagger",
    version,
    author = "neur0map",
    about = "Tag data objects with database, table and PII classification",
    long_about = "Reads a CSV manifest of (db, table, pii) rows, lists every object under a bucket \
                  prefix, works out which database and table each object belongs to from its key, \
                  and writes db/table/pii tags to the object."
)]
pub struct Cli {
    /// Config file path (defaults to ~/.config/s3-tagger/config.toml when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Location of the manifest CSV (s3://bucket/key or a local path)
    #[arg(long, visible_alias = "csv_location", env = "csv_location")]
    pub csv_location: Option<String>,

    /// Bucket holding the objects to tag
    #[arg(long, env = "bucket")]
    pub bucket: Option<String>,

    /// Prefix to crawl for objects to tag
    #[arg(long, visible_alias = "s3_prefix", env = "s3_prefix")]
    pub s3_prefix: Option<String>,

    /// Log level (DEBUG, INFO, WARNING, ERROR)
    #[arg(long, env = "log_level")]
    pub log_level: Option<String>,

    /// Environment label attached to every log line
    #[arg(long, env = "environment")]
    pub environment: Option<String>,

    /// Application label attached to every log line
    #[arg(long, env = "application")]
    pub application: Option<String>,

    /// Leave `$folder$` placeholder objects untagged
    #[arg(long, env = "skip_temp_markers")]
    pub skip_temp_markers: bool,

    /// Custom S3 endpoint (e.g. a local emulator)
    #[arg(long, env = "s3_endpoint_url")]
    pub endpoint_url: Option<String>,

    /// Maximum attempts per storage request
    #[arg(long, env = "s3_max_attempts")]
    pub max_attempts: Option<u32>,
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
