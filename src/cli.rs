//! Command-line interface parsing for nowplaying
//!
//! Flags override the matching environment variables. Running without a
//! subcommand starts the HTTP server.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;

/// Caching proxy for the Last.fm recent tracks API
#[derive(Parser, Debug)]
#[command(name = "nowplaying")]
#[command(about = "Caching proxy for the Last.fm recent tracks API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Port to listen on (overrides PORT)
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Directory for the cache file (overrides CACHE_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Freshness window in seconds (overrides CACHE_DURATION)
    #[arg(long, global = true, value_name = "SECONDS")]
    pub cache_duration: Option<u64>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Serve the cached endpoint over HTTP (default)
    Serve,
    /// Run one request through the cache and print the JSON response
    Fetch,
}

impl Cli {
    /// The selected subcommand, defaulting to `serve`
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }

    /// Applies command-line overrides on top of an environment-derived config
    pub fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(ref dir) = self.cache_dir {
            config.cache_dir = dir.clone();
        }
        if let Some(secs) = self.cache_duration {
            config.cache_duration_secs = secs;
        }
    }
}
