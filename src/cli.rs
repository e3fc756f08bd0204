// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Subcommands:
// - serve: run the REST API plus the daily link sweep
// - check: run one sweep now and print the results
// - favicon: look up the favicon of a single URL
// - export / import: move links in and out as JSON
//
// Global flags pick the config file and the store, and control logging.
// They work before or after the subcommand: `link-shelf -v check` and
// `link-shelf check -v` are the same.
// =============================================================================

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "link-shelf",
    version,
    about = "A bookmark organizer with favicon discovery and link health checks",
    long_about = "link-shelf keeps your bookmarks in categories, finds their favicons, \
                  and checks every night which links have gone dead."
)]
pub struct Cli {
    /// TOML config file. Missing file = built-in defaults
    #[arg(long, global = true, default_value = "link-shelf.toml")]
    pub config: PathBuf,

    /// Keep everything in memory instead of SQLite (lost on exit)
    #[arg(long, global = true, conflicts_with = "database")]
    pub memory: bool,

    /// SQLite database file, overrides [storage] database
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Debug-level logging (RUST_LOG still wins if set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the REST API and run the daily link sweep
    ///
    /// Example: link-shelf serve --bind 127.0.0.1:8080
    Serve {
        /// Address to listen on, overrides [server] bind
        #[arg(long)]
        bind: Option<String>,

        /// Don't start the daily sweep
        #[arg(long)]
        no_schedule: bool,
    },

    /// Check every stored link once and print the results
    ///
    /// Exit code 0 = all links valid, 1 = some invalid, 2 = error
    Check {
        /// Output results in JSON format instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Find the favicon of a page
    ///
    /// Example: link-shelf favicon rust-lang.org
    Favicon {
        /// Page URL (https:// is added if missing)
        url: String,
    },

    /// Write all links as JSON
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Read links from a JSON file written by `export` or the API
    Import {
        /// JSON file to import
        file: PathBuf,
    },
}
