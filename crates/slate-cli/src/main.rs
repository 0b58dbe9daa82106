// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Slate CLI entrypoint.
//!
//! Developer-facing commands for whiteboard files on disk:
//!
//! ```text
//! slate [--config-dir DIR] [--data-dir DIR] <command>
//! ```
//!
//! Exits `0` on success, non-zero on error.

// The CLI is expected to print to stdout/stderr.
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use slate_app_core::config::ConfigService;
use slate_app_core::prefs::BoardPrefs;
use slate_config_fs::FsConfigStore;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Slate whiteboard storage CLI")]
struct Args {
    /// Config directory (defaults to the platform config dir)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    /// Directory holding whiteboard files (overrides prefs)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Table of scenes, pages and keyframes
    Inspect {
        /// Whiteboard name
        name: String,
    },
    /// Redraw summary for one page, as JSON
    View {
        /// Whiteboard name
        name: String,
        /// Scene index (defaults to the page in focus)
        #[arg(long, allow_hyphen_values = true, default_value_t = -1)]
        scene: i32,
        /// Page index (defaults to the page in focus)
        #[arg(long, allow_hyphen_values = true, default_value_t = -1)]
        page: i32,
    },
    /// Write the combined `<name>.board` export
    Export {
        /// Whiteboard name
        name: String,
    },
    /// Feed a file of length-framed encoded packages through the engine
    Ingest {
        /// Whiteboard name
        name: String,
        /// Input file
        file: PathBuf,
    },
    /// Print the effective preferences as JSON
    Prefs,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let store = match &args.config_dir {
        Some(dir) => FsConfigStore::at(dir),
        None => FsConfigStore::new(),
    }
    .context("open config store")?;
    let config = ConfigService::new(store);
    let mut prefs = BoardPrefs::load(&config).context("load board prefs")?;
    if let Some(dir) = args.data_dir {
        prefs.data_dir = dir;
    }

    match args.command {
        Command::Inspect { name } => commands::inspect(&prefs, &name),
        Command::View { name, scene, page } => commands::view(&prefs, &name, scene, page),
        Command::Export { name } => commands::export(&prefs, &name),
        Command::Ingest { name, file } => commands::ingest(&prefs, &name, &file),
        Command::Prefs => {
            println!("{}", serde_json::to_string_pretty(&prefs)?);
            Ok(())
        }
    }
}
