//! Command line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pkgi - install, archive and toggle packages through a privileged backend
#[derive(Parser)]
#[command(name = "pkgi")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Install packages through a privileged broker or root shell")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Write debug logs to the configured log directory
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Install from a file, a content/file/package/market URI, or a package name
    #[command(alias = "i")]
    Install {
        /// Local payload path, URI, or installed package name
        source: String,

        /// Record the app store as the installing package
        #[arg(long)]
        store_installer: bool,

        /// Stage the payloads but leave the session uncommitted
        #[arg(long)]
        no_commit: bool,

        /// Remove the split named by the source instead of installing it
        #[arg(long)]
        remove_split: bool,
    },

    /// Write an installed package's payloads to a zip archive
    Archive {
        /// Installed package id
        package: String,

        /// Uninstall the package (keeping its data) once archived
        #[arg(long)]
        uninstall: bool,
    },

    /// Enable a package for the current user
    Enable {
        /// Package id
        package: String,
    },

    /// Disable a package for the current user
    Disable {
        /// Package id
        package: String,
    },

    /// Report which privileged backend is usable
    Probe,
}

impl Commands {
    /// Short name used in logs and operation events
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Install { .. } => "install",
            Commands::Archive { .. } => "archive",
            Commands::Enable { .. } => "enable",
            Commands::Disable { .. } => "disable",
            Commands::Probe => "probe",
        }
    }
}
