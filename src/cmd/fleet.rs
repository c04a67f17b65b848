//! Command-line surface of the fleet runner.
//!
//! The two subcommands mirror the two halves of the pipeline: `run`
//! executes from a saved configuration file, `config` builds a fresh
//! configuration from flags and may save it, run it, or both. The fleet
//! description flags are global so they can be given before or after the
//! subcommand; `config` consumes them to build a file, `run --update`
//! consumes them to override one.
//!
//! Every flag that describes the fleet parses as an [`Option`], so the
//! parser itself records which values the user actually supplied. That
//! set of names is the update list used by `run --update`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Commands,
    #[clap(flatten)]
    pub fleet: FleetOpts,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run from a configuration file, noting that fleet flags given on the
    /// command line override those found in the file when --update is set
    #[command(aliases = ["r", "ru"])]
    Run {
        /// Configuration file describing the execution to take place
        #[arg(default_value = "config.json")]
        config_file: PathBuf,

        /// Override configuration file values with the fleet flags
        /// supplied on this command line
        #[arg(long)]
        update: bool,
    },
    /// Build a configuration file from the fleet flags, save it, run it
    /// directly, or both
    #[command(aliases = ["c", "co", "con", "conf", "confi"])]
    Config {
        /// Save the run configuration described by the fleet flags
        /// (defaults to config.json when no file is given)
        #[arg(long, value_name = "FILE", num_args = 0..=1,
              default_missing_value = "config.json")]
        save: Option<PathBuf>,

        /// Execute the current configuration
        #[arg(long)]
        run: bool,
    },
}

/// Fleet description flags shared by both subcommands.
///
/// All fields are optional at the parse layer; defaults are applied when
/// the options are resolved into a [`FleetConfig`](crate::config::FleetConfig).
#[derive(clap::Args, Debug, Clone, Default)]
pub struct FleetOpts {
    /// Number of workers to start and run on
    #[arg(long, global = true, value_name = "N",
          value_parser = clap::value_parser!(u32).range(1..))]
    pub num_clients: Option<u32>,

    /// Base directory to enter on each worker
    #[arg(long, global = true, value_name = "DIR")]
    pub base_dir: Option<String>,

    /// Branch to checkout, if base-dir is a git repository
    #[arg(long, global = true, value_name = "NAME")]
    pub branch: Option<String>,

    /// TAR archive to send and extract in base-dir on each worker
    #[arg(long, global = true, value_name = "FILES.tar")]
    pub files: Option<PathBuf>,

    /// Pull new changes to the branch listed above; use with --read-key
    /// if the repository is protected
    #[arg(long, global = true, num_args = 0..=1, value_name = "BOOL",
          require_equals = true, default_missing_value = "true")]
    pub pull: Option<bool>,

    /// A read-only key for pulling from a protected git repository
    #[arg(long, global = true, value_name = "READ_ONLY_KEY")]
    pub read_key: Option<PathBuf>,

    /// Command to run on each worker; every {} is replaced with the
    /// worker's index in [0, N-1] (you may need to quote)
    #[arg(long, global = true, value_name = "STR")]
    pub command_str: Option<String>,
}

impl FleetOpts {
    /// Names of the fleet flags explicitly supplied on the command line,
    /// in the configuration file's key convention.
    pub fn explicit(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.num_clients.is_some() {
            names.push("num_clients");
        }
        if self.base_dir.is_some() {
            names.push("base_dir");
        }
        if self.branch.is_some() {
            names.push("branch");
        }
        if self.files.is_some() {
            names.push("files");
        }
        if self.pull.is_some() {
            names.push("pull");
        }
        if self.read_key.is_some() {
            names.push("read_key");
        }
        if self.command_str.is_some() {
            names.push("command_str");
        }
        names
    }
}
