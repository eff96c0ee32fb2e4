//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// pmpsdb - Deploy and verify PMPS database files on PLCs
#[derive(Parser, Debug)]
#[command(name = "pmpsdb")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (TOML, YAML or a legacy pmpsdb_<group>.yml host map).
    /// May be repeated; later files override earlier ones.
    #[arg(short, long = "config", global = true, value_name = "FILE")]
    pub configs: Vec<PathBuf>,

    /// Only use configured hosts belonging to this group. May be repeated.
    #[arg(short, long = "group", global = true, value_name = "GROUP")]
    pub groups: Vec<String>,

    /// Local directory holding the database exports
    #[arg(short, long, global = true, env = "PMPSDB_EXPORT_DIR", value_name = "DIR")]
    pub export_dir: Option<PathBuf>,

    /// Output as JSON for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Run deadline in seconds (0 disables)
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List known PLC hosts
    ///
    /// Examples:
    ///   pmpsdb hosts                 # All configured hosts
    ///   pmpsdb hosts -g tst --probe  # Check which tst PLCs answer
    Hosts {
        /// Attempt a connection to each host and report reachability
        #[arg(long)]
        probe: bool,
    },

    /// Compare the export directory against each host without changing anything
    Verify(RunArgs),

    /// Upload files that are newer locally or missing on the host
    Push(RunArgs),

    /// Download files that are newer on the host or missing locally
    Pull(RunArgs),

    /// Inspect or transfer files on a single PLC
    ///
    /// Examples:
    ///   pmpsdb plc plc-tst-motion --list
    ///   pmpsdb plc plc-tst-motion --download          # plc-tst-motion.json to stdout
    ///   pmpsdb plc plc-tst-motion --upload ./plc-tst-motion.json
    ///   pmpsdb plc plc-tst-motion --compare
    Plc(PlcArgs),
}

/// Host and file targeting for verify, push and pull
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RunArgs {
    /// Restrict the run to this host. May be repeated.
    #[arg(long = "host", value_name = "HOSTNAME")]
    pub hosts: Vec<String>,

    /// Restrict the run to this file name. May be repeated.
    #[arg(short, long = "file", value_name = "NAME")]
    pub files: Vec<String>,

    /// Report intended transfers without executing them
    #[arg(long)]
    pub dry_run: bool,
}

/// Single-host operations
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct PlcArgs {
    /// Hostname of the PLC
    pub hostname: String,

    /// List the database directory
    #[arg(long)]
    pub list: bool,

    /// Print a file to stdout (defaults to <hostname>.json)
    #[arg(long, value_name = "NAME", num_args = 0..=1)]
    pub download: Option<Option<String>>,

    /// Atomically upload a local file under its own name
    #[arg(long, value_name = "PATH")]
    pub upload: Option<PathBuf>,

    /// Compare a file in the export directory with the PLC's copy (defaults to <hostname>.json)
    #[arg(long, value_name = "NAME", num_args = 0..=1)]
    pub compare: Option<Option<String>>,
}
