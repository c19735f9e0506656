//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};

/// JARVICE client: submit, monitor and control jobs, move data in and out of the vault
#[derive(Parser, Debug)]
#[command(name = "jarvice")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Account name (overrides config and JARVICE_USERNAME)
    #[arg(long, global = true)]
    pub username: Option<String>,

    /// API key (overrides config and JARVICE_APIKEY)
    #[arg(long, global = true)]
    pub apikey: Option<String>,

    /// Base URL of the job API
    #[arg(long, global = true, value_hint = ValueHint::Url)]
    pub apiurl: Option<String>,

    /// Log level on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    pub loglevel: LogLevel,

    /// Config file (default: ~/.config/jarvice/jarvice.toml)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Output format for API responses
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// Indented `key: value` lines
    Text,
}

/// Job selector shared by the per-job commands.
#[derive(Args, Debug, Clone)]
pub struct JobTarget {
    /// Job name
    #[arg(long)]
    pub name: Option<String>,

    /// Job number
    #[arg(long)]
    pub number: Option<u64>,
}

/// Vault selector shared by the transfer commands.
#[derive(Args, Debug, Clone)]
pub struct VaultTarget {
    /// Vault address: host[:port] or file://<dir> (default from config)
    #[arg(long)]
    pub vault: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connection address and password of a running job
    Connect(JobTarget),

    /// Submit a job from a JSON file or a literal JSON string
    Submit {
        /// Path to a job JSON file, or the JSON itself
        job: String,
    },

    /// Job information
    Info(JobTarget),

    /// Job status
    Status(JobTarget),

    /// Run an application-defined action on a running job
    Action {
        #[command(flatten)]
        target: JobTarget,
        /// Action name
        #[arg(long)]
        action: String,
    },

    /// Terminate a job
    Terminate(JobTarget),

    /// Request a graceful shutdown of a job
    Shutdown(JobTarget),

    /// List active jobs
    Jobs {
        /// Single job by name
        #[arg(long)]
        name: Option<String>,
    },

    /// Output of a completed job
    Output {
        #[command(flatten)]
        target: JobTarget,
        /// Number of trailing lines
        #[arg(long)]
        lines: Option<u32>,
    },

    /// Tail of a running job's output
    Tail {
        #[command(flatten)]
        target: JobTarget,
        /// Number of trailing lines
        #[arg(long)]
        lines: Option<u32>,
    },

    /// Application descriptions
    Apps {
        /// Single application
        #[arg(long)]
        name: Option<String>,
    },

    /// Machine types
    Machines {
        /// Single machine type
        #[arg(long)]
        name: Option<String>,
    },

    /// One line per active job: number, name, status, application
    Summary,

    /// Download a file or directory from the vault
    Download {
        /// Remote path in the vault
        remote: String,
        /// Local destination (default: basename in the current directory)
        #[arg(value_hint = ValueHint::AnyPath)]
        local: Option<PathBuf>,
        #[command(flatten)]
        vault: VaultTarget,
    },

    /// Upload a file or directory to the vault
    Upload {
        /// Local file or directory
        #[arg(value_hint = ValueHint::AnyPath)]
        local: PathBuf,
        /// Remote destination (default: basename in the vault home)
        remote: Option<String>,
        /// Replace existing remote files
        #[arg(long)]
        overwrite: bool,
        #[command(flatten)]
        vault: VaultTarget,
    },

    /// Block until a job reaches a terminal status
    #[command(name = "wait_for", visible_alias = "wait-for")]
    WaitFor {
        #[command(flatten)]
        target: JobTarget,
        /// Seconds between status queries
        #[arg(long)]
        interval: Option<u64>,
        /// Consecutive failed queries before giving up
        #[arg(long)]
        max_errors: Option<u32>,
        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Shut down every active job
    #[command(name = "shutdown_all", visible_alias = "shutdown-all")]
    ShutdownAll,

    /// Terminate every active job
    #[command(name = "terminate_all", visible_alias = "terminate-all")]
    TerminateAll,

    /// List a vault directory
    Ls {
        /// Remote path
        #[arg(default_value = ".")]
        remote: String,
        #[command(flatten)]
        vault: VaultTarget,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration (API key masked)
    Show,
    /// Write a commented template config file
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
    /// Show config file locations
    Path,
}
