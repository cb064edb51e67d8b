use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "siteseed")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Provision a Confluence Cloud site from a manifest", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Site manifest (defaults to the built-in site layout)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Site URL and credentials
#[derive(Args, Clone, Default)]
pub struct ConnectionArgs {
    /// Confluence site URL, e.g. https://your-site.atlassian.net
    #[arg(long, env = "CONFLUENCE_URL", global = true)]
    pub url: Option<String>,

    /// Account email
    #[arg(long, env = "CONFLUENCE_EMAIL", global = true)]
    pub email: Option<String>,

    /// API token
    #[arg(long, env = "CONFLUENCE_API_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Provision every resource in the manifest
    Apply(ApplyArgs),

    /// Show which manifest resources already exist on the site
    Status(StatusArgs),

    /// List the permission policies
    Policies {
        /// Show a single policy
        name: Option<String>,
    },

    /// Inspect the site manifest
    #[command(subcommand)]
    Manifest(ManifestCommand),

    /// Check configuration and connectivity
    Doctor,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Pause between mutating requests, in milliseconds
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Skip confirmation prompts
    #[arg(short, long)]
    pub yes: bool,

    /// Run against an in-memory site instead of Confluence
    #[arg(long)]
    pub mock: bool,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Print the status as JSON
    #[arg(long)]
    pub json: bool,

    /// Query an empty in-memory site instead of Confluence
    #[arg(long)]
    pub mock: bool,
}

#[derive(Subcommand)]
pub enum ManifestCommand {
    /// Print the effective manifest grouped by stage
    Show,

    /// Check the manifest for structural problems
    Validate,
}
