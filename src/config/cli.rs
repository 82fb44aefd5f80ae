use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "bc-admin")]
#[command(about = "Show how admin UI requests translate into backend entity calls")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "bc-admin.toml")]
    pub config: String,

    /// Wrapper name to use when no configuration file exists
    #[arg(long)]
    pub wrapper_name: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a data request (GET_LIST, GET_ONE, CREATE, ...) against the dry-run backend
    Data {
        kind: String,
        resource: String,
        /// Request params as JSON
        #[arg(long, default_value = "{}")]
        params: String,
    },
    /// Run an auth request (AUTH_LOGIN, AUTH_CHECK, ...) against the dry-run backend
    Auth {
        kind: String,
        /// Request params as JSON
        #[arg(long, default_value = "{}")]
        params: String,
        /// Pretend the backend already holds a session
        #[arg(long)]
        authenticated: bool,
    },
}
