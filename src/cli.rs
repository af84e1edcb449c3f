use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "accountmint", about = "Batch account provisioner for browser signup flows")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a batch of accounts
    Register {
        /// How many accounts to create
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,

        /// Max simultaneous browser sessions
        #[arg(long)]
        concurrency: Option<usize>,

        /// Show browser windows instead of running headless
        #[arg(long)]
        visible: bool,
    },
    /// List stored accounts
    Accounts,
    /// Verify mailbox API connectivity
    TestMail,
}
