use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// matchday: wallet sign-in and reward cards from the terminal.
#[derive(Parser, Debug)]
#[command(name = "matchday", version)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Key-value store file; state is kept in memory when omitted
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Output as JSON instead of TSV
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect the wallet and sign in
    Login,

    /// Forget the stored credentials
    Logout,

    /// Print the restored session state
    Status,

    /// Follow wallet events and print every state change
    Watch,

    /// Inspect and grant reward cards
    #[command(subcommand)]
    Cards(CardsCommand),
}

#[derive(Subcommand, Debug)]
pub enum CardsCommand {
    /// Cards held by an address
    Show { address: String },

    /// Grant the starter pack if the address has none
    Grant {
        address: String,

        /// Catalog language (en, pt)
        #[arg(long, default_value = "en")]
        language: String,
    },

    /// Cards spent on one bet
    Used { address: String, bet_id: String },
}
