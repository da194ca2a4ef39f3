use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "wallet-credit-score", version, about = "Multi-chain wallet credit scoring")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Override bind address, e.g. 0.0.0.0:8080
        #[arg(long)]
        addr: Option<String>,
    },
    /// Score one wallet and print the full breakdown as JSON
    Score {
        #[arg(long)]
        wallet: String,
    },
    /// Print the configured chain profiles
    Chains,
}
