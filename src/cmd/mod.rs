pub mod import;
pub mod prices;
pub mod report;

use clap::{Parser, Subcommand};

/// Swedish crypto tax calculator: average cost basis (genomsnittsmetoden)
/// for the K4 declaration.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calculate the declaration from transactions and opening balances
    Report(report::ReportCommand),
    /// Normalize a vendor export into canonical transactions
    Import(import::ImportCommand),
    /// Look up a historical exchange rate
    Price(prices::PriceCommand),
    /// Find coingecko coin ids for a ticker symbol
    Coins(prices::CoinsCommand),
}

impl Cli {
    pub fn exec(&self) -> anyhow::Result<()> {
        match &self.command {
            Command::Report(cmd) => cmd.exec(),
            Command::Import(cmd) => cmd.exec(),
            Command::Price(cmd) => cmd.exec(),
            Command::Coins(cmd) => cmd.exec(),
        }
    }
}
