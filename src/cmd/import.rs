//! Import command - normalize a vendor export into canonical transactions

use anyhow::{bail, Context};
use clap::{Args, ValueEnum};
use std::fs::File;
use std::io;
use std::path::PathBuf;

use crate::core::transaction;
use crate::import::{cryptocom, gnosis, nexo};
use crate::prices::{CoinList, RateCache, Resolver};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Source {
    Cryptocom,
    Nexo,
    Gnosis,
}

#[derive(Args, Debug)]
pub struct ImportCommand {
    /// Which vendor's export format the file is in
    #[arg(short, long, value_enum)]
    source: Source,

    /// The vendor's exported CSV file
    #[arg(short, long)]
    file: PathBuf,

    /// Wallet address the export belongs to (gnosis only)
    #[arg(short, long)]
    address: Option<String>,

    /// Rate cache file, loaded at start and saved at end
    #[arg(long, default_value = "valutor.json")]
    cache: PathBuf,

    /// Cached coingecko coin list (symbol -> coin id)
    #[arg(long, default_value = "coinlist.json")]
    coinlist: PathBuf,

    /// Write canonical transactions here instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,
}

impl ImportCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let cache = RateCache::load(&self.cache)?;
        let coins = CoinList::new(&self.coinlist);
        let mut resolver = Resolver::new(cache, coins);

        let file = File::open(&self.file)
            .with_context(|| format!("opening {}", self.file.display()))?;
        let transactions = match self.source {
            Source::Cryptocom => cryptocom::import(file, &mut resolver)?,
            Source::Nexo => nexo::import(file, &mut resolver)?,
            Source::Gnosis => {
                let address = match &self.address {
                    Some(address) => address,
                    None => bail!("--address is required for the gnosis source"),
                };
                gnosis::import(file, address, &mut resolver)?
            }
        };
        log::info!("normalized {} transactions", transactions.len());

        match &self.out {
            Some(path) => {
                let out =
                    File::create(path).with_context(|| format!("creating {}", path.display()))?;
                transaction::write_csv(&transactions, out)?;
            }
            None => transaction::write_csv(&transactions, io::stdout())?,
        }

        // Keep whatever rates this run fetched for the next one.
        resolver.save()
    }
}
