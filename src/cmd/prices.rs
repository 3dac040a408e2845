//! Price and coin lookup commands, backed by the persistent rate cache

use chrono::NaiveDate;
use clap::Args;
use std::path::PathBuf;

use crate::prices::{CoinList, RateCache, Resolver, FIAT};

#[derive(Args, Debug)]
pub struct PriceCommand {
    /// Date to look up (YYYY-MM-DD)
    date: NaiveDate,

    /// Fiat currency (usd, eur, gbp) or coingecko coin id (e.g. bitcoin)
    currency: String,

    /// Rate cache file, loaded at start and saved at end
    #[arg(long, default_value = "valutor.json")]
    cache: PathBuf,

    /// Cached coingecko coin list (symbol -> coin id)
    #[arg(long, default_value = "coinlist.json")]
    coinlist: PathBuf,
}

impl PriceCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let cache = RateCache::load(&self.cache)?;
        let coins = CoinList::new(&self.coinlist);
        let mut resolver = Resolver::new(cache, coins);

        let rate = resolver.rate(self.date, &self.currency)?;
        if FIAT.contains(&self.currency.as_str()) {
            println!("{} {} = {:.4} SEK", self.date, self.currency, rate);
        } else {
            let usd_sek = resolver.rate(self.date, "usd")?;
            println!(
                "{} {} = {:.4} USD = {:.2} SEK",
                self.date,
                self.currency,
                rate,
                rate * usd_sek
            );
        }
        resolver.save()
    }
}

#[derive(Args, Debug)]
pub struct CoinsCommand {
    /// Ticker symbol to search for (e.g. btc)
    symbol: String,

    /// Cached coingecko coin list (symbol -> coin id)
    #[arg(long, default_value = "coinlist.json")]
    coinlist: PathBuf,
}

impl CoinsCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let mut coins = CoinList::new(&self.coinlist);
        let matches = coins.ids_for_symbol(&self.symbol)?;
        if matches.is_empty() {
            println!("No coins match symbol '{}'", self.symbol);
            return Ok(());
        }
        for coin in matches {
            println!("{}  ({})", coin.id, coin.name);
        }
        Ok(())
    }
}
