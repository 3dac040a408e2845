//! Historical rate lookups with a persistent JSON cache.
//!
//! Fiat currencies (usd/eur/gbp) resolve to SEK via exchangerate.host;
//! anything else is treated as a coingecko coin id and resolves to USD.
//! Only the importers talk to this module; the engine consumes
//! pre-converted SEK amounts.

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const FIAT: &[&str] = &["usd", "eur", "gbp"];

/// Rate lookups as the importers see them. The live implementation is
/// [`Resolver`]; tests substitute a fixed-rate stub.
pub trait RateSource {
    /// SEK per unit of the given fiat currency on `date`.
    fn fiat_sek(&mut self, date: NaiveDate, code: &str) -> anyhow::Result<Decimal>;
    /// USD per unit of the given token on `date`.
    fn token_usd(&mut self, date: NaiveDate, symbol: &str) -> anyhow::Result<Decimal>;
}

/// File-backed rate cache, keyed by (currency, date). Loaded once at the
/// start of a run and saved at the end, so repeated lookups never refetch.
///
/// File shape:
/// `{"usd": {"2021-01-01": 8.269289}, "bitcoin": {"2022-01-02": 47816.07}}`
#[derive(Debug)]
pub struct RateCache {
    path: PathBuf,
    rates: BTreeMap<String, BTreeMap<String, Decimal>>,
    dirty: bool,
}

impl RateCache {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let rates = match fs::read_to_string(path) {
            Ok(json) => serde_json::from_str(&json)
                .with_context(|| format!("malformed rate cache {}", path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("rate cache {} not found, starting empty", path.display());
                BTreeMap::new()
            }
            Err(err) => return Err(err).context(format!("reading {}", path.display())),
        };
        Ok(RateCache {
            path: path.to_path_buf(),
            rates,
            dirty: false,
        })
    }

    fn get(&self, currency: &str, date: NaiveDate) -> Option<Decimal> {
        self.rates
            .get(currency)
            .and_then(|dates| dates.get(&date_key(date)))
            .copied()
    }

    fn insert(&mut self, currency: &str, date: NaiveDate, rate: Decimal) {
        self.rates
            .entry(currency.to_string())
            .or_default()
            .insert(date_key(date), rate);
        self.dirty = true;
    }

    /// Write the cache back if anything was fetched this run.
    pub fn save(&mut self) -> anyhow::Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let json = serde_json::to_string(&self.rates)?;
        fs::write(&self.path, json)
            .with_context(|| format!("writing rate cache {}", self.path.display()))?;
        self.dirty = false;
        Ok(())
    }
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Coingecko's symbol -> coin id list, cached on disk
/// (`[{"id":"bitcoin","symbol":"btc","name":"Bitcoin"},...]`).
#[derive(Debug)]
pub struct CoinList {
    path: PathBuf,
    coins: Option<Vec<Coin>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coin {
    pub id: String,
    pub symbol: String,
    pub name: String,
}

impl CoinList {
    pub fn new(path: &Path) -> Self {
        CoinList {
            path: path.to_path_buf(),
            coins: None,
        }
    }

    /// All coin ids matching a ticker symbol, case-insensitively. Fetches
    /// and caches the full list on first use.
    pub fn ids_for_symbol(&mut self, symbol: &str) -> anyhow::Result<Vec<Coin>> {
        let coins = self.coins()?;
        let symbol = symbol.to_lowercase();
        Ok(coins
            .iter()
            .filter(|coin| coin.symbol == symbol)
            .cloned()
            .collect())
    }

    fn coins(&mut self) -> anyhow::Result<&[Coin]> {
        if self.coins.is_none() {
            let coins = match fs::read_to_string(&self.path) {
                Ok(json) => serde_json::from_str(&json)
                    .with_context(|| format!("malformed coin list {}", self.path.display()))?,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    let coins = fetch_coin_list()?;
                    fs::write(&self.path, serde_json::to_string(&coins)?)
                        .with_context(|| format!("writing coin list {}", self.path.display()))?;
                    coins
                }
                Err(err) => return Err(err).context(format!("reading {}", self.path.display())),
            };
            self.coins = Some(coins);
        }
        Ok(self.coins.as_deref().unwrap_or_default())
    }
}

fn fetch_coin_list() -> anyhow::Result<Vec<Coin>> {
    log::info!("fetching coin list from coingecko");
    let coins = ureq::get("https://api.coingecko.com/api/v3/coins/list")
        .call()?
        .into_json()?;
    Ok(coins)
}

/// Cache-first rate resolver. Network calls happen only on cache misses.
pub struct Resolver {
    cache: RateCache,
    coins: CoinList,
}

#[derive(Debug, Deserialize)]
struct ConvertResponse {
    result: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    market_data: Option<MarketData>,
}

#[derive(Debug, Deserialize)]
struct MarketData {
    current_price: BTreeMap<String, Decimal>,
}

impl Resolver {
    pub fn new(cache: RateCache, coins: CoinList) -> Self {
        Resolver { cache, coins }
    }

    /// Rate for a currency on a date. Fiat codes give SEK, anything else is
    /// a coingecko coin id and gives USD.
    pub fn rate(&mut self, date: NaiveDate, currency: &str) -> anyhow::Result<Decimal> {
        if let Some(rate) = self.cache.get(currency, date) {
            return Ok(rate);
        }
        let rate = if FIAT.contains(&currency) {
            self.fetch_fiat(date, currency)?
        } else {
            self.fetch_crypto(date, currency)?
        };
        self.cache.insert(currency, date, rate);
        Ok(rate)
    }

    pub fn save(&mut self) -> anyhow::Result<()> {
        self.cache.save()
    }

    fn fetch_fiat(&self, date: NaiveDate, currency: &str) -> anyhow::Result<Decimal> {
        log::info!("fetching {}/SEK for {} from exchangerate.host", currency, date);
        let response: ConvertResponse = ureq::get("https://api.exchangerate.host/convert")
            .query("from", &currency.to_uppercase())
            .query("to", "SEK")
            .query("date", &date_key(date))
            .call()?
            .into_json()?;
        response
            .result
            .ok_or_else(|| anyhow!("no {}/SEK rate for {}", currency, date))
    }

    fn fetch_crypto(&self, date: NaiveDate, coin_id: &str) -> anyhow::Result<Decimal> {
        log::info!("fetching {}/USD for {} from coingecko", coin_id, date);
        let url = format!("https://api.coingecko.com/api/v3/coins/{}/history", coin_id);
        let response: HistoryResponse = ureq::get(&url)
            .query("date", &date.format("%d-%m-%Y").to_string())
            .call()?
            .into_json()?;
        response
            .market_data
            .and_then(|md| md.current_price.get("usd").copied())
            .ok_or_else(|| anyhow!("no {}/USD price for {}", coin_id, date))
    }
}

impl RateSource for Resolver {
    fn fiat_sek(&mut self, date: NaiveDate, code: &str) -> anyhow::Result<Decimal> {
        if !FIAT.contains(&code) {
            return Err(anyhow!("not a supported fiat currency: {}", code));
        }
        self.rate(date, code)
    }

    fn token_usd(&mut self, date: NaiveDate, symbol: &str) -> anyhow::Result<Decimal> {
        let matches = self.coins.ids_for_symbol(symbol)?;
        let coin = match matches.as_slice() {
            [] => return Err(anyhow!("no coingecko id for symbol {}", symbol)),
            [only] => only.clone(),
            [first, ..] => {
                log::warn!(
                    "symbol {} matches {} coin ids, using '{}'",
                    symbol,
                    matches.len(),
                    first.id
                );
                first.clone()
            }
        };
        self.rate(date, &coin.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn cache_roundtrips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("valutor.json");

        let mut cache = RateCache::load(&path).unwrap();
        cache.insert("usd", date("2021-01-01"), dec!(8.269289));
        cache.insert("bitcoin", date("2022-01-02"), dec!(47816.08));
        cache.save().unwrap();

        let reloaded = RateCache::load(&path).unwrap();
        assert_eq!(
            reloaded.get("usd", date("2021-01-01")),
            Some(dec!(8.269289))
        );
        assert_eq!(
            reloaded.get("bitcoin", date("2022-01-02")),
            Some(dec!(47816.08))
        );
        assert_eq!(reloaded.get("usd", date("2021-01-02")), None);
    }

    #[test]
    fn missing_cache_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RateCache::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(cache.get("usd", date("2021-01-01")), None);
    }

    #[test]
    fn clean_cache_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("valutor.json");
        let mut cache = RateCache::load(&path).unwrap();
        cache.save().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn cached_rates_resolve_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = RateCache::load(&dir.path().join("valutor.json")).unwrap();
        cache.insert("usd", date("2022-02-08"), dec!(9.3));
        let coins = CoinList::new(&dir.path().join("coinlist.json"));
        let mut resolver = Resolver::new(cache, coins);
        assert_eq!(
            resolver.fiat_sek(date("2022-02-08"), "usd").unwrap(),
            dec!(9.3)
        );
    }

    #[test]
    fn unknown_fiat_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RateCache::load(&dir.path().join("valutor.json")).unwrap();
        let coins = CoinList::new(&dir.path().join("coinlist.json"));
        let mut resolver = Resolver::new(cache, coins);
        assert!(resolver.fiat_sek(date("2022-02-08"), "chf").is_err());
    }
}
