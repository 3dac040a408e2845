//! Gnosis wallet token-transfer export (gnosisscan.io).
//!
//! The export is one row per token transfer; a swap shows up as several
//! rows sharing a transaction hash. Rows are grouped by hash and reduced to
//! the wallet's net flow per token; only hashes with both an inflow and an
//! outflow (swaps) produce transactions. Plain transfers in or out are
//! skipped, like any other wallet-to-wallet move.

use anyhow::anyhow;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;

use super::{parse_amount, parse_usd};
use crate::core::{Transaction, TxKind};
use crate::prices::RateSource;

/// Local CRC variants all book against the one CRC position.
const CRC_VARIANTS: &[&str] = &["CRC", "gCRC", "s-gCRC", "s-METESTSUP"];

const VENUE: &str = "gnosis swap";

/// Net flows below this are rounding dust from the export.
const DUST: Decimal = dec!(0.0000000001);

#[derive(Debug, Clone, Deserialize)]
struct Record {
    #[serde(rename = "Transaction Hash")]
    hash: String,
    #[serde(rename = "DateTime (UTC)")]
    date_time: String,
    #[serde(rename = "From")]
    from: String,
    #[serde(rename = "To")]
    to: String,
    #[serde(rename = "TokenValue")]
    token_value: String,
    #[serde(rename = "USDValueDayOfTx")]
    usd_value: String,
    #[serde(rename = "TokenSymbol")]
    symbol: String,
}

fn normalize_symbol(symbol: &str) -> &str {
    if CRC_VARIANTS.contains(&symbol) {
        "CRC"
    } else {
        symbol
    }
}

/// SEK value of a received token amount: the export's USD day value when it
/// has one, otherwise a market price lookup.
fn token_sek(
    rates: &mut dyn RateSource,
    date: NaiveDate,
    symbol: &str,
    usd_from_export: Decimal,
    quantity: Decimal,
) -> anyhow::Result<Decimal> {
    if usd_from_export > Decimal::ZERO {
        Ok((usd_from_export * rates.fiat_sek(date, "usd")?).round_dp(2))
    } else if quantity > Decimal::ZERO {
        let usd_per_token = rates.token_usd(date, symbol)?;
        let sek_per_usd = rates.fiat_sek(date, "usd")?;
        Ok((quantity * usd_per_token * sek_per_usd).round_dp(2))
    } else {
        Ok(Decimal::ZERO)
    }
}

/// Normalize a gnosisscan token export for the given wallet address.
pub fn import<R: Read>(
    reader: R,
    my_address: &str,
    rates: &mut dyn RateSource,
) -> anyhow::Result<Vec<Transaction>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let records = rdr.deserialize::<Record>().collect::<csv::Result<Vec<_>>>()?;
    log::info!("read {} gnosis wallet records", records.len());

    // Group rows per transaction hash, keeping file order.
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Record>> = HashMap::new();
    for record in records {
        if !groups.contains_key(&record.hash) {
            order.push(record.hash.clone());
        }
        groups.entry(record.hash.clone()).or_default().push(record);
    }

    let my_address = my_address.to_lowercase();
    let mut transactions = Vec::new();
    for hash in order {
        let rows = &groups[&hash];
        convert_hash(&hash, rows, &my_address, rates, &mut transactions)?;
    }
    Ok(transactions)
}

fn convert_hash(
    hash: &str,
    rows: &[Record],
    my_address: &str,
    rates: &mut dyn RateSource,
    out: &mut Vec<Transaction>,
) -> anyhow::Result<()> {
    let first = rows
        .first()
        .ok_or_else(|| anyhow!("empty row group for {}", hash))?;
    let date = super::parse_log_date(&first.date_time)?;
    let short_hash = &hash[..hash.len().min(16)];

    // Net flow per token for this wallet: positive means tokens received.
    let mut net: HashMap<String, Decimal> = HashMap::new();
    let mut usd_in: HashMap<String, Decimal> = HashMap::new();
    for row in rows {
        let symbol = normalize_symbol(&row.symbol).to_string();
        let quantity = parse_amount(&row.token_value)?;
        let usd = parse_usd(&row.usd_value)?;

        if row.to.eq_ignore_ascii_case(my_address) {
            *net.entry(symbol.clone()).or_default() += quantity;
            if let Some(usd) = usd {
                *usd_in.entry(symbol.clone()).or_default() += usd;
            }
        }
        if row.from.eq_ignore_ascii_case(my_address) {
            *net.entry(symbol).or_default() -= quantity;
        }
    }

    let mut incoming: Vec<(String, Decimal)> = Vec::new();
    let mut outgoing: Vec<(String, Decimal)> = Vec::new();
    for (symbol, amount) in net {
        if amount.abs() <= DUST {
            continue;
        }
        if amount > Decimal::ZERO {
            incoming.push((symbol, amount));
        } else {
            outgoing.push((symbol, -amount));
        }
    }
    incoming.sort();
    outgoing.sort();

    if incoming.is_empty() || outgoing.is_empty() {
        log::info!(
            "tx {}... ({}) is not a swap, skipping (in: {}, out: {})",
            short_hash,
            date,
            incoming.len(),
            outgoing.len()
        );
        return Ok(());
    }

    // Value the whole swap from the incoming side, where market prices are
    // known.
    let mut swap_sek = Decimal::ZERO;
    for (symbol, quantity) in &incoming {
        let usd = usd_in.get(symbol).copied().unwrap_or_default();
        swap_sek += token_sek(rates, date, symbol, usd, *quantity)?;
    }

    let tx = |kind, quantity: Decimal, symbol: &str, amount| Transaction {
        date,
        venue: VENUE.to_string(),
        kind,
        quantity: quantity.round_dp(8),
        symbol: symbol.to_string(),
        amount,
    };

    // Sells first so the buy side can be matched against realized value;
    // the swap value goes on the first sell row only, then on every buy.
    for (i, (symbol, quantity)) in outgoing.iter().enumerate() {
        let amount = if i == 0 { swap_sek } else { Decimal::ZERO };
        out.push(tx(TxKind::Sell, -quantity, symbol, amount));
    }
    for (symbol, quantity) in &incoming {
        out.push(tx(TxKind::Buy, *quantity, symbol, swap_sek));
    }
    Ok(())
}
