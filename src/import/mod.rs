//! Vendor log normalizers. Each importer consumes one exchange/wallet
//! export format and produces canonical transactions, converting foreign
//! amounts to SEK through an injected [`RateSource`].

pub mod cryptocom;
pub mod gnosis;
pub mod nexo;

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::prices::RateSource;

/// Parse a token amount that may carry thousands separators ("1,234.5").
pub fn parse_amount(s: &str) -> anyhow::Result<Decimal> {
    let cleaned = s.replace(',', "");
    cleaned
        .parse()
        .with_context(|| format!("invalid amount '{}'", s))
}

/// Parse a USD amount ("$1.34", "1,234.00" or "N/A"). `None` when the
/// export has no value for the row.
pub fn parse_usd(s: &str) -> anyhow::Result<Option<Decimal>> {
    let s = s.trim();
    if s.is_empty() || s == "N/A" {
        return Ok(None);
    }
    parse_amount(s.trim_start_matches('$')).map(Some)
}

/// Day's SEK value of a USD amount.
pub fn usd_to_sek(
    rates: &mut dyn RateSource,
    date: NaiveDate,
    usd: Decimal,
) -> anyhow::Result<Decimal> {
    Ok(usd * rates.fiat_sek(date, "usd")?)
}

/// Date part of a "YYYY-MM-DD hh:mm:ss" vendor timestamp.
pub fn parse_log_date(date_time: &str) -> anyhow::Result<NaiveDate> {
    let date = date_time
        .split_whitespace()
        .next()
        .ok_or_else(|| anyhow!("empty timestamp"))?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("invalid timestamp '{}'", date_time))
}
