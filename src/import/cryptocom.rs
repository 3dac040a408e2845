//! crypto.com app transaction log.
//!
//! Each row has a `Transaction Kind` column that decides its tax treatment:
//! transfers in/out are ignored, cashbacks and referral bonuses are treated
//! as tax-free gifts (a buy at the day's market value), earn payouts are
//! interest, and the rest are buys/sells/swaps. Lending to the earn program
//! is modeled as a swap into a synthetic `cryptoXXX` asset so the loaned
//! position keeps its own basis.

use anyhow::bail;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

use super::{parse_log_date, usd_to_sek};
use crate::core::{Transaction, TxKind};
use crate::prices::RateSource;

const IGNORE: &[&str] = &[
    "crypto_deposit",
    "crypto_to_exchange_transfer",
    "exchange_to_crypto_transfer",
    "crypto_transfer",
    "crypto_withdrawal",
    "dust_conversion_credited",
    "dust_conversion_debited",
    "lockup_upgrade",
];

/// Tax-free gifts: cashback, referral bonuses and the like.
const GIFT: &[&str] = &[
    "card_cashback_reverted",
    "referral_bonus",
    "referral_card_cashback",
    "reimbursement",
    "reimbursement_reverted",
    "rewards_platform_deposit_credited",
];

const INTEREST: &[&str] = &["crypto_earn_interest_paid", "mco_stake_reward"];

#[derive(Debug, Clone, Deserialize)]
struct Record {
    #[serde(rename = "Timestamp (UTC)")]
    timestamp: String,
    #[serde(rename = "Transaction Description")]
    description: String,
    #[serde(rename = "Currency")]
    currency: String,
    #[serde(rename = "Amount")]
    amount: Decimal,
    #[serde(rename = "To Currency")]
    to_currency: String,
    #[serde(rename = "To Amount")]
    to_amount: Option<Decimal>,
    #[serde(rename = "Native Amount (in USD)")]
    usd_amount: Decimal,
    #[serde(rename = "Transaction Kind")]
    kind: String,
}

/// Normalize a crypto.com export. The log is newest-first; output is
/// chronological.
pub fn import<R: Read>(
    reader: R,
    rates: &mut dyn RateSource,
) -> anyhow::Result<Vec<Transaction>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let records = rdr.deserialize::<Record>().collect::<csv::Result<Vec<_>>>()?;
    log::info!("read {} crypto.com records", records.len());

    let mut transactions = Vec::new();
    for record in records.into_iter().rev() {
        convert(record, rates, &mut transactions)?;
    }
    Ok(transactions)
}

fn convert(
    mut record: Record,
    rates: &mut dyn RateSource,
    out: &mut Vec<Transaction>,
) -> anyhow::Result<()> {
    let kind = record.kind.as_str();
    if IGNORE.contains(&kind) {
        return Ok(());
    }
    let date = parse_log_date(&record.timestamp)?;
    let sek = usd_to_sek(rates, date, record.usd_amount)?;
    let venue = record.description.clone();

    let tx = |kind, quantity, symbol: &str, amount| Transaction {
        date,
        venue: venue.clone(),
        kind,
        quantity,
        symbol: symbol.to_string(),
        amount,
    };

    if GIFT.contains(&kind) {
        // A gift acquired at the day's value. A negative quantity here is a
        // reversal of an earlier cashback; buys must not be negative, so it
        // goes out as a sell (the amounts are negligible).
        if record.amount >= Decimal::ZERO {
            out.push(tx(TxKind::Buy, record.amount, &record.currency, sek));
        } else {
            out.push(tx(TxKind::Sell, record.amount, &record.currency, sek));
        }
        return Ok(());
    }
    if INTEREST.contains(&kind) {
        out.push(tx(TxKind::Interest, record.amount, &record.currency, sek));
        return Ok(());
    }

    // Lending to/from the earn program becomes a swap against a synthetic
    // symbol, then falls through to the plain swap case.
    let kind = match kind {
        "crypto_earn_program_created" => {
            record.to_currency = format!("crypto{}", record.currency);
            record.to_amount = Some(-record.amount);
            "crypto_exchange"
        }
        "crypto_earn_program_withdrawn" => {
            record.to_currency = record.currency.clone();
            record.to_amount = Some(record.amount);
            record.currency = format!("crypto{}", record.to_currency);
            record.amount = -record.amount;
            "crypto_exchange"
        }
        other => other,
    };

    match kind {
        "crypto_exchange" => {
            let to_amount = record.to_amount.unwrap_or_default();
            out.push(tx(TxKind::Sell, record.amount, &record.currency, sek));
            out.push(tx(TxKind::Buy, to_amount, &record.to_currency, sek));
        }
        "viban_purchase" | "recurring_buy_order" => {
            let to_amount = record.to_amount.unwrap_or_default();
            out.push(tx(TxKind::Buy, to_amount, &record.to_currency, sek));
        }
        "crypto_payment_refund" | "nft_payout_credited" => {
            out.push(tx(TxKind::Buy, record.amount, &record.currency, sek));
        }
        "crypto_viban_exchange" | "crypto_payment" => {
            out.push(tx(TxKind::Sell, record.amount, &record.currency, sek));
        }
        // The log stores top-up proceeds negative; flip them.
        "card_top_up" => {
            out.push(tx(TxKind::Sell, record.amount, &record.currency, -sek));
        }
        other => bail!("unknown crypto.com transaction kind '{}'", other),
    }
    Ok(())
}
