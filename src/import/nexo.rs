//! Nexo transaction log.
//!
//! Nexo is modeled as a lending platform: moving coins onto the platform is
//! a realization (a swap into a synthetic `nexoXXX` claim asset) and moving
//! them off swaps back. Term-deposit locking is internal and ignored.
//! Interest and dividends become interest events; cashback is a tax-free
//! gift. All rows are valued from the log's USD equivalent.

use anyhow::bail;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

use super::{parse_log_date, parse_usd, usd_to_sek};
use crate::core::{Transaction, TxKind};
use crate::prices::RateSource;

const IGNORE: &[&str] = &[
    "Locking Term Deposit",
    "Unlocking Term Deposit",
    "Exchange Deposited On",
];

/// Tax-free gifts, like card cashback.
const GIFT: &[&str] = &["Exchange Cashback"];

const INTEREST: &[&str] = &["Interest", "Fixed Term Interest", "Dividend"];

/// Coins moving onto the platform (swap into the nexo claim).
const LEND: &[&str] = &["Deposit", "Top up Crypto", "Transfer From Pro Wallet"];

/// Coins moving off the platform (swap out of the nexo claim).
const RECLAIM: &[&str] = &["Withdrawal", "Transfer To Pro Wallet"];

#[derive(Debug, Clone, Deserialize)]
struct Record {
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Input Currency")]
    input_currency: String,
    #[serde(rename = "Input Amount")]
    input_amount: Decimal,
    #[serde(rename = "Output Currency")]
    output_currency: String,
    #[serde(rename = "Output Amount")]
    output_amount: Option<Decimal>,
    #[serde(rename = "USD Equivalent")]
    usd_equivalent: String,
    #[serde(rename = "Date / Time")]
    date_time: String,
}

fn normalize_symbol(symbol: &str) -> &str {
    // Nexo's own token shows up double-prefixed in exports.
    if symbol == "NEXONEXO" {
        "NEXO"
    } else {
        symbol
    }
}

fn nexo_symbol(symbol: &str) -> String {
    format!("nexo{}", symbol)
}

/// Normalize a Nexo export. The log is newest-first; output is
/// chronological.
pub fn import<R: Read>(
    reader: R,
    rates: &mut dyn RateSource,
) -> anyhow::Result<Vec<Transaction>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let records = rdr.deserialize::<Record>().collect::<csv::Result<Vec<_>>>()?;
    log::info!("read {} nexo records", records.len());

    let mut transactions = Vec::new();
    for record in records.into_iter().rev() {
        convert(record, rates, &mut transactions)?;
    }
    Ok(transactions)
}

fn convert(
    record: Record,
    rates: &mut dyn RateSource,
    out: &mut Vec<Transaction>,
) -> anyhow::Result<()> {
    let kind = record.kind.as_str();
    if IGNORE.contains(&kind) {
        return Ok(());
    }
    let date = parse_log_date(&record.date_time)?;
    let usd = match parse_usd(&record.usd_equivalent)? {
        Some(usd) => usd,
        None => bail!("nexo row '{}' on {} has no USD equivalent", kind, date),
    };
    let sek = usd_to_sek(rates, date, usd)?;
    let symbol = normalize_symbol(&record.input_currency).to_string();
    let quantity = record.input_amount;

    let tx = |tx_kind, quantity, symbol: String, amount| Transaction {
        date,
        venue: record.kind.clone(),
        kind: tx_kind,
        quantity,
        symbol,
        amount,
    };

    if GIFT.contains(&kind) {
        out.push(tx(TxKind::Buy, quantity, nexo_symbol(&symbol), sek));
    } else if INTEREST.contains(&kind) {
        out.push(tx(TxKind::Interest, quantity, nexo_symbol(&symbol), sek));
    } else if LEND.contains(&kind) {
        // Deposit logs the real coin arriving; realize it and acquire the
        // platform claim at the same value.
        out.push(tx(TxKind::Sell, -quantity, symbol.clone(), sek));
        out.push(tx(TxKind::Buy, quantity, nexo_symbol(&symbol), sek));
    } else if RECLAIM.contains(&kind) {
        // Withdrawal logs a negative amount on the real coin.
        out.push(tx(TxKind::Sell, quantity, nexo_symbol(&symbol), sek));
        out.push(tx(TxKind::Buy, -quantity, symbol, sek));
    } else if kind == "Deposit To Exchange" {
        // Fiat buying crypto on the platform.
        let output_symbol = normalize_symbol(&record.output_currency).to_string();
        let output_amount = record.output_amount.unwrap_or_default();
        out.push(tx(TxKind::Buy, output_amount, nexo_symbol(&output_symbol), sek));
    } else if kind == "Exchange" {
        let output_symbol = normalize_symbol(&record.output_currency).to_string();
        let output_amount = record.output_amount.unwrap_or_default();
        out.push(tx(TxKind::Sell, quantity, nexo_symbol(&symbol), sek));
        out.push(tx(TxKind::Buy, output_amount, nexo_symbol(&output_symbol), sek));
    } else {
        bail!("unknown nexo transaction type '{}'", kind);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::testutil::FixedRates;
    use rust_decimal_macros::dec;

    const HEADER: &str = "Transaction,Type,Input Currency,Input Amount,Output Currency,Output Amount,USD Equivalent,Details,Date / Time\n";

    fn import_rows(rows: &str) -> Vec<Transaction> {
        let csv = format!("{HEADER}{rows}");
        import(csv.as_bytes(), &mut FixedRates).unwrap()
    }

    #[test]
    fn interest_lands_on_the_nexo_claim_symbol() {
        let txs = import_rows(
            "NXTII1,Interest,NEXONEXO,0.17381980,,,$0.38,approved,2022-02-08 07:00:06\n",
        );
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].kind, TxKind::Interest);
        assert_eq!(txs[0].symbol, "nexoNEXO");
        assert_eq!(txs[0].amount, dec!(3.80));
    }

    #[test]
    fn deposit_realizes_and_acquires_the_claim() {
        let txs = import_rows("NXT1,Deposit,AVAX,4.0,,,$64.00,approved,2022-01-29 07:01:17\n");
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].kind, TxKind::Sell);
        assert_eq!(txs[0].symbol, "AVAX");
        assert_eq!(txs[0].quantity, dec!(-4.0));
        assert_eq!(txs[1].kind, TxKind::Buy);
        assert_eq!(txs[1].symbol, "nexoAVAX");
        assert_eq!(txs[1].quantity, dec!(4.0));
        assert_eq!(txs[0].amount, dec!(640.00));
        assert_eq!(txs[1].amount, dec!(640.00));
    }

    #[test]
    fn withdrawal_swaps_back_to_the_real_coin() {
        let txs = import_rows("NXT2,Withdrawal,AVAX,-4.0,,,$64.00,approved,2022-03-01 08:00:00\n");
        assert_eq!(txs[0].kind, TxKind::Sell);
        assert_eq!(txs[0].symbol, "nexoAVAX");
        assert_eq!(txs[0].quantity, dec!(-4.0));
        assert_eq!(txs[1].kind, TxKind::Buy);
        assert_eq!(txs[1].symbol, "AVAX");
        assert_eq!(txs[1].quantity, dec!(4.0));
    }

    #[test]
    fn term_deposit_moves_are_ignored() {
        let txs = import_rows(
            "NXT3,Unlocking Term Deposit,AVAX,4.04,,,$63.63,approved,2022-01-29 07:01:17\n\
             NXT4,Locking Term Deposit,AVAX,-4.04,,,$516.42,approved,2021-12-29 08:39:33\n",
        );
        assert!(txs.is_empty());
    }

    #[test]
    fn exchange_swaps_between_claim_symbols() {
        let txs = import_rows(
            "NXT5,Exchange,BTC,-0.01,ETH,0.15,$300.00,approved,2022-02-01 12:00:00\n",
        );
        assert_eq!(txs[0].kind, TxKind::Sell);
        assert_eq!(txs[0].symbol, "nexoBTC");
        assert_eq!(txs[0].quantity, dec!(-0.01));
        assert_eq!(txs[1].kind, TxKind::Buy);
        assert_eq!(txs[1].symbol, "nexoETH");
        assert_eq!(txs[1].quantity, dec!(0.15));
    }

    #[test]
    fn unknown_type_is_an_error() {
        let csv =
            format!("{HEADER}NXT6,Mystery,BTC,1.0,,,$1.00,approved,2022-02-01 12:00:00\n");
        assert!(import(csv.as_bytes(), &mut FixedRates).is_err());
    }
}
