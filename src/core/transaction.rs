use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::str::FromStr;
use thiserror::Error;

/// What a transaction does to a holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Buy,
    Sell,
    /// Interest paid out in kind. Counts as income for the full SEK amount
    /// and as an acquisition for cost basis purposes.
    Interest,
}

impl FromStr for TxKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(TxKind::Buy),
            "sell" => Ok(TxKind::Sell),
            "interest" => Ok(TxKind::Interest),
            _ => Err(()),
        }
    }
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Buy => "buy",
            TxKind::Sell => "sell",
            TxKind::Interest => "interest",
        }
    }
}

/// One normalized event. Produced by an importer (or a hand-maintained
/// sheet), consumed read-only by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub venue: String,
    pub kind: TxKind,
    pub quantity: Decimal,
    pub symbol: String,
    pub amount: Decimal,
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("row {row}: unknown transaction kind '{kind}' (expected buy, sell or interest)")]
    UnknownKind { row: usize, kind: String },
    #[error("row {row}: no date and no previous row to inherit one from")]
    MissingDate { row: usize },
    #[error("row {row}: invalid date '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { row: usize, value: String },
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Raw CSV row. Date and venue may be blank: a swap pair is written as a
/// sell row followed by a buy row that inherits both from the sell.
#[derive(Debug, Deserialize)]
struct Record {
    date: String,
    venue: String,
    kind: String,
    quantity: Decimal,
    symbol: String,
    amount: Decimal,
}

/// Milli-denominated bookkeeping for the large-unit coins.
const MILLI_UNITS: &[(&str, &str)] = &[("BTC", "mBTC"), ("ETH", "mETH")];

fn normalize_units(symbol: &mut String, quantity: &mut Decimal) {
    for (unit, milli) in MILLI_UNITS {
        if symbol == unit {
            *symbol = (*milli).to_string();
            *quantity *= dec!(1000);
        }
    }
}

/// Read canonical transactions from CSV
/// (`date,venue,kind,quantity,symbol,amount`).
///
/// Blank date/venue fields inherit the previous row's values, and BTC/ETH
/// are rescaled to their milli units.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Transaction>, ReadError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut transactions = Vec::new();
    let mut prev_date: Option<NaiveDate> = None;
    let mut prev_venue = String::new();

    for (i, result) in rdr.deserialize::<Record>().enumerate() {
        let row = i + 2; // header is row 1
        let record = result?;

        let date = if record.date.trim().is_empty() {
            prev_date.ok_or(ReadError::MissingDate { row })?
        } else {
            NaiveDate::parse_from_str(record.date.trim(), "%Y-%m-%d").map_err(|_| {
                ReadError::InvalidDate {
                    row,
                    value: record.date.clone(),
                }
            })?
        };
        let venue = if record.venue.trim().is_empty() {
            prev_venue.clone()
        } else {
            record.venue.trim().to_string()
        };
        let kind = record.kind.parse().map_err(|()| ReadError::UnknownKind {
            row,
            kind: record.kind.clone(),
        })?;

        prev_date = Some(date);
        prev_venue = venue.clone();

        let mut symbol = record.symbol.trim().to_string();
        let mut quantity = record.quantity;
        normalize_units(&mut symbol, &mut quantity);

        transactions.push(Transaction {
            date,
            venue,
            kind,
            quantity,
            symbol,
            amount: record.amount,
        });
    }
    log::info!("read {} transactions", transactions.len());
    Ok(transactions)
}

pub fn write_csv<W: Write>(transactions: &[Transaction], writer: W) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for tx in transactions {
        wtr.serialize(tx)?;
    }
    wtr.flush()?;
    Ok(())
}
