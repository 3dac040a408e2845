use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fmt;

/// Sign-convention anomalies surfaced during a run. Non-fatal: the data is
/// processed as given.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// A buy with negative quantity (some logs use this for corrections).
    NegativeBuyQuantity {
        symbol: String,
        date: NaiveDate,
        quantity: Decimal,
    },
    /// A sell with positive quantity; sell quantities must be negative.
    PositiveSellQuantity {
        symbol: String,
        date: NaiveDate,
        quantity: Decimal,
    },
    /// Interest with a negative quantity or amount.
    NegativeInterest { symbol: String, date: NaiveDate },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::NegativeBuyQuantity {
                symbol,
                date,
                quantity,
            } => write!(f, "{} {}: buy with negative quantity {}", date, symbol, quantity),
            Warning::PositiveSellQuantity {
                symbol,
                date,
                quantity,
            } => write!(
                f,
                "{} {}: sell with positive quantity {} (sell quantities must be negative)",
                date, symbol, quantity
            ),
            Warning::NegativeInterest { symbol, date } => write!(
                f,
                "{} {}: interest with negative quantity or amount (both should be positive)",
                date, symbol
            ),
        }
    }
}
