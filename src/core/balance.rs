use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Holdings-and-basis snapshot at the start of the period. One per asset;
/// seeds the account state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningBalance {
    pub display_name: String,
    pub symbol: String,
    pub quantity: Decimal,
    pub avg_cost: Decimal,
}

/// Snapshot at the end of the period, derived from final account state.
/// Serves as the next period's opening balances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosingBalance {
    pub display_name: String,
    pub symbol: String,
    pub quantity: Decimal,
    pub avg_cost: Decimal,
    pub cost_basis: Decimal,
}

/// Sort for the closing-balance table: largest holdings (by total cost
/// basis) first, ties by display name.
pub fn sort_closing(balances: &mut [ClosingBalance]) {
    balances.sort_by(|a, b| {
        b.cost_basis
            .cmp(&a.cost_basis)
            .then_with(|| a.display_name.cmp(&b.display_name))
    });
}

pub fn read_csv<R: Read>(reader: R) -> csv::Result<Vec<OpeningBalance>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let balances = rdr.deserialize().collect::<csv::Result<Vec<_>>>()?;
    log::info!("read {} opening balances", balances.len());
    Ok(balances)
}

pub fn write_csv<W: Write>(balances: &[ClosingBalance], writer: W) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for balance in balances {
        wtr.serialize(balance)?;
    }
    wtr.flush()?;
    Ok(())
}
