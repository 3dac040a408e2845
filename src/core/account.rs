use rust_decimal::Decimal;

use super::balance::{ClosingBalance, OpeningBalance};
use super::engine::EngineError;
use super::transaction::{Transaction, TxKind};
use super::warnings::Warning;

/// Which declaration bucket a realized result lands in. Decided per sell
/// from the sign of that sell's own result, so one asset can fill both
/// buckets over its history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketKind {
    Gain,
    Loss,
}

/// Declaration accumulator: the four figures the declaration form asks for,
/// kept separately for gains and losses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bucket {
    /// Units disposed of (negative, matching sell quantities).
    pub units_sold: Decimal,
    pub proceeds: Decimal,
    pub cost_basis: Decimal,
    pub net: Decimal,
}

impl Bucket {
    fn record(&mut self, quantity: Decimal, proceeds: Decimal, cost: Decimal, net: Decimal) {
        self.units_sold += quantity;
        self.proceeds += proceeds;
        self.cost_basis += cost;
        self.net += net;
    }
}

/// Outcome of applying one transaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// Acquisition: basis updated, nothing realized.
    None,
    /// Sell: basis consumed at the pre-sale average cost.
    Realized {
        cost_of_sold: Decimal,
        net: Decimal,
        bucket: BucketKind,
    },
    /// Interest income, also added to the basis like a buy.
    Interest { amount: Decimal },
}

/// Holding and running average cost basis for one asset, plus its
/// declaration accumulators. Owned exclusively by the engine run; replays
/// the asset's transactions in date order, one at a time.
#[derive(Debug, Clone)]
pub struct Account {
    pub display_name: String,
    pub symbol: String,
    pub quantity: Decimal,
    /// Average acquisition cost per unit ("genomsnittligt omkostnadsbelopp").
    pub avg_cost: Decimal,
    /// Invariant: quantity * avg_cost, recomputed on every mutation.
    pub total_cost: Decimal,
    pub gain: Bucket,
    pub loss: Bucket,
    pub interest: Decimal,
}

impl Account {
    pub fn open(balance: &OpeningBalance) -> Self {
        Account {
            display_name: balance.display_name.clone(),
            symbol: balance.symbol.clone(),
            quantity: balance.quantity,
            avg_cost: balance.avg_cost,
            total_cost: balance.quantity * balance.avg_cost,
            gain: Bucket::default(),
            loss: Bucket::default(),
            interest: Decimal::ZERO,
        }
    }

    /// Apply one transaction. Sign anomalies are pushed to `warnings` and
    /// the data is processed as given; a sell past zero or an acquisition
    /// that leaves no holding is fatal.
    pub fn apply(
        &mut self,
        tx: &Transaction,
        warnings: &mut Vec<Warning>,
    ) -> Result<Effect, EngineError> {
        match tx.kind {
            TxKind::Buy => {
                if tx.quantity < Decimal::ZERO {
                    warnings.push(Warning::NegativeBuyQuantity {
                        symbol: self.symbol.clone(),
                        date: tx.date,
                        quantity: tx.quantity,
                    });
                }
                self.acquire(tx)?;
                Ok(Effect::None)
            }
            TxKind::Sell => {
                if tx.quantity > Decimal::ZERO {
                    warnings.push(Warning::PositiveSellQuantity {
                        symbol: self.symbol.clone(),
                        date: tx.date,
                        quantity: tx.quantity,
                    });
                }
                self.quantity += tx.quantity;
                if self.quantity < Decimal::ZERO {
                    return Err(EngineError::NegativeHolding {
                        symbol: self.symbol.clone(),
                        date: tx.date,
                        quantity: self.quantity,
                    });
                }
                // Basis consumed at the pre-sale average cost; a sell never
                // changes avg_cost, only quantity.
                let cost_of_sold = -tx.quantity * self.avg_cost;
                let net = tx.amount - cost_of_sold;
                self.total_cost = self.quantity * self.avg_cost;
                let bucket = if net >= Decimal::ZERO {
                    self.gain.record(tx.quantity, tx.amount, cost_of_sold, net);
                    BucketKind::Gain
                } else {
                    self.loss.record(tx.quantity, tx.amount, cost_of_sold, net);
                    BucketKind::Loss
                };
                if self.quantity.is_zero() {
                    // Pin an emptied position to exactly zero so no residue
                    // carries into the next acquisition.
                    self.total_cost = Decimal::ZERO;
                    self.avg_cost = Decimal::ZERO;
                }
                Ok(Effect::Realized {
                    cost_of_sold,
                    net,
                    bucket,
                })
            }
            TxKind::Interest => {
                if tx.quantity < Decimal::ZERO || tx.amount < Decimal::ZERO {
                    warnings.push(Warning::NegativeInterest {
                        symbol: self.symbol.clone(),
                        date: tx.date,
                    });
                }
                // The full amount is interest income, and the same amount
                // enters the basis as if it were a buy. One event, two
                // recorded effects.
                self.interest += tx.amount;
                self.acquire(tx)?;
                Ok(Effect::Interest { amount: tx.amount })
            }
        }
    }

    fn acquire(&mut self, tx: &Transaction) -> Result<(), EngineError> {
        self.total_cost += tx.amount;
        self.quantity += tx.quantity;
        if self.quantity <= Decimal::ZERO {
            return Err(EngineError::ZeroQuantityAcquisition {
                symbol: self.symbol.clone(),
                date: tx.date,
            });
        }
        self.avg_cost = self.total_cost / self.quantity;
        Ok(())
    }

    pub fn closing_balance(&self) -> ClosingBalance {
        ClosingBalance {
            display_name: self.display_name.clone(),
            symbol: self.symbol.clone(),
            quantity: self.quantity,
            avg_cost: self.avg_cost,
            cost_basis: self.quantity * self.avg_cost,
        }
    }
}
