use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

use super::account::{Account, Effect};
use super::balance::{self, ClosingBalance, OpeningBalance};
use super::tax::TaxPolicy;
use super::transaction::Transaction;
use super::warnings::Warning;

/// Fatal conditions. Any of these aborts the whole run before output is
/// written; a partially processed ledger must never be published.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no opening balance for: {}", .0.join(", "))]
    MissingOpeningBalance(Vec<String>),
    #[error("{date} {symbol}: sell drives holding negative ({quantity})")]
    NegativeHolding {
        symbol: String,
        date: NaiveDate,
        quantity: Decimal,
    },
    #[error("{date} {symbol}: acquisition leaves no holding, average cost undefined")]
    ZeroQuantityAcquisition { symbol: String, date: NaiveDate },
}

/// One transaction plus the account state and realized result right after it.
#[derive(Debug, Clone)]
pub struct LedgerRow {
    pub tx: Transaction,
    pub holding: Decimal,
    pub avg_cost: Decimal,
    pub effect: Effect,
}

/// Everything to report for one asset: the seed, the replayed ledger and
/// the final account (holding, basis, declaration buckets).
#[derive(Debug, Clone)]
pub struct AssetReport {
    pub opening: OpeningBalance,
    pub account: Account,
    pub rows: Vec<LedgerRow>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Totals {
    pub gain: Decimal,
    pub loss: Decimal,
    pub interest: Decimal,
}

#[derive(Debug, Clone)]
pub struct Report {
    /// Per-asset reports in opening-balance order, assets with no
    /// transactions omitted.
    pub assets: Vec<AssetReport>,
    pub totals: Totals,
    pub tax: Decimal,
    /// All opening-balance assets, transacted or not, sorted for display.
    pub closing: Vec<ClosingBalance>,
    pub warnings: Vec<Warning>,
}

/// Group transactions by asset symbol, each group stable-sorted by date so
/// same-date pairs (a swap's sell then buy) keep their input order. Fails if
/// any transacted symbol has no opening balance.
pub fn group_by_symbol(
    balances: &[OpeningBalance],
    transactions: Vec<Transaction>,
) -> Result<HashMap<String, Vec<Transaction>>, EngineError> {
    let mut groups: HashMap<String, Vec<Transaction>> = HashMap::new();
    for tx in transactions {
        groups.entry(tx.symbol.clone()).or_default().push(tx);
    }
    for group in groups.values_mut() {
        group.sort_by_key(|tx| tx.date);
    }

    let known: BTreeSet<&str> = balances.iter().map(|b| b.symbol.as_str()).collect();
    let missing: Vec<String> = groups
        .keys()
        .filter(|symbol| !known.contains(symbol.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        let mut missing = missing;
        missing.sort();
        return Err(EngineError::MissingOpeningBalance(missing));
    }
    Ok(groups)
}

/// Replay every asset's transaction history against its opening balance.
/// Pure with respect to its inputs: the same balances and transactions
/// always produce the same report.
pub fn run(
    balances: &[OpeningBalance],
    transactions: Vec<Transaction>,
    policy: &TaxPolicy,
) -> Result<Report, EngineError> {
    let mut groups = group_by_symbol(balances, transactions)?;

    let mut assets = Vec::new();
    let mut closing = Vec::new();
    let mut totals = Totals::default();
    let mut warnings = Vec::new();

    // Opening-balance order drives the report; it is a superset of the
    // transacted symbols.
    for opening in balances {
        let mut account = Account::open(opening);
        if let Some(group) = groups.remove(&opening.symbol) {
            let mut rows = Vec::with_capacity(group.len());
            for tx in group {
                let effect = account.apply(&tx, &mut warnings)?;
                match effect {
                    Effect::Realized { net, .. } => {
                        if net >= Decimal::ZERO {
                            totals.gain += net;
                        } else {
                            totals.loss += net;
                        }
                    }
                    Effect::Interest { amount } => totals.interest += amount,
                    Effect::None => {}
                }
                rows.push(LedgerRow {
                    tx,
                    holding: account.quantity,
                    avg_cost: account.avg_cost,
                    effect,
                });
            }
            closing.push(account.closing_balance());
            assets.push(AssetReport {
                opening: opening.clone(),
                account,
                rows,
            });
        } else {
            closing.push(account.closing_balance());
        }
    }

    for warning in &warnings {
        log::warn!("{}", warning);
    }

    balance::sort_closing(&mut closing);
    let tax = policy.tax(totals.gain, totals.loss, totals.interest);
    Ok(Report {
        assets,
        totals,
        tax,
        closing,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::TxKind;
    use rust_decimal_macros::dec;

    fn opening(name: &str, symbol: &str, quantity: Decimal, avg_cost: Decimal) -> OpeningBalance {
        OpeningBalance {
            display_name: name.to_string(),
            symbol: symbol.to_string(),
            quantity,
            avg_cost,
        }
    }

    fn tx(date: &str, kind: TxKind, quantity: Decimal, symbol: &str, amount: Decimal) -> Transaction {
        Transaction {
            date: date.parse().unwrap(),
            venue: "test".to_string(),
            kind,
            quantity,
            symbol: symbol.to_string(),
            amount,
        }
    }

    #[test]
    fn missing_opening_balance_names_every_missing_symbol() {
        let balances = vec![opening("Cardano", "ADA", dec!(0), dec!(0))];
        let transactions = vec![
            tx("2022-01-01", TxKind::Buy, dec!(1), "DOT", dec!(100)),
            tx("2022-01-02", TxKind::Buy, dec!(1), "ADA", dec!(10)),
            tx("2022-01-03", TxKind::Buy, dec!(1), "ATOM", dec!(50)),
        ];
        let err = group_by_symbol(&balances, transactions).unwrap_err();
        match err {
            EngineError::MissingOpeningBalance(symbols) => {
                assert_eq!(symbols, vec!["ATOM".to_string(), "DOT".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn same_date_transactions_keep_input_order() {
        let balances = vec![opening("Cardano", "ADA", dec!(10), dec!(5))];
        let transactions = vec![
            tx("2022-01-05", TxKind::Sell, dec!(-10), "ADA", dec!(80)),
            tx("2022-01-05", TxKind::Buy, dec!(20), "ADA", dec!(80)),
        ];
        let groups = group_by_symbol(&balances, transactions).unwrap();
        let group = &groups["ADA"];
        assert_eq!(group[0].kind, TxKind::Sell);
        assert_eq!(group[1].kind, TxKind::Buy);
    }

    #[test]
    fn transactions_are_sorted_by_date_within_an_asset() {
        let balances = vec![opening("Cardano", "ADA", dec!(0), dec!(0))];
        let transactions = vec![
            tx("2022-03-01", TxKind::Sell, dec!(-1), "ADA", dec!(20)),
            tx("2022-01-01", TxKind::Buy, dec!(2), "ADA", dec!(10)),
        ];
        let report = run(&balances, transactions, &TaxPolicy::default()).unwrap();
        assert_eq!(report.assets[0].rows[0].tx.kind, TxKind::Buy);
        assert_eq!(report.assets[0].account.quantity, dec!(1));
    }

    #[test]
    fn totals_and_tax_reconcile_across_assets() {
        let balances = vec![
            opening("Cardano", "ADA", dec!(10), dec!(10)),
            opening("Polkadot", "DOT", dec!(10), dec!(100)),
        ];
        let transactions = vec![
            tx("2022-01-01", TxKind::Sell, dec!(-5), "ADA", dec!(100)), // +50
            tx("2022-02-01", TxKind::Sell, dec!(-5), "DOT", dec!(400)), // -100
            tx("2022-03-01", TxKind::Interest, dec!(1), "ADA", dec!(30)),
        ];
        let report = run(&balances, transactions, &TaxPolicy::default()).unwrap();
        assert_eq!(report.totals.gain, dec!(50));
        assert_eq!(report.totals.loss, dec!(-100));
        assert_eq!(report.totals.interest, dec!(30));
        // (50 + 30 - 70) * 0.3
        assert_eq!(report.tax, dec!(3.000));
    }

    #[test]
    fn untransacted_assets_still_appear_in_closing_balances() {
        let balances = vec![
            opening("Cardano", "ADA", dec!(10), dec!(10)),
            opening("Litecoin", "LTC", dec!(3), dec!(500)),
        ];
        let transactions = vec![tx("2022-01-01", TxKind::Sell, dec!(-10), "ADA", dec!(50))];
        let report = run(&balances, transactions, &TaxPolicy::default()).unwrap();
        assert_eq!(report.assets.len(), 1);
        assert_eq!(report.closing.len(), 2);
        let ltc = report.closing.iter().find(|c| c.symbol == "LTC").unwrap();
        assert_eq!(ltc.quantity, dec!(3));
        assert_eq!(ltc.cost_basis, dec!(1500));
    }

    #[test]
    fn closing_balances_sorted_by_descending_cost_basis() {
        let balances = vec![
            opening("Cardano", "ADA", dec!(10), dec!(1)),
            opening("Polkadot", "DOT", dec!(10), dec!(100)),
        ];
        let report = run(&balances, Vec::new(), &TaxPolicy::default()).unwrap();
        assert_eq!(report.closing[0].symbol, "DOT");
        assert_eq!(report.closing[1].symbol, "ADA");
    }

    #[test]
    fn rerunning_the_same_inputs_is_idempotent() {
        let balances = vec![opening("Cardano", "ADA", dec!(10), dec!(10))];
        let transactions = vec![
            tx("2022-01-01", TxKind::Sell, dec!(-4), "ADA", dec!(60)),
            tx("2022-02-01", TxKind::Buy, dec!(2), "ADA", dec!(50)),
        ];
        let policy = TaxPolicy::default();
        let first = run(&balances, transactions.clone(), &policy).unwrap();
        let second = run(&balances, transactions, &policy).unwrap();
        assert_eq!(first.totals, second.totals);
        assert_eq!(first.tax, second.tax);
        assert_eq!(first.closing, second.closing);
    }

    #[test]
    fn fatal_error_produces_no_report() {
        let balances = vec![opening("Cardano", "ADA", dec!(1), dec!(10))];
        let transactions = vec![tx("2022-01-01", TxKind::Sell, dec!(-2), "ADA", dec!(20))];
        assert!(run(&balances, transactions, &TaxPolicy::default()).is_err());
    }

    #[test]
    fn warnings_are_accumulated_on_the_report() {
        let balances = vec![opening("Cardano", "ADA", dec!(10), dec!(10))];
        let transactions = vec![tx("2022-01-01", TxKind::Buy, dec!(-1), "ADA", dec!(-10))];
        let report = run(&balances, transactions, &TaxPolicy::default()).unwrap();
        assert_eq!(report.warnings.len(), 1);
    }
}
