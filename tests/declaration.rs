//! End-to-end declaration scenarios through the public API:
//! CSV in, engine replay, declaration figures out.

use kryptodekl::core::{balance, engine, transaction, EngineError, TaxPolicy};
use rust_decimal_macros::dec;

const OPENING: &str = "\
display_name,symbol,quantity,avg_cost
Cardano,ADA,0,0
";

fn run(opening: &str, transactions: &str) -> Result<engine::Report, EngineError> {
    let balances = balance::read_csv(opening.as_bytes()).unwrap();
    let transactions = transaction::read_csv(transactions.as_bytes()).unwrap();
    engine::run(&balances, transactions, &TaxPolicy::default())
}

#[test]
fn buy_establishes_the_position() {
    let report = run(
        OPENING,
        "\
date,venue,kind,quantity,symbol,amount
2022-01-10,coinbase,buy,10,ADA,100
",
    )
    .unwrap();
    let closing = &report.closing[0];
    assert_eq!(closing.quantity, dec!(10));
    assert_eq!(closing.avg_cost, dec!(10));
    assert_eq!(closing.cost_basis, dec!(100));
}

#[test]
fn partial_sell_realizes_a_gain() {
    let report = run(
        OPENING,
        "\
date,venue,kind,quantity,symbol,amount
2022-01-10,coinbase,buy,10,ADA,100
2022-02-01,coinbase,sell,-4,ADA,60
",
    )
    .unwrap();
    let account = &report.assets[0].account;
    assert_eq!(account.gain.cost_basis, dec!(40));
    assert_eq!(account.gain.net, dec!(20));
    assert!(account.loss.net.is_zero());
    let closing = &report.closing[0];
    assert_eq!(closing.quantity, dec!(6));
    assert_eq!(closing.avg_cost, dec!(10));
    assert_eq!(closing.cost_basis, dec!(60));
}

#[test]
fn selling_out_realizes_a_loss_and_zeroes_the_basis() {
    let report = run(
        OPENING,
        "\
date,venue,kind,quantity,symbol,amount
2022-01-10,coinbase,buy,10,ADA,100
2022-02-01,coinbase,sell,-4,ADA,60
2022-03-01,coinbase,sell,-6,ADA,20
",
    )
    .unwrap();
    let account = &report.assets[0].account;
    assert_eq!(account.gain.net, dec!(20));
    assert_eq!(account.loss.cost_basis, dec!(60));
    assert_eq!(account.loss.net, dec!(-40));
    let closing = &report.closing[0];
    assert_eq!(closing.quantity, dec!(0));
    assert_eq!(closing.avg_cost, dec!(0));
    assert_eq!(closing.cost_basis, dec!(0));
    // (20 - 40 * 0.7) * 0.3
    assert_eq!(report.tax, dec!(-2.400));
}

#[test]
fn interest_on_an_empty_position() {
    let report = run(
        OPENING,
        "\
date,venue,kind,quantity,symbol,amount
2022-04-01,nexo,interest,1,ADA,5
",
    )
    .unwrap();
    let account = &report.assets[0].account;
    assert_eq!(account.interest, dec!(5));
    assert_eq!(account.quantity, dec!(1));
    assert_eq!(account.avg_cost, dec!(5));
    assert_eq!(report.totals.interest, dec!(5));
    // Interest alone: 5 * 0.3
    assert_eq!(report.tax, dec!(1.500));
}

#[test]
fn unknown_asset_fails_with_the_missing_symbol() {
    let err = run(
        OPENING,
        "\
date,venue,kind,quantity,symbol,amount
2022-01-10,coinbase,buy,10,DOT,100
",
    )
    .unwrap_err();
    match err {
        EngineError::MissingOpeningBalance(symbols) => assert_eq!(symbols, vec!["DOT"]),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn swap_pair_with_inherited_date_stays_ordered() {
    let opening = "\
display_name,symbol,quantity,avg_cost
Cardano,ADA,10,5
Augur,REP,0,0
";
    // A swap as written by the importers: buy row inherits date and venue.
    let report = run(
        opening,
        "\
date,venue,kind,quantity,symbol,amount
2022-01-11,bittrex,sell,-10,ADA,80
,,buy,2,REP,80
",
    )
    .unwrap();
    let ada = &report.assets[0].account;
    assert_eq!(ada.gain.net, dec!(30));
    let rep = &report.assets[1].account;
    assert_eq!(rep.quantity, dec!(2));
    assert_eq!(rep.avg_cost, dec!(40));
}

#[test]
fn closing_balances_feed_the_next_period() {
    let report = run(
        OPENING,
        "\
date,venue,kind,quantity,symbol,amount
2022-01-10,coinbase,buy,10,ADA,100
",
    )
    .unwrap();

    let mut csv = Vec::new();
    balance::write_csv(&report.closing, &mut csv).unwrap();
    // A closing-balance CSV is a valid opening-balance CSV.
    let balances = balance::read_csv(csv.as_slice()).unwrap();
    assert_eq!(balances.len(), 1);
    assert_eq!(balances[0].symbol, "ADA");
    assert_eq!(balances[0].quantity, dec!(10));
    assert_eq!(balances[0].avg_cost, dec!(10));

    let next = engine::run(&balances, Vec::new(), &TaxPolicy::default()).unwrap();
    assert_eq!(next.closing[0].cost_basis, dec!(100));
}

#[test]
fn full_period_reconciles_totals_with_per_asset_buckets() {
    let opening = "\
display_name,symbol,quantity,avg_cost
Bitcoin,mBTC,50,300
Cardano,ADA,1000,2
Litecoin,LTC,3,500
";
    let report = run(
        opening,
        "\
date,venue,kind,quantity,symbol,amount
2022-01-05,coinbase,buy,0.01,BTC,4000
2022-02-10,bittrex,sell,-30,mBTC,12000
2022-03-15,bittrex,sell,-500,ADA,600
2022-04-01,nexo,interest,10,ADA,25
",
    )
    .unwrap();

    let gain: rust_decimal::Decimal = report.assets.iter().map(|a| a.account.gain.net).sum();
    let loss: rust_decimal::Decimal = report.assets.iter().map(|a| a.account.loss.net).sum();
    let interest: rust_decimal::Decimal =
        report.assets.iter().map(|a| a.account.interest).sum();
    assert_eq!(report.totals.gain, gain);
    assert_eq!(report.totals.loss, loss);
    assert_eq!(report.totals.interest, interest);
    assert_eq!(
        report.tax,
        TaxPolicy::default().tax(gain, loss, interest)
    );

    // The BTC buy was rescaled to mBTC and blended into the position.
    let mbtc = report
        .assets
        .iter()
        .find(|a| a.account.symbol == "mBTC")
        .unwrap();
    assert_eq!(mbtc.rows[0].tx.quantity, dec!(10.00));
    assert_eq!(mbtc.account.quantity, dec!(30.00));

    // Untouched LTC still closes.
    assert!(report.closing.iter().any(|c| c.symbol == "LTC"));
}
