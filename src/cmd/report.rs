//! Report command - replay the period and print the declaration

use anyhow::Context;
use clap::Args;
use rust_decimal::Decimal;
use std::fs::File;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

use crate::core::{self, balance, engine, transaction, Effect, Report, TaxPolicy};

#[derive(Args, Debug)]
pub struct ReportCommand {
    /// CSV file with canonical transactions
    #[arg(short, long)]
    transactions: PathBuf,

    /// CSV file with opening balances (last period's closing balances)
    #[arg(short, long)]
    balances: PathBuf,

    /// Write closing balances to this CSV, for use as next period's opening
    /// balances
    #[arg(long)]
    balances_out: Option<PathBuf>,

    /// Flat tax rate on gains and interest
    #[arg(long, default_value = "0.30")]
    tax_rate: Decimal,

    /// Deductible fraction of losses
    #[arg(long, default_value = "0.70")]
    loss_deduction: Decimal,
}

impl ReportCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let balances_file = File::open(&self.balances)
            .with_context(|| format!("opening {}", self.balances.display()))?;
        let balances = balance::read_csv(balances_file)?;

        let transactions_file = File::open(&self.transactions)
            .with_context(|| format!("opening {}", self.transactions.display()))?;
        let transactions = transaction::read_csv(transactions_file)?;

        let policy = TaxPolicy {
            tax_rate: self.tax_rate,
            loss_deduction: self.loss_deduction,
        };
        // Fatal engine errors abort here, before anything is printed or
        // written.
        let report = engine::run(&balances, transactions, &policy)?;

        print_assets(&report);
        print_totals(&report, &policy);
        print_closing(&report);
        print_warnings(&report);

        if let Some(path) = &self.balances_out {
            let out = File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            balance::write_csv(&report.closing, out)?;
            println!("Wrote closing balances to {}", path.display());
        }
        Ok(())
    }
}

#[derive(Tabled)]
struct LedgerRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Venue")]
    venue: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Holding")]
    holding: String,
    #[tabled(rename = "Avg cost")]
    avg_cost: String,
    #[tabled(rename = "Cost basis")]
    cost_basis: String,
    #[tabled(rename = "Gain")]
    gain: String,
    #[tabled(rename = "Loss")]
    loss: String,
    #[tabled(rename = "Interest")]
    interest: String,
}

#[derive(Tabled)]
struct ClosingRow {
    #[tabled(rename = "Name")]
    display_name: String,
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Avg cost")]
    avg_cost: String,
    #[tabled(rename = "Cost basis")]
    cost_basis: String,
}

fn print_assets(report: &Report) {
    for asset in &report.assets {
        let account = &asset.account;
        println!();
        println!("=== {} ({}) ===", account.symbol, account.display_name);

        let mut rows = Vec::with_capacity(asset.rows.len() + 1);
        // Opening position first, reconstructed from the replay start.
        let opening = opening_row(asset);
        rows.push(opening);
        for row in &asset.rows {
            rows.push(ledger_row(row));
        }
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);

        if account.gain.net > Decimal::ZERO {
            println!(
                "Declared gain:  sold {}, proceeds {}, cost basis {}, net {}",
                format_quantity(account.gain.units_sold),
                format_sek(account.gain.proceeds),
                format_sek(account.gain.cost_basis),
                format_sek(account.gain.net)
            );
        }
        if account.loss.net < Decimal::ZERO {
            println!(
                "Declared loss:  sold {}, proceeds {}, cost basis {}, net {}",
                format_quantity(account.loss.units_sold),
                format_sek(account.loss.proceeds),
                format_sek(account.loss.cost_basis),
                format_sek(account.loss.net)
            );
        }
        if !account.interest.is_zero() {
            println!("Interest income: {}", format_sek(account.interest));
        }
    }
}

fn opening_row(asset: &core::AssetReport) -> LedgerRow {
    LedgerRow {
        date: String::new(),
        venue: String::new(),
        kind: "opening".to_string(),
        quantity: String::new(),
        amount: String::new(),
        holding: format_quantity(asset.opening.quantity),
        avg_cost: format_sek(asset.opening.avg_cost),
        cost_basis: String::new(),
        gain: String::new(),
        loss: String::new(),
        interest: String::new(),
    }
}

fn ledger_row(row: &core::LedgerRow) -> LedgerRow {
    let (cost_basis, gain, loss, interest) = match row.effect {
        Effect::None => (String::new(), String::new(), String::new(), String::new()),
        Effect::Realized {
            cost_of_sold, net, ..
        } => {
            let (gain, loss) = if net >= Decimal::ZERO {
                (format_sek(net), String::new())
            } else {
                (String::new(), format_sek(net))
            };
            (format_sek(cost_of_sold), gain, loss, String::new())
        }
        Effect::Interest { amount } => (
            String::new(),
            String::new(),
            String::new(),
            format_sek(amount),
        ),
    };
    LedgerRow {
        date: row.tx.date.format("%Y-%m-%d").to_string(),
        venue: row.tx.venue.clone(),
        kind: row.tx.kind.as_str().to_string(),
        quantity: format_quantity(row.tx.quantity),
        amount: format_sek(row.tx.amount),
        holding: format_quantity(row.holding),
        avg_cost: format_sek(row.avg_cost),
        cost_basis,
        gain,
        loss,
        interest,
    }
}

fn print_totals(report: &Report, policy: &TaxPolicy) {
    println!();
    println!("TOTALS");
    println!("  Gain:     {}", format_sek(report.totals.gain));
    println!("  Loss:     {}", format_sek(report.totals.loss));
    println!("  Interest: {}", format_sek(report.totals.interest));
    println!(
        "  Tax:      {}  ({}% on gains and interest, losses {}% deductible)",
        format_sek(report.tax),
        policy.tax_rate * Decimal::ONE_HUNDRED,
        policy.loss_deduction * Decimal::ONE_HUNDRED,
    );
}

fn print_closing(report: &Report) {
    println!();
    println!("CLOSING BALANCES");
    let rows: Vec<ClosingRow> = report
        .closing
        .iter()
        .map(|balance| ClosingRow {
            display_name: balance.display_name.clone(),
            symbol: balance.symbol.clone(),
            quantity: format_quantity(balance.quantity),
            avg_cost: format_sek(balance.avg_cost),
            cost_basis: format_sek(balance.cost_basis),
        })
        .collect();
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
}

fn print_warnings(report: &Report) {
    if report.warnings.is_empty() {
        return;
    }
    println!();
    println!("WARNINGS ({})", report.warnings.len());
    for warning in &report.warnings {
        println!("  {}", warning);
    }
}

fn format_sek(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

fn format_quantity(quantity: Decimal) -> String {
    let s = format!("{:.8}", quantity);
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}
