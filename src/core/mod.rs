pub mod account;
pub mod balance;
pub mod engine;
pub mod tax;
pub mod transaction;
pub mod warnings;

// Flat public surface for domain types and functions.
pub use account::{Account, Bucket, BucketKind, Effect};
pub use balance::{ClosingBalance, OpeningBalance};
pub use engine::{run, AssetReport, EngineError, LedgerRow, Report, Totals};
pub use tax::TaxPolicy;
pub use transaction::{Transaction, TxKind};
pub use warnings::Warning;
