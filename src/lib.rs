pub mod cmd;
pub mod core;
pub mod import;
pub mod prices;
