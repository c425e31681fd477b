pub mod registry;
pub mod traits;

// Quote source implementations
pub mod alphavantage;
pub mod csv_history;
pub mod fixed;
pub mod yahoo_finance;
