pub mod ledger;
pub mod price_history;
pub mod report_export;
