pub mod allocation;
pub mod history;
pub mod lot;
pub mod position;
pub mod price;
pub mod report;
pub mod settings;
pub mod valuation;
