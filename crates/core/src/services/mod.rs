pub mod allocation_service;
pub mod history_service;
pub mod quote_service;
pub mod report_service;
pub mod valuation_service;
