//! Application layer - drives a stock-check cycle over the domain ports

pub mod batch_report;
pub mod stock_check_runner;

pub use batch_report::{BatchReport, BatchSummary, CheckStockResponse, ProductOutcome, ProductReport};
pub use stock_check_runner::{RunnerSettings, StockCheckRunner};
