pub mod calculator;
pub mod config;
pub mod data_loader;
pub mod error;
pub mod intervals;
pub mod models;
pub mod prices;
pub mod report;
pub mod selector;

pub use calculator::StorageCalculator;
pub use config::{BlockGeometry, RawParams, StorageConfig, TiePolicy};
pub use data_loader::CalculationRequest;
pub use error::{CalculatorError, ErrorKind, ErrorReport};
pub use models::{CycleRecord, PortfolioResult, PriceRecord};
pub use prices::{DailyPriceSeries, DayPrices};
pub use report::PortfolioReport;
pub use selector::CycleSelector;

/// Resolve `params`, group `prices` by day and run the whole portfolio.
pub fn calculate(params: &RawParams, prices: &[PriceRecord]) -> PortfolioResult {
    StorageCalculator::new(StorageConfig::resolve(params)).calculate_records(prices)
}
