use chrono::NaiveDate;
use log::{debug, info};
use rayon::prelude::*;

use crate::config::StorageConfig;
use crate::models::{
    DayResult, EnergyTotals, Financial, Kpi, Metadata, PortfolioResult, PriceRecord,
};
use crate::prices::{DailyPriceSeries, DayPrices};
use crate::report::PortfolioReport;
use crate::selector::CycleSelector;

pub struct StorageCalculator {
    config: StorageConfig,
}

impl StorageCalculator {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Optimal cycles for a single day
    pub fn optimize_day(&self, date: NaiveDate, prices: &DayPrices) -> DayResult {
        let pairs = CycleSelector::new(&self.config).select(prices);
        debug!("{}: {} cycles selected", date, pairs.len());
        DayResult { date, pairs }
    }

    /// Optimize every day of the series. Days are independent, so they run in
    /// parallel; the result keeps ascending date order.
    pub fn optimize_days(&self, series: &DailyPriceSeries) -> Vec<DayResult> {
        let days: Vec<(&NaiveDate, &DayPrices)> = series.iter().collect();
        days.par_iter()
            .map(|(date, prices)| self.optimize_day(**date, prices))
            .collect()
    }

    /// Run the whole date range and aggregate KPIs and financial totals.
    pub fn calculate(&self, series: &DailyPriceSeries) -> PortfolioResult {
        let days = self.optimize_days(series);
        let result = self.aggregate(&days);
        info!(
            "Calculated {} days ({} cycles), revenue {:.2} PLN, profit {:.2} PLN",
            result.metadata.total_days,
            result.metadata.total_cycles,
            result.financial.revenue_pln,
            result.financial.profit_pln
        );
        result
    }

    /// Same as [`calculate`](Self::calculate), with the monthly and hourly report attached.
    pub fn calculate_with_report(&self, series: &DailyPriceSeries) -> PortfolioResult {
        let mut result = self.calculate(series);
        result.report = Some(PortfolioReport::build(&result, series, &self.config));
        result
    }

    pub fn calculate_records(&self, records: &[PriceRecord]) -> PortfolioResult {
        self.calculate(&DailyPriceSeries::from_records(records))
    }

    /// Fold per-day selections into the portfolio result. `days` must be in
    /// ascending date order.
    #[allow(clippy::cast_precision_loss)]
    pub fn aggregate(&self, days: &[DayResult]) -> PortfolioResult {
        let mut cycles = Vec::new();
        let mut total_cycles = 0usize;
        let mut total_profit = 0.0;

        for day in days {
            total_cycles += day.pairs.len();
            for pair in &day.pairs {
                total_profit += pair.profit_pln;
            }
            cycles.extend(day.records());
        }

        let total_days = days.len();
        let energy = EnergyTotals::for_cycles(&self.config, total_cycles);

        let avg_cycles_per_day = if total_days > 0 {
            total_cycles as f64 / total_days as f64
        } else {
            0.0
        };
        let avg_spread_per_cycle_pln = if total_cycles > 0 {
            total_profit / total_cycles as f64
        } else {
            0.0
        };
        let effective_avg_spread_pln_mwh = if energy.bought_mwh > 0.0 {
            total_profit / energy.bought_mwh
        } else {
            0.0
        };

        PortfolioResult {
            kpi: Kpi {
                power_mw: self.config.power_mw,
                capacity_mwh: self.config.capacity_mwh,
                soc_min: self.config.soc_min,
                soc_max: self.config.soc_max,
                efficiency: self.config.efficiency,
                max_cycles: self.config.max_cycles_per_day,
                usable_mwh: self.config.usable_mwh(),
                avg_cycles_per_day,
                avg_spread_per_cycle_pln,
                effective_avg_spread_pln_mwh,
                total_energy_bought_mwh: energy.bought_mwh,
                total_energy_sold_mwh: energy.sold_mwh,
                energy_loss_mwh: energy.bought_mwh - energy.sold_mwh,
                total_revenue_pln: total_profit,
            },
            financial: Financial {
                revenue_pln: total_profit,
                distribution_cost_pln: energy.distribution_cost_pln,
                profit_pln: total_profit - energy.distribution_cost_pln,
            },
            cycles,
            metadata: Metadata {
                total_days,
                total_cycles,
                start_date: days.first().map(|d| d.date),
                end_date: days.last().map(|d| d.date),
            },
            report: None,
        }
    }
}
