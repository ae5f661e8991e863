//! Portfolio breakdowns for reporting: per-month totals and the typical daily
//! price shape with the most common charge/discharge hours.

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::config::StorageConfig;
use crate::models::{CycleRecord, EnergyTotals, PortfolioResult, HOURS_PER_DAY};
use crate::prices::DailyPriceSeries;

/// How many of the most frequent start hours are reported.
pub const TOP_HOURS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    pub cycle_count: usize,
    pub revenue_pln: f64,
    pub distribution_cost_pln: f64,
    pub profit_pln: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyAverage {
    pub hour: usize,
    pub avg_price_pln_mwh: Option<f64>,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyProfile {
    pub averages: Vec<HourlyAverage>,
    pub top_charge_hours: Vec<usize>,
    pub top_discharge_hours: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioReport {
    pub monthly: Vec<MonthlySummary>,
    pub hourly: HourlyProfile,
}

impl PortfolioReport {
    pub fn build(
        result: &PortfolioResult,
        series: &DailyPriceSeries,
        config: &StorageConfig,
    ) -> Self {
        Self {
            monthly: monthly_breakdown(&result.cycles, config),
            hourly: hourly_profile(series, &result.cycles),
        }
    }
}

/// Totals per calendar month. Every month with price data gets a row, also
/// when no cycle ran in it.
pub fn monthly_breakdown(cycles: &[CycleRecord], config: &StorageConfig) -> Vec<MonthlySummary> {
    let mut months: BTreeMap<(i32, u32), (usize, f64)> = BTreeMap::new();

    for cycle in cycles {
        let entry = months
            .entry((cycle.date.year(), cycle.date.month()))
            .or_insert((0, 0.0));
        if !cycle.is_placeholder() {
            entry.0 += 1;
            entry.1 += cycle.spread_pln;
        }
    }

    months
        .into_iter()
        .map(|((year, month), (cycle_count, revenue_pln))| {
            let distribution_cost_pln =
                EnergyTotals::for_cycles(config, cycle_count).distribution_cost_pln;
            MonthlySummary {
                year,
                month,
                cycle_count,
                revenue_pln,
                distribution_cost_pln,
                profit_pln: revenue_pln - distribution_cost_pln,
            }
        })
        .collect()
}

/// Average recorded price per delivery hour plus the most frequent cycle start hours.
#[allow(clippy::cast_precision_loss)]
pub fn hourly_profile(series: &DailyPriceSeries, cycles: &[CycleRecord]) -> HourlyProfile {
    let mut sums = [0.0_f64; HOURS_PER_DAY];
    let mut samples = [0usize; HOURS_PER_DAY];

    for (_, day) in series.iter() {
        for hour in 1..=HOURS_PER_DAY {
            if let Some(price) = day.recorded_at(hour) {
                sums[hour - 1] += price;
                samples[hour - 1] += 1;
            }
        }
    }

    let averages = (1..=HOURS_PER_DAY)
        .map(|hour| {
            let n = samples[hour - 1];
            HourlyAverage {
                hour,
                avg_price_pln_mwh: (n > 0).then(|| sums[hour - 1] / n as f64),
                samples: n,
            }
        })
        .collect();

    let executed: Vec<&CycleRecord> = cycles.iter().filter(|c| !c.is_placeholder()).collect();

    HourlyProfile {
        averages,
        top_charge_hours: most_frequent(executed.iter().map(|c| c.charge_start_hour)),
        top_discharge_hours: most_frequent(executed.iter().map(|c| c.discharge_start_hour)),
    }
}

/// Up to [`TOP_HOURS`] values by descending count, ties by ascending hour.
fn most_frequent(hours: impl Iterator<Item = usize>) -> Vec<usize> {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for hour in hours {
        *counts.entry(hour).or_insert(0) += 1;
    }

    let mut ranked: Vec<(usize, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.into_iter().take(TOP_HOURS).map(|(hour, _)| hour).collect()
}
