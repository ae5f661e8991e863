use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::StorageConfig;
use crate::report::PortfolioReport;

pub const HOURS_PER_DAY: usize = 24;

/// One day-ahead (RDN) price point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    /// Delivery hour, 1-24. Records outside that range are dropped by the series builder.
    pub hour: i64,
    #[serde(alias = "price")]
    pub price_rdn_pln_mwh: f64,
}

impl PriceRecord {
    pub fn new(date: NaiveDate, hour: i64, price_rdn_pln_mwh: f64) -> Self {
        Self {
            date,
            hour,
            price_rdn_pln_mwh,
        }
    }
}

/// A contiguous charge or discharge run inside one day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    /// First hour, 1-based.
    pub start_hour: usize,
    pub weighted_sum: f64,
    /// Last hour the block touches, including a partial trailing hour.
    pub last_hour: usize,
}

/// A charge block followed by a non-overlapping discharge block on the same day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidatePair {
    pub charge: Block,
    pub discharge: Block,
    pub profit_pln: f64,
}

impl CandidatePair {
    pub fn start_hour(&self) -> usize {
        self.charge.start_hour
    }

    pub fn end_hour(&self) -> usize {
        self.discharge.last_hour
    }

    pub fn overlaps(&self, other: &CandidatePair) -> bool {
        self.start_hour() <= other.end_hour() && other.start_hour() <= self.end_hour()
    }
}

/// One row of the per-day schedule. Days without a profitable cycle carry a
/// single all-zero row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    pub date: NaiveDate,
    pub cycle_number: u32,
    pub charge_start_hour: usize,
    pub charge_sum_price: f64,
    pub discharge_start_hour: usize,
    pub discharge_sum_price: f64,
    pub spread_pln: f64,
}

impl CycleRecord {
    pub fn placeholder(date: NaiveDate) -> Self {
        Self {
            date,
            cycle_number: 1,
            charge_start_hour: 0,
            charge_sum_price: 0.0,
            discharge_start_hour: 0,
            discharge_sum_price: 0.0,
            spread_pln: 0.0,
        }
    }

    pub fn from_pair(date: NaiveDate, cycle_number: u32, pair: &CandidatePair) -> Self {
        Self {
            date,
            cycle_number,
            charge_start_hour: pair.charge.start_hour,
            charge_sum_price: pair.charge.weighted_sum,
            discharge_start_hour: pair.discharge.start_hour,
            discharge_sum_price: pair.discharge.weighted_sum,
            spread_pln: pair.profit_pln,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.charge_start_hour == 0 && self.discharge_start_hour == 0
    }
}

/// Selected cycles of one day, in chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct DayResult {
    pub date: NaiveDate,
    pub pairs: Vec<CandidatePair>,
}

impl DayResult {
    pub fn profit_pln(&self) -> f64 {
        self.pairs.iter().map(|p| p.profit_pln).sum()
    }

    pub fn records(&self) -> Vec<CycleRecord> {
        if self.pairs.is_empty() {
            return vec![CycleRecord::placeholder(self.date)];
        }
        self.pairs
            .iter()
            .zip(1u32..)
            .map(|(pair, number)| CycleRecord::from_pair(self.date, number, pair))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    pub power_mw: f64,
    pub capacity_mwh: f64,
    pub soc_min: f64,
    pub soc_max: f64,
    pub efficiency: f64,
    pub max_cycles: u32,
    pub usable_mwh: f64,
    pub avg_cycles_per_day: f64,
    pub avg_spread_per_cycle_pln: f64,
    pub effective_avg_spread_pln_mwh: f64,
    pub total_energy_bought_mwh: f64,
    pub total_energy_sold_mwh: f64,
    pub energy_loss_mwh: f64,
    pub total_revenue_pln: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Financial {
    pub revenue_pln: f64,
    pub distribution_cost_pln: f64,
    pub profit_pln: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub total_days: usize,
    pub total_cycles: usize,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Everything one calculation produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioResult {
    pub kpi: Kpi,
    pub financial: Financial,
    pub cycles: Vec<CycleRecord>,
    pub metadata: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<PortfolioReport>,
}

impl PortfolioResult {
    /// Cycle rows that represent real cycles, without the per-day placeholders.
    pub fn executed_cycles(&self) -> impl Iterator<Item = &CycleRecord> {
        self.cycles.iter().filter(|c| !c.is_placeholder())
    }
}

/// Energy totals shared by the portfolio KPIs and the monthly breakdown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyTotals {
    pub bought_mwh: f64,
    pub sold_mwh: f64,
    pub distribution_cost_pln: f64,
}

impl EnergyTotals {
    #[allow(clippy::cast_precision_loss)]
    pub fn for_cycles(config: &StorageConfig, cycles: usize) -> Self {
        let bought_mwh = cycles as f64 * config.usable_mwh();
        let sold_mwh = cycles as f64 * config.usable_mwh() * config.efficiency;
        Self {
            bought_mwh,
            sold_mwh,
            distribution_cost_pln: sold_mwh * config.distribution_cost_pln_mwh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(start_hour: usize, last_hour: usize) -> Block {
        Block {
            start_hour,
            weighted_sum: 0.0,
            last_hour,
        }
    }

    fn pair(charge: (usize, usize), discharge: (usize, usize)) -> CandidatePair {
        CandidatePair {
            charge: block(charge.0, charge.1),
            discharge: block(discharge.0, discharge.1),
            profit_pln: 1.0,
        }
    }

    #[test]
    fn test_pairs_sharing_an_hour_overlap() {
        let a = pair((1, 2), (5, 6));
        let b = pair((6, 7), (10, 11));
        let c = pair((7, 8), (10, 11));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_empty_day_yields_placeholder() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let day = DayResult { date, pairs: vec![] };
        let records = day.records();
        assert_eq!(records, vec![CycleRecord::placeholder(date)]);
        assert!(records[0].is_placeholder());
        assert_eq!(day.profit_pln(), 0.0);
    }

    #[test]
    fn test_records_are_numbered_from_one() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let day = DayResult {
            date,
            pairs: vec![pair((1, 2), (3, 4)), pair((5, 6), (7, 8))],
        };
        let numbers: Vec<u32> = day.records().iter().map(|r| r.cycle_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(day.profit_pln(), 2.0);
    }

    #[test]
    fn test_price_record_accepts_short_price_key() {
        let record: PriceRecord =
            serde_json::from_str(r#"{"date": "2024-01-02", "hour": 5, "price": 412.5}"#).unwrap();
        assert_eq!(record.hour, 5);
        assert_eq!(record.price_rdn_pln_mwh, 412.5);
    }
}
