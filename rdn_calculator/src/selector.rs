use log::trace;

use crate::config::{StorageConfig, EPS};
use crate::intervals::day_blocks;
use crate::models::CandidatePair;
use crate::prices::DayPrices;

/// Picks at most K non-overlapping charge/discharge pairs per day maximizing
/// total profit (weighted interval scheduling with a cardinality bound).
#[derive(Debug, Clone, Copy)]
pub struct CycleSelector<'a> {
    config: &'a StorageConfig,
}

impl<'a> CycleSelector<'a> {
    pub fn new(config: &'a StorageConfig) -> Self {
        Self { config }
    }

    /// All pairs of the day clearing the minimum spread, charge-start major order.
    pub fn candidate_pairs(&self, prices: &DayPrices) -> Vec<CandidatePair> {
        let blocks = day_blocks(prices, &self.config.geometry);
        let mut pairs = Vec::new();

        for charge in &blocks {
            for discharge in blocks.iter().filter(|b| b.start_hour > charge.last_hour) {
                let profit_pln = self
                    .config
                    .pair_profit(charge.weighted_sum, discharge.weighted_sum);
                if self.config.clears_min_spread(profit_pln) {
                    pairs.push(CandidatePair {
                        charge: *charge,
                        discharge: *discharge,
                        profit_pln,
                    });
                }
            }
        }

        pairs
    }

    /// Optimal selection for one day, in chronological order. Empty when no
    /// pair clears the threshold or K is zero.
    pub fn select(&self, prices: &DayPrices) -> Vec<CandidatePair> {
        let max_cycles = self.config.max_cycles_per_day as usize;
        if max_cycles == 0 {
            return Vec::new();
        }

        let mut intervals = self.candidate_pairs(prices);
        if intervals.is_empty() {
            return Vec::new();
        }
        intervals.sort_by_key(|pair| (pair.end_hour(), pair.start_hour()));

        let predecessors = predecessors(&intervals);
        let m = intervals.len();
        // More picks than intervals can never be used
        let picks = max_cycles.min(m);
        let prefer_new = self.config.tie_policy.prefers_new();

        let mut dp = vec![vec![0.0_f64; m]; picks + 1];
        let mut take = vec![vec![false; m]; picks + 1];

        for k in 1..=picks {
            for i in 0..m {
                let skip = if i > 0 { dp[k][i - 1] } else { 0.0 };
                let with_i =
                    intervals[i].profit_pln + predecessors[i].map_or(0.0, |j| dp[k - 1][j]);

                let taken = if with_i > skip + EPS {
                    true
                } else if (with_i - skip).abs() <= EPS {
                    prefer_new
                } else {
                    false
                };

                dp[k][i] = if taken { with_i } else { skip };
                take[k][i] = taken;
            }
        }

        let mut selected = Vec::with_capacity(picks);
        let mut remaining = picks;
        let mut cursor = Some(m - 1);
        while remaining > 0 {
            let Some(i) = cursor else { break };
            if take[remaining][i] {
                selected.push(intervals[i]);
                cursor = predecessors[i];
                remaining -= 1;
            } else {
                cursor = i.checked_sub(1);
            }
        }
        selected.reverse();

        trace!(
            "{} candidate intervals, {} selected, total {:.4}",
            m,
            selected.len(),
            dp[picks][m - 1]
        );

        selected
    }
}

/// For intervals sorted by end hour, the index of the latest interval ending
/// strictly before each one starts.
fn predecessors(sorted: &[CandidatePair]) -> Vec<Option<usize>> {
    let ends: Vec<usize> = sorted.iter().map(CandidatePair::end_hour).collect();
    sorted
        .iter()
        .map(|pair| {
            ends.partition_point(|&end| end < pair.start_hour())
                .checked_sub(1)
        })
        .collect()
}
