use crate::config::BlockGeometry;
use crate::models::{Block, HOURS_PER_DAY};
use crate::prices::DayPrices;

/// Last 1-based hour a block may start at, `None` when no block fits the day
/// (including a zero-length block when there is no usable energy).
pub fn last_start_hour(geometry: &BlockGeometry) -> Option<usize> {
    if geometry.used_hours == 0 || geometry.used_hours > HOURS_PER_DAY {
        return None;
    }
    Some(HOURS_PER_DAY - geometry.used_hours + 1)
}

/// Weighted price sum of the block starting at `start_hour`: whole hours at full
/// weight, then the partial trailing hour at `frac`.
pub fn weighted_block(
    prices: &DayPrices,
    start_hour: usize,
    geometry: &BlockGeometry,
) -> Option<Block> {
    if start_hour == 0 || geometry.used_hours == 0 || geometry.used_hours > HOURS_PER_DAY {
        return None;
    }
    let last_hour = start_hour + geometry.used_hours - 1;
    if last_hour > HOURS_PER_DAY {
        return None;
    }

    let mut weighted_sum: f64 = (start_hour..start_hour + geometry.k_full)
        .map(|hour| prices.at(hour))
        .sum();
    if geometry.frac > 0.0 {
        weighted_sum += prices.at(start_hour + geometry.k_full) * geometry.frac;
    }

    Some(Block {
        start_hour,
        weighted_sum,
        last_hour,
    })
}

/// Every feasible block of the day, ordered by start hour. Charge and discharge
/// blocks share the geometry, so one list serves both.
pub fn day_blocks(prices: &DayPrices, geometry: &BlockGeometry) -> Vec<Block> {
    match last_start_hour(geometry) {
        Some(last_start) => (1..=last_start)
            .filter_map(|start| weighted_block(prices, start, geometry))
            .collect(),
        None => Vec::new(),
    }
}
