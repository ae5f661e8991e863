use serde::{Deserialize, Serialize};

/// Tolerance for every threshold and tie comparison on PLN amounts.
pub const EPS: f64 = 1e-12;

/// Floor applied to the rated power so block duration never divides by zero.
pub const MIN_POWER_MW: f64 = 1e-9;

/// Which of two equally profitable schedules wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TiePolicy {
    /// Keep the schedule built from earlier-ending cycles.
    #[default]
    Earliest,
    /// Take the later-ending cycle.
    Latest,
}

impl TiePolicy {
    /// Anything other than `latest` falls back to `earliest`.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "latest" => TiePolicy::Latest,
            _ => TiePolicy::Earliest,
        }
    }

    /// Whether a near-equal "take" beats "skip" in the DP.
    pub fn prefers_new(self) -> bool {
        matches!(self, TiePolicy::Latest)
    }
}

/// Operating parameters as received, before clamping. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawParams {
    pub max_cycles_per_day: Option<i64>,
    pub min_spread_pln_mwh: Option<f64>,
    pub capacity_mwh: Option<f64>,
    pub power_mw: Option<f64>,
    pub soc_min: Option<f64>,
    pub soc_max: Option<f64>,
    pub efficiency: Option<f64>,
    pub distribution_cost_pln_mwh: Option<f64>,
    pub tie_policy: Option<String>,
}

/// Block duration derived once from the usable energy and rated power.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BlockGeometry {
    pub usable_mwh: f64,
    pub block_hours_real: f64,
    /// Whole hours of the block.
    pub k_full: usize,
    /// Weight of the trailing partial hour, zero when the block is whole.
    pub frac: f64,
    pub used_hours: usize,
}

impl BlockGeometry {
    pub fn new(usable_mwh: f64, power_mw: f64) -> Self {
        let block_hours_real = (usable_mwh / power_mw).max(0.0);
        let whole = block_hours_real.floor();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let k_full = whole as usize;
        let frac = block_hours_real - whole;
        let used_hours = if frac > 0.0 { k_full.saturating_add(1) } else { k_full };

        Self {
            usable_mwh,
            block_hours_real,
            k_full,
            frac,
            used_hours,
        }
    }
}

/// Resolved, bounded storage configuration. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageConfig {
    pub max_cycles_per_day: u32,
    pub min_spread_pln_mwh: f64,
    pub capacity_mwh: f64,
    pub power_mw: f64,
    pub soc_min: f64,
    pub soc_max: f64,
    pub efficiency: f64,
    pub distribution_cost_pln_mwh: f64,
    pub tie_policy: TiePolicy,
    pub geometry: BlockGeometry,
}

impl StorageConfig {
    /// Apply defaults and clamp out-of-range values. Never fails.
    pub fn resolve(raw: &RawParams) -> Self {
        let max_cycles_per_day = raw
            .max_cycles_per_day
            .unwrap_or(1)
            .clamp(0, i64::from(u32::MAX));
        let capacity_mwh = raw.capacity_mwh.unwrap_or(1.0);
        let power_mw = raw.power_mw.unwrap_or(1.0).max(MIN_POWER_MW);
        let soc_min = raw.soc_min.unwrap_or(0.0).clamp(0.0, 1.0);
        let soc_max = raw.soc_max.unwrap_or(1.0).min(1.0).max(soc_min);
        let efficiency = raw.efficiency.unwrap_or(1.0).clamp(0.0, 1.0);
        let tie_policy = raw
            .tie_policy
            .as_deref()
            .map(TiePolicy::from_name)
            .unwrap_or_default();

        let usable_mwh = capacity_mwh * (soc_max - soc_min);

        Self {
            max_cycles_per_day: u32::try_from(max_cycles_per_day).unwrap_or(u32::MAX),
            min_spread_pln_mwh: raw.min_spread_pln_mwh.unwrap_or(0.0),
            capacity_mwh,
            power_mw,
            soc_min,
            soc_max,
            efficiency,
            distribution_cost_pln_mwh: raw.distribution_cost_pln_mwh.unwrap_or(0.0),
            tie_policy,
            geometry: BlockGeometry::new(usable_mwh, power_mw),
        }
    }

    pub fn usable_mwh(&self) -> f64 {
        self.geometry.usable_mwh
    }

    /// Profit of one charge/discharge pair given the two weighted price sums.
    pub fn pair_profit(&self, buy_sum: f64, sell_sum: f64) -> f64 {
        self.power_mw * (self.efficiency * sell_sum - buy_sum)
    }

    /// Whether a pair profit clears the configured minimum spread.
    pub fn clears_min_spread(&self, profit: f64) -> bool {
        profit + EPS >= self.min_spread_pln_mwh
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::resolve(&RawParams::default())
    }
}
