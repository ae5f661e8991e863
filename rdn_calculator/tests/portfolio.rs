use chrono::{Duration, NaiveDate};
use rdn_calculator::config::EPS;
use rdn_calculator::{
    calculate, CalculationRequest, DailyPriceSeries, PriceRecord, RawParams, StorageCalculator,
    StorageConfig,
};

fn params(max_cycles: i64) -> RawParams {
    RawParams {
        max_cycles_per_day: Some(max_cycles),
        min_spread_pln_mwh: Some(50.0),
        capacity_mwh: Some(5.0),
        power_mw: Some(2.0),
        soc_min: Some(0.1),
        soc_max: Some(0.9),
        efficiency: Some(0.88),
        distribution_cost_pln_mwh: Some(12.5),
        tie_policy: None,
    }
}

/// A month of prices with a morning and an evening peak whose height varies by day.
fn month_of_prices() -> Vec<PriceRecord> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut records = Vec::new();
    for offset in 0..31 {
        let date = start + Duration::days(offset);
        let swing = (offset % 7) as f64 * 25.0;
        for hour in 1..=24i64 {
            let price = match hour {
                1..=5 => 180.0 - swing / 2.0,
                7..=9 => 420.0 + swing,
                12..=15 => 210.0,
                18..=21 => 520.0 + swing,
                _ => 330.0,
            };
            records.push(PriceRecord::new(date, hour, price));
        }
    }
    // a day with a flat curve never cycles
    let flat = start + Duration::days(31);
    records.extend((1..=24).map(|hour| PriceRecord::new(flat, hour, 400.0)));
    records
}

#[test]
fn cycles_respect_cap_order_and_threshold() {
    let params = params(2);
    let config = StorageConfig::resolve(&params);
    let result = calculate(&params, &month_of_prices());

    assert_eq!(result.metadata.total_days, 32);
    let mut by_day: std::collections::BTreeMap<NaiveDate, Vec<_>> = Default::default();
    for cycle in result.executed_cycles() {
        by_day.entry(cycle.date).or_default().push(cycle);
    }

    let used = config.geometry.used_hours;
    for cycles in by_day.values() {
        assert!(cycles.len() <= 2);
        for cycle in cycles {
            assert!(cycle.spread_pln + EPS >= 50.0);
            assert!(cycle.discharge_start_hour > cycle.charge_start_hour + used - 1);
        }
        for pair in cycles.windows(2) {
            let first_end = pair[0].discharge_start_hour + used - 1;
            assert!(first_end < pair[1].charge_start_hour);
            assert_eq!(pair[1].cycle_number, pair[0].cycle_number + 1);
        }
    }
}

#[test]
fn flat_day_is_a_single_zero_record() {
    let result = calculate(&params(2), &month_of_prices());
    let last = result.cycles.last().unwrap();
    assert_eq!(last.date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    assert_eq!(last.cycle_number, 1);
    assert_eq!(last.charge_start_hour, 0);
    assert_eq!(last.discharge_start_hour, 0);
    assert_eq!(last.spread_pln, 0.0);
    assert_eq!(
        result
            .cycles
            .iter()
            .filter(|c| c.date == last.date)
            .count(),
        1
    );
}

#[test]
fn kpis_are_consistent() {
    let params = params(3);
    let config = StorageConfig::resolve(&params);
    let result = calculate(&params, &month_of_prices());

    let cycles = result.metadata.total_cycles;
    assert_eq!(cycles, result.executed_cycles().count());
    assert_eq!(
        result.kpi.total_energy_bought_mwh,
        cycles as f64 * config.usable_mwh()
    );
    assert_eq!(
        result.financial.profit_pln,
        result.financial.revenue_pln - result.financial.distribution_cost_pln
    );
    let spread_sum: f64 = result.executed_cycles().map(|c| c.spread_pln).sum();
    assert!((spread_sum - result.financial.revenue_pln).abs() < 1e-6);
    assert_eq!(result.kpi.total_revenue_pln, result.financial.revenue_pln);
}

#[test]
fn more_cycles_never_earn_less() {
    let prices = month_of_prices();
    let one = calculate(&params(1), &prices).financial.revenue_pln;
    let two = calculate(&params(2), &prices).financial.revenue_pln;
    let three = calculate(&params(3), &prices).financial.revenue_pln;
    assert!(two + 1e-9 >= one);
    assert!(three + 1e-9 >= two);
}

#[test]
fn shuffled_input_gives_identical_output() {
    let prices = month_of_prices();
    let mut shuffled = prices.clone();
    // deterministic interleave: odd positions first, then even ones reversed
    let mut odd: Vec<_> = shuffled.iter().skip(1).step_by(2).cloned().collect();
    let mut even: Vec<_> = shuffled.iter().step_by(2).cloned().collect();
    even.reverse();
    odd.append(&mut even);
    shuffled = odd;

    let params = params(2);
    assert_eq!(calculate(&params, &prices), calculate(&params, &shuffled));
}

#[test]
fn json_output_has_expected_shape() {
    let prices: Vec<serde_json::Value> = (1..=24)
        .map(|hour| {
            let price = match hour {
                1 | 2 => 100,
                3 | 4 => 10,
                23 | 24 => 200,
                _ => 50,
            };
            serde_json::json!({"date": "2024-06-01", "hour": hour, "price_rdn_pln_mwh": price})
        })
        .collect();
    let document = serde_json::json!({
        "params": {"max_cycles_per_day": 1, "capacity_mwh": 2, "power_mw": 1, "efficiency": 0.9},
        "prices": prices,
    });
    let request = CalculationRequest::from_value(document).unwrap();
    let result = request.calculate();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["metadata"]["start_date"], "2024-06-01");
    assert_eq!(json["metadata"]["total_cycles"], 1);
    assert_eq!(json["cycles"][0]["charge_start_hour"], 3);
    assert_eq!(json["cycles"][0]["discharge_start_hour"], 23);
    assert!((json["cycles"][0]["spread_pln"].as_f64().unwrap() - 340.0).abs() < 1e-9);
    assert!(json["financial"]["profit_pln"].is_number());
    assert!(json["kpi"]["effective_avg_spread_pln_mwh"].is_number());
    assert!(json.get("report").is_none());
}

#[test]
fn report_months_add_up_to_totals() {
    let params = params(2);
    let config = StorageConfig::resolve(&params);
    let series = DailyPriceSeries::from_records(&month_of_prices());
    let result = StorageCalculator::new(config).calculate_with_report(&series);
    let report = result.report.as_ref().unwrap();

    assert_eq!(report.monthly.len(), 2);
    let cycles: usize = report.monthly.iter().map(|m| m.cycle_count).sum();
    let profit: f64 = report.monthly.iter().map(|m| m.profit_pln).sum();
    assert_eq!(cycles, result.metadata.total_cycles);
    assert!((profit - result.financial.profit_pln).abs() < 1e-6);
    assert_eq!(report.hourly.averages.len(), 24);
    assert!(report.hourly.top_charge_hours.len() <= 5);
}
