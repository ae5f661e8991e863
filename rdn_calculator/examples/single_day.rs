use chrono::NaiveDate;
use rdn_calculator::{calculate, PriceRecord, RawParams};

fn main() {
    // 2 MWh usable energy at 1 MW: every block spans two hours
    let params = RawParams {
        max_cycles_per_day: Some(2),
        min_spread_pln_mwh: Some(50.0),
        capacity_mwh: Some(2.5),
        power_mw: Some(1.0),
        soc_min: Some(0.1),
        soc_max: Some(0.9),
        efficiency: Some(0.9),
        distribution_cost_pln_mwh: Some(15.0),
        tie_policy: None,
    };

    let date = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();
    let prices: Vec<PriceRecord> = (1..=24)
        .map(|hour| {
            let price = match hour {
                1..=5 => 210.0,      // night trough
                7..=9 => 520.0,      // morning peak
                11..=15 => 160.0,    // midday solar dip
                18..=21 => 640.0,    // evening peak
                _ => 380.0,
            };
            PriceRecord::new(date, hour, price)
        })
        .collect();

    let result = calculate(&params, &prices);

    println!("RDN Storage Cycles for {date}");
    println!("================================");
    println!(
        "Storage: {} MW / {} MWh, usable {:.2} MWh",
        result.kpi.power_mw, result.kpi.capacity_mwh, result.kpi.usable_mwh
    );
    println!();

    for cycle in result.executed_cycles() {
        println!("  Cycle {}:", cycle.cycle_number);
        println!(
            "    Charge from hour {} (sum {:.2} PLN/MWh)",
            cycle.charge_start_hour, cycle.charge_sum_price
        );
        println!(
            "    Discharge from hour {} (sum {:.2} PLN/MWh)",
            cycle.discharge_start_hour, cycle.discharge_sum_price
        );
        println!("    Spread: {:.2} PLN", cycle.spread_pln);
    }

    println!();
    println!("Revenue: {:.2} PLN", result.financial.revenue_pln);
    println!("Distribution cost: {:.2} PLN", result.financial.distribution_cost_pln);
    println!("Profit: {:.2} PLN", result.financial.profit_pln);
}
