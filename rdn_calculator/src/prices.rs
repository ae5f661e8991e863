use chrono::NaiveDate;
use log::warn;
use std::collections::BTreeMap;

use crate::models::{PriceRecord, HOURS_PER_DAY};

/// 24 hourly prices of one delivery day. Index 0 is hour 1.
#[derive(Debug, Clone, PartialEq)]
pub struct DayPrices {
    prices: [f64; HOURS_PER_DAY],
    recorded: [bool; HOURS_PER_DAY],
}

impl DayPrices {
    pub fn empty() -> Self {
        Self {
            prices: [0.0; HOURS_PER_DAY],
            recorded: [false; HOURS_PER_DAY],
        }
    }

    /// Build a fully recorded day from 24 prices.
    pub fn from_hourly(prices: [f64; HOURS_PER_DAY]) -> Self {
        Self {
            prices,
            recorded: [true; HOURS_PER_DAY],
        }
    }

    /// Price at a 1-based hour.
    pub fn at(&self, hour: usize) -> f64 {
        self.prices[hour - 1]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.prices
    }

    /// Price at a 1-based hour, `None` when no record covered it.
    pub fn recorded_at(&self, hour: usize) -> Option<f64> {
        self.recorded[hour - 1].then_some(self.prices[hour - 1])
    }

    fn set(&mut self, hour: usize, price: f64) {
        self.prices[hour - 1] = price;
        self.recorded[hour - 1] = true;
    }
}

/// Prices grouped by delivery date, iterated in ascending date order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyPriceSeries {
    days: BTreeMap<NaiveDate, DayPrices>,
}

impl DailyPriceSeries {
    /// Group records by date. Hours outside 1-24 are dropped but still register
    /// their date; a repeated (date, hour) keeps the last record.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a PriceRecord>,
    {
        let mut days: BTreeMap<NaiveDate, DayPrices> = BTreeMap::new();
        let mut dropped = 0usize;

        for record in records {
            let day = days.entry(record.date).or_insert_with(DayPrices::empty);
            match usize::try_from(record.hour) {
                Ok(hour) if (1..=HOURS_PER_DAY).contains(&hour) => {
                    day.set(hour, record.price_rdn_pln_mwh);
                }
                _ => dropped += 1,
            }
        }

        if dropped > 0 {
            warn!("Dropped {} price records with hour outside 1-24", dropped);
        }

        Self { days }
    }

    pub fn insert_day(&mut self, date: NaiveDate, prices: DayPrices) {
        self.days.insert(date, prices);
    }

    pub fn get(&self, date: &NaiveDate) -> Option<&DayPrices> {
        self.days.get(date)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &DayPrices)> {
        self.days.iter()
    }

    pub fn dates(&self) -> impl Iterator<Item = &NaiveDate> {
        self.days.keys()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.days.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.days.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}
