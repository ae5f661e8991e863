use log::debug;
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::calculator::StorageCalculator;
use crate::config::{RawParams, StorageConfig};
use crate::error::{CalculatorError, Result};
use crate::models::{PortfolioResult, PriceRecord};
use crate::prices::DailyPriceSeries;

/// A saved calculation: `{"params": {...}, "prices": [{date, hour, price_rdn_pln_mwh}]}`.
#[derive(Debug, Clone)]
pub struct CalculationRequest {
    pub params: RawParams,
    pub prices: Vec<PriceRecord>,
}

impl CalculationRequest {
    pub fn from_json_str(input: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(input)?;
        Self::from_value(document)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let document: Value = serde_json::from_reader(reader)?;
        Self::from_value(document)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Split the document into its sections so each failure carries the right kind.
    pub fn from_value(mut document: Value) -> Result<Self> {
        let params = match document.get_mut("params").map(Value::take) {
            None | Some(Value::Null) => return Err(CalculatorError::MissingSection("params")),
            Some(value) => {
                serde_json::from_value::<RawParams>(value).map_err(CalculatorError::InvalidParams)?
            }
        };

        let prices = match document.get_mut("prices").map(Value::take) {
            Some(Value::Array(values)) => parse_price_records(values)?,
            None | Some(Value::Null) => return Err(CalculatorError::MissingSection("prices")),
            Some(_) => {
                return Err(CalculatorError::InvalidPriceRecord {
                    index: 0,
                    reason: "`prices` must be an array".to_string(),
                })
            }
        };

        debug!("Parsed request with {} price records", prices.len());
        Ok(Self { params, prices })
    }

    pub fn config(&self) -> StorageConfig {
        StorageConfig::resolve(&self.params)
    }

    pub fn series(&self) -> DailyPriceSeries {
        DailyPriceSeries::from_records(&self.prices)
    }

    pub fn calculate(&self) -> PortfolioResult {
        StorageCalculator::new(self.config()).calculate(&self.series())
    }
}

/// Every record must carry a date, an integer hour and a numeric price; the
/// first one that does not rejects the whole input.
pub fn parse_price_records(values: Vec<Value>) -> Result<Vec<PriceRecord>> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            serde_json::from_value::<PriceRecord>(value).map_err(|e| {
                CalculatorError::InvalidPriceRecord {
                    index,
                    reason: e.to_string(),
                }
            })
        })
        .collect()
}

/// Read `date,hour,price_rdn_pln_mwh` rows (header required).
pub fn read_prices_csv<R: Read>(reader: R) -> Result<Vec<PriceRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for row in csv_reader.deserialize() {
        let record: PriceRecord = row?;
        records.push(record);
    }
    Ok(records)
}

pub fn load_prices_csv(path: &Path) -> Result<Vec<PriceRecord>> {
    let records = read_prices_csv(BufReader::new(File::open(path)?))?;
    debug!("Loaded {} price records from {}", records.len(), path.display());
    Ok(records)
}
