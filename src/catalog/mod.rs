//! Instrument catalog loaded from a CSV file.
//!
//! Expected header: `Company,Ticker,Price,Monthly_Growth` in any order; extra
//! columns are ignored. Rows are validated once here so the rest of the crate
//! can rely on finite, non-negative prices.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::Instrument;

const REQUIRED_COLUMNS: [&str; 4] = ["Company", "Ticker", "Price", "Monthly_Growth"];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to open catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed catalog CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("catalog is missing required column `{0}`")]
    MissingColumn(&'static str),
    #[error("catalog line {line}: {reason}")]
    InvalidRow { line: u64, reason: String },
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(rename = "Company")]
    company: String,
    #[serde(rename = "Ticker")]
    ticker: String,
    #[serde(rename = "Price")]
    price: f64,
    #[serde(rename = "Monthly_Growth")]
    monthly_growth: f64,
}

impl CatalogRow {
    fn into_instrument(self) -> Result<Instrument, String> {
        if self.ticker.is_empty() {
            return Err("ticker must not be empty".to_string());
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(format!("price must be a non-negative number, got {}", self.price));
        }
        if !self.monthly_growth.is_finite() {
            return Err(format!(
                "monthly growth must be a finite number, got {}",
                self.monthly_growth
            ));
        }
        Ok(Instrument {
            company: self.company,
            ticker: self.ticker,
            price: self.price,
            monthly_growth: self.monthly_growth,
        })
    }
}

/// Read-only, cheaply cloneable list of instruments in file order.
#[derive(Debug, Clone)]
pub struct Catalog {
    instruments: Arc<[Instrument]>,
}

impl Catalog {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            instruments = catalog.len(),
            "loaded instrument catalog"
        );
        Ok(catalog)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
        let headers = rdr.headers()?.clone();
        check_columns(&headers)?;

        let mut instruments = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let row: CatalogRow = record
                .deserialize(Some(&headers))
                .map_err(|e| CatalogError::InvalidRow {
                    line,
                    reason: e.to_string(),
                })?;
            let instrument = row
                .into_instrument()
                .map_err(|reason| CatalogError::InvalidRow { line, reason })?;
            instruments.push(instrument);
        }

        debug!(instruments = instruments.len(), "parsed catalog rows");
        Ok(Self::from_instruments(instruments))
    }

    pub fn from_instruments(instruments: Vec<Instrument>) -> Self {
        Self {
            instruments: instruments.into(),
        }
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

fn check_columns(headers: &StringRecord) -> Result<(), CatalogError> {
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(CatalogError::MissingColumn(column));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(csv: &str) -> Result<Catalog, CatalogError> {
        Catalog::from_reader(csv.as_bytes())
    }

    #[test]
    fn loads_rows_in_file_order() {
        let catalog = load(
            "Company,Ticker,Price,Monthly_Growth\n\
             Alpha Ltd,ALPHA,100,5\n\
             Beta Ltd,BETA,300.5,8.25\n",
        )
        .expect("valid catalog");

        assert_eq!(catalog.len(), 2);
        let first = &catalog.instruments()[0];
        assert_eq!(first.company, "Alpha Ltd");
        assert_eq!(first.ticker, "ALPHA");
        assert_eq!(first.price, 100.0);
        assert_eq!(first.monthly_growth, 5.0);
        assert_eq!(catalog.instruments()[1].monthly_growth, 8.25);
    }

    #[test]
    fn column_order_and_extra_columns_are_tolerated() {
        let catalog = load(
            "Ticker,Sector,Monthly_Growth,Price,Company\n\
             GAMMA,Energy,2.5,40,Gamma Power\n",
        )
        .expect("valid catalog");
        let only = &catalog.instruments()[0];
        assert_eq!(only.company, "Gamma Power");
        assert_eq!(only.price, 40.0);
    }

    #[test]
    fn whitespace_around_fields_is_trimmed() {
        let catalog = load("Company, Ticker, Price, Monthly_Growth\n Delta , DLT , 12 , 1.5 \n")
            .expect("valid catalog");
        assert_eq!(catalog.instruments()[0].ticker, "DLT");
    }

    #[test]
    fn header_only_file_is_an_empty_catalog() {
        let catalog = load("Company,Ticker,Price,Monthly_Growth\n").expect("valid catalog");
        assert!(catalog.is_empty());
    }

    #[test]
    fn missing_growth_column_is_rejected() {
        let err = load("Company,Ticker,Price\nAlpha,ALPHA,100\n").expect_err("missing column");
        assert!(matches!(err, CatalogError::MissingColumn("Monthly_Growth")));
    }

    #[test]
    fn negative_price_is_rejected_with_line() {
        let err = load(
            "Company,Ticker,Price,Monthly_Growth\n\
             Alpha,ALPHA,100,5\n\
             Broken,BRK,-1,5\n",
        )
        .expect_err("negative price");
        match err {
            CatalogError::InvalidRow { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.contains("price"), "{reason}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn non_numeric_price_is_rejected() {
        let err = load("Company,Ticker,Price,Monthly_Growth\nAlpha,ALPHA,cheap,5\n")
            .expect_err("non numeric price");
        assert!(matches!(err, CatalogError::InvalidRow { line: 2, .. }));
    }

    #[test]
    fn empty_ticker_is_rejected() {
        let err = load("Company,Ticker,Price,Monthly_Growth\nAlpha,,10,5\n")
            .expect_err("empty ticker");
        assert!(matches!(err, CatalogError::InvalidRow { .. }));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Catalog::from_path("does/not/exist.csv").expect_err("missing file");
        assert!(err.to_string().contains("does/not/exist.csv"));
    }

    #[test]
    fn bundled_sample_catalog_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/stock_data.csv");
        let catalog = Catalog::from_path(path).expect("bundled catalog loads");
        assert!(!catalog.is_empty());
        assert!(catalog.instruments().iter().all(|i| i.price >= 0.0));
    }
}
