//! CSV file data adapter.
//!
//! Reads one asset's daily history in the common download layout
//! `Date,Open,High,Low,Close,AdjClose,Volume`. Rows may arrive newest-first;
//! the adapter hands them back oldest-first.

use crate::domain::error::SwingError;
use crate::domain::price::{PricePoint, filter_by_date_range};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs::File;
use std::path::PathBuf;

const DATE_FORMATS: [&str; 4] = ["%b %d %Y", "%b %d, %Y", "%Y-%m-%d", "%m/%d/%Y"];
const COLUMNS: usize = 7;

pub struct CsvAdapter {
    path: PathBuf,
}

impl CsvAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<Vec<PricePoint>, SwingError> {
        let file = File::open(&self.path)?;
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut points = Vec::new();
        let mut seen_any = false;

        for (index, result) in rdr.records().enumerate() {
            let record = result?;
            let row = index + 1;
            seen_any = true;

            if record.iter().all(str::is_empty) {
                continue;
            }
            if index == 0 && record.get(0).is_some_and(|f| f.eq_ignore_ascii_case("date")) {
                continue;
            }
            if record.len() < COLUMNS {
                return Err(SwingError::DataFormat {
                    row,
                    reason: format!("expected {} columns, got {}", COLUMNS, record.len()),
                });
            }

            points.push(parse_record(&record, row)?);
        }

        if !seen_any {
            return Err(SwingError::DataFormat {
                row: 0,
                reason: format!("{} is empty", self.path.display()),
            });
        }

        points.sort_by_key(|p| p.date);
        let before = points.len();
        points.dedup_by_key(|p| p.date);
        if points.len() < before {
            tracing::warn!(
                path = %self.path.display(),
                dropped = before - points.len(),
                "dropped rows with duplicate dates"
            );
        }

        Ok(points)
    }
}

impl DataPort for CsvAdapter {
    fn load_prices(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PricePoint>, SwingError> {
        let points = self.read_all()?;
        tracing::info!(path = %self.path.display(), rows = points.len(), "loaded price data");

        if start_date.is_none() && end_date.is_none() {
            return Ok(points);
        }
        let (Some(first), Some(last)) = (
            points.first().map(|p| p.date),
            points.last().map(|p| p.date),
        ) else {
            return Ok(points);
        };

        let start = start_date.unwrap_or(first);
        let end = end_date.unwrap_or(last);
        let filtered = filter_by_date_range(points, Some(start), Some(end));
        if filtered.is_empty() {
            return Err(SwingError::NoData { start, end });
        }

        tracing::info!(rows = filtered.len(), %start, %end, "filtered price data");
        Ok(filtered)
    }
}

fn parse_record(record: &csv::StringRecord, row: usize) -> Result<PricePoint, SwingError> {
    let field = |i: usize| record.get(i).unwrap_or("");

    let date = parse_date(field(0)).ok_or_else(|| SwingError::DataFormat {
        row,
        reason: format!("unrecognised date {:?}", field(0)),
    })?;

    let price = |i: usize, name: &str| -> Result<f64, SwingError> {
        field(i).parse().map_err(|e| SwingError::DataFormat {
            row,
            reason: format!("invalid {} value {:?}: {}", name, field(i), e),
        })
    };

    let volume: i64 = match field(6) {
        "" | "-" => 0,
        raw => raw.replace(',', "").parse().map_err(|e| SwingError::DataFormat {
            row,
            reason: format!("invalid volume value {:?}: {}", raw, e),
        })?,
    };

    Ok(PricePoint {
        date,
        open: price(1, "open")?,
        high: price(2, "high")?,
        low: price(3, "low")?,
        close: price(4, "close")?,
        adjusted_close: price(5, "adjusted close")?,
        volume,
    })
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}
