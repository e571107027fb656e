//! Market data access
//!
//! [`MarketData`] is the seam the workflow depends on; [`YahooMarketData`]
//! is the production implementation backed by Yahoo Finance.

use crate::error::{ReportError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use time::OffsetDateTime;
use tracing::{debug, warn};
use yahoo_finance_api as yahoo;

/// One trading day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adjclose: f64,
    pub volume: u64,
}

impl DailyBar {
    /// A bar where every price equals `close`
    pub fn from_close(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: close,
            high: close,
            low: close,
            close,
            adjclose: close,
            volume: 0,
        }
    }
}

/// Inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting `start` after `end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(ReportError::Other(format!(
                "Start date {start} is after end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// `{ticker}_{start}_to_{end}`, the stem of every file of a report
    pub fn file_stem(&self, ticker: &str) -> String {
        format!("{ticker}_{}_to_{}", self.start, self.end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Source of daily prices
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Close of the most recent trading day, `None` if the symbol is unknown
    async fn latest_close(&self, ticker: &str) -> Result<Option<f64>>;

    /// Daily bars between `start` and `end`, both inclusive, oldest first
    async fn daily_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>>;
}

/// Trading day of a quote timestamp in seconds, `None` when out of range
fn quote_date(timestamp: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.date_naive())
}

/// Yahoo Finance market data
#[derive(Debug, Clone, Default)]
pub struct YahooMarketData {}

impl YahooMarketData {
    pub fn new() -> Self {
        Self {}
    }

    fn connector() -> Result<yahoo::YahooConnector> {
        yahoo::YahooConnector::new().map_err(|e| ReportError::MarketData(e.to_string()))
    }
}

fn midnight_utc(date: NaiveDate) -> Result<OffsetDateTime> {
    let timestamp = date.and_time(NaiveTime::MIN).and_utc().timestamp();
    OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|e| ReportError::MarketData(format!("Invalid date {date}: {e}")))
}

#[async_trait]
impl MarketData for YahooMarketData {
    async fn latest_close(&self, ticker: &str) -> Result<Option<f64>> {
        let provider = Self::connector()?;

        // Unknown symbols surface as provider errors
        let Ok(response) = provider.get_latest_quotes(ticker, "1d").await else {
            debug!("No latest quote for {ticker}");
            return Ok(None);
        };

        Ok(response.last_quote().ok().map(|quote| quote.close))
    }

    async fn daily_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>> {
        let provider = Self::connector()?;

        // The provider's end bound is exclusive
        let until = end
            .checked_add_days(Days::new(1))
            .ok_or_else(|| ReportError::MarketData(format!("Invalid end date {end}")))?;

        let response = provider
            .get_quote_history(ticker, midnight_utc(start)?, midnight_utc(until)?)
            .await
            .map_err(|e| ReportError::MarketData(e.to_string()))?;

        let quotes = match response.quotes() {
            Ok(quotes) => quotes,
            Err(e) => {
                debug!("No quotes for {ticker} in {start}..={end}: {e}");
                return Ok(Vec::new());
            }
        };

        Ok(quotes
            .iter()
            .filter_map(|q| {
                let Some(date) = quote_date(q.timestamp as i64) else {
                    warn!("Skipping {ticker} quote with invalid timestamp {}", q.timestamp);
                    return None;
                };
                Some(DailyBar {
                    date,
                    open: q.open,
                    high: q.high,
                    low: q.low,
                    close: q.close,
                    adjclose: q.adjclose,
                    volume: q.volume,
                })
            })
            .collect())
    }
}

/// Export bars as CSV for the code-execution capability
pub fn write_csv(bars: &[DailyBar], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "Date,Open,High,Low,Close,Adj Close,Volume")?;
    for bar in bars {
        writeln!(
            writer,
            "{},{},{},{},{},{},{}",
            bar.date, bar.open, bar.high, bar.low, bar.close, bar.adjclose, bar.volume
        )?;
    }

    writer.flush()?;
    Ok(())
}
