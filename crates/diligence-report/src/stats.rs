//! Price statistics and the labeled statistics block

use crate::market::DateRange;
use serde::{Deserialize, Serialize};

/// Notice used instead of the price lines when a range has too few closes
pub const INSUFFICIENT_DATA_NOTICE: &str =
    "Analysis skipped: insufficient data for the selected period (fewer than two closing prices).";

/// Notice used instead of the price lines when the first close is zero
pub const ZERO_START_NOTICE: &str =
    "Analysis skipped: the first closing price is zero, so the change cannot be computed.";

/// Summary of a closing-price series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSummary {
    pub start_price: f64,
    pub end_price: f64,
    /// Percentage change from first to last close
    pub change_pct: f64,
    /// Sample standard deviation of the closes
    pub volatility: f64,
}

impl PriceSummary {
    /// Summarize `closes`; needs at least two points and a nonzero first close
    pub fn from_closes(closes: &[f64]) -> Option<Self> {
        let (&start_price, &end_price) = (closes.first()?, closes.last()?);
        if closes.len() < 2 || start_price == 0.0 {
            return None;
        }

        let n = closes.len() as f64;
        let mean = closes.iter().sum::<f64>() / n;
        let variance = closes.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / (n - 1.0);

        Some(Self {
            start_price,
            end_price,
            change_pct: (end_price - start_price) / start_price * 100.0,
            volatility: variance.sqrt(),
        })
    }
}

/// Labeled statistics lines in fixed order
///
/// Ticker and period always come first; the four price lines follow when a
/// summary exists, otherwise a single notice saying why they were skipped.
pub fn statistics_block(ticker: &str, range: &DateRange, closes: &[f64]) -> Vec<String> {
    let mut lines = vec![
        format!("**Ticker:** {ticker}"),
        format!("**Period:** {range}"),
    ];

    match PriceSummary::from_closes(closes) {
        Some(summary) => {
            lines.push(format!("**Start Price:** {:.2} USD", summary.start_price));
            lines.push(format!("**End Price:** {:.2} USD", summary.end_price));
            lines.push(format!("**Change:** {:+.2}%", summary.change_pct));
            lines.push(format!("**Volatility (std dev):** {:.2}", summary.volatility));
        }
        None if closes.len() >= 2 => lines.push(ZERO_START_NOTICE.to_string()),
        None => lines.push(INSUFFICIENT_DATA_NOTICE.to_string()),
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn june(start: u32, end: u32) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 6, start).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, end).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_msft_scenario() {
        let lines = statistics_block("MSFT", &june(1, 10), &[100.0, 105.0, 95.0, 110.0]);

        assert_eq!(
            lines,
            vec![
                "**Ticker:** MSFT",
                "**Period:** 2024-06-01 to 2024-06-10",
                "**Start Price:** 100.00 USD",
                "**End Price:** 110.00 USD",
                "**Change:** +10.00%",
                "**Volatility (std dev):** 6.45",
            ]
        );
    }

    #[test]
    fn test_change_matches_formula() {
        let series: [&[f64]; 4] = [
            &[50.0, 75.0],
            &[200.0, 180.0, 150.0],
            &[1.25, 1.5, 1.0, 1.75, 0.5],
            &[10.0, 10.0],
        ];

        for closes in series {
            let summary = PriceSummary::from_closes(closes).unwrap();
            let first = closes[0];
            let last = closes[closes.len() - 1];
            let expected = (last - first) / first * 100.0;
            assert!((summary.change_pct - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_negative_change_and_flat_volatility() {
        let summary = PriceSummary::from_closes(&[200.0, 150.0]).unwrap();
        assert!((summary.change_pct + 25.0).abs() < 1e-9);

        let flat = PriceSummary::from_closes(&[10.0, 10.0, 10.0]).unwrap();
        assert!(flat.volatility.abs() < 1e-12);

        let lines = statistics_block("T", &june(1, 2), &[200.0, 150.0]);
        assert_eq!(lines[4], "**Change:** -25.00%");
    }

    #[test]
    fn test_insufficient_data() {
        for closes in [&[][..], &[101.5][..]] {
            let lines = statistics_block("MSFT", &june(1, 1), closes);

            assert_eq!(lines.len(), 3);
            assert_eq!(lines[0], "**Ticker:** MSFT");
            assert!(lines[2].contains("insufficient data"));
            assert!(lines.iter().all(|l| !l.contains("Change") && !l.contains("Volatility")));
        }
        assert!(PriceSummary::from_closes(&[1.0]).is_none());
    }

    #[test]
    fn test_zero_start_price_skips_change() {
        assert!(PriceSummary::from_closes(&[0.0, 12.0]).is_none());
        assert!(PriceSummary::from_closes(&[12.0, 0.0]).is_some());

        let lines = statistics_block("ZERO", &june(1, 10), &[0.0, 5.0, 12.0]);

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], ZERO_START_NOTICE);
        assert!(lines.iter().all(|l| !l.contains("inf") && !l.contains("NaN")));
    }
}
