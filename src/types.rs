// =============================================================================
// Shared data types — bars, series, quotes
// =============================================================================
//
// `Series` is the only entry point for provider data into the analysis core:
// its constructor enforces ascending dates, no duplicate timestamps, and
// finite non-negative fields, so every downstream computation can rely on a
// well-formed input without re-checking.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// One time step of OHLCV market data (daily or weekly granularity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// All fields finite and non-negative.
    pub fn is_valid(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// Granularity of a bar series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Daily,
    Weekly,
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
        }
    }
}

impl std::str::FromStr for Timeframe {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            other => Err(AnalysisError::InvalidParameter(format!(
                "unknown timeframe '{other}' (expected 'daily' or 'weekly')"
            ))),
        }
    }
}

/// An ordered, time-ascending sequence of bars for one symbol.
///
/// Ordering is a correctness invariant: all indicator math assumes ascending
/// dates and no duplicates, which [`Series::new`] enforces.
#[derive(Debug, Clone, Serialize)]
pub struct Series {
    symbol: String,
    timeframe: Timeframe,
    bars: Vec<Bar>,
}

impl Series {
    /// Validate and construct a series.
    ///
    /// Rejects with `InvalidParameter` when:
    /// - `symbol` is empty,
    /// - dates are not strictly ascending (covers duplicates),
    /// - any bar carries a non-finite or negative field.
    pub fn new(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        bars: Vec<Bar>,
    ) -> Result<Self, AnalysisError> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(AnalysisError::InvalidParameter("empty symbol".into()));
        }

        for window in bars.windows(2) {
            if window[1].date <= window[0].date {
                return Err(AnalysisError::InvalidParameter(format!(
                    "bars out of order or duplicated at {}",
                    window[1].date
                )));
            }
        }

        if let Some(bad) = bars.iter().find(|b| !b.is_valid()) {
            return Err(AnalysisError::InvalidParameter(format!(
                "bar at {} has non-finite or negative fields",
                bad.date
            )));
        }

        Ok(Self {
            symbol,
            timeframe,
            bars,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// Keep only the trailing `n` bars (no-op when the series is shorter).
    pub fn tail(&self, n: usize) -> Series {
        let start = self.bars.len().saturating_sub(n);
        Series {
            symbol: self.symbol.clone(),
            timeframe: self.timeframe,
            bars: self.bars[start..].to_vec(),
        }
    }
}

/// A realtime quote row from the provider's spot table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change_pct: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub prev_close: f64,
    pub volume: f64,
    /// Traded value, used for liquidity ranking.
    pub turnover: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close + 1.0,
            low: (close - 1.0).max(0.0),
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn accepts_ascending_bars() {
        let s = Series::new("510300", Timeframe::Daily, vec![bar(1, 10.0), bar(2, 11.0)]);
        assert!(s.is_ok());
        assert_eq!(s.unwrap().len(), 2);
    }

    #[test]
    fn rejects_empty_symbol() {
        let err = Series::new("  ", Timeframe::Daily, vec![]).unwrap_err();
        assert_eq!(err.kind(), "invalid_parameter");
    }

    #[test]
    fn rejects_out_of_order_dates() {
        let err =
            Series::new("510300", Timeframe::Daily, vec![bar(2, 10.0), bar(1, 11.0)]).unwrap_err();
        assert_eq!(err.kind(), "invalid_parameter");
    }

    #[test]
    fn rejects_duplicate_dates() {
        let err =
            Series::new("510300", Timeframe::Daily, vec![bar(1, 10.0), bar(1, 11.0)]).unwrap_err();
        assert_eq!(err.kind(), "invalid_parameter");
    }

    #[test]
    fn rejects_nan_fields() {
        let mut b = bar(1, 10.0);
        b.close = f64::NAN;
        let err = Series::new("510300", Timeframe::Daily, vec![b]).unwrap_err();
        assert_eq!(err.kind(), "invalid_parameter");
    }

    #[test]
    fn rejects_negative_price() {
        let mut b = bar(1, 10.0);
        b.low = -0.5;
        assert!(Series::new("510300", Timeframe::Daily, vec![b]).is_err());
    }

    #[test]
    fn tail_keeps_trailing_bars() {
        let s = Series::new(
            "510300",
            Timeframe::Daily,
            (1..=5).map(|d| bar(d, d as f64 + 10.0)).collect(),
        )
        .unwrap();
        let t = s.tail(2);
        assert_eq!(t.len(), 2);
        assert_eq!(t.closes(), vec![14.0, 15.0]);
        assert_eq!(s.tail(10).len(), 5);
    }

    #[test]
    fn timeframe_parses_case_insensitively() {
        assert_eq!("Weekly".parse::<Timeframe>().unwrap(), Timeframe::Weekly);
        assert!("hourly".parse::<Timeframe>().is_err());
    }
}
