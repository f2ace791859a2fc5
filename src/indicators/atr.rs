// =============================================================================
// Average True Range (ATR) — rolling mean of the true range
// =============================================================================
//
// True range per bar:
//   TR = max(high − low, |high − prev_close|, |low − prev_close|)
// with the first bar's TR defined as high − low (no previous close).
//
// ATR is the simple rolling mean of TR over `period` bars, so the first
// `period − 1` entries are undefined.

use crate::types::Bar;

use super::ma::sma;

/// Compute the ATR series over `bars`, aligned index-for-index.
///
/// # Edge cases
/// - `period == 0` or `period > bars.len()` => entirely undefined result.
pub fn atr(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    if period == 0 || bars.len() < period {
        return vec![None; bars.len()];
    }

    let mut tr = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let value = if i == 0 {
            bar.high - bar.low
        } else {
            let prev_close = bars[i - 1].close;
            (bar.high - bar.low)
                .max((bar.high - prev_close).abs())
                .max((bar.low - prev_close).abs())
        };
        tr.push(value);
    }

    sma(&tr, period)
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bars_from(rows: &[(f64, f64, f64)]) -> Vec<Bar> {
        rows.iter()
            .enumerate()
            .map(|(i, &(high, low, close))| Bar {
                date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                open: close,
                high,
                low,
                close,
                volume: 500.0,
            })
            .collect()
    }

    #[test]
    fn undefined_on_short_input() {
        let bars = bars_from(&[(10.0, 9.0, 9.5); 3]);
        assert!(atr(&bars, 14).iter().all(Option::is_none));
    }

    #[test]
    fn period_zero_is_undefined() {
        let bars = bars_from(&[(10.0, 9.0, 9.5); 3]);
        assert!(atr(&bars, 0).iter().all(Option::is_none));
    }

    #[test]
    fn constant_range_bars_give_constant_atr() {
        // Every bar spans exactly 1.0 and closes where the next opens, so
        // every TR is 1.0 and so is the ATR.
        let rows: Vec<(f64, f64, f64)> = (0..10).map(|i| (10.0 + i as f64, 9.0 + i as f64, 10.0 + i as f64)).collect();
        let out = atr(&bars_from(&rows), 3);
        assert!(out[1].is_none());
        for v in out.iter().skip(2) {
            assert!((v.unwrap() - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn gap_expands_true_range() {
        // Third bar gaps up: TR uses |high - prev_close| = 5.
        let rows = [
            (10.0, 9.0, 9.5),
            (10.0, 9.0, 9.5),
            (14.5, 13.5, 14.0),
        ];
        let out = atr(&bars_from(&rows), 3);
        // TRs: 1.0, 1.0, 5.0 => ATR = 7/3.
        assert!((out[2].unwrap() - 7.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn first_bar_uses_high_minus_low() {
        let rows = [(12.0, 9.0, 10.0)];
        let out = atr(&bars_from(&rows), 1);
        assert!((out[0].unwrap() - 3.0).abs() < 1e-10);
    }
}
