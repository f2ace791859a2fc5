// =============================================================================
// KDJ — stochastic oscillator with the J divergence line
// =============================================================================
//
//   RSV = (close − LL(n)) / (HH(n) − LL(n)) · 100
//   K   = smoothed RSV, alpha = 1/m, seeded at the first defined RSV
//   D   = smoothed K,   alpha = 1/m, same seeding
//   J   = 3K − 2D
//
// LL/HH are the lowest low and highest high over the trailing `n` bars. A
// zero range (HH == LL) yields RSV = 0. With the usual m = 3 the smoothing
// is K[i] = (2·K[i-1] + RSV[i]) / 3.

use crate::types::Bar;

/// Aligned KDJ output; every vector has the input's length.
#[derive(Debug, Clone)]
pub struct KdjOutput {
    pub k: Vec<Option<f64>>,
    pub d: Vec<Option<f64>>,
    pub j: Vec<Option<f64>>,
}

/// Compute KDJ over `bars` with RSV window `n` and smoothing span `m`
/// (conventionally 9 and 3).
///
/// # Edge cases
/// - `n == 0`, `m == 0`, or fewer bars than `n` => entirely undefined.
/// - HH == LL over a window => RSV 0 for that index.
pub fn kdj(bars: &[Bar], n: usize, m: usize) -> KdjOutput {
    let len = bars.len();
    let mut out = KdjOutput {
        k: vec![None; len],
        d: vec![None; len],
        j: vec![None; len],
    };
    if n == 0 || m == 0 || len < n {
        return out;
    }

    let alpha = 1.0 / m as f64;
    let mut k_prev: Option<f64> = None;
    let mut d_prev: Option<f64> = None;

    for i in (n - 1)..len {
        let window = &bars[i + 1 - n..=i];
        let hh = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let ll = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);

        let rsv = if hh == ll {
            0.0
        } else {
            (bars[i].close - ll) / (hh - ll) * 100.0
        };

        let k = match k_prev {
            Some(prev) => alpha * rsv + (1.0 - alpha) * prev,
            None => rsv,
        };
        let d = match d_prev {
            Some(prev) => alpha * k + (1.0 - alpha) * prev,
            None => k,
        };

        out.k[i] = Some(k);
        out.d[i] = Some(d);
        out.j[i] = Some(3.0 * k - 2.0 * d);
        k_prev = Some(k);
        d_prev = Some(d);
    }

    out
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
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                open: close,
                high,
                low,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn undefined_below_window() {
        let bars = bars_from(&[(10.0, 9.0, 9.5); 5]);
        let out = kdj(&bars, 9, 3);
        assert!(out.k.iter().all(Option::is_none));
    }

    #[test]
    fn first_defined_index_is_n_minus_1() {
        let rows: Vec<(f64, f64, f64)> = (0..12)
            .map(|i| (10.0 + i as f64, 9.0 + i as f64, 9.5 + i as f64))
            .collect();
        let out = kdj(&bars_from(&rows), 9, 3);
        assert!(out.k[7].is_none());
        assert!(out.k[8].is_some());
        assert!(out.d[8].is_some());
        assert!(out.j[8].is_some());
    }

    #[test]
    fn close_at_window_high_pushes_kdj_up() {
        // Close always equal to the window high => RSV 100 everywhere.
        let rows: Vec<(f64, f64, f64)> = (0..15)
            .map(|i| (10.0 + i as f64, 8.0, 10.0 + i as f64))
            .collect();
        let out = kdj(&bars_from(&rows), 9, 3);
        let last = out.k.last().unwrap().unwrap();
        assert!((last - 100.0).abs() < 1e-9);
        let j = out.j.last().unwrap().unwrap();
        assert!((j - 100.0).abs() < 1e-9);
    }

    #[test]
    fn zero_range_window_gives_zero_rsv() {
        let bars = bars_from(&[(10.0, 10.0, 10.0); 12]);
        let out = kdj(&bars, 9, 3);
        assert_eq!(out.k[8], Some(0.0));
        assert_eq!(out.d[8], Some(0.0));
        assert_eq!(out.j[8], Some(0.0));
    }

    #[test]
    fn j_is_three_k_minus_two_d() {
        let rows: Vec<(f64, f64, f64)> = (0..20)
            .map(|i| {
                let base = 100.0 + (i as f64 * 0.9).sin() * 10.0;
                (base + 1.0, base - 1.0, base)
            })
            .collect();
        let out = kdj(&bars_from(&rows), 9, 3);
        for i in 0..rows.len() {
            if let (Some(k), Some(d), Some(j)) = (out.k[i], out.d[i], out.j[i]) {
                assert!((j - (3.0 * k - 2.0 * d)).abs() < 1e-12);
            }
        }
    }
}
