// =============================================================================
// Moving Averages — simple (SMA) and exponential (EMA)
// =============================================================================
//
// Both functions return a vector aligned index-for-index with the input:
// entries where the indicator is undefined are `None`, never a placeholder
// zero. This lets callers overlay any indicator on the source series without
// bookkeeping offsets.
//
// SMA: arithmetic mean over a trailing window of `period` values; the first
// `period - 1` entries are undefined.
//
// EMA: recursive smoothing with multiplier 2 / (period + 1), seeded from the
// first value and therefore defined from index 0 — but only when the input
// carries at least `period` values, otherwise the whole result is undefined.

/// Simple moving average over a trailing window.
///
/// # Edge cases
/// - `period == 0` or `period > values.len()` => entirely undefined result.
/// - A window containing a non-finite value yields `None` at that index only.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        if window.iter().all(|v| v.is_finite()) {
            out[i] = Some(window.iter().sum::<f64>() / period as f64);
        }
    }
    out
}

/// Exponential moving average, multiplier 2 / (period + 1), seeded from the
/// first value.
///
/// # Edge cases
/// - `period == 0` or `period > values.len()` => entirely undefined result.
/// - A non-finite input poisons that index and every later one (the
///   recursion cannot recover once its state is lost).
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = match values.first() {
        Some(v) if v.is_finite() => *v,
        _ => return out,
    };
    out[0] = Some(prev);

    for (i, &v) in values.iter().enumerate().skip(1) {
        if !v.is_finite() {
            break;
        }
        prev = alpha * v + (1.0 - alpha) * prev;
        out[i] = Some(prev);
    }
    out
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_undefined_prefix_then_means() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_eq!(out[2], Some(2.0));
        assert_eq!(out[3], Some(3.0));
        assert_eq!(out[4], Some(4.0));
    }

    #[test]
    fn sma_window_longer_than_input() {
        let out = sma(&[1.0, 2.0], 5);
        assert_eq!(out, vec![None, None]);
    }

    #[test]
    fn sma_period_zero() {
        assert_eq!(sma(&[1.0, 2.0], 0), vec![None, None]);
    }

    #[test]
    fn sma_nan_poisons_only_its_windows() {
        let out = sma(&[1.0, f64::NAN, 3.0, 4.0, 5.0], 2);
        assert_eq!(out[1], None);
        assert_eq!(out[2], None);
        assert_eq!(out[3], Some(3.5));
        assert_eq!(out[4], Some(4.5));
    }

    #[test]
    fn ema_defined_from_first_index() {
        let out = ema(&[2.0, 4.0, 6.0, 8.0], 3);
        assert_eq!(out[0], Some(2.0));
        // alpha = 0.5: 0.5*4 + 0.5*2 = 3
        assert_eq!(out[1], Some(3.0));
        assert_eq!(out[2], Some(4.5));
        assert_eq!(out[3], Some(6.25));
    }

    #[test]
    fn ema_short_input_entirely_undefined() {
        assert_eq!(ema(&[1.0, 2.0], 3), vec![None, None]);
    }

    #[test]
    fn ema_flat_input_stays_flat() {
        let out = ema(&[5.0; 10], 4);
        for v in out {
            assert_eq!(v, Some(5.0));
        }
    }

    #[test]
    fn ema_nan_poisons_remainder() {
        let out = ema(&[1.0, 2.0, f64::NAN, 4.0, 5.0], 2);
        assert!(out[0].is_some());
        assert!(out[1].is_some());
        assert_eq!(out[2], None);
        assert_eq!(out[3], None);
        assert_eq!(out[4], None);
    }
}
