// =============================================================================
// Bollinger Bands — SMA middle band with standard-deviation envelopes
// =============================================================================
//
// Middle band = SMA(period); upper/lower = middle ± k · population standard
// deviation of the same window. Two derived series are computed alongside:
//
//   %B        = (close − lower) / (upper − lower) · 100
//   bandwidth = (upper − lower) / middle · 100
//
// %B > 100 means the close sits above the upper band, %B < 0 below the lower
// band. When the band width is zero (a perfectly flat window) %B is defined
// as 50: the close is trivially at the middle of a degenerate band.

use super::ma::sma;

/// Aligned Bollinger output; every vector has the input's length.
#[derive(Debug, Clone)]
pub struct BollOutput {
    pub middle: Vec<Option<f64>>,
    pub upper: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
    pub percent_b: Vec<Option<f64>>,
    pub bandwidth: Vec<Option<f64>>,
}

/// Compute Bollinger bands over `closes`.
///
/// # Edge cases
/// - `period == 0` or `period > closes.len()` => entirely undefined result.
/// - A window containing a non-finite close is undefined at that index.
/// - Zero band width => %B is 50, bandwidth is 0.
/// - `bandwidth` is undefined when the middle band is zero.
pub fn bollinger(closes: &[f64], period: usize, k: f64) -> BollOutput {
    let n = closes.len();
    let middle = sma(closes, period);
    let mut upper = vec![None; n];
    let mut lower = vec![None; n];
    let mut percent_b = vec![None; n];
    let mut bandwidth = vec![None; n];

    for i in 0..n {
        let Some(mid) = middle[i] else { continue };

        let window = &closes[i + 1 - period..=i];
        let variance = window.iter().map(|c| (c - mid).powi(2)).sum::<f64>() / period as f64;
        let sd = variance.sqrt();

        let up = mid + k * sd;
        let lo = mid - k * sd;
        upper[i] = Some(up);
        lower[i] = Some(lo);

        let width = up - lo;
        percent_b[i] = if width == 0.0 {
            Some(50.0)
        } else {
            Some((closes[i] - lo) / width * 100.0)
        };
        bandwidth[i] = if mid == 0.0 {
            None
        } else {
            Some(width / mid * 100.0)
        };
    }

    BollOutput {
        middle,
        upper,
        lower,
        percent_b,
        bandwidth,
    }
}
