// =============================================================================
// MACD — Moving Average Convergence Divergence
// =============================================================================
//
//   dif       = EMA(close, fast) − EMA(close, slow)
//   dea       = EMA(dif, signal)
//   histogram = dif − dea
//
// A golden cross is the histogram turning from negative to positive (dif
// crossing above dea); a death cross is the opposite transition. All three
// output series are aligned with the input closes.

use super::ma::ema;

/// Aligned MACD output; every vector has the input's length.
#[derive(Debug, Clone)]
pub struct MacdOutput {
    pub dif: Vec<Option<f64>>,
    pub dea: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

/// Compute MACD over `closes` with the given periods (conventionally
/// 12 / 26 / 9).
///
/// # Edge cases
/// - Any period zero, `fast >= slow`, or fewer closes than `max(slow,
///   signal)` => entirely undefined result.
/// - A non-finite close poisons that index and all later ones, inherited
///   from the underlying EMAs.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdOutput {
    let n = closes.len();
    let undefined = MacdOutput {
        dif: vec![None; n],
        dea: vec![None; n],
        histogram: vec![None; n],
    };
    if fast == 0 || slow == 0 || signal == 0 || fast >= slow || n < slow.max(signal) {
        return undefined;
    }

    let ema_fast = ema(closes, fast);
    let ema_slow = ema(closes, slow);

    let mut dif = vec![None; n];
    for i in 0..n {
        if let (Some(f), Some(s)) = (ema_fast[i], ema_slow[i]) {
            dif[i] = Some(f - s);
        }
    }

    // dif is defined from index 0 (or not at all), so the signal EMA runs
    // over the defined prefix directly.
    let dif_values: Vec<f64> = dif.iter().map_while(|v| *v).collect();
    let dea_prefix = ema(&dif_values, signal);

    let mut dea = vec![None; n];
    let mut histogram = vec![None; n];
    for (i, d) in dea_prefix.into_iter().enumerate() {
        dea[i] = d;
        if let (Some(a), Some(b)) = (dif[i], d) {
            histogram[i] = Some(a - b);
        }
    }

    MacdOutput {
        dif,
        dea,
        histogram,
    }
}

/// Count golden and death crosses in a histogram series.
///
/// A cross is a sign transition between consecutive defined entries; zero
/// values carry the previous sign forward, so touching zero without crossing
/// is not counted.
pub fn count_crosses(histogram: &[Option<f64>]) -> (usize, usize) {
    let mut golden = 0;
    let mut death = 0;
    let mut prev_sign = 0i8;

    for value in histogram.iter().flatten() {
        let sign = if *value > 0.0 {
            1
        } else if *value < 0.0 {
            -1
        } else {
            prev_sign
        };
        if prev_sign == -1 && sign == 1 {
            golden += 1;
        } else if prev_sign == 1 && sign == -1 {
            death += 1;
        }
        prev_sign = sign;
    }

    (golden, death)
}
