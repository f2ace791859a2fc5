// =============================================================================
// On-Balance Volume (OBV) — cumulative signed volume
// =============================================================================
//
// OBV starts at zero and adds each bar's volume when the close rises,
// subtracts it when the close falls, and carries the running total unchanged
// on a flat close. Rising OBV alongside rising price confirms the move;
// diverging OBV warns that volume is not backing it.

use crate::types::Bar;

/// Compute the OBV series over `bars`, aligned index-for-index and defined
/// from index 0 (the seed value is 0).
pub fn obv(bars: &[Bar]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(bars.len());
    let mut total = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i > 0 {
            let prev_close = bars[i - 1].close;
            if bar.close > prev_close {
                total += bar.volume;
            } else if bar.close < prev_close {
                total -= bar.volume;
            }
        }
        out.push(Some(total));
    }

    out
}
