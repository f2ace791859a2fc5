// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator implementations. Every function returns a
// vector aligned index-for-index with its input series; undefined entries are
// `None`, never zero, so callers can overlay results without offset
// bookkeeping.

pub mod atr;
pub mod bollinger;
pub mod kdj;
pub mod ma;
pub mod macd;
pub mod obv;
pub mod rsi;

pub use atr::atr;
pub use bollinger::{bollinger, BollOutput};
pub use kdj::{kdj, KdjOutput};
pub use ma::{ema, sma};
pub use macd::{count_crosses, macd, MacdOutput};
pub use obv::obv;
pub use rsi::rsi;

/// Most recent defined value of an aligned indicator series.
pub fn latest(series: &[Option<f64>]) -> Option<f64> {
    series.last().copied().flatten()
}
