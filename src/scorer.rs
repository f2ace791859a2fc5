// =============================================================================
// Trend Scorer — weighted multi-signal trend score over a weekly series
// =============================================================================
//
// Five signals are evaluated at the final bar of a weekly series, each
// yielding a normalized position in [-1, 1] that is multiplied by its weight:
//
//   Signal          Weight   Reads
//   BOLL %B         ±35      position of the close inside the bands
//   Volume          ±20      volume surge vs MA5/MA20 with price confirmation
//   RSI(14)         ±15      momentum bands
//   MACD            ±15      histogram / dif quadrant
//   MA alignment    ±15      close vs the 5/10/20 stack
//
// The total is the exact sum of the weighted positions; there is no clamp,
// so the natural range is ±100. A signal whose inputs are undefined at the
// final bar contributes 0 and is reported in `missing` rather than silently
// dropped.
//
// Labels partition the total with upper-bound-inclusive lower intervals:
// (30, ∞) strong uptrend, (10, 30] mild uptrend, (-10, 10] consolidation,
// (-30, -10] mild downtrend, (-∞, -30] strong downtrend.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::indicators::{bollinger, latest, macd, rsi, sma};
use crate::types::Series;

// =============================================================================
// Weights & labels
// =============================================================================

fn default_boll_weight() -> f64 {
    35.0
}

fn default_volume_weight() -> f64 {
    20.0
}

fn default_rsi_weight() -> f64 {
    15.0
}

fn default_macd_weight() -> f64 {
    15.0
}

fn default_ma_weight() -> f64 {
    15.0
}

/// Signal weights. Configuration data; the defaults sum to 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreWeights {
    #[serde(default = "default_boll_weight")]
    pub boll: f64,

    #[serde(default = "default_volume_weight")]
    pub volume: f64,

    #[serde(default = "default_rsi_weight")]
    pub rsi: f64,

    #[serde(default = "default_macd_weight")]
    pub macd: f64,

    #[serde(default = "default_ma_weight")]
    pub ma: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            boll: default_boll_weight(),
            volume: default_volume_weight(),
            rsi: default_rsi_weight(),
            macd: default_macd_weight(),
            ma: default_ma_weight(),
        }
    }
}

/// Qualitative bucket for a total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendLabel {
    StrongUptrend,
    MildUptrend,
    Consolidation,
    MildDowntrend,
    StrongDowntrend,
}

impl TrendLabel {
    /// Bucket a total score. Boundary values fall into the lower bucket.
    pub fn from_total(total: f64) -> Self {
        if total > 30.0 {
            Self::StrongUptrend
        } else if total > 10.0 {
            Self::MildUptrend
        } else if total > -10.0 {
            Self::Consolidation
        } else if total > -30.0 {
            Self::MildDowntrend
        } else {
            Self::StrongDowntrend
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StrongUptrend => "strong_uptrend",
            Self::MildUptrend => "mild_uptrend",
            Self::Consolidation => "consolidation",
            Self::MildDowntrend => "mild_downtrend",
            Self::StrongDowntrend => "strong_downtrend",
        }
    }
}

impl std::fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Result shapes
// =============================================================================

/// One signal's weighted contribution to the total.
#[derive(Debug, Clone, Serialize)]
pub struct Contribution {
    pub signal: &'static str,
    /// Normalized position in [-1, 1] before weighting.
    pub position: f64,
    pub weight: f64,
    pub points: f64,
}

/// Full scoring outcome for one symbol at one evaluation point.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreResult {
    pub symbol: String,
    pub evaluated_at: NaiveDate,
    pub total: f64,
    pub label: TrendLabel,
    pub contributions: Vec<Contribution>,
    /// Signals whose inputs were undefined at the evaluation point. Each
    /// contributed 0 to the total.
    pub missing: Vec<&'static str>,
}

// =============================================================================
// Scorer
// =============================================================================

/// Stateless scorer parameterized by a weight table.
#[derive(Debug, Clone)]
pub struct TrendScorer {
    weights: ScoreWeights,
}

impl TrendScorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    /// Score the final bar of a (weekly) series.
    ///
    /// # Edge cases
    /// - An empty series is `InsufficientData` (there is no evaluation
    ///   point at all).
    /// - Individual signals short on history contribute 0 and are listed in
    ///   `missing`; they never abort the scoring.
    pub fn score(&self, series: &Series) -> Result<ScoreResult> {
        let last = series.last().ok_or_else(|| {
            AnalysisError::InsufficientData(format!("{}: empty series", series.symbol()))
        })?;

        let closes = series.closes();
        let volumes = series.volumes();
        let close = last.close;

        let signals: [(&'static str, f64, Option<f64>); 5] = [
            ("boll", self.weights.boll, boll_position(&closes)),
            (
                "volume",
                self.weights.volume,
                volume_position(&closes, &volumes),
            ),
            ("rsi", self.weights.rsi, rsi_position(&closes)),
            ("macd", self.weights.macd, macd_position(&closes)),
            ("ma", self.weights.ma, ma_position(&closes, close)),
        ];

        let mut contributions = Vec::with_capacity(signals.len());
        let mut missing = Vec::new();
        let mut total = 0.0;

        for (signal, weight, position) in signals {
            match position {
                Some(position) => {
                    let points = position * weight;
                    total += points;
                    contributions.push(Contribution {
                        signal,
                        position,
                        weight,
                        points,
                    });
                }
                None => missing.push(signal),
            }
        }

        Ok(ScoreResult {
            symbol: series.symbol().to_string(),
            evaluated_at: last.date,
            total,
            label: TrendLabel::from_total(total),
            contributions,
            missing,
        })
    }
}

// =============================================================================
// Signal positions — each maps its latest readings into [-1, 1]
// =============================================================================

/// Position of the close inside the Bollinger bands (%B tiers). Low %B is
/// read as a buy zone, high %B as stretched.
fn boll_position(closes: &[f64]) -> Option<f64> {
    let out = bollinger(closes, 20, 2.0);
    let pb = latest(&out.percent_b)?;
    Some(if pb < 10.0 {
        1.0
    } else if pb < 20.0 {
        0.7
    } else if pb < 35.0 {
        0.4
    } else if pb > 90.0 {
        -1.0
    } else if pb > 80.0 {
        -0.7
    } else if pb > 65.0 {
        -0.4
    } else {
        0.0
    })
}

/// Volume surge relative to MA5 with price confirmation; falls back to the
/// slower MA5/MA20 trend when there is no surge.
fn volume_position(closes: &[f64], volumes: &[f64]) -> Option<f64> {
    let vol_ma5 = latest(&sma(volumes, 5))?;
    let vol_ma20 = latest(&sma(volumes, 20))?;
    let price_ma5 = latest(&sma(closes, 5))?;
    let current = *volumes.last()?;
    let close = *closes.last()?;

    if vol_ma5 <= 0.0 {
        return Some(0.0);
    }

    let ratio = current / vol_ma5;
    let rising = close > price_ma5;

    Some(if ratio > 2.0 {
        if rising {
            1.0
        } else {
            -1.0
        }
    } else if ratio > 1.5 {
        if rising {
            0.75
        } else {
            -0.75
        }
    } else if vol_ma20 > 0.0 && vol_ma5 / vol_ma20 > 1.2 {
        0.25
    } else if vol_ma20 > 0.0 && vol_ma5 / vol_ma20 < 0.8 {
        -0.25
    } else {
        0.0
    })
}

/// RSI(14) momentum bands; extremes score contrarian, the middle scores with
/// the prevailing side.
fn rsi_position(closes: &[f64]) -> Option<f64> {
    let value = latest(&rsi(closes, 14))?;
    Some(if value < 20.0 {
        1.0
    } else if value < 30.0 {
        2.0 / 3.0
    } else if value > 80.0 {
        -1.0
    } else if value > 70.0 {
        -2.0 / 3.0
    } else if value > 50.0 {
        1.0 / 3.0
    } else if value < 50.0 {
        -1.0 / 3.0
    } else {
        0.0
    })
}

/// MACD histogram / dif quadrant.
fn macd_position(closes: &[f64]) -> Option<f64> {
    let out = macd(closes, 12, 26, 9);
    let hist = latest(&out.histogram)?;
    let dif = latest(&out.dif)?;
    Some(if hist > 0.0 {
        if dif > 0.0 {
            1.0
        } else {
            0.5
        }
    } else if hist < 0.0 {
        if dif < 0.0 {
            -1.0
        } else {
            -0.5
        }
    } else {
        0.0
    })
}

/// Moving-average stack: full credit for close > MA5 > MA10 > MA20, partial
/// for a bullish stack the close has slipped below; mirrored for bears.
fn ma_position(closes: &[f64], close: f64) -> Option<f64> {
    let ma5 = latest(&sma(closes, 5))?;
    let ma10 = latest(&sma(closes, 10))?;
    let ma20 = latest(&sma(closes, 20))?;

    let bull_stack = ma5 > ma10 && ma10 > ma20;
    let bear_stack = ma5 < ma10 && ma10 < ma20;

    Some(if bull_stack && close > ma5 {
        1.0
    } else if bull_stack {
        2.0 / 3.0
    } else if bear_stack && close < ma5 {
        -1.0
    } else if bear_stack {
        -2.0 / 3.0
    } else {
        0.0
    })
}
