// =============================================================================
// Historical Analysis — weekly resampling, period statistics, composite trend
// =============================================================================
//
// Daily bars are rolled up into ISO weeks, then three trailing windows
// (13 / 26 / 52 weeks) are summarized and judged on a point scale. The
// composite trend score blends the current weekly signal score with the
// three period judgments:
//
//   composite = current · 0.4 + 13w · 0.2 + 26w · 0.2 + 52w · 0.2
//
// and maps to an advice bucket at thresholds 40 / 15 / -15 / -40 (lower
// bound inclusive).

use chrono::Datelike;
use serde::Serialize;

use crate::error::{AnalysisError, Result};
use crate::indicators::{bollinger, count_crosses, macd, rsi};
use crate::scorer::{ScoreResult, TrendScorer};
use crate::types::{Series, Timeframe};

// =============================================================================
// Weekly resampling
// =============================================================================

/// Aggregate daily bars into ISO-week bars: open of the first session, high
/// max, low min, close of the last session, summed volume. The week's date
/// is its last trading day.
///
/// # Edge cases
/// - A weekly input passes through unchanged.
/// - Partial weeks (holidays, the running week) aggregate whatever sessions
///   exist; a week is never dropped for being short.
pub fn resample_to_weekly(series: &Series) -> Result<Series> {
    if series.timeframe() == Timeframe::Weekly {
        return Ok(series.clone());
    }

    let mut weekly: Vec<crate::types::Bar> = Vec::new();
    let mut current_week: Option<(i32, u32)> = None;

    for bar in series.bars() {
        let iso = bar.date.iso_week();
        let week_key = (iso.year(), iso.week());

        match weekly.last_mut() {
            Some(last) if current_week == Some(week_key) => {
                last.high = last.high.max(bar.high);
                last.low = last.low.min(bar.low);
                last.close = bar.close;
                last.volume += bar.volume;
                last.date = bar.date;
            }
            _ => {
                current_week = Some(week_key);
                weekly.push(bar.clone());
            }
        }
    }

    Series::new(series.symbol(), Timeframe::Weekly, weekly)
}

// =============================================================================
// Period statistics
// =============================================================================

/// Distribution summary of an indicator over a period. Empty when the
/// indicator never became defined inside the window.
#[derive(Debug, Clone, Serialize)]
pub struct RangeStats {
    pub avg: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl RangeStats {
    fn over<'a>(values: impl Iterator<Item = &'a Option<f64>>) -> Self {
        let defined: Vec<f64> = values.flatten().copied().collect();
        if defined.is_empty() {
            return Self {
                avg: None,
                min: None,
                max: None,
            };
        }
        let sum: f64 = defined.iter().sum();
        Self {
            avg: Some(sum / defined.len() as f64),
            min: defined.iter().copied().reduce(f64::min),
            max: defined.iter().copied().reduce(f64::max),
        }
    }
}

/// Technical statistics over a trailing window of weekly bars.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodStats {
    /// Actual window length used (clamped to the available history).
    pub weeks: usize,
    /// First-to-last close change, percent.
    pub total_change: f64,
    /// Worst peak-to-trough decline, percent (non-positive).
    pub max_drawdown: f64,
    /// Best trough-to-peak advance, percent (non-negative).
    pub max_rally: f64,
    pub up_weeks: usize,
    pub down_weeks: usize,
    pub rsi: RangeStats,
    pub rsi_oversold_count: usize,
    pub rsi_overbought_count: usize,
    pub percent_b: RangeStats,
    pub pb_near_lower: usize,
    pub pb_near_upper: usize,
    pub macd_cross_up: usize,
    pub macd_cross_down: usize,
}

/// Summarize the trailing `weeks` bars of a weekly series.
///
/// # Edge cases
/// - `weeks` longer than the history clamps to the full series.
/// - Fewer than 2 bars is `InsufficientData` (no change to measure).
pub fn analyze_period(weekly: &Series, weeks: usize) -> Result<PeriodStats> {
    let window = weekly.tail(weeks);
    if window.len() < 2 {
        return Err(AnalysisError::InsufficientData(format!(
            "{}: {} weekly bars, need at least 2",
            weekly.symbol(),
            window.len()
        )));
    }

    let closes = window.closes();
    let first = closes[0];
    let last = closes[closes.len() - 1];
    let total_change = (last - first) / first * 100.0;

    let mut running_max = f64::MIN;
    let mut running_min = f64::MAX;
    let mut max_drawdown = 0.0_f64;
    let mut max_rally = 0.0_f64;
    for &close in &closes {
        running_max = running_max.max(close);
        running_min = running_min.min(close);
        max_drawdown = max_drawdown.min((close - running_max) / running_max * 100.0);
        max_rally = max_rally.max((close - running_min) / running_min * 100.0);
    }

    let mut up_weeks = 0;
    let mut down_weeks = 0;
    for pair in closes.windows(2) {
        if pair[1] > pair[0] {
            up_weeks += 1;
        } else if pair[1] < pair[0] {
            down_weeks += 1;
        }
    }

    let rsi_series = rsi(&closes, 14);
    let rsi_stats = RangeStats::over(rsi_series.iter());
    let rsi_oversold_count = rsi_series.iter().flatten().filter(|v| **v < 30.0).count();
    let rsi_overbought_count = rsi_series.iter().flatten().filter(|v| **v > 70.0).count();

    let boll = bollinger(&closes, 20, 2.0);
    let pb_stats = RangeStats::over(boll.percent_b.iter());
    let pb_near_lower = boll
        .percent_b
        .iter()
        .flatten()
        .filter(|v| **v < 20.0)
        .count();
    let pb_near_upper = boll
        .percent_b
        .iter()
        .flatten()
        .filter(|v| **v > 80.0)
        .count();

    let macd_out = macd(&closes, 12, 26, 9);
    let (macd_cross_up, macd_cross_down) = count_crosses(&macd_out.histogram);

    Ok(PeriodStats {
        weeks: window.len(),
        total_change,
        max_drawdown,
        max_rally,
        up_weeks,
        down_weeks,
        rsi: rsi_stats,
        rsi_oversold_count,
        rsi_overbought_count,
        percent_b: pb_stats,
        pb_near_lower,
        pb_near_upper,
        macd_cross_up,
        macd_cross_down,
    })
}

// =============================================================================
// Period judgment
// =============================================================================

/// Point score and human-readable notes for one trailing period.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodJudgment {
    pub score: i32,
    pub notes: Vec<String>,
}

/// Judge a period on six axes: price change (±30), drawdown (±20), weekly
/// win rate (±15), RSI history (±15), MACD crosses (±10), band touches
/// (±10).
pub fn judge_period(stats: &PeriodStats) -> PeriodJudgment {
    let mut score = 0;
    let mut notes = Vec::new();

    let change = stats.total_change;
    if change > 30.0 {
        score += 30;
        notes.push(format!("strong rise of {change:.1}%"));
    } else if change > 15.0 {
        score += 20;
        notes.push(format!("clear rise of {change:.1}%"));
    } else if change > 5.0 {
        score += 10;
        notes.push(format!("modest rise of {change:.1}%"));
    } else if change > -5.0 {
        notes.push(format!("sideways move of {change:.1}%"));
    } else if change > -15.0 {
        score -= 10;
        notes.push(format!("modest decline of {change:.1}%"));
    } else if change > -30.0 {
        score -= 20;
        notes.push(format!("clear decline of {change:.1}%"));
    } else {
        score -= 30;
        notes.push(format!("steep decline of {change:.1}%"));
    }

    let drawdown = stats.max_drawdown.abs();
    if drawdown < 5.0 {
        score += 20;
        notes.push(format!("minimal drawdown ({drawdown:.1}%)"));
    } else if drawdown < 10.0 {
        score += 10;
        notes.push(format!("contained drawdown ({drawdown:.1}%)"));
    } else if drawdown < 20.0 {
        notes.push(format!("moderate drawdown ({drawdown:.1}%)"));
    } else if drawdown < 30.0 {
        score -= 10;
        notes.push(format!("large drawdown ({drawdown:.1}%)"));
    } else {
        score -= 20;
        notes.push(format!("severe drawdown ({drawdown:.1}%)"));
    }

    let total_weeks = stats.up_weeks + stats.down_weeks;
    if total_weeks > 0 {
        let win_rate = stats.up_weeks as f64 / total_weeks as f64 * 100.0;
        if win_rate > 65.0 {
            score += 15;
            notes.push(format!("high weekly win rate ({win_rate:.0}%)"));
        } else if win_rate > 55.0 {
            score += 8;
            notes.push(format!("above-even weekly win rate ({win_rate:.0}%)"));
        } else if win_rate > 45.0 {
            notes.push(format!("balanced weekly win rate ({win_rate:.0}%)"));
        } else if win_rate > 35.0 {
            score -= 8;
            notes.push(format!("below-even weekly win rate ({win_rate:.0}%)"));
        } else {
            score -= 15;
            notes.push(format!("low weekly win rate ({win_rate:.0}%)"));
        }
    }

    if stats.rsi_oversold_count > stats.rsi_overbought_count + 2 {
        score += 15;
        notes.push(format!(
            "repeated RSI oversold readings ({})",
            stats.rsi_oversold_count
        ));
    } else if stats.rsi_overbought_count > stats.rsi_oversold_count + 2 {
        score -= 15;
        notes.push(format!(
            "repeated RSI overbought readings ({})",
            stats.rsi_overbought_count
        ));
    } else if let Some(avg) = stats.rsi.avg {
        if avg > 55.0 {
            score += 8;
            notes.push(format!("firm average RSI ({avg:.1})"));
        } else if avg < 45.0 {
            score -= 8;
            notes.push(format!("soft average RSI ({avg:.1})"));
        }
    }

    if stats.macd_cross_up > stats.macd_cross_down + 1 {
        score += 10;
        notes.push(format!("golden crosses dominate ({})", stats.macd_cross_up));
    } else if stats.macd_cross_down > stats.macd_cross_up + 1 {
        score -= 10;
        notes.push(format!("death crosses dominate ({})", stats.macd_cross_down));
    }

    if stats.pb_near_lower > stats.pb_near_upper + 2 {
        score += 10;
        notes.push(format!("repeated lower-band touches ({})", stats.pb_near_lower));
    } else if stats.pb_near_upper > stats.pb_near_lower + 2 {
        score -= 10;
        notes.push(format!("repeated upper-band touches ({})", stats.pb_near_upper));
    }

    PeriodJudgment { score, notes }
}

// =============================================================================
// Composite trend report
// =============================================================================

/// Advice bucket for a composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendAdvice {
    HoldOrAdd,
    LightPosition,
    Wait,
    Reduce,
    Avoid,
}

impl TrendAdvice {
    /// Thresholds 40 / 15 / -15 / -40, lower bound inclusive.
    pub fn from_composite(score: f64) -> Self {
        if score >= 40.0 {
            Self::HoldOrAdd
        } else if score >= 15.0 {
            Self::LightPosition
        } else if score >= -15.0 {
            Self::Wait
        } else if score >= -40.0 {
            Self::Reduce
        } else {
            Self::Avoid
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::HoldOrAdd => "strong uptrend; hold or add on dips",
            Self::LightPosition => "bullish bias; light position, watch for pullbacks",
            Self::Wait => "rangebound; wait for a clear direction",
            Self::Reduce => "bearish bias; reduce exposure",
            Self::Avoid => "weak downtrend; stand aside until it stabilizes",
        }
    }
}

/// One trailing window of a trend report.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodReport {
    pub stats: PeriodStats,
    pub judgment: PeriodJudgment,
}

/// Multi-period trend report for one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    pub symbol: String,
    pub latest_close: f64,
    pub current: ScoreResult,
    pub quarter: PeriodReport,
    pub half_year: PeriodReport,
    pub year: PeriodReport,
    pub composite: f64,
    pub advice: TrendAdvice,
    pub advice_note: &'static str,
}

/// Build the composite trend report from a daily series.
///
/// # Edge cases
/// - Fewer than 30 weekly bars after resampling is `InsufficientData`; the
///   52-week window itself clamps rather than failing.
pub fn multi_period_trend(daily: &Series, scorer: &TrendScorer) -> Result<TrendReport> {
    let weekly = resample_to_weekly(daily)?;
    if weekly.len() < 30 {
        return Err(AnalysisError::InsufficientData(format!(
            "{}: {} weekly bars, need at least 30 for trend analysis",
            daily.symbol(),
            weekly.len()
        )));
    }

    let current = scorer.score(&weekly)?;
    let latest_close = weekly
        .last()
        .map(|b| b.close)
        .ok_or_else(|| AnalysisError::InsufficientData("empty weekly series".into()))?;

    let quarter_stats = analyze_period(&weekly, 13)?;
    let half_stats = analyze_period(&weekly, 26)?;
    let year_stats = analyze_period(&weekly, 52)?;

    let quarter = PeriodReport {
        judgment: judge_period(&quarter_stats),
        stats: quarter_stats,
    };
    let half_year = PeriodReport {
        judgment: judge_period(&half_stats),
        stats: half_stats,
    };
    let year = PeriodReport {
        judgment: judge_period(&year_stats),
        stats: year_stats,
    };

    let composite = current.total * 0.4
        + quarter.judgment.score as f64 * 0.2
        + half_year.judgment.score as f64 * 0.2
        + year.judgment.score as f64 * 0.2;

    let advice = TrendAdvice::from_composite(composite);
    Ok(TrendReport {
        symbol: daily.symbol().to_string(),
        latest_close,
        current,
        quarter,
        half_year,
        year,
        composite,
        advice,
        advice_note: advice.describe(),
    })
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::{ScoreWeights, TrendScorer};
    use crate::types::Bar;
    use chrono::{Duration, NaiveDate};

    fn daily_series(closes: &[f64]) -> Series {
        // Monday 2024-01-01 start; weekends skipped so ISO weeks hold 5 bars.
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut date = start;
        let bars: Vec<Bar> = closes
            .iter()
            .map(|&close| {
                while matches!(
                    date.weekday(),
                    chrono::Weekday::Sat | chrono::Weekday::Sun
                ) {
                    date += Duration::days(1);
                }
                let bar = Bar {
                    date,
                    open: close,
                    high: close + 1.0,
                    low: (close - 1.0).max(0.0),
                    close,
                    volume: 100.0,
                };
                date += Duration::days(1);
                bar
            })
            .collect();
        Series::new("510300", Timeframe::Daily, bars).unwrap()
    }

    fn weekly_series(closes: &[f64]) -> Series {
        let start = NaiveDate::from_ymd_opt(2023, 1, 6).unwrap();
        let bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                date: start + Duration::weeks(i as i64),
                open: close,
                high: close + 1.0,
                low: (close - 1.0).max(0.0),
                close,
                volume: 100.0,
            })
            .collect();
        Series::new("510300", Timeframe::Weekly, bars).unwrap()
    }

    #[test]
    fn resample_aggregates_one_week() {
        // Five sessions in one ISO week.
        let closes = [10.0, 11.0, 9.0, 12.0, 11.5];
        let weekly = resample_to_weekly(&daily_series(&closes)).unwrap();
        assert_eq!(weekly.len(), 1);
        let bar = &weekly.bars()[0];
        assert_eq!(bar.open, 10.0);
        assert_eq!(bar.high, 13.0); // 12 + 1
        assert_eq!(bar.low, 8.0); // 9 - 1
        assert_eq!(bar.close, 11.5);
        assert_eq!(bar.volume, 500.0);
        // Labelled with the last session of the week.
        assert_eq!(bar.date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[test]
    fn resample_splits_weeks() {
        let closes: Vec<f64> = (0..10).map(|i| 10.0 + i as f64).collect();
        let weekly = resample_to_weekly(&daily_series(&closes)).unwrap();
        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly.bars()[0].close, 14.0);
        assert_eq!(weekly.bars()[1].close, 19.0);
    }

    #[test]
    fn resample_weekly_passthrough() {
        let weekly = weekly_series(&[1.0, 2.0, 3.0]);
        let out = resample_to_weekly(&weekly).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn period_stats_on_monotone_rise() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let stats = analyze_period(&weekly_series(&closes), 30).unwrap();
        assert_eq!(stats.weeks, 30);
        assert!((stats.total_change - 29.0).abs() < 1e-9);
        assert_eq!(stats.max_drawdown, 0.0);
        assert!((stats.max_rally - 29.0).abs() < 1e-9);
        assert_eq!(stats.up_weeks, 29);
        assert_eq!(stats.down_weeks, 0);
        // A straight rise pins RSI at 100.
        assert!(stats.rsi.min.unwrap() > 99.0);
        assert_eq!(stats.rsi_oversold_count, 0);
        assert!(stats.rsi_overbought_count > 0);
    }

    #[test]
    fn period_stats_measure_drawdown() {
        // Rise to 120, fall to 90, recover to 105.
        let closes = [
            100.0, 105.0, 110.0, 115.0, 120.0, 110.0, 100.0, 90.0, 95.0, 105.0,
        ];
        let stats = analyze_period(&weekly_series(&closes), 10).unwrap();
        assert!((stats.max_drawdown - (-25.0)).abs() < 1e-9);
        assert!((stats.max_rally - 20.0).abs() < 1e-9); // 120 from 100 trough
        assert_eq!(stats.up_weeks + stats.down_weeks, 9);
    }

    #[test]
    fn period_window_clamps_to_history() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let stats = analyze_period(&weekly_series(&closes), 52).unwrap();
        assert_eq!(stats.weeks, 10);
        // Too short for RSI(14): no defined values, empty stats.
        assert!(stats.rsi.avg.is_none());
    }

    #[test]
    fn period_needs_two_bars() {
        let err = analyze_period(&weekly_series(&[100.0]), 13).unwrap_err();
        assert_eq!(err.kind(), "insufficient_data");
    }

    #[test]
    fn judgment_rewards_steady_rise() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let stats = analyze_period(&weekly_series(&closes), 30).unwrap();
        let judgment = judge_period(&stats);
        // Rise > 30% (+30), zero drawdown (+20), perfect win rate (+15);
        // the relentless rise also pins RSI and %B high (-15, -10).
        assert_eq!(judgment.score, 40);
        assert!(!judgment.notes.is_empty());
    }

    #[test]
    fn judgment_punishes_collapse() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 * 0.97f64.powi(i)).collect();
        let stats = analyze_period(&weekly_series(&closes), 30).unwrap();
        let judgment = judge_period(&stats);
        // Steep decline, deep drawdown, zero win rate; partially offset by
        // oversold RSI and lower-band touches reading as contrarian value.
        assert_eq!(judgment.score, -40);
    }

    #[test]
    fn advice_thresholds_are_lower_inclusive() {
        assert_eq!(TrendAdvice::from_composite(40.0), TrendAdvice::HoldOrAdd);
        assert_eq!(TrendAdvice::from_composite(39.9), TrendAdvice::LightPosition);
        assert_eq!(TrendAdvice::from_composite(15.0), TrendAdvice::LightPosition);
        assert_eq!(TrendAdvice::from_composite(0.0), TrendAdvice::Wait);
        assert_eq!(TrendAdvice::from_composite(-15.0), TrendAdvice::Wait);
        assert_eq!(TrendAdvice::from_composite(-15.1), TrendAdvice::Reduce);
        assert_eq!(TrendAdvice::from_composite(-40.0), TrendAdvice::Reduce);
        assert_eq!(TrendAdvice::from_composite(-40.1), TrendAdvice::Avoid);
    }

    #[test]
    fn trend_report_needs_thirty_weeks() {
        let closes: Vec<f64> = (0..50).map(|i| 100.0 + i as f64 * 0.1).collect();
        let scorer = TrendScorer::new(ScoreWeights::default());
        let err = multi_period_trend(&daily_series(&closes), &scorer).unwrap_err();
        assert_eq!(err.kind(), "insufficient_data");
    }

    #[test]
    fn trend_report_composite_blends_periods() {
        // 60 weeks of gentle rise: every period judgment is positive and the
        // composite lands in bullish territory.
        let closes: Vec<f64> = (0..300).map(|i| 100.0 * 1.001f64.powi(i)).collect();
        let scorer = TrendScorer::new(ScoreWeights::default());
        let report = multi_period_trend(&daily_series(&closes), &scorer).unwrap();

        assert_eq!(report.symbol, "510300");
        assert!(report.quarter.judgment.score > 0);
        assert!(report.half_year.judgment.score > 0);
        assert!(report.year.judgment.score > 0);

        let expected = report.current.total * 0.4
            + report.quarter.judgment.score as f64 * 0.2
            + report.half_year.judgment.score as f64 * 0.2
            + report.year.judgment.score as f64 * 0.2;
        assert!((report.composite - expected).abs() < 1e-9);
        assert_eq!(report.advice, TrendAdvice::from_composite(report.composite));
    }
}
