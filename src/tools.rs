// =============================================================================
// Callable Operations — the public analysis surface
// =============================================================================
//
// Every operation is a plain `async fn(&AppState, inputs) -> Result<T>`;
// the REST adapter only serializes these. Inputs are validated up front
// (`InvalidParameter`), upstream data flows through the TTL cache, and one
// symbol's failure inside a batch never aborts its siblings.

use chrono::NaiveDate;
use futures_util::future::join_all;
use serde::Serialize;
use tracing::info;

use crate::analysis::{multi_period_trend, TrendReport};
use crate::app_state::AppState;
use crate::cache::{CacheCategory, CacheStats};
use crate::error::{AnalysisError, Result};
use crate::indicators::{atr, bollinger, kdj, latest, macd, obv, rsi, sma};
use crate::provider::{CalendarEvent, MacroPoint};
use crate::types::{Quote, Series, Timeframe};

// =============================================================================
// Cached fetch helpers
// =============================================================================

async fn cached_etf_spot(state: &AppState) -> Result<Vec<Quote>> {
    state
        .cache
        .get_or_compute(CacheCategory::Realtime, "etf_spot", || {
            state.provider.fetch_etf_spot()
        })
        .await
}

async fn cached_index_spot(state: &AppState) -> Result<Vec<Quote>> {
    state
        .cache
        .get_or_compute(CacheCategory::Realtime, "index_spot", || {
            state.provider.fetch_index_spot()
        })
        .await
}

async fn cached_history(
    state: &AppState,
    symbol: &str,
    timeframe: Timeframe,
    days: u32,
) -> Result<Series> {
    let key = format!("hist:{symbol}:{timeframe}:{days}");
    state
        .cache
        .get_or_compute(CacheCategory::Historical, &key, || {
            state.provider.fetch_history(symbol, timeframe, days)
        })
        .await
}

// =============================================================================
// 1. Search
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct EtfMatch {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change_pct: f64,
}

impl From<&Quote> for EtfMatch {
    fn from(q: &Quote) -> Self {
        Self {
            symbol: q.symbol.clone(),
            name: q.name.clone(),
            price: q.price,
            change_pct: q.change_pct,
        }
    }
}

/// Case-insensitive substring search over ETF names and codes; at most 10
/// matches. No match is an empty list, not an error.
pub async fn search_etf(state: &AppState, keyword: &str) -> Result<Vec<EtfMatch>> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Err(AnalysisError::InvalidParameter(
            "search keyword is empty".into(),
        ));
    }

    let spot = cached_etf_spot(state).await?;
    let needle = keyword.to_lowercase();
    Ok(spot
        .iter()
        .filter(|q| q.name.to_lowercase().contains(&needle) || q.symbol.contains(keyword))
        .take(10)
        .map(EtfMatch::from)
        .collect())
}

// =============================================================================
// 2. Realtime quote
// =============================================================================

/// Latest spot quote for one symbol.
pub async fn realtime_quote(state: &AppState, symbol: &str) -> Result<Quote> {
    if symbol.trim().is_empty() {
        return Err(AnalysisError::InvalidParameter("empty symbol".into()));
    }
    let spot = cached_etf_spot(state).await?;
    spot.into_iter()
        .find(|q| q.symbol == symbol)
        .ok_or_else(|| AnalysisError::SymbolNotFound(symbol.to_string()))
}

// =============================================================================
// 3. Technical indicators
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct MaReadings {
    pub ma5: Option<f64>,
    pub ma10: Option<f64>,
    pub ma20: Option<f64>,
    pub ma60: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BollReadings {
    pub middle: Option<f64>,
    pub upper: Option<f64>,
    pub lower: Option<f64>,
    pub percent_b: Option<f64>,
    pub bandwidth: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RsiReadings {
    pub rsi6: Option<f64>,
    pub rsi12: Option<f64>,
    pub rsi14: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MacdReadings {
    pub dif: Option<f64>,
    pub dea: Option<f64>,
    pub histogram: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KdjReadings {
    pub k: Option<f64>,
    pub d: Option<f64>,
    pub j: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VolumeReadings {
    pub current: f64,
    pub ma5: Option<f64>,
    /// Current volume over its 5-period average.
    pub ratio: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignalSummary {
    pub bullish: Vec<String>,
    pub bearish: Vec<String>,
    pub neutral: Vec<String>,
    pub overall: &'static str,
}

/// Latest values of every indicator for one symbol, plus a signal summary.
/// Indicators without enough history are `None`, never zero.
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorReport {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub as_of: NaiveDate,
    pub close: f64,
    pub change_pct: Option<f64>,
    pub ma: MaReadings,
    pub boll: BollReadings,
    pub rsi: RsiReadings,
    pub macd: MacdReadings,
    pub kdj: KdjReadings,
    pub atr14: Option<f64>,
    pub obv: Option<f64>,
    pub volume: VolumeReadings,
    pub signals: SignalSummary,
}

/// Compute the full indicator report for one symbol.
///
/// Weekly reports resample two years of daily history; daily reports use the
/// most recent year.
pub async fn technical_indicators(
    state: &AppState,
    symbol: &str,
    timeframe: Timeframe,
) -> Result<IndicatorReport> {
    let series = match timeframe {
        Timeframe::Daily => cached_history(state, symbol, Timeframe::Daily, 365).await?,
        Timeframe::Weekly => {
            let daily = cached_history(state, symbol, Timeframe::Daily, 730).await?;
            crate::analysis::resample_to_weekly(&daily)?
        }
    };
    Ok(indicator_report(&series))
}

/// Pure report construction over an already-fetched series.
pub fn indicator_report(series: &Series) -> IndicatorReport {
    let bars = series.bars();
    let closes = series.closes();
    let volumes = series.volumes();
    let close = closes.last().copied().unwrap_or(0.0);

    let change_pct = (bars.len() >= 2).then(|| {
        let prev = bars[bars.len() - 2].close;
        (close - prev) / prev * 100.0
    });

    let ma = MaReadings {
        ma5: latest(&sma(&closes, 5)),
        ma10: latest(&sma(&closes, 10)),
        ma20: latest(&sma(&closes, 20)),
        ma60: latest(&sma(&closes, 60)),
    };

    let boll_out = bollinger(&closes, 20, 2.0);
    let boll = BollReadings {
        middle: latest(&boll_out.middle),
        upper: latest(&boll_out.upper),
        lower: latest(&boll_out.lower),
        percent_b: latest(&boll_out.percent_b),
        bandwidth: latest(&boll_out.bandwidth),
    };

    let rsi_readings = RsiReadings {
        rsi6: latest(&rsi(&closes, 6)),
        rsi12: latest(&rsi(&closes, 12)),
        rsi14: latest(&rsi(&closes, 14)),
    };

    let macd_out = macd(&closes, 12, 26, 9);
    let macd_readings = MacdReadings {
        dif: latest(&macd_out.dif),
        dea: latest(&macd_out.dea),
        histogram: latest(&macd_out.histogram),
    };

    let kdj_out = kdj(bars, 9, 3);
    let kdj_readings = KdjReadings {
        k: latest(&kdj_out.k),
        d: latest(&kdj_out.d),
        j: latest(&kdj_out.j),
    };

    let current_volume = volumes.last().copied().unwrap_or(0.0);
    let vol_ma5 = latest(&sma(&volumes, 5));
    let volume = VolumeReadings {
        current: current_volume,
        ma5: vol_ma5,
        ratio: vol_ma5.filter(|v| *v > 0.0).map(|v| current_volume / v),
    };

    let signals = summarize_signals(close, &ma, &boll, &rsi_readings, &macd_readings);

    IndicatorReport {
        symbol: series.symbol().to_string(),
        timeframe: series.timeframe(),
        as_of: series.last().map(|b| b.date).unwrap_or_default(),
        close,
        change_pct,
        ma,
        boll,
        rsi: rsi_readings,
        macd: macd_readings,
        kdj: kdj_readings,
        atr14: latest(&atr(bars, 14)),
        obv: latest(&obv(bars)),
        volume,
        signals,
    }
}

fn summarize_signals(
    close: f64,
    ma: &MaReadings,
    boll: &BollReadings,
    rsi: &RsiReadings,
    macd: &MacdReadings,
) -> SignalSummary {
    let mut bullish = Vec::new();
    let mut bearish = Vec::new();
    let mut neutral = Vec::new();

    if let Some(pb) = boll.percent_b {
        if pb < 20.0 {
            bullish.push(format!("BOLL: close near the lower band (%B {pb:.1}), possibly oversold"));
        } else if pb > 80.0 {
            bearish.push(format!("BOLL: close near the upper band (%B {pb:.1}), possibly overbought"));
        } else {
            neutral.push(format!("BOLL: close mid-band (%B {pb:.1})"));
        }
    }

    if let Some(value) = rsi.rsi14 {
        if value < 30.0 {
            bullish.push(format!("RSI(14) {value:.1}: oversold, rebound candidate"));
        } else if value > 70.0 {
            bearish.push(format!("RSI(14) {value:.1}: overbought, pullback risk"));
        } else {
            neutral.push(format!("RSI(14) {value:.1}: neutral zone"));
        }
    }

    if let (Some(dif), Some(dea)) = (macd.dif, macd.dea) {
        if dif > dea && dif > 0.0 {
            bullish.push("MACD: DIF above DEA and positive, bulls in control".into());
        } else if dif < dea && dif < 0.0 {
            bearish.push("MACD: DIF below DEA and negative, bears in control".into());
        } else if dif > dea {
            bullish.push("MACD: golden cross forming".into());
        } else {
            bearish.push("MACD: death cross forming".into());
        }
    }

    if let (Some(ma5), Some(ma10), Some(ma20)) = (ma.ma5, ma.ma10, ma.ma20) {
        if close > ma5 && ma5 > ma10 && ma10 > ma20 {
            bullish.push("MA: bullish stack, close above all averages".into());
        } else if close < ma5 && ma5 < ma10 && ma10 < ma20 {
            bearish.push("MA: bearish stack, close below all averages".into());
        } else {
            neutral.push("MA: averages entangled".into());
        }
    }

    let overall = if bullish.len() > bearish.len() + 1 {
        "bullish"
    } else if bearish.len() > bullish.len() + 1 {
        "bearish"
    } else {
        "neutral"
    };

    SignalSummary {
        bullish,
        bearish,
        neutral,
        overall,
    }
}

// =============================================================================
// 4. Trend analysis
// =============================================================================

/// Multi-period weekly trend report (current score plus 13/26/52-week
/// judgments and the composite advice).
pub async fn trend_analysis(state: &AppState, symbol: &str) -> Result<TrendReport> {
    let daily = cached_history(state, symbol, Timeframe::Daily, 730).await?;
    multi_period_trend(&daily, &state.scorer)
}

// =============================================================================
// 5. Comprehensive report
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ComprehensiveReport {
    pub quote: Quote,
    pub indicators: IndicatorReport,
    pub trend: TrendReport,
}

/// Quote, weekly indicators, and the trend report in one payload.
pub async fn comprehensive_report(state: &AppState, symbol: &str) -> Result<ComprehensiveReport> {
    let quote = realtime_quote(state, symbol).await?;
    let indicators = technical_indicators(state, symbol, Timeframe::Weekly).await?;
    let trend = trend_analysis(state, symbol).await?;
    Ok(ComprehensiveReport {
        quote,
        indicators,
        trend,
    })
}

// =============================================================================
// 6. Market overview
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct MarketBreadth {
    pub advancing: usize,
    pub declining: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketOverview {
    pub indices: Vec<Quote>,
    pub breadth: MarketBreadth,
    /// Ten most actively traded ETFs by turnover.
    pub most_active: Vec<EtfMatch>,
}

/// Index quotes, ETF advance/decline breadth, and the most active names.
pub async fn market_overview(state: &AppState) -> Result<MarketOverview> {
    let indices = cached_index_spot(state).await?;
    let etfs = cached_etf_spot(state).await?;

    let breadth = MarketBreadth {
        advancing: etfs.iter().filter(|q| q.change_pct > 0.0).count(),
        declining: etfs.iter().filter(|q| q.change_pct < 0.0).count(),
        unchanged: etfs.iter().filter(|q| q.change_pct == 0.0).count(),
    };

    let mut by_turnover: Vec<&Quote> = etfs.iter().collect();
    by_turnover.sort_by(|a, b| b.turnover.total_cmp(&a.turnover));
    let most_active = by_turnover.iter().take(10).map(|q| EtfMatch::from(*q)).collect();

    Ok(MarketOverview {
        indices,
        breadth,
        most_active,
    })
}

// =============================================================================
// 7. Category listing
// =============================================================================

/// Category name => name keywords. Provider names are Chinese, so the
/// keywords are too.
fn category_keywords(category: &str) -> Option<&'static [&'static str]> {
    match category {
        "index" => Some(&["沪深300", "中证500", "上证50", "创业板", "科创"]),
        "industry" => Some(&[
            "医药", "消费", "金融", "科技", "新能源", "半导体", "军工", "银行", "证券",
        ]),
        "commodity" => Some(&["黄金", "白银", "原油", "有色", "能源"]),
        "bond" => Some(&["国债", "企债", "信用债", "可转债"]),
        "cross_border" => Some(&["纳斯达克", "标普", "恒生", "日经", "德国", "法国", "港股"]),
        _ => None,
    }
}

/// ETFs in one category, sorted by daily change, at most 20. `"all"` lists
/// the whole table's top movers.
pub async fn list_by_category(state: &AppState, category: &str) -> Result<Vec<EtfMatch>> {
    let keywords = if category == "all" {
        None
    } else {
        Some(category_keywords(category).ok_or_else(|| {
            AnalysisError::InvalidParameter(format!(
                "unknown category '{category}' (all, index, industry, commodity, bond, cross_border)"
            ))
        })?)
    };

    let spot = cached_etf_spot(state).await?;
    let mut matched: Vec<&Quote> = spot
        .iter()
        .filter(|q| match keywords {
            Some(kws) => kws.iter().any(|kw| q.name.contains(kw)),
            None => true,
        })
        .collect();
    matched.sort_by(|a, b| b.change_pct.total_cmp(&a.change_pct));
    Ok(matched.iter().take(20).map(|q| EtfMatch::from(*q)).collect())
}

// =============================================================================
// 8. Comparison
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonRow {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change_pct: f64,
    /// Change over the last 5 sessions, when enough history exists.
    pub week_return: Option<f64>,
    /// Change over the last 22 sessions.
    pub month_return: Option<f64>,
}

/// Side-by-side comparison of 2 to 5 ETFs.
pub async fn compare_etfs(state: &AppState, symbols: &[String]) -> Result<Vec<ComparisonRow>> {
    if symbols.len() < 2 {
        return Err(AnalysisError::InvalidParameter(
            "comparison needs at least 2 symbols".into(),
        ));
    }
    if symbols.len() > 5 {
        return Err(AnalysisError::InvalidParameter(
            "comparison supports at most 5 symbols".into(),
        ));
    }

    let spot = cached_etf_spot(state).await?;

    let fetches = symbols
        .iter()
        .map(|symbol| cached_history(state, symbol, Timeframe::Daily, 60));
    let histories = join_all(fetches).await;

    let mut rows = Vec::with_capacity(symbols.len());
    for (symbol, history) in symbols.iter().zip(histories) {
        let quote = spot
            .iter()
            .find(|q| &q.symbol == symbol)
            .ok_or_else(|| AnalysisError::SymbolNotFound(symbol.clone()))?;
        let closes = history?.closes();

        rows.push(ComparisonRow {
            symbol: symbol.clone(),
            name: quote.name.clone(),
            price: quote.price,
            change_pct: quote.change_pct,
            week_return: trailing_return(&closes, 5),
            month_return: trailing_return(&closes, 22),
        });
    }
    Ok(rows)
}

/// Percent change from `sessions` bars ago to the latest close.
fn trailing_return(closes: &[f64], sessions: usize) -> Option<f64> {
    if closes.len() < sessions {
        return None;
    }
    let base = closes[closes.len() - sessions];
    let last = *closes.last()?;
    (base != 0.0).then(|| (last - base) / base * 100.0)
}

// =============================================================================
// 9. Ranking
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RankingEntry {
    pub symbol: String,
    pub name: String,
    pub change_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Ranking {
    pub period: String,
    pub gainers: Vec<RankingEntry>,
    pub losers: Vec<RankingEntry>,
}

/// Top gainers and losers over a day / week / month horizon.
///
/// Day rankings come straight from the spot table; week and month rankings
/// fetch history for the 50 most liquid ETFs to bound upstream load.
pub async fn performance_ranking(state: &AppState, period: &str, top_n: usize) -> Result<Ranking> {
    if top_n == 0 || top_n > 50 {
        return Err(AnalysisError::InvalidParameter(
            "top_n must be between 1 and 50".into(),
        ));
    }
    if !matches!(period, "day" | "week" | "month") {
        return Err(AnalysisError::InvalidParameter(format!(
            "unknown ranking period '{period}' (day, week, month)"
        )));
    }

    let spot = cached_etf_spot(state).await?;

    let mut entries: Vec<RankingEntry> = match period {
        "day" => spot
            .iter()
            .map(|q| RankingEntry {
                symbol: q.symbol.clone(),
                name: q.name.clone(),
                change_pct: q.change_pct,
            })
            .collect(),
        "week" | "month" => {
            let sessions = if period == "week" { 5 } else { 22 };

            let mut by_turnover: Vec<&Quote> = spot.iter().collect();
            by_turnover.sort_by(|a, b| b.turnover.total_cmp(&a.turnover));
            let universe: Vec<&Quote> = by_turnover.into_iter().take(50).collect();

            let fetches = universe
                .iter()
                .map(|q| cached_history(state, &q.symbol, Timeframe::Daily, 60));
            let histories = join_all(fetches).await;

            universe
                .iter()
                .zip(histories)
                .filter_map(|(q, history)| {
                    let closes = history.ok()?.closes();
                    let change_pct = trailing_return(&closes, sessions)?;
                    Some(RankingEntry {
                        symbol: q.symbol.clone(),
                        name: q.name.clone(),
                        change_pct,
                    })
                })
                .collect()
        }
        _ => unreachable!("period validated above"),
    };

    entries.sort_by(|a, b| b.change_pct.total_cmp(&a.change_pct));
    let gainers = entries.iter().take(top_n).cloned().collect();
    entries.reverse();
    let losers = entries.iter().take(top_n).cloned().collect();

    Ok(Ranking {
        period: period.to_string(),
        gainers,
        losers,
    })
}

// =============================================================================
// 10. Batch indicators
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub symbol: String,
    pub report: Option<IndicatorReport>,
    pub error: Option<String>,
}

/// Weekly indicator reports for up to 10 symbols, fetched concurrently. A
/// failed symbol carries its error message; the rest still succeed.
pub async fn batch_indicators(state: &AppState, symbols: &[String]) -> Result<Vec<BatchEntry>> {
    if symbols.is_empty() {
        return Err(AnalysisError::InvalidParameter(
            "batch symbol list is empty".into(),
        ));
    }
    if symbols.len() > 10 {
        return Err(AnalysisError::InvalidParameter(
            "batch supports at most 10 symbols".into(),
        ));
    }

    let fetches = symbols
        .iter()
        .map(|symbol| technical_indicators(state, symbol, Timeframe::Weekly));
    let reports = join_all(fetches).await;

    Ok(symbols
        .iter()
        .zip(reports)
        .map(|(symbol, report)| match report {
            Ok(report) => BatchEntry {
                symbol: symbol.clone(),
                report: Some(report),
                error: None,
            },
            Err(e) => BatchEntry {
                symbol: symbol.clone(),
                report: None,
                error: Some(e.to_string()),
            },
        })
        .collect())
}

// =============================================================================
// 11. Macro data
// =============================================================================

/// Trailing observations of one macro indicator (m2, cpi, ppi, gdp, pmi,
/// fx_reserves).
pub async fn macro_data(state: &AppState, indicator: &str) -> Result<Vec<MacroPoint>> {
    let key = format!("macro:{indicator}");
    state
        .cache
        .get_or_compute(CacheCategory::Macro, &key, || {
            state.provider.fetch_macro(indicator)
        })
        .await
}

// =============================================================================
// 12. Economic calendar
// =============================================================================

/// Economic calendar events for one day.
pub async fn economic_calendar(state: &AppState, date: NaiveDate) -> Result<Vec<CalendarEvent>> {
    let key = format!("calendar:{date}");
    state
        .cache
        .get_or_compute(CacheCategory::Calendar, &key, || {
            state.provider.fetch_calendar(date)
        })
        .await
}

// =============================================================================
// 13 / 14. Cache maintenance
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CacheClearResult {
    pub cleared: usize,
}

/// Drop cached entries: everything, or a single category.
pub async fn cache_clear(state: &AppState, category: Option<CacheCategory>) -> Result<CacheClearResult> {
    let cleared = match category {
        Some(category) => state.cache.clear_category(category),
        None => state.cache.clear_all(),
    };
    info!(cleared, "cache cleared");
    Ok(CacheClearResult { cleared })
}

/// Occupancy and hit/miss counters.
pub async fn cache_stats(state: &AppState) -> Result<CacheStats> {
    Ok(state.cache.stats())
}
