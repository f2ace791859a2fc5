// =============================================================================
// Provider Client — upstream quote / kline / macro / calendar endpoints
// =============================================================================
//
// Thin reqwest wrapper around the upstream market-data HTTP API. The wire
// format belongs to the provider; this module's job is to turn its loose
// rows into strict `Bar` / `Series` / `Quote` values at the boundary and to
// classify failures:
//
//   network / non-2xx / malformed payload  => Upstream (never cached)
//   provider answered, symbol unknown      => SymbolNotFound
//
// Kline rows arrive as comma-joined strings in the order
// `date,open,close,high,low,volume`; spot rows as flat JSON objects with
// numeric field codes. Suspended instruments report "-" for prices and are
// skipped.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::error::{AnalysisError, Result};
use crate::types::{Bar, Quote, Series, Timeframe};

// =============================================================================
// Response shapes
// =============================================================================

#[derive(Debug, Deserialize)]
struct KlineResponse {
    data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
struct KlineData {
    #[serde(default)]
    klines: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SpotResponse {
    data: Option<SpotData>,
}

#[derive(Debug, Deserialize)]
struct SpotData {
    #[serde(default)]
    diff: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct MacroResponse {
    result: Option<MacroResult>,
}

#[derive(Debug, Deserialize)]
struct MacroResult {
    #[serde(default)]
    data: Vec<Value>,
}

/// One observation of a macro-economic indicator.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MacroPoint {
    pub period: String,
    pub value: f64,
}

/// One economic calendar event.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CalendarEvent {
    pub time: String,
    pub region: String,
    pub event: String,
    pub importance: String,
    pub previous: Option<String>,
    pub forecast: Option<String>,
    pub actual: Option<String>,
}

// =============================================================================
// Client
// =============================================================================

/// Async HTTP client for the upstream data provider.
pub struct ProviderClient {
    http: reqwest::Client,
    config: ProviderConfig,
}

impl ProviderClient {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnalysisError::Upstream(format!("http client init: {e}")))?;
        Ok(Self { http, config })
    }

    /// Full ETF spot table.
    pub async fn fetch_etf_spot(&self) -> Result<Vec<Quote>> {
        self.fetch_spot(&self.config.etf_spot_filter).await
    }

    /// Major index spot table.
    pub async fn fetch_index_spot(&self) -> Result<Vec<Quote>> {
        self.fetch_spot(&self.config.index_spot_filter).await
    }

    async fn fetch_spot(&self, filter: &str) -> Result<Vec<Quote>> {
        let url = format!(
            "{}/api/qt/clist/get?pn=1&pz=5000&po=1&fltt=2&fs={}\
             &fields=f2,f3,f5,f6,f12,f14,f15,f16,f17,f18",
            self.config.quote_base_url, filter
        );
        let response: SpotResponse = self.get_json(&url).await?;
        let rows = response
            .data
            .ok_or_else(|| AnalysisError::Upstream("spot response missing data".into()))?
            .diff;

        let quotes: Vec<Quote> = rows.iter().filter_map(parse_spot_row).collect();
        debug!(count = quotes.len(), "spot table fetched");
        Ok(quotes)
    }

    /// Historical klines for one symbol, most recent `days` calendar days.
    ///
    /// # Edge cases
    /// - An unknown symbol yields `SymbolNotFound` (the provider answers
    ///   with an empty kline block).
    /// - Rows that fail to parse are skipped with a warning rather than
    ///   failing the whole series.
    pub async fn fetch_history(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        days: u32,
    ) -> Result<Series> {
        if symbol.trim().is_empty() {
            return Err(AnalysisError::InvalidParameter("empty symbol".into()));
        }
        if days == 0 {
            return Err(AnalysisError::InvalidParameter(
                "days must be positive".into(),
            ));
        }

        let klt = match timeframe {
            Timeframe::Daily => 101,
            Timeframe::Weekly => 102,
        };
        let url = format!(
            "{}/api/qt/stock/kline/get?secid={}&klt={}&fqt=1&lmt={}\
             &fields1=f1,f2,f3&fields2=f51,f52,f53,f54,f55,f56",
            self.config.hist_base_url,
            secid_for(symbol),
            klt,
            days
        );
        let response: KlineResponse = self.get_json(&url).await?;
        let rows = match response.data {
            Some(data) if !data.klines.is_empty() => data.klines,
            _ => return Err(AnalysisError::SymbolNotFound(symbol.to_string())),
        };

        let mut bars = Vec::with_capacity(rows.len());
        for row in &rows {
            match parse_kline_row(row) {
                Ok(bar) => bars.push(bar),
                Err(e) => warn!(symbol, row, error = %e, "skipping malformed kline row"),
            }
        }
        if bars.is_empty() {
            return Err(AnalysisError::Upstream(format!(
                "{symbol}: no parseable kline rows"
            )));
        }

        Series::new(symbol, timeframe, bars)
    }

    /// Trailing observations of one macro indicator.
    pub async fn fetch_macro(&self, indicator: &str) -> Result<Vec<MacroPoint>> {
        let report = macro_report_for(indicator).ok_or_else(|| {
            AnalysisError::InvalidParameter(format!(
                "unknown macro indicator '{indicator}' (supported: {})",
                SUPPORTED_MACRO_INDICATORS.join(", ")
            ))
        })?;

        let url = format!(
            "{}/api/data/v1/get?reportName={}&columns=ALL&pageSize=12&sortTypes=-1&sortColumns={}",
            self.config.macro_base_url, report.report_name, report.period_field
        );
        let response: MacroResponse = self.get_json(&url).await?;
        let rows = response
            .result
            .ok_or_else(|| AnalysisError::Upstream("macro response missing result".into()))?
            .data;

        let mut points: Vec<MacroPoint> = rows
            .iter()
            .filter_map(|row| parse_macro_row(row, report))
            .collect();
        points.reverse(); // provider sorts newest first
        Ok(points)
    }

    /// Economic calendar events for one day (`YYYYMMDD` format upstream).
    pub async fn fetch_calendar(&self, date: NaiveDate) -> Result<Vec<CalendarEvent>> {
        let url = format!(
            "{}/api/calendar?date={}",
            self.config.calendar_base_url,
            date.format("%Y%m%d")
        );
        let response: MacroResponse = self.get_json(&url).await?;
        let rows = response
            .result
            .ok_or_else(|| AnalysisError::Upstream("calendar response missing result".into()))?
            .data;
        Ok(rows.iter().filter_map(parse_calendar_row).collect())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AnalysisError::Upstream(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::Upstream(format!(
                "provider returned HTTP {status}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AnalysisError::Upstream(format!("malformed payload: {e}")))
    }
}

// =============================================================================
// Pure parsing helpers
// =============================================================================

/// Market prefix for a secid: Shanghai-listed codes (5/6 prefixes) are
/// market 1, everything else market 0.
fn secid_for(symbol: &str) -> String {
    let market = if symbol.starts_with('5') || symbol.starts_with('6') {
        1
    } else {
        0
    };
    format!("{market}.{symbol}")
}

/// Parse one `date,open,close,high,low,volume` kline row.
fn parse_kline_row(row: &str) -> Result<Bar> {
    let fields: Vec<&str> = row.split(',').collect();
    if fields.len() < 6 {
        return Err(AnalysisError::Upstream(format!(
            "kline row has {} fields, need 6",
            fields.len()
        )));
    }

    let date = NaiveDate::parse_from_str(fields[0], "%Y-%m-%d")
        .map_err(|e| AnalysisError::Upstream(format!("bad kline date '{}': {e}", fields[0])))?;
    let num = |s: &str| -> Result<f64> {
        s.parse::<f64>()
            .map_err(|e| AnalysisError::Upstream(format!("bad kline number '{s}': {e}")))
    };

    Ok(Bar {
        date,
        open: num(fields[1])?,
        close: num(fields[2])?,
        high: num(fields[3])?,
        low: num(fields[4])?,
        volume: num(fields[5])?,
    })
}

/// Extract a quote from one spot row; rows with missing code, name, or price
/// (suspended instruments report "-") yield `None`.
fn parse_spot_row(row: &Value) -> Option<Quote> {
    let number = |key: &str| row.get(key).and_then(Value::as_f64);

    Some(Quote {
        symbol: row.get("f12")?.as_str()?.to_string(),
        name: row.get("f14")?.as_str()?.to_string(),
        price: number("f2")?,
        change_pct: number("f3").unwrap_or(0.0),
        volume: number("f5").unwrap_or(0.0),
        turnover: number("f6").unwrap_or(0.0),
        high: number("f15").unwrap_or(0.0),
        low: number("f16").unwrap_or(0.0),
        open: number("f17").unwrap_or(0.0),
        prev_close: number("f18").unwrap_or(0.0),
    })
}

/// Supported macro indicator names and their upstream report mapping.
struct MacroReport {
    report_name: &'static str,
    period_field: &'static str,
    value_field: &'static str,
}

pub const SUPPORTED_MACRO_INDICATORS: [&str; 6] =
    ["m2", "cpi", "ppi", "gdp", "pmi", "fx_reserves"];

fn macro_report_for(indicator: &str) -> Option<&'static MacroReport> {
    match indicator {
        "m2" => Some(&MacroReport {
            report_name: "RPT_ECONOMY_CURRENCY_SUPPLY",
            period_field: "REPORT_DATE",
            value_field: "BASIC_CURRENCY_SAME",
        }),
        "cpi" => Some(&MacroReport {
            report_name: "RPT_ECONOMY_CPI",
            period_field: "REPORT_DATE",
            value_field: "NATIONAL_SAME",
        }),
        "ppi" => Some(&MacroReport {
            report_name: "RPT_ECONOMY_PPI",
            period_field: "REPORT_DATE",
            value_field: "BASE_SAME",
        }),
        "gdp" => Some(&MacroReport {
            report_name: "RPT_ECONOMY_GDP",
            period_field: "REPORT_DATE",
            value_field: "SUM_SAME",
        }),
        "pmi" => Some(&MacroReport {
            report_name: "RPT_ECONOMY_PMI",
            period_field: "REPORT_DATE",
            value_field: "MAKE_INDEX",
        }),
        "fx_reserves" => Some(&MacroReport {
            report_name: "RPT_ECONOMY_GOLD_CURRENCY",
            period_field: "REPORT_DATE",
            value_field: "FOREX",
        }),
        _ => None,
    }
}

fn parse_macro_row(row: &Value, report: &MacroReport) -> Option<MacroPoint> {
    let period = row.get(report.period_field)?.as_str()?.to_string();
    let value = row.get(report.value_field)?.as_f64()?;
    Some(MacroPoint { period, value })
}

fn parse_calendar_row(row: &Value) -> Option<CalendarEvent> {
    let text = |key: &str| {
        row.get(key)
            .and_then(Value::as_str)
            .map(|s| s.to_string())
    };
    Some(CalendarEvent {
        time: text("time")?,
        region: text("region").unwrap_or_default(),
        event: text("event")?,
        importance: text("importance").unwrap_or_default(),
        previous: text("previous"),
        forecast: text("forecast"),
        actual: text("actual"),
    })
}
