// =============================================================================
// REST API — thin HTTP adapter over the callable operations
// =============================================================================
//
// Owns nothing but routing, extraction, and serialization. Every handler
// delegates to a function in `tools` and maps its `AnalysisError` kind to a
// status code:
//
//   invalid_parameter  => 400
//   symbol_not_found   => 404
//   insufficient_data  => 422
//   upstream_failure   => 502
//
// with a structured `{ "error": { "kind", "message" } }` body.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::app_state::AppState;
use crate::cache::CacheCategory;
use crate::error::AnalysisError;
use crate::tools;
use crate::types::Timeframe;

impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        let status = match self {
            AnalysisError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            AnalysisError::SymbolNotFound(_) => StatusCode::NOT_FOUND,
            AnalysisError::InsufficientData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AnalysisError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        let body = json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/search", get(search))
        .route("/api/quote/:symbol", get(quote))
        .route("/api/indicators/:symbol", get(indicators))
        .route("/api/indicators/batch", post(batch))
        .route("/api/trend/:symbol", get(trend))
        .route("/api/report/:symbol", get(report))
        .route("/api/market/overview", get(overview))
        .route("/api/etfs", get(etfs))
        .route("/api/compare", get(compare))
        .route("/api/ranking", get(ranking))
        .route("/api/macro/:indicator", get(macro_data))
        .route("/api/calendar", get(calendar))
        .route("/api/cache/stats", get(stats))
        .route("/api/cache/clear", post(clear))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type ApiResult<T> = std::result::Result<Json<T>, AnalysisError>;

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "uptime_secs": state.uptime_secs(),
    }))
}

#[derive(Deserialize)]
struct SearchParams {
    keyword: String,
}

async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Vec<tools::EtfMatch>> {
    Ok(Json(tools::search_etf(&state, &params.keyword).await?))
}

async fn quote(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> ApiResult<crate::types::Quote> {
    Ok(Json(tools::realtime_quote(&state, &symbol).await?))
}

#[derive(Deserialize)]
struct IndicatorParams {
    #[serde(default)]
    timeframe: Option<String>,
}

async fn indicators(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(params): Query<IndicatorParams>,
) -> ApiResult<tools::IndicatorReport> {
    let timeframe = match params.timeframe.as_deref() {
        Some(raw) => raw.parse()?,
        None => Timeframe::Weekly,
    };
    Ok(Json(
        tools::technical_indicators(&state, &symbol, timeframe).await?,
    ))
}

#[derive(Deserialize)]
struct BatchRequest {
    symbols: Vec<String>,
}

async fn batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> ApiResult<Vec<tools::BatchEntry>> {
    Ok(Json(tools::batch_indicators(&state, &request.symbols).await?))
}

async fn trend(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> ApiResult<crate::analysis::TrendReport> {
    Ok(Json(tools::trend_analysis(&state, &symbol).await?))
}

async fn report(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> ApiResult<tools::ComprehensiveReport> {
    Ok(Json(tools::comprehensive_report(&state, &symbol).await?))
}

async fn overview(State(state): State<Arc<AppState>>) -> ApiResult<tools::MarketOverview> {
    Ok(Json(tools::market_overview(&state).await?))
}

#[derive(Deserialize)]
struct CategoryParams {
    #[serde(default = "default_category")]
    category: String,
}

fn default_category() -> String {
    "all".to_string()
}

async fn etfs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CategoryParams>,
) -> ApiResult<Vec<tools::EtfMatch>> {
    Ok(Json(tools::list_by_category(&state, &params.category).await?))
}

#[derive(Deserialize)]
struct CompareParams {
    /// Comma-separated symbol list, e.g. `510300,159915`.
    symbols: String,
}

async fn compare(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CompareParams>,
) -> ApiResult<Vec<tools::ComparisonRow>> {
    let symbols: Vec<String> = params
        .symbols
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    Ok(Json(tools::compare_etfs(&state, &symbols).await?))
}

#[derive(Deserialize)]
struct RankingParams {
    #[serde(default = "default_period")]
    period: String,
    #[serde(default = "default_top_n")]
    top_n: usize,
}

fn default_period() -> String {
    "day".to_string()
}

fn default_top_n() -> usize {
    10
}

async fn ranking(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RankingParams>,
) -> ApiResult<tools::Ranking> {
    Ok(Json(
        tools::performance_ranking(&state, &params.period, params.top_n).await?,
    ))
}

async fn macro_data(
    State(state): State<Arc<AppState>>,
    Path(indicator): Path<String>,
) -> ApiResult<Vec<crate::provider::MacroPoint>> {
    Ok(Json(tools::macro_data(&state, &indicator).await?))
}

#[derive(Deserialize)]
struct CalendarParams {
    /// `YYYY-MM-DD`; defaults to today.
    #[serde(default)]
    date: Option<NaiveDate>,
}

async fn calendar(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CalendarParams>,
) -> ApiResult<Vec<crate::provider::CalendarEvent>> {
    let date = params.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(tools::economic_calendar(&state, date).await?))
}

async fn stats(State(state): State<Arc<AppState>>) -> ApiResult<crate::cache::CacheStats> {
    Ok(Json(tools::cache_stats(&state).await?))
}

#[derive(Deserialize)]
struct ClearParams {
    #[serde(default)]
    category: Option<CacheCategory>,
}

async fn clear(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ClearParams>,
) -> ApiResult<tools::CacheClearResult> {
    Ok(Json(tools::cache_clear(&state, params.category).await?))
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_statuses() {
        let cases = [
            (
                AnalysisError::InvalidParameter("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                AnalysisError::SymbolNotFound("x".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                AnalysisError::InsufficientData("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (AnalysisError::Upstream("x".into()), StatusCode::BAD_GATEWAY),
        ];
        for (error, expected) in cases {
            let response = error.into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn router_builds() {
        let state = Arc::new(
            crate::app_state::AppState::new(crate::config::AppConfig::default()).unwrap(),
        );
        let _router = router(state);
    }
}
