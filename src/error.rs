// =============================================================================
// Error types shared across the EtfScope analysis core
// =============================================================================
//
// Every user-visible failure is one of four kinds so that callers (and the
// REST adapter) can always tell a bad request from missing history from a
// broken upstream. A cache miss is NOT an error — it is the normal path that
// triggers production.

use thiserror::Error;

/// Failure categories for the analysis core.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    /// The requested window exceeds the available history. The computation
    /// was well-formed; there is simply not enough data.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// The upstream data provider failed (network error, bad payload, non-2xx
    /// status). Never cached.
    #[error("upstream provider failure: {0}")]
    Upstream(String),

    /// A malformed input: empty symbol, non-positive window, unordered or
    /// duplicate timestamps. Rejected before any computation begins.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The provider responded but knows nothing about the requested symbol.
    #[error("symbol not found: {0}")]
    SymbolNotFound(String),
}

impl AnalysisError {
    /// Stable machine-readable kind string used in structured error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsufficientData(_) => "insufficient_data",
            Self::Upstream(_) => "upstream_failure",
            Self::InvalidParameter(_) => "invalid_parameter",
            Self::SymbolNotFound(_) => "symbol_not_found",
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
