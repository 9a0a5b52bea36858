//! Index-rate collaborator boundary.
//!
//! Adjustment indices (inflation, interbank accumulation) come from outside
//! the engine. The generator only sees an accumulated percentage per window.

use async_trait::async_trait;
use chrono::NaiveDate;
use cpk_schemas::CoreError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexRateError {
    /// Network or transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider does not publish this index.
    #[error("unknown index '{index}'")]
    UnknownIndex { index: String },

    /// The index exists but has no data for the window yet.
    #[error("no '{index}' data for {from}..{to}")]
    MissingData {
        index: String,
        from: NaiveDate,
        to: NaiveDate,
    },

    /// A response payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<IndexRateError> for CoreError {
    fn from(e: IndexRateError) -> Self {
        CoreError::UpstreamUnavailable(format!("index rates: {e}"))
    }
}

/// Upstream index-rate provider contract.
///
/// Object-safe and `Send + Sync` so callers can hold an
/// `Arc<dyn IndexRateProvider>` across tasks.
#[async_trait]
pub trait IndexRateProvider: Send + Sync {
    /// Human-readable provider name (e.g. `"static"`, `"central-bank"`).
    fn name(&self) -> &'static str;

    /// Accumulated percentage of `index` over `[from, to)`.
    ///
    /// `4.5` means +4.5%; negative values (deflation) are allowed.
    async fn accumulated_percent(
        &self,
        index: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<f64, IndexRateError>;
}

/// Provider for deployments without an index feed: every lookup fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIndexRates;

#[async_trait]
impl IndexRateProvider for NoIndexRates {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn accumulated_percent(
        &self,
        index: &str,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<f64, IndexRateError> {
        Err(IndexRateError::UnknownIndex {
            index: index.to_string(),
        })
    }
}
