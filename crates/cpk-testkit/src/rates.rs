use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use cpk_schedule::{IndexRateError, IndexRateProvider};

/// One fixed percentage per index, whatever the window.
#[derive(Debug, Default)]
pub struct StaticIndexRates {
    rates: HashMap<String, f64>,
    calls: Mutex<Vec<(String, NaiveDate, NaiveDate)>>,
}

impl StaticIndexRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, index: &str, percent: f64) -> Self {
        self.rates.insert(index.to_string(), percent);
        self
    }

    /// `(index, from, to)` of every lookup so far.
    pub fn calls(&self) -> Vec<(String, NaiveDate, NaiveDate)> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl IndexRateProvider for StaticIndexRates {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn accumulated_percent(
        &self,
        index: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<f64, IndexRateError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((index.to_string(), from, to));
        }
        self.rates
            .get(index)
            .copied()
            .ok_or_else(|| IndexRateError::UnknownIndex {
                index: index.to_string(),
            })
    }
}
