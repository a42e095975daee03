//! Price forecasts for the rolling horizon and their conditioning.

pub mod baseline;
pub mod calibration;
pub mod conditioning;
pub mod file;
pub mod oracle;
pub mod quality;
pub mod seasonal;

use crate::{core::product::Prices, prelude::*};

/// Predicted prices for consecutive hourly steps.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct Forecast {
    /// History index of the first forecasted step.
    pub start_index: usize,

    /// One per step, never empty.
    pub prices: Vec<Prices>,
}

impl Forecast {
    /// History indices covered by the forecast.
    pub fn indices(&self) -> std::ops::Range<usize> {
        self.start_index..(self.start_index + self.prices.len())
    }
}

/// Source of price forecasts over the history indices.
pub trait ForecastProvider {
    /// Short name for the logs.
    fn name(&self) -> &'static str;

    /// Check once, before the run, that the provider is able to forecast at all.
    fn ensure_available(&self) -> Result {
        Ok(())
    }

    /// Forecast up to `horizon` steps starting at `start_index`.
    ///
    /// The result is truncated at the end of the data, and absent when nothing can be forecast
    /// from `start_index`. A start clipped forward past `start_index` means the data ends there.
    fn forecast(&self, start_index: usize, horizon: usize) -> Option<Forecast>;
}
