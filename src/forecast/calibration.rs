use itertools::Itertools;

use crate::{
    core::{
        point::Point,
        product::{Prices, ProductSet},
    },
    forecast::{ForecastProvider, baseline::SeasonalBaseline},
    prelude::*,
};

/// Used when the window is too short to tell anything.
pub const DEFAULT_ALPHA: f64 = 0.5;

const MIN_SAMPLES: usize = 5;

/// Grid search of the per-product blend weights over recently realized hours.
#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct Calibration {
    /// Number of realized hours to look back.
    pub window: usize,

    /// Grid step of the weight within `[0, 1]`.
    pub step: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self { window: 24, step: 0.05 }
    }
}

/// Realized price next to what the forecast and the baseline said about it.
struct Sample {
    actual: Prices,
    forecast: Prices,
    baseline: Prices,
}

impl Calibration {
    /// Blend weights as of `start_index`, aligned with [`ProductSet::iter`].
    ///
    /// Only the hours before `start_index` are looked at, each with the first step of the
    /// forecast made at that hour.
    #[instrument(skip_all, fields(start_index))]
    pub fn calibrate(
        &self,
        provider: &dyn ForecastProvider,
        baseline: &SeasonalBaseline,
        points: &[Point],
        products: &ProductSet,
        start_index: usize,
    ) -> Vec<f64> {
        let window = start_index.saturating_sub(self.window)..start_index.min(points.len());
        let samples = window
            .filter_map(|index| {
                let forecast = provider.forecast(index, 1)?.prices.into_iter().next()?;
                Some(Sample {
                    actual: points[index].prices.clone(),
                    forecast,
                    baseline: baseline.at(points, index, index),
                })
            })
            .collect_vec();
        let alphas = products
            .iter()
            .map(|product| {
                let triples = samples
                    .iter()
                    .map(|sample| {
                        (
                            sample.actual[product].0,
                            sample.forecast[product].0,
                            sample.baseline[product].0,
                        )
                    })
                    .collect_vec();
                self.best_alpha(&triples)
            })
            .collect_vec();
        debug!(n_samples = samples.len(), ?alphas, "calibrated");
        alphas
    }

    /// Weight minimizing the mean absolute error of `(actual, forecast, baseline)` samples.
    ///
    /// Ties go to the smallest weight.
    pub fn best_alpha(&self, samples: &[(f64, f64, f64)]) -> f64 {
        if samples.len() < MIN_SAMPLES {
            return DEFAULT_ALPHA;
        }
        let step = self.step.max(1e-6);
        let n_steps = ((1.0 + 1e-9) / step).floor() as usize;
        let mut best_alpha = DEFAULT_ALPHA;
        let mut best_error = f64::INFINITY;
        for alpha in (0..=n_steps).map(|i| i as f64 * step) {
            let error = samples
                .iter()
                .map(|(actual, forecast, baseline)| {
                    (actual - (alpha * forecast + (1.0 - alpha) * baseline)).abs()
                })
                .sum::<f64>()
                / samples.len() as f64;
            if error < best_error {
                best_error = error;
                best_alpha = alpha;
            }
        }
        best_alpha
    }
}
