//! Turning a raw forecast into the price path the dispatch model is solved against.
//!
//! The steps are applied in a fixed order: blending with the seasonal baseline, reserve
//! discounting, clipping to the historical quantiles, and anchoring of the first step.

use bon::Builder;
use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::{
    core::{
        point::Point,
        product::{Prices, Product, ProductSet},
    },
    forecast::{
        Forecast,
        ForecastProvider,
        baseline::SeasonalBaseline,
        calibration::{Calibration, DEFAULT_ALPHA},
    },
    prelude::*,
    quantity::price::Price,
};

/// Weight of the raw forecast in the blend.
#[derive(Copy, Clone, Debug)]
pub enum Alpha {
    Fixed(f64),
    Calibrated(Calibration),
}

#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct Blend {
    pub baseline: SeasonalBaseline,
    pub alpha: Alpha,
}

/// Bounds of the forecast, as quantiles of the trailing history.
#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct Clip {
    /// Number of the most recent realized hours to compute the quantiles over.
    pub window: usize,

    pub low: f64,
    pub high: f64,
}

impl Default for Clip {
    fn default() -> Self {
        Self { window: 500, low: 0.01, high: 0.99 }
    }
}

#[must_use]
#[derive(Clone, Debug, Builder)]
pub struct Conditioning {
    pub blend: Option<Blend>,

    /// Multiplier of every reserve price, `1` keeps them as is.
    #[builder(default = 1.0)]
    pub reserve_discount: f64,

    pub clip: Option<Clip>,

    /// Replace the first step with the realized prices, which are known at dispatch time.
    #[builder(default)]
    pub anchor: bool,
}

impl Conditioning {
    /// No-op conditioning, the raw forecast is solved against as is.
    #[cfg(test)]
    pub fn none() -> Self {
        Self::builder().build()
    }

    pub fn validate(&self) -> Result {
        ensure!(
            (0.0..=1.0).contains(&self.reserve_discount),
            "the reserve discount must be within [0, 1], got {}",
            self.reserve_discount,
        );
        if let Some(blend) = &self.blend {
            match blend.alpha {
                Alpha::Fixed(alpha) => ensure!(
                    (0.0..=1.0).contains(&alpha),
                    "the blend weight must be within [0, 1], got {alpha}",
                ),
                Alpha::Calibrated(calibration) => ensure!(
                    calibration.step > 0.0 && calibration.step <= 1.0,
                    "the calibration step must be within (0, 1], got {}",
                    calibration.step,
                ),
            }
        }
        if let Some(clip) = &self.clip {
            ensure!(
                (0.0..=1.0).contains(&clip.low)
                    && (0.0..=1.0).contains(&clip.high)
                    && clip.low <= clip.high,
                "invalid clipping quantiles [{}, {}]",
                clip.low,
                clip.high,
            );
            ensure!(clip.window != 0, "the clipping window must not be empty");
        }
        Ok(())
    }

    /// Blend weights as of the forecast start, aligned with [`ProductSet::iter`].
    pub fn alphas(
        &self,
        provider: &dyn ForecastProvider,
        points: &[Point],
        products: &ProductSet,
        start_index: usize,
    ) -> Option<Vec<f64>> {
        let blend = self.blend?;
        Some(match blend.alpha {
            Alpha::Fixed(alpha) => vec![alpha; products.len()],
            Alpha::Calibrated(calibration) => {
                calibration.calibrate(provider, &blend.baseline, points, products, start_index)
            }
        })
    }

    /// Build the price path for the dispatch model.
    ///
    /// Timestamps and the measured solar are taken from the history, the forecast must not
    /// reach beyond it.
    pub fn apply(
        &self,
        forecast: &Forecast,
        points: &[Point],
        products: &ProductSet,
        alphas: Option<&[f64]>,
    ) -> Vec<Point> {
        let start = forecast.start_index;
        let mut prices = forecast.prices.clone();

        if let Some(blend) = &self.blend {
            let baseline = blend.baseline.horizon(points, start, prices.len());
            for (prices, baseline) in prices.iter_mut().zip(baseline) {
                for product in products.iter() {
                    let alpha =
                        alphas.and_then(|alphas| alphas.get(product.index()).copied());
                    let alpha = alpha.unwrap_or(DEFAULT_ALPHA);
                    prices[product] = prices[product] * alpha + baseline[product] * (1.0 - alpha);
                }
            }
        }

        if self.reserve_discount != 1.0 {
            for prices in &mut prices {
                for product in products.reserve_products() {
                    prices[product] = prices[product] * self.reserve_discount;
                }
            }
        }

        if let Some(clip) = &self.clip {
            // At the very beginning, the first point is all there is:
            let end = start.max(1).min(points.len());
            let history = &points[start.saturating_sub(clip.window).min(end)..end];
            for product in products.iter() {
                Self::clip(&mut prices, history, product, clip);
            }
        }

        if self.anchor
            && let (Some(first), Some(actual)) = (prices.first_mut(), points.get(start))
        {
            *first = actual.prices.clone();
        }

        prices
            .into_iter()
            .zip(&points[start.min(points.len())..])
            .map(|(prices, point)| Point { timestamp: point.timestamp, prices, solar: point.solar })
            .collect()
    }

    fn clip(prices: &mut [Prices], history: &[Point], product: Product, clip: &Clip) {
        let values = history.iter().map(|point| point.prices[product].0).collect_vec();
        let (Some(low), Some(high)) = (quantile(&values, clip.low), quantile(&values, clip.high))
        else {
            return;
        };
        if !low.is_finite() || !high.is_finite() || low == high {
            debug!(?product, low, high, "degenerate clipping window, skipping");
            return;
        }
        for prices in prices {
            prices[product] = Price::from(prices[product].0.clamp(low, high));
        }
    }
}

/// Quantile with linear interpolation between the closest ranks.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sorted = values.iter().copied().sorted_by_key(|value| OrderedFloat(*value)).collect_vec();
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - position.floor();
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{
        core::{point::tests::path, product::tests::single_reserve},
        forecast::{baseline::Fallback, oracle::Oracle},
    };

    fn energies(points: &[Point]) -> Vec<f64> {
        points.iter().map(|point| point.prices.energy.0).collect()
    }

    #[test]
    fn interpolated_quantiles() {
        let values = [4.0, 1.0, 3.0, 2.0, 5.0];
        assert_abs_diff_eq!(quantile(&values, 0.0).unwrap(), 1.0);
        assert_abs_diff_eq!(quantile(&values, 0.5).unwrap(), 3.0);
        assert_abs_diff_eq!(quantile(&values, 0.01).unwrap(), 1.04, epsilon = 1e-9);
        assert_abs_diff_eq!(quantile(&values, 0.99).unwrap(), 4.96, epsilon = 1e-9);
        assert!(quantile(&[], 0.5).is_none());
    }

    #[test]
    fn no_conditioning_keeps_the_forecast() {
        let points = path(0, &[(10.0, &[1.0]), (20.0, &[2.0])]);
        let forecast = Forecast {
            start_index: 0,
            prices: vec![Prices::zeros(1), Prices::zeros(1)],
        };
        let path = Conditioning::none().apply(&forecast, &points, &single_reserve(), None);
        assert_eq!(energies(&path), [0.0, 0.0]);
        assert_eq!(path[1].timestamp, points[1].timestamp);
    }

    #[test]
    fn blend_discount_and_anchor() {
        let points = path(0, &[(10.0, &[10.0]), (20.0, &[20.0]), (30.0, &[30.0]), (40.0, &[40.0])]);
        let conditioning = Conditioning::builder()
            .blend(Blend {
                baseline: SeasonalBaseline { lag: 2, fallback: Fallback::Zero },
                alpha: Alpha::Fixed(0.25),
            })
            .reserve_discount(0.5)
            .anchor(true)
            .build();
        let forecast = Forecast {
            start_index: 2,
            prices: vec![Prices::zeros(1).map(|_| Price::from(100.0)); 2],
        };
        let products = single_reserve();
        let alphas =
            conditioning.alphas(&Oracle::new(&points), &points, &products, 2).unwrap();
        let path = conditioning.apply(&forecast, &points, &products, Some(&alphas));

        // The first step is the realized one:
        assert_eq!(path[0].prices, points[2].prices);

        // Index 3 lags to 1: 0.25 × 100 + 0.75 × 20.
        assert_abs_diff_eq!(path[1].prices.energy.0, 40.0, epsilon = 1e-9);
        assert_abs_diff_eq!(path[1].prices.reserves[0].0, 20.0, epsilon = 1e-9);
    }

    #[test]
    fn clipped_to_history() {
        let points = path(0, &[(10.0, &[5.0]), (20.0, &[5.0]), (30.0, &[5.0]), (40.0, &[5.0])]);
        let conditioning = Conditioning::builder()
            .clip(Clip { window: 500, low: 0.0, high: 1.0 })
            .build();
        let forecast = Forecast {
            start_index: 3,
            prices: vec![Prices { energy: Price::from(99.0), reserves: vec![Price::from(99.0)] }],
        };
        let path = conditioning.apply(&forecast, &points, &single_reserve(), None);

        // Energy is bounded by [10, 30], the flat reserve history is degenerate and skipped:
        assert_eq!(energies(&path), [30.0]);
        assert_abs_diff_eq!(path[0].prices.reserves[0].0, 99.0);
    }

    #[test]
    fn validation() {
        assert!(Conditioning::none().validate().is_ok());
        assert!(Conditioning::builder().reserve_discount(1.5).build().validate().is_err());
    }
}
