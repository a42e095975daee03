use std::{collections::HashSet, ops::Range};

use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::{
    core::{
        point::Point,
        product::{Product, ProductSet},
    },
    forecast::ForecastProvider,
    prelude::*,
};

/// Denominator floor of the percentage errors.
const EPSILON: f64 = 1e-6;

/// Size of the top-hours set compared by the hit rate.
const TOP_K: usize = 5;

/// First-step forecast errors of a single product.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Quality {
    pub product: Product,
    pub n_samples: usize,

    /// Mean absolute error.
    pub mae: f64,

    /// Mean absolute percentage error, unstable around zero prices.
    pub mape: f64,

    /// Symmetric mean absolute percentage error.
    pub smape: f64,

    /// Percentage of hour-to-hour moves predicted in the right direction.
    pub directional_accuracy: Option<f64>,

    /// Overlap percentage between the top hours of the actual and predicted prices.
    pub top_k_hit_rate: Option<f64>,
}

/// Evaluate the provider's first-step forecasts over the interval, the most accurate first.
#[instrument(skip_all, fields(provider = provider.name()))]
pub fn evaluate(
    provider: &dyn ForecastProvider,
    points: &[Point],
    products: &ProductSet,
    interval: Range<usize>,
) -> Vec<Quality> {
    let pairs = interval
        .filter_map(|index| {
            let forecast = provider.forecast(index, 1)?.prices.into_iter().next()?;
            Some((points.get(index)?.prices.clone(), forecast))
        })
        .collect_vec();
    debug!(n_samples = pairs.len(), "collected the first-step forecasts");
    if pairs.is_empty() {
        return Vec::new();
    }
    products
        .iter()
        .map(|product| {
            let (actual, predicted): (Vec<f64>, Vec<f64>) = pairs
                .iter()
                .map(|(actual, predicted)| (actual[product].0, predicted[product].0))
                .unzip();
            Quality::new(product, &actual, &predicted)
        })
        .sorted_by_key(|quality| OrderedFloat(quality.mae))
        .collect()
}

impl Quality {
    fn new(product: Product, actual: &[f64], predicted: &[f64]) -> Self {
        let n = actual.len() as f64;
        let pairs = || actual.iter().zip(predicted);
        Self {
            product,
            n_samples: actual.len(),
            mae: pairs().map(|(actual, predicted)| (actual - predicted).abs()).sum::<f64>() / n,
            mape: 100.0
                * pairs()
                    .map(|(actual, predicted)| ((actual - predicted) / actual.abs().max(EPSILON)).abs())
                    .sum::<f64>()
                / n,
            smape: 100.0
                * pairs()
                    .map(|(actual, predicted)| {
                        2.0 * (predicted - actual).abs()
                            / (actual.abs() + predicted.abs()).max(EPSILON)
                    })
                    .sum::<f64>()
                / n,
            directional_accuracy: directional_accuracy(actual, predicted),
            top_k_hit_rate: top_k_hit_rate(actual, predicted, TOP_K),
        }
    }
}

fn directional_accuracy(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    if actual.len() < 2 {
        return None;
    }
    let signs = |values: &[f64]| {
        values.iter().tuple_windows().map(|(a, b)| sign(b - a)).collect_vec()
    };
    let (actual, predicted) = (signs(actual), signs(predicted));
    let n_hits = actual.iter().zip(&predicted).filter(|(actual, predicted)| actual == predicted).count();
    Some(100.0 * n_hits as f64 / actual.len() as f64)
}

/// Sign with an exact zero, so that flat moves only match flat moves.
fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

fn top_k_hit_rate(actual: &[f64], predicted: &[f64], k: usize) -> Option<f64> {
    if actual.is_empty() {
        return None;
    }
    let k = k.clamp(1, actual.len());
    let top = |values: &[f64]| -> HashSet<usize> {
        (0..values.len()).sorted_by_key(|index| OrderedFloat(values[*index])).rev().take(k).collect()
    };
    let n_hits = top(actual).intersection(&top(predicted)).count();
    Some(100.0 * n_hits as f64 / k as f64)
}
