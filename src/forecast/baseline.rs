use crate::core::{point::Point, product::Prices};

/// What the baseline falls back to when the lagged value is not known yet.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, clap::ValueEnum)]
pub enum Fallback {
    /// The last observation before the forecast start.
    #[default]
    Persistence,

    Zero,
}

/// Same-hour-some-time-ago seasonal baseline.
#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct SeasonalBaseline {
    /// Lag in hourly steps, a day by default.
    pub lag: usize,

    pub fallback: Fallback,
}

impl Default for SeasonalBaseline {
    fn default() -> Self {
        Self { lag: 24, fallback: Fallback::Persistence }
    }
}

impl SeasonalBaseline {
    /// Baseline prices for `len` steps starting at `start`, using only history before `start`.
    ///
    /// The result is truncated at the end of the history.
    pub fn horizon(&self, points: &[Point], start: usize, len: usize) -> Vec<Prices> {
        let end = start.saturating_add(len).min(points.len());
        (start..end).map(|index| self.at(points, index, start)).collect()
    }

    /// Baseline price of `index`, as seen at `known_until` (exclusive).
    pub fn at(&self, points: &[Point], index: usize, known_until: usize) -> Prices {
        let lagged = index.checked_sub(self.lag).filter(|source| *source < known_until);
        if let Some(point) = lagged.and_then(|source| points.get(source)) {
            return point.prices.clone();
        }
        match self.fallback {
            Fallback::Persistence => {
                points.get(known_until.saturating_sub(1)).map_or_else(
                    || Prices::zeros(points.first().map_or(0, |point| point.prices.reserves.len())),
                    |point| point.prices.clone(),
                )
            }
            Fallback::Zero => {
                Prices::zeros(points.first().map_or(0, |point| point.prices.reserves.len()))
            }
        }
    }
}
