use crate::{
    core::point::Point,
    forecast::{Forecast, ForecastProvider},
};

/// Perfect foresight: the forecast is the realized history.
pub struct Oracle<'a> {
    points: &'a [Point],
}

impl<'a> Oracle<'a> {
    pub const fn new(points: &'a [Point]) -> Self {
        Self { points }
    }
}

impl ForecastProvider for Oracle<'_> {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn forecast(&self, start_index: usize, horizon: usize) -> Option<Forecast> {
        let end = start_index.saturating_add(horizon).min(self.points.len());
        let points = self.points.get(start_index..end).filter(|points| !points.is_empty())?;
        Some(Forecast {
            start_index,
            prices: points.iter().map(|point| point.prices.clone()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::point::tests::path, quantity::price::Price};

    #[test]
    fn truncated_at_the_end() {
        let points = path(0, &[(1.0, &[]), (2.0, &[]), (3.0, &[])]);
        let oracle = Oracle::new(&points);

        let forecast = oracle.forecast(1, 24).unwrap();
        assert_eq!(forecast.indices(), 1..3);
        assert_eq!(forecast.prices[0].energy, Price::from(2.0));

        assert_eq!(oracle.forecast(0, 2).unwrap().prices.len(), 2);
        assert!(oracle.forecast(3, 24).is_none());
        assert!(oracle.forecast(0, 0).is_none());
    }
}
