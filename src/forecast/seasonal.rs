use crate::{
    core::point::Point,
    forecast::{Forecast, ForecastProvider, baseline::SeasonalBaseline},
};

/// Forecast every step with the seasonal baseline alone.
pub struct SeasonalNaive<'a> {
    points: &'a [Point],
    baseline: SeasonalBaseline,
}

impl<'a> SeasonalNaive<'a> {
    pub const fn new(points: &'a [Point], baseline: SeasonalBaseline) -> Self {
        Self { points, baseline }
    }
}

impl ForecastProvider for SeasonalNaive<'_> {
    fn name(&self) -> &'static str {
        "seasonal-naive"
    }

    fn forecast(&self, start_index: usize, horizon: usize) -> Option<Forecast> {
        let prices = self.baseline.horizon(self.points, start_index, horizon);
        if prices.is_empty() {
            return None;
        }
        Some(Forecast { start_index, prices })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::point::tests::path, forecast::baseline::Fallback};

    #[test]
    fn repeats_the_previous_day() {
        let no_reserves: &[f64] = &[];
        let prices: Vec<(f64, &[f64])> = (0..30).map(|hour| (f64::from(hour), no_reserves)).collect();
        let points = path(0, &prices);
        let provider = SeasonalNaive::new(
            &points,
            SeasonalBaseline { lag: 24, fallback: Fallback::Zero },
        );

        let forecast = provider.forecast(26, 24).unwrap();
        assert_eq!(forecast.indices(), 26..30);
        assert_eq!(
            forecast.prices.iter().map(|prices| prices.energy.0).collect::<Vec<_>>(),
            [2.0, 3.0, 4.0, 5.0],
        );
        assert!(provider.forecast(30, 24).is_none());
    }
}
