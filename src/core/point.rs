use chrono::NaiveDateTime;

use crate::{core::product::Prices, quantity::power::Megawatts};

/// One hourly step of the price path.
#[must_use]
#[derive(Clone, Debug)]
pub struct Point {
    /// Start of the hour.
    pub timestamp: NaiveDateTime,

    pub prices: Prices,

    /// Measured solar generation per asset, when the data carries it.
    pub solar: Option<Megawatts>,
}

#[cfg(test)]
pub mod tests {
    use chrono::{NaiveDate, TimeDelta};

    use super::*;
    use crate::quantity::price::Price;

    /// Hourly path starting on the given hour of a summer day, without measured solar.
    pub fn path(start_hour: u32, prices: &[(f64, &[f64])]) -> Vec<Point> {
        let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_hms_opt(start_hour, 0, 0).unwrap();
        prices
            .iter()
            .zip(0..)
            .map(|((energy, reserves), hour)| Point {
                timestamp: start + TimeDelta::hours(hour),
                prices: Prices {
                    energy: Price::from(*energy),
                    reserves: reserves.iter().copied().map(Price::from).collect(),
                },
                solar: None,
            })
            .collect()
    }
}
