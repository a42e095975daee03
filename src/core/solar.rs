use chrono::Timelike;

use crate::{
    core::{asset::Asset, point::Point},
    quantity::power::Megawatts,
};

/// Hour of the day when the generated curve peaks.
const PEAK_HOUR: f64 = 13.0;

/// Hours from the peak until the generated curve drops to zero.
const HALF_WIDTH: f64 = 6.0;

/// Solar generation available to the asset in the step.
///
/// The measured profile wins when the data carries one, otherwise a bell-shaped daytime curve
/// scaled to the asset nameplate is used. Assets without solar generate nothing.
pub fn generation(asset: &Asset, point: &Point) -> Megawatts {
    let Some(peak) = asset.solar_peak else {
        return Megawatts::ZERO;
    };
    point.solar.map_or_else(|| daytime_curve(peak, point.timestamp.hour()), |solar| {
        solar.max(Megawatts::ZERO)
    })
}

pub fn daytime_curve(peak: Megawatts, hour: u32) -> Megawatts {
    let offset = (f64::from(hour) - PEAK_HOUR) / HALF_WIDTH;
    peak * (1.0 - offset * offset).max(0.0)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        core::{asset::tests::asset, product::Prices},
        quantity::Quantity,
    };

    fn point(hour: u32, solar: Option<Megawatts>) -> Point {
        Point {
            timestamp: NaiveDate::from_ymd_opt(2025, 6, 1)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            prices: Prices::zeros(0),
            solar,
        }
    }

    #[test]
    fn curve_shape() {
        let peak = Quantity(6.0);
        assert_abs_diff_eq!(daytime_curve(peak, 13).0, 6.0);
        assert_abs_diff_eq!(daytime_curve(peak, 10).0, 6.0 * 0.75);
        assert_abs_diff_eq!(daytime_curve(peak, 7).0, 0.0);
        assert_abs_diff_eq!(daytime_curve(peak, 0).0, 0.0);
        assert_abs_diff_eq!(daytime_curve(peak, 22).0, 0.0);
    }

    #[test]
    fn no_solar_without_nameplate() {
        assert_eq!(generation(&asset(), &point(13, Some(Quantity(3.0)))), Megawatts::ZERO);
    }

    #[test]
    fn measured_profile_wins() {
        let mut asset = asset();
        asset.solar_peak = Some(Quantity(6.0));
        assert_abs_diff_eq!(generation(&asset, &point(13, Some(Quantity(2.5)))).0, 2.5);
        assert_abs_diff_eq!(generation(&asset, &point(13, None)).0, 6.0);
    }
}
