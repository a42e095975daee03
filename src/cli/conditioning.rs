use clap::Parser;

use crate::forecast::{
    baseline::{Fallback, SeasonalBaseline},
    calibration::Calibration,
    conditioning::{Alpha, Blend, Clip, Conditioning},
};

/// Post-processing of the raw forecasts before they reach the dispatch model.
#[must_use]
#[derive(Parser)]
pub struct ConditioningArgs {
    /// Blend the forecasts with the seasonal baseline.
    #[clap(long = "blend", env = "BLEND")]
    pub blend: bool,

    /// Fixed weight of the raw forecast in the blend, calibrated every hour when omitted.
    #[clap(long = "alpha", env = "BLEND_ALPHA")]
    pub alpha: Option<f64>,

    /// Realized hours to calibrate the blend weight on.
    #[clap(long = "calib-hours", env = "CALIB_HOURS", default_value = "24")]
    pub calib_hours: usize,

    #[clap(long = "alpha-step", env = "ALPHA_STEP", default_value = "0.05")]
    pub alpha_step: f64,

    /// Seasonal lag of the baseline in hours.
    #[clap(long = "lag", env = "BASELINE_LAG", default_value = "24")]
    pub lag: usize,

    /// Baseline when the lagged value is not realized yet.
    #[clap(long = "fallback", env = "BASELINE_FALLBACK", default_value = "persistence")]
    pub fallback: Fallback,

    /// Conservative multiplier of the reserve price forecasts.
    #[clap(long = "reserve-discount", env = "RESERVE_DISCOUNT", default_value = "0.6")]
    pub reserve_discount: f64,

    /// Clip the forecasts to the quantiles of the recent history.
    #[clap(long = "clip", env = "CLIP")]
    pub clip: bool,

    #[clap(long = "clip-window", env = "CLIP_WINDOW", default_value = "500")]
    pub clip_window: usize,

    #[clap(long = "q-low", env = "CLIP_Q_LOW", default_value = "0.01")]
    pub q_low: f64,

    #[clap(long = "q-high", env = "CLIP_Q_HIGH", default_value = "0.99")]
    pub q_high: f64,

    /// Replace the first forecast step with the realized prices.
    #[clap(long = "anchor", env = "ANCHOR")]
    pub anchor: bool,
}

impl ConditioningArgs {
    pub const fn baseline(&self) -> SeasonalBaseline {
        SeasonalBaseline { lag: self.lag, fallback: self.fallback }
    }

    pub fn conditioning(&self) -> Conditioning {
        let blend = self.blend.then(|| Blend {
            baseline: self.baseline(),
            alpha: self.alpha.map_or(
                Alpha::Calibrated(Calibration { window: self.calib_hours, step: self.alpha_step }),
                Alpha::Fixed,
            ),
        });
        let clip = self.clip.then_some(Clip {
            window: self.clip_window,
            low: self.q_low,
            high: self.q_high,
        });
        Conditioning::builder()
            .maybe_blend(blend)
            .reserve_discount(self.reserve_discount)
            .maybe_clip(clip)
            .anchor(self.anchor)
            .build()
    }
}
