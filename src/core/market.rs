use bon::Builder;

use crate::{
    core::product::ProductSet,
    prelude::*,
    quantity::{Quantity, power::Megawatts, price::Price, time::Hours},
};

/// Market rules and operating policy shared by every asset in the fleet.
#[must_use]
#[derive(Clone, Debug, Builder)]
pub struct Market {
    pub products: ProductSet,

    /// Symmetric transaction cost on grid-facing energy flows.
    pub fee: Price,

    /// Maximum share of the asset power that may be committed to reserves.
    pub reserve_cap_fraction: f64,

    /// How long a reserve commitment must be sustainable when activated.
    pub activation_duration: Hours,

    /// Maximum hour-to-hour change of a reserve commitment.
    pub reserve_ramp_limit: Option<Megawatts>,
}

impl Market {
    pub fn validate(&self) -> Result {
        self.products.validate()?;
        ensure!(
            self.fee.is_finite() && self.fee >= Quantity::ZERO,
            "the transaction fee must be non-negative, got {}",
            self.fee,
        );
        ensure!(
            (0.0..=1.0).contains(&self.reserve_cap_fraction),
            "the reserve cap fraction must be within [0, 1], got {}",
            self.reserve_cap_fraction,
        );
        ensure!(
            self.activation_duration.is_finite() && self.activation_duration >= Quantity::ZERO,
            "the activation duration must be non-negative, got {}",
            self.activation_duration,
        );
        if let Some(ramp_limit) = self.reserve_ramp_limit {
            ensure!(
                ramp_limit.is_finite() && ramp_limit >= Quantity::ZERO,
                "the reserve ramp limit must be non-negative, got {ramp_limit}",
            );
        }
        Ok(())
    }
}
