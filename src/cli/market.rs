use clap::Parser;

use crate::{
    core::{
        market::Market,
        product::{ProductSet, Reserve},
    },
    prelude::*,
    quantity::{power::Megawatts, price::Price, time::Hours},
};

#[must_use]
#[derive(Parser)]
pub struct MarketArgs {
    /// Name of the energy price column.
    #[clap(long = "energy-product", env = "ENERGY_PRODUCT", default_value = "SP15")]
    pub energy_product: String,

    /// Reserve product as `<name>:<up|down>`, the name being its price column.
    #[clap(
        long = "reserve",
        env = "RESERVES",
        value_delimiter = ',',
        default_values = ["RegUp:up", "RegDown:down", "Spin:up", "NonSpin:up"],
    )]
    pub reserves: Vec<String>,

    /// Trade energy only.
    #[clap(long = "no-reserves", env = "NO_RESERVES")]
    pub no_reserves: bool,

    /// Transaction fee on every grid-facing megawatt-hour.
    #[clap(long = "fee", env = "FEE", default_value = "1")]
    pub fee: Price,

    /// Maximum share of the asset power committed to reserves.
    #[clap(long = "reserve-cap-fraction", env = "RESERVE_CAP_FRACTION", default_value = "0.2")]
    pub reserve_cap_fraction: f64,

    /// How long a reserve commitment must be sustainable when activated.
    #[clap(long = "activation-hours", env = "ACTIVATION_HOURS", default_value = "1")]
    pub activation_duration: Hours,

    /// Maximum hour-to-hour change of a reserve commitment.
    #[clap(long = "reserve-ramp-limit-mw", env = "RESERVE_RAMP_LIMIT_MW")]
    pub reserve_ramp_limit: Option<Megawatts>,
}

impl MarketArgs {
    pub fn build(&self) -> Result<Market> {
        let reserves = if self.no_reserves {
            Vec::new()
        } else {
            self.reserves.iter().map(|reserve| reserve.parse::<Reserve>()).collect::<Result<_>>()?
        };
        let market = Market::builder()
            .products(ProductSet { energy: self.energy_product.clone(), reserves })
            .fee(self.fee)
            .reserve_cap_fraction(self.reserve_cap_fraction)
            .activation_duration(self.activation_duration)
            .maybe_reserve_ramp_limit(self.reserve_ramp_limit)
            .build();
        market.validate()?;
        Ok(market)
    }
}
