use std::{fs, path::PathBuf};

use clap::Parser;

use crate::{
    core::asset::{Asset, Fleet},
    prelude::*,
    quantity::{energy::MegawattHours, power::Megawatts, price::Price},
};

/// Either a TOML fleet definition, or a number of identical assets.
#[must_use]
#[derive(Parser)]
pub struct FleetArgs {
    /// TOML file with the `[[assets]]` tables, overrides the identical-asset options.
    #[clap(id = "fleet", long = "fleet", env = "FLEET_PATH")]
    pub path: Option<PathBuf>,

    #[clap(long = "n-assets", env = "N_ASSETS", default_value = "1")]
    pub n_assets: usize,

    #[clap(long = "capacity-mwh", env = "CAPACITY_MWH", default_value = "10")]
    pub capacity: MegawattHours,

    #[clap(long = "power-mw", env = "POWER_MW", default_value = "10")]
    pub power: Megawatts,

    #[clap(long = "round-trip-efficiency", env = "ROUND_TRIP_EFFICIENCY", default_value = "0.8")]
    pub round_trip_efficiency: f64,

    #[clap(long = "initial-soc-mwh", env = "INITIAL_SOC_MWH", default_value = "5")]
    pub initial_state_of_charge: MegawattHours,

    /// Battery wear cost of every megawatt-hour charged or discharged.
    #[clap(long = "degradation-rate", env = "DEGRADATION_RATE", default_value = "5")]
    pub degradation_rate: Price,

    /// Co-locate solar with every asset.
    #[clap(long = "solar", env = "SOLAR")]
    pub solar: bool,

    #[clap(long = "solar-peak-mw", env = "SOLAR_PEAK_MW", default_value = "6")]
    pub solar_peak: Megawatts,
}

impl FleetArgs {
    pub fn build(&self) -> Result<Fleet> {
        let fleet = match &self.path {
            Some(path) => {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("failed to read `{}`", path.display()))?;
                toml::from_str(&contents)
                    .with_context(|| format!("failed to parse `{}`", path.display()))?
            }
            None => Fleet {
                assets: (1..=self.n_assets)
                    .map(|number| Asset {
                        name: format!("asset_{number}"),
                        capacity: self.capacity,
                        power: self.power,
                        round_trip_efficiency: self.round_trip_efficiency,
                        degradation_rate: self.degradation_rate,
                        initial_state_of_charge: self.initial_state_of_charge,
                        solar_peak: self.solar.then_some(self.solar_peak),
                    })
                    .collect(),
            },
        };
        fleet.validate()?;
        info!(
            n_assets = fleet.assets.len(),
            total_power = %fleet.total_power(),
            "configured the fleet",
        );
        Ok(fleet)
    }
}
