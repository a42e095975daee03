use serde::Deserialize;

use crate::{
    core::STEP,
    prelude::*,
    quantity::{Quantity, energy::MegawattHours, power::Megawatts, price::Price},
};

#[must_use]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Efficiency {
    /// Charging efficiency, `0..=1`.
    pub charging: f64,

    /// Discharging efficiency, `0..=1`.
    pub discharging: f64,
}

impl Efficiency {
    /// Split the round-trip efficiency evenly between charging and discharging.
    pub fn from_round_trip(round_trip: f64) -> Self {
        let one_way = round_trip.sqrt();
        Self { charging: one_way, discharging: one_way }
    }
}

/// Battery storage asset, one per fleet node.
#[must_use]
#[derive(Clone, Debug, Deserialize)]
pub struct Asset {
    pub name: String,

    /// Usable energy capacity.
    pub capacity: MegawattHours,

    /// Maximum charging and discharging power.
    pub power: Megawatts,

    /// Fraction of energy recovered after a full charge and discharge cycle.
    pub round_trip_efficiency: f64,

    /// Degradation cost of every megawatt-hour of battery throughput.
    pub degradation_rate: Price,

    /// State of charge at the beginning of the run.
    pub initial_state_of_charge: MegawattHours,

    /// Nameplate of the co-located solar installation, if any.
    #[serde(default)]
    pub solar_peak: Option<Megawatts>,
}

impl Asset {
    pub fn efficiency(&self) -> Efficiency {
        Efficiency::from_round_trip(self.round_trip_efficiency)
    }

    /// State of charge at the end of a step, given the one at its beginning.
    pub fn next_state_of_charge(
        &self,
        state_of_charge: MegawattHours,
        charge: Megawatts,
        discharge: Megawatts,
    ) -> MegawattHours {
        let efficiency = self.efficiency();
        state_of_charge + charge * STEP * efficiency.charging
            - discharge * STEP / efficiency.discharging
    }

    pub fn validate(&self) -> Result {
        ensure!(
            self.capacity.is_finite() && self.capacity > Quantity::ZERO,
            "asset `{}`: capacity must be positive, got {}",
            self.name,
            self.capacity,
        );
        ensure!(
            self.power.is_finite() && self.power > Quantity::ZERO,
            "asset `{}`: power must be positive, got {}",
            self.name,
            self.power,
        );
        ensure!(
            self.round_trip_efficiency > 0.0 && self.round_trip_efficiency <= 1.0,
            "asset `{}`: round-trip efficiency must be within (0, 1], got {}",
            self.name,
            self.round_trip_efficiency,
        );
        ensure!(
            self.degradation_rate.is_finite() && self.degradation_rate >= Quantity::ZERO,
            "asset `{}`: degradation rate must be non-negative, got {}",
            self.name,
            self.degradation_rate,
        );
        ensure!(
            self.initial_state_of_charge >= Quantity::ZERO
                && self.initial_state_of_charge <= self.capacity,
            "asset `{}`: initial state of charge {} is outside [0, {}]",
            self.name,
            self.initial_state_of_charge,
            self.capacity,
        );
        if let Some(solar_peak) = self.solar_peak {
            ensure!(
                solar_peak.is_finite() && solar_peak >= Quantity::ZERO,
                "asset `{}`: solar peak must be non-negative, got {solar_peak}",
                self.name,
            );
        }
        Ok(())
    }
}

#[must_use]
#[derive(Clone, Debug, Deserialize)]
pub struct Fleet {
    pub assets: Vec<Asset>,
}

impl Fleet {
    pub fn validate(&self) -> Result {
        ensure!(!self.assets.is_empty(), "the fleet has no assets");
        for asset in &self.assets {
            asset.validate()?;
        }
        Ok(())
    }

    pub fn total_power(&self) -> Megawatts {
        self.assets.iter().map(|asset| asset.power).sum()
    }

    pub fn initial_states(&self) -> Vec<MegawattHours> {
        self.assets.iter().map(|asset| asset.initial_state_of_charge).collect()
    }
}
