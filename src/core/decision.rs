use std::fmt::{Display, Formatter};

use chrono::NaiveDateTime;
use comfy_table::Color;

use crate::{
    core::{accounting::Profit, product::Prices},
    quantity::{cost::Cost, energy::MegawattHours, power::Megawatts},
};

/// Decisions of one asset in one step.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
    /// Total battery charging power, from the grid and from solar.
    pub charge: Megawatts,

    pub discharge: Megawatts,

    /// Part of [`Decision::charge`] bought from the grid.
    pub grid_charge: Megawatts,

    /// Part of [`Decision::charge`] taken from the co-located solar.
    pub solar_to_battery: Megawatts,

    pub solar_to_grid: Megawatts,
    pub solar_curtailed: Megawatts,

    /// Commitment per reserve product.
    pub reserves: Vec<Megawatts>,

    /// State of charge at the end of the step.
    pub state_of_charge: MegawattHours,
}

impl Decision {
    /// Keep the battery still, hold no reserves, and curtail the solar.
    pub fn idle(n_reserves: usize, state_of_charge: MegawattHours, solar: Megawatts) -> Self {
        Self {
            charge: Megawatts::ZERO,
            discharge: Megawatts::ZERO,
            grid_charge: Megawatts::ZERO,
            solar_to_battery: Megawatts::ZERO,
            solar_to_grid: Megawatts::ZERO,
            solar_curtailed: solar,
            reserves: vec![Megawatts::ZERO; n_reserves],
            state_of_charge,
        }
    }

    pub fn total_reserve(&self) -> Megawatts {
        self.reserves.iter().copied().sum()
    }

    #[cfg(test)]
    pub fn solar(&self) -> Megawatts {
        self.solar_to_battery + self.solar_to_grid + self.solar_curtailed
    }

    pub fn action(&self, threshold: Megawatts) -> Action {
        if self.charge > threshold {
            Action::Charge
        } else if self.discharge > threshold {
            Action::Discharge
        } else if self.total_reserve() > threshold {
            Action::Reserve
        } else {
            Action::Idle
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Action {
    Idle,
    Charge,
    Discharge,

    /// Capacity is held for ancillary reserves.
    Reserve,
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Charge => write!(f, "Charge"),
            Self::Discharge => write!(f, "Discharge"),
            Self::Reserve => write!(f, "Reserve"),
        }
    }
}

impl Action {
    pub const fn color(self) -> Color {
        match self {
            Self::Charge => Color::Green,
            Self::Discharge => Color::Blue,
            Self::Reserve => Color::DarkYellow,
            Self::Idle => Color::Reset,
        }
    }
}

/// All fleet decisions of one step.
#[must_use]
#[derive(Clone, Debug)]
pub struct Step {
    pub timestamp: NaiveDateTime,

    /// Prices the decisions were taken against.
    pub prices: Prices,

    /// One per asset.
    pub decisions: Vec<Decision>,

    /// One per asset, at [`Step::prices`].
    pub profits: Vec<Profit>,
}

impl Step {
    pub fn profit(&self) -> Profit {
        self.profits.iter().sum()
    }

    pub fn total_charge(&self) -> Megawatts {
        self.decisions.iter().map(|decision| decision.charge).sum()
    }

    pub fn total_discharge(&self) -> Megawatts {
        self.decisions.iter().map(|decision| decision.discharge).sum()
    }

    pub fn total_reserve(&self) -> Megawatts {
        self.decisions.iter().map(Decision::total_reserve).sum()
    }
}

/// Optimal decisions over a horizon.
#[must_use]
#[derive(Clone, Debug)]
pub struct Schedule {
    pub steps: Vec<Step>,
}

impl Schedule {
    /// Objective value, evaluated on the extracted decisions.
    pub fn objective(&self) -> Cost {
        self.steps.iter().map(|step| step.profit().total()).sum()
    }

    pub fn profit(&self) -> Profit {
        self.steps.iter().flat_map(|step| &step.profits).sum()
    }
}
