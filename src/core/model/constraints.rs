//! Constraint families of one asset in one step.

use good_lp::{Constraint, Expression, constraint};

use crate::{
    core::{
        STEP,
        asset::Asset,
        market::Market,
        model::variables::StepVariables,
        product::Direction,
    },
    quantity::{energy::MegawattHours, power::Megawatts},
};

/// What precedes the step.
#[derive(Copy, Clone)]
pub enum Previous<'a> {
    /// First step of the horizon, seeded from the caller-supplied state of charge.
    Initial(MegawattHours),

    Step(&'a StepVariables),
}

pub struct Formulation<'a> {
    pub asset: &'a Asset,
    pub market: &'a Market,
}

impl Formulation<'_> {
    pub fn constrain(
        &self,
        constraints: &mut Vec<Constraint>,
        step: &StepVariables,
        previous: Previous<'_>,
        solar: Megawatts,
    ) {
        self.state_of_charge_dynamics(constraints, step, previous);
        self.charge_discharge_exclusivity(constraints, step);
        self.energy_reserve_exclusivity(constraints, step);
        self.reserve_selection(constraints, step);
        self.reserve_cap(constraints, step);
        self.headroom(constraints, step);
        Self::solar_balance(constraints, step, solar);
        Self::charge_composition(constraints, step);
        if let Previous::Step(previous) = previous {
            self.reserve_ramp(constraints, step, previous);
        }
    }

    fn state_of_charge_dynamics(
        &self,
        constraints: &mut Vec<Constraint>,
        step: &StepVariables,
        previous: Previous<'_>,
    ) {
        let efficiency = self.asset.efficiency();
        let hours = STEP.0;
        let before = match previous {
            Previous::Initial(state_of_charge) => Expression::from_other_affine(state_of_charge.0),
            Previous::Step(previous) => Expression::from_other_affine(previous.state_of_charge),
        };
        constraints.push(constraint!(
            step.state_of_charge
                == before + (efficiency.charging * hours) * step.charge
                    - (hours / efficiency.discharging) * step.discharge
        ));
    }

    fn charge_discharge_exclusivity(&self, constraints: &mut Vec<Constraint>, step: &StepVariables) {
        let power = self.asset.power.0;
        constraints.push(constraint!(step.charge <= power * step.is_charging));
        constraints.push(constraint!(step.discharge + power * step.is_charging <= power));
    }

    fn energy_reserve_exclusivity(&self, constraints: &mut Vec<Constraint>, step: &StepVariables) {
        let power = self.asset.power.0;
        constraints.push(constraint!(step.charge + step.discharge <= power * step.is_energy));
        constraints.push(constraint!(step.total_reserve() + power * step.is_energy <= power));
    }

    /// Non-zero commitment needs the product selected, and at most one product is selected
    /// outside of the energy mode.
    fn reserve_selection(&self, constraints: &mut Vec<Constraint>, step: &StepVariables) {
        let power = self.asset.power.0;
        for reserve in &step.reserves {
            constraints.push(constraint!(reserve.commitment <= power * reserve.is_selected));
        }
        if !step.reserves.is_empty() {
            let n_selected: Expression = step.reserves.iter().map(|reserve| reserve.is_selected).sum();
            constraints.push(constraint!(n_selected + step.is_energy <= 1.0));
        }
    }

    fn reserve_cap(&self, constraints: &mut Vec<Constraint>, step: &StepVariables) {
        let cap = self.market.reserve_cap_fraction * self.asset.power.0;
        constraints.push(constraint!(step.total_reserve() <= cap));
    }

    /// An activated reserve must be physically deliverable for the activation duration,
    /// using the end-of-step state of charge.
    fn headroom(&self, constraints: &mut Vec<Constraint>, step: &StepVariables) {
        let efficiency = self.asset.efficiency();
        let duration = self.market.activation_duration.0;
        let capacity = self.asset.capacity.0;
        for (reserve, product) in step.reserves.iter().zip(&self.market.products.reserves) {
            match product.direction {
                Direction::Up => constraints.push(constraint!(
                    step.state_of_charge >= (duration / efficiency.discharging) * reserve.commitment
                )),
                Direction::Down => constraints.push(constraint!(
                    step.state_of_charge + (duration * efficiency.charging) * reserve.commitment
                        <= capacity
                )),
            }
        }
    }

    fn solar_balance(constraints: &mut Vec<Constraint>, step: &StepVariables, solar: Megawatts) {
        constraints.push(constraint!(
            step.solar_to_battery + step.solar_to_grid + step.solar_curtailed == solar.0
        ));
    }

    fn charge_composition(constraints: &mut Vec<Constraint>, step: &StepVariables) {
        constraints.push(constraint!(step.charge == step.grid_charge + step.solar_to_battery));
    }

    fn reserve_ramp(
        &self,
        constraints: &mut Vec<Constraint>,
        step: &StepVariables,
        previous: &StepVariables,
    ) {
        let Some(limit) = self.market.reserve_ramp_limit else {
            return;
        };
        for (reserve, previous) in step.reserves.iter().zip(&previous.reserves) {
            constraints.push(constraint!(reserve.commitment - previous.commitment <= limit.0));
            constraints.push(constraint!(previous.commitment - reserve.commitment <= limit.0));
        }
    }
}
