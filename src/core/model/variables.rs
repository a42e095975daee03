use good_lp::{Expression, ProblemVariables, Variable, variable};

use crate::core::{STEP, accounting::Coefficients, asset::Asset};

/// Decision variables of one asset in one step.
pub struct StepVariables {
    pub charge: Variable,
    pub discharge: Variable,
    pub grid_charge: Variable,
    pub solar_to_battery: Variable,
    pub solar_to_grid: Variable,
    pub solar_curtailed: Variable,

    /// End-of-step state of charge.
    pub state_of_charge: Variable,

    /// Binary: charging as opposed to discharging.
    pub is_charging: Variable,

    /// Binary: trading energy as opposed to holding reserves.
    pub is_energy: Variable,

    pub reserves: Vec<ReserveVariables>,
}

pub struct ReserveVariables {
    pub commitment: Variable,

    /// Binary: gates a non-zero commitment.
    pub is_selected: Variable,
}

impl StepVariables {
    pub fn add(problem: &mut ProblemVariables, asset: &Asset, n_reserves: usize) -> Self {
        let power = asset.power.0;
        Self {
            charge: problem.add(variable().min(0.0).max(power)),
            discharge: problem.add(variable().min(0.0).max(power)),
            grid_charge: problem.add(variable().min(0.0).max(power)),
            solar_to_battery: problem.add(variable().min(0.0).max(power)),
            solar_to_grid: problem.add(variable().min(0.0)),
            solar_curtailed: problem.add(variable().min(0.0)),
            state_of_charge: problem.add(variable().min(0.0).max(asset.capacity.0)),
            is_charging: problem.add(variable().binary()),
            is_energy: problem.add(variable().binary()),
            reserves: (0..n_reserves)
                .map(|_| ReserveVariables {
                    commitment: problem.add(variable().min(0.0).max(power)),
                    is_selected: problem.add(variable().binary()),
                })
                .collect(),
        }
    }

    pub fn total_reserve(&self) -> Expression {
        self.reserves.iter().map(|reserve| reserve.commitment).sum()
    }

    /// Step profit as a linear expression, term for term with [`Coefficients::profit`].
    pub fn profit(&self, coefficients: &Coefficients) -> Expression {
        let hours = STEP.0;
        let mut profit = Expression::default();
        profit += (coefficients.discharge.0 * hours) * self.discharge;
        profit += (coefficients.grid_charge.0 * hours) * self.grid_charge;
        profit += (coefficients.solar_to_grid.0 * hours) * self.solar_to_grid;
        for (reserve, price) in self.reserves.iter().zip(&coefficients.reserves) {
            profit += (price.0 * hours) * reserve.commitment;
        }
        profit += (coefficients.throughput.0 * hours) * (self.charge + self.discharge);
        profit
    }
}
