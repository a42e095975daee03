//! Profit accounting shared by the optimization objective and the realized ledger.
//!
//! Both sides multiply the same [`Coefficients`] with the step flows, so a perfect-foresight
//! rolling run settles to exactly the one-shot objective.

use std::{iter::zip, ops::AddAssign};

use crate::{
    core::{STEP, decision::Decision, product::Prices},
    quantity::{cost::Cost, price::Price},
};

/// Profit per megawatt-hour of every flow in one step.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct Coefficients {
    pub discharge: Price,

    /// Negative: grid charging pays the market price plus the fee.
    pub grid_charge: Price,

    pub solar_to_grid: Price,

    /// Aligned with the reserve products, paid on commitment.
    pub reserves: Vec<Price>,

    /// Negative: degradation is charged on the total battery throughput regardless of source.
    pub throughput: Price,
}

impl Coefficients {
    pub fn new(prices: &Prices, fee: Price, degradation_rate: Price) -> Self {
        Self {
            discharge: prices.energy - fee,
            grid_charge: -(prices.energy + fee),
            solar_to_grid: prices.energy - fee,
            reserves: prices.reserves.clone(),
            throughput: -degradation_rate,
        }
    }

    pub fn profit(&self, decision: &Decision) -> Profit {
        Profit {
            energy: decision.discharge * STEP * self.discharge
                + decision.grid_charge * STEP * self.grid_charge,
            solar: decision.solar_to_grid * STEP * self.solar_to_grid,
            reserves: zip(&decision.reserves, &self.reserves)
                .map(|(commitment, price)| *commitment * STEP * *price)
                .collect(),
            degradation: -((decision.charge + decision.discharge) * STEP * self.throughput),
        }
    }
}

/// Profit breakdown of a step, or of any number of steps summed up.
#[must_use]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Profit {
    /// Battery discharge revenue minus the grid charging cost.
    pub energy: Cost,

    /// Solar export revenue.
    pub solar: Cost,

    /// Revenue per reserve product.
    pub reserves: Vec<Cost>,

    /// Battery degradation cost, positive.
    pub degradation: Cost,
}

impl Profit {
    pub fn reserve_total(&self) -> Cost {
        self.reserves.iter().copied().sum()
    }

    /// Energy side of the split: arbitrage, solar export, and degradation.
    pub fn energy_total(&self) -> Cost {
        self.energy + self.solar - self.degradation
    }

    pub fn total(&self) -> Cost {
        self.energy_total() + self.reserve_total()
    }
}

impl AddAssign<&Self> for Profit {
    fn add_assign(&mut self, rhs: &Self) {
        self.energy += rhs.energy;
        self.solar += rhs.solar;
        self.degradation += rhs.degradation;
        if self.reserves.len() < rhs.reserves.len() {
            self.reserves.resize(rhs.reserves.len(), Cost::ZERO);
        }
        for (total, reserve) in zip(&mut self.reserves, &rhs.reserves) {
            *total += *reserve;
        }
    }
}

impl<'a> std::iter::Sum<&'a Self> for Profit {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |mut total, profit| {
            total += profit;
            total
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::quantity::{Quantity, energy::MegawattHours, power::Megawatts};

    fn prices() -> Prices {
        Prices { energy: Quantity(50.0), reserves: vec![Quantity(8.0), Quantity(3.0)] }
    }

    fn decision() -> Decision {
        Decision {
            charge: Megawatts::ZERO,
            discharge: Quantity(4.0),
            grid_charge: Megawatts::ZERO,
            solar_to_battery: Megawatts::ZERO,
            solar_to_grid: Quantity(2.0),
            solar_curtailed: Quantity(0.5),
            reserves: vec![Megawatts::ZERO, Megawatts::ZERO],
            state_of_charge: MegawattHours::ZERO,
        }
    }

    #[test]
    fn energy_terms() {
        let coefficients = Coefficients::new(&prices(), Quantity(1.0), Quantity(5.0));
        let profit = coefficients.profit(&decision());
        assert_abs_diff_eq!(profit.energy.0, 4.0 * 49.0);
        assert_abs_diff_eq!(profit.solar.0, 2.0 * 49.0);
        assert_abs_diff_eq!(profit.degradation.0, 4.0 * 5.0);
        assert_abs_diff_eq!(profit.total().0, 4.0 * 49.0 + 2.0 * 49.0 - 20.0);
    }

    /// Grid charging pays price plus fee, solar charging only pays degradation.
    #[test]
    fn grid_versus_solar_charging() {
        let coefficients = Coefficients::new(&prices(), Quantity(1.0), Quantity(5.0));
        let decision = Decision {
            charge: Quantity(3.0),
            discharge: Megawatts::ZERO,
            grid_charge: Quantity(1.0),
            solar_to_battery: Quantity(2.0),
            solar_to_grid: Megawatts::ZERO,
            ..decision()
        };
        let profit = coefficients.profit(&decision);
        assert_abs_diff_eq!(profit.energy.0, -51.0);
        assert_abs_diff_eq!(profit.degradation.0, 15.0);
    }

    #[test]
    fn reserve_revenue_is_paid_on_commitment() {
        let coefficients = Coefficients::new(&prices(), Quantity(1.0), Quantity(5.0));
        let decision = Decision {
            discharge: Megawatts::ZERO,
            solar_to_grid: Megawatts::ZERO,
            reserves: vec![Quantity(2.0), Megawatts::ZERO],
            ..decision()
        };
        let profit = coefficients.profit(&decision);
        assert_abs_diff_eq!(profit.reserve_total().0, 16.0);
        assert_abs_diff_eq!(profit.total().0, 16.0);
    }

    #[test]
    fn sum_profits() {
        let coefficients = Coefficients::new(&prices(), Quantity(1.0), Quantity(5.0));
        let one = coefficients.profit(&decision());
        let total: Profit = [one.clone(), one.clone()].iter().sum();
        assert_abs_diff_eq!(total.total().0, 2.0 * one.total().0);
        assert_eq!(total.reserves.len(), 2);
    }
}
