pub mod backend;
pub mod constraints;
pub mod error;
pub mod variables;

use bon::Builder;
use good_lp::{Expression, ProblemVariables, Variable};
use itertools::Itertools;

pub use self::{
    backend::{Backend, SolverOptions},
    error::DispatchError,
};
use crate::{
    core::{
        accounting::Coefficients,
        asset::{Asset, Fleet},
        decision::{Decision, Schedule, Step},
        market::Market,
        model::{
            backend::Problem,
            constraints::{Formulation, Previous},
            variables::StepVariables,
        },
        point::Point,
        solar,
    },
    prelude::*,
    quantity::{Quantity, energy::MegawattHours, power::Megawatts},
};

/// Values below this are solver noise.
const TOLERANCE: f64 = 1e-7;

/// Profit-maximising dispatch of the fleet over a horizon.
#[derive(Builder)]
pub struct DispatchModel<'a> {
    /// Price path, one point per hourly step.
    horizon: &'a [Point],

    fleet: &'a Fleet,
    market: &'a Market,

    /// State of charge of every asset at the beginning of the horizon.
    initial_states: &'a [MegawattHours],

    options: SolverOptions,
}

impl DispatchModel<'_> {
    /// Build the mixed-integer problem and solve it in one blocking call.
    ///
    /// The binaries of the returned schedule are rounded, so that charging and discharging,
    /// and energy and reserve modes, are mutually exclusive exactly. The state of charge is
    /// re-evaluated from the rounded flows.
    #[instrument(
        skip_all,
        fields(n_steps = self.horizon.len(), n_assets = self.fleet.assets.len()),
    )]
    pub fn solve(self) -> Result<Schedule, DispatchError> {
        self.validate()?;
        let n_reserves = self.market.products.reserves.len();

        let mut problem = ProblemVariables::new();
        let mut variables: Vec<Vec<StepVariables>> = Vec::with_capacity(self.horizon.len());
        for _ in self.horizon {
            variables.push(
                self.fleet
                    .assets
                    .iter()
                    .map(|asset| StepVariables::add(&mut problem, asset, n_reserves))
                    .collect(),
            );
        }

        let mut objective = Expression::default();
        let mut constraints = Vec::new();
        for (asset_index, asset) in self.fleet.assets.iter().enumerate() {
            let formulation = Formulation { asset, market: self.market };
            for (step_index, point) in self.horizon.iter().enumerate() {
                let step = &variables[step_index][asset_index];
                let previous = match step_index {
                    0 => Previous::Initial(self.initial_states[asset_index]),
                    _ => Previous::Step(&variables[step_index - 1][asset_index]),
                };
                formulation.constrain(
                    &mut constraints,
                    step,
                    previous,
                    solar::generation(asset, point),
                );
                objective += step.profit(&self.coefficients(asset, point));
            }
        }
        debug!(n_constraints = constraints.len(), "built the model");

        let problem = Problem { variables: problem, objective, constraints };
        let schedule = self.options.maximise(problem, |value| self.extract(&variables, value))?;
        debug!(objective = %schedule.objective(), "solved");
        Ok(schedule)
    }

    fn validate(&self) -> Result<(), DispatchError> {
        let n_reserves = self.market.products.reserves.len();
        if self.horizon.is_empty() {
            return Err(DispatchError::InvalidInput("the horizon is empty".to_string()));
        }
        if self.initial_states.len() != self.fleet.assets.len() {
            return Err(DispatchError::InvalidInput(format!(
                "got {} initial states for {} assets",
                self.initial_states.len(),
                self.fleet.assets.len(),
            )));
        }
        for (asset, state_of_charge) in self.fleet.assets.iter().zip(self.initial_states) {
            if !(Quantity::ZERO..=asset.capacity).contains(state_of_charge) {
                return Err(DispatchError::InvalidInput(format!(
                    "initial state of charge {state_of_charge} of `{}` is outside [0, {}]",
                    asset.name, asset.capacity,
                )));
            }
        }
        for point in self.horizon {
            if point.prices.reserves.len() != n_reserves {
                return Err(DispatchError::InvalidInput(format!(
                    "{}: expected {n_reserves} reserve prices, got {}",
                    point.timestamp,
                    point.prices.reserves.len(),
                )));
            }
            if !point.prices.energy.is_finite()
                || point.prices.reserves.iter().any(|price| !price.is_finite())
            {
                return Err(DispatchError::InvalidInput(format!(
                    "{}: non-finite price",
                    point.timestamp,
                )));
            }
        }
        Ok(())
    }

    fn coefficients(&self, asset: &Asset, point: &Point) -> Coefficients {
        Coefficients::new(&point.prices, self.market.fee, asset.degradation_rate)
    }

    fn extract(
        &self,
        variables: &[Vec<StepVariables>],
        value: &dyn Fn(Variable) -> f64,
    ) -> Schedule {
        let mut states = self.initial_states.to_vec();
        let steps = self
            .horizon
            .iter()
            .zip(variables)
            .map(|(point, step_variables)| {
                let decisions = self
                    .fleet
                    .assets
                    .iter()
                    .zip(step_variables)
                    .zip(&mut states)
                    .map(|((asset, variables), state_of_charge)| {
                        let decision =
                            Self::read_decision(asset, point, variables, *state_of_charge, value);
                        *state_of_charge = decision.state_of_charge;
                        decision
                    })
                    .collect_vec();
                let profits = self
                    .fleet
                    .assets
                    .iter()
                    .zip(&decisions)
                    .map(|(asset, decision)| self.coefficients(asset, point).profit(decision))
                    .collect();
                Step { timestamp: point.timestamp, prices: point.prices.clone(), decisions, profits }
            })
            .collect();
        Schedule { steps }
    }

    fn read_decision(
        asset: &Asset,
        point: &Point,
        variables: &StepVariables,
        state_of_charge: MegawattHours,
        value: &dyn Fn(Variable) -> f64,
    ) -> Decision {
        let read = |variable| Megawatts::from(value(variable).max(0.0)).snap_to_zero(TOLERANCE);
        let is_energy = value(variables.is_energy) > 0.5;
        let is_charging = is_energy && value(variables.is_charging) > 0.5;
        let is_discharging = is_energy && !is_charging;

        let solar = solar::generation(asset, point);
        let (grid_charge, solar_to_battery) = if is_charging {
            (read(variables.grid_charge), read(variables.solar_to_battery).min(solar))
        } else {
            (Megawatts::ZERO, Megawatts::ZERO)
        };
        let charge = grid_charge + solar_to_battery;
        let discharge = if is_discharging { read(variables.discharge) } else { Megawatts::ZERO };
        let solar_to_grid = read(variables.solar_to_grid).min(solar - solar_to_battery);
        let reserves = variables
            .reserves
            .iter()
            .map(|reserve| {
                if !is_energy && value(reserve.is_selected) > 0.5 {
                    read(reserve.commitment)
                } else {
                    Megawatts::ZERO
                }
            })
            .collect();

        Decision {
            charge,
            discharge,
            grid_charge,
            solar_to_battery,
            solar_to_grid,
            solar_curtailed: solar - solar_to_battery - solar_to_grid,
            reserves,
            state_of_charge: asset
                .next_state_of_charge(state_of_charge, charge, discharge)
                .clamp(Quantity::ZERO, asset.capacity),
        }
    }
}

#[cfg(test)]
pub mod tests {
    use std::time::Duration;

    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::core::{
        asset::tests::asset,
        decision::Action,
        market::tests::market,
        point::tests::path,
        product::tests::caiso,
    };

    pub fn options() -> SolverOptions {
        SolverOptions::builder()
            .backend(Backend::Microlp)
            .time_limit(Duration::from_secs(120))
            .build()
    }

    fn solve(horizon: &[Point], fleet: &Fleet, market: &Market) -> Schedule {
        DispatchModel::builder()
            .horizon(horizon)
            .fleet(fleet)
            .market(market)
            .initial_states(&fleet.initial_states())
            .options(options())
            .build()
            .solve()
            .unwrap()
    }

    /// Check every physical and market invariant on a solved schedule.
    pub fn assert_invariants(schedule: &Schedule, fleet: &Fleet, market: &Market) {
        for (asset_index, asset) in fleet.assets.iter().enumerate() {
            let efficiency = asset.efficiency();
            let duration = market.activation_duration.0;
            let mut state_of_charge = asset.initial_state_of_charge;
            for step in &schedule.steps {
                let decision = &step.decisions[asset_index];
                assert!(decision.state_of_charge >= Quantity::ZERO);
                assert!(decision.state_of_charge <= asset.capacity);
                assert_abs_diff_eq!(
                    decision.state_of_charge.0,
                    asset.next_state_of_charge(state_of_charge, decision.charge, decision.discharge).0,
                    epsilon = 1e-6,
                );
                state_of_charge = decision.state_of_charge;

                assert!(
                    decision.charge == Quantity::ZERO || decision.discharge == Quantity::ZERO,
                    "{decision:?}",
                );
                if decision.total_reserve() > Quantity::ZERO {
                    assert_eq!(decision.charge + decision.discharge, Quantity::ZERO);
                }
                assert!(decision.reserves.iter().filter(|r| **r > Quantity::ZERO).count() <= 1);
                assert!(
                    decision.total_reserve().0
                        <= market.reserve_cap_fraction * asset.power.0 + 1e-6
                );
                for (commitment, reserve) in decision.reserves.iter().zip(&market.products.reserves) {
                    match reserve.direction {
                        crate::core::product::Direction::Up => assert!(
                            decision.state_of_charge.0
                                >= commitment.0 * duration / efficiency.discharging - 1e-6
                        ),
                        crate::core::product::Direction::Down => assert!(
                            decision.state_of_charge.0
                                <= asset.capacity.0 - commitment.0 * duration * efficiency.charging
                                    + 1e-6
                        ),
                    }
                }
                assert_abs_diff_eq!(
                    decision.charge.0,
                    (decision.grid_charge + decision.solar_to_battery).0,
                    epsilon = 1e-9,
                );
                assert!(decision.solar_curtailed >= Quantity::ZERO);
            }
        }
    }

    fn single_asset() -> Fleet {
        Fleet { assets: vec![asset()] }
    }

    /// Cheap then expensive hour: charge to full, then discharge everything.
    #[test]
    fn two_step_arbitrage() {
        let fleet = single_asset();
        let market = market();
        let horizon = path(0, &[(10.0, &[0.0]), (100.0, &[0.0])]);
        let schedule = solve(&horizon, &fleet, &market);
        let eta = 0.8_f64.sqrt();

        let first = &schedule.steps[0].decisions[0];
        let second = &schedule.steps[1].decisions[0];
        assert!(first.charge.0 > 5.5, "{first:?}");
        assert_abs_diff_eq!(first.charge.0, 5.0 / eta, epsilon = 1e-4);
        assert_abs_diff_eq!(first.state_of_charge.0, 10.0, epsilon = 1e-4);
        assert!(second.discharge.0 > 8.9, "{second:?}");
        assert_abs_diff_eq!(second.discharge.0, 10.0 * eta, epsilon = 1e-4);
        assert_abs_diff_eq!(second.state_of_charge.0, 0.0, epsilon = 1e-4);

        let expected = 10.0 * eta * 99.0 - 5.0 / eta * 11.0 - 5.0 * (5.0 / eta + 10.0 * eta);
        assert!(schedule.objective().0 > 0.0);
        assert_abs_diff_eq!(schedule.objective().0, expected, epsilon = 1e-3);
        assert_invariants(&schedule, &fleet, &market);
    }

    /// Reserve pays far more than flat energy: hold the capped reserve every hour.
    #[test]
    fn reserve_mode_dominates() {
        let fleet = single_asset();
        let market = market();
        let reserve_prices: &[f64] = &[100.0];
        let horizon = path(0, &[(20.0, reserve_prices); 4]);
        let schedule = solve(&horizon, &fleet, &market);

        for step in &schedule.steps {
            let decision = &step.decisions[0];
            assert_eq!(decision.action(Quantity(0.01)), Action::Reserve);
            assert_abs_diff_eq!(decision.reserves[0].0, 2.0, epsilon = 1e-6);
            assert_eq!(decision.charge + decision.discharge, Quantity::ZERO);
        }
        assert_abs_diff_eq!(schedule.objective().0, 4.0 * 2.0 * 100.0, epsilon = 1e-4);
        assert_invariants(&schedule, &fleet, &market);
    }

    /// An almost empty battery cannot sell more up-reserve than it can deliver.
    #[test]
    fn up_headroom_limits_commitment() {
        let mut asset = asset();
        asset.initial_state_of_charge = Quantity(1.0);
        let fleet = Fleet { assets: vec![asset] };
        let market = market();

        // Recharging costs more than the extra reserve would earn:
        let reserve_prices: &[f64] = &[100.0];
        let horizon = path(0, &[(40.0, reserve_prices); 2]);
        let schedule = solve(&horizon, &fleet, &market);
        for step in &schedule.steps {
            assert_abs_diff_eq!(step.decisions[0].reserves[0].0, 0.8_f64.sqrt(), epsilon = 1e-6);
        }
        assert_invariants(&schedule, &fleet, &market);
    }

    /// A full battery exports its solar instead of curtailing it.
    #[test]
    fn solar_export_when_full() {
        let mut asset = asset();
        asset.initial_state_of_charge = asset.capacity;
        asset.solar_peak = Some(Quantity(6.0));
        let fleet = Fleet { assets: vec![asset] };
        let market = market();
        let horizon = path(13, &[(50.0, &[0.0])]);
        let schedule = solve(&horizon, &fleet, &market);

        let decision = &schedule.steps[0].decisions[0];
        assert_abs_diff_eq!(decision.solar_to_grid.0, 6.0, epsilon = 1e-6);
        assert_abs_diff_eq!(decision.solar().0, 6.0, epsilon = 1e-9);
        assert!(schedule.steps[0].profits[0].solar.0 > 6.0 * 49.0 - 1e-4);
        assert_invariants(&schedule, &fleet, &market);
    }

    #[test]
    fn invariants_hold_with_full_product_set() {
        let mut market = market();
        market.products = caiso();
        let mut first = asset();
        first.initial_state_of_charge = Quantity(1.0);
        first.solar_peak = Some(Quantity(6.0));
        let mut second = asset();
        second.name = "asset_2".to_string();
        second.initial_state_of_charge = Quantity(9.5);
        let fleet = Fleet { assets: vec![first, second] };

        let horizon = path(
            9,
            &[
                (25.0, &[6.0, 4.0, 3.0, 1.0]),
                (-5.0, &[2.0, 30.0, 1.0, 1.0]),
                (40.0, &[15.0, 2.0, 60.0, 2.0]),
                (120.0, &[5.0, 5.0, 5.0, 5.0]),
                (35.0, &[50.0, 45.0, 4.0, 1.0]),
            ],
        );
        let schedule = solve(&horizon, &fleet, &market);
        assert_invariants(&schedule, &fleet, &market);
        assert!(schedule.objective().0 > 0.0);
    }

    #[test]
    fn reserve_ramp_is_respected() {
        let fleet = single_asset();
        let horizon = path(0, &[(20.0, &[100.0]), (20.0, &[-50.0]), (20.0, &[100.0]), (20.0, &[-50.0])]);

        let unlimited = solve(&horizon, &fleet, &market());
        let jump = (unlimited.steps[1].decisions[0].reserves[0]
            - unlimited.steps[0].decisions[0].reserves[0])
            .abs();
        assert!(jump.0 > 0.5);

        let mut market = market();
        market.reserve_ramp_limit = Some(Quantity(0.5));
        let limited = solve(&horizon, &fleet, &market);
        for (previous, next) in limited.steps.iter().tuple_windows() {
            let change = (next.decisions[0].reserves[0] - previous.decisions[0].reserves[0]).abs();
            assert!(change.0 <= 0.5 + 1e-6, "{change:?}");
        }
        assert_invariants(&limited, &fleet, &market);
    }

    /// Identical inputs give identical results.
    #[test]
    fn deterministic() {
        let fleet = single_asset();
        let market = market();
        let horizon = path(6, &[(30.0, &[5.0]), (12.0, &[8.0]), (75.0, &[3.0]), (50.0, &[20.0])]);
        let first = solve(&horizon, &fleet, &market);
        let second = solve(&horizon, &fleet, &market);
        assert_eq!(first.objective(), second.objective());
        for (first, second) in first.steps.iter().zip(&second.steps) {
            assert_eq!(first.decisions, second.decisions);
        }
    }

    #[test]
    fn rejects_initial_state_above_capacity() {
        let fleet = single_asset();
        let market = market();
        let horizon = path(0, &[(10.0, &[0.0])]);
        let error = DispatchModel::builder()
            .horizon(&horizon)
            .fleet(&fleet)
            .market(&market)
            .initial_states(&[Quantity(11.0)])
            .options(options())
            .build()
            .solve()
            .unwrap_err();
        assert!(matches!(error, DispatchError::InvalidInput(_)), "{error}");
    }

    #[test]
    fn rejects_missing_reserve_prices() {
        let fleet = single_asset();
        let market = market();
        let horizon = path(0, &[(10.0, &[])]);
        let error = DispatchModel::builder()
            .horizon(&horizon)
            .fleet(&fleet)
            .market(&market)
            .initial_states(&fleet.initial_states())
            .options(options())
            .build()
            .solve()
            .unwrap_err();
        assert!(matches!(error, DispatchError::InvalidInput(_)), "{error}");
    }
}
