//! Rolling-horizon dispatch: re-solve every hour against the freshest forecast, execute only
//! the first step, and settle it at the realized prices.

pub mod execution;
pub mod ledger;
pub mod policy;

use std::{
    ops::Range,
    sync::atomic::{AtomicBool, Ordering},
};

use bon::Builder;

pub use self::{execution::EnergyEdge, ledger::Ledger, policy::OnInfeasible};
use crate::{
    core::{
        accounting::Coefficients,
        asset::Fleet,
        decision::{Decision, Step},
        market::Market,
        model::{DispatchError, DispatchModel, SolverOptions},
        point::Point,
        solar,
    },
    forecast::{ForecastProvider, conditioning::Conditioning},
    prelude::*,
    quantity::{Quantity, energy::MegawattHours},
};

#[derive(Builder)]
pub struct RollingController<'a> {
    /// Realized history, the forecasts index into it.
    history: &'a [Point],

    provider: &'a dyn ForecastProvider,
    conditioning: &'a Conditioning,
    fleet: &'a Fleet,
    market: &'a Market,
    options: SolverOptions,

    /// Number of hourly steps every horizon looks ahead.
    horizon: usize,

    /// History indices to execute.
    interval: Range<usize>,

    execution: Option<EnergyEdge>,

    #[builder(default)]
    on_infeasible: OnInfeasible,

    /// Checked between the iterations, the loop stops cleanly once it is set.
    should_terminate: Option<&'a AtomicBool>,
}

impl RollingController<'_> {
    #[instrument(
        skip_all,
        fields(
            provider = self.provider.name(),
            start = self.interval.start,
            end = self.interval.end,
            horizon = self.horizon,
        ),
    )]
    pub fn run(self) -> Result<Ledger> {
        self.validate()?;
        self.provider.ensure_available().with_context(|| {
            format!("the `{}` forecast provider is not available", self.provider.name())
        })?;

        let mut states = self.fleet.initial_states();
        let mut ledger = Ledger::default();

        for index in self.interval.clone() {
            if self.should_terminate.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                warn!(index, "interrupted, keeping the results so far");
                break;
            }
            let Some(forecast) = self.provider.forecast(index, self.horizon) else {
                info!(index, "no forecast available, stopping");
                break;
            };
            if forecast.start_index > index {
                info!(index, forecast.start_index, "the forecast start is clipped, stopping");
                break;
            }
            ensure!(
                forecast.start_index == index,
                "asked for a forecast at {index}, got one at {}",
                forecast.start_index,
            );
            ensure!(
                forecast.indices().end <= self.history.len(),
                "the forecast at {index} reaches beyond the history",
            );

            let alphas =
                self.conditioning.alphas(self.provider, self.history, &self.market.products, index);
            let path = self.conditioning.apply(
                &forecast,
                self.history,
                &self.market.products,
                alphas.as_deref(),
            );
            let point = &self.history[index];

            let step = match self.solve(&path, &states) {
                Ok(decisions) => self.execute(point, decisions, &path, &states),
                Err(error) if error.is_horizon_failure() && self.on_infeasible == OnInfeasible::Hold => {
                    warn!(index, %point.timestamp, %error, "holding the state of charge");
                    let step = self.idle(point, &states);
                    ledger.hold(step);
                    continue;
                }
                Err(error) => {
                    return Err(Error::from(error))
                        .with_context(|| format!("failed to dispatch {}", point.timestamp));
                }
            };
            for (state, decision) in states.iter_mut().zip(&step.decisions) {
                *state = decision.state_of_charge;
            }
            debug!(
                index,
                %point.timestamp,
                profit = %step.profit().total(),
                n_steps = path.len(),
                "executed",
            );
            ledger.record(step);
        }

        info!(n_steps = ledger.len(), n_held = ledger.held.len(), total = %ledger.total(), "finished");
        Ok(ledger)
    }

    fn validate(&self) -> Result {
        ensure!(self.horizon != 0, "the horizon must be at least one step");
        ensure!(
            self.interval.end <= self.history.len(),
            "the interval ends at {}, beyond the history of {}",
            self.interval.end,
            self.history.len(),
        );
        self.fleet.validate()?;
        self.market.validate()?;
        self.conditioning.validate()
    }

    fn solve(
        &self,
        path: &[Point],
        states: &[MegawattHours],
    ) -> Result<Vec<Decision>, DispatchError> {
        let schedule = DispatchModel::builder()
            .horizon(path)
            .fleet(self.fleet)
            .market(self.market)
            .initial_states(states)
            .options(self.options)
            .build()
            .solve()?;
        let first = schedule
            .steps
            .into_iter()
            .next()
            .ok_or_else(|| DispatchError::InvalidInput("the schedule is empty".to_string()))?;
        Ok(first.decisions)
    }

    /// Apply the execution filter, carry the state of charge, and settle at the realized prices.
    fn execute(
        &self,
        point: &Point,
        decisions: Vec<Decision>,
        path: &[Point],
        states: &[MegawattHours],
    ) -> Step {
        let decisions: Vec<Decision> = self
            .fleet
            .assets
            .iter()
            .zip(decisions)
            .zip(states)
            .map(|((asset, decision), state_of_charge)| {
                let mut decision = match self.execution {
                    Some(execution) => execution.apply(decision, path),
                    None => decision,
                };
                decision.state_of_charge = asset
                    .next_state_of_charge(*state_of_charge, decision.charge, decision.discharge)
                    .clamp(Quantity::ZERO, asset.capacity);
                decision
            })
            .collect();
        self.settle(point, decisions)
    }

    /// Idle fleet at the carried state of charge, the solar is curtailed.
    fn idle(&self, point: &Point, states: &[MegawattHours]) -> Step {
        let n_reserves = self.market.products.reserves.len();
        let decisions = self
            .fleet
            .assets
            .iter()
            .zip(states)
            .map(|(asset, state_of_charge)| {
                Decision::idle(n_reserves, *state_of_charge, solar::generation(asset, point))
            })
            .collect();
        self.settle(point, decisions)
    }

    fn settle(&self, point: &Point, decisions: Vec<Decision>) -> Step {
        let profits = self
            .fleet
            .assets
            .iter()
            .zip(&decisions)
            .map(|(asset, decision)| {
                Coefficients::new(&point.prices, self.market.fee, asset.degradation_rate)
                    .profit(decision)
            })
            .collect();
        Step { timestamp: point.timestamp, prices: point.prices.clone(), decisions, profits }
    }
}
