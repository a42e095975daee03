use clap::Parser;

use crate::{
    cli::{fleet::FleetArgs, history::HistoryArgs, market::MarketArgs, solver::SolverArgs},
    core::{
        model::DispatchModel,
        summary::{ACTION_THRESHOLD, ReserveSummary, profit_by_product, time_blocks},
    },
    prelude::*,
    tables::{
        build_blocks_table,
        build_decisions_table,
        build_profit_table,
        build_reserve_table,
    },
};

#[derive(Parser)]
pub struct SolveArgs {
    #[clap(flatten)]
    pub history: HistoryArgs,

    #[clap(flatten)]
    pub fleet: FleetArgs,

    #[clap(flatten)]
    pub market: MarketArgs,

    #[clap(flatten)]
    pub solver: SolverArgs,
}

impl SolveArgs {
    #[instrument(skip_all)]
    pub fn run(&self) -> Result {
        let market = self.market.build()?;
        let fleet = self.fleet.build()?;
        let options = self.solver.options();
        options.backend.ensure_available()?;

        let (history, interval) = self.history.load(&market.products)?;
        let horizon = &history.points[interval];
        let initial_states = fleet.initial_states();
        let schedule = DispatchModel::builder()
            .horizon(horizon)
            .fleet(&fleet)
            .market(&market)
            .initial_states(&initial_states)
            .options(options)
            .build()
            .solve()
            .context("failed to dispatch the interval")?;
        info!(n_steps = schedule.steps.len(), objective = %schedule.objective(), "solved");

        println!("{}", build_decisions_table(&schedule.steps, &fleet, &market.products));
        println!(
            "{}",
            build_profit_table(&profit_by_product(&schedule.profit(), &market.products), &market.products),
        );
        println!(
            "{}",
            build_reserve_table(
                ReserveSummary::new(&schedule.steps, fleet.total_power()),
                &market,
                &fleet,
            ),
        );
        println!("{}", build_blocks_table(&time_blocks(&schedule.steps, ACTION_THRESHOLD)));
        Ok(())
    }
}
