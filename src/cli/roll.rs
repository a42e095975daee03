use std::{
    fs::File,
    ops::Range,
    path::{Path, PathBuf},
    sync::atomic::AtomicBool,
};

use clap::Parser;

use crate::{
    cli::{
        conditioning::ConditioningArgs,
        fleet::FleetArgs,
        history::HistoryArgs,
        market::MarketArgs,
        solver::SolverArgs,
    },
    controller::{EnergyEdge, Ledger, OnInfeasible, RollingController},
    core::{
        asset::Fleet,
        history::History,
        market::Market,
        model::{DispatchModel, SolverOptions},
        product::ProductSet,
        summary::{ACTION_THRESHOLD, ReserveSummary, profit_by_product, time_blocks},
    },
    forecast::{
        ForecastProvider,
        file::FileForecasts,
        oracle::Oracle,
        quality,
        seasonal::SeasonalNaive,
    },
    prelude::*,
    quantity::{cost::Cost, price::Price},
    tables::{
        build_blocks_table,
        build_comparison_table,
        build_decisions_table,
        build_ledger_table,
        build_profit_table,
        build_quality_table,
        build_reserve_table,
    },
};

#[derive(Copy, Clone, Debug, clap::ValueEnum)]
pub enum Provider {
    /// Perfect foresight: the realized prices.
    Oracle,

    /// The seasonal baseline alone.
    SeasonalNaive,

    /// Precomputed forecasts, see `--forecasts`.
    File,
}

#[derive(Parser)]
pub struct RollArgs {
    #[clap(flatten)]
    pub history: HistoryArgs,

    #[clap(flatten)]
    pub fleet: FleetArgs,

    #[clap(flatten)]
    pub market: MarketArgs,

    #[clap(flatten)]
    pub solver: SolverArgs,

    #[clap(flatten)]
    pub conditioning: ConditioningArgs,

    #[clap(long = "provider", env = "FORECAST_PROVIDER", default_value = "oracle")]
    pub provider: Provider,

    /// CSV with `start_index`, `step`, and one price column per product.
    #[clap(long = "forecasts", env = "FORECASTS_PATH", required_if_eq("provider", "file"))]
    pub forecasts: Option<PathBuf>,

    /// Hourly steps every solve looks ahead.
    #[clap(long = "horizon", env = "HORIZON", default_value = "24")]
    pub horizon: usize,

    /// Execute energy trades only when the current price is this far from the horizon mean.
    #[clap(long = "energy-edge", env = "ENERGY_EDGE", default_value = "0")]
    pub energy_edge: Price,

    #[clap(long = "on-infeasible", env = "ON_INFEASIBLE", default_value = "abort")]
    pub on_infeasible: OnInfeasible,

    /// Also dispatch the executed interval in one solve with perfect foresight.
    #[clap(long = "compare", env = "COMPARE")]
    pub compare: bool,

    /// Print every executed decision.
    #[clap(long = "show-decisions", env = "SHOW_DECISIONS")]
    pub show_decisions: bool,

    /// Export the rolling-run summary as CSV.
    #[clap(long = "export", env = "EXPORT_PATH")]
    pub export: Option<PathBuf>,
}

impl RollArgs {
    #[instrument(skip_all, fields(provider = ?self.provider, horizon = self.horizon))]
    pub fn run(&self, should_terminate: &AtomicBool) -> Result {
        let market = self.market.build()?;
        let fleet = self.fleet.build()?;
        let options = self.solver.options();
        options.backend.ensure_available()?;
        let conditioning = self.conditioning.conditioning();

        let (history, interval) = self.history.load(&market.products)?;
        let provider = self.new_provider(&history, &market.products)?;

        let ledger = RollingController::builder()
            .history(&history.points)
            .provider(provider.as_ref())
            .conditioning(&conditioning)
            .fleet(&fleet)
            .market(&market)
            .options(options)
            .horizon(self.horizon)
            .interval(interval.clone())
            .execution(EnergyEdge { edge: self.energy_edge })
            .on_infeasible(self.on_infeasible)
            .should_terminate(should_terminate)
            .build()
            .run()?;
        let executed = interval.start..(interval.start + ledger.len());

        if self.show_decisions {
            println!("{}", build_decisions_table(&ledger.steps, &fleet, &market.products));
        }
        println!("{}", build_ledger_table(&ledger, &fleet));
        println!(
            "{}",
            build_profit_table(&profit_by_product(&ledger.profit(), &market.products), &market.products),
        );
        println!(
            "{}",
            build_reserve_table(ReserveSummary::new(&ledger.steps, fleet.total_power()), &market, &fleet),
        );
        println!("{}", build_blocks_table(&time_blocks(&ledger.steps, ACTION_THRESHOLD)));

        let report =
            quality::evaluate(provider.as_ref(), &history.points, &market.products, executed.clone());
        if !report.is_empty() {
            println!("{}", build_quality_table(&report, &market.products));
        }

        if self.compare && !ledger.is_empty() {
            let one_shot = one_shot_objective(&history, executed, &fleet, &market, options)?;
            println!("{}", build_comparison_table(ledger.total(), one_shot));
        }

        if let Some(path) = &self.export {
            export(&ledger, &fleet, path)?;
        }
        Ok(())
    }

    fn new_provider<'a>(
        &self,
        history: &'a History,
        products: &ProductSet,
    ) -> Result<Box<dyn ForecastProvider + 'a>> {
        Ok(match self.provider {
            Provider::Oracle => Box::new(Oracle::new(&history.points)),
            Provider::SeasonalNaive => {
                Box::new(SeasonalNaive::new(&history.points, self.conditioning.baseline()))
            }
            Provider::File => {
                let path = self.forecasts.as_deref().context("`--forecasts` is required")?;
                Box::new(FileForecasts::load(path, products, history.len())?)
            }
        })
    }
}

/// Perfect-foresight objective over the same interval and the same initial state of charge.
#[instrument(skip_all, fields(start = interval.start, end = interval.end))]
fn one_shot_objective(
    history: &History,
    interval: Range<usize>,
    fleet: &Fleet,
    market: &Market,
    options: SolverOptions,
) -> Result<Cost> {
    let initial_states = fleet.initial_states();
    let schedule = DispatchModel::builder()
        .horizon(&history.points[interval])
        .fleet(fleet)
        .market(market)
        .initial_states(&initial_states)
        .options(options)
        .build()
        .solve()
        .context("failed to dispatch the interval with perfect foresight")?;
    Ok(schedule.objective())
}

fn export(ledger: &Ledger, fleet: &Fleet, path: &Path) -> Result {
    let file = File::create(path).with_context(|| format!("failed to create `{}`", path.display()))?;
    ledger.write_csv(file, fleet)?;
    info!(path = %path.display(), n_steps = ledger.len(), "exported the summary");
    Ok(())
}
