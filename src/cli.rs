mod conditioning;
mod fleet;
mod history;
mod market;
mod roll;
mod solve;
mod solver;

use clap::{Parser, Subcommand};

pub use self::{roll::RollArgs, solve::SolveArgs};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Dispatch the fleet over the realized prices in one solve, with perfect foresight.
    #[clap(name = "solve")]
    Solve(Box<SolveArgs>),

    /// Rolling-horizon dispatch: re-solve every hour against a forecast and settle at the
    /// realized prices.
    #[clap(name = "roll")]
    Roll(Box<RollArgs>),
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{
        controller::OnInfeasible,
        forecast::conditioning::Alpha,
        quantity::Quantity,
    };

    #[test]
    fn solve_defaults() {
        let args = Args::try_parse_from(["battery-dispatch", "solve", "--history", "prices.csv"])
            .unwrap();
        let Command::Solve(args) = args.command else {
            panic!("expected `solve`");
        };

        let market = args.market.build().unwrap();
        assert_eq!(market.products.energy, "SP15");
        assert_eq!(market.products.reserves.len(), 4);
        assert_eq!(market.fee, Quantity(1.0));
        assert_abs_diff_eq!(market.reserve_cap_fraction, 0.2);
        assert!(market.reserve_ramp_limit.is_none());

        let fleet = args.fleet.build().unwrap();
        assert_eq!(fleet.assets.len(), 1);
        assert_eq!(fleet.assets[0].capacity, Quantity(10.0));
        assert_eq!(fleet.assets[0].initial_state_of_charge, Quantity(5.0));
        assert_eq!(fleet.assets[0].solar_peak, None);
    }

    #[test]
    fn roll_options() {
        let args = Args::try_parse_from([
            "battery-dispatch",
            "roll",
            "--history",
            "prices.csv",
            "--n-assets",
            "3",
            "--solar",
            "--no-reserves",
            "--blend",
            "--clip",
            "--anchor",
            "--on-infeasible",
            "hold",
            "--time-limit",
            "30s",
        ])
        .unwrap();
        let Command::Roll(args) = args.command else {
            panic!("expected `roll`");
        };

        assert_eq!(args.on_infeasible, OnInfeasible::Hold);
        assert_eq!(args.horizon, 24);

        let fleet = args.fleet.build().unwrap();
        assert_eq!(fleet.assets.len(), 3);
        assert_eq!(fleet.assets[2].name, "asset_3");
        assert_eq!(fleet.assets[2].solar_peak, Some(Quantity(6.0)));

        assert!(args.market.build().unwrap().products.reserves.is_empty());
        assert_eq!(args.solver.options().time_limit.as_secs(), 30);

        let conditioning = args.conditioning.conditioning();
        conditioning.validate().unwrap();
        assert!(conditioning.anchor);
        assert!(conditioning.clip.is_some());
        assert_abs_diff_eq!(conditioning.reserve_discount, 0.6);
        let blend = conditioning.blend.unwrap();
        assert!(matches!(blend.alpha, Alpha::Calibrated(calibration) if calibration.window == 24));
    }

    #[test]
    fn fixed_alpha() {
        let args = Args::try_parse_from([
            "battery-dispatch",
            "roll",
            "--history",
            "prices.csv",
            "--blend",
            "--alpha",
            "0.3",
        ])
        .unwrap();
        let Command::Roll(args) = args.command else {
            panic!("expected `roll`");
        };
        let blend = args.conditioning.conditioning().blend.unwrap();
        assert!(matches!(blend.alpha, Alpha::Fixed(alpha) if (alpha - 0.3).abs() < 1e-12));
    }
}
