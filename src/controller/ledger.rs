use std::io;

use chrono::NaiveDateTime;

use crate::{
    core::{STEP, accounting::Profit, asset::Fleet, decision::Step},
    prelude::*,
    quantity::{cost::Cost, power::Megawatts},
};

/// Realized profit and loss of a rolling run, one entry per executed hour.
#[must_use]
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    /// Executed decisions, settled at the realized prices.
    pub steps: Vec<Step>,

    /// Running total after every step.
    pub cumulative: Vec<Cost>,

    /// Hours skipped because their horizon could not be solved.
    pub held: Vec<NaiveDateTime>,
}

impl Ledger {
    pub fn record(&mut self, step: Step) {
        let total = self.total() + step.profit().total();
        self.cumulative.push(total);
        self.steps.push(step);
    }

    /// Record a step the fleet sat out.
    pub fn hold(&mut self, step: Step) {
        self.held.push(step.timestamp);
        self.record(step);
    }

    pub fn total(&self) -> Cost {
        self.cumulative.last().copied().unwrap_or(Cost::ZERO)
    }

    pub fn profit(&self) -> Profit {
        self.steps.iter().flat_map(|step| &step.profits).sum()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Export the realized profit, the state of charge trace, and the component breakdown.
    pub fn write_csv(&self, writer: impl io::Write, fleet: &Fleet) -> Result {
        let mut writer = csv::Writer::from_writer(writer);

        let mut header = vec!["datetime".to_string(), "profit".to_string(), "profit_cum".to_string()];
        header.extend(fleet.assets.iter().map(|asset| format!("soc_{}", asset.name)));
        header.extend(
            [
                "energy_profit",
                "solar_profit",
                "reserve_profit",
                "degradation_cost",
                "charge_mwh",
                "discharge_mwh",
                "solar_to_grid_mwh",
                "reserve_mw",
            ]
            .map(String::from),
        );
        writer.write_record(&header)?;

        for (step, cumulative) in self.steps.iter().zip(&self.cumulative) {
            let profit = step.profit();
            let solar_to_grid: Megawatts =
                step.decisions.iter().map(|decision| decision.solar_to_grid).sum();
            let mut record = vec![
                step.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                profit.total().0.to_string(),
                cumulative.0.to_string(),
            ];
            record.extend(step.decisions.iter().map(|decision| decision.state_of_charge.0.to_string()));
            record.extend(
                [
                    profit.energy.0,
                    profit.solar.0,
                    profit.reserve_total().0,
                    profit.degradation.0,
                    (step.total_charge() * STEP).0,
                    (step.total_discharge() * STEP).0,
                    (solar_to_grid * STEP).0,
                    step.total_reserve().0,
                ]
                .map(|value| value.to_string()),
            );
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}
