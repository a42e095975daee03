//! Post-run digests of a sequence of fleet steps, shared by the one-shot and rolling runs.

use std::cmp::Reverse;

use average::Mean;
use chrono::{NaiveDateTime, Timelike};
use itertools::Itertools;

use crate::{
    core::{
        STEP,
        accounting::Profit,
        decision::{Action, Step},
        product::{Product, ProductSet},
    },
    quantity::{Quantity, cost::Cost, energy::MegawattHours, power::Megawatts},
};

/// Fleet quantities below this are not an action.
pub const ACTION_THRESHOLD: Megawatts = Quantity(0.01);

/// Evening peak hours, inclusive.
const EVENING_PEAK: [u32; 4] = [18, 19, 20, 21];

#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct ProductProfit {
    pub product: Product,
    pub profit: Cost,
}

/// Profit per product, the most profitable first.
///
/// The energy product carries the solar export and the battery degradation.
pub fn profit_by_product(profit: &Profit, products: &ProductSet) -> Vec<ProductProfit> {
    products
        .iter()
        .map(|product| ProductProfit {
            product,
            profit: match product {
                Product::Energy => profit.energy_total(),
                Product::Reserve(index) => {
                    profit.reserves.get(index).copied().unwrap_or(Cost::ZERO)
                }
            },
        })
        .sorted_by_key(|product_profit| Reverse(product_profit.profit))
        .collect()
}

/// Reserve commitment as a share of the total fleet power.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ReserveSummary {
    pub average_percent: f64,

    /// Only when the steps cover any evening peak hour.
    pub evening_peak_percent: Option<f64>,
}

impl ReserveSummary {
    /// `None` when there are no steps or the fleet has no power.
    pub fn new(steps: &[Step], fleet_power: Megawatts) -> Option<Self> {
        if steps.is_empty() || fleet_power <= Megawatts::ZERO {
            return None;
        }
        let percent = |step: &Step| 100.0 * (step.total_reserve() / fleet_power);
        let average: Mean = steps.iter().map(percent).collect();
        let evening_peak: Mean = steps
            .iter()
            .filter(|step| EVENING_PEAK.contains(&step.timestamp.hour()))
            .map(percent)
            .collect();
        Some(Self {
            average_percent: average.mean(),
            evening_peak_percent: (!evening_peak.is_empty()).then(|| evening_peak.mean()),
        })
    }
}

/// Consecutive hours of the same fleet action.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct TimeBlock {
    pub action: Action,

    /// Start of the first hour.
    pub start: NaiveDateTime,

    /// Start of the last hour.
    pub end: NaiveDateTime,

    /// Total energy charged or discharged over the block.
    pub quantity: MegawattHours,
}

/// Group the steps into charging and discharging blocks, idle and reserve hours dropped.
pub fn time_blocks(steps: &[Step], threshold: Megawatts) -> Vec<TimeBlock> {
    let actions = steps.iter().map(|step| {
        let (charge, discharge) = (step.total_charge(), step.total_discharge());
        if charge > threshold {
            (step.timestamp, Action::Charge, charge * STEP)
        } else if discharge > threshold {
            (step.timestamp, Action::Discharge, discharge * STEP)
        } else {
            (step.timestamp, Action::Idle, MegawattHours::ZERO)
        }
    });
    actions
        .chunk_by(|(_, action, _)| *action)
        .into_iter()
        .filter(|(action, _)| *action != Action::Idle)
        .filter_map(|(action, block)| {
            let block = block.collect_vec();
            let (start, _, _) = block.first()?;
            let (end, _, _) = block.last()?;
            Some(TimeBlock {
                action,
                start: *start,
                end: *end,
                quantity: block.iter().map(|(_, _, quantity)| *quantity).sum(),
            })
        })
        .collect()
}
