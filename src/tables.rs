use average::Mean;
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    controller::Ledger,
    core::{
        asset::Fleet,
        decision::Step,
        market::Market,
        product::{Product, ProductSet},
        summary::{ACTION_THRESHOLD, ProductProfit, ReserveSummary, TimeBlock},
    },
    forecast::quality::Quality,
    quantity::{cost::Cost, power::Megawatts, price::Price},
};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

fn cost_cell(cost: Cost) -> Cell {
    Cell::new(cost)
        .set_alignment(CellAlignment::Right)
        .fg(if cost >= Cost::ZERO { Color::Green } else { Color::Red })
}

fn power_cell(power: Megawatts) -> Cell {
    let cell = Cell::new(power).set_alignment(CellAlignment::Right);
    if power > ACTION_THRESHOLD { cell } else { cell.add_attribute(Attribute::Dim) }
}

/// Per-step, per-asset decisions.
pub fn build_decisions_table(steps: &[Step], fleet: &Fleet, products: &ProductSet) -> Table {
    let mean_price: Price = {
        let estimate: Mean = steps.iter().map(|step| step.prices.energy.0).collect();
        if estimate.is_empty() { Price::ZERO } else { estimate.mean().into() }
    };

    let mut table = new_table();
    table.set_header(vec![
        "Date",
        "Time",
        "Asset",
        products.energy.as_str(),
        "Action",
        "Charge",
        "Discharge",
        "Grid",
        "Solar → battery",
        "Solar → grid",
        "Curtailed",
        "Reserve",
        "SoC",
        "Profit",
    ]);
    for step in steps {
        for ((asset, decision), profit) in fleet.assets.iter().zip(&step.decisions).zip(&step.profits) {
            let action = decision.action(ACTION_THRESHOLD);
            let reserve = decision
                .reserves
                .iter()
                .enumerate()
                .filter(|(_, commitment)| **commitment > ACTION_THRESHOLD)
                .map(|(index, commitment)| {
                    format!("{} {commitment}", products.name(Product::Reserve(index)))
                })
                .collect::<Vec<_>>()
                .join(", ");
            table.add_row(vec![
                Cell::new(step.timestamp.format("%b %d")).add_attribute(Attribute::Dim),
                Cell::new(step.timestamp.format("%H:%M")),
                Cell::new(&asset.name),
                Cell::new(step.prices.energy).fg(if step.prices.energy >= mean_price {
                    Color::Red
                } else {
                    Color::Green
                }),
                Cell::new(action).fg(action.color()),
                power_cell(decision.charge),
                power_cell(decision.discharge),
                power_cell(decision.grid_charge),
                power_cell(decision.solar_to_battery),
                power_cell(decision.solar_to_grid),
                power_cell(decision.solar_curtailed),
                Cell::new(reserve).fg(Color::DarkYellow),
                Cell::new(decision.state_of_charge).set_alignment(CellAlignment::Right),
                cost_cell(profit.total()),
            ]);
        }
    }
    table
}

/// Profit per product, plus the energy and ancillary totals.
pub fn build_profit_table(split: &[ProductProfit], products: &ProductSet) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Product", "Profit"]);
    for product_profit in split {
        table.add_row(vec![
            Cell::new(products.name(product_profit.product)),
            cost_cell(product_profit.profit),
        ]);
    }
    let (energy, ancillary): (Vec<_>, Vec<_>) =
        split.iter().partition(|product_profit| product_profit.product == Product::Energy);
    let energy: Cost = energy.iter().map(|product_profit| product_profit.profit).sum();
    let ancillary: Cost = ancillary.iter().map(|product_profit| product_profit.profit).sum();
    table.add_row(vec![
        Cell::new("Energy and solar export").add_attribute(Attribute::Bold),
        cost_cell(energy),
    ]);
    table.add_row(vec![Cell::new("Ancillary").add_attribute(Attribute::Bold), cost_cell(ancillary)]);
    table.add_row(vec![
        Cell::new("Total").add_attribute(Attribute::Bold),
        cost_cell(energy + ancillary),
    ]);
    table
}

pub fn build_reserve_table(summary: Option<ReserveSummary>, market: &Market, fleet: &Fleet) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Reserve", "Share of power"]);
    table.add_row(vec![
        Cell::new("Cap"),
        Cell::new(format!(
            "{:.0}% ({} of {} per asset, {} assets)",
            market.reserve_cap_fraction * 100.0,
            fleet.assets.first().map_or(Megawatts::ZERO, |asset| asset.power)
                * market.reserve_cap_fraction,
            fleet.assets.first().map_or(Megawatts::ZERO, |asset| asset.power),
            fleet.assets.len(),
        ))
        .add_attribute(Attribute::Dim),
    ]);
    match summary {
        Some(summary) => {
            table.add_row(vec![
                Cell::new("Average"),
                Cell::new(format!("{:.1}%", summary.average_percent))
                    .set_alignment(CellAlignment::Right),
            ]);
            if let Some(evening_peak_percent) = summary.evening_peak_percent {
                table.add_row(vec![
                    Cell::new("Evening peak (18–21)"),
                    Cell::new(format!("{evening_peak_percent:.1}%"))
                        .set_alignment(CellAlignment::Right),
                ]);
            }
        }
        None => {
            table.add_row(vec![Cell::new("No reserve commitments"), Cell::new("")]);
        }
    }
    table
}

pub fn build_blocks_table(blocks: &[TimeBlock]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Action", "From", "To", "Energy"]);
    for block in blocks {
        table.add_row(vec![
            Cell::new(block.action).fg(block.action.color()),
            Cell::new(block.start.format("%b %d %H:%M")),
            Cell::new(block.end.format("%b %d %H:%M")),
            Cell::new(block.quantity).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

/// Realized rolling-run profit with the component breakdown and the state of charge trace.
pub fn build_ledger_table(ledger: &Ledger, fleet: &Fleet) -> Table {
    let mut table = new_table();
    let mut header = vec![
        "Date".to_string(),
        "Time".to_string(),
        "Energy".to_string(),
        "Solar".to_string(),
        "Reserves".to_string(),
        "Degradation".to_string(),
        "Profit".to_string(),
        "Cumulative".to_string(),
    ];
    header.extend(fleet.assets.iter().map(|asset| format!("SoC {}", asset.name)));
    table.set_header(header);

    for (step, cumulative) in ledger.steps.iter().zip(&ledger.cumulative) {
        let profit = step.profit();
        let is_held = ledger.held.contains(&step.timestamp);
        let mut row = vec![
            Cell::new(step.timestamp.format("%b %d")).add_attribute(Attribute::Dim),
            Cell::new(step.timestamp.format("%H:%M")).fg(if is_held {
                Color::DarkYellow
            } else {
                Color::Reset
            }),
            cost_cell(profit.energy),
            cost_cell(profit.solar),
            cost_cell(profit.reserve_total()),
            Cell::new(profit.degradation)
                .set_alignment(CellAlignment::Right)
                .add_attribute(Attribute::Dim),
            cost_cell(profit.total()),
            cost_cell(*cumulative).add_attribute(Attribute::Bold),
        ];
        row.extend(step.decisions.iter().map(|decision| {
            Cell::new(decision.state_of_charge).set_alignment(CellAlignment::Right)
        }));
        table.add_row(row);
    }
    table
}

pub fn build_quality_table(report: &[Quality], products: &ProductSet) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Product", "Samples", "MAE", "MAPE", "sMAPE", "Direction", "Top-5"]);
    let percent = |value: Option<f64>| {
        value.map_or_else(|| "n/a".to_string(), |value| format!("{value:.1}%"))
    };
    for quality in report {
        table.add_row(vec![
            Cell::new(products.name(quality.product)),
            Cell::new(quality.n_samples).add_attribute(Attribute::Dim),
            Cell::new(format!("{:.3}", quality.mae)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}%", quality.mape)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}%", quality.smape)).set_alignment(CellAlignment::Right),
            Cell::new(percent(quality.directional_accuracy)).set_alignment(CellAlignment::Right),
            Cell::new(percent(quality.top_k_hit_rate)).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

/// Rolling result next to the perfect-foresight dispatch of the same interval.
pub fn build_comparison_table(rolling: Cost, one_shot: Cost) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Dispatch", "Profit"]);
    table.add_row(vec![Cell::new("Rolling horizon"), cost_cell(rolling)]);
    table.add_row(vec![Cell::new("Perfect foresight"), cost_cell(one_shot)]);
    if one_shot > Cost::ZERO {
        table.add_row(vec![
            Cell::new("Captured").add_attribute(Attribute::Bold),
            Cell::new(format!("{:.1}%", rolling / one_shot * 100.0))
                .set_alignment(CellAlignment::Right),
        ]);
    }
    table
}
