use std::{collections::BTreeMap, io, path::Path};

use itertools::Itertools;

use crate::{
    core::product::{Prices, ProductSet},
    forecast::{Forecast, ForecastProvider},
    prelude::*,
    quantity::price::Price,
};

/// Forecasts precomputed by an external model.
///
/// The CSV carries `start_index`, `step`, and one column per product. Each `start_index` must
/// list its steps from zero without gaps.
pub struct FileForecasts {
    forecasts: BTreeMap<usize, Vec<Prices>>,

    /// Length of the history, the forecasts never reach beyond it.
    n_points: usize,
}

impl FileForecasts {
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path, products: &ProductSet, n_points: usize) -> Result<Self> {
        let reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open `{}`", path.display()))?;
        let this = Self::from_csv(reader, products, n_points)
            .with_context(|| format!("failed to load the forecasts from `{}`", path.display()))?;
        info!(n_forecasts = this.forecasts.len(), "loaded the forecasts");
        Ok(this)
    }

    #[cfg(test)]
    pub fn from_reader(reader: impl io::Read, products: &ProductSet, n_points: usize) -> Result<Self> {
        Self::from_csv(csv::Reader::from_reader(reader), products, n_points)
    }

    fn from_csv<R: io::Read>(
        mut reader: csv::Reader<R>,
        products: &ProductSet,
        n_points: usize,
    ) -> Result<Self> {
        let headers = reader.headers().context("failed to read the header")?.clone();
        let position = |name: &str| headers.iter().position(|header| header.trim() == name);
        let missing = ["start_index", "step"]
            .into_iter()
            .chain(products.names())
            .filter(|name| position(*name).is_none())
            .collect_vec();
        ensure!(missing.is_empty(), "missing columns: {}", missing.join(", "));
        let start_column = position("start_index").context("missing `start_index`")?;
        let step_column = position("step").context("missing `step`")?;
        let price_columns: Vec<usize> = products.names().filter_map(position).collect();

        let mut rows: BTreeMap<usize, BTreeMap<usize, Prices>> = BTreeMap::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("failed to read row #{}", row + 1))?;
            let parse_index = |column: usize| -> Result<usize> {
                let cell = record.get(column).context("the cell is missing")?.trim();
                cell.parse().with_context(|| format!("row #{}: invalid index `{cell}`", row + 1))
            };
            let start_index = parse_index(start_column)?;
            let step = parse_index(step_column)?;
            let mut prices = price_columns.iter().map(|column| -> Result<Price> {
                let cell = record.get(*column).context("the cell is missing")?.trim();
                let price: f64 = cell
                    .parse()
                    .with_context(|| format!("row #{}: invalid price `{cell}`", row + 1))?;
                Ok(Price::from(price))
            });
            let energy = prices.next().context("no energy price column")??;
            let reserves = prices.collect::<Result<Vec<_>>>()?;
            let previous =
                rows.entry(start_index).or_default().insert(step, Prices { energy, reserves });
            ensure!(previous.is_none(), "duplicate step {step} of forecast {start_index}");
        }

        let mut forecasts = BTreeMap::new();
        for (start_index, steps) in rows {
            ensure!(
                steps.keys().copied().eq(0..steps.len()),
                "forecast {start_index} does not list its steps from zero without gaps",
            );
            forecasts.insert(start_index, steps.into_values().collect());
        }
        Ok(Self { forecasts, n_points })
    }
}

impl ForecastProvider for FileForecasts {
    fn name(&self) -> &'static str {
        "file"
    }

    fn ensure_available(&self) -> Result {
        ensure!(!self.forecasts.is_empty(), "the forecast file is empty");
        Ok(())
    }

    fn forecast(&self, start_index: usize, horizon: usize) -> Option<Forecast> {
        let len = horizon.min(self.n_points.checked_sub(start_index)?);
        let prices = self.forecasts.get(&start_index)?.iter().take(len).cloned().collect_vec();
        if prices.is_empty() {
            return None;
        }
        Some(Forecast { start_index, prices })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::product::tests::single_reserve;

    #[test]
    fn load_and_truncate() {
        let csv = "\
start_index,step,SP15,RegUp
5,1,20,2
5,0,10,1
5,2,30,3
6,0,11,1
";
        let forecasts = FileForecasts::from_reader(csv.as_bytes(), &single_reserve(), 7).unwrap();
        forecasts.ensure_available().unwrap();

        let forecast = forecasts.forecast(5, 24).unwrap();
        assert_eq!(forecast.indices(), 5..7);
        assert_eq!(forecast.prices[1].reserves, [Price::from(2.0)]);

        assert_eq!(forecasts.forecast(5, 1).unwrap().prices.len(), 1);
        assert!(forecasts.forecast(4, 24).is_none());
        assert!(forecasts.forecast(7, 24).is_none());
    }

    #[test]
    fn gaps_are_rejected() {
        let csv = "start_index,step,SP15,RegUp\n5,0,10,1\n5,2,30,3\n";
        assert!(FileForecasts::from_reader(csv.as_bytes(), &single_reserve(), 10).is_err());
    }

    #[test]
    fn empty_file_is_unavailable() {
        let csv = "start_index,step,SP15,RegUp\n";
        let forecasts = FileForecasts::from_reader(csv.as_bytes(), &single_reserve(), 10).unwrap();
        assert!(forecasts.ensure_available().is_err());
    }
}
