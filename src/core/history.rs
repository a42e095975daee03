use std::{io, ops::Range, path::Path};

use chrono::{DateTime, NaiveDateTime, TimeDelta};
use itertools::Itertools;

use crate::{
    core::{
        point::Point,
        product::{ProductSet, Prices},
    },
    prelude::*,
    quantity::{power::Megawatts, price::Price},
};

const DATETIME_COLUMN: &str = "datetime";
const SOLAR_COLUMN: &str = "solar_gen";

const DATETIME_FORMATS: [&str; 4] =
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"];

/// Realized hourly prices, contiguous and strictly ordered.
#[must_use]
#[derive(Clone, Debug)]
pub struct History {
    pub points: Vec<Point>,
}

impl History {
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path, products: &ProductSet) -> Result<Self> {
        let reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open `{}`", path.display()))?;
        let history = Self::from_csv(reader, products)
            .with_context(|| format!("failed to load the history from `{}`", path.display()))?;
        info!(
            n_points = history.points.len(),
            since = ?history.points.first().map(|point| point.timestamp),
            until = ?history.points.last().map(|point| point.timestamp),
            "loaded the history",
        );
        Ok(history)
    }

    #[cfg(test)]
    pub fn from_reader(reader: impl io::Read, products: &ProductSet) -> Result<Self> {
        Self::from_csv(csv::Reader::from_reader(reader), products)
    }

    fn from_csv<R: io::Read>(mut reader: csv::Reader<R>, products: &ProductSet) -> Result<Self> {
        let headers = reader.headers().context("failed to read the header")?.clone();
        let position = |name: &str| headers.iter().position(|header| header.trim() == name);

        let missing = std::iter::once(DATETIME_COLUMN)
            .chain(products.names())
            .filter(|name| position(*name).is_none())
            .collect_vec();
        ensure!(missing.is_empty(), "missing columns: {}", missing.join(", "));
        let datetime_index = position(DATETIME_COLUMN).context("missing the datetime column")?;
        let price_indices: Vec<usize> = products.names().filter_map(position).collect();
        let solar_index = position(SOLAR_COLUMN);

        let mut points = Vec::new();
        let mut n_dropped = 0_usize;
        for (row, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("failed to read row #{}", row + 1))?;
            let Some(timestamp) = record.get(datetime_index).and_then(parse_timestamp) else {
                n_dropped += 1;
                continue;
            };
            let mut prices = price_indices.iter().map(|index| {
                parse_value(record.get(*index))
                    .with_context(|| format!("row #{}: invalid price", row + 1))
                    .map(Price::from)
            });
            let energy = prices.next().context("no energy price column")??;
            let reserves = prices.collect::<Result<Vec<_>>>()?;
            let solar = match solar_index.and_then(|index| record.get(index)) {
                Some(cell) if !cell.trim().is_empty() => Some(Megawatts::from(
                    parse_value(Some(cell))
                        .with_context(|| format!("row #{}: invalid solar generation", row + 1))?,
                )),
                _ => None,
            };
            points.push(Point { timestamp, prices: Prices { energy, reserves }, solar });
        }
        if n_dropped != 0 {
            warn!(n_dropped, "dropped rows with unparseable timestamps");
        }

        // Stable sort, so the first of the duplicates survives:
        points.sort_by_key(|point| point.timestamp);
        points.dedup_by_key(|point| point.timestamp);

        let history = Self { points };
        ensure!(!history.is_empty(), "the history has no valid rows");
        history.ensure_contiguous()?;
        Ok(history)
    }

    fn ensure_contiguous(&self) -> Result {
        let gaps = self
            .points
            .iter()
            .tuple_windows()
            .filter(|(previous, next)| next.timestamp - previous.timestamp != TimeDelta::hours(1))
            .map(|(previous, next)| format!("{} → {}", previous.timestamp, next.timestamp))
            .collect_vec();
        ensure!(gaps.is_empty(), "the history is not contiguous hourly: {}", gaps.join(", "));
        Ok(())
    }

    pub const fn len(&self) -> usize {
        self.points.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Validate the `[start, end)` index range, `end` defaulting to the end of the history.
    pub fn interval(&self, start: usize, end: Option<usize>) -> Result<Range<usize>> {
        let end = end.unwrap_or(self.len());
        ensure!(end <= self.len(), "the end index {end} is beyond the history of {}", self.len());
        ensure!(start < end, "the interval [{start}, {end}) is empty");
        Ok(start..end)
    }
}

fn parse_timestamp(cell: &str) -> Option<NaiveDateTime> {
    let cell = cell.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(cell) {
        return Some(timestamp.naive_local());
    }
    DATETIME_FORMATS.iter().find_map(|format| NaiveDateTime::parse_from_str(cell, format).ok())
}

fn parse_value(cell: Option<&str>) -> Result<f64> {
    let cell = cell.context("the cell is missing")?.trim();
    let value: f64 = cell.parse().with_context(|| format!("`{cell}` is not a number"))?;
    ensure!(value.is_finite(), "`{cell}` is not finite");
    Ok(value)
}
