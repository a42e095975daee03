use std::{ops::Range, path::PathBuf};

use clap::Parser;

use crate::{
    core::{history::History, product::ProductSet},
    prelude::*,
};

#[must_use]
#[derive(Parser)]
pub struct HistoryArgs {
    /// Hourly CSV with `datetime`, one price column per product, and optional `solar_gen`.
    #[clap(id = "history", long = "history", env = "HISTORY_PATH")]
    pub path: PathBuf,

    /// First history index to dispatch.
    #[clap(long = "start", env = "START_INDEX", default_value = "0")]
    pub start: usize,

    /// History index to stop before, the end of the history by default.
    #[clap(long = "end", env = "END_INDEX")]
    pub end: Option<usize>,
}

impl HistoryArgs {
    pub fn load(&self, products: &ProductSet) -> Result<(History, Range<usize>)> {
        let history = History::load(&self.path, products)?;
        let interval = history.interval(self.start, self.end)?;
        Ok((history, interval))
    }
}
