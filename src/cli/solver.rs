use clap::Parser;

use crate::core::model::{Backend, SolverOptions};

#[must_use]
#[derive(Copy, Clone, Parser)]
pub struct SolverArgs {
    #[clap(long = "backend", env = "SOLVER_BACKEND", default_value = "microlp")]
    pub backend: Backend,

    /// Wall-clock limit of a single solve.
    #[clap(long = "time-limit", env = "SOLVER_TIME_LIMIT", default_value = "4m")]
    pub time_limit: humantime::Duration,
}

impl SolverArgs {
    pub fn options(self) -> SolverOptions {
        SolverOptions::builder().backend(self.backend).time_limit(self.time_limit.into()).build()
    }
}
