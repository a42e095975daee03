use std::fmt::{Display, Formatter};

/// What to do when a horizon cannot be solved mid-run.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, clap::ValueEnum)]
pub enum OnInfeasible {
    /// Fail the entire run.
    #[default]
    Abort,

    /// Skip the hour: keep the battery idle, hold the state of charge, and move on.
    Hold,
}

impl Display for OnInfeasible {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Abort => write!(f, "abort"),
            Self::Hold => write!(f, "hold"),
        }
    }
}
