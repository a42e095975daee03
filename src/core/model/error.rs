use std::time::Duration;

use good_lp::ResolutionError;

use crate::core::model::backend::Backend;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The backend is not compiled in, this is fatal and never retried.
    #[error("solver `{backend}` is not available in this build, rebuild with `--features {backend}`")]
    SolverUnavailable { backend: Backend },

    #[error("invalid model input: {0}")]
    InvalidInput(String),

    /// The solve ended in neither an optimal nor a feasible state.
    #[error("the horizon is unsolved: {status}")]
    Infeasible { status: String },

    #[error("the solve exceeded the time limit of {limit:?}")]
    TimeLimit { limit: Duration },
}

impl DispatchError {
    /// Whether only the current horizon failed, as opposed to the setup.
    pub const fn is_horizon_failure(&self) -> bool {
        matches!(self, Self::Infeasible { .. } | Self::TimeLimit { .. })
    }
}

impl From<ResolutionError> for DispatchError {
    fn from(error: ResolutionError) -> Self {
        let status = match error {
            ResolutionError::Infeasible => "infeasible".to_string(),
            ResolutionError::Unbounded => "unbounded".to_string(),
            other => other.to_string(),
        };
        Self::Infeasible { status }
    }
}
