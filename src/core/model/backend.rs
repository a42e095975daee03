use std::{
    fmt::{Display, Formatter},
    time::{Duration, Instant},
};

use bon::Builder;
use good_lp::{Constraint, Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable};

use crate::{core::model::error::DispatchError, prelude::*};

#[derive(Copy, Clone, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum Backend {
    /// Pure-Rust branch-and-bound.
    Microlp,

    /// Native HiGHS.
    Highs,
}

impl Display for Backend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Microlp => write!(f, "microlp"),
            Self::Highs => write!(f, "highs"),
        }
    }
}

impl Backend {
    pub const fn is_available(self) -> bool {
        match self {
            Self::Microlp => cfg!(feature = "microlp"),
            Self::Highs => cfg!(feature = "highs"),
        }
    }

    /// Capability check, performed once before any model is built.
    pub const fn ensure_available(self) -> Result<(), DispatchError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(DispatchError::SolverUnavailable { backend: self })
        }
    }
}

/// Mixed-integer problem ready to be handed to a backend.
pub struct Problem {
    pub variables: ProblemVariables,
    pub objective: Expression,
    pub constraints: Vec<Constraint>,
}

#[must_use]
#[derive(Copy, Clone, Debug, Builder)]
pub struct SolverOptions {
    pub backend: Backend,

    /// Wall-clock limit of a single solve.
    pub time_limit: Duration,
}

impl SolverOptions {
    /// Maximise the objective and read the variable values through `extract`.
    ///
    /// There is no partial result: anything but an optimal or feasible solution within the time
    /// limit is an error.
    pub fn maximise<T>(
        &self,
        problem: Problem,
        extract: impl FnOnce(&dyn Fn(Variable) -> f64) -> T,
    ) -> Result<T, DispatchError> {
        self.backend.ensure_available()?;
        let start_instant = Instant::now();

        #[allow(unreachable_patterns, unused_variables)]
        let output = match self.backend {
            #[cfg(feature = "microlp")]
            Backend::Microlp => {
                let model = problem.variables.maximise(problem.objective).using(good_lp::microlp);
                run(model, problem.constraints, extract)?
            }
            #[cfg(feature = "highs")]
            Backend::Highs => {
                let model = problem
                    .variables
                    .maximise(problem.objective)
                    .using(good_lp::highs)
                    .set_time_limit(self.time_limit.as_secs_f64());
                run(model, problem.constraints, extract)?
            }
            backend => return Err(DispatchError::SolverUnavailable { backend }),
        };

        let elapsed = start_instant.elapsed();
        debug!(backend = %self.backend, ?elapsed, "solved");
        if elapsed > self.time_limit {
            return Err(DispatchError::TimeLimit { limit: self.time_limit });
        }
        Ok(output)
    }
}

#[allow(dead_code)]
fn run<M, T>(
    mut model: M,
    constraints: Vec<Constraint>,
    extract: impl FnOnce(&dyn Fn(Variable) -> f64) -> T,
) -> Result<T, DispatchError>
where
    M: SolverModel<Error = ResolutionError>,
{
    for constraint in constraints {
        model.add_constraint(constraint);
    }
    let solution = model.solve()?;
    Ok(extract(&|variable| solution.value(variable)))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use good_lp::{constraint, variable};

    use super::*;

    fn options() -> SolverOptions {
        SolverOptions::builder()
            .backend(Backend::Microlp)
            .time_limit(Duration::from_secs(60))
            .build()
    }

    #[test]
    fn default_backend_is_available() {
        assert!(Backend::Microlp.ensure_available().is_ok());
    }

    /// Binary variables must come back integral.
    #[test]
    fn solves_small_mixed_integer_problem() {
        let mut variables = ProblemVariables::new();
        let x = variables.add(variable().min(0.0).max(10.0));
        let on = variables.add(variable().binary());
        let problem = Problem {
            variables,
            objective: 2.0 * x - 3.0 * on,
            constraints: vec![constraint!(x <= 4.0 * on)],
        };
        let (x, on) = options().maximise(problem, |value| (value(x), value(on))).unwrap();
        assert_abs_diff_eq!(x, 4.0, epsilon = 1e-6);
        assert_abs_diff_eq!(on, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn reports_infeasible() {
        let mut variables = ProblemVariables::new();
        let x = variables.add(variable().min(0.0).max(1.0));
        let problem = Problem {
            variables,
            objective: Expression::from(x),
            constraints: vec![constraint!(x >= 2.0)],
        };
        let error = options().maximise(problem, |value| value(x)).unwrap_err();
        assert!(error.is_horizon_failure(), "{error}");
    }
}
