//! Exact solvers module.
//!
//! A [`MipSolver`] takes a solver-agnostic [`MipModel`] and returns a [`SolveOutcome`].
//! The pure-Rust `microlp` backend is always available; the Gurobi backend needs the
//! `gurobi` feature.

mod microlp;

use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::config::LicenseConfig;
use crate::error::Result;
use crate::model::MipModel;

pub use self::microlp::{run_worker, MicrolpSolver, WORKER_COMMAND, WORKER_ENV};

// When built with the `gurobi` feature, expose the real implementation
#[cfg(feature = "gurobi")]
mod gurobi;
#[cfg(feature = "gurobi")]
pub use gurobi::GurobiSolver;

// Otherwise provide a lightweight stub so the rest of the codebase can compile
#[cfg(not(feature = "gurobi"))]
mod gurobi_stub {
    use super::{MipSolver, SolveOutcome, SolverConfig};
    use crate::config::LicenseConfig;
    use crate::error::{Error, Result};
    use crate::model::MipModel;

    pub struct GurobiSolver;

    impl GurobiSolver {
        pub fn new(_license: &LicenseConfig) -> Result<Self> {
            Err(Error::solver("Gurobi feature not enabled in this build"))
        }
    }

    impl MipSolver for GurobiSolver {
        fn name(&self) -> &str {
            "gurobi"
        }

        fn solve(&self, _model: &MipModel, _config: &SolverConfig) -> Result<SolveOutcome> {
            Err(Error::solver("Gurobi feature not enabled in this build"))
        }
    }
}

#[cfg(not(feature = "gurobi"))]
pub use gurobi_stub::GurobiSolver;

/// Solver configuration
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Time limit in seconds
    pub time_limit: f64,
    /// Relative MIP gap tolerance
    pub mip_gap: f64,
    /// Number of threads (0 = automatic)
    pub threads: i32,
    /// Let the backend print its own log
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            time_limit: 3600.0,
            mip_gap: 1e-4,
            threads: 0,
            verbose: false,
        }
    }
}

impl SolverConfig {
    pub fn with_time_limit(time_limit: f64) -> Self {
        SolverConfig {
            time_limit,
            ..Default::default()
        }
    }
}

/// Terminal state of one solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// Proven optimal
    Optimal,
    /// Time limit reached with an incumbent
    Feasible,
    /// Time limit reached without any incumbent
    NoIncumbent,
    /// The model has no integer solution
    Infeasible,
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SolveStatus::Optimal => "Optimal",
            SolveStatus::Feasible => "Feasible",
            SolveStatus::NoIncumbent => "NoIncumbent",
            SolveStatus::Infeasible => "Infeasible",
        };
        f.write_str(s)
    }
}

/// What a backend reports after a solve.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    /// Incumbent objective, if any
    pub objective: Option<f64>,
    /// Best proven lower bound, if the backend knows one
    pub best_bound: Option<f64>,
    /// Relative gap as a fraction, if an incumbent exists
    pub gap: Option<f64>,
    /// Solve wall time
    pub runtime: Duration,
    /// Incumbent variable values, indexed like the model's variables
    pub values: Option<Vec<f64>>,
}

impl SolveOutcome {
    pub fn without_solution(status: SolveStatus, runtime: Duration) -> Self {
        SolveOutcome {
            status,
            objective: None,
            best_bound: None,
            gap: None,
            runtime,
            values: None,
        }
    }

    pub fn has_solution(&self) -> bool {
        self.objective.is_some()
    }
}

/// A MIP backend.
pub trait MipSolver {
    fn name(&self) -> &str;

    fn solve(&self, model: &MipModel, config: &SolverConfig) -> Result<SolveOutcome>;
}

/// Available backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
pub enum Backend {
    /// Pure-Rust solver, no license needed
    #[default]
    Microlp,
    /// Gurobi (requires the `gurobi` feature and a license)
    Gurobi,
}

/// Instantiate a backend. License and environment problems surface here, before any solve.
pub fn create_solver(backend: Backend, license: &LicenseConfig) -> Result<Box<dyn MipSolver>> {
    match backend {
        Backend::Microlp => Ok(Box::new(MicrolpSolver::new())),
        Backend::Gurobi => Ok(Box::new(GurobiSolver::new(license)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SolverConfig::default();
        assert_eq!(config.time_limit, 3600.0);
        assert_eq!(SolverConfig::with_time_limit(5.0).time_limit, 5.0);
    }

    #[test]
    fn test_microlp_backend_is_available() {
        let solver = create_solver(Backend::Microlp, &LicenseConfig::default()).unwrap();
        assert_eq!(solver.name(), "microlp");
    }

    #[cfg(not(feature = "gurobi"))]
    #[test]
    fn test_gurobi_requires_feature() {
        let err = create_solver(Backend::Gurobi, &LicenseConfig::default()).err().unwrap();
        assert!(err.to_string().contains("not enabled"));
    }
}
