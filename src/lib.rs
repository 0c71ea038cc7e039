//! ATSP MIP Library
//!
//! Reads Asymmetric TSP instances (TSPLIB `ATSP` or plain matrices) and solves them
//! through two classical MIP formulations with a pluggable solver backend.
//!
//! # Features
//!
//! - TSPLIB / plain-matrix instance reader
//! - Miller-Tucker-Zemlin formulation (bounded or unbounded positions)
//! - Gavish-Graves single-commodity flow formulation
//! - Solver-agnostic model with a pure-Rust backend and an optional Gurobi backend
//! - CSV / JSON result reporting
//!
//! # Example
//!
//! ```no_run
//! use atsp_mip::exact::{MicrolpSolver, MipSolver, SolverConfig};
//! use atsp_mip::formulation::{Formulation, ModelOptions, MtzMode};
//! use atsp_mip::instance::{read_instance, ReadOptions};
//!
//! let instance = read_instance("br17.atsp", &ReadOptions::default()).unwrap();
//! let built = Formulation::Mtz(MtzMode::Bounded).build(&instance.matrix, &ModelOptions::default());
//!
//! let outcome = MicrolpSolver::new()
//!     .solve(&built.model, &SolverConfig::with_time_limit(60.0))
//!     .unwrap();
//! println!("objective: {:?}", outcome.objective);
//! ```

pub mod benchmark;
pub mod clock;
pub mod config;
pub mod error;
pub mod exact;
pub mod formulation;
pub mod generator;
pub mod instance;
pub mod logging;
pub mod model;
pub mod report;
pub mod solution;

pub use error::{Error, ParseError, Result};
pub use instance::{AtspInstance, CostMatrix};
pub use solution::Tour;
