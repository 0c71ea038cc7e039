//! ATSP formulations.
//!
//! Both formulations share the binary arc variables `x_i_j` (cost `c_ij`) and the
//! degree constraints; they differ in the auxiliary variables used to forbid subtours:
//! - [`mtz`]: one position variable `u_i` per non-origin node
//! - [`gg`]: one flow variable `g_i_j` per non-origin node `i` and node `j`

pub mod gg;
pub mod mtz;

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::instance::CostMatrix;
use crate::model::{ConstraintKind, LinExpr, MipModel, Sense, VarId};

pub use gg::build_gg;
pub use mtz::build_mtz;

/// Whether `x_i_i` variables are declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
pub enum SelfLoops {
    /// Only arcs `i != j` (n(n-1) arc variables)
    #[default]
    Exclude,
    /// Every pair including `i == i` (n^2 arc variables), each `x_i_i` fixed to 0 by a row
    Include,
}

/// Domain of the MTZ position variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
pub enum MtzMode {
    /// `u_i >= 0` plus the rows `u_i >= 1` and `u_i <= n-1`
    #[default]
    Bounded,
    /// `u_i >= 0`, no upper bound
    Unbounded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Formulation {
    Mtz(MtzMode),
    Gg,
}

impl Formulation {
    /// Label used in reports and JSON summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Formulation::Mtz(MtzMode::Bounded) => "MTZ_bounded",
            Formulation::Mtz(MtzMode::Unbounded) => "MTZ_unbounded",
            Formulation::Gg => "GG",
        }
    }

    pub fn build(&self, matrix: &CostMatrix, options: &ModelOptions) -> AtspModel {
        match *self {
            Formulation::Mtz(mode) => build_mtz(matrix, mode, options),
            Formulation::Gg => build_gg(matrix, options),
        }
    }
}

impl fmt::Display for Formulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Formulations requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FormulationChoice {
    Mtz,
    Gg,
    #[default]
    All,
}

/// MTZ variants requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MtzModeChoice {
    #[default]
    Bounded,
    Unbounded,
    Both,
}

/// Expand a command-line selection into the formulations to solve, MTZ variants first.
pub fn select_formulations(choice: FormulationChoice, modes: MtzModeChoice) -> Vec<Formulation> {
    let mut selected = Vec::new();
    if choice != FormulationChoice::Gg {
        if modes != MtzModeChoice::Unbounded {
            selected.push(Formulation::Mtz(MtzMode::Bounded));
        }
        if modes != MtzModeChoice::Bounded {
            selected.push(Formulation::Mtz(MtzMode::Unbounded));
        }
    }
    if choice != FormulationChoice::Mtz {
        selected.push(Formulation::Gg);
    }
    selected
}

/// Options shared by every formulation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelOptions {
    pub self_loops: SelfLoops,
}

/// Arc variables of a model, indexed by `(origin, destination)`.
#[derive(Debug, Clone)]
pub struct ArcVars {
    dimension: usize,
    vars: Vec<Option<VarId>>,
}

impl ArcVars {
    /// Declare one binary per enumerated arc, with the arc cost as objective coefficient.
    pub fn declare(model: &mut MipModel, matrix: &CostMatrix, self_loops: SelfLoops) -> Self {
        let n = matrix.dimension();
        let mut vars = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                let var = if i != j || self_loops == SelfLoops::Include {
                    Some(model.add_binary(format!("x_{}_{}", i, j), matrix.cost(i, j)))
                } else {
                    None
                };
                vars.push(var);
            }
        }
        ArcVars { dimension: n, vars }
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Option<VarId> {
        self.vars[i * self.dimension + j]
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// All declared arcs as `(i, j, var)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, VarId)> + '_ {
        let n = self.dimension;
        self.vars
            .iter()
            .enumerate()
            .filter_map(move |(k, v)| v.map(|var| (k / n, k % n, var)))
    }

    pub fn len(&self) -> usize {
        self.vars.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A formulation built for one instance: the model plus the handles needed to read a tour back.
#[derive(Debug, Clone)]
pub struct AtspModel {
    pub formulation: Formulation,
    pub model: MipModel,
    pub arcs: ArcVars,
}

impl AtspModel {
    pub fn dimension(&self) -> usize {
        self.arcs.dimension()
    }
}

/// Exactly one outgoing and one incoming arc per node. Declared self-loops are fixed to 0.
pub(crate) fn add_degree_constraints(model: &mut MipModel, arcs: &ArcVars) {
    let n = arcs.dimension();

    for i in 0..n {
        let out: LinExpr = (0..n).filter_map(|j| arcs.get(i, j)).map(|x| (x, 1.0)).collect();
        model.add_constr(format!("out_deg_{}", i), ConstraintKind::OutDegree, out, Sense::Eq, 1.0);
    }

    for j in 0..n {
        let inc: LinExpr = (0..n).filter_map(|i| arcs.get(i, j)).map(|x| (x, 1.0)).collect();
        model.add_constr(format!("in_deg_{}", j), ConstraintKind::InDegree, inc, Sense::Eq, 1.0);
    }

    for i in 0..n {
        if let Some(x) = arcs.get(i, i) {
            let expr = LinExpr::new().with_term(x, 1.0);
            model.add_constr(format!("no_loop_{}", i), ConstraintKind::SelfLoop, expr, Sense::Eq, 0.0);
        }
    }
}
