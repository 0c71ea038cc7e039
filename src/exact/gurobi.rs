//! Gurobi backend.
//!
//! The Gurobi environment is created once, with the license parameters taken from
//! [`LicenseConfig`], so licensing problems are reported before any instance is solved.
//! Each solve builds a fresh model on that environment and drops it after extraction.

use std::time::Instant;

use grb::prelude::*;

use super::{MipSolver, SolveOutcome, SolveStatus, SolverConfig};
use crate::config::LicenseConfig;
use crate::error::{Error, Result};
use crate::model::{MipModel, Sense, VarKind};

/// Gurobi-based exact solver
pub struct GurobiSolver {
    env: Env,
}

fn grb_err(context: &str) -> impl Fn(grb::Error) -> Error + '_ {
    move |e| Error::solver(format!("{}: {}", context, e))
}

impl GurobiSolver {
    pub fn new(license: &LicenseConfig) -> Result<Self> {
        let license_err = |e: grb::Error| Error::License(e.to_string());

        let mut env = Env::empty().map_err(license_err)?;
        env.set(param::OutputFlag, 0).map_err(license_err)?;
        if let Some(access_id) = &license.wls_access_id {
            env.set(param::WLSAccessID, access_id.clone()).map_err(license_err)?;
        }
        if let Some(secret) = &license.wls_secret {
            env.set(param::WLSSecret, secret.clone()).map_err(license_err)?;
        }
        if let Some(license_id) = license.license_id {
            env.set(param::LicenseID, license_id).map_err(license_err)?;
        }
        let env = env.start().map_err(license_err)?;

        log::info!("Gurobi environment started");
        Ok(GurobiSolver { env })
    }
}

impl MipSolver for GurobiSolver {
    fn name(&self) -> &str {
        "gurobi"
    }

    fn solve(&self, mip: &MipModel, config: &SolverConfig) -> Result<SolveOutcome> {
        let start = Instant::now();

        let mut model = Model::with_env(&mip.name, &self.env).map_err(grb_err("Failed to create model"))?;

        model
            .set_param(param::TimeLimit, config.time_limit)
            .map_err(grb_err("Failed to set time limit"))?;
        model
            .set_param(param::MIPGap, config.mip_gap)
            .map_err(grb_err("Failed to set MIP gap"))?;
        model
            .set_param(param::Threads, config.threads)
            .map_err(grb_err("Failed to set threads"))?;
        model
            .set_param(param::OutputFlag, i32::from(config.verbose))
            .map_err(grb_err("Failed to set output flag"))?;

        let mut vars: Vec<Var> = Vec::with_capacity(mip.num_vars());
        for v in mip.variables() {
            let var = match v.kind {
                VarKind::Binary => add_binvar!(model, name: &v.name, obj: v.cost),
                VarKind::Continuous => add_ctsvar!(model, name: &v.name, obj: v.cost, bounds: v.lower..v.upper),
            }
            .map_err(|e| Error::solver(format!("Failed to add variable {}: {}", v.name, e)))?;
            vars.push(var);
        }

        model.update().map_err(grb_err("Failed to update model"))?;

        for constr in mip.constraints() {
            let expr: Expr = constr
                .expr
                .normalized()
                .terms
                .iter()
                .map(|&(v, coeff)| coeff * vars[v.0])
                .grb_sum();
            let rhs = constr.rhs;
            let ineq = match constr.sense {
                Sense::Le => c!(expr <= rhs),
                Sense::Ge => c!(expr >= rhs),
                Sense::Eq => c!(expr == rhs),
            };
            model
                .add_constr(&constr.name, ineq)
                .map_err(|e| Error::solver(format!("Failed to add constraint {}: {}", constr.name, e)))?;
        }

        model.update().map_err(grb_err("Failed to update model before optimization"))?;
        model.optimize().map_err(grb_err("Optimization failed"))?;

        let status = model.status().map_err(grb_err("Failed to get status"))?;
        let sol_count: i32 = model.get_attr(attr::SolCount).unwrap_or(0);
        let runtime = start.elapsed();
        // ObjBound is unavailable when the solve stopped before the root relaxation
        let best_bound = model.get_attr(attr::ObjBound).ok();

        if status == Status::Infeasible || status == Status::InfOrUnbd {
            return Ok(SolveOutcome::without_solution(SolveStatus::Infeasible, runtime));
        }
        if sol_count == 0 {
            return Ok(SolveOutcome {
                best_bound,
                ..SolveOutcome::without_solution(SolveStatus::NoIncumbent, runtime)
            });
        }

        let objective = model.get_attr(attr::ObjVal).map_err(grb_err("Failed to get objective"))?;
        let gap = model.get_attr(attr::MIPGap).ok();
        let mut values = Vec::with_capacity(vars.len());
        for var in &vars {
            values.push(model.get_obj_attr(attr::X, var).map_err(grb_err("Failed to read solution"))?);
        }

        let status = if status == Status::Optimal {
            SolveStatus::Optimal
        } else {
            SolveStatus::Feasible
        };

        Ok(SolveOutcome {
            status,
            objective: Some(objective),
            best_bound,
            gap,
            runtime,
            values: Some(values),
        })
    }
}

