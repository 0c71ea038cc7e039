//! Pure-Rust backend built on the `microlp` crate.
//!
//! `microlp` has no time limit of its own. Each solve therefore runs in a child
//! process (the `atsp-mip worker` subcommand) that receives the model as JSON on stdin
//! and answers on stdout. When `time_limit` expires the child is killed and reaped,
//! and the outcome reports no incumbent.
//!
//! Without a worker executable the model is solved on the calling thread and the
//! time limit is not enforced.

use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use ::microlp::{ComparisonOp, OptimizationDirection, Problem};
use serde::{Deserialize, Serialize};

use super::{MipSolver, SolveOutcome, SolveStatus, SolverConfig};
use crate::error::{Error, Result};
use crate::model::{MipModel, Sense, VarKind};

const FEASIBILITY_TOL: f64 = 1e-9;

/// Subcommand of the `atsp-mip` binary that solves one model.
pub const WORKER_COMMAND: &str = "worker";

/// Overrides the worker executable.
pub const WORKER_ENV: &str = "ATSP_MIP_WORKER";

const WORKER_BIN: &str = "atsp-mip";

/// What the worker writes back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum WorkerReply {
    Solved { objective: f64, values: Vec<f64> },
    Infeasible,
    Unbounded,
    Failed(String),
}

impl WorkerReply {
    fn into_outcome(self, model: &MipModel, runtime: Duration) -> Result<SolveOutcome> {
        match self {
            WorkerReply::Solved { objective, values } => Ok(SolveOutcome {
                status: SolveStatus::Optimal,
                objective: Some(objective),
                best_bound: Some(objective),
                gap: Some(0.0),
                runtime,
                values: Some(values),
            }),
            WorkerReply::Infeasible => Ok(SolveOutcome::without_solution(SolveStatus::Infeasible, runtime)),
            WorkerReply::Unbounded => Err(Error::solver(format!("{} is unbounded", model.name))),
            WorkerReply::Failed(message) => Err(Error::solver(message)),
        }
    }
}

pub struct MicrolpSolver {
    worker: Option<PathBuf>,
}

impl MicrolpSolver {
    /// Solve in child processes of the `atsp-mip` executable, found through
    /// `ATSP_MIP_WORKER`, the running executable, or next to it.
    pub fn new() -> Self {
        let worker = locate_worker();
        if worker.is_none() {
            log::warn!("no {} executable found, microlp time limits will not be enforced", WORKER_BIN);
        }
        MicrolpSolver { worker }
    }

    pub fn with_worker(path: impl Into<PathBuf>) -> Self {
        MicrolpSolver { worker: Some(path.into()) }
    }

    /// Solve on the calling thread, without a time limit.
    pub fn in_process() -> Self {
        MicrolpSolver { worker: None }
    }

    pub fn worker(&self) -> Option<&Path> {
        self.worker.as_deref()
    }

    /// Translate the model. Returns `None` when a constraint without terms is violated.
    fn translate(model: &MipModel) -> Option<(Problem, Vec<::microlp::Variable>)> {
        let mut problem = Problem::new(OptimizationDirection::Minimize);

        let vars: Vec<::microlp::Variable> = model
            .variables()
            .iter()
            .map(|v| match v.kind {
                VarKind::Binary => problem.add_binary_var(v.cost),
                VarKind::Continuous => problem.add_var(v.cost, (v.lower, v.upper)),
            })
            .collect();

        for constr in model.constraints() {
            let expr = constr.expr.normalized();
            if expr.is_empty() {
                if !constr.is_satisfied(&[], FEASIBILITY_TOL) {
                    log::debug!("{}: constraint {} has no terms and cannot hold", model.name, constr.name);
                    return None;
                }
                continue;
            }
            let op = match constr.sense {
                Sense::Le => ComparisonOp::Le,
                Sense::Ge => ComparisonOp::Ge,
                Sense::Eq => ComparisonOp::Eq,
            };
            let terms: Vec<(::microlp::Variable, f64)> =
                expr.terms.iter().map(|&(v, coeff)| (vars[v.0], coeff)).collect();
            problem.add_constraint(terms, op, constr.rhs);
        }

        Some((problem, vars))
    }

    fn solve_model(model: &MipModel) -> WorkerReply {
        let Some((problem, vars)) = Self::translate(model) else {
            return WorkerReply::Infeasible;
        };
        match problem.solve() {
            Ok(solution) => WorkerReply::Solved {
                objective: solution.objective(),
                values: vars.iter().map(|&v| solution[v]).collect(),
            },
            Err(::microlp::Error::Infeasible) => WorkerReply::Infeasible,
            Err(::microlp::Error::Unbounded) => WorkerReply::Unbounded,
            Err(e) => WorkerReply::Failed(e.to_string()),
        }
    }

    fn solve_in_child(&self, worker: &Path, model: &MipModel, config: &SolverConfig) -> Result<SolveOutcome> {
        let start = Instant::now();
        let payload = serde_json::to_vec(model)?;

        let mut child = Command::new(worker)
            .arg(WORKER_COMMAND)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::solver(format!("cannot start microlp worker {}: {}", worker.display(), e)))?;
        log::debug!("{}: microlp worker pid {}", model.name, child.id());

        let (tx, rx) = mpsc::channel();
        let reader = child.stdout.take().map(|mut stdout| {
            thread::Builder::new()
                .name(format!("microlp-{}", model.name))
                .spawn(move || {
                    let mut reply = String::new();
                    let read = stdout.read_to_string(&mut reply).map(|_| reply);
                    // the receiver is gone once the caller stopped waiting
                    let _ = tx.send(read);
                })
        });

        let written = match child.stdin.take() {
            // dropping stdin closes it, which ends the worker's read
            Some(mut stdin) => stdin.write_all(&payload),
            None => Ok(()),
        };

        let limit = Duration::try_from_secs_f64(config.time_limit.max(0.0)).unwrap_or(Duration::MAX);
        let received = rx.recv_timeout(limit.saturating_sub(start.elapsed()));
        if received.is_err() {
            // already exited is fine, wait() below reaps it either way
            let _ = child.kill();
        }
        let status = child.wait()?;
        if let Some(Ok(handle)) = reader {
            let _ = handle.join();
        }
        let runtime = start.elapsed();

        match received {
            Ok(Ok(text)) => match serde_json::from_str::<WorkerReply>(&text) {
                Ok(reply) => reply.into_outcome(model, runtime),
                Err(e) => {
                    let cause = written.err().map(|w| format!(", stdin: {}", w)).unwrap_or_default();
                    Err(Error::solver(format!(
                        "microlp worker for {} exited with {} and no valid reply ({}{})",
                        model.name, status, e, cause
                    )))
                }
            },
            Ok(Err(e)) => Err(e.into()),
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "{}: time limit of {}s reached without an incumbent, worker stopped",
                    model.name,
                    config.time_limit
                );
                Ok(SolveOutcome::without_solution(SolveStatus::NoIncumbent, runtime))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::solver(format!("microlp worker for {} stopped without a result", model.name)))
            }
        }
    }
}

impl Default for MicrolpSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MipSolver for MicrolpSolver {
    fn name(&self) -> &str {
        "microlp"
    }

    fn solve(&self, model: &MipModel, config: &SolverConfig) -> Result<SolveOutcome> {
        match &self.worker {
            Some(worker) => self.solve_in_child(worker, model, config),
            None => {
                let start = Instant::now();
                Self::solve_model(model).into_outcome(model, start.elapsed())
            }
        }
    }
}

/// Body of the `worker` subcommand: read one model as JSON, solve it, write the reply as JSON.
pub fn run_worker<R: Read, W: Write>(input: R, output: W) -> Result<()> {
    let model: MipModel = serde_json::from_reader(input)?;
    let reply = MicrolpSolver::solve_model(&model);

    let mut output = BufWriter::new(output);
    serde_json::to_writer(&mut output, &reply)?;
    output.flush()?;
    Ok(())
}

fn locate_worker() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(WORKER_ENV) {
        return Some(PathBuf::from(path));
    }
    let exe = std::env::current_exe().ok()?;
    if exe.file_stem().is_some_and(|stem| stem == WORKER_BIN) {
        return Some(exe);
    }
    // test harnesses live in target/<profile>/deps, next to or below the binary
    let file = format!("{}{}", WORKER_BIN, std::env::consts::EXE_SUFFIX);
    exe.ancestors()
        .skip(1)
        .take(2)
        .map(|dir| dir.join(&file))
        .find(|path| path.is_file())
}
