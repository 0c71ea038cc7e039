//! Experiment driver for the ATSP formulations.
//!
//! Each instance goes through read -> build -> solve -> record, one formulation at a
//! time. Only the accumulated [`ResultTable`] outlives an instance.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::clock::ElapsedClock;
use crate::error::{Error, Result};
use crate::exact::{MipSolver, SolverConfig};
use crate::formulation::{select_formulations, Formulation, FormulationChoice, ModelOptions, MtzModeChoice};
use crate::instance::{list_instance_files, AtspInstance, ReadOptions};
use crate::report::{ResultTable, SolveRecord, DEFAULT_DELIMITER};

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Formulations solved for every instance, in order
    pub formulations: Vec<Formulation>,
    /// Options shared by the model builders
    pub model: ModelOptions,
    /// Options applied when reading instances
    pub read: ReadOptions,
    /// Backend parameters
    pub solver: SolverConfig,
    /// Show the elapsed clock while solving
    pub show_clock: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            formulations: select_formulations(FormulationChoice::All, MtzModeChoice::Bounded),
            model: ModelOptions::default(),
            read: ReadOptions::default(),
            solver: SolverConfig::default(),
            show_clock: true,
        }
    }
}

/// A directory of instances reported under one label.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceGroup {
    pub label: String,
    pub dir: PathBuf,
}

impl InstanceGroup {
    pub fn new(label: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        InstanceGroup { label: label.into(), dir: dir.into() }
    }
}

/// `LABEL=PATH`, or just `PATH` with the directory name as label.
impl FromStr for InstanceGroup {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (label, dir) = match s.split_once('=') {
            Some((label, dir)) => (label.trim().to_string(), PathBuf::from(dir.trim())),
            None => {
                let dir = PathBuf::from(s.trim());
                let label = dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| s.trim().to_string());
                (label, dir)
            }
        };
        if label.is_empty() || dir.as_os_str().is_empty() {
            return Err(Error::config(format!("invalid instance group `{}`", s)));
        }
        Ok(InstanceGroup { label, dir })
    }
}

/// Where a batch rewrites its CSV after every instance.
#[derive(Debug, Clone)]
pub struct CsvTarget {
    pub path: PathBuf,
    pub delimiter: u8,
}

impl CsvTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvTarget { path: path.into(), delimiter: DEFAULT_DELIMITER }
    }
}

/// Counts of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub solved: usize,
    pub skipped: usize,
}

/// Benchmarking engine
pub struct Benchmark<'a> {
    config: BenchmarkConfig,
    solver: &'a dyn MipSolver,
    results: ResultTable,
}

impl<'a> Benchmark<'a> {
    pub fn new(config: BenchmarkConfig, solver: &'a dyn MipSolver) -> Self {
        Benchmark {
            config,
            solver,
            results: ResultTable::new(),
        }
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Build and solve one formulation. The model is dropped once the record is extracted.
    pub fn solve_formulation(
        &self,
        group: &str,
        instance: &AtspInstance,
        formulation: Formulation,
    ) -> Result<SolveRecord> {
        let built = formulation.build(&instance.matrix, &self.config.model);
        log::info!(
            "{} / {}: solving with {} ({} variables, {} constraints)",
            instance.name,
            formulation,
            self.solver.name(),
            built.model.num_vars(),
            built.model.num_constraints()
        );

        let clock = if self.config.show_clock {
            ElapsedClock::start(format!("{} {}", instance.name, formulation))
        } else {
            ElapsedClock::hidden()
        };
        let outcome = self.solver.solve(&built.model, &self.config.solver);
        let elapsed = clock.stop();
        let outcome = outcome?;

        let record = SolveRecord::from_outcome(group, instance, &built, &outcome, elapsed);
        log::info!(
            "{} / {}: {} objective={} gap={:.2}% time={:.3}s",
            instance.name,
            formulation,
            record.status,
            record.objective.map(|o| o.to_string()).unwrap_or_else(|| "-".to_string()),
            record.gap_percent,
            record.time_secs
        );
        Ok(record)
    }

    /// Solve every configured formulation on an instance and record the rows.
    ///
    /// Each row is recorded as soon as its formulation finishes, so a later failure
    /// keeps the rows already produced.
    pub fn run_instance(&mut self, group: &str, instance: &AtspInstance) -> Result<Vec<SolveRecord>> {
        let mut records = Vec::with_capacity(self.config.formulations.len());
        for &formulation in &self.config.formulations {
            let record = self.solve_formulation(group, instance, formulation)?;
            self.results.push(record.clone());
            records.push(record);
        }
        Ok(records)
    }

    /// Run every instance of every group.
    ///
    /// `only` restricts the run to the listed instances (file stem or file name). Instances
    /// that fail to parse or solve are logged and skipped; the CSV, when given, is rewritten
    /// after each instance.
    pub fn run_groups(
        &mut self,
        groups: &[InstanceGroup],
        only: &[String],
        csv: Option<&CsvTarget>,
    ) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();

        for group in groups {
            log::info!("Group {}: {}", group.label, group.dir.display());
            for path in list_instance_files(&group.dir)? {
                if !is_selected(&path, only) {
                    continue;
                }

                match self.run_file(&group.label, &path) {
                    Ok(()) => summary.solved += 1,
                    Err(e) if e.is_instance_local() => {
                        log::error!("skipping {}: {}", path.display(), e);
                        summary.skipped += 1;
                    }
                    Err(e) => return Err(e),
                }

                if let Some(target) = csv {
                    self.results.export_to_csv(&target.path, target.delimiter)?;
                }
            }
        }

        log::info!("Batch done: {} solved, {} skipped", summary.solved, summary.skipped);
        Ok(summary)
    }

    fn run_file(&mut self, group: &str, path: &Path) -> Result<()> {
        let instance = AtspInstance::from_file(path, &self.config.read)?;
        log::info!("Instance {} (n={})", instance.name, instance.dimension());
        self.run_instance(group, &instance)?;
        Ok(())
    }

    pub fn results(&self) -> &ResultTable {
        &self.results
    }

    pub fn into_results(self) -> ResultTable {
        self.results
    }
}

fn is_selected(path: &Path, only: &[String]) -> bool {
    if only.is_empty() {
        return true;
    }
    let stem = path.file_stem().map(|s| s.to_string_lossy());
    let name = path.file_name().map(|s| s.to_string_lossy());
    only.iter().any(|wanted| {
        stem.as_deref() == Some(wanted.as_str()) || name.as_deref() == Some(wanted.as_str())
    })
}
