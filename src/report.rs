//! Result rows, result tables and their CSV / JSON / text renderings.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::exact::{SolveOutcome, SolveStatus};
use crate::formulation::AtspModel;
use crate::instance::AtspInstance;
use crate::solution::Tour;

/// Gap reported when no incumbent exists.
pub const NO_INCUMBENT_GAP: f64 = 100.0;

/// Field separator used for CSV tables unless told otherwise.
pub const DEFAULT_DELIMITER: u8 = b';';

/// Result of solving one formulation on one instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveRecord {
    /// Instance group (directory label)
    pub group: String,
    /// Instance name
    pub instance: String,
    /// Formulation label
    pub formulation: String,
    /// Number of nodes
    pub nodes: usize,
    /// Number of model variables
    pub variables: usize,
    /// Number of model constraints
    pub constraints: usize,
    /// Wall time of the solve in seconds
    pub time_secs: f64,
    /// Relative gap in percent (100 without incumbent)
    pub gap_percent: f64,
    /// Best proven bound, if known
    pub best_bound: Option<f64>,
    /// Incumbent objective, if any
    pub objective: Option<f64>,
    pub status: SolveStatus,
    pub solution_exists: bool,
    /// Tour read from the incumbent arcs
    pub tour: Option<Tour>,
}

impl SolveRecord {
    pub fn from_outcome(
        group: &str,
        instance: &AtspInstance,
        built: &AtspModel,
        outcome: &SolveOutcome,
        elapsed: Duration,
    ) -> Self {
        let tour = outcome
            .values
            .as_deref()
            .and_then(|values| Tour::from_arc_values(&instance.matrix, &built.arcs, values));
        if outcome.has_solution() && tour.is_none() {
            log::warn!("{} / {}: incumbent arcs do not form a single tour", instance.name, built.formulation);
        }

        SolveRecord {
            group: group.to_string(),
            instance: instance.name.clone(),
            formulation: built.formulation.label().to_string(),
            nodes: instance.dimension(),
            variables: built.model.num_vars(),
            constraints: built.model.num_constraints(),
            time_secs: elapsed.as_secs_f64(),
            gap_percent: gap_percent(outcome),
            best_bound: outcome.best_bound,
            objective: outcome.objective,
            status: outcome.status,
            solution_exists: outcome.has_solution(),
            tour,
        }
    }
}

/// Gap in percent. Falls back to the bound when the backend gives no gap.
fn gap_percent(outcome: &SolveOutcome) -> f64 {
    let Some(objective) = outcome.objective else {
        return NO_INCUMBENT_GAP;
    };
    if let Some(gap) = outcome.gap {
        return gap * 100.0;
    }
    match outcome.best_bound {
        Some(bound) if objective.abs() > f64::EPSILON => (objective - bound).abs() / objective.abs() * 100.0,
        Some(_) => 0.0,
        None => NO_INCUMBENT_GAP,
    }
}

impl std::fmt::Display for SolveRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fmt_opt = |v: Option<f64>| v.map(|x| format!("{:.2}", x)).unwrap_or_else(|| "-".to_string());
        writeln!(f, "Model: {} ({})", self.formulation, self.status)?;
        writeln!(f, "  Nodes: {}", self.nodes)?;
        writeln!(f, "  Variables: {}", self.variables)?;
        writeln!(f, "  Constraints: {}", self.constraints)?;
        writeln!(f, "  Objective: {}", fmt_opt(self.objective))?;
        writeln!(f, "  Best bound: {}", fmt_opt(self.best_bound))?;
        writeln!(f, "  Gap: {:.2}%", self.gap_percent)?;
        write!(f, "  Time: {:.3}s", self.time_secs)
    }
}

/// One CSV line: the fixed leading columns, then formulation and status.
#[derive(Serialize)]
struct CsvRow<'a> {
    group: &'a str,
    instance: &'a str,
    nodes: usize,
    variables: usize,
    constraints: usize,
    time: f64,
    gap_percent: f64,
    best_bound: Option<f64>,
    objective: Option<f64>,
    formulation: &'a str,
    status: SolveStatus,
}

impl<'a> From<&'a SolveRecord> for CsvRow<'a> {
    fn from(r: &'a SolveRecord) -> Self {
        CsvRow {
            group: &r.group,
            instance: &r.instance,
            nodes: r.nodes,
            variables: r.variables,
            constraints: r.constraints,
            time: r.time_secs,
            gap_percent: r.gap_percent,
            best_bound: r.best_bound,
            objective: r.objective,
            formulation: &r.formulation,
            status: r.status,
        }
    }
}

/// Accumulated results of a run.
#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    records: Vec<SolveRecord>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: SolveRecord) {
        self.records.push(record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = SolveRecord>) {
        self.records.extend(records);
    }

    pub fn records(&self) -> &[SolveRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write every row as CSV, replacing the file.
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P, delimiter: u8) -> Result<()> {
        let mut writer = csv::WriterBuilder::new().delimiter(delimiter).from_path(path)?;
        for record in &self.records {
            writer.serialize(CsvRow::from(record))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn export_to_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, &self.records)?;
        Ok(())
    }

    /// Lowest objective found for each instance, by instance name.
    pub fn best_per_instance(&self) -> BTreeMap<&str, &SolveRecord> {
        let mut best: BTreeMap<&str, &SolveRecord> = BTreeMap::new();
        for record in self.records.iter().filter(|r| r.objective.is_some()) {
            let key = OrderedFloat(record.objective.unwrap_or(f64::INFINITY));
            best.entry(record.instance.as_str())
                .and_modify(|current| {
                    if key < OrderedFloat(current.objective.unwrap_or(f64::INFINITY)) {
                        *current = record;
                    }
                })
                .or_insert(record);
        }
        best
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("        ATSP MIP Results Report\n");
        report.push_str("========================================\n\n");

        report.push_str(&format!(
            "{:<10} {:<18} {:<14} {:>6} {:>8} {:>8} {:>12} {:>12} {:>8} {:>10}\n",
            "Group", "Instance", "Model", "Nodes", "Vars", "Constrs", "Objective", "Bound", "Gap%", "Time"
        ));
        report.push_str("-".repeat(112).as_str());
        report.push('\n');

        let fmt_opt = |v: Option<f64>| v.map(|x| format!("{:.2}", x)).unwrap_or_else(|| "-".to_string());
        for r in &self.records {
            report.push_str(&format!(
                "{:<10} {:<18} {:<14} {:>6} {:>8} {:>8} {:>12} {:>12} {:>8.2} {:>10.3}\n",
                r.group,
                r.instance,
                r.formulation,
                r.nodes,
                r.variables,
                r.constraints,
                fmt_opt(r.objective),
                fmt_opt(r.best_bound),
                r.gap_percent,
                r.time_secs
            ));
        }

        report.push_str("-".repeat(112).as_str());
        report.push('\n');

        let best = self.best_per_instance();
        if !best.is_empty() {
            report.push_str("\nBest objective per instance:\n");
            for (instance, record) in best {
                report.push_str(&format!(
                    "  {}: {} ({})\n",
                    instance,
                    fmt_opt(record.objective),
                    record.formulation
                ));
            }
        }

        report
    }
}

/// Per-model entry of an [`InstanceSummary`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub variables: usize,
    pub constraints: usize,
    pub objective: Option<f64>,
    pub best_bound: Option<f64>,
    pub gap_percent: f64,
    pub time_secs: f64,
    pub status: SolveStatus,
    pub tour: Option<Vec<usize>>,
}

impl From<&SolveRecord> for ModelSummary {
    fn from(r: &SolveRecord) -> Self {
        ModelSummary {
            variables: r.variables,
            constraints: r.constraints,
            objective: r.objective,
            best_bound: r.best_bound,
            gap_percent: r.gap_percent,
            time_secs: r.time_secs,
            status: r.status,
            tour: r.tour.as_ref().map(|t| t.nodes.clone()),
        }
    }
}

/// JSON summary of a single-instance run, keyed by model label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSummary {
    pub instance: String,
    pub nodes: usize,
    pub generated_at: String,
    pub models: BTreeMap<String, ModelSummary>,
}

impl InstanceSummary {
    pub fn new(instance: &AtspInstance, records: &[SolveRecord]) -> Self {
        InstanceSummary {
            instance: instance.name.clone(),
            nodes: instance.dimension(),
            generated_at: chrono::Local::now().to_rfc3339(),
            models: records
                .iter()
                .map(|r| (r.formulation.clone(), ModelSummary::from(r)))
                .collect(),
        }
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}
