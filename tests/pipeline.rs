use std::fs;

use atsp_mip::benchmark::{Benchmark, BenchmarkConfig, CsvTarget, InstanceGroup};
use atsp_mip::exact::{MicrolpSolver, MipSolver, SolveStatus, SolverConfig};
use atsp_mip::formulation::{
    select_formulations, Formulation, FormulationChoice, ModelOptions, MtzMode, MtzModeChoice, SelfLoops,
};
use atsp_mip::generator::{generate_instance, GeneratorConfig};
use atsp_mip::instance::{AtspInstance, CostMatrix, ReadOptions};
use atsp_mip::report::{InstanceSummary, SolveRecord, NO_INCUMBENT_GAP};

const THREE_NODES: &str = "NAME: three\nTYPE: ATSP\nDIMENSION: 3\nEDGE_WEIGHT_SECTION\n0 1 2 3 0 4 5 6 0\nEOF\n";

fn all_formulations() -> Vec<Formulation> {
    select_formulations(FormulationChoice::All, MtzModeChoice::Both)
}

fn quiet_config(time_limit: f64) -> BenchmarkConfig {
    BenchmarkConfig {
        formulations: all_formulations(),
        solver: SolverConfig::with_time_limit(time_limit),
        show_clock: false,
        ..Default::default()
    }
}

fn solver() -> MicrolpSolver {
    MicrolpSolver::with_worker(env!("CARGO_BIN_EXE_atsp-mip"))
}

fn solve_all(instance: &AtspInstance, config: BenchmarkConfig) -> Vec<SolveRecord> {
    let solver = solver();
    let mut benchmark = Benchmark::new(config, &solver);
    benchmark.run_instance("test", instance).unwrap()
}

#[test]
fn test_three_node_instance_is_solved_by_every_formulation() {
    let instance: AtspInstance = THREE_NODES.parse().unwrap();
    assert_eq!(
        instance.matrix.to_rows(),
        vec![vec![0.0, 1.0, 2.0], vec![3.0, 0.0, 4.0], vec![5.0, 6.0, 0.0]]
    );

    let records = solve_all(&instance, quiet_config(60.0));
    assert_eq!(records.len(), 3);
    for record in &records {
        assert_eq!(record.status, SolveStatus::Optimal, "{}", record.formulation);
        assert!((record.objective.unwrap() - 10.0).abs() < 1e-6, "{}", record.formulation);
        assert!(record.gap_percent.abs() < 1e-6);

        let tour = record.tour.as_ref().unwrap();
        assert!(tour.is_hamiltonian(3));
        assert_eq!(tour.nodes, vec![0, 1, 2]);
        assert!((tour.cost - 10.0).abs() < 1e-6);
    }
}

#[test]
fn test_tiny_instances_do_not_crash() {
    let two = AtspInstance::new("two", CostMatrix::from_rows(vec![vec![0.0, 5.0], vec![7.0, 0.0]]).unwrap());
    for record in solve_all(&two, quiet_config(60.0)) {
        assert_eq!(record.status, SolveStatus::Optimal);
        assert!((record.objective.unwrap() - 12.0).abs() < 1e-6);
    }

    // a single node has no arc unless self-loops are declared
    let one = AtspInstance::new("one", CostMatrix::from_rows(vec![vec![0.0]]).unwrap());
    for record in solve_all(&one, quiet_config(60.0)) {
        assert_eq!(record.status, SolveStatus::Infeasible);
        assert!(!record.solution_exists);
        assert_eq!(record.gap_percent, NO_INCUMBENT_GAP);
    }

    // declared self-loops are fixed to 0, so a single node stays infeasible
    let config = BenchmarkConfig {
        model: ModelOptions { self_loops: SelfLoops::Include },
        ..quiet_config(60.0)
    };
    for record in solve_all(&one, config) {
        assert_eq!(record.status, SolveStatus::Infeasible);
        assert_eq!(record.objective, None);
        assert!(record.tour.is_none());
    }
}

#[test]
fn test_included_self_loops_are_never_selected() {
    // zero diagonal: every node on its own loop would cost 0
    let instance: AtspInstance = THREE_NODES.parse().unwrap();
    let config = BenchmarkConfig {
        model: ModelOptions { self_loops: SelfLoops::Include },
        ..quiet_config(60.0)
    };

    let records = solve_all(&instance, config);
    assert_eq!(records.len(), 3);
    for record in &records {
        assert_eq!(record.status, SolveStatus::Optimal, "{}", record.formulation);
        assert!((record.objective.unwrap() - 10.0).abs() < 1e-6, "{}", record.formulation);
        let tour = record.tour.as_ref().unwrap();
        assert!(tour.is_hamiltonian(3));
        assert_eq!(tour.nodes, vec![0, 1, 2]);
    }

    let generated = generate_instance(&GeneratorConfig { nodes: 5, seed: 9, max_cost: 40, ..Default::default() }).unwrap();
    let excluded = solve_all(&generated, quiet_config(120.0));
    let config = BenchmarkConfig {
        model: ModelOptions { self_loops: SelfLoops::Include },
        ..quiet_config(120.0)
    };
    let generated = AtspInstance::new(generated.name.clone(), generated.matrix.with_diagonal(0.0));
    for (with_loops, without) in solve_all(&generated, config).iter().zip(&excluded) {
        assert!((with_loops.objective.unwrap() - without.objective.unwrap()).abs() < 1e-6);
        assert!(with_loops.tour.as_ref().unwrap().is_hamiltonian(5));
    }
}

#[test]
fn test_resolving_gives_the_same_objective() {
    let instance = generate_instance(&GeneratorConfig { nodes: 5, seed: 3, max_cost: 50, ..Default::default() }).unwrap();
    let first = solve_all(&instance, quiet_config(120.0));
    let second = solve_all(&instance, quiet_config(120.0));

    let optimum = first[0].objective.unwrap();
    for (a, b) in first.iter().zip(&second) {
        assert!((a.objective.unwrap() - b.objective.unwrap()).abs() < 1e-6);
        // every formulation describes the same set of tours
        assert!((a.objective.unwrap() - optimum).abs() < 1e-6);
        let tour = a.tour.as_ref().unwrap();
        assert!(tour.is_hamiltonian(5));
        assert!((tour.cost - optimum).abs() < 1e-6);
    }
}

#[test]
fn test_zero_time_limit_returns_without_solution() {
    let instance = generate_instance(&GeneratorConfig { nodes: 12, seed: 11, ..Default::default() }).unwrap();
    let built = Formulation::Mtz(MtzMode::Bounded).build(&instance.matrix, &ModelOptions::default());
    let outcome = solver()
        .solve(&built.model, &SolverConfig::with_time_limit(0.0))
        .unwrap();

    if outcome.has_solution() {
        assert_ne!(outcome.status, SolveStatus::Infeasible);
    } else {
        assert_eq!(outcome.status, SolveStatus::NoIncumbent);
        let record = SolveRecord::from_outcome("t", &instance, &built, &outcome, outcome.runtime);
        assert_eq!(record.gap_percent, NO_INCUMBENT_GAP);
        assert_eq!(record.objective, None);
        assert_eq!(record.best_bound, None);
    }
}

#[test]
fn test_batch_skips_broken_instances_and_writes_csv() {
    let data = tempfile::tempdir().unwrap();
    let group_dir = data.path().join("small");
    fs::create_dir(&group_dir).unwrap();
    fs::write(group_dir.join("three.atsp"), THREE_NODES).unwrap();
    fs::write(group_dir.join("broken.atsp"), "DIMENSION: 4\nEDGE_WEIGHT_SECTION\n0 1 2\nEOF\n").unwrap();
    fs::write(group_dir.join("other.atsp"), THREE_NODES).unwrap();

    let out = tempfile::tempdir().unwrap();
    let csv = CsvTarget::new(out.path().join("results.csv"));
    let groups = vec![InstanceGroup::new("S", &group_dir)];

    let solver = solver();
    let config = BenchmarkConfig {
        formulations: vec![Formulation::Mtz(MtzMode::Bounded), Formulation::Gg],
        ..quiet_config(60.0)
    };
    let mut benchmark = Benchmark::new(config, &solver);
    let only = vec!["three".to_string(), "broken".to_string()];
    let summary = benchmark.run_groups(&groups, &only, Some(&csv)).unwrap();

    assert_eq!(summary.solved, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(benchmark.results().len(), 2);

    let text = fs::read_to_string(&csv.path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("group;instance;nodes;variables;constraints;time;gap_percent;best_bound;objective"));
    assert!(lines[1].starts_with("S;three;3;"));
    assert!(lines[2].contains(";GG;Optimal"));
}

#[test]
fn test_single_instance_summary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("three.atsp");
    fs::write(&path, THREE_NODES).unwrap();

    let instance = AtspInstance::from_file(&path, &ReadOptions::with_sentinel()).unwrap();
    let records = solve_all(&instance, quiet_config(60.0));
    let summary = InstanceSummary::new(&instance, &records);
    let json_path = dir.path().join("summary.json");
    summary.write(&json_path).unwrap();

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(value["instance"], "three");
    let models = value["models"].as_object().unwrap();
    assert_eq!(models.len(), 3);
    for key in ["MTZ_bounded", "MTZ_unbounded", "GG"] {
        assert_eq!(models[key]["objective"], 10.0);
    }
}
