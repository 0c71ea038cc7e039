//! ATSP MIP - Command Line Interface
//!
//! Solves TSPLIB ATSP instances with the MTZ and Gavish-Graves formulations.

use clap::{Args, Parser, Subcommand};
use atsp_mip::benchmark::{Benchmark, BenchmarkConfig, CsvTarget, InstanceGroup};
use atsp_mip::config::LicenseConfig;
use atsp_mip::error::{Error, Result};
use atsp_mip::exact::{create_solver, run_worker, Backend, MipSolver, SolverConfig};
use atsp_mip::formulation::{select_formulations, FormulationChoice, ModelOptions, MtzModeChoice, SelfLoops};
use atsp_mip::generator::{generate_instance, write_tsplib, GeneratorConfig};
use atsp_mip::instance::{read_instance, ReadOptions};
use atsp_mip::logging::init_logger;
use atsp_mip::report::InstanceSummary;

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "atsp-mip")]
#[command(version = "1.0")]
#[command(about = "MTZ and Gavish-Graves MIP formulations for the Asymmetric TSP")]
struct Cli {
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve one instance with the selected formulations
    Solve {
        /// Path to the instance file
        instance: PathBuf,

        /// Time limit in seconds, per formulation
        #[arg(default_value = "3600")]
        time_limit: f64,

        #[command(flatten)]
        model: ModelArgs,

        /// Write a JSON summary keyed by model name
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the tour found by each model
        #[arg(long)]
        show_tour: bool,
    },

    /// Solve every instance of one or more directories
    Batch {
        /// Instance directory, as `PATH` or `LABEL=PATH` (repeatable)
        #[arg(short, long = "dir", required = true)]
        dirs: Vec<String>,

        /// Only solve these instances (file stem or file name, repeatable)
        #[arg(long)]
        only: Vec<String>,

        /// CSV results file, rewritten after every instance
        #[arg(short, long, default_value = "results.csv")]
        output: PathBuf,

        /// Also write every result row as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// CSV field delimiter
        #[arg(long, default_value = ";")]
        delimiter: char,

        /// Time limit in seconds, per formulation
        #[arg(short, long, default_value = "3600")]
        time_limit: f64,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Print instance statistics and model sizes
    Info {
        /// Path to the instance file
        instance: PathBuf,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Write an instance as a plain matrix
    Convert {
        /// Path to the instance file
        instance: PathBuf,

        /// Output file
        output: PathBuf,
    },

    /// Write a random ATSP instance in TSPLIB format
    Generate {
        /// Number of nodes
        #[arg(short, long)]
        nodes: usize,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Largest arc cost
        #[arg(long, default_value = "1000")]
        max_cost: u32,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Solve one model read as JSON on stdin with microlp, reply on stdout
    #[command(hide = true)]
    Worker,
}

/// Options shared by the commands that build models.
#[derive(Args, Clone)]
struct ModelArgs {
    /// Formulations to build
    #[arg(short, long, value_enum, default_value = "all")]
    formulation: FormulationChoice,

    /// Domain of the MTZ position variables
    #[arg(long, value_enum, default_value = "bounded")]
    mtz_mode: MtzModeChoice,

    /// Solver backend
    #[arg(short, long, value_enum, default_value = "microlp")]
    backend: Backend,

    /// Declare x_i_i variables or not
    #[arg(long, value_enum, default_value = "exclude")]
    self_loops: SelfLoops,

    /// Overwrite the diagonal with this cost (1e6 when given without a value)
    #[arg(long, num_args = 0..=1, default_missing_value = "1000000")]
    diagonal: Option<f64>,
}

impl ModelArgs {
    fn read_options(&self) -> Result<ReadOptions> {
        match self.diagonal {
            Some(value) if !value.is_finite() => {
                Err(Error::config(format!("diagonal cost {} is not finite", value)))
            }
            diagonal => Ok(ReadOptions { diagonal }),
        }
    }

    fn benchmark_config(&self, time_limit: f64, verbose: bool) -> Result<BenchmarkConfig> {
        Ok(BenchmarkConfig {
            formulations: select_formulations(self.formulation, self.mtz_mode),
            model: ModelOptions { self_loops: self.self_loops },
            read: self.read_options()?,
            solver: SolverConfig {
                time_limit,
                verbose,
                ..Default::default()
            },
            show_clock: true,
        })
    }

    /// License problems surface here, before any instance is read.
    fn solver(&self) -> Result<Box<dyn MipSolver>> {
        let license = match self.backend {
            Backend::Gurobi => {
                let license = LicenseConfig::from_env()?;
                if !license.is_configured() {
                    log::info!("No WLS credentials in the environment, using the local Gurobi license");
                }
                license
            }
            Backend::Microlp => LicenseConfig::default(),
        };
        create_solver(self.backend, &license)
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logger(cli.verbose) {
        eprintln!("{}", e);
    }

    let verbose = cli.verbose;
    let result = match cli.command {
        Commands::Solve { instance, time_limit, model, output, show_tour } => {
            solve_instance(&instance, time_limit, &model, output.as_deref(), show_tour, verbose)
        }

        Commands::Batch { dirs, only, output, json, delimiter, time_limit, model } => {
            run_batch(&dirs, &only, &output, json.as_deref(), delimiter, time_limit, &model, verbose)
        }

        Commands::Info { instance, model } => show_info(&instance, &model),

        Commands::Convert { instance, output } => convert_instance(&instance, &output),

        Commands::Generate { nodes, seed, max_cost, output } => {
            generate(nodes, seed, max_cost, &output)
        }

        Commands::Worker => run_worker(std::io::stdin().lock(), std::io::stdout().lock()),
    };

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn solve_instance(
    path: &Path,
    time_limit: f64,
    model: &ModelArgs,
    output: Option<&Path>,
    show_tour: bool,
    verbose: bool,
) -> Result<()> {
    let solver = model.solver()?;
    let config = model.benchmark_config(time_limit, verbose)?;

    log::info!("Loading instance from {}", path.display());
    let instance = read_instance(path, &config.read)?;
    println!("Instance: {} ({} nodes)", instance.name, instance.dimension());

    let mut benchmark = Benchmark::new(config, solver.as_ref());
    let records = benchmark.run_instance("", &instance)?;

    for record in &records {
        println!("\n{}", record);
        if show_tour {
            match &record.tour {
                Some(tour) => println!("  Tour: {}", tour),
                None => println!("  Tour: -"),
            }
        }
    }

    if let Some(output) = output {
        InstanceSummary::new(&instance, &records).write(output)?;
        println!("\nSummary written to {}", output.display());
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_batch(
    dirs: &[String],
    only: &[String],
    output: &Path,
    json: Option<&Path>,
    delimiter: char,
    time_limit: f64,
    model: &ModelArgs,
    verbose: bool,
) -> Result<()> {
    if !delimiter.is_ascii() {
        return Err(Error::config(format!("delimiter `{}` is not a single ASCII character", delimiter)));
    }
    let groups = dirs
        .iter()
        .map(|d| d.parse::<InstanceGroup>())
        .collect::<Result<Vec<_>>>()?;

    let solver = model.solver()?;
    let config = model.benchmark_config(time_limit, verbose)?;
    let csv = CsvTarget { path: output.to_path_buf(), delimiter: delimiter as u8 };

    let mut benchmark = Benchmark::new(config, solver.as_ref());
    let summary = benchmark.run_groups(&groups, only, Some(&csv))?;
    let results = benchmark.into_results();

    results.export_to_csv(&csv.path, csv.delimiter)?;
    println!("Results exported to {}", csv.path.display());
    if let Some(json) = json {
        results.export_to_json(json)?;
        println!("JSON results exported to {}", json.display());
    }

    println!("\n{}", results.generate_report());
    println!("{} instances solved, {} skipped", summary.solved, summary.skipped);
    Ok(())
}

fn show_info(path: &Path, model: &ModelArgs) -> Result<()> {
    let instance = read_instance(path, &model.read_options()?)?;

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());
    if !instance.comment.is_empty() {
        println!("  Comment: {}", instance.comment);
    }

    let options = ModelOptions { self_loops: model.self_loops };
    println!("\nModel sizes:");
    for formulation in select_formulations(model.formulation, model.mtz_mode) {
        let built = formulation.build(&instance.matrix, &options);
        println!(
            "  {:<14} {:>8} variables ({} binary) {:>8} constraints",
            formulation.label(),
            built.model.num_vars(),
            built.model.num_binaries(),
            built.model.num_constraints()
        );
    }
    Ok(())
}

fn convert_instance(path: &Path, output: &Path) -> Result<()> {
    let instance = read_instance(path, &ReadOptions::default())?;
    instance.matrix.write_plain(output)?;
    println!("Wrote {}x{} matrix to {}", instance.dimension(), instance.dimension(), output.display());
    Ok(())
}

fn generate(nodes: usize, seed: u64, max_cost: u32, output: &Path) -> Result<()> {
    let config = GeneratorConfig {
        nodes,
        seed,
        max_cost,
        ..Default::default()
    };
    let instance = generate_instance(&config)?;
    write_tsplib(&instance, output)?;
    println!("Wrote {} ({} nodes) to {}", instance.name, nodes, output.display());
    Ok(())
}
