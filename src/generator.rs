//! Random ATSP instances for experiments.

use std::fs;
use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{Error, Result};
use crate::instance::{AtspInstance, CostMatrix};

/// Random instance configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Number of nodes
    pub nodes: usize,
    /// Random seed
    pub seed: u64,
    /// Smallest arc cost
    pub min_cost: u32,
    /// Largest arc cost
    pub max_cost: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            nodes: 10,
            seed: 42,
            min_cost: 1,
            max_cost: 1000,
        }
    }
}

/// Draw integer arc costs uniformly in `[min_cost, max_cost]`; the diagonal is 0.
pub fn generate_instance(config: &GeneratorConfig) -> Result<AtspInstance> {
    if config.nodes == 0 {
        return Err(Error::config("cannot generate an instance with 0 nodes"));
    }
    if config.min_cost > config.max_cost {
        return Err(Error::config(format!(
            "min cost {} exceeds max cost {}",
            config.min_cost, config.max_cost
        )));
    }

    let n = config.nodes;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut rows = vec![vec![0.0; n]; n];
    for (i, row) in rows.iter_mut().enumerate() {
        for (j, cost) in row.iter_mut().enumerate() {
            if i != j {
                *cost = rng.gen_range(config.min_cost..=config.max_cost) as f64;
            }
        }
    }

    let mut instance = AtspInstance::new(format!("rand{}_s{}", n, config.seed), CostMatrix::from_rows(rows)?);
    instance.comment = format!(
        "random ATSP, costs in [{}, {}], seed {}",
        config.min_cost, config.max_cost, config.seed
    );
    Ok(instance)
}

/// Write an instance as a TSPLIB ATSP file.
pub fn write_tsplib<P: AsRef<Path>>(instance: &AtspInstance, path: P) -> Result<()> {
    fs::write(path, instance.matrix.to_tsplib_string(&instance.name, &instance.comment))?;
    Ok(())
}
