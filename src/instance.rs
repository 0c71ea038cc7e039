//! Module for parsing and representing ATSP instances.
//!
//! This module handles TSPLIB `TYPE: ATSP` files with a full `EDGE_WEIGHT_SECTION`,
//! as well as bare "plain matrix" files (n lines of n numbers, no headers).

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::{Error, ParseError, Result};

/// Cost written on the diagonal when self-loops must be discouraged.
pub const DEFAULT_DIAGONAL_SENTINEL: f64 = 1e6;

/// Square matrix of arc costs, stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostMatrix {
    dimension: usize,
    data: Vec<f64>,
}

impl CostMatrix {
    /// Build a matrix from `n * n` row-major values.
    pub fn from_row_major(dimension: usize, data: Vec<f64>) -> std::result::Result<Self, ParseError> {
        let expected = dimension
            .checked_mul(dimension)
            .ok_or_else(|| ParseError::InvalidDimension(dimension.to_string()))?;
        if data.len() < expected {
            return Err(ParseError::InsufficientData { expected, received: data.len() });
        }
        let mut data = data;
        data.truncate(expected);
        Ok(CostMatrix { dimension, data })
    }

    /// Build a matrix from nested rows. Every row must have as many entries as there are rows.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> std::result::Result<Self, ParseError> {
        let dimension = rows.len();
        let mut data = Vec::with_capacity(dimension * dimension);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != dimension {
                return Err(ParseError::RaggedRow { row, expected: dimension, found: values.len() });
            }
            data.extend(values);
        }
        Ok(CostMatrix { dimension, data })
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Cost of the arc `i -> j`.
    #[inline]
    pub fn cost(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.dimension + j]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.dimension..(i + 1) * self.dimension]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks(self.dimension.max(1)).take(self.dimension)
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.rows().map(|r| r.to_vec()).collect()
    }

    /// Copy of the matrix with every `(i, i)` entry replaced by `value`.
    pub fn with_diagonal(&self, value: f64) -> Self {
        let mut data = self.data.clone();
        for i in 0..self.dimension {
            data[i * self.dimension + i] = value;
        }
        CostMatrix { dimension: self.dimension, data }
    }

    /// Cost of the closed tour visiting `tour` in order and returning to its first node.
    pub fn tour_cost(&self, tour: &[usize]) -> f64 {
        if tour.len() < 2 {
            return 0.0;
        }
        let mut cost: f64 = tour.windows(2).map(|w| self.cost(w[0], w[1])).sum();
        cost += self.cost(tour[tour.len() - 1], tour[0]);
        cost
    }

    /// Render as a plain matrix: one line per row, values separated by a single space.
    pub fn to_plain_string(&self) -> String {
        let mut out = String::new();
        for row in self.rows() {
            let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            out.push_str(&line.join(" "));
            out.push('\n');
        }
        out
    }

    /// Render as a TSPLIB ATSP file with a full matrix section.
    pub fn to_tsplib_string(&self, name: &str, comment: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "NAME: {}", name);
        let _ = writeln!(out, "TYPE: ATSP");
        if !comment.is_empty() {
            let _ = writeln!(out, "COMMENT: {}", comment);
        }
        let _ = writeln!(out, "DIMENSION: {}", self.dimension);
        let _ = writeln!(out, "EDGE_WEIGHT_TYPE: EXPLICIT");
        let _ = writeln!(out, "EDGE_WEIGHT_FORMAT: FULL_MATRIX");
        let _ = writeln!(out, "EDGE_WEIGHT_SECTION");
        out.push_str(&self.to_plain_string());
        out.push_str("EOF\n");
        out
    }

    pub fn write_plain<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_plain_string())?;
        Ok(())
    }
}

/// Which textual layout an instance was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceFormat {
    Tsplib,
    PlainMatrix,
}

/// Options applied while reading an instance.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Overwrite the diagonal with this cost after parsing.
    pub diagonal: Option<f64>,
}

impl ReadOptions {
    pub fn with_sentinel() -> Self {
        ReadOptions { diagonal: Some(DEFAULT_DIAGONAL_SENTINEL) }
    }
}

/// A parsed ATSP instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtspInstance {
    /// Name of the instance (`NAME` header, or the file stem)
    pub name: String,
    /// Comment/description
    pub comment: String,
    /// Arc costs
    pub matrix: CostMatrix,
    /// Layout of the source file
    pub format: InstanceFormat,
}

impl AtspInstance {
    pub fn new(name: impl Into<String>, matrix: CostMatrix) -> Self {
        AtspInstance {
            name: name.into(),
            comment: String::new(),
            matrix,
            format: InstanceFormat::Tsplib,
        }
    }

    /// Parse an instance from a file, using the file stem as fallback name.
    pub fn from_file<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let fallback = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut instance = Self::parse(&text, options).map_err(|e| Error::parse(path, e))?;
        if instance.name.is_empty() {
            instance.name = fallback;
        }
        Ok(instance)
    }

    /// Parse an instance from text, autodetecting the plain-matrix layout.
    pub fn parse(text: &str, options: &ReadOptions) -> std::result::Result<Self, ParseError> {
        let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        if lines.is_empty() {
            return Err(ParseError::Empty);
        }

        let mut instance = if lines.iter().all(|l| is_numeric_row(l)) {
            parse_plain(&lines)?
        } else {
            parse_tsplib(&lines)?
        };

        if let Some(value) = options.diagonal {
            instance.matrix = instance.matrix.with_diagonal(value);
        }
        Ok(instance)
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.matrix.dimension()
    }

    pub fn statistics(&self) -> InstanceStatistics {
        let n = self.dimension();
        let costs: Vec<f64> = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .map(|(i, j)| self.matrix.cost(i, j))
            .collect();

        let (min_cost, max_cost, mean_cost, std_dev_cost) = if costs.is_empty() {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let std_dev = if costs.len() > 1 { costs.iter().std_dev() } else { 0.0 };
            (Statistics::min(costs.iter()), Statistics::max(costs.iter()), costs.iter().mean(), std_dev)
        };

        let asymmetric_pairs = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .filter(|&(i, j)| (self.matrix.cost(i, j) - self.matrix.cost(j, i)).abs() > f64::EPSILON)
            .count();

        InstanceStatistics {
            name: self.name.clone(),
            dimension: n,
            format: self.format,
            min_cost,
            max_cost,
            mean_cost,
            std_dev_cost,
            asymmetric_pairs,
        }
    }
}

impl std::str::FromStr for AtspInstance {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s, &ReadOptions::default())
    }
}

/// Read an instance file (TSPLIB or plain matrix).
pub fn read_instance<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<AtspInstance> {
    AtspInstance::from_file(path, options)
}

fn is_numeric_row(line: &str) -> bool {
    line.split_whitespace().all(|tok| tok.parse::<f64>().is_ok())
}

fn parse_number(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_plain(lines: &[&str]) -> std::result::Result<AtspInstance, ParseError> {
    let mut rows = Vec::with_capacity(lines.len());
    for line in lines {
        let row = line
            .split_whitespace()
            .map(|tok| parse_number(tok).ok_or_else(|| ParseError::InvalidNumber(tok.to_string())))
            .collect::<std::result::Result<Vec<f64>, _>>()?;
        rows.push(row);
    }

    Ok(AtspInstance {
        name: String::new(),
        comment: String::new(),
        matrix: CostMatrix::from_rows(rows)?,
        format: InstanceFormat::PlainMatrix,
    })
}

/// Split `KEY: value`, `KEY : value` or `KEY value` into an upper-cased key and the rest.
fn split_header(line: &str) -> (String, &str) {
    let (key, value) = match line.find(':') {
        Some(pos) => (&line[..pos], &line[pos + 1..]),
        None => match line.find(char::is_whitespace) {
            Some(pos) => (&line[..pos], &line[pos..]),
            None => (line, ""),
        },
    };
    (key.trim().to_ascii_uppercase(), value.trim())
}

fn parse_tsplib(lines: &[&str]) -> std::result::Result<AtspInstance, ParseError> {
    let mut name = String::new();
    let mut comment = String::new();
    let mut dimension: Option<usize> = None;
    let mut in_weights = false;
    let mut values: Vec<f64> = Vec::new();

    'lines: for line in lines {
        if in_weights {
            for tok in line.split_whitespace() {
                if tok.eq_ignore_ascii_case("EOF") {
                    break 'lines;
                }
                if let Some(v) = parse_number(tok) {
                    values.push(v);
                }
            }
            continue;
        }

        if line.eq_ignore_ascii_case("EOF") {
            break;
        }

        let (key, value) = split_header(line);
        match key.as_str() {
            "NAME" => name = value.to_string(),
            "COMMENT" => {
                if !comment.is_empty() {
                    comment.push(' ');
                }
                comment.push_str(value);
            }
            "DIMENSION" => {
                let n = value
                    .split_whitespace()
                    .next()
                    .and_then(|tok| tok.parse::<usize>().ok())
                    .filter(|&n| n > 0 && n.checked_mul(n).is_some())
                    .ok_or_else(|| ParseError::InvalidDimension(value.to_string()))?;
                dimension = Some(n);
            }
            "EDGE_WEIGHT_SECTION" => {
                in_weights = true;
                values.extend(value.split_whitespace().filter_map(parse_number));
            }
            _ => {}
        }
    }

    let n = dimension.ok_or(ParseError::MissingDimension)?;
    if !in_weights {
        return Err(ParseError::MissingEdgeWeights);
    }
    let cells = n * n;
    if values.len() > cells {
        log::warn!(
            "instance {}: ignoring {} values beyond the {}x{} matrix",
            name,
            values.len() - cells,
            n,
            n
        );
    }

    Ok(AtspInstance {
        name,
        comment,
        matrix: CostMatrix::from_row_major(n, values)?,
        format: InstanceFormat::Tsplib,
    })
}

/// Paths of the `*.atsp` files in a directory, sorted by file name.
pub fn list_instance_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_atsp = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("atsp"))
            .unwrap_or(false);
        if is_atsp && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Load every `*.atsp` file of a directory, sorted by dimension then name.
/// Files that fail to parse are logged and skipped.
pub fn load_instances_from_dir<P: AsRef<Path>>(dir: P, options: &ReadOptions) -> Result<Vec<AtspInstance>> {
    let mut instances = Vec::new();

    for path in list_instance_files(dir)? {
        match AtspInstance::from_file(&path, options) {
            Ok(instance) => instances.push(instance),
            Err(e) => log::warn!("skipping {}: {}", path.display(), e),
        }
    }

    instances.sort_by(|a, b| a.dimension().cmp(&b.dimension()).then_with(|| a.name.cmp(&b.name)));
    Ok(instances)
}

/// Statistics about an ATSP instance (off-diagonal costs only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub dimension: usize,
    pub format: InstanceFormat,
    pub min_cost: f64,
    pub max_cost: f64,
    pub mean_cost: f64,
    pub std_dev_cost: f64,
    pub asymmetric_pairs: usize,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Nodes: {}", self.dimension)?;
        writeln!(f, "  Format: {:?}", self.format)?;
        writeln!(f, "  Arc cost min/max: {:.2} / {:.2}", self.min_cost, self.max_cost)?;
        writeln!(f, "  Arc cost mean: {:.2} (std dev {:.2})", self.mean_cost, self.std_dev_cost)?;
        write!(f, "  Asymmetric node pairs: {}", self.asymmetric_pairs)
    }
}
