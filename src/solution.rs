//! Tours read back from solver arc values.

use serde::{Deserialize, Serialize};

use crate::formulation::ArcVars;
use crate::instance::CostMatrix;

/// Threshold above which a binary arc value counts as selected.
const ARC_SELECTED: f64 = 0.5;

/// A closed tour starting at the origin (node 0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tour {
    /// Visiting order, starting at 0; the return arc to 0 is implicit
    pub nodes: Vec<usize>,
    /// Total cost including the return arc
    pub cost: f64,
}

impl Tour {
    pub fn new(matrix: &CostMatrix, nodes: Vec<usize>) -> Self {
        let cost = if nodes.len() == 1 {
            matrix.cost(nodes[0], nodes[0])
        } else {
            matrix.tour_cost(&nodes)
        };
        Tour { nodes, cost }
    }

    /// Follow selected arcs from node 0 until the cycle closes.
    ///
    /// `values` is indexed by model variable position. Returns `None` when the selected
    /// arcs do not form a single circuit through every node.
    pub fn from_arc_values(matrix: &CostMatrix, arcs: &ArcVars, values: &[f64]) -> Option<Self> {
        let n = arcs.dimension();
        if n == 0 {
            return None;
        }

        let mut successor = vec![None; n];
        for (i, j, var) in arcs.iter() {
            if values.get(var.0).copied().unwrap_or(0.0) > ARC_SELECTED {
                if successor[i].is_some() {
                    return None;
                }
                successor[i] = Some(j);
            }
        }

        let mut nodes = vec![0];
        let mut visited = vec![false; n];
        visited[0] = true;
        let mut current = 0;
        loop {
            let next = successor[current]?;
            if next == 0 {
                break;
            }
            if visited[next] {
                return None;
            }
            visited[next] = true;
            nodes.push(next);
            current = next;
        }

        let tour = Tour::new(matrix, nodes);
        if tour.is_hamiltonian(n) {
            Some(tour)
        } else {
            None
        }
    }

    /// Every node `0..n` appears exactly once and the tour starts at 0.
    pub fn is_hamiltonian(&self, n: usize) -> bool {
        if self.nodes.len() != n || self.nodes.first() != Some(&0) {
            return false;
        }
        let mut seen = vec![false; n];
        for &v in &self.nodes {
            if v >= n || seen[v] {
                return false;
            }
            seen[v] = true;
        }
        true
    }
}

impl std::fmt::Display for Tour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path: Vec<String> = self.nodes.iter().chain(self.nodes.first()).map(|v| v.to_string()).collect();
        write!(f, "{} (cost {})", path.join(" -> "), self.cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formulation::SelfLoops;
    use crate::model::MipModel;

    fn setup() -> (CostMatrix, ArcVars, usize) {
        let matrix = CostMatrix::from_rows(vec![
            vec![0.0, 1.0, 2.0, 3.0],
            vec![4.0, 0.0, 5.0, 6.0],
            vec![7.0, 8.0, 0.0, 9.0],
            vec![1.0, 2.0, 3.0, 0.0],
        ])
        .unwrap();
        let mut model = MipModel::new("t");
        let arcs = ArcVars::declare(&mut model, &matrix, SelfLoops::Exclude);
        let num_vars = model.num_vars();
        (matrix, arcs, num_vars)
    }

    fn select(arcs: &ArcVars, num_vars: usize, selected: &[(usize, usize)]) -> Vec<f64> {
        let mut values = vec![0.0; num_vars];
        for &(i, j) in selected {
            values[arcs.get(i, j).unwrap().0] = 1.0;
        }
        values
    }

    #[test]
    fn test_extract_tour() {
        let (matrix, arcs, num_vars) = setup();
        let values = select(&arcs, num_vars, &[(0, 2), (2, 1), (1, 3), (3, 0)]);
        let tour = Tour::from_arc_values(&matrix, &arcs, &values).unwrap();
        assert_eq!(tour.nodes, vec![0, 2, 1, 3]);
        assert_eq!(tour.cost, 2.0 + 8.0 + 6.0 + 1.0);
        assert_eq!(tour.to_string(), "0 -> 2 -> 1 -> 3 -> 0 (cost 17)");
    }

    #[test]
    fn test_subtours_are_rejected() {
        let (matrix, arcs, num_vars) = setup();
        let values = select(&arcs, num_vars, &[(0, 1), (1, 0), (2, 3), (3, 2)]);
        assert!(Tour::from_arc_values(&matrix, &arcs, &values).is_none());
    }

    #[test]
    fn test_fractional_values_round() {
        let (matrix, arcs, num_vars) = setup();
        let mut values = select(&arcs, num_vars, &[(0, 1), (1, 2), (2, 3), (3, 0)]);
        for v in values.iter_mut() {
            if *v == 1.0 {
                *v = 0.9999999;
            } else {
                *v = 1e-9;
            }
        }
        let tour = Tour::from_arc_values(&matrix, &arcs, &values).unwrap();
        assert_eq!(tour.nodes, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_hamiltonian_check() {
        let matrix = CostMatrix::from_rows(vec![vec![0.0; 3]; 3]).unwrap();
        assert!(Tour::new(&matrix, vec![0, 2, 1]).is_hamiltonian(3));
        assert!(!Tour::new(&matrix, vec![0, 2]).is_hamiltonian(3));
        assert!(!Tour::new(&matrix, vec![1, 0, 2]).is_hamiltonian(3));
    }
}
