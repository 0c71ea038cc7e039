//! Gavish-Graves single-commodity flow formulation.
//!
//! ```text
//! min  sum c_ij x_ij
//! s.t. sum_j x_ij = 1                                   for all i
//!      sum_i x_ij = 1                                   for all j
//!      sum_j g_ij - sum_{k >= 1} g_ki = 1               for all i >= 1
//!      g_ij <= (n-1) x_ij                               for all i >= 1, j
//!      0 <= g_ij <= n-1
//! ```
//!
//! Every non-origin node consumes one unit of flow, which can only reach it along
//! a single path of used arcs. When `x_i_i` is not declared, `g_i_i` is fixed to 0 instead.

use crate::instance::CostMatrix;
use crate::model::{ConstraintKind, LinExpr, MipModel, Sense, VarId};

use super::{add_degree_constraints, ArcVars, AtspModel, Formulation, ModelOptions};

pub fn build_gg(matrix: &CostMatrix, options: &ModelOptions) -> AtspModel {
    let n = matrix.dimension();
    let formulation = Formulation::Gg;
    let mut model = MipModel::new(format!("ATSP_{}", formulation.label()));

    let arcs = ArcVars::declare(&mut model, matrix, options.self_loops);

    let big_m = n.saturating_sub(1) as f64;
    // g[i][j] for i >= 1; row 0 stays empty
    let mut g: Vec<Vec<VarId>> = vec![Vec::new(); n];
    for (i, row) in g.iter_mut().enumerate().skip(1) {
        *row = (0..n)
            .map(|j| model.add_continuous(format!("g_{}_{}", i, j), 0.0, big_m))
            .collect();
    }

    add_degree_constraints(&mut model, &arcs);

    for i in 1..n {
        let mut expr: LinExpr = g[i].iter().map(|&v| (v, 1.0)).collect();
        for row in g.iter().skip(1) {
            expr.add_term(row[i], -1.0);
        }
        model.add_constr(format!("flow_balance_{}", i), ConstraintKind::FlowBalance, expr, Sense::Eq, 1.0);
    }

    for i in 1..n {
        for j in 0..n {
            let name = format!("g_bound_{}_{}", i, j);
            match arcs.get(i, j) {
                Some(x) => {
                    let expr = LinExpr::new().with_term(g[i][j], 1.0).with_term(x, -big_m);
                    model.add_constr(name, ConstraintKind::FlowCoupling, expr, Sense::Le, 0.0);
                }
                None => {
                    let expr = LinExpr::new().with_term(g[i][j], 1.0);
                    model.add_constr(name, ConstraintKind::FlowCoupling, expr, Sense::Eq, 0.0);
                }
            }
        }
    }

    log::debug!(
        "{}: {} variables, {} constraints (n={})",
        model.name,
        model.num_vars(),
        model.num_constraints(),
        n
    );

    AtspModel { formulation, model, arcs }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formulation::SelfLoops;

    fn matrix(n: usize) -> CostMatrix {
        let data = (0..n * n).map(|k| ((k * 7) % 11) as f64).collect();
        CostMatrix::from_row_major(n, data).unwrap()
    }

    #[test]
    fn test_gg_sizes() {
        for n in 1..=8 {
            let built = build_gg(&matrix(n), &ModelOptions::default());
            let model = &built.model;
            assert_eq!(model.count_constraints(ConstraintKind::OutDegree), n);
            assert_eq!(model.count_constraints(ConstraintKind::InDegree), n);
            assert_eq!(model.count_constraints(ConstraintKind::FlowBalance), n - 1);
            assert_eq!(model.count_constraints(ConstraintKind::FlowCoupling), (n - 1) * n);
            assert_eq!(model.num_constraints(), 2 * n + (n - 1) + (n - 1) * n);
            assert_eq!(model.num_vars(), n * (n - 1) + (n - 1) * n);
        }
    }

    #[test]
    fn test_gg_with_self_loops() {
        let options = ModelOptions { self_loops: SelfLoops::Include };
        let built = build_gg(&matrix(4), &options);
        assert_eq!(built.model.num_vars(), 16 + 12);
        assert_eq!(built.model.count_constraints(ConstraintKind::SelfLoop), 4);
        assert_eq!(built.model.num_constraints(), 8 + 3 + 12 + 4);
        assert!(built
            .model
            .constraints()
            .iter()
            .filter(|c| c.kind == ConstraintKind::FlowCoupling)
            .all(|c| c.sense == Sense::Le));
    }

    #[test]
    fn test_missing_self_loop_fixes_flow() {
        let built = build_gg(&matrix(3), &ModelOptions::default());
        let c = built
            .model
            .constraints()
            .iter()
            .find(|c| c.name == "g_bound_2_2")
            .unwrap();
        assert_eq!(c.sense, Sense::Eq);
        assert_eq!(c.rhs, 0.0);
        assert_eq!(c.expr.terms.len(), 1);
    }

    #[test]
    fn test_flow_along_tour_is_feasible() {
        // tour 0 -> 1 -> 2 -> 3 -> 0, flow accumulates towards the origin: 1, 2, 3 units
        let n = 4;
        let built = build_gg(&matrix(n), &ModelOptions::default());
        let mut values = vec![0.0; built.model.num_vars()];
        for (i, j) in [(0, 1), (1, 2), (2, 3), (3, 0)] {
            values[built.arcs.get(i, j).unwrap().0] = 1.0;
        }
        let index = |name: &str| built.model.variables().iter().position(|v| v.name == name).unwrap();
        values[index("g_1_2")] = 1.0;
        values[index("g_2_3")] = 2.0;
        values[index("g_3_0")] = 3.0;
        assert!(built.model.is_feasible(&values, 1e-9));

        // subtours 0 <-> 1 and 2 <-> 3 cannot satisfy the balance of nodes 2 and 3
        let mut values = vec![0.0; built.model.num_vars()];
        for (i, j) in [(0, 1), (1, 0), (2, 3), (3, 2)] {
            values[built.arcs.get(i, j).unwrap().0] = 1.0;
        }
        values[index("g_1_0")] = 1.0;
        values[index("g_2_3")] = 1.0;
        values[index("g_3_2")] = 1.0;
        assert!(!built.model.is_feasible(&values, 1e-9));
    }
}
