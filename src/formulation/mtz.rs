//! Miller-Tucker-Zemlin formulation.
//!
//! ```text
//! min  sum c_ij x_ij
//! s.t. sum_j x_ij = 1                          for all i
//!      sum_i x_ij = 1                          for all j
//!      u_i - u_j + (n-1) x_ij <= n-2           for all i != j, i, j >= 1
//!      u_i >= 1, u_i <= n-1   (bounded mode)   for all i >= 1
//!      u_i >= 0                                for all i >= 1
//! ```
//!
//! The origin (node 0) has no position variable; its position is implicitly 0.
//! In bounded mode the position range is stated as constraint rows, not variable bounds.

use crate::instance::CostMatrix;
use crate::model::{ConstraintKind, LinExpr, MipModel, Sense, VarId};

use super::{add_degree_constraints, ArcVars, AtspModel, Formulation, ModelOptions, MtzMode};

pub fn build_mtz(matrix: &CostMatrix, mode: MtzMode, options: &ModelOptions) -> AtspModel {
    let n = matrix.dimension();
    let formulation = Formulation::Mtz(mode);
    let mut model = MipModel::new(format!("ATSP_{}", formulation.label()));

    let arcs = ArcVars::declare(&mut model, matrix, options.self_loops);

    // u[0] stays None
    let mut u: Vec<Option<VarId>> = vec![None; n];
    for (i, slot) in u.iter_mut().enumerate().skip(1) {
        *slot = Some(model.add_continuous(format!("u_{}", i), 0.0, f64::INFINITY));
    }

    add_degree_constraints(&mut model, &arcs);

    if mode == MtzMode::Bounded {
        let last = n.saturating_sub(1) as f64;
        for (i, ui) in u.iter().enumerate() {
            let Some(ui) = *ui else { continue };
            let expr = LinExpr::new().with_term(ui, 1.0);
            model.add_constr(format!("u_lb_{}", i), ConstraintKind::PositionBound, expr.clone(), Sense::Ge, 1.0);
            model.add_constr(format!("u_ub_{}", i), ConstraintKind::PositionBound, expr, Sense::Le, last);
        }
    }

    let big_m = n.saturating_sub(1) as f64;
    let rhs = n as f64 - 2.0;
    for i in 1..n {
        for j in 1..n {
            if i == j {
                continue;
            }
            let (Some(ui), Some(uj), Some(xij)) = (u[i], u[j], arcs.get(i, j)) else {
                continue;
            };
            let expr = LinExpr::new()
                .with_term(ui, 1.0)
                .with_term(uj, -1.0)
                .with_term(xij, big_m);
            model.add_constr(format!("mtz_{}_{}", i, j), ConstraintKind::SubtourElimination, expr, Sense::Le, rhs);
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
    use crate::model::VarKind;

    fn matrix(n: usize) -> CostMatrix {
        let data = (0..n * n).map(|k| ((k * 13) % 17) as f64).collect();
        CostMatrix::from_row_major(n, data).unwrap()
    }

    #[test]
    fn test_mtz_sizes() {
        for n in 1..=8 {
            let built = build_mtz(&matrix(n), MtzMode::Bounded, &ModelOptions::default());
            let model = &built.model;
            assert_eq!(model.count_constraints(ConstraintKind::OutDegree), n);
            assert_eq!(model.count_constraints(ConstraintKind::InDegree), n);
            assert_eq!(
                model.count_constraints(ConstraintKind::SubtourElimination),
                (n - 1) * n.saturating_sub(2)
            );
            assert_eq!(model.count_constraints(ConstraintKind::PositionBound), 2 * (n - 1));
            assert_eq!(
                model.num_constraints(),
                2 * n + (n - 1) * n.saturating_sub(2) + 2 * (n - 1)
            );
            assert_eq!(model.num_binaries(), n * (n - 1));
            assert_eq!(model.num_vars(), n * (n - 1) + (n - 1));
        }
    }

    #[test]
    fn test_mtz_with_self_loops() {
        let options = ModelOptions { self_loops: SelfLoops::Include };
        let built = build_mtz(&matrix(5), MtzMode::Unbounded, &options);
        assert_eq!(built.model.num_binaries(), 25);
        assert_eq!(built.model.count_constraints(ConstraintKind::SelfLoop), 5);
        assert_eq!(built.model.num_constraints(), 10 + 4 * 3 + 5);
    }

    #[test]
    fn test_position_bounds() {
        let bounded = build_mtz(&matrix(6), MtzMode::Bounded, &ModelOptions::default());
        let positions: Vec<_> = bounded
            .model
            .variables()
            .iter()
            .filter(|v| v.kind == VarKind::Continuous)
            .collect();
        assert_eq!(positions.len(), 5);
        assert!(positions.iter().all(|v| v.lower == 0.0 && v.upper.is_infinite()));
        assert!(positions.iter().all(|v| v.name != "u_0"));

        let lb = bounded.model.constraints().iter().find(|c| c.name == "u_lb_3").unwrap();
        assert_eq!((lb.sense, lb.rhs), (Sense::Ge, 1.0));
        let ub = bounded.model.constraints().iter().find(|c| c.name == "u_ub_3").unwrap();
        assert_eq!((ub.sense, ub.rhs), (Sense::Le, 5.0));
        assert_eq!(lb.expr, ub.expr);

        let unbounded = build_mtz(&matrix(6), MtzMode::Unbounded, &ModelOptions::default());
        assert!(unbounded
            .model
            .variables()
            .iter()
            .filter(|v| v.kind == VarKind::Continuous)
            .all(|v| v.lower == 0.0 && v.upper.is_infinite()));
        assert_eq!(unbounded.model.count_constraints(ConstraintKind::PositionBound), 0);
        assert_eq!(bounded.model.num_constraints(), unbounded.model.num_constraints() + 10);
    }

    #[test]
    fn test_position_rows_reject_position_zero() {
        // tour 0 -> 1 -> 2 -> 0 with u_1 = 0 only satisfies the unbounded model
        for (mode, feasible) in [(MtzMode::Unbounded, true), (MtzMode::Bounded, false)] {
            let built = build_mtz(&matrix(3), mode, &ModelOptions::default());
            let mut values = vec![0.0; built.model.num_vars()];
            for (i, j) in [(0, 1), (1, 2), (2, 0)] {
                values[built.arcs.get(i, j).unwrap().0] = 1.0;
            }
            let u1 = built.model.variables().iter().position(|v| v.name == "u_1").unwrap();
            let u2 = built.model.variables().iter().position(|v| v.name == "u_2").unwrap();
            values[u1] = 0.0;
            values[u2] = 1.0;
            assert_eq!(built.model.is_feasible(&values, 1e-9), feasible, "{:?}", mode);
        }
    }

    #[test]
    fn test_subtour_constraint_shape() {
        let built = build_mtz(&matrix(4), MtzMode::Bounded, &ModelOptions::default());
        let c = built
            .model
            .constraints()
            .iter()
            .find(|c| c.name == "mtz_1_2")
            .unwrap();
        assert_eq!(c.sense, Sense::Le);
        assert_eq!(c.rhs, 2.0);
        let x12 = built.arcs.get(1, 2).unwrap();
        assert!(c.expr.terms.contains(&(x12, 3.0)));
    }

    #[test]
    fn test_tour_positions_are_feasible() {
        // tour 0 -> 2 -> 1 -> 3 -> 0, positions u_2 = 1, u_1 = 2, u_3 = 3
        let built = build_mtz(&matrix(4), MtzMode::Bounded, &ModelOptions::default());
        let mut values = vec![0.0; built.model.num_vars()];
        for (i, j) in [(0, 2), (2, 1), (1, 3), (3, 0)] {
            values[built.arcs.get(i, j).unwrap().0] = 1.0;
        }
        for (var, value) in [("u_1", 2.0), ("u_2", 1.0), ("u_3", 3.0)] {
            let idx = built.model.variables().iter().position(|v| v.name == var).unwrap();
            values[idx] = value;
        }
        assert!(built.model.is_feasible(&values, 1e-9));

        // two subtours 0 <-> 1 and 2 <-> 3 violate some MTZ constraint
        let mut values = vec![0.0; built.model.num_vars()];
        for (i, j) in [(0, 1), (1, 0), (2, 3), (3, 2)] {
            values[built.arcs.get(i, j).unwrap().0] = 1.0;
        }
        for u in 1..=3 {
            let idx = built.model.variables().iter().position(|v| v.name == format!("u_{}", u)).unwrap();
            values[idx] = u as f64;
        }
        assert!(!built.model.is_feasible(&values, 1e-9));
    }
}
