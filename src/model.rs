//! Solver-agnostic description of a mixed-integer linear program.
//!
//! Formulations declare variables, linear constraints and a minimisation objective
//! on a [`MipModel`]; backends in [`crate::exact`] translate it to their own API.

use serde::{Deserialize, Serialize};

/// Handle to a declared variable (its position in the model).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarKind {
    Binary,
    Continuous,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
    #[serde(with = "lower_bound")]
    pub lower: f64,
    #[serde(with = "upper_bound")]
    pub upper: f64,
    /// Objective coefficient
    pub cost: f64,
}

// JSON has no infinity, so infinite bounds travel as `null`.
fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

mod lower_bound {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        super::finite(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NEG_INFINITY))
    }
}

mod upper_bound {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        super::finite(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

/// Relation between the left-hand side and the right-hand side of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    Le,
    Ge,
    Eq,
}

/// Linear expression `sum coeff * var`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinExpr {
    pub terms: Vec<(VarId, f64)>,
}

impl LinExpr {
    pub fn new() -> Self {
        LinExpr { terms: Vec::new() }
    }

    pub fn add_term(&mut self, var: VarId, coeff: f64) -> &mut Self {
        self.terms.push((var, coeff));
        self
    }

    pub fn with_term(mut self, var: VarId, coeff: f64) -> Self {
        self.terms.push((var, coeff));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Merge repeated variables and drop zero coefficients.
    pub fn normalized(&self) -> LinExpr {
        let mut terms = self.terms.clone();
        terms.sort_by_key(|&(v, _)| v);
        let mut merged: Vec<(VarId, f64)> = Vec::with_capacity(terms.len());
        for (var, coeff) in terms {
            match merged.last_mut() {
                Some((last, acc)) if *last == var => *acc += coeff,
                _ => merged.push((var, coeff)),
            }
        }
        merged.retain(|&(_, c)| c != 0.0);
        LinExpr { terms: merged }
    }

    /// Value of the expression under an assignment indexed by variable position.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms.iter().map(|&(v, c)| c * values[v.0]).sum()
    }
}

impl FromIterator<(VarId, f64)> for LinExpr {
    fn from_iter<I: IntoIterator<Item = (VarId, f64)>>(iter: I) -> Self {
        LinExpr { terms: iter.into_iter().collect() }
    }
}

/// Constraint family, used for reporting model sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    OutDegree,
    InDegree,
    SubtourElimination,
    SelfLoop,
    PositionBound,
    FlowBalance,
    FlowCoupling,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub kind: ConstraintKind,
    pub expr: LinExpr,
    pub sense: Sense,
    pub rhs: f64,
}

impl Constraint {
    /// Whether `values` satisfies the constraint within `tol`.
    pub fn is_satisfied(&self, values: &[f64], tol: f64) -> bool {
        let lhs = self.expr.evaluate(values);
        match self.sense {
            Sense::Le => lhs <= self.rhs + tol,
            Sense::Ge => lhs >= self.rhs - tol,
            Sense::Eq => (lhs - self.rhs).abs() <= tol,
        }
    }
}

/// A minimisation MIP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MipModel {
    pub name: String,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
}

impl MipModel {
    pub fn new(name: impl Into<String>) -> Self {
        MipModel {
            name: name.into(),
            variables: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn add_var(&mut self, name: impl Into<String>, kind: VarKind, lower: f64, upper: f64, cost: f64) -> VarId {
        let id = VarId(self.variables.len());
        let (lower, upper) = match kind {
            VarKind::Binary => (0.0, 1.0),
            VarKind::Continuous => (lower, upper),
        };
        self.variables.push(Variable {
            name: name.into(),
            kind,
            lower,
            upper,
            cost,
        });
        id
    }

    pub fn add_binary(&mut self, name: impl Into<String>, cost: f64) -> VarId {
        self.add_var(name, VarKind::Binary, 0.0, 1.0, cost)
    }

    pub fn add_continuous(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VarId {
        self.add_var(name, VarKind::Continuous, lower, upper, 0.0)
    }

    pub fn add_constr(&mut self, name: impl Into<String>, kind: ConstraintKind, expr: LinExpr, sense: Sense, rhs: f64) {
        self.constraints.push(Constraint {
            name: name.into(),
            kind,
            expr,
            sense,
            rhs,
        });
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.0]
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn num_vars(&self) -> usize {
        self.variables.len()
    }

    pub fn num_binaries(&self) -> usize {
        self.variables.iter().filter(|v| v.kind == VarKind::Binary).count()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn count_constraints(&self, kind: ConstraintKind) -> usize {
        self.constraints.iter().filter(|c| c.kind == kind).count()
    }

    /// Objective value of an assignment.
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.variables.iter().zip(values).map(|(v, x)| v.cost * x).sum()
    }

    /// Whether an assignment satisfies bounds, integrality and every constraint.
    pub fn is_feasible(&self, values: &[f64], tol: f64) -> bool {
        if values.len() != self.variables.len() {
            return false;
        }
        let bounds_ok = self.variables.iter().zip(values).all(|(v, &x)| {
            let integral = v.kind == VarKind::Continuous || (x - x.round()).abs() <= tol;
            integral && x >= v.lower - tol && x <= v.upper + tol
        });
        bounds_ok && self.constraints.iter().all(|c| c.is_satisfied(values, tol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_merges_terms() {
        let expr = LinExpr::new()
            .with_term(VarId(2), 1.0)
            .with_term(VarId(0), 3.0)
            .with_term(VarId(2), -1.0)
            .with_term(VarId(0), 1.0);
        assert_eq!(expr.normalized().terms, vec![(VarId(0), 4.0)]);
    }

    #[test]
    fn test_binary_bounds_are_forced() {
        let mut model = MipModel::new("m");
        let x = model.add_var("x", VarKind::Binary, -5.0, 9.0, 1.0);
        assert_eq!(model.variable(x).lower, 0.0);
        assert_eq!(model.variable(x).upper, 1.0);
        assert_eq!(model.num_binaries(), 1);
    }

    #[test]
    fn test_feasibility_check() {
        let mut model = MipModel::new("m");
        let x = model.add_binary("x", 2.0);
        let y = model.add_continuous("y", 0.0, 4.0);
        model.add_constr(
            "link",
            ConstraintKind::FlowCoupling,
            LinExpr::new().with_term(y, 1.0).with_term(x, -4.0),
            Sense::Le,
            0.0,
        );

        assert!(model.is_feasible(&[1.0, 3.5], 1e-9));
        assert!(!model.is_feasible(&[0.0, 3.5], 1e-9));
        assert!(!model.is_feasible(&[0.5, 0.0], 1e-9));
        assert_eq!(model.objective_value(&[1.0, 3.5]), 2.0);
        assert_eq!(model.count_constraints(ConstraintKind::FlowCoupling), 1);
    }

    #[test]
    fn test_json_keeps_infinite_bounds() {
        let mut model = MipModel::new("json");
        let x = model.add_binary("x", 2.5);
        let u = model.add_continuous("u", 0.0, f64::INFINITY);
        let free = model.add_continuous("free", f64::NEG_INFINITY, 3.0);
        model.add_constr(
            "mix",
            ConstraintKind::SubtourElimination,
            LinExpr::new().with_term(u, 1.0).with_term(x, 2.0).with_term(free, -1.0),
            Sense::Le,
            1.0,
        );

        let text = serde_json::to_string(&model).unwrap();
        let back: MipModel = serde_json::from_str(&text).unwrap();
        assert_eq!(back.name, "json");
        assert_eq!(back.variable(u).upper, f64::INFINITY);
        assert_eq!(back.variable(free).lower, f64::NEG_INFINITY);
        assert_eq!(back.variable(free).upper, 3.0);
        assert_eq!(back.variable(x).cost, 2.5);
        assert_eq!(back.constraints()[0].expr, model.constraints()[0].expr);
        assert_eq!(back.constraints()[0].kind, ConstraintKind::SubtourElimination);
    }
}
