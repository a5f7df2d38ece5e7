use std::fmt;

use super::{EquationEvaluator, Evaluate, NlaSolve, Scope, VariableValues};
use crate::{
    equations::ModelEquations,
    expr::{BinaryOp, Expr, UnaryOp, VariableRef},
};

type Closure = Box<dyn Fn(&Scope<'_>) -> f64 + Send + Sync>;

/// An expression turned into a closure.
pub struct CompiledExpr(Closure);

impl fmt::Debug for CompiledExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompiledExpr")
    }
}

impl Evaluate for CompiledExpr {
    fn evaluate(&self, scope: &Scope<'_>) -> f64 {
        (self.0)(scope)
    }
}

fn lookup(values: &[f64], index: usize) -> f64 {
    values.get(index).copied().unwrap_or(f64::NAN)
}

fn compile_variable(variable: VariableRef) -> Closure {
    match variable {
        VariableRef::Voi => Box::new(|scope: &Scope<'_>| scope.voi),
        VariableRef::State(index) => Box::new(move |scope: &Scope<'_>| lookup(scope.states, index)),
        VariableRef::Constant(index) => Box::new(move |scope: &Scope<'_>| lookup(&scope.variables.constants, index)),
        VariableRef::ComputedConstant(index) => {
            Box::new(move |scope: &Scope<'_>| lookup(&scope.variables.computed_constants, index))
        }
        VariableRef::Algebraic(index) => Box::new(move |scope: &Scope<'_>| lookup(&scope.variables.algebraic, index)),
    }
}

fn compile(expr: &Expr) -> Closure {
    match expr {
        Expr::Number(value) => {
            let value = *value;
            Box::new(move |_: &Scope<'_>| value)
        }
        Expr::Variable(variable) => compile_variable(*variable),
        Expr::Unary { op, operand } => {
            let operand = compile(operand);

            match op {
                UnaryOp::Negate => Box::new(move |scope: &Scope<'_>| -operand(scope)),
                UnaryOp::Not => {
                    let op = *op;
                    Box::new(move |scope: &Scope<'_>| op.apply(operand(scope)))
                }
            }
        }
        Expr::Binary { op, left, right } => {
            let left = compile(left);
            let right = compile(right);

            // the arithmetic operators are the bulk of every model
            match op {
                BinaryOp::Add => Box::new(move |scope: &Scope<'_>| left(scope) + right(scope)),
                BinaryOp::Subtract => Box::new(move |scope: &Scope<'_>| left(scope) - right(scope)),
                BinaryOp::Multiply => Box::new(move |scope: &Scope<'_>| left(scope) * right(scope)),
                BinaryOp::Divide => Box::new(move |scope: &Scope<'_>| left(scope) / right(scope)),
                BinaryOp::Power
                | BinaryOp::Remainder
                | BinaryOp::Min
                | BinaryOp::Max
                | BinaryOp::And
                | BinaryOp::Or
                | BinaryOp::Xor
                | BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::LessThan
                | BinaryOp::LessThanOrEqual
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterThanOrEqual => {
                    let op = *op;
                    Box::new(move |scope: &Scope<'_>| op.apply(left(scope), right(scope)))
                }
            }
        }
        Expr::Call { function, argument } => {
            let function = *function;
            let argument = compile(argument);

            Box::new(move |scope: &Scope<'_>| function.apply(argument(scope)))
        }
        Expr::Piecewise { pieces, otherwise } => {
            let pieces: Vec<(Closure, Closure)> = pieces
                .iter()
                .map(|(value, condition)| (compile(value), compile(condition)))
                .collect();
            let otherwise = otherwise.as_deref().map(compile);

            Box::new(move |scope: &Scope<'_>| {
                pieces
                    .iter()
                    .find(|(_, condition)| condition(scope) != 0.0)
                    .map(|(value, _)| value(scope))
                    .or_else(|| otherwise.as_ref().map(|otherwise| otherwise(scope)))
                    .unwrap_or(f64::NAN)
            })
        }
    }
}

/// Evaluates model equations through closures built once from their
/// expression trees.
#[derive(Debug)]
pub struct CompiledModel {
    equations: ModelEquations<CompiledExpr>,
}

impl CompiledModel {
    /// Compiles the given equations
    #[must_use]
    pub fn new(equations: &ModelEquations) -> Self {
        let equations = equations.map(&|expr| CompiledExpr(compile(expr)));

        tracing::trace!(
            rates = equations.rates.len(),
            nla_systems = equations.nla_system_count,
            "compiled model equations"
        );

        Self { equations }
    }
}

impl EquationEvaluator for CompiledModel {
    fn initialise_variables(&self, voi: f64, states: &mut [f64], variables: &mut VariableValues) {
        super::initialise_variables(&self.equations, voi, states, variables);
    }

    fn compute_computed_constants(&self, variables: &mut VariableValues, nla: &mut dyn NlaSolve) {
        super::run_steps(&self.equations.computed_constant_steps, 0.0, &[], variables, nla);
    }

    fn compute_rates(
        &self,
        voi: f64,
        states: &[f64],
        rates: &mut [f64],
        variables: &mut VariableValues,
        nla: &mut dyn NlaSolve,
    ) {
        super::compute_rates(&self.equations, voi, states, rates, variables, nla);
    }

    fn compute_variables(&self, voi: f64, states: &[f64], variables: &mut VariableValues, nla: &mut dyn NlaSolve) {
        super::run_steps(&self.equations.algebraic_steps, voi, states, variables, nla);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Function;

    fn scope_value(expr: &Expr, voi: f64) -> (f64, f64) {
        let variables = VariableValues {
            constants: vec![3.0],
            computed_constants: vec![],
            algebraic: vec![],
        };
        let scope = Scope {
            voi,
            states: &[0.5],
            variables: &variables,
        };

        (expr.evaluate(&scope), CompiledExpr(compile(expr)).evaluate(&scope))
    }

    #[test]
    fn closures_match_the_expression_trees() {
        let k = Expr::Variable(VariableRef::Constant(0));
        let x = Expr::Variable(VariableRef::State(0));
        let t = Expr::Variable(VariableRef::Voi);
        let expr = Expr::Piecewise {
            pieces: vec![(
                Expr::call(Function::Exp, Expr::binary(BinaryOp::Multiply, k.clone(), x.clone())),
                Expr::binary(BinaryOp::LessThan, t.clone(), Expr::Number(1.0)),
            )],
            otherwise: Some(Box::new(Expr::binary(
                BinaryOp::Power,
                Expr::unary(UnaryOp::Negate, x),
                Expr::binary(BinaryOp::Max, k, t),
            ))),
        };

        for voi in [0.0, 2.0, 4.0] {
            let (interpreted, compiled) = scope_value(&expr, voi);

            assert_eq!(interpreted.to_bits(), compiled.to_bits());
        }
    }

    #[test]
    fn missing_pieces_are_nan() {
        let expr = Expr::Piecewise {
            pieces: vec![(Expr::Number(1.0), Expr::Number(0.0))],
            otherwise: None,
        };
        let (interpreted, compiled) = scope_value(&expr, 0.0);

        assert!(interpreted.is_nan() && compiled.is_nan());
    }
}
