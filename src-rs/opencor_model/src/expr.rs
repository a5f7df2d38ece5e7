//! Equation representation
//!
//! Expressions are generic over their variable type: the MathML reader
//! produces expressions over CellML variables, which the analyser then maps
//! onto [`VariableRef`]s once every variable has been classified.

/// A reference to a slot of one of the arrays a model is evaluated over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableRef {
    /// The variable of integration
    Voi,
    /// A state
    State(usize),
    /// A constant
    Constant(usize),
    /// A computed constant
    ComputedConstant(usize),
    /// An algebraic variable
    Algebraic(usize),
}

/// Operators taking one operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `-x`
    Negate,
    /// Logical negation, with any non-zero value being true
    Not,
}

/// Operators taking two operands.
///
/// Comparisons and logical operators evaluate to `1.0` or `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `a + b`
    Add,
    /// `a - b`
    Subtract,
    /// `a * b`
    Multiply,
    /// `a / b`
    Divide,
    /// `a ^ b`
    Power,
    /// Remainder of the truncated division
    Remainder,
    /// Smaller operand
    Min,
    /// Larger operand
    Max,
    /// `a && b`
    And,
    /// `a || b`
    Or,
    /// Exclusive or
    Xor,
    /// `a == b`
    Equal,
    /// `a != b`
    NotEqual,
    /// `a < b`
    LessThan,
    /// `a <= b`
    LessThanOrEqual,
    /// `a > b`
    GreaterThan,
    /// `a >= b`
    GreaterThanOrEqual,
}

/// Elementary functions of one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[expect(missing_docs, reason = "the variants are the usual MathML functions")]
pub enum Function {
    Abs,
    Exp,
    Ln,
    Log10,
    Floor,
    Ceiling,
    Factorial,
    Sin,
    Cos,
    Tan,
    Sec,
    Csc,
    Cot,
    Sinh,
    Cosh,
    Tanh,
    Sech,
    Csch,
    Coth,
    Asin,
    Acos,
    Atan,
    Asec,
    Acsc,
    Acot,
    Asinh,
    Acosh,
    Atanh,
    Asech,
    Acsch,
    Acoth,
}

impl Function {
    /// Returns the function matching a MathML element name
    #[must_use]
    pub fn from_mathml(name: &str) -> Option<Self> {
        let function = match name {
            "abs" => Self::Abs,
            "exp" => Self::Exp,
            "ln" => Self::Ln,
            "floor" => Self::Floor,
            "ceiling" => Self::Ceiling,
            "factorial" => Self::Factorial,
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "tan" => Self::Tan,
            "sec" => Self::Sec,
            "csc" => Self::Csc,
            "cot" => Self::Cot,
            "sinh" => Self::Sinh,
            "cosh" => Self::Cosh,
            "tanh" => Self::Tanh,
            "sech" => Self::Sech,
            "csch" => Self::Csch,
            "coth" => Self::Coth,
            "arcsin" => Self::Asin,
            "arccos" => Self::Acos,
            "arctan" => Self::Atan,
            "arcsec" => Self::Asec,
            "arccsc" => Self::Acsc,
            "arccot" => Self::Acot,
            "arcsinh" => Self::Asinh,
            "arccosh" => Self::Acosh,
            "arctanh" => Self::Atanh,
            "arcsech" => Self::Asech,
            "arccsch" => Self::Acsch,
            "arccoth" => Self::Acoth,
            _ => return None,
        };

        Some(function)
    }

    /// Applies the function
    #[must_use]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Abs => x.abs(),
            Self::Exp => x.exp(),
            Self::Ln => x.ln(),
            Self::Log10 => x.log10(),
            Self::Floor => x.floor(),
            Self::Ceiling => x.ceil(),
            Self::Factorial => factorial(x),
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Tan => x.tan(),
            Self::Sec => 1.0 / x.cos(),
            Self::Csc => 1.0 / x.sin(),
            Self::Cot => 1.0 / x.tan(),
            Self::Sinh => x.sinh(),
            Self::Cosh => x.cosh(),
            Self::Tanh => x.tanh(),
            Self::Sech => 1.0 / x.cosh(),
            Self::Csch => 1.0 / x.sinh(),
            Self::Coth => 1.0 / x.tanh(),
            Self::Asin => x.asin(),
            Self::Acos => x.acos(),
            Self::Atan => x.atan(),
            Self::Asec => (1.0 / x).acos(),
            Self::Acsc => (1.0 / x).asin(),
            Self::Acot => (1.0 / x).atan(),
            Self::Asinh => x.asinh(),
            Self::Acosh => x.acosh(),
            Self::Atanh => x.atanh(),
            Self::Asech => (1.0 / x).acosh(),
            Self::Acsch => (1.0 / x).asinh(),
            Self::Acoth => (1.0 / x).atanh(),
        }
    }
}

fn factorial(x: f64) -> f64 {
    if x < 0.0 || x.fract() != 0.0 {
        return f64::NAN;
    }

    let mut result = 1.0_f64;
    let mut factor = 2.0_f64;

    while factor <= x && result.is_finite() {
        result *= factor;
        factor += 1.0;
    }

    result
}

const fn truth(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

impl UnaryOp {
    /// Applies the operator
    #[must_use]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Negate => -x,
            Self::Not => truth(x == 0.0),
        }
    }
}

impl BinaryOp {
    /// Applies the operator
    #[must_use]
    #[expect(clippy::float_cmp, reason = "MathML equality is exact")]
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::Multiply => a * b,
            Self::Divide => a / b,
            Self::Power => a.powf(b),
            Self::Remainder => a % b,
            Self::Min => a.min(b),
            Self::Max => a.max(b),
            Self::And => truth(a != 0.0 && b != 0.0),
            Self::Or => truth(a != 0.0 || b != 0.0),
            Self::Xor => truth((a != 0.0) != (b != 0.0)),
            Self::Equal => truth(a == b),
            Self::NotEqual => truth(a != b),
            Self::LessThan => truth(a < b),
            Self::LessThanOrEqual => truth(a <= b),
            Self::GreaterThan => truth(a > b),
            Self::GreaterThanOrEqual => truth(a >= b),
        }
    }
}

/// An expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr<V = VariableRef> {
    /// A numeric literal
    Number(f64),
    /// A variable
    Variable(V),
    /// A unary operation
    Unary {
        /// The operator
        op: UnaryOp,
        /// The operand
        operand: Box<Self>,
    },
    /// A binary operation
    Binary {
        /// The operator
        op: BinaryOp,
        /// The left operand
        left: Box<Self>,
        /// The right operand
        right: Box<Self>,
    },
    /// A function call
    Call {
        /// The function
        function: Function,
        /// The argument
        argument: Box<Self>,
    },
    /// The value of the first piece whose condition holds, or of `otherwise`
    /// (NaN if absent)
    Piecewise {
        /// `(value, condition)` pairs
        pieces: Vec<(Self, Self)>,
        /// The fallback value
        otherwise: Option<Box<Self>>,
    },
}

impl<V> Expr<V> {
    /// Creates a unary operation
    #[must_use]
    pub fn unary(op: UnaryOp, operand: Self) -> Self {
        Self::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Creates a binary operation
    #[must_use]
    pub fn binary(op: BinaryOp, left: Self, right: Self) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Creates a function call
    #[must_use]
    pub fn call(function: Function, argument: Self) -> Self {
        Self::Call {
            function,
            argument: Box::new(argument),
        }
    }

    /// Calls `visit` on every variable of the expression
    pub fn for_each_variable(&self, visit: &mut impl FnMut(&V)) {
        match self {
            Self::Number(_) => {}
            Self::Variable(variable) => visit(variable),
            Self::Unary { operand, .. } => operand.for_each_variable(visit),
            Self::Binary { left, right, .. } => {
                left.for_each_variable(visit);
                right.for_each_variable(visit);
            }
            Self::Call { argument, .. } => argument.for_each_variable(visit),
            Self::Piecewise { pieces, otherwise } => {
                for (value, condition) in pieces {
                    value.for_each_variable(visit);
                    condition.for_each_variable(visit);
                }

                if let Some(otherwise) = otherwise {
                    otherwise.for_each_variable(visit);
                }
            }
        }
    }

    /// Converts the variables of the expression
    #[must_use]
    pub fn map_variables<W>(&self, map: &mut impl FnMut(&V) -> W) -> Expr<W> {
        match self {
            Self::Number(value) => Expr::Number(*value),
            Self::Variable(variable) => Expr::Variable(map(variable)),
            Self::Unary { op, operand } => Expr::unary(*op, operand.map_variables(map)),
            Self::Binary { op, left, right } => {
                Expr::binary(*op, left.map_variables(map), right.map_variables(map))
            }
            Self::Call { function, argument } => Expr::call(*function, argument.map_variables(map)),
            Self::Piecewise { pieces, otherwise } => Expr::Piecewise {
                pieces: pieces
                    .iter()
                    .map(|(value, condition)| (value.map_variables(map), condition.map_variables(map)))
                    .collect(),
                otherwise: otherwise.as_ref().map(|otherwise| Box::new(otherwise.map_variables(map))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators() {
        assert!((BinaryOp::Remainder.apply(7.0, 3.0) - 1.0).abs() < f64::EPSILON);
        assert!((BinaryOp::Xor.apply(1.0, 0.0) - 1.0).abs() < f64::EPSILON);
        assert!(BinaryOp::LessThan.apply(2.0, 1.0).abs() < f64::EPSILON);
        assert!((UnaryOp::Not.apply(0.0) - 1.0).abs() < f64::EPSILON);
        assert!((Function::Factorial.apply(5.0) - 120.0).abs() < f64::EPSILON);
        assert!(Function::Factorial.apply(1.5).is_nan());
        assert!((Function::Asec.apply(2.0) - 0.5_f64.acos()).abs() < f64::EPSILON);
    }

    #[test]
    fn variables_are_visited_and_mapped() {
        let expr = Expr::binary(
            BinaryOp::Add,
            Expr::Variable("a"),
            Expr::Piecewise {
                pieces: vec![(Expr::Variable("b"), Expr::Number(1.0))],
                otherwise: Some(Box::new(Expr::Variable("c"))),
            },
        );
        let mut names = Vec::new();

        expr.for_each_variable(&mut |name| names.push(*name));

        assert_eq!(names, ["a", "b", "c"]);

        let mapped = expr.map_variables(&mut |name| name.len());
        let mut lengths = Vec::new();

        mapped.for_each_variable(&mut |length| lengths.push(*length));

        assert_eq!(lengths, [1, 1, 1]);
    }
}
