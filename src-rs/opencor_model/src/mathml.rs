//! MathML content markup reader

use opencor_shared::number::parse_double;
use opencor_xml::{Element, Node};

use crate::expr::{BinaryOp, Expr, Function, UnaryOp};

/// The MathML namespace
pub const MATHML_NAMESPACE: &str = "http://www.w3.org/1998/Math/MathML";

/// A variable as it appears in MathML, identified by its index in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term {
    /// A plain variable
    Variable(usize),
    /// The derivative of `variable` with respect to `voi`
    Derivative {
        /// The differentiated variable
        variable: usize,
        /// The variable of integration
        voi: usize,
    },
}

/// A top-level `eq` of a `math` element.
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    /// The left-hand side
    pub left: Expr<Term>,
    /// The right-hand side
    pub right: Expr<Term>,
}

/// Reads every equation of a `math` element.
///
/// `resolve` maps a `ci` name onto the index of a variable.
pub fn read_math(math: &Element, resolve: &dyn Fn(&str) -> Option<usize>) -> Result<Vec<Equation>, String> {
    let reader = Reader { resolve };

    math.children().map(|child| reader.equation(child)).collect()
}

struct Reader<'a> {
    resolve: &'a dyn Fn(&str) -> Option<usize>,
}

fn unsupported(element: &Element) -> String {
    format!("The MathML element '{}' is not supported.", element.local_name())
}

/// The operands of an `apply`, that is every child but the operator and the
/// qualifiers.
fn operands(apply: &Element) -> impl Iterator<Item = &Element> {
    apply
        .children()
        .skip(1)
        .filter(|child| !matches!(child.local_name(), "bvar" | "degree" | "logbase"))
}

impl Reader<'_> {
    fn equation(&self, element: &Element) -> Result<Equation, String> {
        let is_equation = element.local_name() == "apply"
            && element.children().next().is_some_and(|operator| operator.local_name() == "eq");

        if !is_equation {
            return Err("Only equations (an 'apply' element with an 'eq' operator) are supported at the top level of a 'math' element.".to_string());
        }

        let mut sides = operands(element).map(|operand| self.expression(operand));

        match (sides.next(), sides.next(), sides.next()) {
            (Some(left), Some(right), None) => Ok(Equation {
                left: left?,
                right: right?,
            }),
            (_, _, _) => Err("An equation must have exactly two sides.".to_string()),
        }
    }

    fn expression(&self, element: &Element) -> Result<Expr<Term>, String> {
        match element.local_name() {
            "apply" => self.apply(element),
            "ci" => self.variable(element).map(|variable| Expr::Variable(Term::Variable(variable))),
            "cn" => number(element).map(Expr::Number),
            "piecewise" => self.piecewise(element),
            "pi" => Ok(Expr::Number(std::f64::consts::PI)),
            "exponentiale" => Ok(Expr::Number(std::f64::consts::E)),
            "true" => Ok(Expr::Number(1.0)),
            "false" => Ok(Expr::Number(0.0)),
            "infinity" => Ok(Expr::Number(f64::INFINITY)),
            "notanumber" => Ok(Expr::Number(f64::NAN)),
            _ => Err(unsupported(element)),
        }
    }

    fn variable(&self, ci: &Element) -> Result<usize, String> {
        let name = ci.text();

        (self.resolve)(&name).ok_or_else(|| format!("The variable '{name}' is not defined."))
    }

    fn piecewise(&self, element: &Element) -> Result<Expr<Term>, String> {
        let mut pieces = Vec::new();
        let mut otherwise = None;

        for child in element.children() {
            match child.local_name() {
                "piece" => {
                    let mut parts = child.children();

                    let (Some(value), Some(condition), None) = (parts.next(), parts.next(), parts.next()) else {
                        return Err("A 'piece' element must have a value and a condition.".to_string());
                    };

                    pieces.push((self.expression(value)?, self.expression(condition)?));
                }
                "otherwise" => {
                    let value = child
                        .children()
                        .next()
                        .ok_or_else(|| "An 'otherwise' element must have a value.".to_string())?;

                    otherwise = Some(Box::new(self.expression(value)?));
                }
                _ => return Err(unsupported(child)),
            }
        }

        Ok(Expr::Piecewise { pieces, otherwise })
    }

    fn apply(&self, apply: &Element) -> Result<Expr<Term>, String> {
        let operator = apply
            .children()
            .next()
            .ok_or_else(|| "An 'apply' element must have an operator.".to_string())?;

        if operator.local_name() == "diff" {
            return self.derivative(apply);
        }

        let arguments = operands(apply)
            .map(|operand| self.expression(operand))
            .collect::<Result<Vec<_>, _>>()?;
        let name = operator.local_name();
        let count = arguments.len();
        let wrong_count = || format!("The '{name}' operator cannot be applied to {count} operand(s).");

        match name {
            "plus" if count == 1 => arguments.into_iter().next().ok_or_else(wrong_count),
            "minus" if count == 1 => {
                let operand = arguments.into_iter().next().ok_or_else(wrong_count)?;

                Ok(Expr::unary(UnaryOp::Negate, operand))
            }
            "not" => single(arguments).map(|operand| Expr::unary(UnaryOp::Not, operand)).ok_or_else(wrong_count),
            "plus" => fold(BinaryOp::Add, arguments).ok_or_else(wrong_count),
            "times" => fold(BinaryOp::Multiply, arguments).ok_or_else(wrong_count),
            "min" => fold(BinaryOp::Min, arguments).ok_or_else(wrong_count),
            "max" => fold(BinaryOp::Max, arguments).ok_or_else(wrong_count),
            "and" => fold(BinaryOp::And, arguments).ok_or_else(wrong_count),
            "or" => fold(BinaryOp::Or, arguments).ok_or_else(wrong_count),
            "xor" => fold(BinaryOp::Xor, arguments).ok_or_else(wrong_count),
            "minus" => pair(BinaryOp::Subtract, arguments).ok_or_else(wrong_count),
            "divide" => pair(BinaryOp::Divide, arguments).ok_or_else(wrong_count),
            "power" => pair(BinaryOp::Power, arguments).ok_or_else(wrong_count),
            "rem" => pair(BinaryOp::Remainder, arguments).ok_or_else(wrong_count),
            "eq" => pair(BinaryOp::Equal, arguments).ok_or_else(wrong_count),
            "neq" => pair(BinaryOp::NotEqual, arguments).ok_or_else(wrong_count),
            "lt" => pair(BinaryOp::LessThan, arguments).ok_or_else(wrong_count),
            "leq" => pair(BinaryOp::LessThanOrEqual, arguments).ok_or_else(wrong_count),
            "gt" => pair(BinaryOp::GreaterThan, arguments).ok_or_else(wrong_count),
            "geq" => pair(BinaryOp::GreaterThanOrEqual, arguments).ok_or_else(wrong_count),
            "root" => {
                let operand = single(arguments).ok_or_else(wrong_count)?;
                let degree = self.qualifier(apply, "degree")?.unwrap_or(Expr::Number(2.0));

                Ok(Expr::binary(
                    BinaryOp::Power,
                    operand,
                    Expr::binary(BinaryOp::Divide, Expr::Number(1.0), degree),
                ))
            }
            "log" => {
                let operand = single(arguments).ok_or_else(wrong_count)?;

                match self.qualifier(apply, "logbase")? {
                    Some(base) => Ok(Expr::binary(
                        BinaryOp::Divide,
                        Expr::call(Function::Ln, operand),
                        Expr::call(Function::Ln, base),
                    )),
                    None => Ok(Expr::call(Function::Log10, operand)),
                }
            }
            _ => {
                let function = Function::from_mathml(name).ok_or_else(|| unsupported(operator))?;

                single(arguments)
                    .map(|operand| Expr::call(function, operand))
                    .ok_or_else(wrong_count)
            }
        }
    }

    /// Reads the value of a `degree` or `logbase` qualifier
    fn qualifier(&self, apply: &Element, name: &str) -> Result<Option<Expr<Term>>, String> {
        apply
            .child(name)
            .map(|qualifier| {
                let value = qualifier
                    .children()
                    .next()
                    .ok_or_else(|| format!("A '{name}' element must have a value."))?;

                self.expression(value)
            })
            .transpose()
    }

    fn derivative(&self, apply: &Element) -> Result<Expr<Term>, String> {
        let voi = apply
            .child("bvar")
            .and_then(|bvar| bvar.child("ci"))
            .ok_or_else(|| "A derivative must have a 'bvar' element with a variable.".to_string())?;

        if let Some(degree) = apply.child("bvar").and_then(|bvar| bvar.child("degree")) {
            let order = degree.child("cn").map(number).transpose()?;

            if order.is_none_or(|order| (order - 1.0).abs() > f64::EPSILON) {
                return Err("Only first-order derivatives are supported.".to_string());
            }
        }

        let mut operands = operands(apply);

        let (Some(variable), None) = (operands.next(), operands.next()) else {
            return Err("A derivative must apply to exactly one variable.".to_string());
        };

        if variable.local_name() != "ci" {
            return Err("Only derivatives of variables are supported.".to_string());
        }

        Ok(Expr::Variable(Term::Derivative {
            variable: self.variable(variable)?,
            voi: self.variable(voi)?,
        }))
    }
}

fn single(arguments: Vec<Expr<Term>>) -> Option<Expr<Term>> {
    let mut arguments = arguments.into_iter();

    match (arguments.next(), arguments.next()) {
        (Some(argument), None) => Some(argument),
        (_, _) => None,
    }
}

fn pair(op: BinaryOp, arguments: Vec<Expr<Term>>) -> Option<Expr<Term>> {
    let mut arguments = arguments.into_iter();

    match (arguments.next(), arguments.next(), arguments.next()) {
        (Some(left), Some(right), None) => Some(Expr::binary(op, left, right)),
        (_, _, _) => None,
    }
}

/// Folds n-ary operators from the left, which requires at least two operands.
fn fold(op: BinaryOp, arguments: Vec<Expr<Term>>) -> Option<Expr<Term>> {
    if arguments.len() < 2 {
        return None;
    }

    arguments.into_iter().reduce(|left, right| Expr::binary(op, left, right))
}

/// Reads a `cn` element, in plain or `e-notation` form.
fn number(cn: &Element) -> Result<f64, String> {
    let invalid = || format!("'{}' is not a valid number.", cn.text());

    if cn.attribute("type") == Some("e-notation") {
        fn text(nodes: &[Node]) -> String {
            nodes
                .iter()
                .filter_map(|node| match node {
                    Node::Text(text) => Some(text.trim()),
                    Node::Element(_) => None,
                })
                .collect()
        }

        let mut parts = cn
            .nodes()
            .split(|node| matches!(node, Node::Element(element) if element.local_name() == "sep"));
        let mantissa = parts.next().map(text).ok_or_else(invalid)?;
        let exponent = parts.next().map(text).ok_or_else(invalid)?;

        return parse_double(&format!("{mantissa}e{exponent}")).ok_or_else(invalid);
    }

    parse_double(&cn.text()).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(body: &str) -> Result<Vec<Equation>, String> {
        let document = format!(r#"<math xmlns="{MATHML_NAMESPACE}" xmlns:cellml="http://www.cellml.org/cellml/2.0#">{body}</math>"#);
        let math = opencor_xml::parse_document(&document).expect("test markup is well formed");
        let resolve = |name: &str| ["t", "x", "y"].iter().position(|candidate| *candidate == name);

        read_math(&math, &resolve)
    }

    #[test]
    fn reads_an_ode() {
        let equations = read(
            "<apply><eq/><apply><diff/><bvar><ci>t</ci></bvar><ci>x</ci></apply>\
             <apply><times/><cn cellml:units=\"dimensionless\">-2</cn><ci>x</ci></apply></apply>",
        )
        .expect("equation is supported");

        assert_eq!(
            equations,
            [Equation {
                left: Expr::Variable(Term::Derivative { variable: 1, voi: 0 }),
                right: Expr::binary(BinaryOp::Multiply, Expr::Number(-2.0), Expr::Variable(Term::Variable(1))),
            }]
        );
    }

    #[test]
    fn reads_n_ary_operators_and_qualifiers() {
        let equations = read(
            "<apply><eq/><ci>y</ci><apply><plus/><ci>x</ci><cn>1</cn><apply><root/><degree><cn>3</cn></degree><ci>x</ci></apply></apply></apply>\
             <apply><eq/><ci>x</ci><apply><log/><logbase><cn>2</cn></logbase><cn type=\"e-notation\">1<sep/>3</cn></apply></apply>",
        )
        .expect("equations are supported");

        let Expr::Binary { op, left, .. } = &equations[0].right else {
            panic!("a sum is expected");
        };

        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(**left, Expr::Binary { op: BinaryOp::Add, .. }));
        assert_eq!(
            equations[1].right,
            Expr::binary(
                BinaryOp::Divide,
                Expr::call(Function::Ln, Expr::Number(1000.0)),
                Expr::call(Function::Ln, Expr::Number(2.0)),
            )
        );
    }

    #[test]
    fn reads_piecewise_expressions() {
        let equations = read(
            "<apply><eq/><ci>y</ci><piecewise><piece><cn>1</cn><apply><lt/><ci>t</ci><cn>5</cn></apply></piece>\
             <otherwise><cn>0</cn></otherwise></piecewise></apply>",
        )
        .expect("equation is supported");

        assert!(matches!(&equations[0].right, Expr::Piecewise { pieces, otherwise: Some(_) } if pieces.len() == 1));
    }

    #[test]
    fn rejects_unknown_content() {
        assert_eq!(
            read("<apply><eq/><ci>z</ci><cn>1</cn></apply>"),
            Err("The variable 'z' is not defined.".to_string())
        );
        assert_eq!(
            read("<apply><eq/><ci>x</ci><apply><gcd/><cn>4</cn><cn>6</cn></apply></apply>"),
            Err("The MathML element 'gcd' is not supported.".to_string())
        );
        assert!(read("<ci>x</ci>").is_err_and(|error| error.starts_with("Only equations")));
        assert!(read("<apply><eq/><ci>x</ci><apply><minus/></apply></apply>").is_err_and(|error| error.contains("0 operand")));
    }
}
