//! CellML reader
//!
//! Flattens a CellML 1.0, 1.1 or 2.0 model into a list of variables, the
//! equations of every component and the connections between variables.
//! Imports, units checking and the CellML 1.0 `reaction` element are not
//! supported.

use indexmap::IndexMap;
use opencor_shared::{issue::Logger, number::parse_double};
use opencor_xml::Element;

use crate::mathml::{self, Equation, MATHML_NAMESPACE};

/// The namespaces of the CellML versions that are supported
pub const CELLML_NAMESPACES: [&str; 3] = [
    "http://www.cellml.org/cellml/1.0#",
    "http://www.cellml.org/cellml/1.1#",
    "http://www.cellml.org/cellml/2.0#",
];

/// The initial value of a variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InitialValue {
    /// A literal
    Number(f64),
    /// Another variable of the same component (CellML 2.0)
    Variable(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub component: String,
    pub name: String,
    pub units: String,
    pub initial_value: Option<InitialValue>,
    /// Whether the variable gets its value from another component (CellML
    /// 1.x interfaces)
    pub imported: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentEquation {
    pub component: String,
    /// 1-based position of the equation in its component
    pub position: usize,
    pub equation: Equation,
}

#[derive(Debug, Default)]
pub struct CellmlModel {
    pub variables: Vec<Variable>,
    pub equations: Vec<ComponentEquation>,
    pub connections: Vec<(usize, usize)>,
}

impl CellmlModel {
    pub fn describe(&self, variable: usize) -> String {
        let variable = &self.variables[variable];

        format!("Variable '{}' in component '{}'", variable.name, variable.component)
    }
}

/// Reads a CellML model, recording every problem in `logger`.
///
/// Returns `None` if anything was wrong with the model.
pub fn read_model(root: &Element, logger: &mut Logger) -> Option<CellmlModel> {
    let is_cellml = root.local_name() == "model" && root.namespace().is_some_and(|namespace| CELLML_NAMESPACES.contains(&namespace));

    if !is_cellml {
        logger.add_error("The file is not a CellML file.");
        return None;
    }

    let errors = logger.errors().len();
    let mut model = CellmlModel::default();
    let mut components: IndexMap<String, IndexMap<String, usize>> = IndexMap::new();

    for child in root.children() {
        match child.local_name() {
            "import" => logger.add_error("Imports are not supported."),
            "component" => read_component(child, &mut model, &mut components, logger),
            _ => {}
        }
    }

    for connection in root.children_named("connection") {
        read_connection(connection, &mut model, &components, logger);
    }

    if logger.errors().len() == errors {
        tracing::debug!(
            variables = model.variables.len(),
            equations = model.equations.len(),
            "read CellML model"
        );

        Some(model)
    } else {
        None
    }
}

fn read_component(
    component: &Element,
    model: &mut CellmlModel,
    components: &mut IndexMap<String, IndexMap<String, usize>>,
    logger: &mut Logger,
) {
    let Some(component_name) = component.attribute("name") else {
        logger.add_error("A component does not have a name.");
        return;
    };

    if components.contains_key(component_name) {
        logger.add_error(format!("The component '{component_name}' is defined more than once."));
        return;
    }

    let mut variables = IndexMap::new();
    let mut initial_values = Vec::new();

    for variable in component.children_named("variable") {
        let Some(name) = variable.attribute("name") else {
            logger.add_error(format!("A variable in component '{component_name}' does not have a name."));
            continue;
        };

        if variables.contains_key(name) {
            logger.add_error(format!(
                "The variable '{name}' is defined more than once in component '{component_name}'."
            ));
            continue;
        }

        let index = model.variables.len();
        let imported = [variable.attribute("public_interface"), variable.attribute("private_interface")]
            .contains(&Some("in"));

        variables.insert(name.to_string(), index);
        initial_values.push((index, variable.attribute("initial_value")));
        model.variables.push(Variable {
            component: component_name.to_string(),
            name: name.to_string(),
            units: variable.attribute("units").unwrap_or("dimensionless").to_string(),
            initial_value: None,
            imported,
        });
    }

    for (index, initial_value) in initial_values {
        let Some(initial_value) = initial_value else {
            continue;
        };

        let value = parse_double(initial_value)
            .map(InitialValue::Number)
            .or_else(|| variables.get(initial_value).map(|other| InitialValue::Variable(*other)));

        match value {
            Some(value) => model.variables[index].initial_value = Some(value),
            None => logger.add_error(format!(
                "{} has an invalid initial value '{initial_value}'.",
                model.describe(index)
            )),
        }
    }

    if component.children_named("reaction").next().is_some() {
        logger.add_error(format!("Component '{component_name}' has reactions, which are not supported."));
    }

    let resolve = |name: &str| variables.get(name).copied();
    let mut position = 0;

    for math in component.children_named("math") {
        if math.namespace() != Some(MATHML_NAMESPACE) {
            continue;
        }

        match mathml::read_math(math, &resolve) {
            Ok(equations) => {
                for equation in equations {
                    position += 1;
                    model.equations.push(ComponentEquation {
                        component: component_name.to_string(),
                        position,
                        equation,
                    });
                }
            }
            Err(error) => logger.add_error(format!("In component '{component_name}': {error}")),
        }
    }

    components.insert(component_name.to_string(), variables);
}

fn read_connection(
    connection: &Element,
    model: &mut CellmlModel,
    components: &IndexMap<String, IndexMap<String, usize>>,
    logger: &mut Logger,
) {
    // CellML 1.x names the components in a `map_components` child, CellML
    // 2.0 on the connection itself
    let names = connection.child("map_components").unwrap_or(connection);

    let (Some(first), Some(second)) = (names.attribute("component_1"), names.attribute("component_2")) else {
        logger.add_error("A connection does not name its two components.");
        return;
    };

    let (Some(first_variables), Some(second_variables)) = (components.get(first), components.get(second)) else {
        logger.add_error(format!(
            "The connection between components '{first}' and '{second}' refers to an unknown component."
        ));
        return;
    };

    for map in connection.children_named("map_variables") {
        let variables = (
            map.attribute("variable_1").and_then(|name| first_variables.get(name)),
            map.attribute("variable_2").and_then(|name| second_variables.get(name)),
        );

        match variables {
            (Some(first_variable), Some(second_variable)) => {
                model.connections.push((*first_variable, *second_variable));
            }
            (_, _) => logger.add_error(format!(
                "A variable mapping between components '{first}' and '{second}' refers to an unknown variable."
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mathml::Term;

    fn read(document: &str) -> (Option<CellmlModel>, Logger) {
        let root = opencor_xml::parse_document(document).expect("test markup is well formed");
        let mut logger = Logger::new();
        let model = read_model(&root, &mut logger);

        (model, logger)
    }

    #[test]
    fn reads_cellml_1_connections() {
        let (model, logger) = read(
            r#"<model xmlns="http://www.cellml.org/cellml/1.0#" name="m">
                 <component name="environment">
                   <variable name="time" units="second" public_interface="out"/>
                 </component>
                 <component name="membrane">
                   <variable name="time" units="second" public_interface="in"/>
                   <variable name="V" units="volt" initial_value="-0.08"/>
                   <math xmlns="http://www.w3.org/1998/Math/MathML">
                     <apply><eq/><apply><diff/><bvar><ci>time</ci></bvar><ci>V</ci></apply><cn>1</cn></apply>
                   </math>
                 </component>
                 <connection>
                   <map_components component_1="environment" component_2="membrane"/>
                   <map_variables variable_1="time" variable_2="time"/>
                 </connection>
               </model>"#,
        );
        let model = model.expect("model is supported");

        assert!(logger.issues().is_empty());
        assert_eq!(model.connections, [(0, 1)]);
        assert!(model.variables[1].imported);
        assert_eq!(model.variables[2].initial_value, Some(InitialValue::Number(-0.08)));
        assert_eq!(model.variables[2].units, "volt");
        assert_eq!(
            model.equations[0].equation.left,
            crate::expr::Expr::Variable(Term::Derivative { variable: 2, voi: 1 })
        );
    }

    #[test]
    fn reads_cellml_2_initial_values_referencing_variables() {
        let (model, _) = read(
            r#"<model xmlns="http://www.cellml.org/cellml/2.0#" name="m">
                 <component name="c">
                   <variable name="k" units="dimensionless" initial_value="3"/>
                   <variable name="x" units="dimensionless" initial_value="k"/>
                 </component>
               </model>"#,
        );

        assert_eq!(
            model.expect("model is supported").variables[1].initial_value,
            Some(InitialValue::Variable(0))
        );
    }

    #[test]
    fn reports_problems() {
        let (model, logger) = read(
            r#"<model xmlns="http://www.cellml.org/cellml/2.0#" name="m">
                 <import xmlns:xlink="http://www.w3.org/1999/xlink" xlink:href="other.cellml"/>
                 <component name="c">
                   <variable name="x" units="dimensionless" initial_value="oops"/>
                 </component>
                 <connection component_1="c" component_2="d"/>
               </model>"#,
        );

        assert!(model.is_none());

        let descriptions: Vec<_> = logger.errors().iter().map(|issue| issue.description().to_string()).collect();

        assert_eq!(
            descriptions,
            [
                "Imports are not supported.",
                "Variable 'x' in component 'c' has an invalid initial value 'oops'.",
                "The connection between components 'c' and 'd' refers to an unknown component.",
            ]
        );
    }

    #[test]
    fn rejects_other_documents() {
        let (model, logger) = read(r#"<sedML xmlns="http://sed-ml.org/sed-ml/level1/version4"/>"#);

        assert!(model.is_none());
        assert_eq!(logger.issue_count(), 1);
    }
}
