use opencor_file::SEDML_NAMESPACE_PREFIX;
use opencor_shared::{
    issue::Logger,
    number::{format_double, parse_double, parse_integer},
};
use opencor_solver::{Solver, SolverType};
use opencor_xml::Element;

use super::{LIBOPENCOR_NAMESPACE, ParsedModel, ParsedSedml, ParsedSimulation, ParsedTask};
use crate::{SedChange, SimulationKind};

/// Reads a SED-ML document.
///
/// Problems are recorded in the logger of the result: a document that cannot
/// be read at all yields an error and nothing else, while unsupported or
/// invalid parts are skipped with a warning or an error.
#[must_use]
pub fn parse(text: &str) -> ParsedSedml {
    let mut parsed = ParsedSedml::default();

    let root = match opencor_xml::parse_document(text) {
        Ok(root) => root,
        Err(error) => {
            parsed
                .logger
                .add_error(format!("The SED-ML document could not be parsed ({error})."));
            return parsed;
        }
    };

    let is_sedml = root.local_name() == "sedML"
        && root
            .namespace()
            .is_some_and(|namespace| namespace.starts_with(SEDML_NAMESPACE_PREFIX));

    if !is_sedml {
        parsed.logger.add_error("The document is not a SED-ML document.");
        return parsed;
    }

    let logger = &mut parsed.logger;

    for element in list(&root, "listOfModels") {
        match element.local_name() {
            "model" => parsed.models.extend(parse_model(element, logger)),
            other => logger.add_warning(format!("The model element '{other}' is not supported.")),
        }
    }

    for element in list(&root, "listOfSimulations") {
        parsed.simulations.extend(parse_simulation(element, logger));
    }

    for element in list(&root, "listOfTasks") {
        match element.local_name() {
            "task" => parsed.tasks.push(ParsedTask {
                id: element.attribute("id").map(str::to_string),
                model_reference: element.attribute("modelReference").map(str::to_string),
                simulation_reference: element.attribute("simulationReference").map(str::to_string),
            }),
            other => logger.add_warning(format!("The task '{other}' is not supported. Only tasks are currently supported.")),
        }
    }

    tracing::debug!(
        models = parsed.models.len(),
        simulations = parsed.simulations.len(),
        tasks = parsed.tasks.len(),
        "SED-ML document parsed"
    );

    parsed
}

/// Returns the children of the `name` list of `element`.
fn list<'a>(element: &'a Element, name: &'a str) -> impl Iterator<Item = &'a Element> {
    element.child(name).into_iter().flat_map(Element::children)
}

fn parse_model(element: &Element, logger: &mut Logger) -> Option<ParsedModel> {
    let id = element.attribute("id").map(str::to_string);

    let Some(source) = element.attribute("source") else {
        logger.add_error(format!(
            "The model '{}' does not have a source.",
            id.as_deref().unwrap_or_default()
        ));
        return None;
    };

    let mut changes = Vec::new();

    for change in list(element, "listOfChanges") {
        if change.local_name() != "changeAttribute" {
            logger.add_warning("Only changeAttribute changes are currently supported.");
            continue;
        }

        let target = change.attribute("target").unwrap_or_default();
        let new_value = change.attribute("newValue").unwrap_or_default();

        let Some((component, variable)) = SedChange::parse_target(target) else {
            logger.add_error(format!("The target '{target}' is not a valid CellML variable target."));
            continue;
        };

        let Some(new_value) = parse_double(new_value) else {
            logger.add_error(format!("The new value '{new_value}' is not a valid double value."));
            continue;
        };

        changes.push(SedChange::attribute(component, variable, new_value));
    }

    Some(ParsedModel {
        id,
        source: source.to_string(),
        changes,
    })
}

fn parse_simulation(element: &Element, logger: &mut Logger) -> Option<ParsedSimulation> {
    let id = element.attribute("id").map(str::to_string);
    let name = id.as_deref().unwrap_or_default();

    let kind = match element.local_name() {
        "uniformTimeCourse" => SimulationKind::UniformTimeCourse {
            initial_time: double_attribute(element, "initialTime", 0.0, name, logger),
            output_start_time: double_attribute(element, "outputStartTime", 0.0, name, logger),
            output_end_time: double_attribute(
                element,
                "outputEndTime",
                SimulationKind::DEFAULT_OUTPUT_END_TIME,
                name,
                logger,
            ),
            number_of_steps: steps_attribute(element, SimulationKind::DEFAULT_NUMBER_OF_STEPS, name, logger),
        },
        "oneStep" => SimulationKind::OneStep {
            step: double_attribute(element, "step", SimulationKind::DEFAULT_STEP, name, logger),
        },
        "steadyState" => SimulationKind::SteadyState,
        "analysis" => SimulationKind::Analysis,
        other => {
            logger.add_warning(format!("The simulation '{other}' is not supported."));
            return None;
        }
    };

    let mut simulation = ParsedSimulation {
        id,
        kind,
        ode_solver: None,
        nla_solver: None,
    };

    let differential = matches!(kind, SimulationKind::OneStep { .. } | SimulationKind::UniformTimeCourse { .. });
    let algorithm_fallback = if differential { Solver::cvode } else { Solver::kinsol };

    let algorithms = element
        .child("algorithm")
        .map(|algorithm| (algorithm, algorithm_fallback as fn() -> Solver))
        .into_iter()
        .chain(
            element
                .children_named("nlaAlgorithm")
                .filter(|algorithm| algorithm.namespace() == Some(LIBOPENCOR_NAMESPACE))
                .map(|algorithm| (algorithm, Solver::kinsol as fn() -> Solver)),
        );

    for (algorithm, fallback) in algorithms {
        let solver = parse_algorithm(algorithm, fallback, logger);

        match solver.solver_type() {
            SolverType::Ode => simulation.ode_solver = Some(solver),
            SolverType::Nla => simulation.nla_solver = Some(solver),
        }
    }

    Some(simulation)
}

/// Creates the solver of an algorithm element and applies its parameters.
fn parse_algorithm(element: &Element, fallback: fn() -> Solver, logger: &mut Logger) -> Solver {
    let kisao_id = element.attribute("kisaoID").unwrap_or_default();

    let mut solver = Solver::from_kisao_id(kisao_id).unwrap_or_else(|| {
        let solver = fallback();

        logger.add_warning(format!(
            "The solver '{kisao_id}' is not recognised. The {} solver will be used instead.",
            solver.name()
        ));

        solver
    });

    let parameters: Vec<(&str, &str)> = list(element, "listOfAlgorithmParameters")
        .filter(|parameter| parameter.local_name() == "algorithmParameter")
        .map(|parameter| {
            (
                parameter.attribute("kisaoID").unwrap_or_default(),
                parameter.attribute("value").unwrap_or_default(),
            )
        })
        .collect();

    solver.populate(parameters, logger);

    solver
}

fn double_attribute(element: &Element, name: &str, default: f64, simulation: &str, logger: &mut Logger) -> f64 {
    let Some(text) = element.attribute(name) else {
        return default;
    };

    parse_double(text).unwrap_or_else(|| {
        logger.add_warning(format!(
            "The {name} '{text}' of simulation '{simulation}' is not a valid double value. A value of {} will be used instead.",
            format_double(default)
        ));
        default
    })
}

fn steps_attribute(element: &Element, default: u32, simulation: &str, logger: &mut Logger) -> u32 {
    let Some(text) = element.attribute("numberOfSteps") else {
        return default;
    };

    parse_integer(text)
        .and_then(|steps| u32::try_from(steps).ok())
        .filter(|steps| *steps > 0)
        .unwrap_or_else(|| {
            logger.add_warning(format!(
                "The numberOfSteps '{text}' of simulation '{simulation}' is not a valid number of steps. A value of {default} will be used instead."
            ));
            default
        })
}

#[cfg(test)]
mod tests {
    use opencor_shared::issue::HasIssues;

    use super::*;
    use crate::test::sedml_document;

    #[test]
    fn unreadable_documents() {
        let parsed = parse("<sedML");

        assert!(parsed.has_errors());
        assert!(parsed.models.is_empty());

        let parsed = parse(r#"<model xmlns="http://www.cellml.org/cellml/2.0#"/>"#);

        assert_eq!(
            parsed.logger.error(0).map(|issue| issue.description()),
            Some("The document is not a SED-ML document.")
        );
    }

    #[test]
    fn models_simulations_and_tasks() {
        let parsed = parse(&sedml_document(
            r#"<listOfModels>
                 <model id="model1" language="urn:sedml:language:cellml" source="decay.cellml">
                   <listOfChanges>
                     <changeAttribute target="/cellml:model/cellml:component[@name='main']/cellml:variable[@name='k']" newValue="0.25"/>
                   </listOfChanges>
                 </model>
               </listOfModels>
               <listOfSimulations>
                 <uniformTimeCourse id="simulation1" initialTime="0" outputStartTime="1" outputEndTime="10" numberOfSteps="90">
                   <algorithm kisaoID="KISAO:0000030">
                     <listOfAlgorithmParameters>
                       <algorithmParameter kisaoID="KISAO:0000483" value="0.01"/>
                     </listOfAlgorithmParameters>
                   </algorithm>
                 </uniformTimeCourse>
                 <oneStep id="simulation2" step="2.5"/>
               </listOfSimulations>
               <listOfTasks>
                 <task id="task1" modelReference="model1" simulationReference="simulation1"/>
               </listOfTasks>"#,
        ));

        assert!(!parsed.has_issues(), "{}", parsed.logger.issues()[0]);

        assert_eq!(parsed.models.len(), 1);
        assert_eq!(parsed.models[0].source, "decay.cellml");
        assert_eq!(parsed.models[0].changes, [SedChange::attribute("main", "k", 0.25)]);

        assert_eq!(
            parsed.simulations[0].kind,
            SimulationKind::UniformTimeCourse {
                initial_time: 0.0,
                output_start_time: 1.0,
                output_end_time: 10.0,
                number_of_steps: 90,
            }
        );
        let solver = parsed.simulations[0].ode_solver.as_ref();
        assert_eq!(solver.map(Solver::name), Some("Forward Euler"));
        assert_eq!(solver.and_then(|solver| solver.property("Step")), Some("0.01".to_string()));
        assert_eq!(parsed.simulations[1].kind, SimulationKind::OneStep { step: 2.5 });
        assert!(parsed.simulations[1].ode_solver.is_none());

        assert_eq!(
            parsed.tasks,
            [ParsedTask {
                id: Some("task1".to_string()),
                model_reference: Some("model1".to_string()),
                simulation_reference: Some("simulation1".to_string()),
            }]
        );
    }

    #[test]
    fn invalid_changes() {
        let parsed = parse(&sedml_document(
            r#"<listOfModels>
                 <model id="model1" source="decay.cellml">
                   <listOfChanges>
                     <changeAttribute target="/cellml:model" newValue="1"/>
                     <changeAttribute target="/cellml:model/cellml:component[@name='main']/cellml:variable[@name='k']" newValue="abc"/>
                     <addXML target="/cellml:model"/>
                   </listOfChanges>
                 </model>
               </listOfModels>"#,
        ));

        let descriptions: Vec<_> = parsed.logger.issues().iter().map(|issue| issue.description()).collect();

        assert_eq!(
            descriptions,
            [
                "The target '/cellml:model' is not a valid CellML variable target.",
                "The new value 'abc' is not a valid double value.",
                "Only changeAttribute changes are currently supported.",
            ]
        );
        assert!(parsed.models[0].changes.is_empty());
    }

    #[test]
    fn algorithms() {
        let parsed = parse(&sedml_document(
            r#"<listOfSimulations>
                 <uniformTimeCourse id="simulation1" initialTime="0" outputStartTime="0" outputEndTime="1" numberOfSteps="10">
                   <algorithm kisaoID="KISAO:1234567"/>
                   <nlaAlgorithm xmlns="https://opencor.ws/libopencor" kisaoID="KISAO:0000282">
                     <listOfAlgorithmParameters>
                       <algorithmParameter kisaoID="KISAO:0000486" value="25"/>
                       <algorithmParameter kisaoID="KISAO:7654321" value="1"/>
                     </listOfAlgorithmParameters>
                   </nlaAlgorithm>
                 </uniformTimeCourse>
                 <steadyState id="simulation2">
                   <algorithm kisaoID="KISAO:0000282"/>
                 </steadyState>
               </listOfSimulations>"#,
        ));

        let descriptions: Vec<_> = parsed.logger.issues().iter().map(|issue| issue.description()).collect();

        assert_eq!(
            descriptions,
            [
                "The solver 'KISAO:1234567' is not recognised. The CVODE solver will be used instead.",
                "The parameter 'KISAO:7654321' is not recognised. It will be ignored.",
            ]
        );

        let simulation = &parsed.simulations[0];
        assert_eq!(simulation.ode_solver.as_ref().map(Solver::name), Some("CVODE"));
        assert_eq!(
            simulation
                .nla_solver
                .as_ref()
                .and_then(|solver| solver.property("Maximum number of iterations")),
            Some("25".to_string())
        );
        assert_eq!(parsed.simulations[1].nla_solver.as_ref().map(Solver::name), Some("KINSOL"));
    }

    #[test]
    fn invalid_simulation_attributes() {
        let parsed = parse(&sedml_document(
            r#"<listOfSimulations>
                 <uniformTimeCourse id="simulation1" initialTime="zero" outputStartTime="0" outputEndTime="5" numberOfSteps="-3"/>
               </listOfSimulations>"#,
        ));

        assert_eq!(parsed.logger.warnings().len(), 2);
        assert_eq!(
            parsed.simulations[0].kind,
            SimulationKind::UniformTimeCourse {
                initial_time: 0.0,
                output_start_time: 0.0,
                output_end_time: 5.0,
                number_of_steps: 1000,
            }
        );
    }
}
