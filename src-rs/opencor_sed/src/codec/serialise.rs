use opencor_shared::number::format_double;
use opencor_solver::Solver;
use opencor_xml::Element;

use super::{CELLML_LANGUAGE, LIBOPENCOR_NAMESPACE, SEDML_NAMESPACE, model_source};
use crate::{SedChange, SedDocument, SedModel, SedSimulation, SimulationKind};

/// Writes a document as SED-ML Level 1 Version 4.
///
/// Model sources are written relative to `base_path` where possible (see
/// [`model_source`]). Tasks only refer to the models and simulations they
/// still have.
#[must_use]
pub fn serialise(document: &SedDocument, base_path: Option<&str>) -> String {
    let mut root = Element::new("sedML")
        .with_default_namespace(SEDML_NAMESPACE)
        .with_attribute("level", "1")
        .with_attribute("version", "4");

    if document.has_models() {
        let models = document
            .models()
            .map(|(_, model)| model_element(model, base_path))
            .fold(Element::new("listOfModels"), Element::with_child);

        root.add_child(models);
    }

    if document.has_simulations() {
        let simulations = document
            .simulations()
            .map(|(_, simulation)| simulation_element(simulation))
            .fold(Element::new("listOfSimulations"), Element::with_child);

        root.add_child(simulations);
    }

    if document.has_tasks() {
        let mut tasks = Element::new("listOfTasks");

        for (_, task) in document.tasks() {
            let mut element = Element::new("task").with_attribute("id", task.id());

            if let Some(model) = task.model().and_then(|model| document.model(model)) {
                element.set_attribute("modelReference", model.id());
            }

            if let Some(simulation) = task.simulation().and_then(|simulation| document.simulation(simulation)) {
                element.set_attribute("simulationReference", simulation.id());
            }

            tasks.add_child(element);
        }

        root.add_child(tasks);
    }

    root.to_document_string()
}

fn model_element(model: &SedModel, base_path: Option<&str>) -> Element {
    let mut element = Element::new("model")
        .with_attribute("id", model.id())
        .with_attribute("language", CELLML_LANGUAGE)
        .with_attribute("source", model_source(model.file(), base_path));

    if !model.changes().is_empty() {
        let changes = model
            .changes()
            .iter()
            .map(|change| {
                let SedChange::Attribute { new_value, .. } = change;

                Element::new("changeAttribute")
                    .with_attribute("target", change.target())
                    .with_attribute("newValue", format_double(*new_value))
            })
            .fold(Element::new("listOfChanges"), Element::with_child);

        element.add_child(changes);
    }

    element
}

fn simulation_element(simulation: &SedSimulation) -> Element {
    let kind = simulation.kind();
    let mut element = Element::new(kind.element_name()).with_attribute("id", simulation.id());

    match kind {
        SimulationKind::OneStep { step } => element.set_attribute("step", format_double(step)),
        SimulationKind::UniformTimeCourse {
            initial_time,
            output_start_time,
            output_end_time,
            number_of_steps,
        } => {
            element.set_attribute("initialTime", format_double(initial_time));
            element.set_attribute("outputStartTime", format_double(output_start_time));
            element.set_attribute("outputEndTime", format_double(output_end_time));
            element.set_attribute("numberOfSteps", number_of_steps.to_string());
        }
        SimulationKind::SteadyState | SimulationKind::Analysis => {}
    }

    match (simulation.ode_solver(), simulation.nla_solver()) {
        (Some(ode_solver), nla_solver) => {
            element.add_child(algorithm_element(Element::new("algorithm"), ode_solver));

            if let Some(nla_solver) = nla_solver {
                let nla_algorithm = Element::new("nlaAlgorithm").with_default_namespace(LIBOPENCOR_NAMESPACE);

                element.add_child(algorithm_element(nla_algorithm, nla_solver));
            }
        }
        (None, Some(nla_solver)) => element.add_child(algorithm_element(Element::new("algorithm"), nla_solver)),
        (None, None) => {}
    }

    element
}

/// Completes an empty `algorithm` or `nlaAlgorithm` element with the KISAO id
/// and parameters of `solver`.
fn algorithm_element(element: Element, solver: &Solver) -> Element {
    let mut properties = solver.properties();

    properties.sort_keys();

    let mut element = element.with_attribute("kisaoID", solver.id());

    if !properties.is_empty() {
        let parameters = properties
            .iter()
            .map(|(id, value)| {
                Element::new("algorithmParameter")
                    .with_attribute("kisaoID", id.as_str())
                    .with_attribute("value", value.as_str())
            })
            .fold(Element::new("listOfAlgorithmParameters"), Element::with_child);

        element.add_child(parameters);
    }

    element
}

#[cfg(test)]
mod tests {
    use opencor_file::File;
    use opencor_model::ModelClass;
    use opencor_solver::kisao;

    use crate::{
        SedChange, SedDocument, SedSimulation, SimulationKind,
        codec::parse,
        test::{EMPTY_CELLML, TestModelAnalyser, registry},
    };

    #[test]
    fn empty_document() {
        let registry = registry();
        let document = SedDocument::new(None, &registry, &TestModelAnalyser(ModelClass::Ode));

        assert_eq!(
            document.serialise(None),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <sedML xmlns=\"http://sed-ml.org/sed-ml/level1/version4\" level=\"1\" version=\"4\"/>\n"
        );
    }

    #[test]
    fn ode_model() {
        let registry = registry();
        let file = File::new_in_memory(&registry, "https://example.org/models/decay.cellml", EMPTY_CELLML.to_vec());
        let document = SedDocument::new(Some(&file), &registry, &TestModelAnalyser(ModelClass::Ode));
        let serialised = document.serialise(Some("https://example.org/models/"));

        assert!(serialised.contains(
            r#"<model id="model1" language="urn:sedml:language:cellml" source="decay.cellml"/>"#
        ));
        assert!(serialised.contains(
            r#"<uniformTimeCourse id="simulation1" initialTime="0" outputStartTime="0" outputEndTime="1000" numberOfSteps="1000">"#
        ));
        assert!(serialised.contains(r#"<algorithm kisaoID="KISAO:0000019">"#));
        assert!(serialised.contains(r#"<algorithmParameter kisaoID="KISAO:0000209" value="1e-07"/>"#));
        assert!(serialised.contains(r#"<algorithmParameter kisaoID="KISAO:0000415" value="500"/>"#));
        assert!(serialised.contains(r#"<algorithmParameter kisaoID="KISAO:0000475" value="BDF"/>"#));
        assert!(serialised.contains(r#"<algorithmParameter kisaoID="KISAO:0000481" value="true"/>"#));
        assert!(serialised.contains(r#"<task id="task1" modelReference="model1" simulationReference="simulation1"/>"#));
        assert!(!serialised.contains("nlaAlgorithm"));

        let tolerance = serialised.find("KISAO:0000209").unwrap_or_default();
        let steps = serialised.find("KISAO:0000415").unwrap_or_default();

        assert!(tolerance < steps, "parameters are sorted by KISAO id");
    }

    #[test]
    fn dae_and_nla_models() {
        let registry = registry();
        let file = File::new_in_memory(&registry, "https://example.org/dae.cellml", EMPTY_CELLML.to_vec());

        let dae = SedDocument::new(Some(&file), &registry, &TestModelAnalyser(ModelClass::Dae)).serialise(None);

        assert!(dae.contains(r#"<algorithm kisaoID="KISAO:0000019">"#));
        assert!(dae.contains(r#"<nlaAlgorithm xmlns="https://opencor.ws/libopencor" kisaoID="KISAO:0000282">"#));

        let nla = SedDocument::new(Some(&file), &registry, &TestModelAnalyser(ModelClass::Nla)).serialise(None);

        assert!(nla.contains(r#"<steadyState id="simulation1">"#));
        assert!(nla.contains(r#"<algorithm kisaoID="KISAO:0000282">"#));
        assert!(nla.contains(r#"<algorithmParameter kisaoID="KISAO:0000486" value="200"/>"#));

        let algebraic =
            SedDocument::new(Some(&file), &registry, &TestModelAnalyser(ModelClass::Algebraic)).serialise(None);

        assert!(algebraic.contains(r#"<steadyState id="simulation1"/>"#));
    }

    #[test]
    fn round_trip() {
        let registry = registry();
        let file = File::new_in_memory(&registry, "https://example.org/models/decay.cellml", EMPTY_CELLML.to_vec());
        let analyser = TestModelAnalyser(ModelClass::Ode);
        let mut document = SedDocument::new(Some(&file), &registry, &analyser);

        let model = document.model_at(0).map(|(id, _)| id);

        if let Some(model) = model.and_then(|model| document.model_mut(model)) {
            model.add_change(SedChange::attribute("main", "k", 0.25));
        }

        let mut one_step = SedSimulation::new("one_step", SimulationKind::OneStep { step: 0.5 });

        let heun = opencor_solver::Solver::from_kisao_id(kisao::HEUN);

        assert!(one_step.set_ode_solver(heun));
        assert!(one_step.ode_solver_mut().is_some_and(|solver| solver.set_property("Step", "0.01")));

        let one_step = document.add_simulation(one_step);

        document.create_task(model, one_step);

        let serialised = document.serialise(None);
        let parsed = parse(&serialised);

        assert!(parsed.logger.issues().is_empty());
        assert_eq!(parsed.models.len(), 1);
        assert_eq!(parsed.models[0].source, "https://example.org/models/decay.cellml");
        assert_eq!(parsed.models[0].changes, vec![SedChange::attribute("main", "k", 0.25)]);
        assert_eq!(parsed.simulations.len(), 2);
        assert_eq!(parsed.simulations[0].kind, SimulationKind::DEFAULT_TIME_COURSE);
        assert_eq!(parsed.simulations[0].ode_solver, Some(opencor_solver::Solver::cvode()));
        assert_eq!(parsed.simulations[1].kind, SimulationKind::OneStep { step: 0.5 });
        assert_eq!(
            parsed.simulations[1].ode_solver.as_ref().and_then(|solver| solver.property("Step")),
            Some("0.01".to_string())
        );
        assert_eq!(parsed.tasks.len(), 2);
        assert_eq!(parsed.tasks[1].model_reference.as_deref(), Some("model1"));
        assert_eq!(parsed.tasks[1].simulation_reference.as_deref(), Some("one_step"));
    }
}
