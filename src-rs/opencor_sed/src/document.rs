use std::{collections::HashMap, sync::Arc};

use indexmap::IndexMap;
use opencor_file::{File, FileRef, FileRegistry, FileType};
use opencor_model::{EvaluationMode, ModelAnalyser, ModelClass};
use opencor_shared::issue::{HasIssues, Logger};
use opencor_solver::Solver;

use crate::{
    Instance, ModelId, SedModel, SedSimulation, SedTask, SimulationId, SimulationKind, TaskId,
    codec::{self, ParsedSedml},
};

/// A simulation experiment description: models, simulations, and the tasks
/// that pair them.
///
/// Items are kept in insertion order, which is the order they are serialised
/// in. Every item has an id that is unique within the document.
#[derive(Debug, Default)]
pub struct SedDocument {
    models: IndexMap<ModelId, SedModel>,
    simulations: IndexMap<SimulationId, SedSimulation>,
    tasks: IndexMap<TaskId, SedTask>,
    next_handle: usize,
    logger: Logger,
}

impl SedDocument {
    /// Creates a document, from a file if one is given.
    ///
    /// - a CellML file yields a model, a simulation suited to the class of
    ///   the model (as reported by `analyser`) and a task running them;
    /// - a SED-ML file yields what it describes, opening the model files the
    ///   registry does not know yet;
    /// - a COMBINE archive yields what its master file yields.
    ///
    /// Any other file leaves the document empty, with an error.
    #[must_use]
    pub fn new(file: Option<&FileRef>, registry: &FileRegistry, analyser: &dyn ModelAnalyser) -> Self {
        let mut document = Self::default();

        if let Some(file) = file {
            document.initialise(file, registry, analyser);
        }

        document
    }

    fn initialise(&mut self, file: &FileRef, registry: &FileRegistry, analyser: &dyn ModelAnalyser) {
        tracing::debug!(path = file.path(), file_type = %file.file_type(), "creating simulation experiment description");

        match file.file_type() {
            FileType::CellmlFile => self.initialise_from_cellml(file, analyser),
            FileType::SedmlFile => self.initialise_from_sedml(file, registry),
            FileType::CombineArchive => match file.master_file() {
                None => self.logger.add_error(
                    "A simulation experiment description cannot be created using a COMBINE archive with no master file.",
                ),
                Some(master) => match master.file_type() {
                    FileType::CellmlFile => self.initialise_from_cellml(&master, analyser),
                    FileType::SedmlFile => self.initialise_from_sedml(&master, registry),
                    FileType::Undefined
                    | FileType::CombineArchive
                    | FileType::UnknownFile
                    | FileType::IrretrievableFile => self.logger.add_error(
                        "A simulation experiment description cannot be created using a COMBINE archive with an unknown master file (only CellML and SED-ML master files are supported).",
                    ),
                },
            },
            FileType::IrretrievableFile => self
                .logger
                .add_error("A simulation experiment description cannot be created using an irretrievable file."),
            FileType::Undefined | FileType::UnknownFile => self
                .logger
                .add_error("A simulation experiment description cannot be created using an unknown file."),
        }
    }

    fn initialise_from_cellml(&mut self, file: &FileRef, analyser: &dyn ModelAnalyser) {
        let class = analyser.analyse(&file.contents()).class();
        let model = self.create_model(Arc::clone(file));

        let kind = match class {
            ModelClass::Ode | ModelClass::Dae => SimulationKind::DEFAULT_TIME_COURSE,
            ModelClass::Invalid
            | ModelClass::Underconstrained
            | ModelClass::Overconstrained
            | ModelClass::UnsuitablyConstrained
            | ModelClass::Algebraic
            | ModelClass::Nla => SimulationKind::SteadyState,
        };

        let mut simulation = SedSimulation::new(self.unique_id("simulation"), kind);

        if class.requires_ode_solver() {
            simulation.set_solver(Solver::cvode());
        }

        if class.requires_nla_solver() {
            simulation.set_solver(Solver::kinsol());
        }

        let simulation = self.insert_simulation(simulation);

        self.create_task(Some(model), Some(simulation));

        tracing::debug!(%class, "simulation experiment description created from a CellML file");
    }

    fn initialise_from_sedml(&mut self, file: &FileRef, registry: &FileRegistry) {
        let ParsedSedml {
            models,
            simulations,
            tasks,
            logger,
        } = codec::parse(&String::from_utf8_lossy(&file.contents()));

        self.logger.add_issues(logger.issues().iter().cloned());

        let mut model_references = HashMap::new();

        for parsed in models {
            let source = codec::resolve_source(file.path(), file.is_local(), &parsed.source);

            let model_file = registry.file(&source).unwrap_or_else(|| {
                self.logger.add_warning(format!(
                    "The model '{source}' could not be found in the file manager. It has been automatically added to it."
                ));

                File::open(registry, &source)
            });

            let id = self.available_id(parsed.id.as_deref(), "model");
            let mut model = SedModel::new(id, model_file);

            for change in parsed.changes {
                model.add_change(change);
            }

            let handle = self.insert_model(model);

            if let Some(reference) = parsed.id {
                model_references.entry(reference).or_insert(handle);
            }
        }

        let mut simulation_references = HashMap::new();

        for parsed in simulations {
            let id = self.available_id(parsed.id.as_deref(), "simulation");
            let mut simulation = SedSimulation::new(id, parsed.kind);

            simulation.set_ode_solver(parsed.ode_solver);
            simulation.set_nla_solver(parsed.nla_solver);

            let handle = self.insert_simulation(simulation);

            if let Some(reference) = parsed.id {
                simulation_references.entry(reference).or_insert(handle);
            }
        }

        for parsed in tasks {
            let id = self.available_id(parsed.id.as_deref(), "task");
            let model = parsed
                .model_reference
                .and_then(|reference| model_references.get(&reference).copied());
            let simulation = parsed
                .simulation_reference
                .and_then(|reference| simulation_references.get(&reference).copied());

            self.insert_task(SedTask::new(id, model, simulation));
        }

        tracing::debug!(
            models = self.models.len(),
            simulations = self.simulations.len(),
            tasks = self.tasks.len(),
            "simulation experiment description created from a SED-ML file"
        );
    }

    /// Returns `id` if it is free, a new id starting with `prefix` otherwise
    fn available_id(&self, id: Option<&str>, prefix: &str) -> String {
        match id {
            Some(id) if !id.is_empty() && !self.is_id_in_use(id) => id.to_string(),
            Some(_) | None => self.unique_id(prefix),
        }
    }

    fn is_id_in_use(&self, id: &str) -> bool {
        self.models.values().any(|model| model.id() == id)
            || self.simulations.values().any(|simulation| simulation.id() == id)
            || self.tasks.values().any(|task| task.id() == id)
    }

    /// Returns the first of `prefix1`, `prefix2`, ... that no model,
    /// simulation or task uses
    #[must_use]
    pub fn unique_id(&self, prefix: &str) -> String {
        let mut index = 1_usize;

        loop {
            let id = format!("{prefix}{index}");

            if !self.is_id_in_use(&id) {
                return id;
            }

            index += 1;
        }
    }

    const fn next_handle(&mut self) -> usize {
        let handle = self.next_handle;

        self.next_handle += 1;

        handle
    }

    fn insert_model(&mut self, model: SedModel) -> ModelId {
        let handle = ModelId(self.next_handle());

        self.models.insert(handle, model);

        handle
    }

    fn insert_simulation(&mut self, simulation: SedSimulation) -> SimulationId {
        let handle = SimulationId(self.next_handle());

        self.simulations.insert(handle, simulation);

        handle
    }

    fn insert_task(&mut self, task: SedTask) -> TaskId {
        let handle = TaskId(self.next_handle());

        self.tasks.insert(handle, task);

        handle
    }

    /// Adds a model.
    ///
    /// Returns `None`, leaving the document unchanged, if the id of the model
    /// is empty or already used in the document.
    pub fn add_model(&mut self, model: SedModel) -> Option<ModelId> {
        (!model.id().is_empty() && !self.is_id_in_use(model.id())).then(|| self.insert_model(model))
    }

    /// Adds a model for `file`, with a new id
    pub fn create_model(&mut self, file: FileRef) -> ModelId {
        let model = SedModel::new(self.unique_id("model"), file);

        self.insert_model(model)
    }

    /// Removes a model, and resets the handles of the tasks that refer to
    /// it. Returns `false` if the document has no such model.
    pub fn remove_model(&mut self, model: ModelId) -> bool {
        if self.models.shift_remove(&model).is_none() {
            return false;
        }

        for task in self.tasks.values_mut().filter(|task| task.model() == Some(model)) {
            task.set_model(None);
        }

        true
    }

    /// Removes every model. Returns `false` if there was none.
    pub fn remove_all_models(&mut self) -> bool {
        let handles: Vec<_> = self.models.keys().copied().collect();

        handles.into_iter().fold(false, |removed, model| self.remove_model(model) || removed)
    }

    /// Returns whether the document has any model
    #[must_use]
    pub fn has_models(&self) -> bool {
        !self.models.is_empty()
    }

    /// Returns the number of models
    #[must_use]
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Returns the models, in insertion order
    pub fn models(&self) -> impl Iterator<Item = (ModelId, &SedModel)> {
        self.models.iter().map(|(handle, model)| (*handle, model))
    }

    /// Returns the model with the given handle, if it is still in the
    /// document
    #[must_use]
    pub fn model(&self, model: ModelId) -> Option<&SedModel> {
        self.models.get(&model)
    }

    /// Returns the model with the given handle, for it to be changed
    pub fn model_mut(&mut self, model: ModelId) -> Option<&mut SedModel> {
        self.models.get_mut(&model)
    }

    /// Returns the model at the given position
    #[must_use]
    pub fn model_at(&self, index: usize) -> Option<(ModelId, &SedModel)> {
        self.models.get_index(index).map(|(handle, model)| (*handle, model))
    }

    /// Adds a simulation.
    ///
    /// Returns `None`, leaving the document unchanged, if the id of the
    /// simulation is empty or already used in the document.
    pub fn add_simulation(&mut self, simulation: SedSimulation) -> Option<SimulationId> {
        (!simulation.id().is_empty() && !self.is_id_in_use(simulation.id()))
            .then(|| self.insert_simulation(simulation))
    }

    /// Removes a simulation, and resets the handles of the tasks that refer
    /// to it. Returns `false` if the document has no such simulation.
    pub fn remove_simulation(&mut self, simulation: SimulationId) -> bool {
        if self.simulations.shift_remove(&simulation).is_none() {
            return false;
        }

        for task in self
            .tasks
            .values_mut()
            .filter(|task| task.simulation() == Some(simulation))
        {
            task.set_simulation(None);
        }

        true
    }

    /// Removes every simulation. Returns `false` if there was none.
    pub fn remove_all_simulations(&mut self) -> bool {
        let handles: Vec<_> = self.simulations.keys().copied().collect();

        handles
            .into_iter()
            .fold(false, |removed, simulation| self.remove_simulation(simulation) || removed)
    }

    /// Returns whether the document has any simulation
    #[must_use]
    pub fn has_simulations(&self) -> bool {
        !self.simulations.is_empty()
    }

    /// Returns the number of simulations
    #[must_use]
    pub fn simulation_count(&self) -> usize {
        self.simulations.len()
    }

    /// Returns the simulations, in insertion order
    pub fn simulations(&self) -> impl Iterator<Item = (SimulationId, &SedSimulation)> {
        self.simulations.iter().map(|(handle, simulation)| (*handle, simulation))
    }

    /// Returns the simulation with the given handle, if it is still in the
    /// document
    #[must_use]
    pub fn simulation(&self, simulation: SimulationId) -> Option<&SedSimulation> {
        self.simulations.get(&simulation)
    }

    /// Returns the simulation with the given handle, for it or its solvers
    /// to be changed
    pub fn simulation_mut(&mut self, simulation: SimulationId) -> Option<&mut SedSimulation> {
        self.simulations.get_mut(&simulation)
    }

    /// Returns the simulation at the given position
    #[must_use]
    pub fn simulation_at(&self, index: usize) -> Option<(SimulationId, &SedSimulation)> {
        self.simulations
            .get_index(index)
            .map(|(handle, simulation)| (*handle, simulation))
    }

    /// Adds a task.
    ///
    /// Returns `None`, leaving the document unchanged, if the id of the task
    /// is empty or already used in the document.
    pub fn add_task(&mut self, task: SedTask) -> Option<TaskId> {
        (!task.id().is_empty() && !self.is_id_in_use(task.id())).then(|| self.insert_task(task))
    }

    /// Adds a task with a new id
    pub fn create_task(&mut self, model: Option<ModelId>, simulation: Option<SimulationId>) -> TaskId {
        let task = SedTask::new(self.unique_id("task"), model, simulation);

        self.insert_task(task)
    }

    /// Removes a task. Returns `false` if the document has no such task.
    pub fn remove_task(&mut self, task: TaskId) -> bool {
        self.tasks.shift_remove(&task).is_some()
    }

    /// Removes every task. Returns `false` if there was none.
    pub fn remove_all_tasks(&mut self) -> bool {
        let removed = !self.tasks.is_empty();

        self.tasks.clear();

        removed
    }

    /// Returns whether the document has any task
    #[must_use]
    pub fn has_tasks(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Returns the number of tasks
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Returns the tasks, in insertion order
    pub fn tasks(&self) -> impl Iterator<Item = (TaskId, &SedTask)> {
        self.tasks.iter().map(|(handle, task)| (*handle, task))
    }

    /// Returns the task with the given handle, if it is still in the
    /// document
    #[must_use]
    pub fn task(&self, task: TaskId) -> Option<&SedTask> {
        self.tasks.get(&task)
    }

    /// Returns the task with the given handle, for its model or simulation
    /// to be changed
    pub fn task_mut(&mut self, task: TaskId) -> Option<&mut SedTask> {
        self.tasks.get_mut(&task)
    }

    /// Returns the task at the given position
    #[must_use]
    pub fn task_at(&self, index: usize) -> Option<(TaskId, &SedTask)> {
        self.tasks.get_index(index).map(|(handle, task)| (*handle, task))
    }

    /// Writes the document as SED-ML (see [`codec::serialise`])
    #[must_use]
    pub fn serialise(&self, base_path: Option<&str>) -> String {
        codec::serialise(self, base_path)
    }

    /// Validates the tasks of the document and prepares them to be run.
    ///
    /// Models are analysed by `analyser` and their equations evaluated as
    /// `mode` says. The instance is independent of the document: changing
    /// the document afterwards does not affect it.
    #[must_use]
    pub fn instantiate(&self, analyser: &dyn ModelAnalyser, mode: EvaluationMode) -> Instance {
        Instance::new(self, analyser, mode)
    }
}

impl HasIssues for SedDocument {
    fn logger(&self) -> &Logger {
        &self.logger
    }
}
