//! Running simulation experiments
//!
//! [`SedDocument::instantiate`] checks that every task of a document can be
//! run and prepares an [`InstanceTask`] for each of them. Tasks take a copy
//! of the solvers and changes of their document, so an [`Instance`] is not
//! affected by later changes to the document.

mod task;

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use opencor_file::FileType;
use opencor_model::{EvaluationMode, ModelAnalyser, equations::Step};
use opencor_shared::issue::{HasIssues, Issue, Logger};

use crate::{SedDocument, SedTask};

pub use task::InstanceTask;

/// A flag asking a running instance to stop.
///
/// Clones share the flag, so a token can be cancelled from another thread
/// than the one running the instance. Running instances check it once per
/// output point.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Creates a token that is not cancelled
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the instances using this token to stop
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns whether the token has been cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Where an instance is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceState {
    /// Instantiated, never run
    Built,
    /// Running its tasks
    Running,
    /// Run without any error
    Completed,
    /// Run, with at least one error
    CompletedWithIssues,
}

/// The runnable form of a simulation experiment description.
#[derive(Debug)]
pub struct Instance {
    tasks: Vec<InstanceTask>,
    instantiation_logger: Logger,
    logger: Logger,
    state: InstanceState,
}

impl Instance {
    pub(crate) fn new(document: &SedDocument, analyser: &dyn ModelAnalyser, mode: EvaluationMode) -> Self {
        let mut logger = Logger::new();
        let mut tasks = Vec::new();

        if !document.has_tasks() {
            logger.add_error("The simulation experiment description does not contain any tasks to run.");
        }

        for (_, task) in document.tasks() {
            match prepare_task(document, task, analyser, mode) {
                Ok(task) => tasks.push(task),
                Err(issues) => logger.add_issues(issues),
            }
        }

        if !logger.errors().is_empty() {
            tasks.clear();
        }

        tracing::debug!(tasks = tasks.len(), issues = logger.issue_count(), "instance created");

        Self {
            tasks,
            instantiation_logger: logger.clone(),
            logger,
            state: InstanceState::Built,
        }
    }

    /// Runs every task, from its initial conditions
    pub fn run(&mut self) {
        self.run_with(&CancellationToken::new());
    }

    /// Runs every task, stopping as soon as `token` is cancelled.
    ///
    /// The results computed before the cancellation are kept.
    pub fn run_with(&mut self, token: &CancellationToken) {
        self.state = InstanceState::Running;
        self.logger.clone_from(&self.instantiation_logger);

        for task in &mut self.tasks {
            task.run(token);

            self.logger.add_issues(task.logger().issues().iter().cloned());

            if token.is_cancelled() {
                break;
            }
        }

        self.state = if self.logger.errors().is_empty() {
            InstanceState::Completed
        } else {
            InstanceState::CompletedWithIssues
        };

        tracing::debug!(tasks = self.tasks.len(), issues = self.logger.issue_count(), "instance run");
    }

    /// Returns where the instance is in its life
    #[must_use]
    pub const fn state(&self) -> InstanceState {
        self.state
    }

    /// Returns whether the instance has any task
    #[must_use]
    pub fn has_tasks(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Returns the number of tasks
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Returns the tasks, in document order
    #[must_use]
    pub fn tasks(&self) -> &[InstanceTask] {
        &self.tasks
    }

    /// Returns the task at the given position
    #[must_use]
    pub fn task(&self, index: usize) -> Option<&InstanceTask> {
        self.tasks.get(index)
    }
}

impl HasIssues for Instance {
    fn logger(&self) -> &Logger {
        &self.logger
    }
}

/// Checks that a task can be run, and prepares it.
fn prepare_task(
    document: &SedDocument,
    task: &SedTask,
    analyser: &dyn ModelAnalyser,
    mode: EvaluationMode,
) -> Result<InstanceTask, Vec<Issue>> {
    let model = task.model().and_then(|model| document.model(model));
    let simulation = task.simulation().and_then(|simulation| document.simulation(simulation));

    let (model, simulation) = match (model, simulation) {
        (Some(model), Some(simulation)) => (model, simulation),
        (model, simulation) => {
            let mut issues = Vec::new();

            if model.is_none() {
                issues.push(Issue::error(format!("Task '{}' requires a model.", task.id())));
            }

            if simulation.is_none() {
                issues.push(Issue::error(format!("Task '{}' requires a simulation.", task.id())));
            }

            return Err(issues);
        }
    };

    if model.file().file_type() != FileType::CellmlFile {
        return Err(vec![Issue::error(format!(
            "Task '{}' requires a model of CellML type.",
            task.id()
        ))]);
    }

    let analysed = analyser.analyse(&model.file().contents());
    let class = analysed.class();

    if !class.is_valid() {
        let mut issues = vec![Issue::error(format!("The CellML file is {class}."))];

        issues.extend(analysed.issues());

        return Err(issues);
    }

    let mut issues = Vec::new();

    if class.requires_ode_solver() && simulation.ode_solver().is_none() {
        issues.push(Issue::error(format!(
            "Simulation '{}' is to be used with model '{}' which requires an ODE solver but none is provided.",
            simulation.id(),
            model.id()
        )));
    }

    if class.requires_nla_solver() && simulation.nla_solver().is_none() {
        issues.push(Issue::error(format!(
            "Simulation '{}' is to be used with model '{}' which requires an NLA solver but none is provided.",
            simulation.id(),
            model.id()
        )));
    }

    let Some(evaluator) = analysed.evaluator(mode) else {
        issues.push(Issue::error(format!(
            "The equations of model '{}' could not be prepared for simulation.",
            model.id()
        )));

        return Err(issues);
    };

    if !issues.is_empty() {
        return Err(issues);
    }

    let nla_size = analysed
        .equations()
        .map(|equations| {
            equations
                .computed_constant_steps()
                .iter()
                .chain(equations.algebraic_steps())
                .filter_map(|step| match step {
                    Step::Solve(block) => Some(block.unknowns().len()),
                    Step::Assign { .. } => None,
                })
                .max()
                .unwrap_or_default()
        })
        .unwrap_or_default();

    Ok(InstanceTask::new(
        task.id(),
        &analysed,
        evaluator,
        simulation,
        model.changes().to_vec(),
        nla_size,
    ))
}
