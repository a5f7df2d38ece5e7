use std::fmt;

use opencor_model::{
    AnalysedModel, EquationEvaluator, ModelClass, ModelVariables, NlaSolve, VariableDescriptor, VariableValues,
};
use opencor_shared::issue::{HasIssues, Logger};
use opencor_solver::{
    Solver,
    kernel::{KernelError, NewtonKernel, NlaKernel, OdeKernel, OdeSystem},
};

use super::CancellationToken;
use crate::{SedChange, SedSimulation, SimulationKind};

/// A task of an [`Instance`](super::Instance), with the results of its last
/// run.
///
/// After a run, the variable of integration and every variable of the model
/// have one value per output point. Accessors given an index out of range
/// return an empty slice or an empty string.
pub struct InstanceTask {
    id: String,
    class: ModelClass,
    variables: ModelVariables,
    evaluator: Box<dyn EquationEvaluator>,
    initial_values: VariableValues,
    kind: SimulationKind,
    ode_solver: Option<Solver>,
    nla_solver: Option<Solver>,
    changes: Vec<SedChange>,
    nla_size: usize,
    logger: Logger,
    results: Results,
}

struct Results {
    voi: Vec<f64>,
    states: Vec<Vec<f64>>,
    rates: Vec<Vec<f64>>,
    constants: Vec<Vec<f64>>,
    computed_constants: Vec<Vec<f64>>,
    algebraic: Vec<Vec<f64>>,
}

impl Results {
    fn new(variables: &ModelVariables) -> Self {
        Self {
            voi: Vec::new(),
            states: vec![Vec::new(); variables.states.len()],
            rates: vec![Vec::new(); variables.states.len()],
            constants: vec![Vec::new(); variables.constants.len()],
            computed_constants: vec![Vec::new(); variables.computed_constants.len()],
            algebraic: vec![Vec::new(); variables.algebraic.len()],
        }
    }

    fn record(&mut self, voi: f64, states: &[f64], rates: &[f64], values: &VariableValues) {
        fn push(series: &mut [Vec<f64>], values: &[f64]) {
            for (series, value) in series.iter_mut().zip(values) {
                series.push(*value);
            }
        }

        self.voi.push(voi);

        push(&mut self.states, states);
        push(&mut self.rates, rates);
        push(&mut self.constants, &values.constants);
        push(&mut self.computed_constants, &values.computed_constants);
        push(&mut self.algebraic, &values.algebraic);
    }
}

/// Solves the non-linear systems of a model with the Newton kernel of the
/// task, keeping the first failure.
struct NlaSolver<'a> {
    kernel: Option<&'a NewtonKernel>,
    failure: Option<KernelError>,
}

impl NlaSolve for NlaSolver<'_> {
    fn solve(&mut self, index: usize, mut residuals: &mut dyn FnMut(&[f64], &mut [f64]), unknowns: &mut [f64]) {
        let Some(kernel) = self.kernel else {
            return;
        };

        if let Err(error) = kernel.solve(&mut residuals, unknowns) {
            tracing::trace!(index, %error, "non-linear system not solved");

            self.failure.get_or_insert(error);
        }
    }
}

/// The model as seen by the kernels: its equations and the current values
/// of its non-state variables.
struct Evaluation<'a> {
    evaluator: &'a dyn EquationEvaluator,
    values: VariableValues,
    nla: NlaSolver<'a>,
}

impl Evaluation<'_> {
    /// Computes the rates (of a differential model) and the algebraic
    /// variables at the given point
    fn update(&mut self, differential: bool, voi: f64, states: &[f64], rates: &mut [f64]) -> Result<(), KernelError> {
        if differential {
            self.compute_rates(voi, states, rates);
        }

        self.evaluator
            .compute_variables(voi, states, &mut self.values, &mut self.nla);

        self.nla.failure.take().map_or(Ok(()), Err)
    }
}

impl OdeSystem for Evaluation<'_> {
    fn compute_rates(&mut self, voi: f64, states: &[f64], rates: &mut [f64]) {
        self.evaluator
            .compute_rates(voi, states, rates, &mut self.values, &mut self.nla);
    }
}

impl InstanceTask {
    pub(crate) fn new(
        id: &str,
        model: &AnalysedModel,
        evaluator: Box<dyn EquationEvaluator>,
        simulation: &SedSimulation,
        changes: Vec<SedChange>,
        nla_size: usize,
    ) -> Self {
        Self {
            id: id.to_string(),
            class: model.class(),
            variables: model.variables().clone(),
            evaluator,
            initial_values: model.variable_values(),
            kind: simulation.kind(),
            ode_solver: simulation.ode_solver().cloned(),
            nla_solver: simulation.nla_solver().cloned(),
            changes,
            nla_size,
            logger: Logger::new(),
            results: Results::new(model.variables()),
        }
    }

    /// Runs the task from its initial conditions, replacing the results of
    /// any previous run.
    pub(crate) fn run(&mut self, token: &CancellationToken) {
        self.logger.remove_all_issues();
        self.results = Results::new(&self.variables);

        tracing::debug!(task = %self.id, class = %self.class, "running task");

        if token.is_cancelled() {
            self.logger.add_error("The simulation was cancelled.");
            return;
        }

        if let Some(solver) = self.nla_solver.as_ref().filter(|_| self.nla_size > 0) {
            let errors = solver.validate(self.nla_size);

            if !errors.is_empty() {
                self.logger.add_issues(errors);
                return;
            }
        }

        let nla_kernel = self.nla_solver.as_ref().and_then(Solver::nla_kernel);
        let state_count = self.variables.states.len();
        let differential = self.class.requires_ode_solver();
        let mut evaluation = Evaluation {
            evaluator: self.evaluator.as_ref(),
            values: self.initial_values.clone(),
            nla: NlaSolver {
                kernel: nla_kernel.as_ref(),
                failure: None,
            },
        };
        let voi = self.kind.initial_time();
        let mut states = vec![0.0; state_count];
        let mut rates = vec![0.0; state_count];

        self.evaluator
            .initialise_variables(voi, &mut states, &mut evaluation.values);

        apply_changes(&self.changes, &self.variables, &mut states, &mut evaluation.values, &mut self.logger);

        self.evaluator
            .compute_computed_constants(&mut evaluation.values, &mut evaluation.nla);

        if let Err(error) = evaluation.update(differential, voi, &states, &mut rates) {
            self.logger.add_error(format!("{error}."));
            return;
        }

        let ode_kernel = match (&self.ode_solver, differential) {
            (Some(solver), true) => {
                let errors = solver.validate(state_count);

                if !errors.is_empty() {
                    self.logger.add_issues(errors);
                    return;
                }

                solver.ode_kernel()
            }
            (Some(_) | None, _) => None,
        };

        let Some(mut kernel) = ode_kernel else {
            self.results.record(voi, &states, &rates, &evaluation.values);
            return;
        };

        kernel.initialise(&mut evaluation, voi, &states);

        let mut integration = Integration {
            kernel,
            evaluation,
            voi,
            states,
            rates,
            results: &mut self.results,
        };

        let outcome = match self.kind {
            SimulationKind::UniformTimeCourse {
                initial_time,
                output_start_time,
                output_end_time,
                number_of_steps,
            } => integration.time_course(
                initial_time,
                output_start_time,
                output_end_time,
                number_of_steps,
                token,
            ),
            SimulationKind::OneStep { step } => integration.one_step(step),
            SimulationKind::SteadyState | SimulationKind::Analysis => {
                integration.record();
                Ok(())
            }
        };

        if let Err(message) = outcome {
            tracing::debug!(task = %self.id, voi = integration.voi, %message, "task stopped");

            self.logger.add_error(message);
        }
    }

    /// Returns the id of the task in its document
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the values of the variable of integration
    #[must_use]
    pub fn voi(&self) -> &[f64] {
        &self.results.voi
    }

    /// Returns the name of the variable of integration, if the model has one
    #[must_use]
    pub fn voi_name(&self) -> String {
        self.variables
            .voi
            .as_ref()
            .map(VariableDescriptor::qualified_name)
            .unwrap_or_default()
    }

    /// Returns the unit of the variable of integration, if the model has one
    #[must_use]
    pub fn voi_unit(&self) -> &str {
        self.variables.voi.as_ref().map_or("", VariableDescriptor::units)
    }

    /// Returns the number of states
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.variables.states.len()
    }

    /// Returns the values of a state
    #[must_use]
    pub fn state(&self, index: usize) -> &[f64] {
        series(&self.results.states, index)
    }

    /// Returns the name of a state
    #[must_use]
    pub fn state_name(&self, index: usize) -> String {
        name(&self.variables.states, index)
    }

    /// Returns the unit of a state
    #[must_use]
    pub fn state_unit(&self, index: usize) -> &str {
        unit(&self.variables.states, index)
    }

    /// Returns the number of rates, which is the number of states
    #[must_use]
    pub fn rate_count(&self) -> usize {
        self.variables.states.len()
    }

    /// Returns the values of the rate of a state
    #[must_use]
    pub fn rate(&self, index: usize) -> &[f64] {
        series(&self.results.rates, index)
    }

    /// Returns the name of the rate of a state: the name of the state
    /// followed by `'`
    #[must_use]
    pub fn rate_name(&self, index: usize) -> String {
        self.variables
            .states
            .get(index)
            .map(|state| format!("{}'", state.qualified_name()))
            .unwrap_or_default()
    }

    /// Returns the unit of the rate of a state, `state unit/voi unit`
    #[must_use]
    pub fn rate_unit(&self, index: usize) -> String {
        self.variables
            .states
            .get(index)
            .map(|state| format!("{}/{}", state.units(), self.voi_unit()))
            .unwrap_or_default()
    }

    /// Returns the number of constants
    #[must_use]
    pub fn constant_count(&self) -> usize {
        self.variables.constants.len()
    }

    /// Returns the values of a constant
    #[must_use]
    pub fn constant(&self, index: usize) -> &[f64] {
        series(&self.results.constants, index)
    }

    /// Returns the name of a constant
    #[must_use]
    pub fn constant_name(&self, index: usize) -> String {
        name(&self.variables.constants, index)
    }

    /// Returns the unit of a constant
    #[must_use]
    pub fn constant_unit(&self, index: usize) -> &str {
        unit(&self.variables.constants, index)
    }

    /// Returns the number of computed constants
    #[must_use]
    pub fn computed_constant_count(&self) -> usize {
        self.variables.computed_constants.len()
    }

    /// Returns the values of a computed constant
    #[must_use]
    pub fn computed_constant(&self, index: usize) -> &[f64] {
        series(&self.results.computed_constants, index)
    }

    /// Returns the name of a computed constant
    #[must_use]
    pub fn computed_constant_name(&self, index: usize) -> String {
        name(&self.variables.computed_constants, index)
    }

    /// Returns the unit of a computed constant
    #[must_use]
    pub fn computed_constant_unit(&self, index: usize) -> &str {
        unit(&self.variables.computed_constants, index)
    }

    /// Returns the number of algebraic variables
    #[must_use]
    pub fn algebraic_count(&self) -> usize {
        self.variables.algebraic.len()
    }

    /// Returns the values of an algebraic variable
    #[must_use]
    pub fn algebraic(&self, index: usize) -> &[f64] {
        series(&self.results.algebraic, index)
    }

    /// Returns the name of an algebraic variable
    #[must_use]
    pub fn algebraic_name(&self, index: usize) -> String {
        name(&self.variables.algebraic, index)
    }

    /// Returns the unit of an algebraic variable
    #[must_use]
    pub fn algebraic_unit(&self, index: usize) -> &str {
        unit(&self.variables.algebraic, index)
    }
}

impl HasIssues for InstanceTask {
    fn logger(&self) -> &Logger {
        &self.logger
    }
}

impl fmt::Debug for InstanceTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceTask")
            .field("id", &self.id)
            .field("class", &self.class)
            .field("kind", &self.kind)
            .field("points", &self.results.voi.len())
            .finish_non_exhaustive()
    }
}

/// The integration of a differential model over a simulation.
struct Integration<'a> {
    kernel: Box<dyn OdeKernel>,
    evaluation: Evaluation<'a>,
    voi: f64,
    states: Vec<f64>,
    rates: Vec<f64>,
    results: &'a mut Results,
}

impl Integration<'_> {
    fn record(&mut self) {
        self.results
            .record(self.voi, &self.states, &self.rates, &self.evaluation.values);
    }

    /// Integrates up to `voi_end` and computes the variables there.
    fn advance(&mut self, voi_end: f64) -> Result<(), String> {
        self.kernel
            .solve(&mut self.evaluation, &mut self.voi, &mut self.states, voi_end)
            .and_then(|()| {
                self.evaluation
                    .update(true, self.voi, &self.states, &mut self.rates)
            })
            .map_err(|error| format!("{error}."))?;

        tracing::trace!(voi = self.voi, "output point reached");

        Ok(())
    }

    fn time_course(
        &mut self,
        initial_time: f64,
        output_start_time: f64,
        output_end_time: f64,
        number_of_steps: u32,
        token: &CancellationToken,
    ) -> Result<(), String> {
        if output_start_time > initial_time {
            self.advance(output_start_time)?;
        }

        self.record();

        let interval = (output_end_time - output_start_time) / f64::from(number_of_steps);

        for step in 1..=number_of_steps {
            if token.is_cancelled() {
                return Err("The simulation was cancelled.".to_string());
            }

            self.advance((f64::from(step).mul_add(interval, output_start_time)).min(output_end_time))?;
            self.record();
        }

        Ok(())
    }

    fn one_step(&mut self, step: f64) -> Result<(), String> {
        self.record();
        self.advance(self.voi + step)?;
        self.record();

        Ok(())
    }
}

/// Applies the changes of a model to its initial values.
fn apply_changes(
    changes: &[SedChange],
    variables: &ModelVariables,
    states: &mut [f64],
    values: &mut VariableValues,
    logger: &mut Logger,
) {
    for change in changes {
        let SedChange::Attribute {
            component,
            variable,
            new_value,
        } = change;
        let position = |descriptors: &[VariableDescriptor]| {
            descriptors
                .iter()
                .position(|descriptor| descriptor.component() == component.as_str() && descriptor.name() == variable.as_str())
        };

        let slot = if let Some(index) = position(&variables.states) {
            states.get_mut(index)
        } else if let Some(index) = position(&variables.constants) {
            values.constants.get_mut(index)
        } else if let Some(index) = position(&variables.computed_constants) {
            values.computed_constants.get_mut(index)
        } else if let Some(index) = position(&variables.algebraic) {
            values.algebraic.get_mut(index)
        } else {
            None
        };

        match slot {
            Some(slot) => *slot = *new_value,
            None => logger.add_warning(format!(
                "The variable '{variable}' of component '{component}' could not be found. Its change is ignored."
            )),
        }
    }
}

fn series(series: &[Vec<f64>], index: usize) -> &[f64] {
    series.get(index).map_or(&[][..], Vec::as_slice)
}

fn name(descriptors: &[VariableDescriptor], index: usize) -> String {
    descriptors
        .get(index)
        .map(VariableDescriptor::qualified_name)
        .unwrap_or_default()
}

fn unit(descriptors: &[VariableDescriptor], index: usize) -> &str {
    descriptors.get(index).map_or("", VariableDescriptor::units)
}
