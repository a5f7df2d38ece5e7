//! CellML model analysis
//!
//! Turns a flattened CellML model into ordered equations:
//!
//! 1. connected variables are merged into equivalence classes
//! 2. equations with a derivative on one side define the states
//! 3. every other equation is matched with the variable it computes
//! 4. the equations are grouped into strongly connected blocks, in the order
//!    in which they must be evaluated
//!
//! Blocks of one explicit equation become assignments, every other block a
//! system of non-linear equations.

use std::collections::HashSet;

use opencor_shared::issue::Logger;

use crate::{
    cellml::{self, CellmlModel, InitialValue},
    equations::{ModelEquations, NlaBlock, Step},
    expr::{BinaryOp, Expr, VariableRef},
    mathml::Term,
    model::{AnalysedModel, ModelAnalyser, ModelClass, ModelVariables, VariableDescriptor},
};

/// Analyses CellML 1.0, 1.1 and 2.0 models.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellmlAnalyser;

impl CellmlAnalyser {
    /// Creates an analyser
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ModelAnalyser for CellmlAnalyser {
    fn analyse(&self, contents: &[u8]) -> AnalysedModel {
        let mut logger = Logger::new();

        let root = match opencor_xml::parse_bytes(contents) {
            Ok(root) => root,
            Err(error) => {
                logger.add_error(format!("The model could not be parsed ({error})."));
                return AnalysedModel::without_equations(ModelClass::Invalid, logger);
            }
        };

        let Some(model) = cellml::read_model(&root, &mut logger) else {
            return AnalysedModel::without_equations(ModelClass::Invalid, logger);
        };

        match Analysis::new(&model, &mut logger).run() {
            Ok((class, variables, equations)) => {
                tracing::debug!(
                    %class,
                    states = variables.states.len(),
                    constants = variables.constants.len(),
                    computed_constants = variables.computed_constants.len(),
                    algebraic = variables.algebraic.len(),
                    "analysed model"
                );

                AnalysedModel::new(class, variables, equations, logger)
            }
            Err(class) => {
                tracing::debug!(%class, "model cannot be simulated");

                AnalysedModel::without_equations(class, logger)
            }
        }
    }
}

/// An equation over equivalence classes.
struct ClassEquation {
    /// Index in [`CellmlModel::equations`]
    source: usize,
    left: Expr<usize>,
    right: Expr<usize>,
    /// The classes the equation refers to, in order of first use
    classes: Vec<usize>,
}

impl ClassEquation {
    fn residual(&self) -> Expr<usize> {
        Expr::binary(BinaryOp::Subtract, self.left.clone(), self.right.clone())
    }

    /// Returns `expr` if the equation reads `class = expr` or
    /// `expr = class`, with `class` absent from `expr`
    fn explicit_value(&self, class: usize) -> Option<&Expr<usize>> {
        let uses = |expr: &Expr<usize>| {
            let mut found = false;
            expr.for_each_variable(&mut |other| found |= *other == class);
            found
        };

        match (&self.left, &self.right) {
            (Expr::Variable(left), right) if *left == class && !uses(right) => Some(right),
            (left, Expr::Variable(right)) if *right == class && !uses(left) => Some(left),
            (_, _) => None,
        }
    }
}

fn referenced_classes(expressions: &[&Expr<usize>]) -> Vec<usize> {
    let mut classes = Vec::new();

    for expr in expressions {
        expr.for_each_variable(&mut |class| {
            if !classes.contains(class) {
                classes.push(*class);
            }
        });
    }

    classes
}

/// The equations of a model, over equivalence classes.
struct Split {
    voi: Option<usize>,
    /// The rate of every state
    odes: Vec<(usize, Expr<usize>)>,
    equations: Vec<ClassEquation>,
}

/// The role of an equivalence class once the model is analysed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Unused,
    Voi,
    State,
    Constant,
    ComputedConstant,
    Algebraic,
}

struct Analysis<'a> {
    model: &'a CellmlModel,
    logger: &'a mut Logger,
    /// The class of every variable
    class_of: Vec<usize>,
    /// The variable standing for every class
    representatives: Vec<usize>,
}

impl<'a> Analysis<'a> {
    fn new(model: &'a CellmlModel, logger: &'a mut Logger) -> Self {
        let count = model.variables.len();
        let mut parents: Vec<usize> = (0..count).collect();

        for (first, second) in &model.connections {
            let first = find(&mut parents, *first);
            let second = find(&mut parents, *second);

            if first != second {
                parents[second.max(first)] = second.min(first);
            }
        }

        let mut class_of = vec![0; count];
        let mut members: Vec<Vec<usize>> = Vec::new();
        let mut class_of_root = vec![None; count];

        for variable in 0..count {
            let root = find(&mut parents, variable);
            let class = *class_of_root[root].get_or_insert_with(|| {
                members.push(Vec::new());
                members.len() - 1
            });

            class_of[variable] = class;
            members[class].push(variable);
        }

        let representatives = members
            .iter()
            .map(|members| {
                members
                    .iter()
                    .find(|member| model.variables[**member].initial_value.is_some())
                    .or_else(|| members.iter().find(|member| !model.variables[**member].imported))
                    .or_else(|| members.first())
                    .copied()
                    .unwrap_or_default()
            })
            .collect();

        let mut analysis = Self {
            model,
            logger,
            class_of,
            representatives,
        };

        for members in &members {
            analysis.check_single_initialisation(members);
        }

        analysis
    }

    fn check_single_initialisation(&mut self, members: &[usize]) {
        let initialised: Vec<usize> = members
            .iter()
            .copied()
            .filter(|member| self.model.variables[*member].initial_value.is_some())
            .collect();

        if let [first, second, ..] = initialised.as_slice() {
            self.logger.add_error(format!(
                "{} and {} are equivalent and cannot both be initialised.",
                self.model.describe(*first),
                lowercase_first(&self.model.describe(*second)),
            ));
        }
    }

    fn describe_class(&self, class: usize) -> String {
        self.model.describe(self.representatives[class])
    }

    fn describe_equation(&self, source: usize) -> String {
        let equation = &self.model.equations[source];

        format!("Equation {} in component '{}'", equation.position, equation.component)
    }

    fn initial_value(&self, class: usize) -> Option<InitialValue> {
        self.model.variables[self.representatives[class]].initial_value
    }

    fn run(mut self) -> Result<(ModelClass, ModelVariables, ModelEquations), ModelClass> {
        if !self.logger.errors().is_empty() {
            return Err(ModelClass::Invalid);
        }

        let class_count = self.representatives.len();
        let Split { voi, odes, equations } = self.split_equations()?;

        // states
        let mut roles = vec![Role::Unused; class_count];
        let mut underconstrained = false;

        if let Some(voi) = voi {
            roles[voi] = Role::Voi;
        }

        for (state, _) in &odes {
            roles[*state] = Role::State;

            if self.initial_value(*state).is_none() {
                self.logger.add_error(format!(
                    "{} is used in an ODE, but it is not initialised.",
                    self.describe_class(*state)
                ));
                underconstrained = true;
            }
        }

        // candidates for the algebraic equations
        let rate_classes = referenced_classes(&odes.iter().map(|(_, rate)| rate).collect::<Vec<_>>());
        let mut candidates: Vec<usize> = Vec::new();

        for class in equations
            .iter()
            .flat_map(|equation| equation.classes.iter())
            .chain(rate_classes.iter())
        {
            if roles[*class] == Role::Unused && !candidates.contains(class) {
                candidates.push(*class);
            }
        }

        // classes only used to initialise states are constants too
        for (state, _) in &odes {
            if let Some(InitialValue::Variable(variable)) = self.initial_value(*state) {
                let class = self.class_of[variable];

                if roles[class] == Role::Unused && !candidates.contains(&class) {
                    candidates.push(class);
                }
            }
        }

        let matching = Matching::new(&equations, &candidates, |class| self.initial_value(class).is_none());
        let mut overconstrained = false;

        for class in &candidates {
            if self.initial_value(*class).is_none() && matching.equation_of(*class).is_none() {
                self.logger.add_error(format!("{} is not computed.", self.describe_class(*class)));
                underconstrained = true;
            }
        }

        for (index, equation) in equations.iter().enumerate() {
            if matching.variable_of[index].is_none() {
                self.logger.add_error(format!(
                    "{} makes the model overconstrained.",
                    self.describe_equation(equation.source)
                ));
                overconstrained = true;
            }
        }

        match (underconstrained, overconstrained) {
            (true, true) => return Err(ModelClass::UnsuitablyConstrained),
            (true, false) => return Err(ModelClass::Underconstrained),
            (false, true) => return Err(ModelClass::Overconstrained),
            (false, false) => {}
        }

        for class in &candidates {
            if matching.equation_of(*class).is_none() {
                roles[*class] = Role::Constant;
            }
        }

        // unused classes that are initialised are constants as well
        for (class, role) in roles.iter_mut().enumerate() {
            if *role == Role::Unused && self.initial_value(class).is_some() {
                *role = Role::Constant;
            }
        }

        let blocks = blocks(&equations, &matching.variable_of);

        for block in &blocks {
            let unknowns: Vec<usize> = block.iter().filter_map(|equation| matching.variable_of[*equation]).collect();
            let explicit = match (block.as_slice(), unknowns.as_slice()) {
                ([equation], [unknown]) => equations[*equation].explicit_value(*unknown).is_some(),
                (_, _) => false,
            };
            let constant = block.iter().all(|equation| {
                equations[*equation].classes.iter().all(|class| {
                    unknowns.contains(class) || matches!(roles[*class], Role::Constant | Role::ComputedConstant)
                })
            });

            // unknowns of non-linear systems are always algebraic
            let role = if explicit && constant { Role::ComputedConstant } else { Role::Algebraic };

            for unknown in unknowns {
                roles[unknown] = role;
            }
        }

        let layout = Layout::new(&roles, &self.representatives);
        let variables = self.variables(&layout, voi);
        let equations = self.equations(&layout, &roles, &odes, &equations, &blocks, &matching.variable_of)?;

        let has_nla_systems = equations.nla_system_count > 0;
        let class = match (odes.is_empty(), has_nla_systems) {
            (false, true) => ModelClass::Dae,
            (false, false) => ModelClass::Ode,
            (true, true) => ModelClass::Nla,
            (true, false) => ModelClass::Algebraic,
        };

        Ok((class, variables, equations))
    }

    /// Splits the equations into ODEs, by state, and the other equations,
    /// and finds the variable of integration.
    fn split_equations(&mut self) -> Result<Split, ModelClass> {
        let mut vois = Vec::new();
        let mut odes: Vec<(usize, Expr<usize>)> = Vec::new();
        let mut equations = Vec::new();
        let mut overconstrained = false;
        let mut invalid = false;

        for (source, equation) in self.model.equations.iter().enumerate() {
            let equation = &equation.equation;
            let ode = match (&equation.left, &equation.right) {
                (Expr::Variable(Term::Derivative { variable, voi }), other)
                | (other, Expr::Variable(Term::Derivative { variable, voi })) => Some((*variable, *voi, other)),
                (_, _) => None,
            };

            if let Some((variable, voi, rate)) = ode {
                let state = self.class_of[variable];
                let voi = self.class_of[voi];

                if !vois.contains(&voi) {
                    vois.push(voi);
                }

                let Some(rate) = self.without_derivatives(rate) else {
                    self.unsupported_derivative(source);
                    invalid = true;
                    continue;
                };

                if odes.iter().any(|(other, _)| *other == state) {
                    self.logger.add_error(format!(
                        "{} makes the model overconstrained.",
                        self.describe_equation(source)
                    ));
                    overconstrained = true;
                } else {
                    odes.push((state, rate));
                }
            } else {
                match (
                    self.without_derivatives(&equation.left),
                    self.without_derivatives(&equation.right),
                ) {
                    (Some(left), Some(right)) => {
                        let classes = referenced_classes(&[&left, &right]);

                        equations.push(ClassEquation {
                            source,
                            left,
                            right,
                            classes,
                        });
                    }
                    (_, _) => {
                        self.unsupported_derivative(source);
                        invalid = true;
                    }
                }
            }
        }

        if vois.len() > 1 {
            self.logger.add_error("The model has more than one variable of integration.");
            invalid = true;
        }

        let voi = vois.first().copied();

        if let Some(voi) = voi {
            if self.initial_value(voi).is_some() {
                self.logger.add_error(format!(
                    "{} is the variable of integration, so it cannot be initialised.",
                    self.describe_class(voi)
                ));
                invalid = true;
            }

            if odes.iter().any(|(state, _)| *state == voi) {
                self.logger.add_error(format!(
                    "{} is the variable of integration, so it cannot be a state.",
                    self.describe_class(voi)
                ));
                invalid = true;
            }
        }

        if invalid {
            Err(ModelClass::Invalid)
        } else if overconstrained {
            Err(ModelClass::Overconstrained)
        } else {
            Ok(Split { voi, odes, equations })
        }
    }

    fn unsupported_derivative(&mut self, source: usize) {
        self.logger.add_error(format!(
            "{} uses a derivative other than as one side of an ODE.",
            self.describe_equation(source)
        ));
    }

    /// Maps an expression onto classes, unless it contains a derivative
    fn without_derivatives(&self, expr: &Expr<Term>) -> Option<Expr<usize>> {
        let mut has_derivative = false;
        let expr = expr.map_variables(&mut |term| match term {
            Term::Variable(variable) => self.class_of[*variable],
            Term::Derivative { variable, .. } => {
                has_derivative = true;
                self.class_of[*variable]
            }
        });

        (!has_derivative).then_some(expr)
    }

    fn variables(&self, layout: &Layout, voi: Option<usize>) -> ModelVariables {
        let describe = |class: &usize| {
            let variable = &self.model.variables[self.representatives[*class]];

            VariableDescriptor::new(&variable.component, &variable.name, &variable.units)
        };

        ModelVariables {
            voi: voi.as_ref().map(describe),
            states: layout.states.iter().map(describe).collect(),
            constants: layout.constants.iter().map(describe).collect(),
            computed_constants: layout.computed_constants.iter().map(describe).collect(),
            algebraic: layout.algebraic.iter().map(describe).collect(),
        }
    }

    /// The value of a constant, following CellML 2.0 initialisations by
    /// other constants
    fn constant_value(&mut self, class: usize, roles: &[Role]) -> Result<f64, ModelClass> {
        let mut seen = HashSet::new();
        let mut current = class;

        loop {
            match self.initial_value(current) {
                Some(InitialValue::Number(value)) => return Ok(value),
                Some(InitialValue::Variable(variable)) => {
                    let next = self.class_of[variable];

                    if roles[next] != Role::Constant || !seen.insert(next) {
                        self.not_a_constant(class, variable);
                        return Err(ModelClass::Invalid);
                    }

                    current = next;
                }
                None => return Ok(f64::NAN),
            }
        }
    }

    fn not_a_constant(&mut self, class: usize, variable: usize) {
        self.logger.add_error(format!(
            "{} is initialised using variable '{}', which is not a constant.",
            self.describe_class(class),
            self.model.variables[variable].name
        ));
    }

    fn equations(
        &mut self,
        layout: &Layout,
        roles: &[Role],
        odes: &[(usize, Expr<usize>)],
        equations: &[ClassEquation],
        blocks: &[Vec<usize>],
        variable_of: &[Option<usize>],
    ) -> Result<ModelEquations, ModelClass> {
        let to_model = |expr: &Expr<usize>| expr.map_variables(&mut |class| layout.reference(*class));

        let mut constant_values = Vec::with_capacity(layout.constants.len());

        for class in &layout.constants {
            constant_values.push(self.constant_value(*class, roles)?);
        }

        let mut state_initial_values = Vec::with_capacity(layout.states.len());

        for state in &layout.states {
            let initial_value = match self.initial_value(*state) {
                Some(InitialValue::Number(value)) => Expr::Number(value),
                Some(InitialValue::Variable(variable)) => {
                    let class = self.class_of[variable];

                    if roles[class] != Role::Constant {
                        self.not_a_constant(*state, variable);
                        return Err(ModelClass::Invalid);
                    }

                    Expr::Variable(layout.reference(class))
                }
                None => Expr::Number(f64::NAN),
            };

            state_initial_values.push(initial_value);
        }

        let rates = layout
            .states
            .iter()
            .map(|state| {
                odes.iter()
                    .find(|(other, _)| other == state)
                    .map_or(Expr::Number(f64::NAN), |(_, rate)| to_model(rate))
            })
            .collect();

        let mut initial_guesses = Vec::new();
        let mut computed_constant_steps = Vec::new();
        let mut algebraic_steps = Vec::new();
        let mut nla_system_count = 0;

        for block in blocks {
            let mut unknowns: Vec<usize> = block.iter().filter_map(|equation| variable_of[*equation]).collect();

            unknowns.sort_by_key(|unknown| self.representatives[*unknown]);

            let explicit = match (block.as_slice(), unknowns.as_slice()) {
                ([equation], [unknown]) => equations[*equation].explicit_value(*unknown).map(|expr| (*unknown, expr)),
                (_, _) => None,
            };

            let step = if let Some((unknown, expr)) = explicit {
                Step::Assign {
                    target: layout.reference(unknown),
                    expr: to_model(expr),
                }
            } else {
                for unknown in &unknowns {
                    if self.initial_value(*unknown).is_some() {
                        initial_guesses.push((layout.reference(*unknown), self.constant_value(*unknown, roles)?));
                    }
                }

                nla_system_count += 1;

                Step::Solve(NlaBlock {
                    index: nla_system_count - 1,
                    unknowns: unknowns.iter().map(|unknown| layout.reference(*unknown)).collect(),
                    residuals: block
                        .iter()
                        .map(|equation| to_model(&equations[*equation].residual()))
                        .collect(),
                })
            };

            match unknowns.first().map(|unknown| roles[*unknown]) {
                Some(Role::ComputedConstant) => computed_constant_steps.push(step),
                Some(Role::Algebraic | Role::Unused | Role::Voi | Role::State | Role::Constant) | None => {
                    algebraic_steps.push(step);
                }
            }
        }

        Ok(ModelEquations {
            state_initial_values,
            constant_values,
            initial_guesses,
            computed_constant_steps,
            rates,
            algebraic_steps,
            nla_system_count,
        })
    }
}

fn find(parents: &mut [usize], mut variable: usize) -> usize {
    while parents[variable] != variable {
        parents[variable] = parents[parents[variable]];
        variable = parents[variable];
    }

    variable
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();

    chars
        .next()
        .map_or_else(String::new, |first| first.to_lowercase().chain(chars).collect())
}

/// A maximum matching between the algebraic equations and the classes they
/// can compute.
struct Matching {
    /// The class computed by every equation
    variable_of: Vec<Option<usize>>,
}

impl Matching {
    /// Classes for which `required` holds are matched first, so that no other
    /// class can take their equation.
    fn new(equations: &[ClassEquation], candidates: &[usize], required: impl Fn(usize) -> bool) -> Self {
        let mut matching = Self {
            variable_of: vec![None; equations.len()],
        };
        let neighbours = |equation: usize| {
            equations[equation]
                .classes
                .iter()
                .copied()
                .filter(|class| candidates.contains(class))
                .collect::<Vec<_>>()
        };
        let neighbours: Vec<Vec<usize>> = (0..equations.len()).map(neighbours).collect();

        for class in candidates.iter().copied().filter(|class| required(*class)) {
            let mut visited = vec![false; equations.len()];

            matching.augment_from_class(class, &neighbours, &mut visited);
        }

        for equation in 0..equations.len() {
            if matching.variable_of[equation].is_none() {
                let mut visited = vec![false; equations.len()];

                matching.augment_from_equation(equation, &neighbours, &mut visited);
            }
        }

        matching
    }

    fn equation_of(&self, class: usize) -> Option<usize> {
        self.variable_of.iter().position(|variable| *variable == Some(class))
    }

    fn augment_from_class(&mut self, class: usize, neighbours: &[Vec<usize>], visited: &mut [bool]) -> bool {
        for equation in 0..neighbours.len() {
            if visited[equation] || !neighbours[equation].contains(&class) {
                continue;
            }

            visited[equation] = true;

            let free = match self.variable_of[equation] {
                None => true,
                Some(other) => self.augment_from_class(other, neighbours, visited),
            };

            if free {
                self.variable_of[equation] = Some(class);
                return true;
            }
        }

        false
    }

    fn augment_from_equation(&mut self, equation: usize, neighbours: &[Vec<usize>], visited: &mut [bool]) -> bool {
        visited[equation] = true;

        for class in &neighbours[equation] {
            match self.equation_of(*class) {
                None => {
                    self.variable_of[equation] = Some(*class);
                    return true;
                }
                Some(other) if !visited[other] => {
                    if self.augment_from_equation(other, neighbours, visited) {
                        self.variable_of[equation] = Some(*class);
                        return true;
                    }
                }
                Some(_) => {}
            }
        }

        false
    }
}

/// Groups the matched equations into strongly connected blocks, every block
/// coming after the blocks it depends on.
fn blocks(equations: &[ClassEquation], variable_of: &[Option<usize>]) -> Vec<Vec<usize>> {
    let dependencies: Vec<Vec<usize>> = equations
        .iter()
        .enumerate()
        .map(|(index, equation)| {
            equation
                .classes
                .iter()
                .filter_map(|class| variable_of.iter().position(|variable| *variable == Some(*class)))
                .filter(|other| *other != index)
                .collect()
        })
        .collect();

    let mut tarjan = Tarjan {
        dependencies: &dependencies,
        index: vec![None; equations.len()],
        low_link: vec![0; equations.len()],
        on_stack: vec![false; equations.len()],
        stack: Vec::new(),
        counter: 0,
        blocks: Vec::new(),
    };

    for equation in 0..equations.len() {
        if tarjan.index[equation].is_none() {
            tarjan.visit(equation);
        }
    }

    tarjan.blocks
}

struct Tarjan<'a> {
    dependencies: &'a [Vec<usize>],
    index: Vec<Option<usize>>,
    low_link: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    counter: usize,
    blocks: Vec<Vec<usize>>,
}

impl Tarjan<'_> {
    fn visit(&mut self, node: usize) {
        self.index[node] = Some(self.counter);
        self.low_link[node] = self.counter;
        self.counter += 1;
        self.stack.push(node);
        self.on_stack[node] = true;

        let dependencies = self.dependencies;

        for dependency in &dependencies[node] {
            match self.index[*dependency] {
                None => {
                    self.visit(*dependency);
                    self.low_link[node] = self.low_link[node].min(self.low_link[*dependency]);
                }
                Some(index) if self.on_stack[*dependency] => {
                    self.low_link[node] = self.low_link[node].min(index);
                }
                Some(_) => {}
            }
        }

        if Some(self.low_link[node]) == self.index[node] {
            let mut block = Vec::new();

            while let Some(member) = self.stack.pop() {
                self.on_stack[member] = false;
                block.push(member);

                if member == node {
                    break;
                }
            }

            block.sort_unstable();
            self.blocks.push(block);
        }
    }
}

/// Where every class lives in the arrays of the model.
struct Layout {
    states: Vec<usize>,
    constants: Vec<usize>,
    computed_constants: Vec<usize>,
    algebraic: Vec<usize>,
    references: Vec<VariableRef>,
}

impl Layout {
    fn new(roles: &[Role], representatives: &[usize]) -> Self {
        let mut classes: Vec<usize> = (0..roles.len()).collect();

        classes.sort_by_key(|class| representatives[*class]);

        let mut layout = Self {
            states: Vec::new(),
            constants: Vec::new(),
            computed_constants: Vec::new(),
            algebraic: Vec::new(),
            references: vec![VariableRef::Voi; roles.len()],
        };

        for class in classes {
            let (list, reference): (&mut Vec<usize>, fn(usize) -> VariableRef) = match roles[class] {
                Role::Unused | Role::Voi => continue,
                Role::State => (&mut layout.states, VariableRef::State),
                Role::Constant => (&mut layout.constants, VariableRef::Constant),
                Role::ComputedConstant => (&mut layout.computed_constants, VariableRef::ComputedConstant),
                Role::Algebraic => (&mut layout.algebraic, VariableRef::Algebraic),
            };

            layout.references[class] = reference(list.len());
            list.push(class);
        }

        layout
    }

    fn reference(&self, class: usize) -> VariableRef {
        self.references[class]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        evaluator::{EvaluationMode, VariableValues},
        test::{
            DAE_MODEL, DECAY_MODEL, NLA_MODEL, OVERCONSTRAINED_MODEL, UNDERCONSTRAINED_MODEL,
            UNSUITABLY_CONSTRAINED_MODEL,
        },
    };
    use opencor_shared::issue::HasIssues;

    fn analyse(document: &str) -> AnalysedModel {
        CellmlAnalyser::new().analyse(document.as_bytes())
    }

    fn errors(model: &AnalysedModel) -> Vec<String> {
        model
            .issues()
            .iter()
            .map(|issue| issue.description().to_string())
            .collect()
    }

    fn names(descriptors: &[VariableDescriptor]) -> Vec<String> {
        descriptors.iter().map(VariableDescriptor::qualified_name).collect()
    }

    #[test]
    fn analyses_an_ode_model() {
        let model = analyse(DECAY_MODEL);
        let variables = model.variables();

        assert_eq!(model.class(), ModelClass::Ode);
        assert_eq!(
            variables.voi.as_ref().map(VariableDescriptor::qualified_name).as_deref(),
            Some("environment/time")
        );
        assert_eq!(names(&variables.states), ["main/x"]);
        assert_eq!(names(&variables.constants), ["main/k"]);
        assert_eq!(names(&variables.computed_constants), ["main/half_life"]);
        assert_eq!(names(&variables.algebraic), ["main/y"]);
        assert_eq!(variables.states[0].units(), "millimolar");
    }

    #[test]
    fn evaluates_an_ode_model() {
        let model = analyse(DECAY_MODEL);

        for mode in [EvaluationMode::Compiled, EvaluationMode::Interpreted] {
            let evaluator = model.evaluator(mode).expect("the model is valid");
            let mut states = [0.0];
            let mut rates = [0.0];
            let mut variables: VariableValues = model.variable_values();
            let mut nla = |_: usize, _: &mut dyn FnMut(&[f64], &mut [f64]), _: &mut [f64]| {};

            evaluator.initialise_variables(0.0, &mut states, &mut variables);
            evaluator.compute_computed_constants(&mut variables, &mut nla);
            evaluator.compute_rates(0.0, &states, &mut rates, &mut variables, &mut nla);
            evaluator.compute_variables(0.0, &states, &mut variables, &mut nla);

            assert!((states[0] - 2.0).abs() < f64::EPSILON);
            assert!((rates[0] + 1.0).abs() < f64::EPSILON);
            assert!((variables.computed_constants[0] - 2.0_f64.ln() / 0.5).abs() < 1e-12);
            assert!((variables.algebraic[0] - 4.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn analyses_an_nla_model() {
        let model = analyse(NLA_MODEL);
        let equations = model.equations().expect("the model is valid");

        assert_eq!(model.class(), ModelClass::Nla);
        assert_eq!(model.nla_system_count(), 1);
        assert_eq!(names(&model.variables().algebraic), ["main/x", "main/y"]);
        assert_eq!(equations.initial_guesses(), [(VariableRef::Algebraic(0), 1.0)]);

        let [Step::Solve(block)] = equations.algebraic_steps() else {
            panic!("expected one non-linear system");
        };

        assert_eq!(block.unknowns(), [VariableRef::Algebraic(0), VariableRef::Algebraic(1)]);
    }

    #[test]
    fn implicit_equations_of_constants_are_solved() {
        let model = analyse(
            r#"<model xmlns="http://www.cellml.org/cellml/2.0#" name="cubic">
  <component name="main">
    <variable name="a" units="dimensionless" initial_value="2"/>
    <variable name="z" units="dimensionless" initial_value="0.5"/>
    <variable name="w" units="dimensionless"/>
    <math xmlns="http://www.w3.org/1998/Math/MathML">
      <apply><eq/><apply><plus/><apply><power/><ci>z</ci><cn>3</cn></apply><ci>z</ci></apply><ci>a</ci></apply>
      <apply><eq/><ci>w</ci><apply><times/><cn>2</cn><ci>a</ci></apply></apply>
    </math>
  </component>
</model>"#,
        );

        assert_eq!(model.class(), ModelClass::Nla);
        assert_eq!(names(&model.variables().constants), ["main/a"]);
        assert_eq!(names(&model.variables().computed_constants), ["main/w"]);
        assert_eq!(names(&model.variables().algebraic), ["main/z"]);
    }

    #[test]
    fn analyses_a_dae_model() {
        let model = analyse(DAE_MODEL);

        assert_eq!(model.class(), ModelClass::Dae);
        assert_eq!(names(&model.variables().states), ["main/x"]);
        assert_eq!(names(&model.variables().algebraic), ["main/z"]);
    }

    #[test]
    fn reports_underconstrained_models() {
        let model = analyse(UNDERCONSTRAINED_MODEL);

        assert_eq!(model.class(), ModelClass::Underconstrained);
        assert!(model.evaluator(EvaluationMode::Compiled).is_none());
        assert_eq!(errors(&model), ["Variable 'b' in component 'main' is not computed."]);
    }

    #[test]
    fn reports_overconstrained_models() {
        let model = analyse(OVERCONSTRAINED_MODEL);

        assert_eq!(model.class(), ModelClass::Overconstrained);
        assert_eq!(errors(&model), ["Equation 2 in component 'main' makes the model overconstrained."]);
    }

    #[test]
    fn reports_unsuitably_constrained_models() {
        let model = analyse(UNSUITABLY_CONSTRAINED_MODEL);

        assert_eq!(model.class(), ModelClass::UnsuitablyConstrained);
        assert_eq!(model.issue_count(), 2);
    }

    #[test]
    fn reports_uninitialised_states() {
        let model = analyse(&DECAY_MODEL.replace(r#"initial_value="2""#, ""));

        assert_eq!(model.class(), ModelClass::Underconstrained);
        assert_eq!(
            errors(&model),
            ["Variable 'x' in component 'main' is used in an ODE, but it is not initialised."]
        );
    }

    #[test]
    fn reports_unparsable_models() {
        let model = analyse("<model");

        assert_eq!(model.class(), ModelClass::Invalid);
        assert!(errors(&model)[0].starts_with("The model could not be parsed ("));
    }
}
