use std::fmt;

use opencor_shared::{
    issue::Logger,
    number::{format_boolean, format_double, parse_boolean, parse_double, parse_integer},
};

use crate::{
    info::{PropertyValues, SolverInfo, SolverProperty, SolverPropertyType, SolverType},
    kernel::{AdaptiveKernel, AdaptiveMethod, AdaptiveOptions, KrylovMethod, LinearMethod},
    kisao,
    solver::{bandwidth_error, choices_warning, numeric_warning},
};

const DEFAULT_MAXIMUM_STEP: f64 = 0.0;
const DEFAULT_MAXIMUM_NUMBER_OF_STEPS: i64 = 500;
const DEFAULT_TOLERANCE: f64 = 1.0e-7;

static PROPERTIES: [SolverProperty; 11] = [
    SolverProperty::new(
        SolverPropertyType::DoubleGe0,
        kisao::MAXIMUM_STEP,
        "Maximum step",
        &[],
        "0",
        true,
    ),
    SolverProperty::new(
        SolverPropertyType::IntegerGt0,
        kisao::MAXIMUM_NUMBER_OF_STEPS,
        "Maximum number of steps",
        &[],
        "500",
        false,
    ),
    SolverProperty::new(
        SolverPropertyType::List,
        kisao::INTEGRATION_METHOD,
        "Integration method",
        &["Adams-Moulton", "BDF"],
        "BDF",
        false,
    ),
    SolverProperty::new(
        SolverPropertyType::List,
        kisao::ITERATION_TYPE,
        "Iteration type",
        &["Functional", "Newton"],
        "Newton",
        false,
    ),
    SolverProperty::new(
        SolverPropertyType::List,
        kisao::LINEAR_SOLVER,
        "Linear solver",
        &["Dense", "Banded", "Diagonal", "GMRES", "BiCGStab", "TFQMR"],
        "Dense",
        false,
    ),
    SolverProperty::new(
        SolverPropertyType::List,
        kisao::PRECONDITIONER,
        "Preconditioner",
        &["No", "Banded"],
        "Banded",
        false,
    ),
    SolverProperty::new(
        SolverPropertyType::IntegerGe0,
        kisao::UPPER_HALF_BANDWIDTH,
        "Upper half-bandwidth",
        &[],
        "0",
        false,
    ),
    SolverProperty::new(
        SolverPropertyType::IntegerGe0,
        kisao::LOWER_HALF_BANDWIDTH,
        "Lower half-bandwidth",
        &[],
        "0",
        false,
    ),
    SolverProperty::new(
        SolverPropertyType::DoubleGe0,
        kisao::RELATIVE_TOLERANCE,
        "Relative tolerance",
        &[],
        "1e-07",
        false,
    ),
    SolverProperty::new(
        SolverPropertyType::DoubleGe0,
        kisao::ABSOLUTE_TOLERANCE,
        "Absolute tolerance",
        &[],
        "1e-07",
        false,
    ),
    SolverProperty::new(
        SolverPropertyType::Boolean,
        kisao::INTERPOLATE_SOLUTION,
        "Interpolate solution",
        &[],
        "true",
        false,
    ),
];

pub static INFO: SolverInfo = SolverInfo::new(
    SolverType::Ode,
    kisao::CVODE,
    "CVODE",
    &PROPERTIES,
    hidden_properties,
);

/// The integration method of the CVODE solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IntegrationMethod {
    /// Non-stiff problems
    AdamsMoulton,
    /// Stiff problems
    #[default]
    Bdf,
}

/// How the implicit stage equations are solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IterationType {
    /// Fixed-point iteration, no linear solver involved
    Functional,
    /// Newton iteration
    #[default]
    Newton,
}

/// The linear solver used by Newton iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LinearSolver {
    /// Dense LU factorisation
    #[default]
    Dense,
    /// Banded LU factorisation
    Banded,
    /// Diagonal approximation of the Jacobian
    Diagonal,
    /// Restarted GMRES (Krylov)
    Gmres,
    /// BiCGStab (Krylov)
    BiCgStab,
    /// TFQMR (Krylov)
    Tfqmr,
}

/// The preconditioner used with Krylov linear solvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Preconditioner {
    /// No preconditioning
    No,
    /// Banded preconditioner
    #[default]
    Banded,
}

impl IntegrationMethod {
    /// Returns the name of the integration method
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AdamsMoulton => "Adams-Moulton",
            Self::Bdf => "BDF",
        }
    }

    /// Parses the name of an integration method
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Adams-Moulton" => Some(Self::AdamsMoulton),
            "BDF" => Some(Self::Bdf),
            _ => None,
        }
    }
}

impl IterationType {
    /// Returns the name of the iteration type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Functional => "Functional",
            Self::Newton => "Newton",
        }
    }

    /// Parses the name of an iteration type
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Functional" => Some(Self::Functional),
            "Newton" => Some(Self::Newton),
            _ => None,
        }
    }
}

impl LinearSolver {
    /// Returns the name of the linear solver
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dense => "Dense",
            Self::Banded => "Banded",
            Self::Diagonal => "Diagonal",
            Self::Gmres => "GMRES",
            Self::BiCgStab => "BiCGStab",
            Self::Tfqmr => "TFQMR",
        }
    }

    /// Parses the name of a linear solver
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Dense" => Some(Self::Dense),
            "Banded" => Some(Self::Banded),
            "Diagonal" => Some(Self::Diagonal),
            "GMRES" => Some(Self::Gmres),
            "BiCGStab" => Some(Self::BiCgStab),
            "TFQMR" => Some(Self::Tfqmr),
            _ => None,
        }
    }

    /// Returns the Krylov method behind the linear solver, if it is one
    #[must_use]
    pub const fn krylov_method(self) -> Option<KrylovMethod> {
        match self {
            Self::Gmres => Some(KrylovMethod::Gmres),
            Self::BiCgStab => Some(KrylovMethod::BiCgStab),
            Self::Tfqmr => Some(KrylovMethod::Tfqmr),
            Self::Dense | Self::Banded | Self::Diagonal => None,
        }
    }
}

impl Preconditioner {
    /// Returns the name of the preconditioner
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::No => "No",
            Self::Banded => "Banded",
        }
    }

    /// Parses the name of a preconditioner (`None` is accepted for `No`)
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "No" | "None" => Some(Self::No),
            "Banded" => Some(Self::Banded),
            _ => None,
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

display_as_str!(IntegrationMethod, IterationType, LinearSolver, Preconditioner);

/// The properties of the CVODE solver.
#[derive(Debug, Clone, PartialEq)]
pub struct CvodeProperties {
    /// Maximum step (0 means unbounded)
    pub maximum_step: f64,
    /// Maximum number of steps taken to reach an output point
    pub maximum_number_of_steps: i64,
    /// Integration method
    pub integration_method: IntegrationMethod,
    /// Iteration type
    pub iteration_type: IterationType,
    /// Linear solver (Newton iteration only)
    pub linear_solver: LinearSolver,
    /// Preconditioner (Krylov linear solvers only)
    pub preconditioner: Preconditioner,
    /// Upper half-bandwidth of the banded linear solver or preconditioner
    pub upper_half_bandwidth: i64,
    /// Lower half-bandwidth of the banded linear solver or preconditioner
    pub lower_half_bandwidth: i64,
    /// Relative tolerance
    pub relative_tolerance: f64,
    /// Absolute tolerance
    pub absolute_tolerance: f64,
    /// Whether output points are interpolated rather than stepped onto
    pub interpolate_solution: bool,
}

impl Default for CvodeProperties {
    fn default() -> Self {
        Self {
            maximum_step: DEFAULT_MAXIMUM_STEP,
            maximum_number_of_steps: DEFAULT_MAXIMUM_NUMBER_OF_STEPS,
            integration_method: IntegrationMethod::default(),
            iteration_type: IterationType::default(),
            linear_solver: LinearSolver::default(),
            preconditioner: Preconditioner::default(),
            upper_half_bandwidth: 0,
            lower_half_bandwidth: 0,
            relative_tolerance: DEFAULT_TOLERANCE,
            absolute_tolerance: DEFAULT_TOLERANCE,
            interpolate_solution: true,
        }
    }
}

impl CvodeProperties {
    pub(crate) fn value(&self, id: &str) -> Option<String> {
        let value = match id {
            kisao::MAXIMUM_STEP => format_double(self.maximum_step),
            kisao::MAXIMUM_NUMBER_OF_STEPS => self.maximum_number_of_steps.to_string(),
            kisao::INTEGRATION_METHOD => self.integration_method.to_string(),
            kisao::ITERATION_TYPE => self.iteration_type.to_string(),
            kisao::LINEAR_SOLVER => self.linear_solver.to_string(),
            kisao::PRECONDITIONER => self.preconditioner.to_string(),
            kisao::UPPER_HALF_BANDWIDTH => self.upper_half_bandwidth.to_string(),
            kisao::LOWER_HALF_BANDWIDTH => self.lower_half_bandwidth.to_string(),
            kisao::RELATIVE_TOLERANCE => format_double(self.relative_tolerance),
            kisao::ABSOLUTE_TOLERANCE => format_double(self.absolute_tolerance),
            kisao::INTERPOLATE_SOLUTION => format_boolean(self.interpolate_solution).to_string(),
            _ => return None,
        };

        Some(value)
    }

    /// Sets a property from its textual value, returning `false` (and
    /// leaving the property untouched) if the value cannot be parsed.
    pub(crate) fn set_value(&mut self, id: &str, value: &str) -> bool {
        match id {
            kisao::MAXIMUM_STEP => parse_double(value).map(|value| self.maximum_step = value),
            kisao::MAXIMUM_NUMBER_OF_STEPS => {
                parse_integer(value).map(|value| self.maximum_number_of_steps = value)
            }
            kisao::INTEGRATION_METHOD => {
                IntegrationMethod::from_name(value).map(|value| self.integration_method = value)
            }
            kisao::ITERATION_TYPE => {
                IterationType::from_name(value).map(|value| self.iteration_type = value)
            }
            kisao::LINEAR_SOLVER => {
                LinearSolver::from_name(value).map(|value| self.linear_solver = value)
            }
            kisao::PRECONDITIONER => {
                Preconditioner::from_name(value).map(|value| self.preconditioner = value)
            }
            kisao::UPPER_HALF_BANDWIDTH => {
                parse_integer(value).map(|value| self.upper_half_bandwidth = value)
            }
            kisao::LOWER_HALF_BANDWIDTH => {
                parse_integer(value).map(|value| self.lower_half_bandwidth = value)
            }
            kisao::RELATIVE_TOLERANCE => {
                parse_double(value).map(|value| self.relative_tolerance = value)
            }
            kisao::ABSOLUTE_TOLERANCE => {
                parse_double(value).map(|value| self.absolute_tolerance = value)
            }
            kisao::INTERPOLATE_SOLUTION => {
                parse_boolean(value).map(|value| self.interpolate_solution = value)
            }
            _ => None,
        }
        .is_some()
    }

    /// Applies a SED-ML algorithm parameter. Invalid values are replaced by
    /// the default and reported as a warning.
    pub(crate) fn populate(&mut self, id: &str, value: &str, logger: &mut Logger) {
        match id {
            kisao::MAXIMUM_STEP => {
                self.maximum_step = match parse_double(value) {
                    Some(step) if step >= 0.0 => step,
                    _ => {
                        logger.add_warning(numeric_warning(
                            "maximum step",
                            id,
                            value,
                            "greater or equal to 0",
                            &format_double(DEFAULT_MAXIMUM_STEP),
                        ));
                        DEFAULT_MAXIMUM_STEP
                    }
                };
            }
            kisao::MAXIMUM_NUMBER_OF_STEPS => {
                self.maximum_number_of_steps = match parse_integer(value) {
                    Some(steps) if steps > 0 => steps,
                    _ => {
                        logger.add_warning(numeric_warning(
                            "maximum number of steps",
                            id,
                            value,
                            "greater than 0",
                            &DEFAULT_MAXIMUM_NUMBER_OF_STEPS.to_string(),
                        ));
                        DEFAULT_MAXIMUM_NUMBER_OF_STEPS
                    }
                };
            }
            kisao::INTEGRATION_METHOD => {
                self.integration_method = IntegrationMethod::from_name(value).unwrap_or_else(|| {
                    logger.add_warning(choices_warning(
                        "integration method",
                        id,
                        value,
                        &["BDF", "Adams-Moulton"],
                        IntegrationMethod::default().as_str(),
                    ));
                    IntegrationMethod::default()
                });
            }
            kisao::ITERATION_TYPE => {
                self.iteration_type = IterationType::from_name(value).unwrap_or_else(|| {
                    logger.add_warning(choices_warning(
                        "iteration type",
                        id,
                        value,
                        &["Functional", "Newton"],
                        IterationType::default().as_str(),
                    ));
                    IterationType::default()
                });
            }
            kisao::LINEAR_SOLVER => {
                self.linear_solver = LinearSolver::from_name(value).unwrap_or_else(|| {
                    logger.add_warning(choices_warning(
                        "linear solver",
                        id,
                        value,
                        &["Dense", "Banded", "Diagonal", "GMRES", "BiCGStab", "TFQMR"],
                        LinearSolver::default().as_str(),
                    ));
                    LinearSolver::default()
                });
            }
            kisao::PRECONDITIONER => {
                self.preconditioner = Preconditioner::from_name(value).unwrap_or_else(|| {
                    logger.add_warning(choices_warning(
                        "preconditioner",
                        id,
                        value,
                        &["No", "Banded"],
                        Preconditioner::default().as_str(),
                    ));
                    Preconditioner::default()
                });
            }
            kisao::UPPER_HALF_BANDWIDTH => {
                self.upper_half_bandwidth = populate_bandwidth("upper half-bandwidth", id, value, logger);
            }
            kisao::LOWER_HALF_BANDWIDTH => {
                self.lower_half_bandwidth = populate_bandwidth("lower half-bandwidth", id, value, logger);
            }
            kisao::RELATIVE_TOLERANCE => {
                self.relative_tolerance = populate_tolerance("relative tolerance", id, value, logger);
            }
            kisao::ABSOLUTE_TOLERANCE => {
                self.absolute_tolerance = populate_tolerance("absolute tolerance", id, value, logger);
            }
            kisao::INTERPOLATE_SOLUTION => {
                self.interpolate_solution = parse_boolean(value).unwrap_or_else(|| {
                    logger.add_warning(format!(
                        "The interpolate solution parameter ('{id}') cannot be equal to '{value}'. It must be equal to 'true' or 'false'. A value of true will be used instead."
                    ));
                    true
                });
            }
            _ => logger.add_warning(format!(
                "The parameter '{id}' is not recognised. It will be ignored."
            )),
        }
    }

    const fn needs_bandwidths(&self) -> bool {
        match self.iteration_type {
            IterationType::Functional => false,
            IterationType::Newton => match self.linear_solver {
                LinearSolver::Banded => true,
                LinearSolver::Gmres | LinearSolver::BiCgStab | LinearSolver::Tfqmr => {
                    matches!(self.preconditioner, Preconditioner::Banded)
                }
                LinearSolver::Dense | LinearSolver::Diagonal => false,
            },
        }
    }

    /// Returns the errors that prevent the solver from integrating a system
    /// of the given size.
    pub(crate) fn validate(&self, size: usize) -> Vec<String> {
        let mut errors = Vec::new();

        if self.maximum_step < 0.0 {
            errors.push(format!(
                "The maximum step cannot be equal to {}. It must be greater or equal to 0.",
                format_double(self.maximum_step)
            ));
        }

        if self.maximum_number_of_steps <= 0 {
            errors.push(format!(
                "The maximum number of steps cannot be equal to {}. It must be greater than 0.",
                self.maximum_number_of_steps
            ));
        }

        if self.needs_bandwidths() {
            errors.extend(bandwidth_error("upper half-bandwidth", self.upper_half_bandwidth, size));
            errors.extend(bandwidth_error("lower half-bandwidth", self.lower_half_bandwidth, size));
        }

        if self.relative_tolerance < 0.0 {
            errors.push(format!(
                "The relative tolerance cannot be equal to {}. It must be greater or equal to 0.",
                format_double(self.relative_tolerance)
            ));
        }

        if self.absolute_tolerance < 0.0 {
            errors.push(format!(
                "The absolute tolerance cannot be equal to {}. It must be greater or equal to 0.",
                format_double(self.absolute_tolerance)
            ));
        }

        errors
    }

    /// Builds the integrator described by the properties. The properties are
    /// expected to have been validated.
    pub(crate) fn kernel(&self) -> AdaptiveKernel {
        let upper = usize::try_from(self.upper_half_bandwidth).unwrap_or(0);
        let lower = usize::try_from(self.lower_half_bandwidth).unwrap_or(0);

        let method = match self.integration_method {
            IntegrationMethod::AdamsMoulton => AdaptiveMethod::DormandPrince,
            IntegrationMethod::Bdf => {
                let linear_method = match self.iteration_type {
                    IterationType::Functional => None,
                    IterationType::Newton => Some(match self.linear_solver {
                        LinearSolver::Dense => LinearMethod::Dense,
                        LinearSolver::Banded => LinearMethod::Banded { upper, lower },
                        LinearSolver::Diagonal => LinearMethod::Diagonal,
                        LinearSolver::Gmres | LinearSolver::BiCgStab | LinearSolver::Tfqmr => {
                            LinearMethod::Krylov {
                                method: self.linear_solver.krylov_method().unwrap_or(KrylovMethod::Gmres),
                                preconditioner: match self.preconditioner {
                                    Preconditioner::No => None,
                                    Preconditioner::Banded => Some((upper, lower)),
                                },
                            }
                        }
                    }),
                };

                AdaptiveMethod::Sdirk { linear_method }
            }
        };

        AdaptiveKernel::new(
            method,
            AdaptiveOptions {
                maximum_step: self.maximum_step,
                maximum_number_of_steps: usize::try_from(self.maximum_number_of_steps).unwrap_or(1),
                relative_tolerance: self.relative_tolerance,
                absolute_tolerance: self.absolute_tolerance,
                interpolate_solution: self.interpolate_solution,
            },
        )
    }
}

fn populate_bandwidth(name: &str, id: &str, value: &str, logger: &mut Logger) -> i64 {
    match parse_integer(value) {
        Some(bandwidth) if bandwidth >= 0 => bandwidth,
        _ => {
            logger.add_warning(numeric_warning(name, id, value, "greater or equal to 0", "0"));
            0
        }
    }
}

fn populate_tolerance(name: &str, id: &str, value: &str, logger: &mut Logger) -> f64 {
    match parse_double(value) {
        Some(tolerance) if tolerance >= 0.0 => tolerance,
        _ => {
            logger.add_warning(numeric_warning(
                name,
                id,
                value,
                "greater or equal to 0",
                &format_double(DEFAULT_TOLERANCE),
            ));
            DEFAULT_TOLERANCE
        }
    }
}

fn hidden_properties(values: &PropertyValues<'_>) -> Vec<&'static str> {
    let bandwidths = [kisao::UPPER_HALF_BANDWIDTH, kisao::LOWER_HALF_BANDWIDTH];

    match values.get(kisao::ITERATION_TYPE).and_then(IterationType::from_name) {
        Some(IterationType::Functional) => vec![
            kisao::LINEAR_SOLVER,
            kisao::PRECONDITIONER,
            kisao::UPPER_HALF_BANDWIDTH,
            kisao::LOWER_HALF_BANDWIDTH,
        ],
        Some(IterationType::Newton) | None => {
            match values.get(kisao::LINEAR_SOLVER).and_then(LinearSolver::from_name) {
                Some(LinearSolver::Dense | LinearSolver::Diagonal) => {
                    let mut hidden = vec![kisao::PRECONDITIONER];
                    hidden.extend(bandwidths);
                    hidden
                }
                Some(LinearSolver::Banded) => vec![kisao::PRECONDITIONER],
                Some(LinearSolver::Gmres | LinearSolver::BiCgStab | LinearSolver::Tfqmr) => {
                    match values.get(kisao::PRECONDITIONER).and_then(Preconditioner::from_name) {
                        Some(Preconditioner::No) => bandwidths.to_vec(),
                        Some(Preconditioner::Banded) | None => Vec::new(),
                    }
                }
                None => Vec::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;

    fn hidden_names(values: &[(&str, &str)]) -> Vec<&'static str> {
        let values: IndexMap<String, String> = values
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();

        INFO.hidden_properties(&values)
            .into_iter()
            .map(SolverProperty::name)
            .collect()
    }

    const PRECONDITIONER_AND_BANDWIDTHS: [&str; 3] =
        ["Preconditioner", "Upper half-bandwidth", "Lower half-bandwidth"];

    #[test]
    fn nothing_hidden_without_values() {
        assert!(hidden_names(&[]).is_empty());
        assert!(hidden_names(&[("Iteration type", "Newton")]).is_empty());
    }

    #[test]
    fn functional_iteration_hides_linear_solver_settings() {
        assert_eq!(
            hidden_names(&[("Iteration type", "Functional")]),
            [
                "Linear solver",
                "Preconditioner",
                "Upper half-bandwidth",
                "Lower half-bandwidth"
            ]
        );

        // the linear solver does not matter once the iteration is functional
        assert_eq!(
            hidden_names(&[("KISAO:0000476", "Functional"), ("Linear solver", "GMRES")]).len(),
            4
        );
    }

    #[test]
    fn direct_linear_solvers_hide_preconditioner() {
        let table = [
            ("Dense", PRECONDITIONER_AND_BANDWIDTHS.to_vec()),
            ("Diagonal", PRECONDITIONER_AND_BANDWIDTHS.to_vec()),
            ("Banded", vec!["Preconditioner"]),
        ];

        for (linear_solver, expected) in table {
            assert_eq!(
                hidden_names(&[("Iteration type", "Newton"), ("Linear solver", linear_solver)]),
                expected,
                "linear solver {linear_solver}"
            );
        }
    }

    #[test]
    fn krylov_linear_solvers_depend_on_preconditioner() {
        for linear_solver in ["GMRES", "BiCGStab", "TFQMR"] {
            assert!(
                hidden_names(&[("Iteration type", "Newton"), ("Linear solver", linear_solver)]).is_empty()
            );
            assert_eq!(
                hidden_names(&[
                    ("Iteration type", "Newton"),
                    ("Linear solver", linear_solver),
                    ("Preconditioner", "No"),
                ]),
                ["Upper half-bandwidth", "Lower half-bandwidth"]
            );
            assert!(
                hidden_names(&[
                    ("Iteration type", "Newton"),
                    ("Linear solver", linear_solver),
                    ("KISAO:0000478", "Banded"),
                ])
                .is_empty()
            );
        }
    }

    #[test]
    fn id_key_wins_over_name_key() {
        assert_eq!(
            hidden_names(&[
                ("Iteration type", "Newton"),
                ("KISAO:0000477", "Dense"),
                ("Linear solver", "Banded"),
            ]),
            PRECONDITIONER_AND_BANDWIDTHS
        );
        assert_eq!(
            hidden_names(&[("KISAO:0000476", "Newton"), ("Iteration type", "Functional")]),
            Vec::<&str>::new()
        );
    }

    #[test]
    fn populate_replaces_invalid_values_with_defaults() {
        let mut properties = CvodeProperties::default();
        let mut logger = Logger::new();

        properties.populate(kisao::MAXIMUM_STEP, "-1", &mut logger);
        properties.populate(kisao::LINEAR_SOLVER, "Sparse", &mut logger);
        properties.populate(kisao::UPPER_HALF_BANDWIDTH, "-2", &mut logger);
        properties.populate(kisao::INTERPOLATE_SOLUTION, "maybe", &mut logger);
        properties.populate("KISAO:1234567", "1", &mut logger);

        assert_eq!(properties, CvodeProperties::default());

        let warnings: Vec<_> = logger.warnings().iter().map(|issue| issue.description().to_string()).collect();
        assert_eq!(
            warnings,
            [
                "The maximum step ('KISAO:0000467') cannot be equal to '-1'. It must be greater or equal to 0. A maximum step of 0 will be used instead.",
                "The linear solver ('KISAO:0000477') cannot be equal to 'Sparse'. It must be equal to 'Dense', 'Banded', 'Diagonal', 'GMRES', 'BiCGStab', or 'TFQMR'. A Dense linear solver will be used instead.",
                "The upper half-bandwidth ('KISAO:0000479') cannot be equal to '-2'. It must be greater or equal to 0. An upper half-bandwidth of 0 will be used instead.",
                "The interpolate solution parameter ('KISAO:0000481') cannot be equal to 'maybe'. It must be equal to 'true' or 'false'. A value of true will be used instead.",
                "The parameter 'KISAO:1234567' is not recognised. It will be ignored.",
            ]
        );
    }

    #[test]
    fn preconditioner_is_written_as_no() {
        let mut properties = CvodeProperties::default();
        let mut logger = Logger::new();

        properties.populate(kisao::PRECONDITIONER, "None", &mut logger);

        assert!(logger.issues().is_empty());
        assert_eq!(properties.value(kisao::PRECONDITIONER).as_deref(), Some("No"));

        properties.populate(kisao::PRECONDITIONER, "Jacobi", &mut logger);

        assert_eq!(properties.preconditioner, Preconditioner::Banded);
        assert_eq!(
            logger.warnings()[0].description(),
            "The preconditioner ('KISAO:0000478') cannot be equal to 'Jacobi'. It must be equal to 'No' or 'Banded'. A Banded preconditioner will be used instead."
        );
    }

    #[test]
    fn populate_accepts_valid_values() {
        let mut properties = CvodeProperties::default();
        let mut logger = Logger::new();

        properties.populate(kisao::INTEGRATION_METHOD, "Adams-Moulton", &mut logger);
        properties.populate(kisao::PRECONDITIONER, "No", &mut logger);
        properties.populate(kisao::RELATIVE_TOLERANCE, "1e-5", &mut logger);

        assert!(logger.issues().is_empty());
        assert_eq!(properties.integration_method, IntegrationMethod::AdamsMoulton);
        assert_eq!(properties.preconditioner, Preconditioner::No);
        assert!((properties.relative_tolerance - 1e-5).abs() < f64::EPSILON);
    }

    #[test]
    fn bandwidths_only_validated_when_used() {
        let properties = CvodeProperties {
            upper_half_bandwidth: -1,
            ..CvodeProperties::default()
        };

        assert!(properties.validate(3).is_empty());

        let banded = CvodeProperties {
            linear_solver: LinearSolver::Banded,
            ..properties
        };

        assert_eq!(
            banded.validate(3),
            ["The upper half-bandwidth cannot be equal to -1. It must be between 0 and 2."]
        );
    }

    #[test]
    fn validation_reports_every_invalid_value() {
        let properties = CvodeProperties {
            maximum_step: -1.0,
            maximum_number_of_steps: 0,
            relative_tolerance: -1e-7,
            absolute_tolerance: -2.0,
            ..CvodeProperties::default()
        };

        assert_eq!(
            properties.validate(1),
            [
                "The maximum step cannot be equal to -1. It must be greater or equal to 0.",
                "The maximum number of steps cannot be equal to 0. It must be greater than 0.",
                "The relative tolerance cannot be equal to -1e-07. It must be greater or equal to 0.",
                "The absolute tolerance cannot be equal to -2. It must be greater or equal to 0.",
            ]
        );
    }
}
