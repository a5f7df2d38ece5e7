use std::fmt;

use opencor_shared::{issue::Logger, number::parse_integer};

use crate::{
    info::{PropertyValues, SolverInfo, SolverProperty, SolverPropertyType, SolverType},
    kernel::{KrylovMethod, LinearMethod, NewtonKernel},
    kisao,
    solver::{bandwidth_error, choices_warning, numeric_warning},
};

const DEFAULT_MAXIMUM_NUMBER_OF_ITERATIONS: i64 = 200;

static PROPERTIES: [SolverProperty; 4] = [
    SolverProperty::new(
        SolverPropertyType::IntegerGt0,
        kisao::MAXIMUM_NUMBER_OF_ITERATIONS,
        "Maximum number of iterations",
        &[],
        "200",
        false,
    ),
    SolverProperty::new(
        SolverPropertyType::List,
        kisao::LINEAR_SOLVER,
        "Linear solver",
        &["Dense", "Banded", "GMRES", "BiCGStab", "TFQMR"],
        "Dense",
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
];

pub static INFO: SolverInfo = SolverInfo::new(
    SolverType::Nla,
    kisao::KINSOL,
    "KINSOL",
    &PROPERTIES,
    hidden_properties,
);

/// The linear solver used by the KINSOL Newton iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KinsolLinearSolver {
    /// Dense LU factorisation
    #[default]
    Dense,
    /// Banded LU factorisation
    Banded,
    /// Restarted GMRES (Krylov)
    Gmres,
    /// BiCGStab (Krylov)
    BiCgStab,
    /// TFQMR (Krylov)
    Tfqmr,
}

impl KinsolLinearSolver {
    /// Returns the name of the linear solver
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dense => "Dense",
            Self::Banded => "Banded",
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
            "GMRES" => Some(Self::Gmres),
            "BiCGStab" => Some(Self::BiCgStab),
            "TFQMR" => Some(Self::Tfqmr),
            _ => None,
        }
    }
}

impl fmt::Display for KinsolLinearSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The properties of the KINSOL solver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KinsolProperties {
    /// Maximum number of Newton iterations
    pub maximum_number_of_iterations: i64,
    /// Linear solver
    pub linear_solver: KinsolLinearSolver,
    /// Upper half-bandwidth of the banded linear solver
    pub upper_half_bandwidth: i64,
    /// Lower half-bandwidth of the banded linear solver
    pub lower_half_bandwidth: i64,
}

impl Default for KinsolProperties {
    fn default() -> Self {
        Self {
            maximum_number_of_iterations: DEFAULT_MAXIMUM_NUMBER_OF_ITERATIONS,
            linear_solver: KinsolLinearSolver::default(),
            upper_half_bandwidth: 0,
            lower_half_bandwidth: 0,
        }
    }
}

impl KinsolProperties {
    pub(crate) fn value(&self, id: &str) -> Option<String> {
        match id {
            kisao::MAXIMUM_NUMBER_OF_ITERATIONS => Some(self.maximum_number_of_iterations.to_string()),
            kisao::LINEAR_SOLVER => Some(self.linear_solver.to_string()),
            kisao::UPPER_HALF_BANDWIDTH => Some(self.upper_half_bandwidth.to_string()),
            kisao::LOWER_HALF_BANDWIDTH => Some(self.lower_half_bandwidth.to_string()),
            _ => None,
        }
    }

    pub(crate) fn set_value(&mut self, id: &str, value: &str) -> bool {
        match id {
            kisao::MAXIMUM_NUMBER_OF_ITERATIONS => {
                parse_integer(value).map(|value| self.maximum_number_of_iterations = value)
            }
            kisao::LINEAR_SOLVER => {
                KinsolLinearSolver::from_name(value).map(|value| self.linear_solver = value)
            }
            kisao::UPPER_HALF_BANDWIDTH => {
                parse_integer(value).map(|value| self.upper_half_bandwidth = value)
            }
            kisao::LOWER_HALF_BANDWIDTH => {
                parse_integer(value).map(|value| self.lower_half_bandwidth = value)
            }
            _ => None,
        }
        .is_some()
    }

    pub(crate) fn populate(&mut self, id: &str, value: &str, logger: &mut Logger) {
        match id {
            kisao::MAXIMUM_NUMBER_OF_ITERATIONS => {
                self.maximum_number_of_iterations = match parse_integer(value) {
                    Some(iterations) if iterations > 0 => iterations,
                    _ => {
                        logger.add_warning(numeric_warning(
                            "maximum number of iterations",
                            id,
                            value,
                            "greater than 0",
                            &DEFAULT_MAXIMUM_NUMBER_OF_ITERATIONS.to_string(),
                        ));
                        DEFAULT_MAXIMUM_NUMBER_OF_ITERATIONS
                    }
                };
            }
            kisao::LINEAR_SOLVER => {
                self.linear_solver = KinsolLinearSolver::from_name(value).unwrap_or_else(|| {
                    logger.add_warning(choices_warning(
                        "linear solver",
                        id,
                        value,
                        PROPERTIES[1].list_values(),
                        KinsolLinearSolver::default().as_str(),
                    ));
                    KinsolLinearSolver::default()
                });
            }
            kisao::UPPER_HALF_BANDWIDTH | kisao::LOWER_HALF_BANDWIDTH => {
                let (name, bandwidth) = if id == kisao::UPPER_HALF_BANDWIDTH {
                    ("upper half-bandwidth", &mut self.upper_half_bandwidth)
                } else {
                    ("lower half-bandwidth", &mut self.lower_half_bandwidth)
                };

                *bandwidth = match parse_integer(value) {
                    Some(value) if value >= 0 => value,
                    _ => {
                        logger.add_warning(numeric_warning(name, id, value, "greater or equal to 0", "0"));
                        0
                    }
                };
            }
            _ => logger.add_warning(format!(
                "The parameter '{id}' is not recognised. It will be ignored."
            )),
        }
    }

    /// Returns the errors that prevent the solver from solving a system of
    /// the given size.
    pub(crate) fn validate(&self, size: usize) -> Vec<String> {
        let mut errors = Vec::new();

        if self.maximum_number_of_iterations <= 0 {
            errors.push(format!(
                "The maximum number of iterations cannot be equal to {}. It must be greater than 0.",
                self.maximum_number_of_iterations
            ));
        }

        if self.linear_solver == KinsolLinearSolver::Banded {
            errors.extend(bandwidth_error("upper half-bandwidth", self.upper_half_bandwidth, size));
            errors.extend(bandwidth_error("lower half-bandwidth", self.lower_half_bandwidth, size));
        }

        errors
    }

    pub(crate) fn kernel(&self) -> NewtonKernel {
        let linear_method = match self.linear_solver {
            KinsolLinearSolver::Dense => LinearMethod::Dense,
            KinsolLinearSolver::Banded => LinearMethod::Banded {
                upper: usize::try_from(self.upper_half_bandwidth).unwrap_or(0),
                lower: usize::try_from(self.lower_half_bandwidth).unwrap_or(0),
            },
            KinsolLinearSolver::Gmres => LinearMethod::Krylov {
                method: KrylovMethod::Gmres,
                preconditioner: None,
            },
            KinsolLinearSolver::BiCgStab => LinearMethod::Krylov {
                method: KrylovMethod::BiCgStab,
                preconditioner: None,
            },
            KinsolLinearSolver::Tfqmr => LinearMethod::Krylov {
                method: KrylovMethod::Tfqmr,
                preconditioner: None,
            },
        };

        NewtonKernel::new(
            linear_method,
            usize::try_from(self.maximum_number_of_iterations).unwrap_or(1),
        )
    }
}

fn hidden_properties(values: &PropertyValues<'_>) -> Vec<&'static str> {
    match values.get(kisao::LINEAR_SOLVER).and_then(KinsolLinearSolver::from_name) {
        Some(
            KinsolLinearSolver::Dense
            | KinsolLinearSolver::Gmres
            | KinsolLinearSolver::BiCgStab
            | KinsolLinearSolver::Tfqmr,
        ) => vec![kisao::UPPER_HALF_BANDWIDTH, kisao::LOWER_HALF_BANDWIDTH],
        Some(KinsolLinearSolver::Banded) | None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;

    fn hidden_names(linear_solver: Option<&str>) -> Vec<&'static str> {
        let values: IndexMap<String, String> = linear_solver
            .map(|value| ("Linear solver".to_string(), value.to_string()))
            .into_iter()
            .collect();

        INFO.hidden_properties(&values)
            .into_iter()
            .map(SolverProperty::name)
            .collect()
    }

    #[test]
    fn hidden_properties_table() {
        let bandwidths = vec!["Upper half-bandwidth", "Lower half-bandwidth"];
        let table = [
            (None, Vec::new()),
            (Some("Dense"), bandwidths.clone()),
            (Some("Banded"), Vec::new()),
            (Some("GMRES"), bandwidths.clone()),
            (Some("BiCGStab"), bandwidths.clone()),
            (Some("TFQMR"), bandwidths),
        ];

        for (linear_solver, expected) in table {
            assert_eq!(hidden_names(linear_solver), expected, "linear solver {linear_solver:?}");
        }
    }

    #[test]
    fn banded_solver_checks_bandwidths_against_size() {
        let properties = KinsolProperties {
            linear_solver: KinsolLinearSolver::Banded,
            upper_half_bandwidth: 3,
            lower_half_bandwidth: 1,
            ..KinsolProperties::default()
        };

        assert_eq!(
            properties.validate(3),
            ["The upper half-bandwidth cannot be equal to 3. It must be between 0 and 2."]
        );
        assert!(properties.validate(4).is_empty());
    }

    #[test]
    fn populate_reports_unknown_linear_solver() {
        let mut properties = KinsolProperties::default();
        let mut logger = Logger::new();

        properties.populate(kisao::LINEAR_SOLVER, "Diagonal", &mut logger);
        properties.populate(kisao::MAXIMUM_NUMBER_OF_ITERATIONS, "50", &mut logger);

        assert_eq!(properties.linear_solver, KinsolLinearSolver::Dense);
        assert_eq!(properties.maximum_number_of_iterations, 50);
        assert_eq!(
            logger.warning(0).map(|issue| issue.description()),
            Some(
                "The linear solver ('KISAO:0000477') cannot be equal to 'Diagonal'. It must be equal to 'Dense', 'Banded', 'GMRES', 'BiCGStab', or 'TFQMR'. A Dense linear solver will be used instead."
            )
        );
    }
}
