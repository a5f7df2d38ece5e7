use indexmap::IndexMap;
use opencor_shared::issue::{Issue, Logger};

use crate::{
    cvode::{self, CvodeProperties},
    fixed_step::{self, FixedStepProperties},
    info::{SolverInfo, SolverProperty, SolverType},
    kernel::{FixedStepMethod, NewtonKernel, OdeKernel},
    kinsol::{self, KinsolProperties},
    kisao,
};

/// A numerical solver together with its properties.
///
/// Solvers are plain values: cloning one yields an independent snapshot, so
/// a running simulation is not affected by later property changes on the
/// document it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Solver {
    /// Adaptive integrator for stiff and non-stiff ODEs
    Cvode(CvodeProperties),
    /// Explicit Euler method with a fixed step
    ForwardEuler(FixedStepProperties),
    /// Heun's method with a fixed step
    Heun(FixedStepProperties),
    /// Midpoint method with a fixed step
    SecondOrderRungeKutta(FixedStepProperties),
    /// Classical Runge-Kutta method with a fixed step
    FourthOrderRungeKutta(FixedStepProperties),
    /// Newton solver for non-linear algebraic systems
    Kinsol(KinsolProperties),
}

impl Solver {
    /// Creates the solver with the given KISAO id, with default properties
    #[must_use]
    pub fn from_kisao_id(id: &str) -> Option<Self> {
        let solver = match id {
            kisao::CVODE => Self::Cvode(CvodeProperties::default()),
            kisao::FORWARD_EULER => Self::ForwardEuler(FixedStepProperties::default()),
            kisao::HEUN => Self::Heun(FixedStepProperties::default()),
            kisao::SECOND_ORDER_RUNGE_KUTTA => {
                Self::SecondOrderRungeKutta(FixedStepProperties::default())
            }
            kisao::FOURTH_ORDER_RUNGE_KUTTA => {
                Self::FourthOrderRungeKutta(FixedStepProperties::default())
            }
            kisao::KINSOL => Self::Kinsol(KinsolProperties::default()),
            _ => return None,
        };

        Some(solver)
    }

    /// Creates a CVODE solver with default properties
    #[must_use]
    pub fn cvode() -> Self {
        Self::Cvode(CvodeProperties::default())
    }

    /// Creates a KINSOL solver with default properties
    #[must_use]
    pub fn kinsol() -> Self {
        Self::Kinsol(KinsolProperties::default())
    }

    /// Returns the description of the solver
    #[must_use]
    pub fn info(&self) -> &'static SolverInfo {
        match self {
            Self::Cvode(_) => &cvode::INFO,
            Self::ForwardEuler(_) => &fixed_step::FORWARD_EULER_INFO,
            Self::Heun(_) => &fixed_step::HEUN_INFO,
            Self::SecondOrderRungeKutta(_) => &fixed_step::SECOND_ORDER_RUNGE_KUTTA_INFO,
            Self::FourthOrderRungeKutta(_) => &fixed_step::FOURTH_ORDER_RUNGE_KUTTA_INFO,
            Self::Kinsol(_) => &kinsol::INFO,
        }
    }

    /// Returns the KISAO id of the solver
    #[must_use]
    pub fn id(&self) -> &'static str {
        self.info().id()
    }

    /// Returns the human-readable name of the solver
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.info().name()
    }

    /// Returns whether the solver addresses ODE or NLA problems
    #[must_use]
    pub fn solver_type(&self) -> SolverType {
        self.info().solver_type()
    }

    fn resolve(&self, key: &str) -> Option<&'static SolverProperty> {
        self.info().property(key)
    }

    /// Returns the value of a property, keyed by KISAO id or name
    #[must_use]
    pub fn property(&self, key: &str) -> Option<String> {
        let id = self.resolve(key)?.id();

        match self {
            Self::Cvode(properties) => properties.value(id),
            Self::ForwardEuler(properties)
            | Self::Heun(properties)
            | Self::SecondOrderRungeKutta(properties)
            | Self::FourthOrderRungeKutta(properties) => properties.value(id),
            Self::Kinsol(properties) => properties.value(id),
        }
    }

    /// Sets a property, keyed by KISAO id or name.
    ///
    /// Returns `false` if the key does not designate a property of this
    /// solver, or if the value cannot be parsed as the property's type (or
    /// is not one of its list values). Numeric values that are out of range
    /// are accepted; they are reported when the solver is validated.
    pub fn set_property(&mut self, key: &str, value: &str) -> bool {
        let Some(id) = self.resolve(key).map(SolverProperty::id) else {
            return false;
        };

        match self {
            Self::Cvode(properties) => properties.set_value(id, value),
            Self::ForwardEuler(properties)
            | Self::Heun(properties)
            | Self::SecondOrderRungeKutta(properties)
            | Self::FourthOrderRungeKutta(properties) => properties.set_value(id, value),
            Self::Kinsol(properties) => properties.set_value(id, value),
        }
    }

    /// Sets every property present in the map, leaving the others
    /// untouched. Unknown keys and invalid values are ignored.
    pub fn set_properties(&mut self, values: &IndexMap<String, String>) {
        for (key, value) in values {
            if !self.set_property(key, value) {
                tracing::debug!(solver = self.name(), key, value, "property ignored");
            }
        }
    }

    /// Returns the value of every property, keyed by KISAO id, in schema
    /// order
    #[must_use]
    pub fn properties(&self) -> IndexMap<String, String> {
        self.info()
            .properties()
            .iter()
            .filter_map(|property| {
                self.property(property.id())
                    .map(|value| (property.id().to_string(), value))
            })
            .collect()
    }

    /// Returns the properties that have no effect given the supplied
    /// property values (see [`SolverInfo::hidden_properties`])
    #[must_use]
    pub fn hidden_properties(&self, values: &IndexMap<String, String>) -> Vec<&'static SolverProperty> {
        self.info().hidden_properties(values)
    }

    /// Applies the parameters of a SED-ML algorithm, in order. Invalid and
    /// unknown parameters are reported as warnings.
    pub fn populate<'a>(
        &mut self,
        parameters: impl IntoIterator<Item = (&'a str, &'a str)>,
        logger: &mut Logger,
    ) {
        for (id, value) in parameters {
            match self {
                Self::Cvode(properties) => properties.populate(id, value, logger),
                Self::ForwardEuler(properties)
                | Self::Heun(properties)
                | Self::SecondOrderRungeKutta(properties)
                | Self::FourthOrderRungeKutta(properties) => properties.populate(id, value, logger),
                Self::Kinsol(properties) => properties.populate(id, value, logger),
            }
        }
    }

    /// Returns the errors that prevent the solver from handling a system of
    /// the given size (an empty list means the solver can be used)
    #[must_use]
    pub fn validate(&self, size: usize) -> Vec<Issue> {
        let errors = match self {
            Self::Cvode(properties) => properties.validate(size),
            Self::ForwardEuler(properties)
            | Self::Heun(properties)
            | Self::SecondOrderRungeKutta(properties)
            | Self::FourthOrderRungeKutta(properties) => properties.validate(),
            Self::Kinsol(properties) => properties.validate(size),
        };

        errors.into_iter().map(Issue::error).collect()
    }

    /// Builds the integrator of an ODE solver (`None` for NLA solvers)
    #[must_use]
    pub fn ode_kernel(&self) -> Option<Box<dyn OdeKernel>> {
        let kernel: Box<dyn OdeKernel> = match self {
            Self::Cvode(properties) => Box::new(properties.kernel()),
            Self::ForwardEuler(properties) => Box::new(properties.kernel(FixedStepMethod::ForwardEuler)),
            Self::Heun(properties) => Box::new(properties.kernel(FixedStepMethod::Heun)),
            Self::SecondOrderRungeKutta(properties) => {
                Box::new(properties.kernel(FixedStepMethod::SecondOrderRungeKutta))
            }
            Self::FourthOrderRungeKutta(properties) => {
                Box::new(properties.kernel(FixedStepMethod::FourthOrderRungeKutta))
            }
            Self::Kinsol(_) => return None,
        };

        Some(kernel)
    }

    /// Builds the Newton solver of an NLA solver (`None` for ODE solvers)
    #[must_use]
    pub fn nla_kernel(&self) -> Option<NewtonKernel> {
        match self {
            Self::Kinsol(properties) => Some(properties.kernel()),
            Self::Cvode(_)
            | Self::ForwardEuler(_)
            | Self::Heun(_)
            | Self::SecondOrderRungeKutta(_)
            | Self::FourthOrderRungeKutta(_) => None,
        }
    }
}

fn article(word: &str) -> &'static str {
    if word.starts_with(['a', 'e', 'i', 'o', 'u', 'A', 'E', 'I', 'O', 'U']) {
        "An"
    } else {
        "A"
    }
}

/// Formats the warning reported when a numeric parameter is out of range.
pub fn numeric_warning(
    name: &str,
    id: &str,
    value: &str,
    requirement: &str,
    default: &str,
) -> String {
    format!(
        "The {name} ('{id}') cannot be equal to '{value}'. It must be {requirement}. {} {name} of {default} will be used instead.",
        article(name)
    )
}

/// Formats the warning reported when a list parameter has an unknown value.
pub fn choices_warning(
    name: &str,
    id: &str,
    value: &str,
    choices: &[&str],
    default: &str,
) -> String {
    let quoted: Vec<_> = choices.iter().map(|choice| format!("'{choice}'")).collect();
    let choices = match quoted.as_slice() {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{first} or {second}"),
        [init @ .., last] => format!("{}, or {last}", init.join(", ")),
    };

    format!(
        "The {name} ('{id}') cannot be equal to '{value}'. It must be equal to {choices}. {} {default} {name} will be used instead.",
        article(default)
    )
}

/// Returns the error for a half-bandwidth that does not fit a system of the
/// given size, if any.
///
/// An empty system only accepts a half-bandwidth of 0.
pub fn bandwidth_error(name: &str, bandwidth: i64, size: usize) -> Option<String> {
    let maximum = i64::try_from(size).unwrap_or(i64::MAX).saturating_sub(1).max(0);

    (bandwidth < 0 || bandwidth > maximum)
        .then(|| format!("The {name} cannot be equal to {bandwidth}. It must be between 0 and {maximum}."))
}
