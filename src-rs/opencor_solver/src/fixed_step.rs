use opencor_shared::{
    issue::Logger,
    number::{format_double, parse_double},
};

use crate::{
    info::{PropertyValues, SolverInfo, SolverProperty, SolverPropertyType, SolverType},
    kernel::{FixedStepKernel, FixedStepMethod},
    kisao,
    solver::numeric_warning,
};

const DEFAULT_STEP: f64 = 1.0;

static PROPERTIES: [SolverProperty; 1] = [SolverProperty::new(
    SolverPropertyType::DoubleGt0,
    kisao::STEP,
    "Step",
    &[],
    "1",
    true,
)];

const fn nothing_hidden(_values: &PropertyValues<'_>) -> Vec<&'static str> {
    Vec::new()
}

pub static FORWARD_EULER_INFO: SolverInfo = SolverInfo::new(
    SolverType::Ode,
    kisao::FORWARD_EULER,
    "Forward Euler",
    &PROPERTIES,
    nothing_hidden,
);

pub static FOURTH_ORDER_RUNGE_KUTTA_INFO: SolverInfo = SolverInfo::new(
    SolverType::Ode,
    kisao::FOURTH_ORDER_RUNGE_KUTTA,
    "Fourth-order Runge-Kutta",
    &PROPERTIES,
    nothing_hidden,
);

pub static HEUN_INFO: SolverInfo =
    SolverInfo::new(SolverType::Ode, kisao::HEUN, "Heun", &PROPERTIES, nothing_hidden);

pub static SECOND_ORDER_RUNGE_KUTTA_INFO: SolverInfo = SolverInfo::new(
    SolverType::Ode,
    kisao::SECOND_ORDER_RUNGE_KUTTA,
    "Second-order Runge-Kutta",
    &PROPERTIES,
    nothing_hidden,
);

/// The properties shared by the fixed-step solvers (Forward Euler, Heun,
/// and the second- and fourth-order Runge-Kutta methods).
#[derive(Debug, Clone, PartialEq)]
pub struct FixedStepProperties {
    /// The integration step
    pub step: f64,
}

impl Default for FixedStepProperties {
    fn default() -> Self {
        Self { step: DEFAULT_STEP }
    }
}

impl FixedStepProperties {
    pub(crate) fn value(&self, id: &str) -> Option<String> {
        (id == kisao::STEP).then(|| format_double(self.step))
    }

    pub(crate) fn set_value(&mut self, id: &str, value: &str) -> bool {
        if id != kisao::STEP {
            return false;
        }

        parse_double(value).map(|step| self.step = step).is_some()
    }

    pub(crate) fn populate(&mut self, id: &str, value: &str, logger: &mut Logger) {
        if id != kisao::STEP {
            logger.add_warning(format!(
                "The parameter '{id}' is not recognised. It will be ignored."
            ));
            return;
        }

        self.step = match parse_double(value) {
            Some(step) if step > 0.0 => step,
            _ => {
                logger.add_warning(numeric_warning(
                    "step",
                    id,
                    value,
                    "greater than 0",
                    &format_double(DEFAULT_STEP),
                ));
                DEFAULT_STEP
            }
        };
    }

    pub(crate) fn validate(&self) -> Vec<String> {
        if self.step > 0.0 {
            Vec::new()
        } else {
            vec![format!(
                "The step cannot be equal to {}. It must be greater than 0.",
                format_double(self.step)
            )]
        }
    }

    pub(crate) const fn kernel(&self, method: FixedStepMethod) -> FixedStepKernel {
        FixedStepKernel::new(method, self.step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_step_falls_back_to_default() {
        let mut properties = FixedStepProperties { step: 0.5 };
        let mut logger = Logger::new();

        properties.populate(kisao::STEP, "0", &mut logger);

        assert_eq!(properties, FixedStepProperties::default());
        assert_eq!(
            logger.warning(0).map(|issue| issue.description()),
            Some(
                "The step ('KISAO:0000483') cannot be equal to '0'. It must be greater than 0. A step of 1 will be used instead."
            )
        );
    }

    #[test]
    fn non_positive_step_is_invalid() {
        assert!(FixedStepProperties::default().validate().is_empty());
        assert_eq!(
            FixedStepProperties { step: -0.1 }.validate(),
            ["The step cannot be equal to -0.1. It must be greater than 0."]
        );
    }

    #[test]
    fn step_is_read_and_written_as_text() {
        let mut properties = FixedStepProperties::default();

        assert!(properties.set_value(kisao::STEP, "0.001"));
        assert_eq!(properties.value(kisao::STEP).as_deref(), Some("0.001"));
        assert!(!properties.set_value(kisao::STEP, "small"));
        assert!(!properties.set_value(kisao::MAXIMUM_STEP, "1"));
    }
}
