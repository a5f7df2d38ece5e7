use opencor_solver::{Solver, SolverType};

/// The handle of a simulation within its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimulationId(pub(crate) usize);

/// What a simulation computes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimulationKind {
    /// A single step of the given length
    OneStep {
        /// The length of the step
        step: f64,
    },
    /// Evenly spaced output points over a time range
    UniformTimeCourse {
        /// Where the integration starts
        initial_time: f64,
        /// The first output point
        output_start_time: f64,
        /// The last output point
        output_end_time: f64,
        /// The number of intervals between output points
        number_of_steps: u32,
    },
    /// The steady state of the model
    SteadyState,
    /// A single evaluation of the model
    Analysis,
}

impl SimulationKind {
    /// The end of the time course of a newly created simulation
    pub const DEFAULT_OUTPUT_END_TIME: f64 = 1000.0;

    /// The number of steps of the time course of a newly created simulation
    pub const DEFAULT_NUMBER_OF_STEPS: u32 = 1000;

    /// The time course of a newly created simulation: 1000 steps from 0 to
    /// 1000
    pub const DEFAULT_TIME_COURSE: Self = Self::UniformTimeCourse {
        initial_time: 0.0,
        output_start_time: 0.0,
        output_end_time: Self::DEFAULT_OUTPUT_END_TIME,
        number_of_steps: Self::DEFAULT_NUMBER_OF_STEPS,
    };

    /// The step of a newly created one-step simulation
    pub const DEFAULT_STEP: f64 = 1.0;

    /// Returns the name of the SED-ML element describing the simulation
    #[must_use]
    pub const fn element_name(&self) -> &'static str {
        match self {
            Self::OneStep { .. } => "oneStep",
            Self::UniformTimeCourse { .. } => "uniformTimeCourse",
            Self::SteadyState => "steadyState",
            Self::Analysis => "analysis",
        }
    }

    /// Returns where the integration starts
    #[must_use]
    pub const fn initial_time(&self) -> f64 {
        match self {
            Self::UniformTimeCourse { initial_time, .. } => *initial_time,
            Self::OneStep { .. } | Self::SteadyState | Self::Analysis => 0.0,
        }
    }
}

/// A simulation: what is computed and with which solvers.
#[derive(Debug, Clone, PartialEq)]
pub struct SedSimulation {
    id: String,
    kind: SimulationKind,
    ode_solver: Option<Solver>,
    nla_solver: Option<Solver>,
}

impl SedSimulation {
    /// Creates a simulation with no solver
    #[must_use]
    pub fn new(id: impl Into<String>, kind: SimulationKind) -> Self {
        Self {
            id: id.into(),
            kind,
            ode_solver: None,
            nla_solver: None,
        }
    }

    /// Returns the id of the simulation
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns what the simulation computes
    #[must_use]
    pub const fn kind(&self) -> SimulationKind {
        self.kind
    }

    /// Changes what the simulation computes, keeping its solvers
    pub const fn set_kind(&mut self, kind: SimulationKind) {
        self.kind = kind;
    }

    /// Returns the ODE solver, if any
    #[must_use]
    pub const fn ode_solver(&self) -> Option<&Solver> {
        self.ode_solver.as_ref()
    }

    /// Returns the ODE solver, if any, for its properties to be changed
    pub const fn ode_solver_mut(&mut self) -> Option<&mut Solver> {
        self.ode_solver.as_mut()
    }

    /// Returns the NLA solver, if any
    #[must_use]
    pub const fn nla_solver(&self) -> Option<&Solver> {
        self.nla_solver.as_ref()
    }

    /// Returns the NLA solver, if any, for its properties to be changed
    pub const fn nla_solver_mut(&mut self) -> Option<&mut Solver> {
        self.nla_solver.as_mut()
    }

    /// Sets or removes the ODE solver.
    ///
    /// Returns `false`, leaving the simulation unchanged, if the solver is
    /// not an ODE solver.
    pub fn set_ode_solver(&mut self, solver: Option<Solver>) -> bool {
        if solver.as_ref().is_some_and(|solver| solver.solver_type() != SolverType::Ode) {
            return false;
        }

        self.ode_solver = solver;

        true
    }

    /// Sets or removes the NLA solver.
    ///
    /// Returns `false`, leaving the simulation unchanged, if the solver is
    /// not an NLA solver.
    pub fn set_nla_solver(&mut self, solver: Option<Solver>) -> bool {
        if solver.as_ref().is_some_and(|solver| solver.solver_type() != SolverType::Nla) {
            return false;
        }

        self.nla_solver = solver;

        true
    }

    /// Sets a solver, as the ODE or NLA solver depending on its type
    pub fn set_solver(&mut self, solver: Solver) {
        match solver.solver_type() {
            SolverType::Ode => self.ode_solver = Some(solver),
            SolverType::Nla => self.nla_solver = Some(solver),
        }
    }
}
