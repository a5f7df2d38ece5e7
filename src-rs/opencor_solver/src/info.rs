//! Read-only description of the supported solvers and their properties

use indexmap::IndexMap;

use crate::{cvode, fixed_step, kinsol};

/// The kind of problem a solver addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverType {
    /// Ordinary differential equations
    Ode,
    /// Non-linear algebraic systems
    Nla,
}

/// The type of values a solver property accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverPropertyType {
    /// `true` or `false`
    Boolean,
    /// An integer greater than zero
    IntegerGt0,
    /// An integer greater or equal to zero
    IntegerGe0,
    /// A double greater than zero
    DoubleGt0,
    /// A double greater or equal to zero
    DoubleGe0,
    /// One of the property's list values
    List,
}

/// The schema of one solver property.
#[derive(Debug, PartialEq, Eq)]
pub struct SolverProperty {
    property_type: SolverPropertyType,
    id: &'static str,
    name: &'static str,
    list_values: &'static [&'static str],
    default_value: &'static str,
    has_voi_unit: bool,
}

impl SolverProperty {
    pub(crate) const fn new(
        property_type: SolverPropertyType,
        id: &'static str,
        name: &'static str,
        list_values: &'static [&'static str],
        default_value: &'static str,
        has_voi_unit: bool,
    ) -> Self {
        Self {
            property_type,
            id,
            name,
            list_values,
            default_value,
            has_voi_unit,
        }
    }

    /// Returns the type of values the property accepts
    #[must_use]
    pub const fn property_type(&self) -> SolverPropertyType {
        self.property_type
    }

    /// Returns the KISAO id of the property
    #[must_use]
    pub const fn id(&self) -> &'static str {
        self.id
    }

    /// Returns the human-readable name of the property
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the values a list property accepts (empty for other types)
    #[must_use]
    pub const fn list_values(&self) -> &'static [&'static str] {
        self.list_values
    }

    /// Returns the default value, formatted as it would be serialised
    #[must_use]
    pub const fn default_value(&self) -> &'static str {
        self.default_value
    }

    /// Returns whether the property is expressed in the unit of the variable
    /// of integration
    #[must_use]
    pub const fn has_voi_unit(&self) -> bool {
        self.has_voi_unit
    }

    /// Returns whether the key designates this property, either by KISAO id
    /// or by name
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        self.id == key || self.name == key
    }
}

/// A lookup into a user-supplied property map, where each property may be
/// keyed by its KISAO id or by its name.
///
/// When a property is present under both keys, the KISAO id wins.
pub(crate) struct PropertyValues<'a> {
    values: &'a IndexMap<String, String>,
    schema: &'static [SolverProperty],
}

impl PropertyValues<'_> {
    pub(crate) fn get(&self, id: &str) -> Option<&str> {
        if let Some(value) = self.values.get(id) {
            return Some(value);
        }

        let property = self.schema.iter().find(|property| property.id == id)?;

        self.values.get(property.name).map(String::as_str)
    }
}

type HiddenPropertiesFn = fn(&PropertyValues<'_>) -> Vec<&'static str>;

/// The read-only description of a solver: its identity, its properties and
/// the rule deciding which properties are irrelevant for a given
/// configuration.
pub struct SolverInfo {
    solver_type: SolverType,
    id: &'static str,
    name: &'static str,
    properties: &'static [SolverProperty],
    hidden_properties: HiddenPropertiesFn,
}

impl SolverInfo {
    pub(crate) const fn new(
        solver_type: SolverType,
        id: &'static str,
        name: &'static str,
        properties: &'static [SolverProperty],
        hidden_properties: HiddenPropertiesFn,
    ) -> Self {
        Self {
            solver_type,
            id,
            name,
            properties,
            hidden_properties,
        }
    }

    /// Returns whether the solver addresses ODE or NLA problems
    #[must_use]
    pub const fn solver_type(&self) -> SolverType {
        self.solver_type
    }

    /// Returns the KISAO id of the solver
    #[must_use]
    pub const fn id(&self) -> &'static str {
        self.id
    }

    /// Returns the human-readable name of the solver
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the properties of the solver, in presentation order
    #[must_use]
    pub const fn properties(&self) -> &'static [SolverProperty] {
        self.properties
    }

    /// Returns the property designated by the key (KISAO id or name)
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&'static SolverProperty> {
        self.properties.iter().find(|property| property.matches(key))
    }

    /// Returns the properties that have no effect given the supplied
    /// property values.
    ///
    /// The values may be keyed by KISAO id or by name. A property that is
    /// absent from the map does not constrain anything, so an empty map
    /// hides nothing.
    #[must_use]
    pub fn hidden_properties(&self, values: &IndexMap<String, String>) -> Vec<&'static SolverProperty> {
        let lookup = PropertyValues {
            values,
            schema: self.properties,
        };

        (self.hidden_properties)(&lookup)
            .into_iter()
            .filter_map(|id| self.property(id))
            .collect()
    }
}

impl std::fmt::Debug for SolverInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolverInfo")
            .field("solver_type", &self.solver_type)
            .field("id", &self.id)
            .field("name", &self.name)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

/// Returns the description of every supported solver, ODE solvers first.
#[must_use]
pub fn solvers() -> [&'static SolverInfo; 6] {
    [
        &cvode::INFO,
        &fixed_step::FORWARD_EULER_INFO,
        &fixed_step::FOURTH_ORDER_RUNGE_KUTTA_INFO,
        &fixed_step::HEUN_INFO,
        &fixed_step::SECOND_ORDER_RUNGE_KUTTA_INFO,
        &kinsol::INFO,
    ]
}

/// Returns the description of the solver with the given KISAO id.
#[must_use]
pub fn solver_info(id: &str) -> Option<&'static SolverInfo> {
    solvers().into_iter().find(|info| info.id == id)
}
