use opencor_file::FileRef;

/// The handle of a model within its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub(crate) usize);

const COMPONENT_PREFIX: &str = "/cellml:model/cellml:component[@name=";
const VARIABLE_PREFIX: &str = "]/cellml:variable[@name=";

/// A change applied to a model before it is simulated.
#[derive(Debug, Clone, PartialEq)]
pub enum SedChange {
    /// Sets the initial value of a variable
    Attribute {
        /// The name of the component holding the variable
        component: String,
        /// The name of the variable
        variable: String,
        /// The value the variable starts with
        new_value: f64,
    },
}

impl SedChange {
    /// Creates a change setting the initial value of `component/variable`
    #[must_use]
    pub fn attribute(component: impl Into<String>, variable: impl Into<String>, new_value: f64) -> Self {
        Self::Attribute {
            component: component.into(),
            variable: variable.into(),
            new_value,
        }
    }

    /// Returns the XPath of the changed variable, as written in SED-ML
    #[must_use]
    pub fn target(&self) -> String {
        match self {
            Self::Attribute { component, variable, .. } => {
                format!("{COMPONENT_PREFIX}'{component}'{VARIABLE_PREFIX}'{variable}']")
            }
        }
    }

    /// Returns the component and variable names designated by a SED-ML
    /// target, if it designates a CellML variable
    #[must_use]
    pub fn parse_target(target: &str) -> Option<(String, String)> {
        let rest = target.trim().strip_prefix(COMPONENT_PREFIX)?;
        let (component, rest) = quoted(rest)?;
        let rest = rest.strip_prefix(VARIABLE_PREFIX)?;
        let (variable, rest) = quoted(rest)?;

        (rest == "]" && !component.is_empty() && !variable.is_empty())
            .then(|| (component.to_string(), variable.to_string()))
    }
}

/// Splits a value quoted with `'` or `"` from what follows it.
fn quoted(input: &str) -> Option<(&str, &str)> {
    let quote = input.chars().next().filter(|c| matches!(c, '\'' | '"'))?;
    let body = &input[1..];
    let end = body.find(quote)?;

    Some((&body[..end], &body[end + 1..]))
}

/// A model of a simulation experiment: a CellML file and the changes made to
/// it.
#[derive(Debug, Clone)]
pub struct SedModel {
    id: String,
    file: FileRef,
    changes: Vec<SedChange>,
}

impl SedModel {
    /// Creates a model with no changes
    #[must_use]
    pub fn new(id: impl Into<String>, file: FileRef) -> Self {
        Self {
            id: id.into(),
            file,
            changes: Vec::new(),
        }
    }

    /// Returns the id of the model
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the file of the model
    #[must_use]
    pub const fn file(&self) -> &FileRef {
        &self.file
    }

    /// Returns the changes, in the order they are applied
    #[must_use]
    pub fn changes(&self) -> &[SedChange] {
        &self.changes
    }

    /// Appends a change
    pub fn add_change(&mut self, change: SedChange) {
        self.changes.push(change);
    }

    /// Removes the change at the given index. Returns `false` if there is
    /// none.
    pub fn remove_change(&mut self, index: usize) -> bool {
        if index < self.changes.len() {
            self.changes.remove(index);
            true
        } else {
            false
        }
    }

    /// Removes every change
    pub fn remove_all_changes(&mut self) {
        self.changes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets() {
        let change = SedChange::attribute("membrane", "V", -80.0);
        let target = change.target();

        assert_eq!(
            target,
            "/cellml:model/cellml:component[@name='membrane']/cellml:variable[@name='V']"
        );
        assert_eq!(
            SedChange::parse_target(&target),
            Some(("membrane".to_string(), "V".to_string()))
        );
        assert_eq!(
            SedChange::parse_target(r#"/cellml:model/cellml:component[@name="a"]/cellml:variable[@name="b"]"#),
            Some(("a".to_string(), "b".to_string()))
        );
    }

    #[test]
    fn invalid_targets() {
        for target in [
            "",
            "/cellml:model/cellml:component[@name='membrane']",
            "/cellml:model/cellml:component[@name='membrane']/cellml:variable[@name='V'",
            "/cellml:model/cellml:component[@name='']/cellml:variable[@name='V']",
            "/cellml:model/cellml:component[@name='a\"]/cellml:variable[@name='V']",
        ] {
            assert_eq!(SedChange::parse_target(target), None, "{target}");
        }
    }
}
