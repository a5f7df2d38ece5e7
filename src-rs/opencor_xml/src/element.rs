use indexmap::IndexMap;

use crate::util::split_qualified_name;

/// A node inside an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A child element
    Element(Element),
    /// Character data, with entities already decoded
    Text(String),
}

/// An XML element.
///
/// Elements produced by the parser have their namespace resolved from the
/// `xmlns` declarations in scope. Elements built programmatically carry the
/// namespace they were given (the writer only uses the `xmlns` attributes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    namespace: Option<String>,
    attributes: IndexMap<String, String>,
    nodes: Vec<Node>,
}

impl Element {
    /// Creates a new element with no attributes and no children
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            attributes: IndexMap::new(),
            nodes: Vec::new(),
        }
    }

    pub(crate) const fn from_parts(
        name: String,
        namespace: Option<String>,
        attributes: IndexMap<String, String>,
        nodes: Vec<Node>,
    ) -> Self {
        Self {
            name,
            namespace,
            attributes,
            nodes,
        }
    }

    pub(crate) fn into_parts(
        self,
    ) -> (String, Option<String>, IndexMap<String, String>, Vec<Node>) {
        (self.name, self.namespace, self.attributes, self.nodes)
    }

    /// Adds an attribute and returns the element, for chained construction
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Adds a child element and returns the element, for chained construction
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.add_child(child);
        self
    }

    /// Sets the namespace of the element and declares it as the default
    /// namespace through an `xmlns` attribute
    #[must_use]
    pub fn with_default_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();

        self.set_attribute("xmlns", namespace.clone());
        self.namespace = Some(namespace);
        self
    }

    /// Sets (or replaces) an attribute, keeping its original position when
    /// it already exists
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Appends a child element
    pub fn add_child(&mut self, child: Self) {
        self.nodes.push(Node::Element(child));
    }

    /// Appends character data
    pub fn add_text(&mut self, text: impl Into<String>) {
        self.nodes.push(Node::Text(text.into()));
    }

    /// Returns the qualified name of the element (`prefix:local` or `local`)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the local part of the element name
    #[must_use]
    pub fn local_name(&self) -> &str {
        split_qualified_name(&self.name).1
    }

    /// Returns the namespace URI of the element, if any
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns whether the element has the given local name and namespace
    #[must_use]
    pub fn is(&self, local_name: &str, namespace: &str) -> bool {
        self.local_name() == local_name && self.namespace() == Some(namespace)
    }

    /// Returns the value of an attribute.
    ///
    /// The name is first looked up as given; if the name has no prefix and no
    /// attribute matches exactly, a prefixed attribute with the same local
    /// name is returned instead (CellML 1.x writes `cellml:units` inside
    /// MathML).
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.attributes.get(name) {
            return Some(value);
        }

        if name.contains(':') {
            return None;
        }

        self.attributes
            .iter()
            .find(|(attribute, _)| {
                let (prefix, local) = split_qualified_name(attribute);
                prefix.is_some_and(|prefix| prefix != "xmlns") && local == name
            })
            .map(|(_, value)| value.as_str())
    }

    /// Returns all the attributes, in document order
    #[must_use]
    pub const fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    /// Returns all the nodes (elements and text), in document order
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns the child elements, in document order
    pub fn children(&self) -> impl Iterator<Item = &Self> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// Returns the child elements with the given local name
    pub fn children_named<'a>(&'a self, local_name: &'a str) -> impl Iterator<Item = &'a Self> {
        self.children()
            .filter(move |child| child.local_name() == local_name)
    }

    /// Returns the first child element with the given local name
    #[must_use]
    pub fn child(&self, local_name: &str) -> Option<&Self> {
        self.children().find(|child| child.local_name() == local_name)
    }

    /// Returns the concatenated character data of the element's direct text
    /// nodes, trimmed
    #[must_use]
    pub fn text(&self) -> String {
        let text: String = self
            .nodes
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                Node::Element(_) => None,
            })
            .collect();

        text.trim().to_string()
    }

    /// Returns whether the element has neither child elements nor
    /// non-whitespace text
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.iter().all(|node| match node {
            Node::Element(_) => false,
            Node::Text(text) => text.trim().is_empty(),
        })
    }

    /// Renders the element as a complete document, with an XML declaration
    /// and two-space indentation
    #[must_use]
    pub fn to_document_string(&self) -> String {
        crate::writer::write_document(self)
    }
}
