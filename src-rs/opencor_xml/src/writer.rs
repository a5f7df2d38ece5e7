use std::fmt::Write as _;

use crate::element::{Element, Node};

const INDENT: &str = "  ";

pub fn write_document(root: &Element) -> String {
    let mut output = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

    write_element(&mut output, root, 0);

    output
}

fn write_start_tag(output: &mut String, element: &Element) {
    output.push('<');
    output.push_str(element.name());

    for (name, value) in element.attributes() {
        let _ = write!(output, " {name}=\"{}\"", escape(value, true));
    }
}

/// Writes an element on its own line(s). Elements that only contain other
/// elements are indented, elements with text are written inline.
fn write_element(output: &mut String, element: &Element, depth: usize) {
    let indent = INDENT.repeat(depth);

    output.push_str(&indent);
    write_start_tag(output, element);

    if element.is_empty() {
        output.push_str("/>\n");
        return;
    }

    let has_text = element
        .nodes()
        .iter()
        .any(|node| matches!(node, Node::Text(text) if !text.trim().is_empty()));

    if has_text {
        output.push('>');
        write_nodes_inline(output, element.nodes());
    } else {
        output.push_str(">\n");

        for child in element.children() {
            write_element(output, child, depth + 1);
        }

        output.push_str(&indent);
    }

    output.push_str("</");
    output.push_str(element.name());
    output.push_str(">\n");
}

fn write_nodes_inline(output: &mut String, nodes: &[Node]) {
    for node in nodes {
        match node {
            Node::Text(text) => output.push_str(&escape(text, false)),
            Node::Element(element) => {
                write_start_tag(output, element);

                if element.nodes().is_empty() {
                    output.push_str("/>");
                } else {
                    output.push('>');
                    write_nodes_inline(output, element.nodes());
                    output.push_str("</");
                    output.push_str(element.name());
                    output.push('>');
                }
            }
        }
    }
}

fn escape(text: &str, in_attribute: bool) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' if in_attribute => escaped.push_str("&quot;"),
            '\n' if in_attribute => escaped.push_str("&#10;"),
            _ => escaped.push(c),
        }
    }

    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_document;

    #[test]
    fn write_nested_document() {
        let root = Element::new("sedML")
            .with_default_namespace("http://sed-ml.org/sed-ml/level1/version4")
            .with_attribute("level", "1")
            .with_attribute("version", "4")
            .with_child(
                Element::new("listOfModels").with_child(
                    Element::new("model")
                        .with_attribute("id", "model1")
                        .with_attribute("source", "a&b.cellml"),
                ),
            );

        assert_eq!(
            root.to_document_string(),
            r#"<?xml version="1.0" encoding="UTF-8"?>
<sedML xmlns="http://sed-ml.org/sed-ml/level1/version4" level="1" version="4">
  <listOfModels>
    <model id="model1" source="a&amp;b.cellml"/>
  </listOfModels>
</sedML>
"#
        );
    }

    #[test]
    fn write_text_inline() {
        let mut ci = Element::new("ci");
        ci.add_text("x < y");
        let root = Element::new("apply").with_child(ci);

        assert_eq!(
            root.to_document_string(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<apply>\n  <ci>x &lt; y</ci>\n</apply>\n"
        );
    }

    #[test]
    fn written_document_parses_back() {
        let input = r#"<a xmlns="urn:test"><b c="&quot;1&quot;">text</b><d/></a>"#;
        let root = parse_document(input).expect("document should parse");
        let reparsed = parse_document(&root.to_document_string()).expect("output should parse");

        let b = reparsed.child("b").expect("b should exist");
        assert_eq!(b.attribute("c"), Some("\"1\""));
        assert_eq!(b.text(), "text");
        assert!(reparsed.child("d").is_some());
    }
}
