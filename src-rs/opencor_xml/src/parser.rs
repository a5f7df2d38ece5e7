//! nom parsers for the XML subset used by CellML, SED-ML and COMBINE

use std::{borrow::Cow, collections::HashMap};

use indexmap::IndexMap;
use nom::{
    Input, Parser,
    bytes::complete::{tag, take_till, take_until, take_while},
    character::complete::{char, multispace0, satisfy},
    combinator::recognize,
    error::ErrorKind,
    sequence::pair,
};

use crate::{
    element::{Element, Node},
    error::{XmlError, XmlErrorReason},
    util::{InputSpan, Result, is_name_char, is_name_start_char, split_qualified_name},
};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Parses a complete document and resolves the namespaces of its elements.
pub fn parse_document(input: &str) -> std::result::Result<Element, XmlError> {
    let span = InputSpan::new(input);
    let finish = |error: nom::Err<XmlError>| match error {
        nom::Err::Error(error) | nom::Err::Failure(error) => error,
        nom::Err::Incomplete(_) => XmlError::new(span, XmlErrorReason::NomError(ErrorKind::Complete)),
    };

    let (rest, ()) = misc(span).map_err(finish)?;

    if rest.fragment().is_empty() {
        return Err(XmlError::new(rest, XmlErrorReason::ExpectedElement));
    }

    let (rest, root) = element(rest).map_err(finish)?;
    let (rest, ()) = misc(rest).map_err(finish)?;

    if !rest.fragment().is_empty() {
        return Err(XmlError::new(rest, XmlErrorReason::TrailingContent));
    }

    let scope = HashMap::from([("xml".to_string(), XML_NAMESPACE.to_string())]);

    Ok(resolve_namespaces(root, &scope))
}

fn fail_at(input: InputSpan<'_>, reason: XmlErrorReason) -> nom::Err<XmlError> {
    nom::Err::Failure(XmlError::new(input, reason))
}

fn literal<'a>(
    expected: &'static str,
) -> impl Parser<InputSpan<'a>, Output = InputSpan<'a>, Error = XmlError> {
    tag(expected)
}

fn whitespace(input: InputSpan<'_>) -> Result<'_, InputSpan<'_>> {
    multispace0(input)
}

/// Skips whitespace, comments, processing instructions and a `DOCTYPE`
/// around the root element.
fn misc(input: InputSpan<'_>) -> Result<'_, ()> {
    let mut rest = input;

    loop {
        let (after, _) = whitespace(rest)?;
        let fragment = after.fragment();

        rest = if fragment.starts_with("<?") {
            processing_instruction(after)?.0
        } else if fragment.starts_with("<!--") {
            comment(after)?.0
        } else if fragment.starts_with("<!DOCTYPE") {
            doctype(after)?.0
        } else {
            return Ok((after, ()));
        };
    }
}

fn delimited_construct<'a>(
    input: InputSpan<'a>,
    open: &'static str,
    close: &'static str,
    construct: &'static str,
) -> Result<'a, InputSpan<'a>> {
    let (rest, _) = literal(open).parse(input)?;
    let (rest, body) = take_until::<_, _, XmlError>(close)
        .parse(rest)
        .map_err(|_| fail_at(input, XmlErrorReason::UnterminatedConstruct(construct)))?;
    let (rest, _) = literal(close).parse(rest)?;

    Ok((rest, body))
}

fn comment(input: InputSpan<'_>) -> Result<'_, ()> {
    let (rest, _) = delimited_construct(input, "<!--", "-->", "comment")?;
    Ok((rest, ()))
}

fn processing_instruction(input: InputSpan<'_>) -> Result<'_, ()> {
    let (rest, _) = delimited_construct(input, "<?", "?>", "processing instruction")?;
    Ok((rest, ()))
}

fn cdata(input: InputSpan<'_>) -> Result<'_, String> {
    let (rest, body) = delimited_construct(input, "<![CDATA[", "]]>", "CDATA section")?;
    Ok((rest, (*body.fragment()).to_string()))
}

/// Skips a `DOCTYPE` declaration, including an internal subset.
fn doctype(input: InputSpan<'_>) -> Result<'_, ()> {
    let mut depth = 0_usize;

    for (index, c) in input.fragment().char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '>' if depth == 0 => return Ok((input.take_from(index + 1), ())),
            _ => {}
        }
    }

    Err(fail_at(input, XmlErrorReason::UnterminatedConstruct("DOCTYPE declaration")))
}

fn name(input: InputSpan<'_>) -> Result<'_, String> {
    let (rest, name) = recognize(pair(
        satisfy::<_, _, XmlError>(is_name_start_char),
        take_while(is_name_char),
    ))
    .parse(input)
    .map_err(|_| fail_at(input, XmlErrorReason::ExpectedName))?;

    Ok((rest, (*name.fragment()).to_string()))
}

fn element(input: InputSpan<'_>) -> Result<'_, Element> {
    let (rest, _) = char::<_, XmlError>('<')
        .parse(input)
        .map_err(|_| fail_at(input, XmlErrorReason::ExpectedElement))?;
    let (rest, name) = name(rest)?;
    let (rest, attributes) = attributes(rest)?;

    if let Ok((rest, _)) = literal("/>").parse(rest) {
        return Ok((rest, Element::from_parts(name, None, attributes, Vec::new())));
    }

    let (rest, _) = char::<_, XmlError>('>')
        .parse(rest)
        .map_err(|_| fail_at(rest, XmlErrorReason::UnterminatedStartTag))?;
    let (rest, nodes) = content(rest, &name)?;

    Ok((rest, Element::from_parts(name, None, attributes, nodes)))
}

fn attributes(input: InputSpan<'_>) -> Result<'_, IndexMap<String, String>> {
    let mut attributes = IndexMap::new();
    let mut rest = input;

    loop {
        let (after, _) = whitespace(rest)?;
        let fragment = after.fragment();

        if fragment.is_empty() || fragment.starts_with('>') || fragment.starts_with("/>") {
            return Ok((after, attributes));
        }

        let (after, attribute) = name(after)?;
        let (after, value) = attribute_value(after)?;

        if attributes.contains_key(&attribute) {
            return Err(fail_at(rest, XmlErrorReason::DuplicateAttribute(attribute)));
        }

        attributes.insert(attribute, value);
        rest = after;
    }
}

fn attribute_value(input: InputSpan<'_>) -> Result<'_, String> {
    let expected_value = |_| fail_at(input, XmlErrorReason::ExpectedAttributeValue);

    let (rest, _) = whitespace(input)?;
    let (rest, _) = char::<_, XmlError>('=').parse(rest).map_err(expected_value)?;
    let (rest, _) = whitespace(rest)?;
    let (rest, quote) = satisfy::<_, _, XmlError>(|c| c == '"' || c == '\'')
        .parse(rest)
        .map_err(expected_value)?;
    let (rest, raw) = take_till::<_, _, XmlError>(|c| c == quote || c == '<').parse(rest)?;
    let (rest, _) = char::<_, XmlError>(quote).parse(rest).map_err(expected_value)?;

    Ok((rest, decode_entities(raw)?))
}

/// Parses the content of an element up to and including its closing tag.
fn content<'a>(input: InputSpan<'a>, element_name: &str) -> Result<'a, Vec<Node>> {
    let mut nodes = Vec::new();
    let mut rest = input;

    loop {
        let fragment = rest.fragment();

        if fragment.is_empty() {
            return Err(fail_at(
                rest,
                XmlErrorReason::UnclosedElement(element_name.to_string()),
            ));
        }

        if fragment.starts_with("</") {
            let (after, _) = literal("</").parse(rest)?;
            let (after, found) = name(after)?;
            let (after, _) = whitespace(after)?;
            let (after, _) = char::<_, XmlError>('>')
                .parse(after)
                .map_err(|_| fail_at(after, XmlErrorReason::UnterminatedStartTag))?;

            if found != element_name {
                return Err(fail_at(
                    rest,
                    XmlErrorReason::MismatchedClosingTag {
                        expected: element_name.to_string(),
                        found,
                    },
                ));
            }

            return Ok((after, nodes));
        }

        if fragment.starts_with("<!--") {
            rest = comment(rest)?.0;
        } else if fragment.starts_with("<![CDATA[") {
            let (after, text) = cdata(rest)?;
            push_text(&mut nodes, text);
            rest = after;
        } else if fragment.starts_with("<?") {
            rest = processing_instruction(rest)?.0;
        } else if fragment.starts_with('<') {
            let (after, child) = element(rest)?;
            nodes.push(Node::Element(child));
            rest = after;
        } else {
            let (after, raw) = take_till::<_, _, XmlError>(|c| c == '<').parse(rest)?;
            push_text(&mut nodes, decode_entities(raw)?);
            rest = after;
        }
    }
}

/// Appends text, merging it with a preceding text node.
fn push_text(nodes: &mut Vec<Node>, text: String) {
    if let Some(Node::Text(previous)) = nodes.last_mut() {
        previous.push_str(&text);
    } else {
        nodes.push(Node::Text(text));
    }
}

fn decode_entities(span: InputSpan<'_>) -> std::result::Result<String, nom::Err<XmlError>> {
    let text = *span.fragment();

    if !text.contains('&') {
        return Ok(text.to_string());
    }

    let mut decoded = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        decoded.push_str(&rest[..start]);

        let offset = text.len() - rest.len() + start;
        let after = &rest[start + 1..];
        let invalid = |entity: &str| {
            fail_at(
                span.take_from(offset),
                XmlErrorReason::InvalidEntity(entity.to_string()),
            )
        };

        let end = after
            .find(';')
            .ok_or_else(|| invalid(after.split_whitespace().next().unwrap_or_default()))?;
        let entity = &after[..end];

        decoded.push(decode_entity(entity).ok_or_else(|| invalid(entity))?);
        rest = &after[end + 1..];
    }

    decoded.push_str(rest);

    Ok(decoded)
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = match entity.strip_prefix("#x") {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => entity.strip_prefix('#')?.parse().ok()?,
            };

            char::from_u32(code)
        }
    }
}

fn resolve_namespaces(element: Element, scope: &HashMap<String, String>) -> Element {
    let (name, _, attributes, nodes) = element.into_parts();

    let declares_namespaces = attributes
        .keys()
        .any(|attribute| attribute == "xmlns" || attribute.starts_with("xmlns:"));

    let scope = if declares_namespaces {
        let mut scope = scope.clone();

        for (attribute, value) in &attributes {
            if attribute == "xmlns" {
                scope.insert(String::new(), value.clone());
            } else if let Some(prefix) = attribute.strip_prefix("xmlns:") {
                scope.insert(prefix.to_string(), value.clone());
            }
        }

        Cow::Owned(scope)
    } else {
        Cow::Borrowed(scope)
    };

    let prefix = split_qualified_name(&name).0.unwrap_or_default();
    let namespace = scope.get(prefix).filter(|namespace| !namespace.is_empty()).cloned();

    let nodes = nodes
        .into_iter()
        .map(|node| match node {
            Node::Element(child) => Node::Element(resolve_namespaces(child, &scope)),
            text @ Node::Text(_) => text,
        })
        .collect();

    Element::from_parts(name, namespace, attributes, nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEDML_NAMESPACE: &str = "http://sed-ml.org/sed-ml/level1/version4";

    #[test]
    fn parse_minimal_document() {
        let root = parse_document("<root/>").expect("document should parse");

        assert_eq!(root.name(), "root");
        assert!(root.is_empty());
        assert_eq!(root.namespace(), None);
    }

    #[test]
    fn parse_prolog_and_attributes() {
        let input = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- generated -->
<!DOCTYPE sedML [ <!ENTITY x "y"> ]>
<sedML xmlns="http://sed-ml.org/sed-ml/level1/version4" level='1' version="4">
  <listOfModels>
    <model id="model1" source="a &amp; b.cellml"/>
  </listOfModels>
</sedML>
"#;
        let root = parse_document(input).expect("document should parse");

        assert!(root.is("sedML", SEDML_NAMESPACE));
        assert_eq!(root.attribute("level"), Some("1"));

        let model = root
            .child("listOfModels")
            .and_then(|models| models.child("model"))
            .expect("model should exist");

        assert!(model.is("model", SEDML_NAMESPACE));
        assert_eq!(model.attribute("source"), Some("a & b.cellml"));
    }

    #[test]
    fn parse_prefixed_namespaces() {
        let input = r#"<model xmlns="http://www.cellml.org/cellml/1.1#" xmlns:cellml="http://www.cellml.org/cellml/1.1#">
  <math xmlns="http://www.w3.org/1998/Math/MathML"><cn cellml:units="dimensionless">3</cn></math>
</model>"#;
        let root = parse_document(input).expect("document should parse");
        let math = root.child("math").expect("math should exist");
        let cn = math.child("cn").expect("cn should exist");

        assert_eq!(root.namespace(), Some("http://www.cellml.org/cellml/1.1#"));
        assert_eq!(cn.namespace(), Some("http://www.w3.org/1998/Math/MathML"));
        assert_eq!(cn.attribute("units"), Some("dimensionless"));
        assert_eq!(cn.text(), "3");
    }

    #[test]
    fn parse_text_with_entities_and_cdata() {
        let root = parse_document("<a>x &lt; &#65;&#x42;<![CDATA[ <raw> ]]></a>")
            .expect("document should parse");

        assert_eq!(root.nodes(), [Node::Text("x < AB <raw> ".to_string())]);
    }

    #[test]
    fn reject_mismatched_closing_tag() {
        let error = parse_document("<a><b></a></b>").expect_err("document should not parse");

        assert_eq!(
            error.reason,
            XmlErrorReason::MismatchedClosingTag {
                expected: "b".to_string(),
                found: "a".to_string()
            }
        );
        assert_eq!(error.offset, 6);
    }

    #[test]
    fn reject_unclosed_element() {
        let error = parse_document("<a><b/>").expect_err("document should not parse");

        assert_eq!(error.reason, XmlErrorReason::UnclosedElement("a".to_string()));
    }

    #[test]
    fn reject_trailing_content() {
        let error = parse_document("<a/><b/>").expect_err("document should not parse");

        assert_eq!(error.reason, XmlErrorReason::TrailingContent);
    }

    #[test]
    fn reject_invalid_entity() {
        let error = parse_document("<a>&nope;</a>").expect_err("document should not parse");

        assert_eq!(error.reason, XmlErrorReason::InvalidEntity("nope".to_string()));
        assert_eq!(error.offset, 3);
    }

    #[test]
    fn reject_duplicate_attribute() {
        let error = parse_document(r#"<a x="1" x="2"/>"#).expect_err("document should not parse");

        assert_eq!(error.reason, XmlErrorReason::DuplicateAttribute("x".to_string()));
    }

    #[test]
    fn reject_non_xml() {
        let error = parse_document("Hello world!").expect_err("document should not parse");

        assert_eq!(error.reason, XmlErrorReason::ExpectedElement);
        assert!(parse_document("").is_err());
    }

    #[test]
    fn reject_unterminated_comment() {
        let error = parse_document("<a><!-- oops</a>").expect_err("document should not parse");

        assert_eq!(error.reason, XmlErrorReason::UnterminatedConstruct("comment"));
    }
}
