use indexmap::IndexMap;

use crate::error::{PrsXmlError, Result};
use crate::force_list::PathSegment;
use crate::node::{Mapping, Node};
use crate::settings::ParseSettings;

pub fn parse(xml: &str, settings: &ParseSettings) -> Result<Node> {
    let doc = roxmltree::Document::parse_with_options(
        xml,
        roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        },
    )
    .map_err(|e| PrsXmlError::XmlParse {
        message: e.to_string(),
        location: format!("line {}", e.pos().row),
    })?;

    let root = doc.root_element();
    let root_name = qualified_name(root);
    let mut path = Vec::new();
    let value = build_element(root, settings, &mut path);

    let mut document = Mapping::new();
    push_data(&mut document, root_name, value, &path, settings);

    tracing::debug!(
        elements = doc.descendants().filter(|n| n.is_element()).count(),
        "parsed XML into mapping tree"
    );

    Ok(Node::Mapping(document))
}

pub fn parse_bytes(bytes: &[u8], settings: &ParseSettings) -> Result<Node> {
    let text = std::str::from_utf8(bytes).map_err(|e| PrsXmlError::XmlParse {
        message: e.to_string(),
        location: "input".to_string(),
    })?;
    parse(text, settings)
}

/// Builds the value of one element. `path` holds the ancestors of `node` and
/// is restored before returning.
fn build_element(node: roxmltree::Node, settings: &ParseSettings, path: &mut Vec<PathSegment>) -> Node {
    let attributes: IndexMap<String, String> = namespace_declarations(node)
        .into_iter()
        .chain(
            node.attributes()
                .map(|attr| (attribute_name(node, &attr), attr.value().to_string())),
        )
        .collect();

    let mut item = Mapping::new();
    if settings.xml_attribs {
        for (name, value) in &attributes {
            item.insert(
                format!("{}{}", settings.attr_prefix, name),
                Node::Text(value.clone()),
            );
        }
    }

    path.push(PathSegment {
        name: qualified_name(node),
        attributes: (!attributes.is_empty()).then_some(attributes),
    });

    let mut text = String::new();
    for child in node.children() {
        if child.is_element() {
            let child_name = qualified_name(child);
            let child_value = build_element(child, settings, path);
            push_data(&mut item, child_name, child_value, path, settings);
        } else if child.is_text() {
            if let Some(t) = child.text() {
                text.push_str(t);
            }
        }
    }

    path.pop();

    let text = if settings.strip_whitespace {
        text.trim().to_string()
    } else {
        text
    };

    if item.is_empty() {
        return if text.is_empty() { Node::Null } else { Node::Text(text) };
    }

    if !text.is_empty() {
        // Same ancestors as the element itself, as the hook sees it.
        push_data(&mut item, settings.cdata_key.clone(), Node::Text(text), path, settings);
    }
    Node::Mapping(item)
}

/// Adds `data` under `key`, turning repeated keys into a sequence and asking
/// the force-list hook about first occurrences.
fn push_data(item: &mut Mapping, key: String, data: Node, parent_path: &[PathSegment], settings: &ParseSettings) {
    if let Some(existing) = item.get_mut(&key) {
        match existing {
            Node::Sequence(items) => items.push(data),
            other => {
                let first = std::mem::take(other);
                *other = Node::Sequence(vec![first, data]);
            }
        }
        return;
    }

    let forced = settings
        .force_list
        .as_ref()
        .is_some_and(|force| force(parent_path, &key, Some(&data)));

    if forced {
        tracing::trace!(key = %key, depth = parent_path.len(), "forcing tag into a list");
        item.insert(key, Node::Sequence(vec![data]));
    } else {
        item.insert(key, data);
    }
}

/// `xmlns` / `xmlns:prefix` entries for the namespaces declared on `node`
/// itself. roxmltree reports every namespace in scope, so the ones already
/// in scope on the parent are skipped.
fn namespace_declarations(node: roxmltree::Node) -> Vec<(String, String)> {
    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|parent| parent.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();

    node.namespaces()
        .filter(|ns| ns.name() != Some("xml") && !inherited.contains(&(ns.name(), ns.uri())))
        .map(|ns| match ns.name() {
            Some(prefix) => (format!("xmlns:{}", prefix), ns.uri().to_string()),
            None => ("xmlns".to_string(), ns.uri().to_string()),
        })
        .collect()
}

fn qualified_name(node: roxmltree::Node) -> String {
    let tag = node.tag_name();
    match tag.namespace().and_then(|ns| node.lookup_prefix(ns)) {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, tag.name()),
        _ => tag.name().to_string(),
    }
}

fn attribute_name(node: roxmltree::Node, attr: &roxmltree::Attribute) -> String {
    match attr.namespace().and_then(|ns| node.lookup_prefix(ns)) {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, attr.name()),
        _ => attr.name().to_string(),
    }
}
