use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

use crate::error::{PrsXmlError, Result};
use crate::node::{Mapping, Node};
use crate::settings::ParseSettings;

/// Writes a tree in the shape produced by [`super::parse`] back to XML.
///
/// The root must be a mapping with exactly one key. Keys starting with the
/// attribute prefix become attributes, the cdata key becomes text, sequences
/// repeat their element and `Null` writes an empty element.
pub fn to_xml(node: &Node, settings: &ParseSettings) -> Result<String> {
    let bytes = to_xml_bytes(node, settings)?;
    String::from_utf8(bytes).map_err(|e| PrsXmlError::XmlWrite(e.to_string()))
}

pub fn to_xml_bytes(node: &Node, settings: &ParseSettings) -> Result<Vec<u8>> {
    let root = match node {
        Node::Mapping(map) if map.len() == 1 => map,
        _ => return Err(PrsXmlError::XmlWrite("document must have exactly one root".to_string())),
    };
    if let Some(Node::Sequence(items)) = root.values().next() {
        if items.len() != 1 {
            return Err(PrsXmlError::XmlWrite("document must have exactly one root".to_string()));
        }
    }

    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(|e| PrsXmlError::XmlWrite(e.to_string()))?;

    for (name, value) in root {
        write_value(&mut writer, name, value, settings)?;
    }

    Ok(writer.into_inner().into_inner())
}

fn write_value<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &Node,
    settings: &ParseSettings,
) -> Result<()> {
    match value {
        Node::Sequence(items) => {
            for item in items {
                write_value(writer, name, item, settings)?;
            }
            Ok(())
        }
        Node::Mapping(map) => write_mapping(writer, name, map, settings),
        Node::Null => write_event(writer, Event::Empty(BytesStart::new(name))),
        scalar => {
            write_event(writer, Event::Start(BytesStart::new(name)))?;
            if let Some(text) = scalar_text(scalar) {
                write_event(writer, Event::Text(BytesText::new(&text)))?;
            }
            write_event(writer, Event::End(BytesEnd::new(name)))
        }
    }
}

fn write_mapping<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    map: &Mapping,
    settings: &ParseSettings,
) -> Result<()> {
    let mut elem = BytesStart::new(name);
    let mut text = None;
    let mut children = Vec::new();

    for (key, value) in map {
        if *key == settings.cdata_key {
            text = scalar_text(value);
            continue;
        }

        let attr_name = if settings.attr_prefix.is_empty() {
            None
        } else {
            key.strip_prefix(settings.attr_prefix.as_str())
        };

        match attr_name {
            Some(attr) => {
                if let Some(attr_value) = scalar_text(value) {
                    elem.push_attribute((attr, attr_value.as_str()));
                }
            }
            None => children.push((key, value)),
        }
    }

    if text.is_none() && children.is_empty() {
        return write_event(writer, Event::Empty(elem));
    }

    write_event(writer, Event::Start(elem))?;
    for (key, value) in children {
        write_value(writer, key, value, settings)?;
    }
    if let Some(text) = text {
        write_event(writer, Event::Text(BytesText::new(&text)))?;
    }
    write_event(writer, Event::End(BytesEnd::new(name)))
}

fn write_event<W: std::io::Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| PrsXmlError::XmlWrite(e.to_string()))
}

fn scalar_text(value: &Node) -> Option<String> {
    match value {
        Node::Text(s) => Some(s.clone()),
        Node::Bool(b) => Some(b.to_string()),
        Node::Int(i) => Some(i.to_string()),
        Node::Float(f) => Some(f.to_string()),
        Node::Null | Node::Sequence(_) | Node::Mapping(_) => None,
    }
}
