use crate::node::{Mapping, Node};

/// Replaces every `Null` value of `mapping` with an empty string.
///
/// Only the immediate values are visited; nested mappings and sequences are
/// copied as they are.
pub fn replace_none(mapping: &Mapping) -> Mapping {
    mapping
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Node::Null => Node::Text(String::new()),
                other => other.clone(),
            };
            (key.clone(), value)
        })
        .collect()
}
