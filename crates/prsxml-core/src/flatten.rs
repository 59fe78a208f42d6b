//! Undoes the `#text` wrapping the parser applies to elements that carry both
//! text and attributes or children.
//!
//! A mapping holding the cdata key loses its own level: its text moves up to
//! the parent key and its other entries are joined to the parent key with the
//! separator. Mappings without text stay nested.
//!
//! The traversal has two tiers of different depth:
//!
//! - [`undo_cdata`] walks the mapping it is given and recurses fully into
//!   text-bearing children.
//! - [`collapse_one_level`] handles a nested mapping without text. It collapses
//!   text-bearing grandchildren under their own key only, and restarts a fresh
//!   [`undo_cdata`] with the default separator and cdata key for mappings
//!   further down. The attribute prefix is kept across restarts.
//!
//! Output for deeply nested documents depends on that asymmetry, so the two
//! tiers must not be merged.

use crate::error::{PrsXmlError, Result};
use crate::node::{Mapping, Node};
use crate::settings::FlattenSettings;

/// Flattens `node` with the default separator, cdata key and attribute prefix.
pub fn flatten(node: &Node) -> Result<Mapping> {
    undo_cdata(node, "", &FlattenSettings::default())
}

/// Collapses text-bearing mappings of `node` into their parent key.
///
/// A non-mapping `node` is treated as `{"value": node}`. Keys are joined to
/// `parent_key` with the separator; a joined key ending in
/// `separator + cdata_key` drops that suffix, so the text of `<a>` ends up
/// under `a`.
///
/// Fails with [`PrsXmlError::EmptyKey`] when an empty key would be joined to
/// a non-empty parent key, or when an empty key holds a mapping. The input is
/// never modified. Keys that collide after joining keep the last value.
pub fn undo_cdata(node: &Node, parent_key: &str, settings: &FlattenSettings) -> Result<Mapping> {
    let wrapped;
    let entries = match node {
        Node::Mapping(map) => map,
        other => {
            wrapped = Mapping::from([("value".to_string(), other.clone())]);
            &wrapped
        }
    };

    let mut items = Mapping::with_capacity(entries.len());

    for (key, value) in entries {
        if key.is_empty() && (!parent_key.is_empty() || value.is_mapping()) {
            tracing::debug!(parent_key, "rejecting empty key");
            return Err(PrsXmlError::EmptyKey);
        }

        let new_key = join_key(parent_key, key, settings);

        match value {
            Node::Mapping(inner) if inner.contains_key(&settings.cdata_key) => {
                for (k, v) in undo_cdata(value, &new_key, settings)? {
                    insert_entry(&mut items, k, v);
                }
            }
            Node::Mapping(inner) => {
                let collapsed = collapse_one_level(inner, settings)?;
                insert_entry(&mut items, new_key, Node::Mapping(collapsed));
            }
            Node::Sequence(elements) => {
                // Only the separator and attribute prefix reach list elements at this tier.
                let element_settings = FlattenSettings::default()
                    .with_separator(settings.separator.clone())
                    .with_attr_prefix(settings.attr_prefix.clone());
                let normalized = elements
                    .iter()
                    .map(|element| undo_cdata(element, "", &element_settings).map(Node::Mapping))
                    .collect::<Result<Vec<_>>>()?;
                insert_entry(&mut items, new_key, Node::Sequence(normalized));
            }
            scalar => insert_entry(&mut items, new_key, scalar.clone()),
        }
    }

    Ok(items)
}

/// Second tier: normalizes a nested mapping that carries no text itself.
fn collapse_one_level(inner: &Mapping, settings: &FlattenSettings) -> Result<Mapping> {
    let mut sub_items = Mapping::with_capacity(inner.len());

    for (key, value) in inner {
        match value {
            Node::Mapping(grandchild) if grandchild.contains_key(&settings.cdata_key) => {
                for (k, v) in undo_cdata(value, key, settings)? {
                    insert_entry(&mut sub_items, k, v);
                }
            }
            Node::Mapping(_) => {
                let restart = FlattenSettings::default().with_attr_prefix(settings.attr_prefix.clone());
                let document = undo_cdata(value, "", &restart)?;
                insert_entry(&mut sub_items, key.clone(), Node::Mapping(document));
            }
            Node::Sequence(elements) => {
                let normalized = elements
                    .iter()
                    .map(|element| undo_cdata(element, "", settings).map(Node::Mapping))
                    .collect::<Result<Vec<_>>>()?;
                insert_entry(&mut sub_items, key.clone(), Node::Sequence(normalized));
            }
            scalar => insert_entry(&mut sub_items, key.clone(), scalar.clone()),
        }
    }

    Ok(sub_items)
}

fn join_key(parent_key: &str, key: &str, settings: &FlattenSettings) -> String {
    if parent_key.is_empty() {
        return key.to_string();
    }

    let sep = &settings.separator;
    let joined = format!("{parent_key}{sep}{key}");
    let cdata_suffix = format!("{sep}{}", settings.cdata_key);

    if let Some(stripped) = joined.strip_suffix(&cdata_suffix) {
        return stripped.to_string();
    }

    match key.strip_prefix(settings.attr_prefix.as_str()) {
        Some(name) if !settings.attr_prefix.is_empty() && !name.is_empty() => {
            format!("{parent_key}{sep}{name}")
        }
        _ => joined,
    }
}

fn insert_entry(items: &mut Mapping, key: String, value: Node) {
    if items.contains_key(&key) {
        tracing::debug!(key = %key, "flattened key collision, keeping the last value");
    }
    items.insert(key, value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn node(value: serde_json::Value) -> Node {
        Node::from(value)
    }

    fn mapping(value: serde_json::Value) -> Mapping {
        match Node::from(value) {
            Node::Mapping(map) => map,
            other => panic!("expected a mapping, got {:?}", other),
        }
    }

    #[test]
    fn flat_mapping_is_unchanged() {
        let input = json!({"a": "1", "b": null, "c": 3});
        assert_eq!(flatten(&node(input.clone())).unwrap(), mapping(input));
    }

    #[test]
    fn text_node_collapses_into_parent() {
        let input = node(json!({"a": {"#text": "hello", "@attr": "x"}}));
        assert_eq!(
            flatten(&input).unwrap(),
            mapping(json!({"a": "hello", "a_attr": "x"}))
        );
    }

    #[test]
    fn empty_attr_prefix_keeps_marker() {
        let input = node(json!({"a": {"#text": "hello", "@attr": "x"}}));
        let settings = FlattenSettings::new().with_attr_prefix("");

        assert_eq!(
            undo_cdata(&input, "", &settings).unwrap(),
            mapping(json!({"a": "hello", "a_@attr": "x"}))
        );
    }

    #[test]
    fn custom_separator_and_cdata_key() {
        let input = node(json!({"a": {"$": "v", "@id": "7"}}));
        let settings = FlattenSettings::new().with_separator(".").with_cdata_key("$");

        assert_eq!(
            undo_cdata(&input, "", &settings).unwrap(),
            mapping(json!({"a": "v", "a.id": "7"}))
        );
    }

    #[test]
    fn parent_key_prefixes_top_level_keys() {
        let input = node(json!({"x": "1", "#text": "t"}));
        assert_eq!(
            undo_cdata(&input, "p", &FlattenSettings::default()).unwrap(),
            mapping(json!({"p_x": "1", "p": "t"}))
        );
    }

    #[test]
    fn scalar_root_is_wrapped_under_value() {
        assert_eq!(flatten(&Node::from("abc")).unwrap(), mapping(json!({"value": "abc"})));
        assert_eq!(flatten(&Node::Null).unwrap(), mapping(json!({"value": null})));
    }

    #[test]
    fn nested_text_collapses_recursively() {
        let input = node(json!({
            "a": {"#text": "t", "b": {"#text": "u", "@c": "1"}}
        }));
        assert_eq!(
            flatten(&input).unwrap(),
            mapping(json!({"a": "t", "a_b": "u", "a_b_c": "1"}))
        );
    }

    #[test]
    fn structural_mapping_stays_nested() {
        let input = node(json!({
            "order": {
                "id": "42",
                "customer": {"#text": "Ada", "@type": "person"}
            }
        }));
        assert_eq!(
            flatten(&input).unwrap(),
            mapping(json!({
                "order": {"id": "42", "customer": "Ada", "customer_type": "person"}
            }))
        );
    }

    #[test]
    fn deep_structure_restarts_with_default_settings() {
        // Below a structural mapping the custom cdata key is no longer used.
        let input = node(json!({
            "root": {
                "mid": {"leaf": {"$": "v", "@x": "1"}}
            }
        }));
        let settings = FlattenSettings::new().with_cdata_key("$");

        assert_eq!(
            undo_cdata(&input, "", &settings).unwrap(),
            mapping(json!({
                "root": {"mid": {"leaf": {"$": "v", "@x": "1"}}}
            }))
        );
    }

    #[test]
    fn deep_structure_collapses_at_every_restart() {
        let input = node(json!({
            "root": {
                "mid": {"leaf": {"#text": "v", "@x": "1"}}
            }
        }));
        assert_eq!(
            flatten(&input).unwrap(),
            mapping(json!({
                "root": {"mid": {"leaf": "v", "leaf_x": "1"}}
            }))
        );
    }

    #[test]
    fn sequences_are_normalized_elementwise() {
        let input = node(json!({
            "items": [
                {"item": {"#text": "a", "@n": "1"}},
                "plain"
            ]
        }));
        assert_eq!(
            flatten(&input).unwrap(),
            mapping(json!({
                "items": [
                    {"item": "a", "item_n": "1"},
                    {"value": "plain"}
                ]
            }))
        );
    }

    #[test]
    fn top_level_sequence_drops_custom_cdata_key() {
        let input = node(json!({"rows": [{"r": {"$": "v"}}]}));
        let settings = FlattenSettings::new().with_cdata_key("$");

        assert_eq!(
            undo_cdata(&input, "", &settings).unwrap(),
            mapping(json!({"rows": [{"r": {"$": "v"}}]}))
        );
    }

    #[test]
    fn nested_sequence_keeps_custom_cdata_key() {
        let input = node(json!({"t": {"rows": [{"r": {"$": "v"}}]}}));
        let settings = FlattenSettings::new().with_cdata_key("$");

        assert_eq!(
            undo_cdata(&input, "", &settings).unwrap(),
            mapping(json!({"t": {"rows": [{"r": "v"}]}}))
        );
    }

    #[test]
    fn empty_attr_prefix_survives_deep_restart() {
        let input = node(json!({
            "root": {
                "mid": {"leaf": {"#text": "v", "@x": "1"}}
            }
        }));
        let settings = FlattenSettings::new().with_attr_prefix("");

        assert_eq!(
            undo_cdata(&input, "", &settings).unwrap(),
            mapping(json!({
                "root": {"mid": {"leaf": "v", "leaf_@x": "1"}}
            }))
        );
    }

    #[test]
    fn empty_attr_prefix_survives_top_level_sequence() {
        let input = node(json!({"rows": [{"leaf": {"#text": "v", "@x": "1"}}]}));
        let settings = FlattenSettings::new().with_attr_prefix("");

        assert_eq!(
            undo_cdata(&input, "", &settings).unwrap(),
            mapping(json!({"rows": [{"leaf": "v", "leaf_@x": "1"}]}))
        );
    }

    #[test]
    fn custom_attr_prefix_is_stripped_at_every_depth() {
        let input = node(json!({
            "a": {"#text": "t", "-k": "1"},
            "doc": {
                "mid": {"b": {"#text": "u", "-k": "2"}}
            },
            "rows": [{"c": {"#text": "w", "-k": "3"}}]
        }));
        let settings = FlattenSettings::new().with_attr_prefix("-");

        assert_eq!(
            undo_cdata(&input, "", &settings).unwrap(),
            mapping(json!({
                "a": "t",
                "a_k": "1",
                "doc": {"mid": {"b": "u", "b_k": "2"}},
                "rows": [{"c": "w", "c_k": "3"}]
            }))
        );
    }

    #[test]
    fn empty_key_under_parent_is_rejected() {
        let input = node(json!({"": {"x": "1"}}));
        let err = undo_cdata(&input, "parent", &FlattenSettings::default()).unwrap_err();
        assert!(matches!(err, PrsXmlError::EmptyKey));
    }

    #[test]
    fn empty_key_with_mapping_value_is_rejected_at_root() {
        let input = node(json!({"": {"#text": "x"}}));
        assert!(matches!(flatten(&input), Err(PrsXmlError::EmptyKey)));
    }

    #[test]
    fn empty_key_scalar_at_root_is_allowed() {
        let input = node(json!({"": "x"}));
        assert_eq!(flatten(&input).unwrap(), mapping(json!({"": "x"})));
    }

    #[test]
    fn empty_key_inside_text_node_is_rejected() {
        let input = node(json!({"a": {"#text": "t", "": "oops"}}));
        assert!(matches!(flatten(&input), Err(PrsXmlError::EmptyKey)));
    }

    #[test]
    fn collision_keeps_last_value_in_first_position() {
        let input = node(json!({"a": {"#text": "t", "@b": "from attr"}}));
        let mut map = mapping(input.clone().into());
        map.insert("a_b".to_string(), Node::from("sibling"));

        let out = flatten(&Node::Mapping(map)).unwrap();
        let keys: Vec<_> = out.keys().cloned().collect();
        assert_eq!(keys, vec!["a".to_string(), "a_b".to_string()]);
        assert_eq!(out["a_b"], Node::from("sibling"));
    }

    #[test]
    fn input_is_not_modified() {
        let input = node(json!({"a": {"#text": "t", "b": {"c": {"#text": "d"}}}, "l": [{"#text": "x"}]}));
        let before = input.clone();
        flatten(&input).unwrap();
        assert_eq!(input, before);
    }

    #[test]
    fn join_key_strips_cdata_suffix_only_when_joined() {
        let settings = FlattenSettings::default();
        assert_eq!(join_key("", "#text", &settings), "#text");
        assert_eq!(join_key("a", "#text", &settings), "a");
        assert_eq!(join_key("a", "b_#text", &settings), "a_b");
        assert_eq!(join_key("a", "@", &settings), "a_@");
    }
}
