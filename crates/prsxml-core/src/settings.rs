use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::force_list::ForceListFn;
use crate::node::Node;

/// Default separator used when joining collapsed keys.
pub const DEFAULT_SEPARATOR: &str = "_";

/// Default key that carries an element's character data.
pub const DEFAULT_CDATA_KEY: &str = "#text";

/// Default prefix marking attribute keys.
pub const DEFAULT_ATTR_PREFIX: &str = "@";

/// Settings for [`crate::undo_cdata`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlattenSettings {
    /// Joins a parent key and a child key.
    pub separator: String,

    /// Key whose presence marks a mapping as text-bearing.
    pub cdata_key: String,

    /// Attribute marker dropped from a key when it is joined to its parent.
    /// An empty string keeps keys verbatim.
    pub attr_prefix: String,
}

impl Default for FlattenSettings {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            cdata_key: DEFAULT_CDATA_KEY.to_string(),
            attr_prefix: DEFAULT_ATTR_PREFIX.to_string(),
        }
    }
}

impl FlattenSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_cdata_key(mut self, cdata_key: impl Into<String>) -> Self {
        self.cdata_key = cdata_key.into();
        self
    }

    pub fn with_attr_prefix(mut self, attr_prefix: impl Into<String>) -> Self {
        self.attr_prefix = attr_prefix.into();
        self
    }
}

/// Settings for turning XML into a [`Node`] tree and back.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseSettings {
    /// Prefix put in front of attribute names.
    pub attr_prefix: String,

    /// Key holding text when an element also has attributes or children.
    pub cdata_key: String,

    /// Trim text and drop whitespace-only runs.
    pub strip_whitespace: bool,

    /// Include attributes in the tree.
    pub xml_attribs: bool,

    /// Called the first time a tag is added to its parent. Returning `true`
    /// stores the value as a one-element sequence.
    #[serde(skip)]
    pub force_list: Option<ForceListFn>,
}

impl Default for ParseSettings {
    fn default() -> Self {
        Self {
            attr_prefix: DEFAULT_ATTR_PREFIX.to_string(),
            cdata_key: DEFAULT_CDATA_KEY.to_string(),
            strip_whitespace: true,
            xml_attribs: true,
            force_list: None,
        }
    }
}

impl fmt::Debug for ParseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseSettings")
            .field("attr_prefix", &self.attr_prefix)
            .field("cdata_key", &self.cdata_key)
            .field("strip_whitespace", &self.strip_whitespace)
            .field("xml_attribs", &self.xml_attribs)
            .field("force_list", &self.force_list.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl ParseSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attr_prefix(mut self, attr_prefix: impl Into<String>) -> Self {
        self.attr_prefix = attr_prefix.into();
        self
    }

    pub fn with_cdata_key(mut self, cdata_key: impl Into<String>) -> Self {
        self.cdata_key = cdata_key.into();
        self
    }

    pub fn with_strip_whitespace(mut self, strip: bool) -> Self {
        self.strip_whitespace = strip;
        self
    }

    pub fn with_xml_attribs(mut self, include: bool) -> Self {
        self.xml_attribs = include;
        self
    }

    /// Installs a force-list callback. Accepts closures as well as
    /// [`crate::ForceListConfig::into_shared`].
    pub fn with_force_list<F>(mut self, force_list: F) -> Self
    where
        F: Fn(&[crate::PathSegment], &str, Option<&Node>) -> bool + Send + Sync + 'static,
    {
        self.force_list = Some(Arc::new(force_list));
        self
    }

    pub fn with_shared_force_list(mut self, force_list: ForceListFn) -> Self {
        self.force_list = Some(force_list);
        self
    }

    /// The flatten settings that match this parser's markers.
    pub fn flatten_settings(&self) -> FlattenSettings {
        FlattenSettings::default()
            .with_cdata_key(self.cdata_key.clone())
            .with_attr_prefix(self.attr_prefix.clone())
    }
}
