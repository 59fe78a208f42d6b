//! Decides which tags the parser should always store as a sequence.
//!
//! Some repeated tags must be sequences even when a document holds only one
//! of them, otherwise downstream consumers see a mapping in one document and a
//! list in the next. Others are only forced below specific ancestors, so that
//! an unrelated tag with the same name elsewhere keeps its natural shape.
//!
//! Build the [`ForceListConfig`] once and hand the resulting predicate to
//! every parse; it is read-only and can be shared between threads.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::node::Node;

/// Shared, type-erased force-list callback as stored in
/// [`crate::ParseSettings`].
pub type ForceListFn = Arc<dyn Fn(&[PathSegment], &str, Option<&Node>) -> bool + Send + Sync>;

/// One ancestor on the path from the document root to the current tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub name: String,
    pub attributes: Option<IndexMap<String, String>>,
}

impl PathSegment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: None,
        }
    }

    pub fn with_attributes(name: impl Into<String>, attributes: IndexMap<String, String>) -> Self {
        Self {
            name: name.into(),
            attributes: Some(attributes),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Candidate tags plus the ancestor paths that restrict some of them.
///
/// A tag in `keys` without an entry in `paths` is forced everywhere. A tag
/// with an entry is forced only when its ancestor names match one of the
/// listed paths exactly. Tags outside `keys` are never forced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForceListConfig {
    pub keys: HashSet<String>,
    #[serde(default)]
    pub paths: HashMap<String, Vec<Vec<String>>>,
}

impl ForceListConfig {
    pub fn new<I, S>(keys: I, paths: HashMap<String, Vec<Vec<String>>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            paths,
        }
    }

    /// Loads a table of the form
    /// `{"keys": ["row"], "paths": {"row": [["table", "body"]]}}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;

        for tag in config.paths.keys().filter(|tag| !config.keys.contains(*tag)) {
            tracing::warn!(tag = %tag, "force-list path registered for a tag that is not a candidate key; it will never match");
        }
        tracing::debug!(
            keys = config.keys.len(),
            restricted = config.paths.len(),
            "loaded force-list configuration"
        );

        Ok(config)
    }

    /// Whether `current_key`, opened below `parent_path`, must become a
    /// sequence. `value` is accepted for callback compatibility and ignored.
    pub fn should_force(&self, parent_path: &[PathSegment], current_key: &str, _value: Option<&Node>) -> bool {
        if !self.keys.contains(current_key) {
            return false;
        }

        let Some(signatures) = self.paths.get(current_key) else {
            return true;
        };

        signatures.iter().any(|signature| {
            signature.len() == parent_path.len()
                && signature
                    .iter()
                    .zip(parent_path)
                    .all(|(expected, segment)| *expected == segment.name)
        })
    }

    /// Wraps the configuration in an `Arc` so one table serves every parse.
    pub fn into_shared(self) -> ForceListFn {
        let config = Arc::new(self);
        Arc::new(move |parent_path: &[PathSegment], current_key: &str, value: Option<&Node>| {
            config.should_force(parent_path, current_key, value)
        })
    }
}

/// Builds the force-list predicate for `keys` and `paths`.
///
/// The returned closure owns its table and has the
/// `(parent_path, current_key, value)` shape the parser calls at every tag.
pub fn create_force_list_callable<I, S>(
    keys: I,
    paths: HashMap<String, Vec<Vec<String>>>,
) -> impl Fn(&[PathSegment], &str, Option<&Node>) -> bool + Clone + Send + Sync
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let config = ForceListConfig::new(keys, paths);
    move |parent_path: &[PathSegment], current_key: &str, value: Option<&Node>| {
        config.should_force(parent_path, current_key, value)
    }
}
