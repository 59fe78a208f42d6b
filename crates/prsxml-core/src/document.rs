use crate::error::Result;
use crate::flatten::undo_cdata;
use crate::node::{Mapping, Node};
use crate::settings::{FlattenSettings, ParseSettings};
use crate::xml;

/// A parsed XML document held as a [`Node`] tree.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDict {
    root: Node,
}

impl XmlDict {
    pub fn parse(xml: &str, settings: &ParseSettings) -> Result<Self> {
        Ok(Self {
            root: xml::parse(xml, settings)?,
        })
    }

    pub fn from_bytes(bytes: &[u8], settings: &ParseSettings) -> Result<Self> {
        Ok(Self {
            root: xml::parse_bytes(bytes, settings)?,
        })
    }

    pub fn from_node(root: Node) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn into_node(self) -> Node {
        self.root
    }

    /// Flattened view of the document; see [`undo_cdata`].
    pub fn flatten(&self, settings: &FlattenSettings) -> Result<Mapping> {
        undo_cdata(&self.root, "", settings)
    }

    pub fn to_xml(&self, settings: &ParseSettings) -> Result<String> {
        xml::to_xml(&self.root, settings)
    }
}
