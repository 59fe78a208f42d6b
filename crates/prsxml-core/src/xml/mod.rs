//! Glue between XML text and the [`crate::Node`] tree.
//!
//! Tokenizing is left to `roxmltree` (reading) and `quick-xml` (writing);
//! this module only maps elements, attributes and text onto mappings the way
//! xmltodict does, and calls the force-list hook while doing so.

pub mod builder;
pub mod parser;

pub use builder::{to_xml, to_xml_bytes};
pub use parser::{parse, parse_bytes};
