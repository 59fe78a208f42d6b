//! Helpers for working with XML that has been parsed into nested mappings
//! (the xmltodict shape).
//!
//! - [`undo_cdata`] collapses text-bearing nodes into their parent key.
//! - [`create_force_list_callable`] builds the "force this tag into a list"
//!   callback used at tag-open time.
//! - [`replace_none`] turns null values into empty strings.

pub mod document;
pub mod error;
pub mod flatten;
pub mod force_list;
pub mod node;
pub mod settings;
pub mod values;
pub mod xml;

pub use error::{PrsXmlError, Result};

pub use document::XmlDict;
pub use flatten::{flatten, undo_cdata};
pub use force_list::{create_force_list_callable, ForceListConfig, ForceListFn, PathSegment};
pub use node::{Mapping, Node};
pub use settings::{FlattenSettings, ParseSettings};
pub use values::replace_none;
