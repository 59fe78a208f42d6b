use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrsXmlError {
    /// An empty key was found where it would have to be joined to a parent key.
    #[error("Keys cannot be empty strings.")]
    EmptyKey,

    #[error("XML parsing error at {location}: {message}")]
    XmlParse { message: String, location: String },

    #[error("XML serialization error: {0}")]
    XmlWrite(String),

    #[error("Invalid force-list configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PrsXmlError>;
