//! Document validation utilities.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("document is not a JSON object")]
    NotAnObject,
    #[error("document _id is required")]
    MissingId,
    #[error("document _type is required")]
    MissingType,
    #[error("document _id cannot be empty")]
    EmptyId,
    #[error("document _type cannot be empty")]
    EmptyType,
    #[error("document _id is not site-namespaced: {0}")]
    NotNamespaced(String),
    #[error("unknown document _type: {0}")]
    UnknownType(String),
    #[error("document {id} has site {site} that does not match its id")]
    SiteMismatch { id: String, site: String },
    #[error("invalid site tag: {0:?}")]
    InvalidSiteTag(String),
}

/// Validate that a document has the minimum required fields.
pub fn validate_document_fields(
    id: Option<&str>,
    doc_type: Option<&str>,
) -> Result<(), ValidationError> {
    match id {
        None => return Err(ValidationError::MissingId),
        Some("") => return Err(ValidationError::EmptyId),
        _ => {}
    }
    match doc_type {
        None => return Err(ValidationError::MissingType),
        Some("") => return Err(ValidationError::EmptyType),
        _ => {}
    }
    Ok(())
}
