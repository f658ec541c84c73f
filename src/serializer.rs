//! Serialization of OpenAPI documents to YAML or JSON.
//!
//! This module turns a finished [`OpenApiDocument`] into text and writes it to disk.

use crate::error::Result;
use crate::model::OpenApiDocument;
use log::debug;
use std::fs;
use std::path::Path;

/// Serializes an OpenAPI document to YAML.
///
/// # Errors
///
/// Returns [`crate::error::Error::SerializationError`] if the document cannot be encoded.
///
/// # Example
///
/// ```
/// use openapi_from_routes::model::OpenApiDocument;
/// use openapi_from_routes::serializer::serialize_yaml;
///
/// let yaml = serialize_yaml(&OpenApiDocument::default()).unwrap();
/// assert!(yaml.starts_with("openapi: 3.0.1"));
/// ```
pub fn serialize_yaml(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to YAML");
    Ok(serde_yaml::to_string(doc)?)
}

/// Serializes an OpenAPI document to JSON, indented when `pretty` is set.
///
/// The configuration flag `writer-with-default-pretty-printer` is the usual source of
/// `pretty`.
///
/// # Errors
///
/// Returns [`crate::error::Error::SerializationError`] if the document cannot be encoded.
pub fn serialize_json(doc: &OpenApiDocument, pretty: bool) -> Result<String> {
    debug!("Serializing OpenAPI document to JSON (pretty: {})", pretty);
    let json = if pretty {
        serde_json::to_string_pretty(doc)?
    } else {
        serde_json::to_string(doc)?
    };
    Ok(json)
}

/// Writes string content to a file.
///
/// Creates the file if it doesn't exist, or overwrites it if it does. Missing parent
/// directories are created.
///
/// # Errors
///
/// Returns [`crate::error::Error::IoError`] if a directory or the file cannot be written.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}
