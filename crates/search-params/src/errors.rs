//! Error types for SearchParameter definitions and registry lookups.
//!
//! Two layers:
//! - [`DefinitionError`] - raised while parsing and building a catalogue
//! - [`RegistryError`] - raised by registry lookups, wrapping definition
//!   errors surfaced by extension

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// Errors raised while turning catalogue entries into indexed definitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// A definition failed constructor validation.
    #[error("invalid SearchParameter definition '{code}': {message}")]
    InvalidDefinition { code: String, message: String },

    /// A catalogue entry is missing a required field or carries an unknown type.
    #[error("malformed SearchParameter {}: {message}", describe_entry(.url, .code))]
    MalformedDefinition {
        url: Option<String>,
        code: Option<String>,
        message: String,
    },

    /// A composite component names a definition that is not indexed.
    #[error("composite SearchParameter '{composite}' references unknown component '{component}'")]
    UnresolvedComponentReference { composite: String, component: String },

    /// The catalogue document itself could not be read.
    #[error("invalid SearchParameter catalogue '{source_name}': {message}")]
    InvalidCatalogue { source_name: String, message: String },
}

impl DefinitionError {
    pub(crate) fn missing_field(field: &str, url: Option<&str>, code: Option<&str>) -> Self {
        DefinitionError::MalformedDefinition {
            url: url.map(String::from),
            code: code.map(String::from),
            message: format!("missing required field '{}'", field),
        }
    }
}

fn describe_entry(url: &Option<String>, code: &Option<String>) -> String {
    match (url, code) {
        (Some(url), _) => format!("'{}'", url),
        (None, Some(code)) => format!("with code '{}'", code),
        (None, None) => "(unidentified entry)".to_string(),
    }
}

/// Errors returned by [`SearchParameterRegistry`](crate::SearchParameterRegistry) operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Building a catalogue failed; the registry is unchanged.
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("resource type '{resource_type}' has no search parameters")]
    UnsupportedResourceType { resource_type: String },

    #[error("search parameter '{code}' is not supported for resource type '{resource_type}'")]
    UnknownSearchParameter { resource_type: String, code: String },

    #[error("search parameter '{url}' is not supported")]
    UnknownSearchParameterUrl { url: String },

    #[error("component index {index} is out of range for '{parameter}' ({count} components)")]
    IndexOutOfRange {
        parameter: String,
        index: usize,
        count: usize,
    },
}

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
