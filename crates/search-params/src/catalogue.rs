//! SearchParameter catalogues.
//!
//! A catalogue is a batch of `SearchParameter` resources, either the
//! embedded base set compiled into the binary or a runtime extension read
//! from JSON. Three shapes are accepted:
//! - a FHIR `Bundle` (`entry[].resource`)
//! - a JSON array of resources
//! - a single `SearchParameter` resource
//!
//! Resources of any other type inside a bundle or array are skipped.

use std::path::Path;

use serde_json::Value;

use crate::definition::{ComponentReference, SearchParameterDefinition};
use crate::errors::DefinitionError;
use crate::types::SearchParamType;

const EMBEDDED_SEARCH_PARAMETERS: &str = include_str!("../data/search-parameters.json");

const SEARCH_PARAMETER: &str = "SearchParameter";

/// A batch of raw SearchParameter entries.
#[derive(Debug, Clone)]
pub struct Catalogue {
    source_name: String,
    document: Value,
}

impl Catalogue {
    /// Wraps an already-parsed JSON document.
    pub fn from_json(source_name: impl Into<String>, document: Value) -> Self {
        Self {
            source_name: source_name.into(),
            document,
        }
    }

    /// Parses a JSON string.
    pub fn from_json_str(
        source_name: impl Into<String>,
        json: &str,
    ) -> Result<Self, DefinitionError> {
        let source_name = source_name.into();
        let document = serde_json::from_str(json).map_err(|e| DefinitionError::InvalidCatalogue {
            source_name: source_name.clone(),
            message: format!("invalid JSON: {}", e),
        })?;
        Ok(Self {
            source_name,
            document,
        })
    }

    /// Reads and parses a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, DefinitionError> {
        let source_name = path.display().to_string();
        let content =
            std::fs::read_to_string(path).map_err(|e| DefinitionError::InvalidCatalogue {
                source_name: source_name.clone(),
                message: e.to_string(),
            })?;
        Self::from_json_str(source_name, &content)
    }

    /// The base catalogue compiled into the crate.
    pub fn embedded() -> Result<Self, DefinitionError> {
        Self::from_json_str("embedded:search-parameters.json", EMBEDDED_SEARCH_PARAMETERS)
    }

    /// Name of the source this catalogue was read from.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Returns the `SearchParameter` resources in document order.
    pub fn entries(&self) -> Result<Vec<&Value>, DefinitionError> {
        let doc = &self.document;

        if let Some(entries) = doc.get("entry").and_then(|e| e.as_array()) {
            return Ok(entries
                .iter()
                .filter_map(|entry| entry.get("resource"))
                .filter(|resource| is_search_parameter(resource))
                .collect());
        }

        if let Some(array) = doc.as_array() {
            return Ok(array.iter().filter(|item| is_search_parameter(item)).collect());
        }

        if is_search_parameter(doc) {
            return Ok(vec![doc]);
        }

        // An empty Bundle has no "entry" element at all.
        if doc.get("resourceType").and_then(|t| t.as_str()) == Some("Bundle") {
            return Ok(Vec::new());
        }

        Err(DefinitionError::InvalidCatalogue {
            source_name: self.source_name.clone(),
            message: "expected a Bundle, an array, or a SearchParameter resource".to_string(),
        })
    }

    /// Parses every entry into a definition, failing on the first malformed one.
    pub fn definitions(&self) -> Result<Vec<SearchParameterDefinition>, DefinitionError> {
        self.entries()?.into_iter().map(parse_entry).collect()
    }
}

fn is_search_parameter(resource: &Value) -> bool {
    resource.get("resourceType").and_then(|t| t.as_str()) == Some(SEARCH_PARAMETER)
}

/// Parses a SearchParameter FHIR resource into a definition.
pub fn parse_entry(resource: &Value) -> Result<SearchParameterDefinition, DefinitionError> {
    let url = string_field(resource, "url");
    let code = string_field(resource, "code");

    let url = url.ok_or_else(|| DefinitionError::missing_field("url", None, code))?;
    let code = code.ok_or_else(|| DefinitionError::missing_field("code", Some(url), None))?;

    let type_str = string_field(resource, "type")
        .ok_or_else(|| DefinitionError::missing_field("type", Some(url), Some(code)))?;

    let param_type = type_str
        .parse::<SearchParamType>()
        .map_err(|message| DefinitionError::MalformedDefinition {
            url: Some(url.to_string()),
            code: Some(code.to_string()),
            message,
        })?;

    let expression = string_field(resource, "expression").filter(|e| !e.is_empty());

    // Composites and special parameters (_text, _content, ...) may omit it
    if expression.is_none() && param_type != SearchParamType::Composite && !code.starts_with('_')
    {
        return Err(DefinitionError::missing_field(
            "expression",
            Some(url),
            Some(code),
        ));
    }

    let component = parse_components(resource, url, code)?;
    if param_type == SearchParamType::Composite && component.is_empty() {
        return Err(DefinitionError::MalformedDefinition {
            url: Some(url.to_string()),
            code: Some(code.to_string()),
            message: "composite parameter has no components".to_string(),
        });
    }

    let mut def = SearchParameterDefinition::new(code, param_type)
        .map_err(|e| DefinitionError::MalformedDefinition {
            url: Some(url.to_string()),
            code: Some(code.to_string()),
            message: e.to_string(),
        })?
        .with_url(url)
        .with_base(string_array(resource, "base"))
        .with_targets(string_array(resource, "target"))
        .with_components(component);

    if let Some(expression) = expression {
        def = def.with_expression(expression);
    }
    if let Some(description) = string_field(resource, "description") {
        def = def.with_description(description);
    }

    Ok(def)
}

fn parse_components(
    resource: &Value,
    url: &str,
    code: &str,
) -> Result<Vec<ComponentReference>, DefinitionError> {
    let Some(components) = resource.get("component").and_then(|v| v.as_array()) else {
        return Ok(Vec::new());
    };

    components
        .iter()
        .map(|comp| {
            let definition = string_field(comp, "definition").ok_or_else(|| {
                DefinitionError::MalformedDefinition {
                    url: Some(url.to_string()),
                    code: Some(code.to_string()),
                    message: "composite component missing definition".to_string(),
                }
            })?;

            let mut reference = ComponentReference::new(definition);
            if let Some(expression) = string_field(comp, "expression").filter(|e| !e.is_empty()) {
                reference = reference.with_expression(expression);
            }
            Ok(reference)
        })
        .collect()
}

fn string_field<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value.get(field).and_then(|v| v.as_str())
}

fn string_array<'a>(value: &'a Value, field: &str) -> Vec<&'a str> {
    value
        .get(field)
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default()
}
