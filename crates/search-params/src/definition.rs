//! SearchParameter definitions.
//!
//! A [`SearchParameterDefinition`] is the indexed form of a FHIR
//! `SearchParameter` resource. Composite parameters carry their component
//! references unresolved; the builder resolves them once a whole catalogue
//! has been indexed, so forward references inside a catalogue are allowed.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::errors::DefinitionError;
use crate::types::SearchParamType;

/// Abstract base types that apply a parameter to every resource type.
pub const ABSTRACT_BASE_TYPES: &[&str] = &["Resource", "DomainResource"];

/// Component of a composite search parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentReference {
    /// Definition URL of the component parameter.
    pub definition: String,
    /// FHIRPath expression for extracting this component, relative to the
    /// composite's expression.
    pub expression: Option<String>,
}

impl ComponentReference {
    /// Creates a component reference without an expression override.
    pub fn new(definition: impl Into<String>) -> Self {
        Self {
            definition: definition.into(),
            expression: None,
        }
    }

    /// Sets the expression override.
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }
}

/// Support flags set by policy layers after a parameter is indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParameterSupport {
    /// The parameter is enabled for searches.
    pub searchable: bool,
    /// The server can index and search this parameter.
    pub supported: bool,
    /// The expression resolves to several value types and only some of them
    /// can be indexed.
    pub partially_supported: bool,
}

impl Default for SearchParameterSupport {
    fn default() -> Self {
        Self {
            searchable: true,
            supported: true,
            partially_supported: false,
        }
    }
}

/// Complete definition of a SearchParameter.
///
/// Equality follows the canonical URL when one is present. URL-less
/// definitions compare by code (ignoring ASCII case), type and expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParameterDefinition {
    /// Canonical URL (unique identifier).
    pub url: Option<String>,

    /// Parameter code (the URL param name, e.g., "name", "identifier").
    /// Unique only within a resource type.
    pub code: String,

    /// The parameter type.
    pub param_type: SearchParamType,

    /// FHIRPath expression for extracting values.
    pub expression: Option<String>,

    /// Resource types this parameter applies to.
    pub base: Vec<String>,

    /// Target resource types (for reference parameters).
    pub target: Vec<String>,

    /// Description of the parameter.
    pub description: Option<String>,

    /// Components (for composite parameters).
    pub component: Vec<ComponentReference>,

    /// Policy flags.
    pub support: SearchParameterSupport,
}

impl SearchParameterDefinition {
    /// Creates a definition, rejecting a blank code.
    pub fn new(
        code: impl Into<String>,
        param_type: SearchParamType,
    ) -> Result<Self, DefinitionError> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(DefinitionError::InvalidDefinition {
                code,
                message: "code must not be empty".to_string(),
            });
        }

        Ok(Self {
            url: None,
            code,
            param_type,
            expression: None,
            base: Vec::new(),
            target: Vec::new(),
            description: None,
            component: Vec::new(),
            support: SearchParameterSupport::default(),
        })
    }

    /// Creates a definition from a FHIR type code such as `"token"`.
    pub fn with_type_code(
        code: impl Into<String>,
        type_code: &str,
    ) -> Result<Self, DefinitionError> {
        let code = code.into();
        let param_type = type_code
            .parse::<SearchParamType>()
            .map_err(|message| DefinitionError::InvalidDefinition {
                code: code.clone(),
                message,
            })?;
        Self::new(code, param_type)
    }

    /// Sets the canonical URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the FHIRPath expression.
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    /// Sets the base resource types.
    pub fn with_base<I, S>(mut self, base: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base = base.into_iter().map(Into::into).collect();
        self
    }

    /// Sets target types for reference parameters.
    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target = targets.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the composite components.
    pub fn with_components(mut self, components: Vec<ComponentReference>) -> Self {
        self.component = components;
        self
    }

    /// Sets the support flags.
    pub fn with_support(mut self, support: SearchParameterSupport) -> Self {
        self.support = support;
        self
    }

    /// Returns whether this is a composite parameter.
    pub fn is_composite(&self) -> bool {
        self.param_type == SearchParamType::Composite
    }

    /// Returns whether this parameter applies to the given resource type.
    pub fn applies_to(&self, resource_type: &str) -> bool {
        self.base
            .iter()
            .any(|b| b == resource_type || ABSTRACT_BASE_TYPES.contains(&b.as_str()))
    }

    /// The URL, or the code for URL-less definitions. Used in messages.
    pub fn identity(&self) -> &str {
        self.url.as_deref().unwrap_or(&self.code)
    }
}

impl PartialEq for SearchParameterDefinition {
    fn eq(&self, other: &Self) -> bool {
        match (&self.url, &other.url) {
            (None, None) => {
                self.code.eq_ignore_ascii_case(&other.code)
                    && self.param_type == other.param_type
                    && self.expression == other.expression
            }
            (a, b) => a == b,
        }
    }
}

impl Eq for SearchParameterDefinition {}

impl Hash for SearchParameterDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.url {
            Some(url) => url.hash(state),
            None => {
                self.code.to_ascii_lowercase().hash(state);
                self.param_type.hash(state);
                self.expression.hash(state);
            }
        }
    }
}
