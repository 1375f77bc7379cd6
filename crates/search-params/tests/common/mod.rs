//! Shared fixtures for registry integration tests.

#![allow(dead_code)]

use serde_json::{Value, json};

use helios_search_params::{Catalogue, SearchParameterRegistry};

/// A SearchParameter resource fixture.
#[derive(Debug, Clone)]
pub struct ParamFixture {
    pub url: String,
    pub code: String,
    pub param_type: String,
    pub expression: Option<String>,
    pub base: Vec<String>,
    pub components: Vec<String>,
}

impl ParamFixture {
    /// A non-composite parameter with a derived expression.
    pub fn new(url: &str, code: &str, param_type: &str, base: &[&str]) -> Self {
        Self {
            url: url.to_string(),
            code: code.to_string(),
            param_type: param_type.to_string(),
            expression: Some(format!("{}.{}", base[0], code)),
            base: base.iter().map(|b| b.to_string()).collect(),
            components: Vec::new(),
        }
    }

    /// A composite parameter referencing the given component URLs.
    pub fn composite(url: &str, code: &str, base: &[&str], components: &[&str]) -> Self {
        Self {
            components: components.iter().map(|c| c.to_string()).collect(),
            ..Self::new(url, code, "composite", base)
        }
    }

    pub fn with_expression(mut self, expression: &str) -> Self {
        self.expression = Some(expression.to_string());
        self
    }

    pub fn with_type(mut self, param_type: &str) -> Self {
        self.param_type = param_type.to_string();
        self
    }

    pub fn to_json(&self) -> Value {
        let mut resource = json!({
            "resourceType": "SearchParameter",
            "url": self.url,
            "code": self.code,
            "type": self.param_type,
            "base": self.base,
        });
        if let Some(expression) = &self.expression {
            resource["expression"] = json!(expression);
        }
        if !self.components.is_empty() {
            resource["component"] = self
                .components
                .iter()
                .map(|c| json!({ "definition": c }))
                .collect();
        }
        resource
    }
}

/// Wraps fixtures in a FHIR collection Bundle.
pub fn bundle(params: &[ParamFixture]) -> Value {
    json!({
        "resourceType": "Bundle",
        "type": "collection",
        "entry": params
            .iter()
            .map(|p| json!({ "fullUrl": p.url, "resource": p.to_json() }))
            .collect::<Vec<_>>()
    })
}

pub fn catalogue(name: &str, params: &[ParamFixture]) -> Catalogue {
    Catalogue::from_json(name, bundle(params))
}

/// The `name` + `address` scenario: a string parameter and a composite over it.
pub fn patient_name_address() -> Vec<ParamFixture> {
    vec![
        ParamFixture::new("url:name", "name", "string", &["Patient"]),
        ParamFixture::composite("url:address-composite", "address", &["Patient"], &["url:name"]),
    ]
}

/// A small base catalogue spanning three resource types.
pub fn base_params() -> Vec<ParamFixture> {
    vec![
        ParamFixture::new("http://example.org/sp/Patient-name", "name", "string", &["Patient"]),
        ParamFixture::new("http://example.org/sp/Patient-gender", "gender", "token", &["Patient"]),
        ParamFixture::new(
            "http://example.org/sp/Observation-code",
            "code",
            "token",
            &["Observation"],
        ),
        ParamFixture::new(
            "http://example.org/sp/Observation-subject",
            "subject",
            "reference",
            &["Observation"],
        ),
        ParamFixture::composite(
            "http://example.org/sp/Observation-code-subject",
            "code-subject",
            &["Observation"],
            &[
                "http://example.org/sp/Observation-code",
                "http://example.org/sp/Observation-subject",
            ],
        ),
        ParamFixture::new(
            "http://example.org/sp/Encounter-status",
            "status",
            "token",
            &["Encounter"],
        ),
    ]
}

/// An initialized registry over [`base_params`].
pub fn started_registry() -> SearchParameterRegistry {
    let registry = SearchParameterRegistry::with_base_catalogue(catalogue("base", &base_params()));
    registry
        .initialize()
        .expect("base catalogue should initialize");
    registry
}
