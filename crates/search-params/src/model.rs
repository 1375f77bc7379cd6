//! Resource type knowledge used when indexing abstract-base parameters.

/// Supplies the concrete resource types known to the server.
///
/// Parameters declared on `Resource` or `DomainResource` are indexed under
/// every type returned here.
pub trait ModelInfoProvider: Send + Sync {
    /// Returns the names of all concrete resource types.
    fn resource_type_names(&self) -> Vec<String>;
}

/// R4 resource types served by default.
const R4_RESOURCE_TYPES: &[&str] = &[
    "AllergyIntolerance",
    "Appointment",
    "Bundle",
    "CarePlan",
    "Condition",
    "Device",
    "DiagnosticReport",
    "DocumentReference",
    "Encounter",
    "Group",
    "Immunization",
    "Location",
    "Medication",
    "MedicationRequest",
    "Observation",
    "Organization",
    "Patient",
    "Practitioner",
    "PractitionerRole",
    "Procedure",
    "SearchParameter",
    "ServiceRequest",
];

/// A fixed list of resource types.
#[derive(Debug, Clone)]
pub struct StaticModelInfo {
    resource_types: Vec<String>,
}

impl StaticModelInfo {
    /// Creates a provider over the given types.
    pub fn new<I, S>(resource_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resource_types: resource_types.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for StaticModelInfo {
    fn default() -> Self {
        Self::new(R4_RESOURCE_TYPES.iter().copied())
    }
}

impl ModelInfoProvider for StaticModelInfo {
    fn resource_type_names(&self) -> Vec<String> {
        self.resource_types.clone()
    }
}
