//! Integration tests for the SearchParameter registry.

mod common;

use std::io::Write;

use helios_search_params::{
    Catalogue, DefinitionError, LifecycleState, RegistryError, RegistryUpdate, SearchParamType,
    SearchParameterRegistry, SearchParameterSupport, compute_hash,
};

use common::{ParamFixture, base_params, catalogue, patient_name_address, started_registry};

// ============================================================================
// Initialization
// ============================================================================

#[test]
fn test_initialize_is_idempotent() {
    let once = started_registry();

    let twice = SearchParameterRegistry::with_base_catalogue(catalogue("base", &base_params()));
    twice.initialize().unwrap();
    let after_first = twice.all_fingerprints();
    twice.initialize().unwrap();

    assert_eq!(twice.all_fingerprints(), after_first);
    assert_eq!(twice.all_fingerprints(), once.all_fingerprints());
    assert_eq!(twice.len(), once.len());
    assert_eq!(twice.resource_types(), once.resource_types());
    assert_eq!(twice.state(), LifecycleState::Started);
}

#[test]
fn test_malformed_base_catalogue_fails_initialize() {
    let registry = SearchParameterRegistry::with_base_catalogue(catalogue(
        "base",
        &[ParamFixture::new("url:near", "near", "geo", &["Location"])],
    ));

    let result = registry.initialize();
    assert!(matches!(
        result,
        Err(RegistryError::Definition(DefinitionError::MalformedDefinition { .. }))
    ));
    assert_eq!(registry.state(), LifecycleState::Created);
    assert!(registry.is_empty());
}

#[test]
fn test_fingerprint_map_covers_every_resource_type() {
    let registry = started_registry();
    let fingerprints = registry.all_fingerprints();

    let keys: Vec<String> = fingerprints.keys().cloned().collect();
    assert_eq!(keys, registry.resource_types());
    assert!(fingerprints.values().all(|hash| !hash.is_empty()));
}

// ============================================================================
// Lookups
// ============================================================================

#[test]
fn test_round_trip_lookup() {
    let registry = started_registry();

    for fixture in base_params() {
        let by_url = registry.get_parameter_by_url(&fixture.url).unwrap();
        assert_eq!(by_url.url.as_deref(), Some(fixture.url.as_str()));
        assert_eq!(by_url.code, fixture.code);

        for resource_type in &fixture.base {
            let by_code = registry.get_parameter(resource_type, &fixture.code).unwrap();
            assert_eq!(by_code, by_url);
        }
    }
}

#[test]
fn test_get_parameters_for_type() {
    let registry = started_registry();

    let params = registry.get_parameters_for_type("Patient").unwrap();
    let codes: Vec<&str> = params.iter().map(|p| p.code.as_str()).collect();
    assert_eq!(codes, vec!["gender", "name"]);
}

#[test]
fn test_unknown_type_errors() {
    let registry = started_registry();

    assert!(matches!(
        registry.get_parameters_for_type("NoSuchType"),
        Err(RegistryError::UnsupportedResourceType { resource_type })
            if resource_type == "NoSuchType"
    ));
    assert!(!registry.has_resource_type("NoSuchType"));
    assert!(registry.try_get_parameter("Patient", "nonexistent").is_none());
    assert!(matches!(
        registry.get_parameter("NoSuchType", "name"),
        Err(RegistryError::UnknownSearchParameter { .. })
    ));
    assert!(matches!(
        registry.get_parameter_by_url("http://example.org/sp/none"),
        Err(RegistryError::UnknownSearchParameterUrl { .. })
    ));
    assert_eq!(registry.fingerprint("NoSuchType"), None);
}

// ============================================================================
// Composites
// ============================================================================

#[test]
fn test_resolve_component_type() {
    let registry = started_registry();
    let composite = registry.get_parameter("Observation", "code-subject").unwrap();

    assert_eq!(
        registry.resolve_component_type(&composite, Some(0)).unwrap(),
        SearchParamType::Token
    );
    assert_eq!(
        registry.resolve_component_type(&composite, Some(1)).unwrap(),
        SearchParamType::Reference
    );
    assert_eq!(
        registry.resolve_component_type(&composite, None).unwrap(),
        SearchParamType::Composite
    );
    assert!(matches!(
        registry.resolve_component_type(&composite, Some(2)),
        Err(RegistryError::IndexOutOfRange { index: 2, count: 2, .. })
    ));
    assert!(registry.composite_signatures().contains("token|reference"));
}

#[test]
fn test_name_address_scenario() {
    let registry = SearchParameterRegistry::with_base_catalogue(catalogue(
        "scenario",
        &patient_name_address(),
    ));
    registry.initialize().unwrap();

    let address = registry.get_parameter("Patient", "address").unwrap();
    let component = registry
        .get_parameter_by_url(&address.component[0].definition)
        .unwrap();
    assert_eq!(component.code, "name");
    assert_eq!(
        registry.resolve_component_type(&address, Some(0)).unwrap(),
        SearchParamType::String
    );

    let fingerprint = registry.fingerprint("Patient").unwrap();
    assert!(!fingerprint.is_empty());

    // Re-running the same catalogue keeps the fingerprint
    registry
        .extend_with(&catalogue("scenario", &patient_name_address()))
        .unwrap();
    assert_eq!(registry.fingerprint("Patient").unwrap(), fingerprint);

    // Changing name's type changes it
    let mut modified = patient_name_address();
    modified[0] = modified[0].clone().with_type("token");
    registry.extend_with(&catalogue("modified", &modified)).unwrap();

    assert_ne!(registry.fingerprint("Patient").unwrap(), fingerprint);
    assert_eq!(
        registry.resolve_component_type(&address, Some(0)).unwrap(),
        SearchParamType::Token
    );
}

// ============================================================================
// Extension
// ============================================================================

#[test]
fn test_unresolved_reference_leaves_registry_unchanged() {
    let registry = started_registry();
    let fingerprints = registry.all_fingerprints();
    let count = registry.len();

    let result = registry.extend_with(&catalogue(
        "broken",
        &[
            ParamFixture::new(
                "http://example.org/sp/Patient-nickname",
                "nickname",
                "string",
                &["Patient"],
            ),
            ParamFixture::composite(
                "http://example.org/sp/Patient-broken",
                "broken",
                &["Patient"],
                &["http://example.org/sp/missing"],
            ),
        ],
    ));

    assert_eq!(
        result,
        Err(RegistryError::Definition(
            DefinitionError::UnresolvedComponentReference {
                composite: "http://example.org/sp/Patient-broken".to_string(),
                component: "http://example.org/sp/missing".to_string(),
            }
        ))
    );
    assert_eq!(registry.len(), count);
    assert!(registry.try_get_parameter("Patient", "nickname").is_none());
    assert!(registry
        .get_parameter_by_url("http://example.org/sp/Patient-nickname")
        .is_err());
    assert_eq!(registry.all_fingerprints(), fingerprints);
}

#[test]
fn test_malformed_extension_is_rejected() {
    let registry = started_registry();
    let fingerprints = registry.all_fingerprints();

    let mut missing_expression =
        ParamFixture::new("http://example.org/sp/Patient-alias", "alias", "string", &["Patient"]);
    missing_expression.expression = None;

    let result = registry.extend_with(&catalogue(
        "custom",
        &[
            ParamFixture::new(
                "http://example.org/sp/Patient-email",
                "email",
                "token",
                &["Patient"],
            ),
            missing_expression,
        ],
    ));

    assert!(matches!(
        result,
        Err(RegistryError::Definition(DefinitionError::MalformedDefinition { .. }))
    ));
    assert!(registry.try_get_parameter("Patient", "email").is_none());
    assert_eq!(registry.all_fingerprints(), fingerprints);
}

#[test]
fn test_expression_change_only_affects_its_type() {
    let registry = started_registry();
    let before = registry.all_fingerprints();

    let changed = ParamFixture::new(
        "http://example.org/sp/Patient-name",
        "name",
        "string",
        &["Patient"],
    )
    .with_expression("Patient.name.text");
    let summary = registry.extend_with(&catalogue("custom", &[changed])).unwrap();

    assert_eq!(summary.resource_types, vec!["Patient".to_string()]);
    let after = registry.all_fingerprints();
    assert_ne!(after["Patient"], before["Patient"]);
    assert_eq!(after["Observation"], before["Observation"]);
    assert_eq!(after["Encounter"], before["Encounter"]);
    assert_eq!(registry.stale_resource_types(&before), vec!["Patient".to_string()]);
}

#[test]
fn test_extension_adds_new_resource_type() {
    let registry = started_registry();

    let summary = registry
        .extend_with(&catalogue(
            "custom",
            &[ParamFixture::new("http://example.org/sp/Device-type", "type", "token", &["Device"])],
        ))
        .unwrap();

    assert_eq!(summary.indexed, 1);
    assert!(registry.has_resource_type("Device"));
    assert!(registry.fingerprint("Device").is_some());
}

#[test]
fn test_moving_last_parameter_drops_fingerprint() {
    let registry = started_registry();
    assert!(registry.fingerprint("Encounter").is_some());

    registry
        .extend_with(&catalogue(
            "custom",
            &[ParamFixture::new(
                "http://example.org/sp/Encounter-status",
                "status",
                "token",
                &["Patient"],
            )],
        ))
        .unwrap();

    assert!(!registry.has_resource_type("Encounter"));
    assert_eq!(registry.fingerprint("Encounter"), None);
    assert!(!registry.all_fingerprints().contains_key("Encounter"));
}

#[test]
fn test_extension_from_file() {
    let registry = started_registry();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    let json = common::bundle(&[ParamFixture::new(
        "http://example.org/sp/Patient-race",
        "race",
        "token",
        &["Patient"],
    )]);
    write!(file, "{}", json).unwrap();

    let custom = Catalogue::from_path(file.path()).unwrap();
    registry.extend_with(&custom).unwrap();

    assert!(registry.get_parameter("Patient", "race").is_ok());
}

// ============================================================================
// Fingerprints
// ============================================================================

#[test]
fn test_fingerprint_matches_compute_hash() {
    let registry = started_registry();

    let params = registry.get_parameters_for_type("Patient").unwrap();
    let expected = compute_hash(params.iter().map(|p| p.as_ref()));
    assert_eq!(registry.fingerprint("Patient").unwrap(), expected);

    let reversed = compute_hash(params.iter().rev().map(|p| p.as_ref()));
    assert_eq!(reversed, expected);
}

#[test]
fn test_fingerprints_are_stable_across_registries() {
    let a = started_registry();
    let b = started_registry();
    assert_eq!(a.all_fingerprints(), b.all_fingerprints());
}

// ============================================================================
// Notifications
// ============================================================================

#[tokio::test]
async fn test_subscribers_see_extensions_and_support_changes() {
    let registry = started_registry();
    let mut rx = registry.subscribe();

    registry
        .extend_with(&catalogue(
            "custom",
            &[ParamFixture::new("http://example.org/sp/Device-type", "type", "token", &["Device"])],
        ))
        .unwrap();

    assert_eq!(
        rx.recv().await.unwrap(),
        RegistryUpdate::Extended {
            resource_types: vec!["Device".to_string()],
        }
    );

    let fingerprint = registry.fingerprint("Patient");
    let unsupported = SearchParameterSupport {
        searchable: true,
        supported: false,
        partially_supported: false,
    };
    registry
        .update_support("http://example.org/sp/Patient-name", unsupported)
        .unwrap();

    assert_eq!(
        rx.recv().await.unwrap(),
        RegistryUpdate::SupportChanged("http://example.org/sp/Patient-name".to_string())
    );
    assert!(!registry.get_parameter("Patient", "name").unwrap().support.supported);
    assert_eq!(registry.fingerprint("Patient"), fingerprint);
}
