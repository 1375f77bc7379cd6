//! Helios FHIR Server SearchParameter Registry
//!
//! This crate maintains the catalogue of FHIR search parameters that every
//! search and reindex decision consults:
//!
//! - [`catalogue`] - Reads `SearchParameter` resources from the embedded base
//!   bundle or from runtime JSON
//! - [`builder`] - Two-pass indexing with composite component resolution
//! - [`registry`] - Concurrent, lock-free-for-readers registry with an
//!   idempotent start/stop lifecycle
//! - [`fingerprint`] - Per-resource-type digests used to detect stale
//!   search indexes
//! - [`errors`] - Definition and lookup error types
//!
//! # Quick Start
//!
//! ```
//! use helios_search_params::{Catalogue, SearchParamType, SearchParameterRegistry};
//! use serde_json::json;
//!
//! let registry = SearchParameterRegistry::new();
//! registry.initialize()?;
//!
//! let gender = registry.get_parameter("Patient", "gender")?;
//! assert_eq!(gender.param_type, SearchParamType::Token);
//!
//! let before = registry.fingerprint("Patient");
//! registry.extend_with(&Catalogue::from_json(
//!     "custom",
//!     json!({
//!         "resourceType": "SearchParameter",
//!         "url": "http://example.org/SearchParameter/Patient-nickname",
//!         "code": "nickname",
//!         "type": "string",
//!         "expression": "Patient.name.where(use = 'nickname')",
//!         "base": ["Patient"]
//!     }),
//! ))?;
//! assert_ne!(registry.fingerprint("Patient"), before);
//! # Ok::<(), helios_search_params::RegistryError>(())
//! ```
//!
//! # Fingerprints
//!
//! A fingerprint changes whenever any parameter of a resource type changes
//! its url, code, type, expression or components. Record
//! [`SearchParameterRegistry::all_fingerprints`] when indexes are built and
//! pass it back to [`SearchParameterRegistry::stale_resource_types`] to find
//! the types that need `$reindex`.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod builder;
pub mod catalogue;
pub mod definition;
pub mod errors;
pub mod fingerprint;
pub mod model;
pub mod registry;
pub mod types;

// Re-export commonly used types at crate root
pub use builder::{BuildOutcome, SearchIndex};
pub use catalogue::Catalogue;
pub use definition::{ComponentReference, SearchParameterDefinition, SearchParameterSupport};
pub use errors::{DefinitionError, RegistryError, RegistryResult};
pub use fingerprint::compute_hash;
pub use model::{ModelInfoProvider, StaticModelInfo};
pub use registry::{
    ExtensionSummary, LifecycleState, RegistrySnapshot, RegistryUpdate, SearchParameterRegistry,
};
pub use types::SearchParamType;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
