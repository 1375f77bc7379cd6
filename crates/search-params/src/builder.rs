//! SearchParameter definition builder.
//!
//! Builds catalogues into a [`SearchIndex`] in two passes: every entry is
//! inserted first, then every composite is resolved against the populated
//! URL index. A composite may therefore reference a parameter defined later
//! in the same catalogue.
//!
//! A build is all-or-nothing: on error the index it was handed is left
//! exactly as it was.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::catalogue::Catalogue;
use crate::definition::{ABSTRACT_BASE_TYPES, SearchParameterDefinition};
use crate::errors::DefinitionError;
use crate::model::ModelInfoProvider;

/// Lookup tables over one set of definitions.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    /// Parameters indexed by canonical URL.
    by_url: HashMap<String, Arc<SearchParameterDefinition>>,

    /// Parameters indexed by (resource_type, code).
    by_type: HashMap<String, HashMap<String, Arc<SearchParameterDefinition>>>,

    /// Distinct component type signatures of composites, e.g. `token|quantity`.
    composite_signatures: BTreeSet<String>,
}

impl SearchIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct definitions.
    pub fn len(&self) -> usize {
        self.by_url.len()
    }

    /// Returns true if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.by_url.is_empty()
    }

    /// Gets a parameter by its canonical URL.
    pub fn get_by_url(&self, url: &str) -> Option<&Arc<SearchParameterDefinition>> {
        self.by_url.get(url)
    }

    /// Gets the code-keyed parameters of a resource type.
    pub fn params_for_type(
        &self,
        resource_type: &str,
    ) -> Option<&HashMap<String, Arc<SearchParameterDefinition>>> {
        self.by_type.get(resource_type)
    }

    /// Gets a parameter by resource type and code.
    pub fn get(&self, resource_type: &str, code: &str) -> Option<&Arc<SearchParameterDefinition>> {
        self.by_type.get(resource_type).and_then(|params| params.get(code))
    }

    /// All definitions.
    pub fn definitions(&self) -> impl Iterator<Item = &Arc<SearchParameterDefinition>> {
        self.by_url.values()
    }

    /// Resource types with at least one parameter.
    pub fn resource_types(&self) -> impl Iterator<Item = &String> {
        self.by_type.keys()
    }

    /// Distinct composite component type signatures.
    pub fn composite_signatures(&self) -> &BTreeSet<String> {
        &self.composite_signatures
    }

    /// Replaces the definition stored under `url` in both indexes.
    ///
    /// The replacement must keep the url, code and base of the original.
    /// Returns false when `url` is not indexed.
    pub(crate) fn replace(&mut self, replacement: SearchParameterDefinition) -> bool {
        let Some(url) = replacement.url.clone() else {
            return false;
        };
        let Some(slot) = self.by_url.get_mut(&url) else {
            return false;
        };

        let replacement = Arc::new(replacement);
        *slot = Arc::clone(&replacement);

        for params in self.by_type.values_mut() {
            if let Some(entry) = params.get_mut(&replacement.code) {
                if entry.url.as_deref() == Some(url.as_str()) {
                    *entry = Arc::clone(&replacement);
                }
            }
        }
        true
    }

    /// Removes `previous` from every type entry it still occupies.
    fn unlink(&mut self, previous: &SearchParameterDefinition, resource_types: &[String]) {
        for resource_type in resource_types {
            let Some(params) = self.by_type.get_mut(resource_type) else {
                continue;
            };
            if params
                .get(&previous.code)
                .is_some_and(|current| current.url == previous.url)
            {
                params.remove(&previous.code);
            }
            if params.is_empty() {
                self.by_type.remove(resource_type);
            }
        }
    }
}

/// What a build changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutcome {
    /// Number of definitions parsed from the catalogue.
    pub indexed: usize,
    /// Resource types whose parameter set may have changed.
    pub touched_types: BTreeSet<String>,
}

/// Builds a catalogue into `index`.
///
/// Existing definitions with the same URL are replaced (last writer wins).
/// Fails with [`DefinitionError::MalformedDefinition`] on a bad entry and
/// with [`DefinitionError::UnresolvedComponentReference`] when a composite
/// anywhere in the resulting index names an unknown component. On error
/// `index` is unchanged.
pub fn build(
    catalogue: &Catalogue,
    index: &mut SearchIndex,
    model: &dyn ModelInfoProvider,
) -> Result<BuildOutcome, DefinitionError> {
    let mut staged = index.clone();
    let outcome = build_in_place(catalogue, &mut staged, model)?;
    *index = staged;
    Ok(outcome)
}

/// Builds directly into `index`, which is left partly updated on error.
///
/// Only for callers that already hold a private copy.
pub(crate) fn build_in_place(
    catalogue: &Catalogue,
    index: &mut SearchIndex,
    model: &dyn ModelInfoProvider,
) -> Result<BuildOutcome, DefinitionError> {
    let definitions = catalogue.definitions()?;
    let known_types = model.resource_type_names();

    let mut outcome = BuildOutcome {
        indexed: definitions.len(),
        ..Default::default()
    };
    let mut new_urls = HashSet::new();

    for def in definitions {
        let Some(url) = def.url.clone() else {
            return Err(DefinitionError::missing_field("url", None, Some(def.code.as_str())));
        };
        let def = Arc::new(def);

        if let Some(previous) = index.by_url.insert(url.clone(), Arc::clone(&def)) {
            let previous_types = expand_base(&previous.base, &known_types);
            index.unlink(&previous, &previous_types);
            outcome.touched_types.extend(previous_types);
        }

        for resource_type in expand_base(&def.base, &known_types) {
            index
                .by_type
                .entry(resource_type.clone())
                .or_default()
                .insert(def.code.clone(), Arc::clone(&def));
            outcome.touched_types.insert(resource_type);
        }

        new_urls.insert(url);
    }

    let composite_signatures = resolve_composites(index, &new_urls, &known_types, &mut outcome)?;
    index.composite_signatures = composite_signatures;

    debug!(
        source = catalogue.source_name(),
        indexed = outcome.indexed,
        touched = outcome.touched_types.len(),
        "Built SearchParameter catalogue"
    );

    Ok(outcome)
}

/// Resolves every composite in the index and collects component signatures.
///
/// Composites whose components were redefined by this build count as touched.
fn resolve_composites(
    index: &SearchIndex,
    new_urls: &HashSet<String>,
    known_types: &[String],
    outcome: &mut BuildOutcome,
) -> Result<BTreeSet<String>, DefinitionError> {
    let mut signatures = BTreeSet::new();

    for composite in index.by_url.values().filter(|p| p.is_composite()) {
        let mut component_types = Vec::with_capacity(composite.component.len());
        let mut references_new = false;

        for component in &composite.component {
            let target = index.by_url.get(&component.definition).ok_or_else(|| {
                DefinitionError::UnresolvedComponentReference {
                    composite: composite.identity().to_string(),
                    component: component.definition.clone(),
                }
            })?;
            component_types.push(target.param_type.as_str());
            references_new |= new_urls.contains(&component.definition);
        }

        if references_new {
            outcome
                .touched_types
                .extend(expand_base(&composite.base, known_types));
        }
        signatures.insert(component_types.join("|"));
    }

    Ok(signatures)
}

/// Expands abstract bases to every known concrete type.
fn expand_base(base: &[String], known_types: &[String]) -> Vec<String> {
    let mut types = BTreeSet::new();
    for resource_type in base {
        if ABSTRACT_BASE_TYPES.contains(&resource_type.as_str()) {
            types.extend(known_types.iter().cloned());
        } else {
            types.insert(resource_type.clone());
        }
    }
    types.into_iter().collect()
}
