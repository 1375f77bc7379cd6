//! SearchParameter Registry.
//!
//! The registry holds every known SearchParameter indexed by canonical URL
//! and by (resource_type, code), together with a fingerprint per resource
//! type.
//!
//! # Concurrency
//!
//! All state lives in one immutable [`RegistrySnapshot`] published through
//! an [`ArcSwap`]. Readers load the current snapshot without locking and
//! always see a consistent pair of indexes and fingerprints. Writers
//! (initialization, extension, support updates) serialize on the lifecycle
//! mutex, build a new snapshot from a copy of the current one and publish
//! it with a single store. A failed build never publishes anything.
//!
//! # Lifecycle
//!
//! ```text
//! Created ── initialize() ──▶ Started ── shutdown() ──▶ Stopped
//! ```
//!
//! `initialize` is idempotent. `extend_with` on a registry that has not been
//! initialized loads the base catalogue first, so readers never observe
//! extension parameters without the base set.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::builder::{self, SearchIndex};
use crate::catalogue::Catalogue;
use crate::definition::{SearchParameterDefinition, SearchParameterSupport};
use crate::errors::{RegistryError, RegistryResult};
use crate::fingerprint::compute_hash;
use crate::model::{ModelInfoProvider, StaticModelInfo};
use crate::types::SearchParamType;

/// Lifecycle of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// Constructed, base catalogue not loaded.
    #[default]
    Created,
    /// Base catalogue loaded.
    Started,
    /// Shutdown signalled. Reads and extensions keep working.
    Stopped,
}

/// Lifecycle state plus whether the base catalogue has been loaded.
///
/// A registry stopped before it was started still loads its base catalogue
/// on the first `initialize` or `extend_with`.
#[derive(Debug, Clone, Copy, Default)]
struct Lifecycle {
    state: LifecycleState,
    base_loaded: bool,
}

/// Update notification for registry changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryUpdate {
    /// The base catalogue was loaded.
    Initialized,
    /// A catalogue was merged; lists the resource types whose parameters changed.
    Extended {
        /// Touched resource types, sorted.
        resource_types: Vec<String>,
    },
    /// A parameter's support flags changed.
    SupportChanged(String),
}

/// Result of a successful [`SearchParameterRegistry::extend_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSummary {
    /// Number of definitions in the merged catalogue.
    pub indexed: usize,
    /// Resource types whose fingerprints were recomputed, sorted.
    pub resource_types: Vec<String>,
}

/// A consistent view of the registry.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    index: SearchIndex,
    fingerprints: HashMap<String, String>,
}

impl RegistrySnapshot {
    /// The parameter indexes.
    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    /// Fingerprint of a resource type.
    pub fn fingerprint(&self, resource_type: &str) -> Option<&str> {
        self.fingerprints.get(resource_type).map(String::as_str)
    }

    /// Recomputes the fingerprint of each given type, dropping types that
    /// no longer have parameters.
    fn refresh_fingerprints<'a, I>(&mut self, resource_types: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for resource_type in resource_types {
            match self.index.params_for_type(resource_type) {
                Some(params) => {
                    let hash = compute_hash(params.values().map(|p| p.as_ref()));
                    debug!(
                        resource_type = %resource_type,
                        hash = %hash,
                        "Updated search parameter fingerprint"
                    );
                    self.fingerprints.insert(resource_type.clone(), hash);
                }
                None => {
                    self.fingerprints.remove(resource_type);
                }
            }
        }
    }
}

/// Concurrent registry of SearchParameter definitions.
pub struct SearchParameterRegistry {
    /// Current published state.
    snapshot: ArcSwap<RegistrySnapshot>,

    /// Serializes writers and tracks the lifecycle.
    lifecycle: Mutex<Lifecycle>,

    /// Base catalogue; the embedded one when `None`.
    base_catalogue: Option<Catalogue>,

    /// Resource types used to expand abstract bases.
    model: Arc<dyn ModelInfoProvider>,

    /// Notification channel for registry updates.
    update_tx: broadcast::Sender<RegistryUpdate>,
}

impl SearchParameterRegistry {
    /// Creates an empty registry that loads the embedded base catalogue.
    pub fn new() -> Self {
        let (update_tx, _) = broadcast::channel(64);
        Self {
            snapshot: ArcSwap::from_pointee(RegistrySnapshot::default()),
            lifecycle: Mutex::new(Lifecycle::default()),
            base_catalogue: None,
            model: Arc::new(StaticModelInfo::default()),
            update_tx,
        }
    }

    /// Creates a registry that loads `catalogue` instead of the embedded one.
    pub fn with_base_catalogue(catalogue: Catalogue) -> Self {
        Self {
            base_catalogue: Some(catalogue),
            ..Self::new()
        }
    }

    /// Sets the resource type provider.
    pub fn with_model(mut self, model: Arc<dyn ModelInfoProvider>) -> Self {
        self.model = model;
        self
    }

    /// Loads the base catalogue and computes every fingerprint.
    ///
    /// Calls after the first successful one do nothing. An error means the
    /// base catalogue is broken; hosts should treat it as fatal.
    pub fn initialize(&self) -> RegistryResult<()> {
        let mut lifecycle = self.lifecycle.lock();
        self.initialize_locked(&mut lifecycle)
    }

    fn initialize_locked(&self, lifecycle: &mut Lifecycle) -> RegistryResult<()> {
        if lifecycle.base_loaded {
            return Ok(());
        }

        let embedded;
        let base = match &self.base_catalogue {
            Some(catalogue) => catalogue,
            None => {
                embedded = Catalogue::embedded()?;
                &embedded
            }
        };

        let mut next = RegistrySnapshot::clone(&self.snapshot.load());
        builder::build_in_place(base, &mut next.index, self.model.as_ref())?;

        let resource_types: Vec<String> = next.index.resource_types().cloned().collect();
        next.refresh_fingerprints(&resource_types);

        info!(
            source = base.source_name(),
            parameters = next.index.len(),
            resource_types = resource_types.len(),
            "SearchParameter registry initialized"
        );

        self.snapshot.store(Arc::new(next));
        lifecycle.base_loaded = true;
        if lifecycle.state == LifecycleState::Created {
            lifecycle.state = LifecycleState::Started;
        }
        let _ = self.update_tx.send(RegistryUpdate::Initialized);
        Ok(())
    }

    /// Signals shutdown. Nothing is released; always succeeds.
    pub fn shutdown(&self) {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.state != LifecycleState::Stopped {
            info!("SearchParameter registry stopped");
            lifecycle.state = LifecycleState::Stopped;
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.lock().state
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot.load_full()
    }

    /// Returns the number of registered parameters.
    pub fn len(&self) -> usize {
        self.snapshot.load().index.len()
    }

    /// Returns true if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.snapshot.load().index.is_empty()
    }

    /// Returns true if the resource type has any parameters.
    pub fn has_resource_type(&self, resource_type: &str) -> bool {
        self.snapshot.load().index.params_for_type(resource_type).is_some()
    }

    /// Returns all resource types that have registered parameters, sorted.
    pub fn resource_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.snapshot.load().index.resource_types().cloned().collect();
        types.sort();
        types
    }

    /// Returns every registered parameter.
    pub fn all_parameters(&self) -> Vec<Arc<SearchParameterDefinition>> {
        self.snapshot.load().index.definitions().cloned().collect()
    }

    /// Distinct component type signatures of composite parameters.
    pub fn composite_signatures(&self) -> BTreeSet<String> {
        self.snapshot.load().index.composite_signatures().clone()
    }

    /// Gets all parameters for a resource type, sorted by code.
    pub fn get_parameters_for_type(
        &self,
        resource_type: &str,
    ) -> RegistryResult<Vec<Arc<SearchParameterDefinition>>> {
        let snapshot = self.snapshot.load();
        let params = snapshot.index.params_for_type(resource_type).ok_or_else(|| {
            RegistryError::UnsupportedResourceType {
                resource_type: resource_type.to_string(),
            }
        })?;

        let mut params: Vec<_> = params.values().cloned().collect();
        params.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(params)
    }

    /// Gets a specific parameter by resource type and code.
    pub fn get_parameter(
        &self,
        resource_type: &str,
        code: &str,
    ) -> RegistryResult<Arc<SearchParameterDefinition>> {
        self.try_get_parameter(resource_type, code)
            .ok_or_else(|| RegistryError::UnknownSearchParameter {
                resource_type: resource_type.to_string(),
                code: code.to_string(),
            })
    }

    /// Gets a specific parameter by resource type and code, without an error.
    pub fn try_get_parameter(
        &self,
        resource_type: &str,
        code: &str,
    ) -> Option<Arc<SearchParameterDefinition>> {
        self.snapshot.load().index.get(resource_type, code).cloned()
    }

    /// Gets a parameter by its canonical URL.
    pub fn get_parameter_by_url(
        &self,
        url: &str,
    ) -> RegistryResult<Arc<SearchParameterDefinition>> {
        self.snapshot
            .load()
            .index
            .get_by_url(url)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownSearchParameterUrl {
                url: url.to_string(),
            })
    }

    /// Returns the type of a parameter or of one of its components.
    ///
    /// With no index the parameter's own type is returned. Otherwise the
    /// indexed component's definition is looked up and its type returned.
    pub fn resolve_component_type(
        &self,
        param: &SearchParameterDefinition,
        component_index: Option<usize>,
    ) -> RegistryResult<SearchParamType> {
        let Some(index) = component_index else {
            return Ok(param.param_type);
        };

        let component = param
            .component
            .get(index)
            .ok_or_else(|| RegistryError::IndexOutOfRange {
                parameter: param.identity().to_string(),
                index,
                count: param.component.len(),
            })?;

        Ok(self.get_parameter_by_url(&component.definition)?.param_type)
    }

    /// Current fingerprint of a resource type.
    pub fn fingerprint(&self, resource_type: &str) -> Option<String> {
        self.snapshot.load().fingerprint(resource_type).map(String::from)
    }

    /// Copy of every fingerprint.
    pub fn all_fingerprints(&self) -> BTreeMap<String, String> {
        self.snapshot
            .load()
            .fingerprints
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Resource types whose current fingerprint differs from `recorded`.
    ///
    /// Types missing from `recorded` are stale; types missing from the
    /// registry are ignored.
    pub fn stale_resource_types(&self, recorded: &BTreeMap<String, String>) -> Vec<String> {
        let snapshot = self.snapshot.load();
        let mut stale: Vec<String> = snapshot
            .fingerprints
            .iter()
            .filter(|(resource_type, hash)| recorded.get(*resource_type) != Some(*hash))
            .map(|(resource_type, _)| resource_type.clone())
            .collect();
        stale.sort();
        stale
    }

    /// Merges a catalogue into the registry.
    ///
    /// The merge is all-or-nothing: on error the registry is unchanged.
    /// Fingerprints are recomputed for the resource types the catalogue
    /// touched.
    pub fn extend_with(&self, catalogue: &Catalogue) -> RegistryResult<ExtensionSummary> {
        let mut lifecycle = self.lifecycle.lock();
        self.initialize_locked(&mut lifecycle)?;

        let mut next = RegistrySnapshot::clone(&self.snapshot.load());
        let outcome = builder::build_in_place(catalogue, &mut next.index, self.model.as_ref())
            .map_err(|e| {
                warn!(
                    source = catalogue.source_name(),
                    error = %e,
                    "Rejected SearchParameter catalogue"
                );
                e
            })?;
        next.refresh_fingerprints(&outcome.touched_types);

        let resource_types: Vec<String> = outcome.touched_types.into_iter().collect();
        info!(
            source = catalogue.source_name(),
            indexed = outcome.indexed,
            resource_types = resource_types.len(),
            "Extended SearchParameter registry"
        );

        self.snapshot.store(Arc::new(next));
        let _ = self.update_tx.send(RegistryUpdate::Extended {
            resource_types: resource_types.clone(),
        });

        Ok(ExtensionSummary {
            indexed: outcome.indexed,
            resource_types,
        })
    }

    /// Replaces a parameter's support flags.
    ///
    /// Support flags are not part of the fingerprint, so fingerprints are
    /// unchanged.
    pub fn update_support(&self, url: &str, support: SearchParameterSupport) -> RegistryResult<()> {
        let _state = self.lifecycle.lock();

        let current = self.snapshot.load_full();
        let existing = current.index.get_by_url(url).ok_or_else(|| {
            RegistryError::UnknownSearchParameterUrl {
                url: url.to_string(),
            }
        })?;

        let mut next = RegistrySnapshot::clone(&current);
        next.index
            .replace(SearchParameterDefinition::clone(existing).with_support(support));
        self.snapshot.store(Arc::new(next));

        let _ = self
            .update_tx
            .send(RegistryUpdate::SupportChanged(url.to_string()));
        Ok(())
    }

    /// Subscribes to registry updates.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryUpdate> {
        self.update_tx.subscribe()
    }
}

impl Default for SearchParameterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SearchParameterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot.load();
        f.debug_struct("SearchParameterRegistry")
            // try_lock: formatting may happen while a writer holds the lock
            .field("state", &self.lifecycle.try_lock().map(|lifecycle| lifecycle.state))
            .field("params_count", &snapshot.index.len())
            .field("resource_types", &snapshot.index.resource_types().count())
            .finish()
    }
}
