//! Capability catalog: a read-mostly snapshot keyed by model id.
//!
//! The snapshot is held in an [`ArcSwap`] so concurrent requests read it without
//! locking while an out-of-band catalog sync replaces it wholesale.

use super::classify::{classify, UpstreamModel};
use super::ModelGenerationCapability;
use crate::{Error, ErrorContext, Result};
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

type Snapshot = HashMap<String, Arc<ModelGenerationCapability>>;

/// Anything that can answer `get_capability(model_id)`.
pub trait CapabilitySource: Send + Sync {
    fn get_capability(&self, model_id: &str) -> Option<Arc<ModelGenerationCapability>>;

    /// Lookup that fails closed: unknown models get a deny-all capability.
    fn capability_or_deny(&self, model_id: &str) -> Arc<ModelGenerationCapability> {
        self.get_capability(model_id).unwrap_or_else(|| {
            tracing::debug!(model = model_id, "model not in catalog, denying all parameters");
            Arc::new(ModelGenerationCapability::deny_all(model_id))
        })
    }
}

/// On-disk catalog document.
///
/// `capabilities` holds explicit, reviewed records; `models` holds raw upstream
/// listing entries that are classified on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogDocument {
    #[serde(default)]
    pub capabilities: Vec<ModelGenerationCapability>,
    #[serde(default)]
    pub models: Vec<UpstreamModel>,
}

impl CatalogDocument {
    /// Flatten into capability records; explicit records come first.
    pub fn into_capabilities(self) -> Vec<ModelGenerationCapability> {
        let mut out = self.capabilities;
        out.extend(self.models.iter().map(classify));
        out
    }
}

#[derive(Debug)]
pub struct CapabilityCatalog {
    snapshot: ArcSwap<Snapshot>,
}

impl CapabilityCatalog {
    /// Empty catalog; every lookup is denied until [`replace`](Self::replace) runs.
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    pub fn from_capabilities(models: Vec<ModelGenerationCapability>) -> Result<Self> {
        let catalog = Self::new();
        catalog.replace(models)?;
        Ok(catalog)
    }

    pub fn from_document(doc: CatalogDocument) -> Result<Self> {
        Self::from_capabilities(doc.into_capabilities())
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let doc: CatalogDocument = serde_yaml::from_str(s)?;
        Self::from_document(doc)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let doc: CatalogDocument = serde_json::from_str(s)?;
        Self::from_document(doc)
    }

    /// Load a catalog file; `.json` is parsed as JSON, anything else as YAML.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Atomically replace the snapshot. The previous snapshot stays intact on error.
    pub fn replace(&self, models: Vec<ModelGenerationCapability>) -> Result<()> {
        let index = build_index(models)?;
        let count = index.len();
        self.snapshot.store(Arc::new(index));
        tracing::info!(models = count, "capability catalog snapshot replaced");
        Ok(())
    }

    /// Current snapshot; stays valid even if a refresh lands meanwhile.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Known model ids, sorted.
    pub fn model_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.snapshot.load().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for CapabilityCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilitySource for CapabilityCatalog {
    fn get_capability(&self, model_id: &str) -> Option<Arc<ModelGenerationCapability>> {
        self.snapshot.load().get(model_id).cloned()
    }
}

fn build_index(models: Vec<ModelGenerationCapability>) -> Result<Snapshot> {
    let mut index = HashMap::with_capacity(models.len());
    for (i, cap) in models.into_iter().enumerate() {
        if cap.model_id.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "capability entry has an empty model id",
                ErrorContext::new()
                    .with_field_path(format!("models[{}].id", i))
                    .with_source("capability_catalog"),
            ));
        }
        if cap.length.max_completion_tokens == Some(0) {
            return Err(Error::configuration_with_context(
                "completion ceiling must be positive",
                ErrorContext::new()
                    .with_field_path(format!("models[{}].length.max_completion_tokens", i))
                    .with_details(cap.model_id.clone())
                    .with_source("capability_catalog"),
            ));
        }
        if index.contains_key(&cap.model_id) {
            return Err(Error::configuration_with_context(
                "duplicate model id in capability catalog",
                ErrorContext::new()
                    .with_field_path(format!("models[{}].id", i))
                    .with_details(cap.model_id.clone())
                    .with_source("capability_catalog"),
            ));
        }
        index.insert(cap.model_id.clone(), Arc::new(cap));
    }
    Ok(index)
}
