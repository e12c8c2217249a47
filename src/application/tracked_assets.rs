//! Thread-safe slot holding the current list of tracked assets

use std::sync::{Arc, RwLock};

use crate::shared::types::{AssetInfo, TrackedAsset};

/// Readers take a cheap snapshot (`Arc` clone); a refresh swaps in a whole new
/// list, so nobody ever observes a half-updated catalog.
#[derive(Debug, Clone, Default)]
pub struct TrackedAssets {
    current: Arc<RwLock<Arc<Vec<TrackedAsset>>>>,
}

impl TrackedAssets {
    pub fn new(assets: Vec<TrackedAsset>) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(assets))),
        }
    }

    pub fn from_catalog(catalog: Vec<AssetInfo>) -> Self {
        Self::new(catalog.into_iter().map(TrackedAsset::new).collect())
    }

    pub fn snapshot(&self) -> Arc<Vec<TrackedAsset>> {
        let guard = self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    pub(crate) fn replace(&self, assets: Vec<TrackedAsset>) {
        let mut guard = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(assets);
    }

    pub fn ids(&self) -> Vec<String> {
        self.snapshot().iter().map(|a| a.id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}
