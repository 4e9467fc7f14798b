use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Source of "which child did the user last land on under this parent"
pub trait ChildHints {
    fn last_active_child(&self, parent_id: &str) -> Option<String>;
}

impl ChildHints for HashMap<String, String> {
    fn last_active_child(&self, parent_id: &str) -> Option<String> {
        self.get(parent_id).cloned()
    }
}

/// Session-wide parent -> last active child map.
///
/// Cloning shares the same underlying map. Writes are last-write-wins; the
/// map only biases planning and is never authoritative.
#[derive(Debug, Clone, Default)]
pub struct LastActiveChildMap {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl LastActiveChildMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `child_id` is now the selected child of `parent_id`
    pub fn record(&self, parent_id: impl Into<String>, child_id: impl Into<String>) {
        let mut map = self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        map.insert(parent_id.into(), child_id.into());
    }

    /// Record every parent -> child link along a root-to-node path
    pub fn record_path(&self, path: &[&str]) {
        let mut map = self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        for pair in path.windows(2) {
            map.insert(pair[0].to_string(), pair[1].to_string());
        }
    }

    pub fn get(&self, parent_id: &str) -> Option<String> {
        let map = self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        map.get(parent_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner()).clear();
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }
}

impl ChildHints for LastActiveChildMap {
    fn last_active_child(&self, parent_id: &str) -> Option<String> {
        self.get(parent_id)
    }
}
