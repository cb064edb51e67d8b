//! Run-scoped registry of resolved handles

use crate::types::{NaturalKey, ResourceHandle, ResourceKind};
use std::collections::HashMap;

/// Maps `(kind, natural key)` to the handle obtained during this run
///
/// Later stages consult the registry to find parents (the space of a page,
/// the group of a membership) without another remote round trip.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    handles: HashMap<(ResourceKind, NaturalKey), ResourceHandle>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a handle, replacing any previous one for the same key
    pub fn insert(&mut self, handle: ResourceHandle) {
        self.handles
            .insert((handle.kind, handle.key.clone()), handle);
    }

    pub fn get(&self, kind: ResourceKind, key: &NaturalKey) -> Option<&ResourceHandle> {
        self.handles.get(&(kind, key.clone()))
    }

    pub fn contains(&self, kind: ResourceKind, key: &NaturalKey) -> bool {
        self.get(kind, key).is_some()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
