use super::object::{DomainObject, ObjectAdapter};
use super::oid::{Oid, RootOid};
use super::version::Version;
use crate::core::{MetaError, Result};
use std::collections::HashMap;

/// Index of an adapter inside an [`AdapterManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AdapterHandle(usize);

impl AdapterHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Identity and version of an adapter and its aggregated parts, as they
/// were before a command ran. See [`AdapterManager::restore`].
#[derive(Debug, Clone)]
pub struct AdapterSnapshot {
    entries: Vec<(AdapterHandle, ObjectAdapter)>,
}

impl AdapterSnapshot {
    pub fn handles(&self) -> impl Iterator<Item = AdapterHandle> + '_ {
        self.entries.iter().map(|(h, _)| *h)
    }
}

/// Identity map of one session.
///
/// Adapters live in an arena addressed by [`AdapterHandle`]; a second map
/// resolves oids to handles. At most one adapter exists per oid.
///
/// Slots are never reused. A handle whose adapter was removed stays stale
/// for the life of the manager and can be revived only by [`restore`], so
/// it never aliases another object. Removed slots cost one empty entry
/// each; a manager lives as long as its session.
///
/// [`restore`]: AdapterManager::restore
#[derive(Debug, Default)]
pub struct AdapterManager {
    slots: Vec<Option<ObjectAdapter>>,
    by_oid: HashMap<Oid, AdapterHandle>,
}

impl AdapterManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_oid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_oid.is_empty()
    }

    pub fn handle_for(&self, oid: &Oid) -> Option<AdapterHandle> {
        self.by_oid.get(oid).copied()
    }

    pub fn get(&self, handle: AdapterHandle) -> Result<&ObjectAdapter> {
        self.slots
            .get(handle.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| stale(handle))
    }

    pub fn get_mut(&mut self, handle: AdapterHandle) -> Result<&mut ObjectAdapter> {
        self.slots
            .get_mut(handle.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| stale(handle))
    }

    pub fn iter(&self) -> impl Iterator<Item = (AdapterHandle, &ObjectAdapter)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|a| (AdapterHandle(i), a)))
    }

    /// Adapt a newly created object under a transient root oid.
    pub fn adapt_transient(&mut self, oid: Oid, pojo: DomainObject) -> Result<AdapterHandle> {
        if oid.is_aggregated() || oid.is_persistent() {
            return Err(MetaError::IllegalArgument(format!(
                "Expected a transient root oid, got '{}'",
                oid
            )));
        }
        self.insert(ObjectAdapter::resolved(oid, pojo))
    }

    /// Adapt an embedded part of the object behind `parent`.
    ///
    /// The part takes its resolve state from the parent: a resolved parent
    /// carries the part's state with it.
    pub fn adapt_aggregated(
        &mut self,
        parent: AdapterHandle,
        spec_id: &str,
        local_id: &str,
        pojo: DomainObject,
    ) -> Result<AdapterHandle> {
        let parent = self.get(parent)?;
        let oid = Oid::aggregated(parent.oid().clone(), spec_id, local_id)?;
        let adapter = if parent.is_resolved() {
            ObjectAdapter::resolved(oid, pojo)
        } else {
            ObjectAdapter::ghost(oid)
        };
        self.insert(adapter)
    }

    /// The adapter for `oid`, recreating a ghost for persistent identities
    /// seen for the first time.
    pub fn adapter_for_oid(&mut self, oid: &Oid) -> Result<AdapterHandle> {
        if let Some(handle) = self.handle_for(oid) {
            return Ok(handle);
        }
        if oid.is_transient() {
            return Err(MetaError::ObjectNotFound(format!(
                "No adapter for transient oid '{}'",
                oid
            )));
        }
        self.insert(ObjectAdapter::ghost(oid.clone()))
    }

    /// Bind state loaded from the store, reusing any adapter already mapped
    /// to `oid`. A resolved adapter keeps its in-session state.
    pub fn bind_loaded(
        &mut self,
        oid: &Oid,
        pojo: DomainObject,
        version: Version,
    ) -> Result<AdapterHandle> {
        let handle = self.adapter_for_oid(oid)?;
        let adapter = self.get_mut(handle)?;
        if !adapter.is_resolved() {
            adapter.bind(pojo, Some(version))?;
        }
        Ok(handle)
    }

    /// Move a transient adapter (and every part aggregated under it) to a
    /// persistent oid with the given key.
    pub fn remap_as_persistent(&mut self, handle: AdapterHandle, key: &str) -> Result<Oid> {
        let old = self.get(handle)?.oid().clone();
        let old_root = match old.as_root() {
            Some(root) if root.is_transient() => root.clone(),
            _ => {
                return Err(MetaError::IllegalArgument(format!(
                    "Only transient root oids can be made persistent, got '{}'",
                    old
                )));
            }
        };
        let new_root: RootOid = old_root.as_persistent(key)?;
        let new_oid = Oid::Root(new_root.clone());
        if self.by_oid.contains_key(&new_oid) {
            return Err(duplicate(&new_oid));
        }

        let affected: Vec<(Oid, AdapterHandle)> = self
            .by_oid
            .iter()
            .filter(|(oid, _)| oid.root() == &old_root)
            .map(|(oid, h)| (oid.clone(), *h))
            .collect();

        for (oid, h) in affected {
            let remapped = oid.with_root(new_root.clone());
            self.by_oid.remove(&oid);
            self.get_mut(h)?.replace_oid(remapped.clone());
            self.by_oid.insert(remapped, h);
        }

        tracing::debug!(from = %old, to = %new_oid, "adapter remapped as persistent");
        Ok(new_oid)
    }

    /// Drop an adapter and every part aggregated under it.
    pub fn remove(&mut self, handle: AdapterHandle) -> Result<ObjectAdapter> {
        let oid = self.get(handle)?.oid().clone();
        let parts: Vec<AdapterHandle> = self
            .by_oid
            .iter()
            .filter(|(o, h)| **h != handle && is_under(o, &oid))
            .map(|(_, h)| *h)
            .collect();

        for part in parts {
            if let Some(adapter) = self.slots[part.0].take() {
                self.by_oid.remove(adapter.oid());
            }
        }
        self.by_oid.remove(&oid);
        self.slots[handle.0].take().ok_or_else(|| stale(handle))
    }

    /// Capture the adapter behind `handle` and every part aggregated under
    /// it.
    pub fn snapshot(&self, handle: AdapterHandle) -> Result<AdapterSnapshot> {
        let target = self.get(handle)?;
        let mut entries = vec![(handle, target.clone())];
        entries.extend(
            self.iter()
                .filter(|(h, a)| *h != handle && is_under(a.oid(), target.oid()))
                .map(|(h, a)| (h, a.clone())),
        );
        Ok(AdapterSnapshot { entries })
    }

    /// Put back the oids and versions captured in `snapshot`.
    ///
    /// Adapters still present keep their current state and only get their
    /// identity and version back; removed ones are reinserted whole under
    /// their original handles.
    pub fn restore(&mut self, snapshot: AdapterSnapshot) -> Result<()> {
        for (handle, saved) in snapshot.entries {
            let oid = saved.oid().clone();
            if self.handle_for(&oid).is_some_and(|owner| owner != handle) {
                return Err(duplicate(&oid));
            }
            let slot = self.slots.get_mut(handle.0).ok_or_else(|| stale(handle))?;
            match slot {
                Some(current) => {
                    let previous = current.oid().clone();
                    current.restore_identity(oid.clone(), saved.version().cloned());
                    if previous != oid {
                        tracing::debug!(from = %previous, to = %oid, "adapter identity restored");
                        self.by_oid.remove(&previous);
                    }
                }
                None => {
                    tracing::debug!(oid = %oid, "removed adapter restored");
                    *slot = Some(saved);
                }
            }
            self.by_oid.insert(oid, handle);
        }
        Ok(())
    }

    fn insert(&mut self, adapter: ObjectAdapter) -> Result<AdapterHandle> {
        if self.by_oid.contains_key(adapter.oid()) {
            return Err(duplicate(adapter.oid()));
        }
        let handle = AdapterHandle(self.slots.len());
        tracing::trace!(oid = %adapter.oid(), state = %adapter.resolve_state(), "adapter created");
        self.by_oid.insert(adapter.oid().clone(), handle);
        self.slots.push(Some(adapter));
        Ok(handle)
    }
}

fn is_under(oid: &Oid, ancestor: &Oid) -> bool {
    let mut current = oid.parent();
    while let Some(parent) = current {
        if parent == ancestor {
            return true;
        }
        current = parent.parent();
    }
    false
}

fn stale(handle: AdapterHandle) -> MetaError {
    MetaError::IllegalArgument(format!("Stale adapter handle {}", handle.0))
}

fn duplicate(oid: &Oid) -> MetaError {
    MetaError::IllegalState(format!("An adapter for '{}' already exists", oid))
}
