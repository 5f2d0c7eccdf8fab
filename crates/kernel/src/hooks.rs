//! Pre-deletion hooks (cascading cleanup without storage-level cascades).
//!
//! Each dependent-record type registers one hook against the entity type it
//! depends on. Deleting an entity through [`HookRegistry::delete`] runs every
//! hook for that type and then the delete itself inside a single
//! [`Transactional::atomically`] call, so a failing hook leaves storage
//! untouched.
//!
//! Hooks must not depend on each other: they run in registration order, but
//! nothing guarantees that order is meaningful.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;

use gatehouse_core::Entity;

use crate::error::HookError;
use crate::store::{StoreError, Transactional};

/// Cleanup for one kind of record that references `E`.
pub trait DeletionHook<E: Entity, S: ?Sized>: Send + Sync {
    /// Stable name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Remove (or otherwise resolve) every record referencing `entity`, or fail.
    fn on_delete_entity(&self, store: &S, entity: &E) -> Result<(), HookError>;
}

type HookList<E, S> = Vec<Box<dyn DeletionHook<E, S>>>;

/// Hooks keyed by the entity type they react to.
///
/// Additive: supporting a new dependent-record type means registering a new
/// hook, never editing the deletion call site or the other hooks.
pub struct HookRegistry<S: ?Sized> {
    by_entity: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    _store: PhantomData<fn(&S)>,
}

impl<S: ?Sized> Default for HookRegistry<S> {
    fn default() -> Self {
        Self {
            by_entity: HashMap::new(),
            _store: PhantomData,
        }
    }
}

impl<S: ?Sized> core::fmt::Debug for HookRegistry<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("entity_types", &self.by_entity.len())
            .finish()
    }
}

impl<S: ?Sized + 'static> HookRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E, H>(&mut self, hook: H) -> &mut Self
    where
        E: Entity + 'static,
        H: DeletionHook<E, S> + 'static,
    {
        let slot = self
            .by_entity
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(HookList::<E, S>::new()) as Box<dyn Any + Send + Sync>);
        if let Some(list) = slot.downcast_mut::<HookList<E, S>>() {
            tracing::debug!(entity_type = E::ENTITY_TYPE, hook = hook.name(), "registered deletion hook");
            list.push(Box::new(hook));
        }
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<E, H>(mut self, hook: H) -> Self
    where
        E: Entity + 'static,
        H: DeletionHook<E, S> + 'static,
    {
        self.register::<E, H>(hook);
        self
    }

    pub fn hooks_for<E: Entity + 'static>(&self) -> &[Box<dyn DeletionHook<E, S>>] {
        self.by_entity
            .get(&TypeId::of::<E>())
            .and_then(|slot| slot.downcast_ref::<HookList<E, S>>())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn hook_names<E: Entity + 'static>(&self) -> Vec<&'static str> {
        self.hooks_for::<E>().iter().map(|h| h.name()).collect()
    }

    /// Run every hook registered for `E`, stopping at the first failure.
    ///
    /// Callers must run this inside the same transaction as the entity delete;
    /// [`delete`](Self::delete) does that.
    pub fn run_hooks<E: Entity + 'static>(&self, store: &S, entity: &E) -> Result<(), HookError> {
        for hook in self.hooks_for::<E>() {
            tracing::debug!(
                entity_type = E::ENTITY_TYPE,
                entity_id = ?entity.id(),
                hook = hook.name(),
                "running deletion hook"
            );
            hook.on_delete_entity(store, entity).inspect_err(|e| {
                tracing::warn!(
                    entity_type = E::ENTITY_TYPE,
                    entity_id = ?entity.id(),
                    hook = hook.name(),
                    error = %e,
                    "deletion hook failed"
                );
            })?;
        }
        Ok(())
    }
}

impl<S: Transactional + 'static> HookRegistry<S> {
    /// Delete `entity`: hooks first, then `remove`, all in one transaction.
    ///
    /// Any failure rolls back every hook's work and the entity stays in place.
    pub fn delete<E, F>(&self, store: &S, entity: &E, remove: F) -> Result<(), HookError>
    where
        E: Entity + 'static,
        F: FnOnce(&S, &E) -> Result<(), StoreError>,
    {
        store.atomically(|tx| {
            self.run_hooks(tx, entity)?;
            remove(tx, entity).map_err(|source| HookError::Delete {
                entity_type: E::ENTITY_TYPE,
                source,
            })
        })?;

        tracing::info!(entity_type = E::ENTITY_TYPE, entity_id = ?entity.id(), "entity deleted");
        Ok(())
    }
}
