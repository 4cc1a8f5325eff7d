// src/registry.rs
//! Binding Registry
//! Holds the name → value bindings and the environment of one naming context.
//! Every mutation, `close` included, runs under one structural lock and
//! re-checks the closed flag inside it. Notifications are emitted before the
//! lock is released, so subscribers see them in mutation order. Reads go
//! straight to the map.

use crate::error::{NamingError, NamingResult};
use crate::notification::{Notification, NotificationHub, NotificationKind};
use crate::value::{BindingState, Value};
use crossbeam_channel::Receiver;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

const UNREGISTERED: &str = "<unregistered>";

pub struct BindingRegistry {
    /// Mapping of bound names to values.
    bindings: DashMap<String, Value>,
    /// Context environment properties.
    environment: DashMap<String, Value>,
    /// Serialises mutations and `close`.
    structure: Mutex<()>,
    /// Identity of the owning context, used in error messages.
    label: RwLock<String>,
    name_in_namespace: String,
    closed: AtomicBool,
    notifications: NotificationHub,
}

impl BindingRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self::with_environment(String::new(), BTreeMap::new())
    }

    pub fn with_environment(name_in_namespace: String, environment: BTreeMap<String, Value>) -> Self {
        Self {
            bindings: DashMap::new(),
            environment: environment.into_iter().collect(),
            structure: Mutex::new(()),
            label: RwLock::new(UNREGISTERED.to_string()),
            name_in_namespace,
            closed: AtomicBool::new(false),
            notifications: NotificationHub::new(),
        }
    }

    fn ensure_live(&self) -> NamingResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(NamingError::Closed);
        }
        Ok(())
    }

    /// Take the structural lock on a live registry.
    fn mutation(&self) -> NamingResult<MutexGuard<'_, ()>> {
        let guard = self.structure.lock();
        self.ensure_live()?;
        Ok(guard)
    }

    fn validate(name: &str) -> NamingResult<()> {
        if name.is_empty() {
            return Err(NamingError::InvalidName(name.to_string()));
        }
        Ok(())
    }

    fn already_bound(&self, name: &str) -> NamingError {
        NamingError::NameAlreadyBound {
            name: name.to_string(),
            context: self.label.read().clone(),
        }
    }

    /// Bind `value` under `name`. `None` binds the null-marker.
    /// Fails if the name is already bound; the existing binding is untouched.
    pub fn bind(&self, name: &str, value: Option<Value>) -> NamingResult<()> {
        Self::validate(name)?;
        let value = Value::from(value);
        let _guard = self.mutation()?;
        match self.bindings.entry(name.to_string()) {
            Entry::Occupied(_) => {
                tracing::debug!(name, "bind rejected: name already bound");
                return Err(self.already_bound(name));
            }
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
        }
        tracing::debug!(name, "bound");
        self.notifications.emit(NotificationKind::BindingAdded, name, None);
        Ok(())
    }

    /// Retrieve the value bound to `name`, including the null-marker.
    pub fn lookup(&self, name: &str) -> NamingResult<Value> {
        self.ensure_live()?;
        self.bindings
            .get(name)
            .map(|v| v.value().clone())
            .ok_or_else(|| NamingError::NotFound(name.to_string()))
    }

    /// Non-failing probe distinguishing bound, bound-to-null and unbound.
    pub fn state(&self, name: &str) -> BindingState {
        match self.bindings.get(name) {
            Some(v) => BindingState::from(v.value().clone()),
            None => BindingState::Unbound,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Remove a binding. Removing an absent name is an error.
    pub fn unbind(&self, name: &str) -> NamingResult<()> {
        let _guard = self.mutation()?;
        if self.bindings.remove(name).is_none() {
            return Err(NamingError::NotFound(name.to_string()));
        }
        tracing::debug!(name, "unbound");
        self.notifications.emit(NotificationKind::BindingRemoved, name, None);
        Ok(())
    }

    /// Bind `value` under `name`, replacing any existing binding.
    pub fn rebind(&self, name: &str, value: Option<Value>) -> NamingResult<()> {
        Self::validate(name)?;
        let value = Value::from(value);
        let _guard = self.mutation()?;
        let previous = self.bindings.insert(name.to_string(), value);
        tracing::debug!(name, replaced = previous.is_some(), "rebound");
        if previous.is_none() {
            self.notifications.emit(NotificationKind::BindingAdded, name, None);
        }
        Ok(())
    }

    /// Replace the value of an existing binding, never creating one.
    ///
    /// `check` sees the current and the proposed value and may veto the
    /// replacement; its error comes back as the inner `Err`. Returns the
    /// previous value, or [`NamingError::NotFound`] if `name` is unbound.
    pub fn replace_existing<E>(
        &self,
        name: &str,
        value: Value,
        check: impl FnOnce(&Value, &Value) -> Result<(), E>,
    ) -> NamingResult<Result<Value, E>> {
        let _guard = self.mutation()?;
        let mut slot = self
            .bindings
            .get_mut(name)
            .ok_or_else(|| NamingError::NotFound(name.to_string()))?;
        if let Err(e) = check(slot.value(), &value) {
            return Ok(Err(e));
        }
        let previous = std::mem::replace(slot.value_mut(), value);
        drop(slot);
        tracing::debug!(name, "replaced");
        Ok(Ok(previous))
    }

    /// Move the binding at `old` to `new`.
    pub fn rename(&self, old: &str, new: &str) -> NamingResult<()> {
        Self::validate(old)?;
        Self::validate(new)?;
        let _guard = self.mutation()?;
        if self.bindings.contains_key(new) {
            return Err(self.already_bound(new));
        }
        let (_, value) = self
            .bindings
            .remove(old)
            .ok_or_else(|| NamingError::NotFound(old.to_string()))?;
        // `new` was checked vacant and no other mutation can run while the guard is held
        self.bindings.insert(new.to_string(), value);
        tracing::debug!(old, new, "renamed");
        self.notifications.emit(NotificationKind::BindingRenamed, new, Some(old));
        Ok(())
    }

    /// Names and value type names, sorted by name.
    pub fn list(&self) -> NamingResult<Vec<(String, &'static str)>> {
        self.ensure_live()?;
        let mut out: Vec<_> = self
            .bindings
            .iter()
            .map(|r| (r.key().clone(), r.value().type_name()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }

    /// Names and values, sorted by name.
    pub fn list_bindings(&self) -> NamingResult<Vec<(String, Value)>> {
        self.ensure_live()?;
        let mut out: Vec<_> = self
            .bindings
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }

    /// Currently bound names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.bindings.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Set an environment property, returning the previous value.
    pub fn add_to_environment(&self, key: &str, value: Value) -> NamingResult<Option<Value>> {
        Self::validate(key)?;
        let _guard = self.mutation()?;
        Ok(self.environment.insert(key.to_string(), value))
    }

    /// Remove an environment property, returning its value.
    pub fn remove_from_environment(&self, key: &str) -> NamingResult<Option<Value>> {
        let _guard = self.mutation()?;
        Ok(self.environment.remove(key).map(|(_, v)| v))
    }

    /// Snapshot of the environment.
    pub fn environment(&self) -> NamingResult<BTreeMap<String, Value>> {
        self.ensure_live()?;
        Ok(self
            .environment
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect())
    }

    pub fn name_in_namespace(&self) -> &str {
        &self.name_in_namespace
    }

    /// Discard the registry. Later operations fail with [`NamingError::Closed`].
    pub fn close(&self) {
        let _guard = self.structure.lock();
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.bindings.clear();
            self.environment.clear();
            tracing::debug!(context = %self.label.read(), "context closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn subscribe(&self) -> Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub(crate) fn set_label(&self, label: Option<String>) {
        *self.label.write() = label.unwrap_or_else(|| UNREGISTERED.to_string());
    }
}

impl Default for BindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}
