//! # Bag - Typed Heterogeneous Container
//!
//! The per-event store passed from module to module. Each entry is an owned,
//! reference-counted object plus the type tag it was stored with.
//!
//! ## Retrieval Styles
//!
//! - [`Bag::get`] is fail-fast: it returns `Err` when the key is missing or the
//!   stored type is not viewable as `T`.
//! - [`Bag::get_shared`] looks before it leaps: it returns `None` instead.
//!
//! ## Capability Views
//!
//! Rust has no implicit upcast from a concrete `Arc<T>` to `Arc<dyn Trait>` in
//! generic code, so an entry can carry extra views registered at insertion
//! time with an explicit upcast closure:
//!
//! ```rust,ignore
//! bag.put_with_view("energy", Arc::new(LikelihoodEnergy::new(..)), |e| e as Arc<dyn EnergyEstimate>)?;
//!
//! let concrete = bag.get::<LikelihoodEnergy>("energy")?;
//! let generic = bag.get::<dyn EnergyEstimate>("energy")?;
//! ```
//!
//! Objects are stored behind `Arc`, so a module holding a handle from
//! [`Bag::get_shared`] keeps the object alive after the bag drops its own
//! reference through [`Bag::delete`] or [`Bag::clear`].

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::errors::BagError;

type View = Box<dyn Any + Send + Sync>;

/// What happens when [`Bag::put`] hits a key that is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Fail with [`BagError::DuplicateKey`].
    #[default]
    Reject,
    /// Drop the old entry (logged at warn level) and store the new one.
    Replace,
}

struct Entry {
    type_name: &'static str,
    sequence: u64,
    views: HashMap<TypeId, View>,
}

impl Entry {
    fn view<T: ?Sized + 'static>(&self) -> Option<&Arc<T>> {
        self.views
            .get(&TypeId::of::<T>())
            .and_then(|view| view.downcast_ref::<Arc<T>>())
    }
}

/// Name-keyed store of arbitrary shared objects with runtime type checking.
#[derive(Default)]
pub struct Bag {
    entries: HashMap<String, Entry>,
    next_sequence: u64,
    policy: OverwritePolicy,
}

impl Bag {
    /// Create an empty bag that rejects duplicate keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty bag with an explicit overwrite policy.
    pub fn with_policy(policy: OverwritePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// The overwrite policy this bag was created with.
    pub fn policy(&self) -> OverwritePolicy {
        self.policy
    }

    /// Store `value` under `key`.
    pub fn put<T: Send + Sync + 'static>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> Result<(), BagError> {
        self.put_shared(key, Arc::new(value))
    }

    /// Store an already shared object under `key`.
    pub fn put_shared<T: Send + Sync + 'static>(
        &mut self,
        key: impl Into<String>,
        value: Arc<T>,
    ) -> Result<(), BagError> {
        let mut views: HashMap<TypeId, View> = HashMap::new();
        views.insert(TypeId::of::<T>(), Box::new(value));
        self.insert_entry(key.into(), type_name::<T>(), views)
    }

    /// Store `value` under `key`, also retrievable as `U` through `upcast`.
    pub fn put_with_view<T, U, F>(
        &mut self,
        key: impl Into<String>,
        value: Arc<T>,
        upcast: F,
    ) -> Result<(), BagError>
    where
        T: Send + Sync + 'static,
        U: ?Sized + Send + Sync + 'static,
        F: FnOnce(Arc<T>) -> Arc<U>,
    {
        let mut views: HashMap<TypeId, View> = HashMap::new();
        views.insert(TypeId::of::<U>(), Box::new(upcast(Arc::clone(&value))));
        views.insert(TypeId::of::<T>(), Box::new(value));
        self.insert_entry(key.into(), type_name::<T>(), views)
    }

    /// Register one more view on an existing entry stored as concrete `T`.
    pub fn add_view<T, U, F>(&mut self, key: &str, upcast: F) -> Result<(), BagError>
    where
        T: Send + Sync + 'static,
        U: ?Sized + Send + Sync + 'static,
        F: FnOnce(Arc<T>) -> Arc<U>,
    {
        let entry = self
            .entries
            .get_mut(key)
            .ok_or_else(|| BagError::KeyNotFound {
                key: key.to_string(),
                requested: short_type_name(type_name::<T>()),
            })?;
        let concrete = entry
            .view::<T>()
            .cloned()
            .ok_or_else(|| BagError::TypeMismatch {
                key: key.to_string(),
                stored: short_type_name(entry.type_name),
                requested: short_type_name(type_name::<T>()),
            })?;
        entry
            .views
            .insert(TypeId::of::<U>(), Box::new(upcast(concrete)));
        Ok(())
    }

    /// Borrow the object under `key` viewed as `T`.
    pub fn get<T: ?Sized + 'static>(&self, key: &str) -> Result<&T, BagError> {
        let entry = self.lookup::<T>(key)?;
        match entry.view::<T>() {
            Some(view) => Ok(view.as_ref()),
            None => Err(self.mismatch::<T>(key, entry)),
        }
    }

    /// Shared handle to the object under `key` viewed as `T`, failing loudly.
    pub fn try_get_shared<T: ?Sized + 'static>(&self, key: &str) -> Result<Arc<T>, BagError> {
        let entry = self.lookup::<T>(key)?;
        match entry.view::<T>() {
            Some(view) => Ok(Arc::clone(view)),
            None => Err(self.mismatch::<T>(key, entry)),
        }
    }

    /// Shared handle to the object under `key` viewed as `T`, or `None`.
    pub fn get_shared<T: ?Sized + 'static>(&self, key: &str) -> Option<Arc<T>> {
        self.entries
            .get(key)
            .and_then(|entry| entry.view::<T>())
            .map(Arc::clone)
    }

    /// True if anything is stored under `key`, regardless of type.
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// True if the entry under `key` is viewable as `T`.
    pub fn has_type<T: ?Sized + 'static>(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.view::<T>().is_some())
    }

    /// Drop the bag's reference to `key`. Returns false if nothing was stored.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            trace!(key, "bag member deleted");
        }
        removed
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> Vec<&str> {
        self.ordered().into_iter().map(|(key, _)| key).collect()
    }

    /// Fully qualified type name of the entry under `key`.
    pub fn type_name_of(&self, key: &str) -> Option<&'static str> {
        self.entries.get(key).map(|entry| entry.type_name)
    }

    /// Move every entry of `other` into this bag under `<prefix><key>`.
    pub fn absorb(&mut self, other: Bag, prefix: &str) -> Result<(), BagError> {
        let mut incoming: Vec<(String, Entry)> = other.entries.into_iter().collect();
        incoming.sort_by_key(|(_, entry)| entry.sequence);
        for (key, entry) in incoming {
            self.insert_entry(format!("{prefix}{key}"), entry.type_name, entry.views)?;
        }
        Ok(())
    }

    /// Write the `"<key>" => <Type>` listing used for debugging.
    pub fn dump<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        write!(out, "bag members:")?;
        for (key, entry) in self.ordered() {
            write!(out, "\n  \"{}\" => <{}>", key, short_type_name(entry.type_name))?;
        }
        Ok(())
    }

    fn insert_entry(
        &mut self,
        key: String,
        type_name: &'static str,
        views: HashMap<TypeId, View>,
    ) -> Result<(), BagError> {
        if let Some(existing) = self.entries.get(&key) {
            match self.policy {
                OverwritePolicy::Reject => {
                    return Err(BagError::DuplicateKey {
                        key,
                        attempted: short_type_name(type_name),
                    });
                }
                OverwritePolicy::Replace => {
                    warn!(
                        key = %key,
                        old = %short_type_name(existing.type_name),
                        new = %short_type_name(type_name),
                        "overwriting bag member"
                    );
                }
            }
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.insert(
            key,
            Entry {
                type_name,
                sequence,
                views,
            },
        );
        Ok(())
    }

    fn lookup<T: ?Sized + 'static>(&self, key: &str) -> Result<&Entry, BagError> {
        self.entries.get(key).ok_or_else(|| BagError::KeyNotFound {
            key: key.to_string(),
            requested: short_type_name(type_name::<T>()),
        })
    }

    fn mismatch<T: ?Sized + 'static>(&self, key: &str, entry: &Entry) -> BagError {
        BagError::TypeMismatch {
            key: key.to_string(),
            stored: short_type_name(entry.type_name),
            requested: short_type_name(type_name::<T>()),
        }
    }

    fn ordered(&self) -> Vec<(&str, &Entry)> {
        let mut ordered: Vec<(&str, &Entry)> = self
            .entries
            .iter()
            .map(|(key, entry)| (key.as_str(), entry))
            .collect();
        ordered.sort_by_key(|(_, entry)| entry.sequence);
        ordered
    }
}

impl fmt::Display for Bag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dump(f)
    }
}

impl fmt::Debug for Bag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.ordered()
                    .into_iter()
                    .map(|(key, entry)| (key, short_type_name(entry.type_name))),
            )
            .finish()
    }
}

/// Strip module paths from a type name: `alloc::vec::Vec<my::Hit>` becomes `Vec<Hit>`.
pub fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();

    let flush = |segment: &mut String, out: &mut String| {
        let last = segment.rsplit("::").next().unwrap_or_default();
        out.push_str(last);
        segment.clear();
    };

    for c in full.chars() {
        if c.is_alphanumeric() || c == '_' || c == ':' {
            segment.push(c);
        } else {
            flush(&mut segment, &mut out);
            out.push(c);
        }
    }
    flush(&mut segment, &mut out);
    out
}
