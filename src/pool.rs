//! Pool handles and the adapter registry.
//!
//! Connection pools are opaque, already-constructed host objects; the
//! bootstrap never knows their concrete types. Hosts register a
//! [`PoolAdapter`] per pool type they want patched, and anything without a
//! registered adapter resolves to a no-op that skips every field.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{EncDbError, Result};

/// A named, shared reference to an opaque pool object.
///
/// Handles are cheap to clone; clones refer to the same underlying pool.
#[derive(Clone)]
pub struct PoolHandle {
    name: String,
    object: Arc<RwLock<Box<dyn Any + Send + Sync>>>,
}

impl PoolHandle {
    /// Wrap a pool object under a name used for logging and reports.
    pub fn new<P>(name: impl Into<String>, pool: P) -> Self
    where
        P: Any + Send + Sync,
    {
        Self {
            name: name.into(),
            object: Arc::new(RwLock::new(Box::new(pool))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runtime type of the wrapped pool object.
    pub fn pool_type(&self) -> TypeId {
        let guard = self.object.read();
        (**guard).type_id()
    }

    /// Read access to the pool object.
    pub fn with<R>(&self, f: impl FnOnce(&dyn Any) -> R) -> R {
        let guard = self.object.read();
        f(&**guard)
    }

    /// Exclusive access to the pool object for the duration of one patch.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut dyn Any) -> R) -> R {
        let mut guard = self.object.write();
        f(&mut **guard)
    }
}

impl fmt::Debug for PoolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolHandle").field("name", &self.name).finish()
    }
}

/// Whether a field write reached an actual field on the pool shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAccess {
    /// The field exists and the new value was applied
    Applied,
    /// The pool shape has no such field; a normal skip, not an error
    Absent,
}

/// Capability interface over one pool type's configuration fields.
///
/// Every method has a skip-by-default implementation, so adapters only
/// implement the fields their pool shape actually owns. Errors mean the field
/// was found but could not be accessed; they are contained per field by the
/// patcher.
pub trait PoolAdapter: Send + Sync {
    /// Current driver class name, or `None` if the shape has no such field.
    fn driver_class(&self, _pool: &dyn Any) -> Result<Option<String>> {
        Ok(None)
    }

    fn set_driver_class(&self, _pool: &mut dyn Any, _value: &str) -> Result<FieldAccess> {
        Ok(FieldAccess::Absent)
    }

    /// Current connection URL, or `None` if the shape has no such field.
    fn url(&self, _pool: &dyn Any) -> Result<Option<String>> {
        Ok(None)
    }

    fn set_url(&self, _pool: &mut dyn Any, _value: &str) -> Result<FieldAccess> {
        Ok(FieldAccess::Absent)
    }

    /// Set one entry in the pool's auxiliary property map.
    fn set_property(&self, _pool: &mut dyn Any, _key: &str, _value: &str) -> Result<FieldAccess> {
        Ok(FieldAccess::Absent)
    }
}

/// Adapter for unrecognized pool types: every field is absent.
pub struct NoopAdapter;

impl PoolAdapter for NoopAdapter {}

/// Registry mapping pool types to their adapters.
pub struct AdapterRegistry {
    adapters: RwLock<HashMap<TypeId, Arc<dyn PoolAdapter>>>,
    fallback: Arc<dyn PoolAdapter>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: RwLock::new(HashMap::new()),
            fallback: Arc::new(NoopAdapter),
        }
    }

    /// Register an adapter for pool type `P`, replacing any previous one.
    pub fn register<P: Any>(&self, adapter: impl PoolAdapter + 'static) {
        self.adapters
            .write()
            .insert(TypeId::of::<P>(), Arc::new(adapter));
    }

    /// Adapter for the handle's pool type, or the no-op fallback.
    pub fn resolve(&self, handle: &PoolHandle) -> Arc<dyn PoolAdapter> {
        self.adapters
            .read()
            .get(&handle.pool_type())
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    pub fn is_registered<P: Any>(&self) -> bool {
        self.adapters.read().contains_key(&TypeId::of::<P>())
    }

    pub fn len(&self) -> usize {
        self.adapters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.read().is_empty()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Downcast a pool object to the type an adapter expects.
pub fn downcast<P: Any>(pool: &dyn Any) -> Result<&P> {
    pool.downcast_ref::<P>()
        .ok_or_else(|| EncDbError::TypeMismatch(std::any::type_name::<P>().to_string()))
}

/// Mutable variant of [`downcast`].
pub fn downcast_mut<P: Any>(pool: &mut dyn Any) -> Result<&mut P> {
    pool.downcast_mut::<P>()
        .ok_or_else(|| EncDbError::TypeMismatch(std::any::type_name::<P>().to_string()))
}
