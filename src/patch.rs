//! Per-pool field patching.
//!
//! One [`PoolPatcher::patch`] call rewrites a pool's driver class, connection
//! URL and auxiliary properties through its registered adapter. The three
//! sub-operations are independent: a missing field is a normal skip, and an
//! adapter error or panic marks only that field as failed. Nothing escapes
//! the patcher's boundary.

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::Serialize;

use crate::config::{EncDbConfig, CONFIG_FILE_PROPERTY};
use crate::pool::{AdapterRegistry, FieldAccess, PoolAdapter, PoolHandle};
use crate::url::to_encdb_url;

/// Result of one field patch attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FieldOutcome {
    /// Field rewritten; `old` is the previous value when the adapter exposes one
    Patched { old: Option<String>, new: String },
    /// Field intentionally left alone
    Skipped(SkipReason),
    /// Adapter reported an error or panicked; the field was not patched
    Failed(String),
}

impl FieldOutcome {
    pub fn is_patched(&self) -> bool {
        matches!(self, FieldOutcome::Patched { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FieldOutcome::Failed(_))
    }
}

/// Why a field patch was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// The pool shape has no such field
    FieldAbsent,
    /// The field exists but holds nothing worth rewriting
    EmptyValue,
}

/// Per-pool patch report: one outcome per targeted field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolPatchReport {
    pub pool: String,
    pub driver: FieldOutcome,
    pub url: FieldOutcome,
    pub properties: FieldOutcome,
}

impl PoolPatchReport {
    pub fn outcomes(&self) -> [&FieldOutcome; 3] {
        [&self.driver, &self.url, &self.properties]
    }

    pub fn patched(&self) -> usize {
        self.outcomes().iter().filter(|o| o.is_patched()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes()
            .iter()
            .filter(|o| matches!(o, FieldOutcome::Skipped(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes().iter().filter(|o| o.is_failed()).count()
    }
}

/// Rewrites one pool's configuration fields through the adapter registry.
pub struct PoolPatcher<'a> {
    config: &'a EncDbConfig,
    registry: &'a AdapterRegistry,
}

impl<'a> PoolPatcher<'a> {
    pub fn new(config: &'a EncDbConfig, registry: &'a AdapterRegistry) -> Self {
        Self { config, registry }
    }

    /// Attempt all three field patches on one pool.
    ///
    /// Never returns an error and never panics; every failure is recorded in
    /// the report and logged as a warning.
    pub fn patch(&self, handle: &PoolHandle) -> PoolPatchReport {
        let adapter = self.registry.resolve(handle);

        let driver = self.patch_driver(handle, adapter.as_ref());
        self.log_outcome(handle.name(), "driverClassName", &driver);

        let url = self.patch_url(handle, adapter.as_ref());
        self.log_outcome(handle.name(), "jdbcUrl", &url);

        let properties = self.patch_properties(handle, adapter.as_ref());
        self.log_outcome(handle.name(), CONFIG_FILE_PROPERTY, &properties);

        PoolPatchReport {
            pool: handle.name().to_string(),
            driver,
            url,
            properties,
        }
    }

    fn patch_driver(&self, handle: &PoolHandle, adapter: &dyn PoolAdapter) -> FieldOutcome {
        let new = self.config.resolved_driver_class().to_string();
        contained(handle.name(), "driverClassName", || {
            let old = handle.with(|pool| adapter.driver_class(pool))?;
            match handle.with_mut(|pool| adapter.set_driver_class(pool, &new))? {
                FieldAccess::Applied => Ok(FieldOutcome::Patched { old, new: new.clone() }),
                FieldAccess::Absent => Ok(FieldOutcome::Skipped(SkipReason::FieldAbsent)),
            }
        })
    }

    fn patch_url(&self, handle: &PoolHandle, adapter: &dyn PoolAdapter) -> FieldOutcome {
        contained(handle.name(), "jdbcUrl", || {
            let old = match handle.with(|pool| adapter.url(pool))? {
                Some(url) => url,
                None => return Ok(FieldOutcome::Skipped(SkipReason::FieldAbsent)),
            };
            if old.trim().is_empty() {
                return Ok(FieldOutcome::Skipped(SkipReason::EmptyValue));
            }
            let new = to_encdb_url(&old).into_owned();
            match handle.with_mut(|pool| adapter.set_url(pool, &new))? {
                FieldAccess::Applied => Ok(FieldOutcome::Patched { old: Some(old), new }),
                FieldAccess::Absent => Ok(FieldOutcome::Skipped(SkipReason::FieldAbsent)),
            }
        })
    }

    fn patch_properties(&self, handle: &PoolHandle, adapter: &dyn PoolAdapter) -> FieldOutcome {
        let value = self.config.resolved_config_path().to_string_lossy().into_owned();
        contained(handle.name(), CONFIG_FILE_PROPERTY, || {
            match handle.with_mut(|pool| adapter.set_property(pool, CONFIG_FILE_PROPERTY, &value))? {
                FieldAccess::Applied => Ok(FieldOutcome::Patched { old: None, new: value.clone() }),
                FieldAccess::Absent => Ok(FieldOutcome::Skipped(SkipReason::FieldAbsent)),
            }
        })
    }

    fn log_outcome(&self, pool: &str, field: &str, outcome: &FieldOutcome) {
        match outcome {
            FieldOutcome::Patched { old, new } => {
                let old = old.as_deref().unwrap_or("<unset>");
                if self.config.show_log {
                    tracing::info!(pool, field, old, new = %new, "pool field patched");
                } else {
                    tracing::debug!(pool, field, old, new = %new, "pool field patched");
                }
            }
            FieldOutcome::Skipped(reason) => {
                tracing::debug!(pool, field, ?reason, "pool field skipped");
            }
            // Warned with full context at the failure site in `contained`.
            FieldOutcome::Failed(_) => {}
        }
    }
}

/// Run one field patch, converting adapter errors and panics into
/// [`FieldOutcome::Failed`].
fn contained(
    pool: &str,
    field: &str,
    f: impl FnOnce() -> crate::error::Result<FieldOutcome>,
) -> FieldOutcome {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) => {
            tracing::warn!(pool, field, error = %err, "failed to patch pool field");
            FieldOutcome::Failed(err.to_string())
        }
        Err(_) => {
            tracing::warn!(pool, field, "adapter panicked while patching pool field");
            FieldOutcome::Failed("adapter panicked".to_string())
        }
    }
}
