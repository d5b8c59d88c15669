//! One-shot bootstrap orchestration.
//!
//! The host calls [`Bootstrap::run`] exactly once from its own
//! post-initialization hook, handing over a [`PoolProvider`] that enumerates
//! the pools constructed so far. Provisioning always completes (or fails and
//! is recorded) before the first pool is touched, and no failure anywhere
//! aborts the run: the host process always starts.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::config::EncDbConfig;
use crate::patch::{PoolPatcher, PoolPatchReport};
use crate::pool::{AdapterRegistry, PoolHandle};
use crate::secret::{self, SecretOutcome};

/// Point-in-time enumeration of the host's constructed pools.
pub trait PoolProvider {
    fn pools(&self) -> Vec<PoolHandle>;
}

/// Adapts a closure into a [`PoolProvider`].
pub struct FnProvider<F>(pub F);

impl<F> PoolProvider for FnProvider<F>
where
    F: Fn() -> Vec<PoolHandle>,
{
    fn pools(&self) -> Vec<PoolHandle> {
        (self.0)()
    }
}

impl PoolProvider for Vec<PoolHandle> {
    fn pools(&self) -> Vec<PoolHandle> {
        self.clone()
    }
}

impl PoolProvider for [PoolHandle] {
    fn pools(&self) -> Vec<PoolHandle> {
        self.to_vec()
    }
}

/// Orchestrator lifecycle; terminal state is `Done` on every path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    NotStarted,
    Provisioning,
    Patching,
    Done,
}

/// How secret provisioning ended up in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SecretStatus {
    /// Subsystem disabled; nothing was provisioned or patched
    Disabled,
    /// Existing artifact kept (idempotent run)
    Kept { path: PathBuf },
    /// Artifact freshly written
    Written { path: PathBuf },
    /// Provisioning failed; pool patching proceeded regardless
    Failed(String),
}

impl From<SecretOutcome> for SecretStatus {
    fn from(outcome: SecretOutcome) -> Self {
        match outcome {
            SecretOutcome::Disabled => SecretStatus::Disabled,
            SecretOutcome::Kept { path } => SecretStatus::Kept { path },
            SecretOutcome::Written { path } => SecretStatus::Written { path },
        }
    }
}

/// Summary of one bootstrap run
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapReport {
    pub secret: SecretStatus,
    pub pools: Vec<PoolPatchReport>,
    pub fields_patched: usize,
    pub fields_skipped: usize,
    pub fields_failed: usize,
    pub completed_at: DateTime<Utc>,
}

impl BootstrapReport {
    fn summarize(secret: SecretStatus, pools: Vec<PoolPatchReport>) -> Self {
        let fields_patched = pools.iter().map(PoolPatchReport::patched).sum();
        let fields_skipped = pools.iter().map(PoolPatchReport::skipped).sum();
        let fields_failed = pools.iter().map(PoolPatchReport::failed).sum();
        Self {
            secret,
            pools,
            fields_patched,
            fields_skipped,
            fields_failed,
            completed_at: Utc::now(),
        }
    }
}

/// One-shot bootstrap: provision the key artifact, then patch every pool.
pub struct Bootstrap {
    config: EncDbConfig,
    registry: AdapterRegistry,
    state: AtomicU8,
    report: OnceCell<BootstrapReport>,
}

impl Bootstrap {
    pub fn new(config: EncDbConfig) -> Self {
        Self::with_registry(config, AdapterRegistry::new())
    }

    pub fn with_registry(config: EncDbConfig, registry: AdapterRegistry) -> Self {
        Self {
            config,
            registry,
            state: AtomicU8::new(BootstrapState::NotStarted as u8),
            report: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &EncDbConfig {
        &self.config
    }

    /// Registry to populate with the host's pool adapters before running.
    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn state(&self) -> BootstrapState {
        match self.state.load(Ordering::Acquire) {
            0 => BootstrapState::NotStarted,
            1 => BootstrapState::Provisioning,
            2 => BootstrapState::Patching,
            _ => BootstrapState::Done,
        }
    }

    /// The report of the completed run, if any.
    pub fn report(&self) -> Option<&BootstrapReport> {
        self.report.get()
    }

    /// Provision the secret, then patch every pool the provider enumerates.
    ///
    /// Runs at most once per [`Bootstrap`] value: a repeated trigger returns
    /// the first report without re-provisioning or re-patching anything.
    pub fn run<P>(&self, provider: &P) -> &BootstrapReport
    where
        P: PoolProvider + ?Sized,
    {
        let mut ran = false;
        let report = self.report.get_or_init(|| {
            ran = true;
            self.run_once(provider)
        });
        if !ran {
            tracing::warn!("bootstrap already ran, returning the existing report");
        }
        report
    }

    fn run_once<P>(&self, provider: &P) -> BootstrapReport
    where
        P: PoolProvider + ?Sized,
    {
        if !self.config.enabled {
            tracing::debug!("encdb bootstrap disabled, skipping");
            self.enter(BootstrapState::Done);
            return BootstrapReport::summarize(SecretStatus::Disabled, Vec::new());
        }

        self.enter(BootstrapState::Provisioning);
        let secret = match secret::provision(&self.config) {
            Ok(outcome) => SecretStatus::from(outcome),
            Err(err) => {
                tracing::error!(error = %err, "failed to provision key artifact, continuing with pool patching");
                SecretStatus::Failed(err.to_string())
            }
        };

        self.enter(BootstrapState::Patching);
        let patcher = PoolPatcher::new(&self.config, &self.registry);
        let pools: Vec<PoolPatchReport> = provider
            .pools()
            .iter()
            .map(|handle| {
                let report = patcher.patch(handle);
                tracing::info!(
                    pool = handle.name(),
                    patched = report.patched(),
                    skipped = report.skipped(),
                    failed = report.failed(),
                    "pool visited"
                );
                report
            })
            .collect();

        self.enter(BootstrapState::Done);
        let report = BootstrapReport::summarize(secret, pools);
        tracing::info!(
            pools = report.pools.len(),
            fields_patched = report.fields_patched,
            fields_failed = report.fields_failed,
            "encdb bootstrap complete"
        );
        report
    }

    fn enter(&self, state: BootstrapState) {
        self.state.store(state as u8, Ordering::Release);
    }
}
