//! Storage lifecycle manager.
//!
//! [`TodoStorageFactory`] owns the process-wide choice of todo backend. It is
//! constructed once at startup and handed (cloned) to whoever needs storage;
//! clones share the same state.
//!
//! ```text
//!             initialize / switch_storage
//!     Idle ───────────────────────────────▶ Initializing(type)
//!      ▲                                        │        │
//!      │   retries exhausted (full reset)       │        │ backend constructed
//!      └────────────────────────────────────────┘        ▼
//!      ▲                                             Ready(type)
//!      └──────────────── reset / switch ─────────────────┘
//! ```
//!
//! # Single flight
//!
//! At most one initialization runs at a time. The pending initialization is a
//! [`Shared`] future registered when `initialize` is *called* (not when it is
//! first awaited), so any later caller joins it and every joined caller gets
//! the same backend instance or the same error. The factory keeps only a weak
//! reference: if every holder drops the future before it completes, the flight
//! is abandoned and the factory is `Idle` again.
//!
//! # Retries
//!
//! A failed construction is retried after a fixed backoff until the retry
//! budget is spent (`1 + retries` attempts in total). Exhaustion yields
//! [`StorageError::Initialization`] carrying the last cause, and clears all
//! partial state so no later caller can observe a half-initialized factory.
//!
//! Falling back to the other backend after an initialization failure is left
//! to the caller.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt, Shared, WeakShared};

use super::backend::TodoBackend;
use super::provider::{BackendProviderHandle, ConfiguredBackends};
use super::types::StorageType;
use crate::config::StorageConfig;
use crate::errors::{Result, StorageError};

/// A live backend as handed out by the factory.
pub type TodoStorageHandle = Arc<TodoBackend>;

type InitFuture = BoxFuture<'static, Result<TodoStorageHandle>>;

/// A pending (or immediately ready) initialization result. Cloneable; every
/// clone resolves to the same outcome.
pub type Initialization = Shared<InitFuture>;

/// Observable state of the factory.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Lifecycle {
    Idle,
    Initializing(StorageType),
    Ready(StorageType),
}

struct InFlight {
    storage_type: StorageType,
    pending: WeakShared<InitFuture>,
}

#[derive(Default)]
struct FactoryState {
    active: Option<TodoStorageHandle>,
    in_flight: Option<InFlight>,
    /// Bumped whenever a flight starts or the factory is reset; a flight only
    /// commits its result if the epoch is unchanged.
    epoch: u64,
}

impl FactoryState {
    /// The running initialization, if any holder still awaits it.
    fn pending(&mut self) -> Option<(StorageType, Initialization)> {
        let flight = self.in_flight.as_ref()?;
        match flight.pending.upgrade() {
            Some(pending) => Some((flight.storage_type, pending)),
            None => {
                log::debug!("storage initialization for {} was abandoned", flight.storage_type);
                self.in_flight = None;
                None
            }
        }
    }

    fn ready_for(&self, storage_type: StorageType) -> Option<TodoStorageHandle> {
        self.active
            .as_ref()
            .filter(|backend| backend.storage_type() == storage_type)
            .cloned()
    }
}

fn lock(state: &Mutex<FactoryState>) -> MutexGuard<'_, FactoryState> {
    // The state stays consistent across a panic in another holder; keep going.
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn resolved(result: Result<TodoStorageHandle>) -> Initialization {
    future::ready(result).boxed().shared()
}

#[derive(Clone)]
pub struct TodoStorageFactory {
    state: Arc<Mutex<FactoryState>>,
    provider: BackendProviderHandle,
    default_storage: StorageType,
    retry_count: u32,
    retry_backoff: Duration,
}

impl std::fmt::Debug for TodoStorageFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoStorageFactory")
            .field("lifecycle", &self.lifecycle())
            .field("retry_count", &self.retry_count)
            .field("retry_backoff", &self.retry_backoff)
            .finish_non_exhaustive()
    }
}

impl TodoStorageFactory {
    /// Creates a factory that builds the backends described by `config`.
    pub fn new(config: StorageConfig) -> Self {
        let provider = Arc::new(ConfiguredBackends::new(config.clone()));
        Self::with_provider(&config, provider)
    }

    /// Creates a factory with a custom backend provider. Retry and default
    /// settings are still taken from `config`.
    pub fn with_provider(config: &StorageConfig, provider: BackendProviderHandle) -> Self {
        Self {
            state: Arc::new(Mutex::new(FactoryState::default())),
            provider,
            default_storage: config.default_storage,
            retry_count: config.retry_count,
            retry_backoff: config.retry_backoff,
        }
    }

    /// Initializes the configured default backend.
    pub fn initialize_default(&self) -> Initialization {
        self.initialize(self.default_storage)
    }

    /// Initializes `storage_type` with the configured retry budget.
    pub fn initialize(&self, storage_type: StorageType) -> Initialization {
        self.initialize_with_retries(storage_type, self.retry_count)
    }

    /// Initializes `storage_type`, retrying failed constructions up to `retries` times.
    ///
    /// - If an initialization is already in flight, the returned future joins
    ///   it, whatever type it was started for.
    /// - If a backend of `storage_type` is ready, it is returned as-is.
    /// - Otherwise the current backend (if any) is dropped and a new
    ///   initialization starts.
    pub fn initialize_with_retries(&self, storage_type: StorageType, retries: u32) -> Initialization {
        let mut state = lock(&self.state);

        if let Some((pending_type, pending)) = state.pending() {
            if pending_type != storage_type {
                log::debug!("{storage_type} requested while {pending_type} is initializing; joining");
            }
            return pending;
        }
        if let Some(ready) = state.ready_for(storage_type) {
            return resolved(Ok(ready));
        }

        self.start_locked(&mut state, storage_type, retries)
    }

    /// Switches to `storage_type`.
    ///
    /// Fails with [`StorageError::ConcurrentOperation`] while any
    /// initialization is in flight; the running one is not affected.
    pub fn switch_storage(&self, storage_type: StorageType) -> Initialization {
        let mut state = lock(&self.state);

        if let Some((pending_type, _)) = state.pending() {
            log::warn!("cannot switch to {storage_type}: {pending_type} is still initializing");
            return resolved(Err(StorageError::ConcurrentOperation));
        }
        if let Some(ready) = state.ready_for(storage_type) {
            return resolved(Ok(ready));
        }

        if let Some(old) = state.active.take() {
            log::info!("switching storage from {} to {storage_type}", old.storage_type());
        }
        self.start_locked(&mut state, storage_type, self.retry_count)
    }

    /// The ready backend.
    pub fn get_storage(&self) -> Result<TodoStorageHandle> {
        lock(&self.state).active.clone().ok_or(StorageError::NotInitialized)
    }

    /// Type of the ready backend; `None` unless the factory is ready.
    pub fn current_storage_type(&self) -> Option<StorageType> {
        lock(&self.state).active.as_ref().map(|b| b.storage_type())
    }

    pub fn lifecycle(&self) -> Lifecycle {
        let mut state = lock(&self.state);
        if let Some((storage_type, _)) = state.pending() {
            return Lifecycle::Initializing(storage_type);
        }
        match &state.active {
            Some(backend) => Lifecycle::Ready(backend.storage_type()),
            None => Lifecycle::Idle,
        }
    }

    /// Drops the current backend and forgets any running initialization.
    ///
    /// A flight that finishes after the reset still resolves for its own
    /// callers but is not installed in the factory.
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        state.active = None;
        state.in_flight = None;
        state.epoch += 1;
        log::debug!("storage factory reset");
    }

    fn start_locked(&self, state: &mut FactoryState, storage_type: StorageType, retries: u32) -> Initialization {
        state.active = None;
        state.epoch += 1;

        let flight = run_initialization(
            self.state.clone(),
            self.provider.clone(),
            storage_type,
            retries,
            self.retry_backoff,
            state.epoch,
        )
        .boxed()
        .shared();

        state.in_flight = flight.downgrade().map(|pending| InFlight { storage_type, pending });
        log::info!("initializing {storage_type} storage");
        flight
    }
}

async fn run_initialization(
    state: Arc<Mutex<FactoryState>>,
    provider: BackendProviderHandle,
    storage_type: StorageType,
    retries: u32,
    backoff: Duration,
    epoch: u64,
) -> Result<TodoStorageHandle> {
    let result = connect_with_retries(provider, storage_type, retries, backoff).await;

    let mut state = lock(&state);
    if state.epoch != epoch {
        log::debug!("discarding {storage_type} initialization superseded by a reset");
        return result;
    }

    state.in_flight = None;
    match &result {
        Ok(backend) => {
            state.active = Some(backend.clone());
            log::info!("{storage_type} storage ready");
        }
        Err(e) => {
            state.active = None;
            log::error!("{storage_type} storage initialization failed: {e}");
        }
    }
    result
}

async fn connect_with_retries(
    provider: BackendProviderHandle,
    storage_type: StorageType,
    retries: u32,
    backoff: Duration,
) -> Result<TodoStorageHandle> {
    let mut attempts = 0;
    let mut remaining = retries;

    loop {
        attempts += 1;
        match provider.connect(storage_type).await {
            Ok(backend) => return Ok(Arc::new(backend)),
            Err(e) if remaining > 0 => {
                remaining -= 1;
                log::warn!(
                    "{storage_type} storage initialization failed, retrying in {backoff:?} ({remaining} retries left): {e}"
                );
                tokio::time::sleep(backoff).await;
            }
            Err(e) => {
                return Err(StorageError::Initialization {
                    attempts,
                    source: Box::new(e),
                });
            }
        }
    }
}
