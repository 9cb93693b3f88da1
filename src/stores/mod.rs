//! Client state synchronization: one store per domain.
//!
//! ## Overview
//!
//! Each store owns a cached slice of server state and mediates every
//! mutation of it:
//!
//! ```text
//! ┌──────────┐  call   ┌──────────────────────────────────────────┐  HTTP  ┌─────────┐
//! │   UI /   │ ──────> │  AuthStore  ProjectsStore  BugsStore      │ ─────> │  REST   │
//! │   CLI    │ <────── │  MembersStore                             │ <───── │  API    │
//! └──────────┘ snapshot│    └─ StoreCell<State> (Arc<Mutex>, bus)  │        └─────────┘
//!                      └──────────────────────────────────────────┘
//! ```
//!
//! Reads go through `snapshot()`. Observers `subscribe()` and receive one
//! full state snapshot per store update, so a multi-field edit (approving an
//! access request removes the request *and* adds the member) is never seen
//! half-applied.
//!
//! Mutations never return `Err`: on failure they return `false` / `None`
//! and leave the user-facing message in the state's `error` slot until the
//! caller clears it.

pub mod auth;
pub mod bugs;
pub mod members;
pub mod optimistic;
pub mod projects;

pub use auth::{AuthState, AuthStore};
pub use bugs::{BugsState, BugsStore};
pub use members::{AddMemberOutcome, MembersState, MembersStore};
pub use projects::{ProjectsState, ProjectsStore};

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

/// Shared, observable state container. Cloning shares the same state.
#[derive(Debug)]
pub struct StoreCell<S> {
    state: Arc<Mutex<S>>,
    tx: broadcast::Sender<S>,
}

impl<S> Clone for StoreCell<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            tx: self.tx.clone(),
        }
    }
}

impl<S: Clone> StoreCell<S> {
    pub fn new(initial: S) -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(initial)),
            tx,
        }
    }

    pub fn snapshot(&self) -> S {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Read without cloning the whole state.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Apply `f` as one store update and publish the resulting snapshot.
    ///
    /// The snapshot is sent before the lock is released so subscribers see
    /// updates in the order they were applied. `send` never blocks.
    pub fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut guard);
        // No subscribers is fine.
        let _ = self.tx.send(guard.clone());
        result
    }

    pub fn subscribe(&self) -> broadcast::Receiver<S> {
        self.tx.subscribe()
    }
}

/// Loading and error bookkeeping shared by every store state.
pub trait StatusSlots {
    fn set_loading(&mut self, loading: bool);
    fn set_error(&mut self, error: Option<String>);
}

macro_rules! impl_status_slots {
    ($($state:ty),* $(,)?) => {
        $(
            impl $crate::stores::StatusSlots for $state {
                fn set_loading(&mut self, loading: bool) {
                    self.is_loading = loading;
                }
                fn set_error(&mut self, error: Option<String>) {
                    self.error = error;
                }
            }
        )*
    };
}

impl_status_slots!(AuthState, ProjectsState, BugsState, MembersState);

impl<S: Clone + StatusSlots> StoreCell<S> {
    /// Mark the start of a network call: loading on, previous error kept
    /// until the caller clears it.
    pub fn begin(&self) {
        self.update(|s| s.set_loading(true));
    }

    /// Record a failed call as one update.
    pub fn fail(&self, message: String) {
        self.update(|s| {
            s.set_loading(false);
            s.set_error(Some(message));
        });
    }

    pub fn clear_error(&self) {
        self.update(|s| s.set_error(None));
    }
}
