//! Keeps a page's local video playback and a remote cast receiver mutually
//! exclusive.
//!
//! The casting SDK is consumed through the traits in [`capabilities`]; the
//! [`cast_coordinator::CastCoordinator`] reacts to its connection and remote
//! player events, drives the local media element, and projects the connection
//! state onto the cast button.

pub mod capabilities;
pub mod cast_coordinator;
pub mod config;
pub mod config_persistence;
pub mod error;
pub mod media_descriptor;
pub mod protocol;
pub mod simulated;

use std::sync::{Mutex, MutexGuard};

pub use cast_coordinator::CastCoordinator;
pub use error::CastError;

pub(crate) fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
