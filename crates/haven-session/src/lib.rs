//! # haven-session
//!
//! Session lifecycle ownership: a key-value store of [`haven_types::Session`]
//! records behind a pluggable backend, per-session write exclusion, and a
//! cancellable background sweep that closes expired sessions and evicts
//! closed ones past retention.
//!
//! Message processing for a single session must be serialized — the store
//! hands out one lock per session id (`SessionStore::session_lock`) and the
//! sweeper takes the same lock before closing, so a sweep never races an
//! in-flight message.

mod backend;
mod error;
mod store;
mod sweeper;

pub use backend::{MemoryBackend, SessionBackend};
pub use error::{Result, SessionError};
pub use store::{SessionStore, SessionValidity, StoreConfig, StoreStats};
pub use sweeper::{sweep_once, ExpirySweeper, SweepConfig, SweepReport};
