//! BPM Store - In-memory storage gateway
//!
//! [`InMemoryStore`] implements every storage-backed collaborator of the
//! command core: grant storage, runtime storage, unit of work, deferred-job
//! scheduling, the operation log and a minimal process runtime. It backs the
//! engine in tests and in embedded deployments without a database.

#![deny(unsafe_code)]

pub mod memory;
pub mod runtime;

pub use memory::{InMemoryStore, MemoryState, ReceivedEvent};
