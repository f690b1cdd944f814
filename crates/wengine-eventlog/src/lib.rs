//! The append-only, per-session, strictly-sequenced [`WorldEvent`] log.
//!
//! Every world event produced by a step passes through an
//! [`EventLogStore`] before it reaches observers. Sessions are logically
//! independent: sequences restart at 1 per session and nothing is ever
//! rewritten once assigned.
//!
//! Two backends are provided:
//!
//! - [`memory::MemoryEventLogStore`] -- in-process, lost on restart.
//! - [`redis::RedisEventLogStore`] -- Redis-compatible, survives restarts.
//!
//! # Usage
//!
//! ```
//! # #[tokio::main]
//! # async fn main() {
//! use wengine_eventlog::{EventLogStore, MemoryEventLogStore};
//! use wengine_types::{SessionId, WorldEvent};
//!
//! let store = MemoryEventLogStore::new();
//! let session = SessionId::new();
//! let event = WorldEvent::new("turn_start", "scheduler");
//! let stored = store.append(session, event).await.expect("append");
//! assert_eq!(stored.sequence, 1);
//! # }
//! ```

pub mod error;
pub mod memory;
pub mod redis;
pub mod store;

pub use error::EventLogError;
pub use memory::MemoryEventLogStore;
pub use redis::RedisEventLogStore;
pub use store::EventLogStore;
