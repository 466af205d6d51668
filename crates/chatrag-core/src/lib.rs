//! chatrag-core
//!
//! Domain types, the canonical key mapper, capability traits for the
//! embedding/completion providers and the two index backends, plus the
//! figment-based configuration shared by every crate in the workspace.

pub mod config;
pub mod error;
pub mod filter;
pub mod key;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use filter::SearchFilter;
pub use key::{canonical_key, CanonicalKey};
pub use types::{DomainId, Payload, Record, SearchHit, SourceKind, StoredEntry};
