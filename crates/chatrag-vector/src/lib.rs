//! LanceDB-backed dense index and sparse store.
//!
//! Both tables share the payload columns (`key`, `domain_id`, `text`,
//! `author_id`, `chat_id`, `timestamp`); the dense table adds a
//! fixed-size `vector` column searched under cosine distance. Writes are
//! `merge_insert` upserts on `key`, so re-ingesting a record overwrites it.

pub mod dense;
pub mod filter;
pub mod schema;
pub mod sparse;
pub mod table;

pub use dense::LanceDenseIndex;
pub use sparse::LanceSparseStore;
pub use table::open_db;
