//! chatrag-hybrid
//!
//! Hybrid retrieval: dense similarity and BM25 lists merged with reciprocal
//! rank fusion, the periodic lexical reload, and grounded answer generation.

pub mod answer;
pub mod engine;
pub mod fusion;
pub mod maintainer;
pub mod mistral;
pub mod setup;

pub use answer::{build_prompt, Answer};
pub use engine::{HybridSearchEngine, SearchOptions};
pub use fusion::{fuse, fuse_lists, RRF_K};
pub use maintainer::{IndexMaintainer, MaintainerHandle};
pub use mistral::MistralClient;
pub use setup::{open_engine, LanceEngine};
