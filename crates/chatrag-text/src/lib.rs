//! chatrag-text
//!
//! Lexical side of retrieval: the tantivy-based text normalizer, BM25
//! scoring through the `bm25` crate, and the snapshot-publishing lexical
//! ranker built on top of it.

pub mod normalize;
pub mod ranker;
pub mod scoring;

pub use normalize::Normalizer;
pub use ranker::{Corpus, LexicalRanker, ReloadTicket};
pub use scoring::{Bm25Params, Bm25Stats, TermTokenizer};
