//! Okapi BM25 over pre-normalized term sequences, backed by the `bm25`
//! crate's embedder and scorer.
//!
//! Documents are embedded as sparse term-weight vectors with the configured
//! `k1`/`b` and the corpus average length; the scorer owns document
//! frequencies and applies the non-negative idf
//! `ln(1 + (N - n + 0.5) / (n + 0.5))`, so a term present in every document
//! still contributes a positive score.

use std::fmt;

use bm25::{Embedder, EmbedderBuilder, Scorer, Tokenizer};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

/// Tokenizer for text the [`Normalizer`](crate::Normalizer) already
/// processed: terms joined by single spaces are split back apart.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermTokenizer;

impl TermTokenizer {
    pub fn join(terms: &[String]) -> String {
        terms.join(" ")
    }
}

impl Tokenizer for TermTokenizer {
    fn tokenize(&self, input_text: &str) -> Vec<String> {
        input_text.split(' ').filter(|t| !t.is_empty()).map(str::to_string).collect()
    }
}

/// Corpus statistics, rebuilt wholesale from a document set. Documents are
/// keyed by their position in the set.
pub struct Bm25Stats {
    params: Bm25Params,
    avg_doc_len: f32,
    len: usize,
    embedder: Embedder<u32, TermTokenizer>,
    scorer: Scorer<usize, u32>,
}

impl fmt::Debug for Bm25Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bm25Stats")
            .field("params", &self.params)
            .field("avg_doc_len", &self.avg_doc_len)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl Bm25Stats {
    pub fn build<D: AsRef<[String]>>(docs: &[D], params: Bm25Params) -> Self {
        let total: usize = docs.iter().map(|d| d.as_ref().len()).sum();
        let avg_doc_len = if total == 0 { 1.0 } else { total as f32 / docs.len() as f32 };
        let embedder = EmbedderBuilder::<u32, TermTokenizer>::with_avgdl(avg_doc_len)
            .k1(params.k1)
            .b(params.b)
            .build();
        let mut scorer = Scorer::new();
        for (pos, doc) in docs.iter().enumerate() {
            scorer.upsert(&pos, embedder.embed(&TermTokenizer::join(doc.as_ref())));
        }
        Self { params, avg_doc_len, len: docs.len(), embedder, scorer }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn params(&self) -> Bm25Params {
        self.params
    }

    pub fn avg_doc_len(&self) -> f32 {
        self.avg_doc_len
    }

    /// One score per document, in corpus order. A repeated query term
    /// counts once.
    pub fn score(&self, query: &[String]) -> Vec<f32> {
        if query.is_empty() {
            return vec![0.0; self.len];
        }
        let query = self.embedder.embed(&TermTokenizer::join(query));
        (0..self.len).map(|pos| self.scorer.score(&pos, &query).unwrap_or(0.0)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    fn q(s: &str) -> Vec<String> {
        doc(s)
    }

    #[test]
    fn tokenizer_splits_joined_terms() {
        let terms = doc("привет мир hello");
        assert_eq!(TermTokenizer.tokenize(&TermTokenizer::join(&terms)), terms);
        assert!(TermTokenizer.tokenize("").is_empty());
    }

    #[test]
    fn empty_corpus_scores_nothing() {
        let stats = Bm25Stats::build::<Vec<String>>(&[], Bm25Params::default());
        assert!(stats.is_empty());
        assert!(stats.score(&q("anything")).is_empty());
    }

    #[test]
    fn term_in_every_document_still_scores_positive() {
        let corpus = [doc("hello world"), doc("hello there")];
        let stats = Bm25Stats::build(&corpus, Bm25Params::default());
        let scores = stats.score(&q("hello"));
        assert_eq!(scores.len(), 2);
        assert!(scores.iter().all(|&s| s > 0.0), "{scores:?}");
    }

    #[test]
    fn absent_terms_score_zero() {
        let stats = Bm25Stats::build(&[doc("hello world")], Bm25Params::default());
        assert_eq!(stats.score(&q("absent")), vec![0.0]);
        assert_eq!(stats.score(&[]), vec![0.0]);
    }

    #[test]
    fn rarer_terms_weigh_more() {
        let stats = Bm25Stats::build(
            &[doc("rust tokio"), doc("rust serde"), doc("rust axum")],
            Bm25Params::default(),
        );
        let common = stats.score(&q("rust"))[0];
        let rare = stats.score(&q("tokio"))[0];
        assert!(rare > common, "{rare} <= {common}");
    }

    #[test]
    fn higher_term_frequency_scores_higher() {
        let stats = Bm25Stats::build(
            &[
                doc("rust programming"),
                doc("rust rust rust programming"),
                doc("python programming"),
            ],
            Bm25Params::default(),
        );
        let s = stats.score(&q("rust"));
        assert!(s[1] > s[0]);
        assert_eq!(s[2], 0.0);
    }

    #[test]
    fn length_normalization_follows_b() {
        let docs = [doc("needle"), doc("needle hay hay hay hay hay hay hay")];
        let s = Bm25Stats::build(&docs, Bm25Params::default()).score(&q("needle"));
        assert!(s[0] > s[1]);

        let flat = Bm25Stats::build(&docs, Bm25Params { k1: 1.2, b: 0.0 }).score(&q("needle"));
        assert!((flat[0] - flat[1]).abs() < 1e-6);
    }

    #[test]
    fn average_length_comes_from_the_documents() {
        let stats = Bm25Stats::build(&[doc("a b"), doc("c d e f")], Bm25Params::default());
        assert!((stats.avg_doc_len() - 3.0).abs() < 1e-6);
    }
}
