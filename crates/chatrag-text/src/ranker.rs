//! Lexical ranker with read-copy-update snapshot publication.
//!
//! A [`Corpus`] is an immutable `(domain_id, terms)` sequence plus its BM25
//! statistics. [`LexicalRanker`] owns the current corpus behind an `Arc`;
//! `extend` and `reload` build a complete new corpus off to the side and swap
//! the pointer, so a concurrent reader always scores against one consistent
//! snapshot, never a half-rebuilt one.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::debug;

use chatrag_core::types::{DomainId, SearchHit, SourceKind};

use crate::scoring::{Bm25Params, Bm25Stats};

#[derive(Debug)]
pub struct Corpus {
    ids: Vec<DomainId>,
    terms: Vec<Vec<String>>,
    positions: HashMap<DomainId, usize>,
    stats: Bm25Stats,
}

impl Corpus {
    pub fn empty(params: Bm25Params) -> Self {
        Self::build(Vec::new(), params)
    }

    /// Later duplicates of an id replace the earlier document in place.
    pub fn build<I>(docs: I, params: Bm25Params) -> Self
    where
        I: IntoIterator<Item = (DomainId, Vec<String>)>,
    {
        let mut ids = Vec::new();
        let mut terms = Vec::new();
        let mut positions = HashMap::new();
        for (id, t) in docs {
            match positions.get(&id) {
                Some(&pos) => terms[pos] = t,
                None => {
                    positions.insert(id, ids.len());
                    ids.push(id);
                    terms.push(t);
                }
            }
        }
        let stats = Bm25Stats::build(&terms, params);
        Self { ids, terms, positions, stats }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: DomainId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn ids(&self) -> &[DomainId] {
        &self.ids
    }

    pub fn terms_of(&self, id: DomainId) -> Option<&[String]> {
        self.positions.get(&id).map(|&pos| self.terms[pos].as_slice())
    }

    pub fn stats(&self) -> &Bm25Stats {
        &self.stats
    }

    pub fn documents(&self) -> impl Iterator<Item = (DomainId, &[String])> + '_ {
        self.ids.iter().copied().zip(self.terms.iter().map(Vec::as_slice))
    }

    /// Per-document score in corpus order.
    pub fn score(&self, query: &[String]) -> Vec<(DomainId, f32)> {
        self.ids.iter().copied().zip(self.stats.score(query)).collect()
    }

    /// Best `limit` documents with a positive score; ties go to the lower id.
    pub fn rank(&self, query: &[String], limit: usize) -> Vec<SearchHit> {
        let mut scored: Vec<(DomainId, f32)> =
            self.score(query).into_iter().filter(|(_, s)| *s > 0.0).collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(limit);
        scored.into_iter().map(|(id, s)| SearchHit::new(id, s, SourceKind::Lexical)).collect()
    }

    /// A new corpus over the listed ids that are present here, in the order
    /// given. Statistics are recomputed over the subset only.
    pub fn subset<I>(&self, ids: I) -> Corpus
    where
        I: IntoIterator<Item = DomainId>,
    {
        let mut seen = HashSet::new();
        let docs: Vec<(DomainId, Vec<String>)> = ids
            .into_iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| self.terms_of(id).map(|t| (id, t.to_vec())))
            .collect();
        Corpus::build(docs, self.stats.params())
    }

    fn with_documents(&self, docs: Vec<(DomainId, Vec<String>)>) -> Corpus {
        let existing = self.ids.iter().copied().zip(self.terms.iter().cloned());
        Corpus::build(existing.chain(docs), self.stats.params())
    }
}

type Documents = Vec<(DomainId, Vec<String>)>;

/// Writer-side bookkeeping, guarded by the writer mutex.
#[derive(Default)]
struct WriteLog {
    epoch: u64,
    open_reloads: usize,
    /// Extends published while at least one reload is in flight.
    journal: Vec<(u64, Documents)>,
}

pub struct LexicalRanker {
    params: Bm25Params,
    current: RwLock<Arc<Corpus>>,
    writer: Mutex<WriteLog>,
}

impl LexicalRanker {
    pub fn new(params: Bm25Params) -> Self {
        Self {
            params,
            current: RwLock::new(Arc::new(Corpus::empty(params))),
            writer: Mutex::new(WriteLog::default()),
        }
    }

    pub fn params(&self) -> Bm25Params {
        self.params
    }

    /// The currently published corpus. Holding it pins that version.
    pub fn snapshot(&self) -> Arc<Corpus> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn score(&self, query: &[String]) -> Vec<(DomainId, f32)> {
        self.snapshot().score(query)
    }

    /// Append one document (or replace it if the id is known) and rebuild
    /// statistics over the full corpus.
    pub fn extend(&self, id: DomainId, terms: Vec<String>) {
        self.extend_many(vec![(id, terms)]);
    }

    /// Batch form of [`extend`](Self::extend): one rebuild for all documents.
    pub fn extend_many(&self, docs: Documents) {
        if docs.is_empty() {
            return;
        }
        let mut log = self.lock_writer();
        log.epoch += 1;
        if log.open_reloads > 0 {
            let epoch = log.epoch;
            log.journal.push((epoch, docs.clone()));
        }
        let added = docs.len();
        let next = self.snapshot().with_documents(docs);
        debug!(added, total = next.len(), "lexical corpus extended");
        self.publish(next);
    }

    /// Replace the entire corpus; returns the new document count.
    pub fn reload<I>(&self, docs: I) -> usize
    where
        I: IntoIterator<Item = (DomainId, Vec<String>)>,
    {
        self.begin_reload().finish(docs)
    }

    /// Marks the point a reload's source data is read from. Extends that
    /// land after this call are re-applied on top of the reloaded documents
    /// by [`ReloadTicket::finish`].
    pub fn begin_reload(&self) -> ReloadTicket<'_> {
        let mut log = self.lock_writer();
        log.open_reloads += 1;
        ReloadTicket { ranker: self, epoch: log.epoch, finished: false }
    }

    fn close_reload(&self, log: &mut WriteLog) {
        log.open_reloads = log.open_reloads.saturating_sub(1);
        if log.open_reloads == 0 {
            log.journal.clear();
        }
    }

    fn lock_writer(&self) -> MutexGuard<'_, WriteLog> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, corpus: Corpus) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(corpus);
    }
}

/// An in-flight reload started by [`LexicalRanker::begin_reload`]. Dropping
/// it without [`finish`](Self::finish) abandons the reload.
pub struct ReloadTicket<'a> {
    ranker: &'a LexicalRanker,
    epoch: u64,
    finished: bool,
}

impl ReloadTicket<'_> {
    /// Publishes `docs` plus every extend made since the ticket was taken.
    /// Returns the new document count.
    pub fn finish<I>(mut self, docs: I) -> usize
    where
        I: IntoIterator<Item = (DomainId, Vec<String>)>,
    {
        let ranker = self.ranker;
        let mut log = ranker.lock_writer();
        let since = self.epoch;
        let replayed: Documents = log
            .journal
            .iter()
            .filter(|(epoch, _)| *epoch > since)
            .flat_map(|(_, docs)| docs.iter().cloned())
            .collect();
        let replayed_count = replayed.len();
        let next = Corpus::build(docs.into_iter().chain(replayed), ranker.params);
        let len = next.len();
        ranker.publish(next);
        ranker.close_reload(&mut log);
        self.finished = true;
        debug!(documents = len, replayed = replayed_count, "lexical corpus reloaded");
        len
    }
}

impl Drop for ReloadTicket<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let mut log = self.ranker.lock_writer();
            self.ranker.close_reload(&mut log);
        }
    }
}

impl Default for LexicalRanker {
    fn default() -> Self {
        Self::new(Bm25Params::default())
    }
}
