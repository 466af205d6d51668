//! Periodic reload of the lexical ranker from the sparse store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument};

use chatrag_core::error::Result;
use chatrag_core::filter::SearchFilter;
use chatrag_core::traits::SparseStore;
use chatrag_text::{LexicalRanker, Normalizer};

pub struct IndexMaintainer<S: SparseStore> {
    sparse: Arc<S>,
    lexical: Arc<LexicalRanker>,
    normalizer: Normalizer,
    scan_limit: usize,
    interval: Duration,
}

impl<S: SparseStore + 'static> IndexMaintainer<S> {
    pub fn new(
        sparse: Arc<S>,
        lexical: Arc<LexicalRanker>,
        normalizer: Normalizer,
        scan_limit: usize,
        interval: Duration,
    ) -> Self {
        Self { sparse, lexical, normalizer, scan_limit, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Full unfiltered scan followed by a corpus reload. Documents extended
    /// while the scan runs are kept.
    #[instrument(skip_all)]
    pub async fn run_once(&self) -> Result<usize> {
        // taken before the scan so ingests racing with it are not lost
        let ticket = self.lexical.begin_reload();
        let entries = self.sparse.scan(&SearchFilter::default(), self.scan_limit).await?;
        let docs = entries
            .into_iter()
            .map(|e| (e.payload.domain_id, self.normalizer.normalize(&e.payload.text)));
        Ok(ticket.finish(docs))
    }

    /// Runs on a fixed interval until the handle is shut down. The first
    /// tick fires immediately; a failed tick is logged and the next one
    /// retries.
    pub fn spawn(self) -> MaintainerHandle {
        let (tx, mut rx) = watch::channel(false);
        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        debug!("lexical reload tick");
                        match self.run_once().await {
                            Ok(documents) => info!(documents, "lexical corpus reloaded"),
                            Err(err) => error!(error = %err, "lexical reload failed"),
                        }
                    }
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("index maintainer stopped");
        });
        MaintainerHandle { shutdown: tx, join }
    }
}

pub struct MaintainerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl MaintainerHandle {
    /// Signals the loop and waits for it to finish its current tick.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.join.await {
            error!(error = %err, "index maintainer task panicked");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
