//! Bounded fan-out of the tagging worker over a key listing

use super::{TagOutcome, TaggingWorker};
use crate::error::{Result, TaggerError};
use crate::logging::LogContext;
use crate::manifest::ClassificationTable;
use crate::resolver::resolve;
use chrono::{DateTime, Utc};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{info, warn, Instrument};

/// Totals for one batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub objects_found: usize,
    /// Objects whose database and table are both in the manifest
    pub matched: usize,
    /// Objects that received a tag write
    pub tagged: usize,
    /// Objects skipped before any write
    pub skipped: usize,
    /// Objects whose tag write failed
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchSummary {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    fn log(&self) {
        if self.matched == 0 {
            warn!(
                number_of_objects = self.objects_found,
                objects_tagged_count = self.matched,
                failed = self.failed,
                skipped = self.skipped,
                "Did not tag any objects"
            );
        } else {
            info!(
                number_of_objects = self.objects_found,
                objects_tagged_count = self.matched,
                written = self.tagged,
                failed = self.failed,
                skipped = self.skipped,
                duration_ms = self.duration_ms(),
                "Tagged"
            );
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    matched: usize,
    tagged: usize,
    skipped: usize,
    failed: usize,
}

impl Tally {
    fn record(&mut self, outcome: TagOutcome) {
        self.matched += outcome.matched_count();
        match outcome {
            TagOutcome::Tagged { .. } => self.tagged += 1,
            TagOutcome::Skipped => self.skipped += 1,
            TagOutcome::Failed => self.failed += 1,
        }
    }
}

/// Runs resolve + tag for every key on a fixed number of concurrent tasks
pub struct BatchDispatcher {
    table: Arc<ClassificationTable>,
    worker: Arc<TaggingWorker>,
    pool_size: usize,
}

impl BatchDispatcher {
    /// Create a dispatcher sized to the machine's available parallelism
    pub fn new(table: Arc<ClassificationTable>, worker: Arc<TaggingWorker>) -> Self {
        let pool_size = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(4);

        Self {
            table,
            worker,
            pool_size,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Tag every key and return the run totals
    ///
    /// Per-object misses and write failures are counted, not raised. A task
    /// that dies (panic or cancellation) fails the whole batch; tasks still in
    /// flight are aborted and tags already written stay in place.
    pub async fn run(&self, keys: Vec<String>, ctx: &LogContext) -> Result<BatchSummary> {
        let span = ctx.span().clone();
        let started_at = Utc::now();
        let objects_found = keys.len();

        span.in_scope(|| {
            info!(
                number_of_objects = objects_found,
                bucket = %self.worker.bucket(),
                pool_size = self.pool_size,
                "Found objects to tag"
            )
        });

        let permits = Arc::new(Semaphore::new(self.pool_size));
        let mut tasks: JoinSet<TagOutcome> = JoinSet::new();
        let mut tally = Tally::default();

        for key in keys {
            // Waiting here keeps at most `pool_size` objects in flight
            let permit = permits
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| TaggerError::Worker(format!("worker pool closed: {}", e)))?;

            let table = Arc::clone(&self.table);
            let worker = Arc::clone(&self.worker);
            tasks.spawn(
                async move {
                    let _permit = permit;
                    let resolution = resolve(&key, &table);
                    worker.apply(&key, &resolution).await
                }
                .instrument(span.clone()),
            );

            while let Some(joined) = tasks.try_join_next() {
                tally.record(task_outcome(joined)?);
            }
        }

        while let Some(joined) = tasks.join_next().await {
            tally.record(task_outcome(joined)?);
        }

        let summary = BatchSummary {
            objects_found,
            matched: tally.matched,
            tagged: tally.tagged,
            skipped: tally.skipped,
            failed: tally.failed,
            started_at,
            finished_at: Utc::now(),
        };
        span.in_scope(|| summary.log());

        Ok(summary)
    }
}

fn task_outcome(joined: std::result::Result<TagOutcome, JoinError>) -> Result<TagOutcome> {
    joined.map_err(|e| {
        if e.is_panic() {
            TaggerError::Worker(format!("tagging task panicked: {}", e))
        } else {
            TaggerError::Worker(format!("tagging task cancelled: {}", e))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ClassificationEntry;
    use crate::storage::MemoryStore;

    const BUCKET: &str = "buckettotag";

    fn dispatcher_for(keys: &[&str]) -> (Arc<MemoryStore>, BatchDispatcher) {
        let store = Arc::new(MemoryStore::new());
        for key in keys {
            store.put_object(BUCKET, key, "testcontent");
        }
        let table = Arc::new(ClassificationTable::from_rows([
            ("db1", ClassificationEntry::new("tab1", "false")),
            ("db2", ClassificationEntry::new("tab2", "true")),
        ]));
        let worker = Arc::new(TaggingWorker::new(store.clone(), BUCKET));
        (store, BatchDispatcher::new(table, worker))
    }

    #[test]
    fn test_pool_is_sized_to_parallelism() {
        let (_, dispatcher) = dispatcher_for(&[]);
        assert!(dispatcher.pool_size() >= 1);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let (store, dispatcher) = dispatcher_for(&[]);
        let ctx = LogContext::new("test", "dispatcher");

        let summary = dispatcher.run(Vec::new(), &ctx).await.unwrap();

        assert_eq!(summary.objects_found, 0);
        assert_eq!(summary.matched, 0);
        assert_eq!(store.total_tag_writes(), 0);
    }

    #[tokio::test]
    async fn test_counts_each_outcome() {
        let keys = [
            "data/db1/tab1/00000_0",
            "data/db2/tab2/00000_0",
            "data/db1/tab9/00000_0",
            "data/00000_0",
            "data/db2/tab2/00001_0",
        ];
        let (store, dispatcher) = dispatcher_for(&keys);
        store.fail_tagging_for("data/db2/tab2/00001_0");
        let ctx = LogContext::new("test", "dispatcher");

        let summary = dispatcher
            .run(keys.iter().map(|k| k.to_string()).collect(), &ctx)
            .await
            .unwrap();

        assert_eq!(summary.objects_found, 5);
        assert_eq!(summary.matched, 2);
        assert_eq!(summary.tagged, 3);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert!(summary.finished_at >= summary.started_at);
    }

    #[tokio::test]
    async fn test_task_panic_fails_batch() {
        let keys = ["data/db1/tab1/00000_0", "data/db2/tab2/00000_0"];
        let (store, dispatcher) = dispatcher_for(&keys);
        store.panic_on_tagging_for("data/db2/tab2/00000_0");
        let ctx = LogContext::new("test", "dispatcher");

        let err = dispatcher
            .run(keys.iter().map(|k| k.to_string()).collect(), &ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, TaggerError::Worker(_)));
    }
}
