use hostlog_collector::SampleCollector;
use hostlog_common::payload;
use hostlog_common::types::SampleRecord;
use hostlog_storage::StorageBackend;
use std::io::Write;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// What a single collect-then-persist cycle ended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Stored,
    /// An essential probe failed; nothing was emitted or stored.
    Aborted,
    /// The record was emitted but the backend rejected it. Not retried.
    PersistFailed,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CycleStats {
    pub stored: u64,
    pub aborted: u64,
    pub persist_failed: u64,
}

/// Drives the collector on a fixed interval, one cycle at a time.
pub struct Scheduler {
    collector: SampleCollector,
    storage: StorageBackend,
    period: Duration,
    output: Box<dyn Write + Send>,
    stats: CycleStats,
}

impl Scheduler {
    pub fn new(collector: SampleCollector, storage: StorageBackend, period: Duration) -> Self {
        Self {
            collector,
            storage,
            period,
            output: Box::new(std::io::stdout()),
            stats: CycleStats::default(),
        }
    }

    /// Replaces stdout as the destination of the per-cycle JSON lines.
    pub fn with_output(mut self, output: impl Write + Send + 'static) -> Self {
        self.output = Box::new(output);
        self
    }

    /// Runs cycles until `shutdown` is cancelled, then hands the storage
    /// backend back for closing.
    ///
    /// Cancellation is only observed between cycles, so a cycle that has
    /// started always finishes its write. A cycle that overruns the period
    /// is followed immediately by the next one; missed ticks are not
    /// replayed.
    pub async fn run(mut self, shutdown: CancellationToken) -> StorageBackend {
        tracing::info!(
            interval_secs = self.period.as_secs(),
            backend = self.storage.kind(),
            "Starting collection loop"
        );

        let mut tick = interval(self.period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::info!("Shutting down gracefully");
                    break;
                }
                _ = tick.tick() => {
                    self.run_cycle();
                }
            }
        }

        let stats = self.stats();
        tracing::info!(
            stored = stats.stored,
            aborted = stats.aborted,
            persist_failed = stats.persist_failed,
            "Collection loop stopped"
        );
        self.storage
    }

    /// One collect-emit-persist cycle. Never panics and never returns an
    /// error: every failure is logged and reflected in the outcome.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        let record = match self.collector.collect() {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(error = %e, "Collection cycle aborted");
                self.stats.aborted += 1;
                return CycleOutcome::Aborted;
            }
        };

        self.emit(&record);

        match self.storage.insert_log(&record) {
            Ok(()) => {
                self.stats.stored += 1;
                CycleOutcome::Stored
            }
            Err(e) => {
                tracing::error!(backend = self.storage.kind(), error = %e, "Failed to store log");
                self.stats.persist_failed += 1;
                CycleOutcome::PersistFailed
            }
        }
    }

    pub fn stats(&self) -> CycleStats {
        self.stats
    }

    fn emit(&mut self, record: &SampleRecord) {
        let line = match payload::encode(record) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode record for output");
                return;
            }
        };
        if let Err(e) = writeln!(self.output, "{line}").and_then(|()| self.output.flush()) {
            tracing::warn!(error = %e, "Failed to write record to output");
        }
    }
}
