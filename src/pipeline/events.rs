use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::pipeline::errors::ErrorKind;

/// Name the sink reports in events and logs.
pub const SINK_NAME: &str = "sink";

/// Lifecycle and outcome notifications emitted while a pipeline runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    WorkerStarted { stage: String, worker: usize },
    WorkerStopped { stage: String, worker: usize },
    /// Queue `queue` was closed; the last queue feeds the sink.
    QueueClosed { queue: usize },
    Failure {
        stage: String,
        url: Option<String>,
        kind: ErrorKind,
        message: String,
    },
    ArticleSaved { url: String },
}

/// Callback receiving every [`PipelineEvent`]. Called from worker tasks, so
/// it must be cheap and must not block.
pub type Observer = Arc<dyn Fn(&PipelineEvent) + Send + Sync>;

/// Totals for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// URLs handed to the sink.
    pub discovered: u64,
    pub saved: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    discovered: AtomicU64,
    saved: AtomicU64,
    failed: AtomicU64,
}

/// Shared by every worker of one run.
#[derive(Clone)]
pub(crate) struct RunContext {
    observer: Option<Observer>,
    counters: Arc<Counters>,
}

impl RunContext {
    pub(crate) fn new(observer: Option<Observer>) -> Self {
        Self {
            observer,
            counters: Arc::new(Counters::default()),
        }
    }

    pub(crate) fn emit(&self, event: PipelineEvent) {
        match &event {
            PipelineEvent::Failure { .. } => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
            }
            PipelineEvent::ArticleSaved { .. } => {
                self.counters.saved.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }

        if let Some(observer) = &self.observer {
            observer(&event);
        }
    }

    pub(crate) fn url_discovered(&self) {
        self.counters.discovered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn failure(&self, stage: &str, url: Option<&str>, kind: ErrorKind, message: String) {
        self.emit(PipelineEvent::Failure {
            stage: stage.to_string(),
            url: url.map(str::to_string),
            kind,
            message,
        });
    }

    pub(crate) fn summary(&self) -> RunSummary {
        RunSummary {
            discovered: self.counters.discovered.load(Ordering::Relaxed),
            saved: self.counters.saved.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}
