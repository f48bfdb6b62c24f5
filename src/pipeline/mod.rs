//! Staged, worker-pooled URL pipeline.
//!
//! A run wires `N` URL stages and a content sink with bounded queues:
//!
//! ```text
//! stage[0] ─Q0─► stage[1] ─Q1─► ... ─Q(N-1)─► sink
//! ```
//!
//! Stage 0 runs its producer once (a [`Generator`] or a [`Fetcher`] called
//! with the base URL). Every later stage expands each input URL with its
//! [`Fetcher`]. The sink fetches, extracts and saves one article per URL.
//! Each queue is closed by a single closer task once every worker of the
//! producing stage has returned. Per-URL failures are logged and reported
//! to the optional observer; only an invalid spec fails a run.

pub mod adapters;
pub mod builders;
pub mod errors;
pub mod events;
pub mod filtered;
pub mod orchestrator;
pub mod pagination;
pub mod processor;
mod queue;
mod sink;
pub mod spec;
mod stage;

pub use adapters::{ContentProcessor, ContentSaver, Fetcher, Generator};
pub use builders::{
    PaginationWorkers, PipelineDeps, WorkerCounts, file_pipeline, pagination_pipeline,
    podcast_transcript_pipeline, rss_pipeline, sitemap_pipeline,
};
pub use errors::{ErrorKind, PipelineError, ProcessError};
pub use events::{Observer, PipelineEvent, RunSummary, SINK_NAME};
pub use filtered::{Filtered, FilteredGenerator};
pub use orchestrator::Pipeline;
pub use pagination::PageRangeGenerator;
pub use processor::{HttpContentProcessor, StoreSaver};
pub use spec::{FIRST_QUEUE_CAPACITY, PipelineSpec, SinkSpec, StageRole, StageSpec};
