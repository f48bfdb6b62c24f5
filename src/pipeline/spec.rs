use std::{fmt, sync::Arc};

use crate::pipeline::adapters::{ContentProcessor, ContentSaver, Fetcher, Generator};
use crate::pipeline::errors::PipelineError;

/// Capacity of the first queue when it feeds another stage.
pub const FIRST_QUEUE_CAPACITY: usize = 100;

/// What a stage does with its workers.
#[derive(Clone)]
pub enum StageRole {
    /// Produce URLs from configuration. First stage only.
    Generate(Arc<dyn Generator>),
    /// Expand each input URL (the base URL at the first stage).
    Fetch(Arc<dyn Fetcher>),
}

impl fmt::Debug for StageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generate(_) => f.write_str("Generate"),
            Self::Fetch(_) => f.write_str("Fetch"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StageSpec {
    pub name: String,
    pub worker_count: usize,
    pub role: StageRole,
}

impl StageSpec {
    pub fn generator(
        name: impl Into<String>,
        worker_count: usize,
        generator: impl Generator + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            worker_count,
            role: StageRole::Generate(Arc::new(generator)),
        }
    }

    pub fn fetcher(name: impl Into<String>, worker_count: usize, fetcher: impl Fetcher + 'static) -> Self {
        Self {
            name: name.into(),
            worker_count,
            role: StageRole::Fetch(Arc::new(fetcher)),
        }
    }
}

#[derive(Clone)]
pub struct SinkSpec {
    pub worker_count: usize,
    pub processor: Arc<dyn ContentProcessor>,
    pub saver: Arc<dyn ContentSaver>,
}

impl SinkSpec {
    pub fn new(
        worker_count: usize,
        processor: Arc<dyn ContentProcessor>,
        saver: Arc<dyn ContentSaver>,
    ) -> Self {
        Self {
            worker_count,
            processor,
            saver,
        }
    }
}

impl fmt::Debug for SinkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkSpec")
            .field("worker_count", &self.worker_count)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSpec {
    pub stages: Vec<StageSpec>,
    pub sink: SinkSpec,
}

impl PipelineSpec {
    pub fn new(stages: Vec<StageSpec>, sink: SinkSpec) -> Self {
        Self { stages, sink }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.stages.is_empty() {
            return Err(PipelineError::InvalidSpec("pipeline has no stages".into()));
        }

        for (index, stage) in self.stages.iter().enumerate() {
            if stage.worker_count == 0 {
                return Err(PipelineError::InvalidSpec(format!(
                    "stage {:?} has no workers",
                    stage.name
                )));
            }
            if index > 0 && matches!(stage.role, StageRole::Generate(_)) {
                return Err(PipelineError::InvalidSpec(format!(
                    "stage {:?} is a generator but only the first stage may generate",
                    stage.name
                )));
            }
        }

        if self.sink.worker_count == 0 {
            return Err(PipelineError::InvalidSpec("sink has no workers".into()));
        }

        Ok(())
    }

    /// Capacity of each queue. Queue `i` carries stage `i`'s output and is
    /// sized by its producer; the last one feeds the sink and is sized by
    /// the sink.
    pub fn queue_capacities(&self) -> Vec<usize> {
        let last = self.stages.len().saturating_sub(1);
        self.stages
            .iter()
            .enumerate()
            .map(|(i, stage)| match i {
                i if i == last => 2 * self.sink.worker_count,
                0 => FIRST_QUEUE_CAPACITY,
                _ => 2 * stage.worker_count,
            })
            .collect()
    }

    pub fn total_workers(&self) -> usize {
        self.stages.iter().map(|stage| stage.worker_count).sum::<usize>() + self.sink.worker_count
    }
}
