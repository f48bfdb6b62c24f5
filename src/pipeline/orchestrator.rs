use futures::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::pipeline::{
    errors::PipelineError,
    events::{Observer, PipelineEvent, RunContext, RunSummary},
    queue,
    sink::spawn_sink,
    spec::{PipelineSpec, StageRole},
    stage::{StageEnv, spawn_closer, spawn_fetch_stage, spawn_first_stage},
};

/// A linear chain of URL stages ending in the content sink.
#[derive(Clone)]
pub struct Pipeline {
    spec: PipelineSpec,
    observer: Option<Observer>,
}

impl Pipeline {
    pub fn new(spec: PipelineSpec) -> Self {
        Self {
            spec,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: impl Fn(&PipelineEvent) + Send + Sync + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Run to completion. Per-URL failures are logged and reported to the
    /// observer; only wiring errors are returned. Cancelling `cancel` stops
    /// every worker at its next queue, HTTP or store call and still returns
    /// `Ok`.
    #[instrument(skip_all, fields(base_url = %base_url, stages = self.spec.stages.len()))]
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        base_url: &str,
    ) -> Result<RunSummary, PipelineError> {
        self.spec.validate()?;

        let ctx = RunContext::new(self.observer.clone());
        let stages = &self.spec.stages;
        let last = stages.len() - 1;

        let (senders, inboxes): (Vec<_>, Vec<_>) = self
            .spec
            .queue_capacities()
            .into_iter()
            .map(queue::bounded)
            .unzip();

        // Consumers first: sink, then later stages from last to first, then
        // the first stage.
        let mut sink = spawn_sink(&self.spec.sink, inboxes[last].clone(), cancel.clone(), ctx.clone());

        let mut closers = Vec::with_capacity(stages.len());
        for index in (0..stages.len()).rev() {
            let stage = &stages[index];
            let env = StageEnv {
                stage: Arc::from(stage.name.as_str()),
                cancel: cancel.clone(),
                ctx: ctx.clone(),
                output: senders[index].clone(),
                feeds_sink: index == last,
            };

            let workers = match (&stage.role, index) {
                (_, 0) => spawn_first_stage(stage, base_url, env),
                (StageRole::Fetch(fetcher), _) => spawn_fetch_stage(
                    stage.worker_count,
                    fetcher.clone(),
                    inboxes[index - 1].clone(),
                    env,
                ),
                (StageRole::Generate(_), _) => {
                    unreachable!("validate rejects generators after the first stage")
                }
            };

            closers.push(spawn_closer(workers, index, senders[index].clone(), ctx.clone()));
        }
        drop(senders);
        // Workers hold their own handles; once every consumer of a queue is
        // gone its producers see `Disconnected` instead of blocking.
        drop(inboxes);

        info!(workers = self.spec.total_workers(), "pipeline started");

        for closed in join_all(closers).await {
            if let Err(err) = closed {
                error!(error = %err, "queue closer panicked");
            }
        }
        while let Some(joined) = sink.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "sink worker panicked");
            }
        }

        let summary = ctx.summary();
        info!(
            discovered = summary.discovered,
            saved = summary.saved,
            failed = summary.failed,
            cancelled = cancel.is_cancelled(),
            "pipeline finished"
        );
        Ok(summary)
    }
}
