use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::pipeline::{
    errors::{ErrorKind, panic_message},
    events::{PipelineEvent, RunContext, SINK_NAME},
    queue::{self, Inbox},
    spec::SinkSpec,
};
use crate::repositories::StoreError;

pub(crate) fn spawn_sink(
    spec: &SinkSpec,
    inbox: Inbox,
    cancel: CancellationToken,
    ctx: RunContext,
) -> JoinSet<()> {
    let mut workers = JoinSet::new();
    for worker in 0..spec.worker_count {
        let spec = spec.clone();
        let inbox = inbox.clone();
        let cancel = cancel.clone();
        let ctx = ctx.clone();
        workers.spawn(async move {
            ctx.emit(PipelineEvent::WorkerStarted {
                stage: SINK_NAME.to_string(),
                worker,
            });
            sink_worker(&spec, worker, &inbox, &cancel, &ctx).await;
            ctx.emit(PipelineEvent::WorkerStopped {
                stage: SINK_NAME.to_string(),
                worker,
            });
        });
    }
    workers
}

async fn sink_worker(
    spec: &SinkSpec,
    worker: usize,
    inbox: &Inbox,
    cancel: &CancellationToken,
    ctx: &RunContext,
) {
    while let Some(input) = queue::recv(cancel, inbox).await {
        let url = input.location.as_str();
        debug!(worker, url, "processing article");

        let processed = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            processed = AssertUnwindSafe(spec.processor.process(cancel, url)).catch_unwind() => processed,
        };

        let article = match processed {
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(worker, url, %message, "content processor panicked");
                ctx.failure(SINK_NAME, Some(url), ErrorKind::Panic, message);
                continue;
            }
            Ok(Ok(article)) => article,
            Ok(Err(err)) if err.is_cancelled() => return,
            Ok(Err(err)) => {
                warn!(worker, url, error = %err, "content processing failed");
                ctx.failure(SINK_NAME, Some(url), ErrorKind::of_process(&err), err.to_string());
                continue;
            }
        };

        let saved = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            saved = AssertUnwindSafe(spec.saver.save(cancel, &article)).catch_unwind() => saved,
        };

        let saved = match saved {
            Ok(saved) => saved,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(worker, url, %message, "content saver panicked");
                ctx.failure(SINK_NAME, Some(url), ErrorKind::Panic, message);
                continue;
            }
        };

        match saved {
            Ok(()) => {
                info!(worker, url, title = %article.title, "article saved");
                ctx.emit(PipelineEvent::ArticleSaved {
                    url: article.url.clone(),
                });
            }
            Err(StoreError::Cancelled) => return,
            Err(err) => {
                warn!(worker, url, error = %err, "saving article failed");
                ctx.failure(SINK_NAME, Some(url), ErrorKind::Store, err.to_string());
            }
        }
    }
}
