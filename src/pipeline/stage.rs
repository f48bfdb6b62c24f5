use futures::FutureExt;
use std::{
    panic::AssertUnwindSafe,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::{
    sync::{OnceCell, mpsc},
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::entities::UrlRef;
use crate::pipeline::{
    adapters::Fetcher,
    errors::{ErrorKind, panic_message},
    events::{PipelineEvent, RunContext},
    queue::{self, Inbox, SendStop},
    spec::{StageRole, StageSpec},
};

/// State a stage's workers share: where they write, what they report to.
#[derive(Clone)]
pub(crate) struct StageEnv {
    pub stage: Arc<str>,
    pub cancel: CancellationToken,
    pub ctx: RunContext,
    pub output: mpsc::Sender<UrlRef>,
    /// Whether `output` is the sink queue.
    pub feeds_sink: bool,
}

impl StageEnv {
    async fn emit(&self, url: UrlRef) -> Result<(), SendStop> {
        queue::send(&self.cancel, &self.output, url).await?;
        if self.feeds_sink {
            self.ctx.url_discovered();
        }
        Ok(())
    }

    fn started(&self, worker: usize) {
        debug!(stage = %self.stage, worker, "worker started");
        self.ctx.emit(PipelineEvent::WorkerStarted {
            stage: self.stage.to_string(),
            worker,
        });
    }

    fn stopped(&self, worker: usize) {
        debug!(stage = %self.stage, worker, "worker stopped");
        self.ctx.emit(PipelineEvent::WorkerStopped {
            stage: self.stage.to_string(),
            worker,
        });
    }
}

/// The producer's output, computed once and drained by all first-stage
/// workers.
struct Produced {
    urls: OnceCell<Vec<UrlRef>>,
    next: AtomicUsize,
}

/// Spawn the first stage. The producer runs exactly once; every worker then
/// pulls from its output and forwards to the stage queue.
pub(crate) fn spawn_first_stage(spec: &StageSpec, base_url: &str, env: StageEnv) -> JoinSet<()> {
    let produced = Arc::new(Produced {
        urls: OnceCell::new(),
        next: AtomicUsize::new(0),
    });
    let base_url: Arc<str> = Arc::from(base_url);

    let mut workers = JoinSet::new();
    for worker in 0..spec.worker_count {
        let env = env.clone();
        let role = spec.role.clone();
        let produced = produced.clone();
        let base_url = base_url.clone();
        workers.spawn(async move {
            env.started(worker);
            first_stage_worker(&env, worker, &role, &base_url, &produced).await;
            env.stopped(worker);
        });
    }
    workers
}

async fn first_stage_worker(
    env: &StageEnv,
    worker: usize,
    role: &StageRole,
    base_url: &str,
    produced: &Produced,
) {
    let urls = tokio::select! {
        biased;
        _ = env.cancel.cancelled() => return,
        urls = produced.urls.get_or_init(|| produce(env, role, base_url)) => urls,
    };

    loop {
        let index = produced.next.fetch_add(1, Ordering::Relaxed);
        let Some(url) = urls.get(index) else {
            break;
        };

        if let Err(stop) = env.emit(url.clone()).await {
            debug!(stage = %env.stage, worker, ?stop, "stopped forwarding");
            return;
        }
    }
}

async fn produce(env: &StageEnv, role: &StageRole, base_url: &str) -> Vec<UrlRef> {
    let (result, input) = match role {
        StageRole::Generate(generator) => (
            AssertUnwindSafe(generator.generate(&env.cancel)).catch_unwind().await,
            None,
        ),
        StageRole::Fetch(fetcher) => (
            AssertUnwindSafe(fetcher.fetch(&env.cancel, base_url)).catch_unwind().await,
            Some(base_url),
        ),
    };

    let result = match result {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(stage = %env.stage, url = input, %message, "first stage panicked");
            env.ctx.failure(&env.stage, input, ErrorKind::Panic, message);
            return Vec::new();
        }
    };

    match result {
        Ok(urls) => {
            let urls: Vec<UrlRef> = urls
                .into_iter()
                .filter(|url| !url.location.is_empty())
                .collect();
            info!(stage = %env.stage, count = urls.len(), "first stage produced urls");
            urls
        }
        Err(err) if err.is_cancelled() => {
            info!(stage = %env.stage, "first stage cancelled");
            Vec::new()
        }
        Err(err) => {
            error!(stage = %env.stage, url = input, error = %err, "first stage failed");
            env.ctx.failure(
                &env.stage,
                input,
                ErrorKind::of_source(&err, true),
                err.to_string(),
            );
            Vec::new()
        }
    }
}

/// Spawn a URL-expanding stage reading from `inbox`.
pub(crate) fn spawn_fetch_stage(
    worker_count: usize,
    fetcher: Arc<dyn Fetcher>,
    inbox: Inbox,
    env: StageEnv,
) -> JoinSet<()> {
    let mut workers = JoinSet::new();
    for worker in 0..worker_count {
        let env = env.clone();
        let fetcher = fetcher.clone();
        let inbox = inbox.clone();
        workers.spawn(async move {
            env.started(worker);
            fetch_worker(&env, worker, fetcher.as_ref(), &inbox).await;
            env.stopped(worker);
        });
    }
    workers
}

async fn fetch_worker(env: &StageEnv, worker: usize, fetcher: &dyn Fetcher, inbox: &Inbox) {
    while let Some(input) = queue::recv(&env.cancel, inbox).await {
        let result = tokio::select! {
            biased;
            _ = env.cancel.cancelled() => return,
            result = AssertUnwindSafe(fetcher.fetch(&env.cancel, &input.location)).catch_unwind() => result,
        };

        let result = match result {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(stage = %env.stage, worker, url = %input.location, %message, "fetcher panicked");
                env.ctx.failure(&env.stage, Some(&input.location), ErrorKind::Panic, message);
                continue;
            }
        };

        match result {
            Ok(urls) => {
                debug!(stage = %env.stage, worker, url = %input.location, count = urls.len(), "urls extracted");
                for url in urls.into_iter().filter(|url| !url.location.is_empty()) {
                    if env.emit(url).await.is_err() {
                        return;
                    }
                }
            }
            Err(err) if err.is_cancelled() => return,
            Err(err) => {
                warn!(stage = %env.stage, worker, url = %input.location, error = %err, "fetch failed");
                env.ctx.failure(
                    &env.stage,
                    Some(&input.location),
                    ErrorKind::of_source(&err, false),
                    err.to_string(),
                );
            }
        }
    }
}

/// Wait for every worker of a stage, then close its output queue by
/// dropping the last sender.
pub(crate) fn spawn_closer(
    mut workers: JoinSet<()>,
    queue: usize,
    output: mpsc::Sender<UrlRef>,
    ctx: RunContext,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                error!(queue, error = %err, "stage worker panicked");
            }
        }
        drop(output);
        debug!(queue, "queue closed");
        ctx.emit(PipelineEvent::QueueClosed { queue });
    })
}
