use anyhow::{Context, Result, anyhow};
use blogharvest::{
    cli::{Cli, Command},
    config::Config,
    fetcher::{HttpClient, HttpProfile},
    pipeline::{
        Pipeline, PipelineDeps, PipelineSpec, file_pipeline, pagination_pipeline,
        podcast_transcript_pipeline, rss_pipeline, sitemap_pipeline,
    },
    replication::Replicator,
    repositories::{ArticleStore, PgArticleStore, SqliteArticleStore},
    transcripts::TranscriptService,
    urls::{
        AlreadyPersistedFilter, BaseUrlFilter, ContainsPathFilter, FilterChain,
        extractor_by_name, extractor_name_for,
        sites::{DATA_ENGINEERING_PODCAST, extractor_names},
    },
};
use clap::Parser;
use std::{path::Path, sync::Arc};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Received shutdown signal, stopping workers...");
        shutdown.cancel();
    });

    match &cli.command {
        Command::Extract {
            html_file,
            extractor,
            page_url,
            json,
        } => extract(html_file, extractor, page_url, *json).await,
        Command::Replicate => replicate(&config, &cancel).await,
        Command::Transcripts {
            sitemap_url,
            max,
            workers,
        } => transcripts(&config, &cancel, sitemap_url, *max, *workers).await,
        command => crawl(&cli, command, &config, &cancel).await,
    }
}

async fn crawl(cli: &Cli, command: &Command, config: &Config, cancel: &CancellationToken) -> Result<()> {
    let store = Arc::new(
        SqliteArticleStore::connect(config.document_store_url())
            .await
            .context("connecting to the document store")?,
    );

    let known = store
        .existing_urls()
        .await
        .context("loading already stored urls")?;
    info!(known = known.len(), "loaded stored urls");

    let mut filters = FilterChain::default()
        .with(BaseUrlFilter)
        .with(AlreadyPersistedFilter::new(known));
    if let Some(segment) = &cli.url_filter {
        filters = filters.with(ContainsPathFilter::new(segment.as_str()));
    }

    let deps = PipelineDeps::new(store)
        .with_filters(filters)
        .with_timeout(config.http_timeout());

    let (spec, base_url): (PipelineSpec, String) = match command {
        Command::Sitemap { url, workers } => (sitemap_pipeline(&deps, (*workers).into())?, url.clone()),
        Command::Rss { url, workers } => (rss_pipeline(&deps, (*workers).into())?, url.clone()),
        Command::File { path, workers } => (
            file_pipeline(&deps, (*workers).into())?,
            path.to_string_lossy().into_owned(),
        ),
        Command::Paginate {
            base_url,
            pattern,
            extractor,
            pages_per_batch,
            ..
        } => {
            debug!(pages_per_batch, "pages are generated one at a time");
            let workers = command.pagination_workers().unwrap_or_default();
            let name = extractor
                .as_deref()
                .unwrap_or_else(|| extractor_name_for(base_url));
            let spec = if name == DATA_ENGINEERING_PODCAST {
                podcast_transcript_pipeline(&deps, base_url, pattern, workers)?
            } else {
                let extract = extractor_by_name(name).ok_or_else(|| unknown_extractor(name))?;
                pagination_pipeline(&deps, base_url, pattern, extract, workers)?
            };
            info!(extractor = name, "paginating");
            (spec, base_url.clone())
        }
        other => return Err(anyhow!("{other:?} is not a crawl command")),
    };

    let summary = Pipeline::new(spec).run(cancel, &base_url).await?;
    if summary.discovered == 0 {
        warn!(%base_url, "no new urls discovered");
    }
    info!(
        discovered = summary.discovered,
        saved = summary.saved,
        failed = summary.failed,
        "crawl finished"
    );
    Ok(())
}

async fn replicate(config: &Config, cancel: &CancellationToken) -> Result<()> {
    let source = SqliteArticleStore::connect(config.document_store_url())
        .await
        .context("connecting to the document store")?;
    let target = PgArticleStore::connect(config.require_postgres_dsn()?)
        .await
        .context("connecting to postgres")?;

    let report = Replicator::new(Arc::new(source), Arc::new(target))
        .run(cancel)
        .await?;
    info!(
        processed = report.processed,
        inserted = report.inserted,
        "replication finished"
    );
    Ok(())
}

async fn transcripts(
    config: &Config,
    cancel: &CancellationToken,
    sitemap_url: &str,
    max: usize,
    workers: usize,
) -> Result<()> {
    let store = SqliteArticleStore::connect(config.document_store_url())
        .await
        .context("connecting to the document store")?;
    let client = HttpClient::with_timeout(HttpProfile::Browser, config.http_timeout())?;

    let report = TranscriptService::new(client, Arc::new(store))
        .with_workers(workers)
        .download_from_sitemap(cancel, sitemap_url, (max > 0).then_some(max))
        .await?;
    info!(
        listed = report.listed,
        skipped = report.skipped,
        saved = report.saved,
        failed = report.failed,
        "transcripts finished"
    );
    Ok(())
}

async fn extract(html_file: &Path, extractor: &str, page_url: &str, json: bool) -> Result<()> {
    let extract = extractor_by_name(extractor).ok_or_else(|| unknown_extractor(extractor))?;
    let page_url = Url::parse(page_url).with_context(|| format!("invalid page url {page_url}"))?;
    let html = tokio::fs::read_to_string(html_file)
        .await
        .with_context(|| format!("reading {}", html_file.display()))?;

    let urls = extract(&html, &page_url);
    for url in &urls {
        if json {
            println!("{}", serde_json::to_string(url)?);
        } else {
            println!("{}\t{}", url.location, url.title.as_deref().unwrap_or_default());
        }
    }
    info!(count = urls.len(), "urls extracted");
    Ok(())
}

fn unknown_extractor(name: &str) -> anyhow::Error {
    anyhow!(
        "unknown extractor {name:?}, expected one of: {}",
        extractor_names().join(", ")
    )
}
