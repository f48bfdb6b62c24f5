mod helpers;

use std::{collections::HashSet, sync::Arc, time::Duration};

use blogharvest::{
    entities::Article,
    pipeline::{
        ErrorKind, PaginationWorkers, Pipeline, PipelineDeps, PipelineEvent, PipelineSpec,
        SinkSpec, StageSpec, StoreSaver, WorkerCounts, pagination_pipeline, rss_pipeline,
        sitemap_pipeline,
    },
    repositories::{ArticleStore, MemoryArticleStore},
    urls::{AlreadyPersistedFilter, FilterChain, extract_generic},
};
use helpers::*;
use tokio_util::sync::CancellationToken;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

const ONE_WORKER_EACH: WorkerCounts = WorkerCounts {
    url_fetchers: 1,
    content: 1,
};

async fn mount_articles(server: &MockServer, names: &[&str]) -> Vec<String> {
    let mut urls = Vec::new();
    for (i, name) in names.iter().enumerate() {
        let at = format!("/{name}");
        mount_html(server, &at, article_html(&format!("T{}", i + 1), &format!("Body of {name}"))).await;
        urls.push(format!("{}{at}", server.uri()));
    }
    urls
}

fn sink(store: Arc<MemoryArticleStore>, workers: usize, processor: FakeProcessor) -> SinkSpec {
    SinkSpec::new(workers, Arc::new(processor), Arc::new(StoreSaver::new(store)))
}

#[tokio::test]
async fn sitemap_happy_path() {
    let server = MockServer::start().await;
    let urls = mount_articles(&server, &["a1", "a2"]).await;
    mount_xml(&server, "/sitemap.xml", urlset(&urls)).await;

    let store = Arc::new(MemoryArticleStore::new());
    let spec = sitemap_pipeline(&PipelineDeps::new(store.clone()), ONE_WORKER_EACH).unwrap();
    let summary = Pipeline::new(spec)
        .run(&CancellationToken::new(), &format!("{}/sitemap.xml", server.uri()))
        .await
        .unwrap();

    assert_eq!(summary.saved, 2);
    assert_eq!(summary.failed, 0);

    let first = store.get(&urls[0]).unwrap();
    let second = store.get(&urls[1]).unwrap();
    assert_eq!(first.title, "T1");
    assert_eq!(second.title, "T2");
    assert!(!first.text.is_empty());
    assert!(!second.text.is_empty());
}

#[tokio::test]
async fn sitemap_index_fans_out() {
    let server = MockServer::start().await;
    let urls = mount_articles(&server, &["a1", "a2", "a3", "a4"]).await;
    mount_xml(&server, "/s1.xml", urlset(&urls[..2])).await;
    mount_xml(&server, "/s2.xml", urlset(&urls[2..])).await;
    mount_xml(
        &server,
        "/sitemap.xml",
        sitemap_index(&[
            format!("{}/s1.xml", server.uri()),
            format!("{}/s2.xml", server.uri()),
        ]),
    )
    .await;

    let store = Arc::new(MemoryArticleStore::new());
    let spec = sitemap_pipeline(&PipelineDeps::new(store.clone()), WorkerCounts::default()).unwrap();
    Pipeline::new(spec)
        .run(&CancellationToken::new(), &format!("{}/sitemap.xml", server.uri()))
        .await
        .unwrap();

    assert_eq!(store.save_calls(), 4);
    assert_eq!(store.urls(), urls.into_iter().collect::<HashSet<_>>());
}

#[tokio::test]
async fn rss_titles_come_from_article_pages() {
    let server = MockServer::start().await;
    mount_html(&server, "/p1", article_html("Post One", "First body")).await;
    mount_html(&server, "/p2", article_html("Post Two", "Second body")).await;
    let p1 = format!("{}/p1", server.uri());
    let p2 = format!("{}/p2", server.uri());
    mount_xml(&server, "/feed.xml", rss(&[(p1.clone(), "P1"), (p2.clone(), "P2")])).await;

    let store = Arc::new(MemoryArticleStore::new());
    let spec = rss_pipeline(&PipelineDeps::new(store.clone()), ONE_WORKER_EACH).unwrap();
    Pipeline::new(spec)
        .run(&CancellationToken::new(), &format!("{}/feed.xml", server.uri()))
        .await
        .unwrap();

    assert_eq!(store.save_calls(), 2);
    assert_eq!(store.get(&p1).unwrap().title, "Post One");
    assert_eq!(store.get(&p2).unwrap().title, "Post Two");
}

#[tokio::test]
async fn already_persisted_urls_never_reach_the_sink() {
    let server = MockServer::start().await;
    let a1 = format!("{}/a1", server.uri());
    let a2 = format!("{}/a2", server.uri());
    let a5 = format!("{}/a5", server.uri());
    mount_html(&server, "/a5", article_html("T5", "Fresh")).await;
    Mock::given(method("GET"))
        .and(path("/a1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    mount_xml(&server, "/sitemap.xml", urlset(&[a1.clone(), a2.clone(), a5.clone()])).await;

    let store = Arc::new(MemoryArticleStore::with_articles([
        Article::new(a1.as_str(), "old", "old"),
        Article::new(a2.as_str(), "old", "old"),
    ]));
    let filters = FilterChain::default().with(AlreadyPersistedFilter::new(store.urls()));
    let deps = PipelineDeps::new(store.clone()).with_filters(filters);
    let spec = sitemap_pipeline(&deps, ONE_WORKER_EACH).unwrap();

    let recorder = Recorder::default();
    let summary = Pipeline::new(spec)
        .with_observer(recorder.observer())
        .run(&CancellationToken::new(), &format!("{}/sitemap.xml", server.uri()))
        .await
        .unwrap();

    assert_eq!(summary.discovered, 1);
    assert_eq!(store.save_calls(), 1);
    assert_eq!(store.urls(), HashSet::from([a1, a2, a5]));
    assert!(recorder.failures().is_empty());
}

#[tokio::test]
async fn pagination_stops_at_first_missing_page() {
    let server = MockServer::start().await;
    let listings: [&[&str]; 3] = [&["a", "b"], &["c"], &["d", "e"]];

    for (i, links) in listings.iter().enumerate() {
        let page = format!("/page/{}", i + 1);
        mount_head(&server, &page, 200).await;
        let articles: String = links
            .iter()
            .map(|link| format!(r#"<article><h2><a href="/{link}">Post {link}</a></h2></article>"#))
            .collect();
        mount_html(&server, &page, format!("<html><body><main>{articles}</main></body></html>")).await;
    }
    mount_head(&server, "/page/4", 404).await;
    mount_articles(&server, &["a", "b", "c", "d", "e"]).await;

    let store = Arc::new(MemoryArticleStore::new());
    let spec = pagination_pipeline(
        &PipelineDeps::new(store.clone()),
        &server.uri(),
        "/page/%d",
        extract_generic,
        PaginationWorkers::default(),
    )
    .unwrap();

    let recorder = Recorder::default();
    let summary = Pipeline::new(spec)
        .with_observer(recorder.observer())
        .run(&CancellationToken::new(), &server.uri())
        .await
        .unwrap();

    assert_eq!(summary.saved, 5);
    assert_eq!(store.save_calls(), 5);
    let expected: HashSet<String> = ["a", "b", "c", "d", "e"]
        .iter()
        .map(|name| format!("{}/{name}", server.uri()))
        .collect();
    assert_eq!(store.urls(), expected);
    assert!(recorder.failures().is_empty(), "{:?}", recorder.failures());
}

#[tokio::test]
async fn one_failing_article_does_not_stop_the_sink() {
    let store = Arc::new(MemoryArticleStore::new());
    let spec = PipelineSpec::new(
        vec![StageSpec::fetcher("list", 1, ListSource::numbered("u", 4))],
        sink(store.clone(), 2, FakeProcessor::failing_on("u1")),
    );

    let recorder = Recorder::default();
    let summary = Pipeline::new(spec)
        .with_observer(recorder.observer())
        .run(&CancellationToken::new(), "https://ex.com")
        .await
        .unwrap();

    assert_eq!(store.save_calls(), 3);
    assert_eq!(summary.saved, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(
        recorder.failures(),
        vec![PipelineEvent::Failure {
            stage: "sink".into(),
            url: Some("u1".into()),
            kind: ErrorKind::Extract,
            message: "title not found in HTML".into(),
        }]
    );
}

#[tokio::test]
async fn fetch_error_is_isolated_to_its_input() {
    let store = Arc::new(MemoryArticleStore::new());
    let spec = PipelineSpec::new(
        vec![
            StageSpec::generator("pages", 1, ListSource::numbered("p", 3)),
            StageSpec::fetcher("listing", 2, FanOut::new(2).failing_on("p1")),
        ],
        sink(store.clone(), 2, FakeProcessor::default()),
    );

    let recorder = Recorder::default();
    Pipeline::new(spec)
        .with_observer(recorder.observer())
        .run(&CancellationToken::new(), "unused")
        .await
        .unwrap();

    assert_eq!(
        store.urls(),
        HashSet::from(["p0/0", "p0/1", "p2/0", "p2/1"].map(String::from))
    );
    let failures = recorder.failures();
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        &failures[0],
        PipelineEvent::Failure { stage, url: Some(url), kind: ErrorKind::Fetch, .. }
            if stage == "listing" && url == "p1"
    ));
}

#[tokio::test]
async fn panicking_processor_does_not_stall_the_run() {
    let store = Arc::new(MemoryArticleStore::new());
    let spec = PipelineSpec::new(
        vec![StageSpec::fetcher("list", 1, ListSource::numbered("u", 20))],
        sink(store.clone(), 1, FakeProcessor::panicking()),
    );
    assert_eq!(spec.queue_capacities(), vec![2]);

    let recorder = Recorder::default();
    let summary = tokio::time::timeout(
        Duration::from_secs(10),
        Pipeline::new(spec)
            .with_observer(recorder.observer())
            .run(&CancellationToken::new(), "https://ex.com"),
    )
    .await
    .expect("run hung after the processor panicked")
    .unwrap();

    assert_eq!(summary.saved, 0);
    assert_eq!(summary.failed, 20);
    assert_eq!(store.save_calls(), 0);
    let panics = recorder.count(|e| {
        matches!(e, PipelineEvent::Failure { stage, kind: ErrorKind::Panic, message, .. }
            if stage == "sink" && message.starts_with("panicked: cannot process u"))
    });
    assert_eq!(panics, 20);
    assert_eq!(recorder.count(|e| matches!(e, PipelineEvent::WorkerStopped { .. })), 2);
    assert_eq!(recorder.closed_queues(), vec![0]);
}

#[tokio::test]
async fn panicking_fetcher_is_isolated_to_its_input() {
    let store = Arc::new(MemoryArticleStore::new());
    let spec = PipelineSpec::new(
        vec![
            StageSpec::generator("pages", 1, ListSource::numbered("p", 3)),
            StageSpec::fetcher("listing", 1, FanOut::new(2).panicking_on("p1")),
        ],
        sink(store.clone(), 1, FakeProcessor::default()),
    );

    let recorder = Recorder::default();
    tokio::time::timeout(
        Duration::from_secs(10),
        Pipeline::new(spec)
            .with_observer(recorder.observer())
            .run(&CancellationToken::new(), "unused"),
    )
    .await
    .expect("run hung after the fetcher panicked")
    .unwrap();

    assert_eq!(
        store.urls(),
        HashSet::from(["p0/0", "p0/1", "p2/0", "p2/1"].map(String::from))
    );
    assert!(matches!(
        recorder.failures().as_slice(),
        [PipelineEvent::Failure { stage, url: Some(url), kind: ErrorKind::Panic, .. }]
            if stage == "listing" && url == "p1"
    ));
}

#[tokio::test]
async fn first_stage_failure_is_reported_not_returned() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryArticleStore::new());
    let spec = sitemap_pipeline(&PipelineDeps::new(store.clone()), ONE_WORKER_EACH).unwrap();

    let recorder = Recorder::default();
    let summary = Pipeline::new(spec)
        .with_observer(recorder.observer())
        .run(&CancellationToken::new(), &format!("{}/missing.xml", server.uri()))
        .await
        .unwrap();

    assert_eq!(summary.discovered, 0);
    assert_eq!(recorder.closed_queues(), vec![0]);
    assert!(matches!(
        recorder.failures().as_slice(),
        [PipelineEvent::Failure { kind: ErrorKind::Source, .. }]
    ));
}

#[tokio::test]
async fn rerunning_against_the_same_store_is_idempotent() {
    let server = MockServer::start().await;
    let urls = mount_articles(&server, &["a1", "a2", "a3"]).await;
    mount_xml(&server, "/sitemap.xml", urlset(&urls)).await;
    let sitemap = format!("{}/sitemap.xml", server.uri());

    let store = Arc::new(MemoryArticleStore::new());
    let spec = sitemap_pipeline(&PipelineDeps::new(store.clone()), WorkerCounts::default()).unwrap();
    let pipeline = Pipeline::new(spec);

    pipeline.run(&CancellationToken::new(), &sitemap).await.unwrap();
    let first = snapshot(&store).await;
    pipeline.run(&CancellationToken::new(), &sitemap).await.unwrap();
    let second = snapshot(&store).await;

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

async fn snapshot(store: &MemoryArticleStore) -> Vec<(String, String, String)> {
    let mut rows: Vec<_> = store
        .all_articles()
        .await
        .unwrap()
        .into_iter()
        .map(|article| (article.url, article.title, article.text))
        .collect();
    rows.sort();
    rows
}

#[tokio::test]
async fn cancelled_before_start_returns_cleanly() {
    let store = Arc::new(MemoryArticleStore::new());
    let spec = PipelineSpec::new(
        vec![
            StageSpec::fetcher("source", 2, ListSource::numbered("u", 50)),
            StageSpec::fetcher("expand", 3, FanOut::new(2)),
        ],
        sink(store.clone(), 2, FakeProcessor::default()),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let recorder = Recorder::default();
    let summary = tokio::time::timeout(
        Duration::from_secs(5),
        Pipeline::new(spec).with_observer(recorder.observer()).run(&cancel, "x"),
    )
    .await
    .expect("run did not stop")
    .unwrap();

    assert_eq!(summary.saved, 0);
    assert_eq!(recorder.closed_queues(), vec![0, 1]);
    let started = recorder.count(|e| matches!(e, PipelineEvent::WorkerStarted { .. }));
    let stopped = recorder.count(|e| matches!(e, PipelineEvent::WorkerStopped { .. }));
    assert_eq!(started, 7);
    assert_eq!(stopped, 7);
}

#[tokio::test]
async fn cancellation_unblocks_stalled_stages() {
    let store = Arc::new(MemoryArticleStore::new());
    let spec = PipelineSpec::new(
        vec![
            StageSpec::generator("source", 1, ListSource::numbered("u", 500)),
            StageSpec::fetcher("stalled", 2, Stalled),
        ],
        sink(store.clone(), 1, FakeProcessor::default()),
    );
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let recorder = Recorder::default();
    let summary = tokio::time::timeout(
        Duration::from_secs(5),
        Pipeline::new(spec).with_observer(recorder.observer()).run(&cancel, "x"),
    )
    .await
    .expect("run did not stop")
    .unwrap();

    assert_eq!(summary.saved, 0);
    assert!(recorder.failures().is_empty());
    assert_eq!(recorder.closed_queues(), vec![0, 1]);
    assert_eq!(
        recorder.count(|e| matches!(e, PipelineEvent::WorkerStopped { .. })),
        4
    );
}
