//! Command-line interface of the `harvest` binary.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::pipeline::{PaginationWorkers, WorkerCounts};

#[derive(Parser, Debug)]
#[command(author, version, about = "Crawl blog articles into a document store")]
pub struct Cli {
    /// Only keep article URLs containing this path segment
    #[arg(long, global = true, value_name = "PATH-SUBSTRING")]
    pub url_filter: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crawl every URL listed in an XML sitemap or sitemap index
    Sitemap {
        url: String,
        #[command(flatten)]
        workers: SingleStageWorkers,
    },

    /// Crawl every item of an RSS or Atom feed
    Rss {
        url: String,
        #[command(flatten)]
        workers: SingleStageWorkers,
    },

    /// Crawl the URLs listed one per line in a local file
    File {
        path: PathBuf,
        #[command(flatten)]
        workers: SingleStageWorkers,
    },

    /// Walk /page/1, /page/2, ... until a page is missing, crawling the
    /// articles each listing page links to
    Paginate {
        base_url: String,
        /// Page path with one %d placeholder, e.g. /page/%d
        pattern: String,
        /// URL extractor name; picked from the base URL when omitted
        extractor: Option<String>,
        /// Accepted for compatibility; pages are generated one at a time
        #[arg(default_value_t = 10)]
        pages_per_batch: usize,
        #[arg(default_value_t = 1)]
        page_gen_workers: usize,
        #[arg(default_value_t = 3)]
        html_fetcher_workers: usize,
        #[arg(default_value_t = 5)]
        content_workers: usize,
    },

    /// Copy every stored article into the relational store
    Replicate,

    /// Store podcast episodes listed in a sitemap together with the PDF or
    /// text transcript each episode page links to
    Transcripts {
        sitemap_url: String,
        /// Episodes taken from the sitemap; 0 takes all of them
        #[arg(long, default_value_t = 100)]
        max: usize,
        #[arg(long, default_value_t = 100)]
        workers: usize,
    },

    /// Run a URL extractor on a local HTML file and print what it finds
    Extract {
        html_file: PathBuf,
        extractor: String,
        /// URL the page was served from, for resolving relative links
        #[arg(long, default_value = "https://example.com/")]
        page_url: String,
        /// Print one JSON object per URL instead of tab-separated lines
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone, Copy)]
pub struct SingleStageWorkers {
    #[arg(default_value_t = 2)]
    pub url_fetcher_workers: usize,
    #[arg(default_value_t = 3)]
    pub content_workers: usize,
}

impl From<SingleStageWorkers> for WorkerCounts {
    fn from(workers: SingleStageWorkers) -> Self {
        Self {
            url_fetchers: workers.url_fetcher_workers,
            content: workers.content_workers,
        }
    }
}

impl Command {
    /// Worker counts of a `paginate` invocation.
    pub fn pagination_workers(&self) -> Option<PaginationWorkers> {
        match self {
            Command::Paginate {
                page_gen_workers,
                html_fetcher_workers,
                content_workers,
                ..
            } => Some(PaginationWorkers {
                page_generators: *page_gen_workers,
                html_fetchers: *html_fetcher_workers,
                content: *content_workers,
            }),
            _ => None,
        }
    }
}
