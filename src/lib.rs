pub mod cli;
pub mod config;
pub mod entities;
pub mod extractor;
pub mod fetcher;
pub mod pipeline;
pub mod replication;
pub mod repositories;
pub mod transcripts;
pub mod urls;
