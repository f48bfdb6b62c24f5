pub mod client;
pub mod decode;
pub mod errors;
pub mod types;

pub use client::{DEFAULT_REQUEST_TIMEOUT, HttpClient, HttpProfile, SOFT_ERROR_MARKER};
pub use errors::FetchError;
pub use types::{Charset, Download, PageResponse};
