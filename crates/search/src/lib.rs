//! toolscout search/scrape infrastructure adapter.
//!
//! Implements the [`pipeline::SearchProvider`] trait over Firecrawl's v1
//! `search` and `scrape` endpoints.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Authentication, request bodies, and response decoding
//! live here. Failures are reported as [`pipeline::SearchError`]; deciding
//! whether a failure is fatal is left to the stages. No retries are attempted
//! at this layer.

pub mod firecrawl;

pub use firecrawl::{FirecrawlClient, FirecrawlConfig, DEFAULT_BASE_URL};
