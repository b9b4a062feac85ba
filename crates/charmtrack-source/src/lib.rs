//! Client for the external marketplace scrape service plus the ingestion
//! boundary that turns its raw output into validated [`charmtrack_core::Listing`]s.

pub mod client;
pub mod error;
pub mod ingest;
pub mod retry;
pub mod types;

pub use client::ScrapeClient;
pub use error::SourceError;
pub use ingest::ingest_listings;
pub use types::{RawListing, SearchResponse};
