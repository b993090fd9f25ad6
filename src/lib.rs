// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::needless_pass_by_value)]

//! # Billomat API client
//!
//! An async client for the Billomat invoicing API with complete
//! collection retrieval.
//!
//! ## Features
//!
//! - **Resource Table**: Every Billomat collection with its data key and parent key
//! - **Sequential Pagination**: Page 1 fixes the page count, pages follow in order
//! - **Concurrent Batches**: Many page requests in flight, merged once all settle
//! - **Envelope Parsing**: Numeric strings, single-object pages and empty collections
//! - **Retry and Throttling**: Backoff, governor rate limiting and a 429 hook
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use billomat_client::{resource, BillomatClient, ClientConfig, Filters, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = BillomatClient::new(ClientConfig::new("acme", "api-key"))?;
//!
//!     // Every invoice, one page after another
//!     let invoices = client.list(resource::INVOICES, Filters::new()).await?;
//!
//!     // Items of several invoices at once
//!     let ids: Vec<String> = invoices
//!         .iter()
//!         .filter_map(|i| i.get("id").and_then(|v| v.as_str()).map(String::from))
//!         .collect();
//!     let items = client.list_children(resource::INVOICE_ITEMS, &ids).await?;
//!
//!     println!("{} invoices, {} items", invoices.len(), items.records.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      BillomatClient                         │
//! │  list · list_concurrent · list_children · get · create ...  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌───────────┬────────────────┴───────────┬───────────┬────────┐
//! │ Resource  │        Pagination          │   HTTP    │  Auth  │
//! ├───────────┼────────────────────────────┼───────────┼────────┤
//! │ Paths     │ Envelope parsing           │ Retry     │ API key│
//! │ Data keys │ Sequential aggregator      │ Rate limit│ App id │
//! │ Parents   │ Concurrent collector       │ 429 hook  │        │
//! └───────────┴────────────────────────────┴───────────┴────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the client
pub mod error;

/// Common types and type aliases
pub mod types;

/// Billomat resource table
pub mod resource;

/// Authentication headers
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Pagination and batch collection
pub mod pagination;

/// Client configuration
pub mod config;

/// Resource-level operations
pub mod client;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::BillomatClient;
pub use config::{ClientConfig, PaginationSettings, RateLimitSettings};
pub use error::{Error, Result};
pub use pagination::{
    BatchCollector, BatchOptions, BatchOutcome, PageFetcher, PageRequest, PageResult, Paginator,
};
pub use resource::Resource;
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
