//! # base-api-client
//!
//! Reusable async core for calling JSON/text HTTP APIs under bounded concurrency.
//!
//! ## Overview
//!
//! Higher-level integrations that target one API each embed this crate for the plumbing
//! they all share:
//!
//! - **Concurrency gate**: a per-client semaphore bounding in-flight attempts
//! - **Retry engine**: randomized exponential backoff on transient failures and `503`
//! - **Dispatcher**: `GET`/`POST`/`PUT`/`DELETE` against `base_uri + endpoint` with proxy,
//!   TLS and auth applied uniformly
//! - **Classifier**: content-type driven normalization of response bodies
//! - **Aggregator**: success/failure partitioning with flattening, cleanup and sorting
//!
//! A batch never aborts because one call failed. Only configuration-class errors surface as
//! `Err`, and they do so before any network activity.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use base_api_client::{ApiClient, CallRequest, ClientConfig, ProcessOptions};
//!
//! #[tokio::main]
//! async fn main() -> base_api_client::Result<()> {
//!     base_api_client::logging::init(false);
//!
//!     let client = ApiClient::new(ClientConfig::new("https://api.example.com/v1")?)?;
//!     let outcomes = client
//!         .execute_batch(vec![
//!             CallRequest::get("/devices").with_query([("page", "1")]),
//!             CallRequest::get("/devices").with_query([("page", "2")]),
//!         ])
//!         .await?;
//!
//!     let results = client.process_results(
//!         &outcomes,
//!         &ProcessOptions::new().with_data_key("items").with_cleanup(true),
//!     );
//!     println!("{}", results.render(Some(5)));
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Layered configuration and the pure resolver |
//! | [`client`] | Client facade, builder, dispatch and batches |
//! | [`request`] | Call requests and query helpers |
//! | [`response`] | Raw outcomes and the debug dump |
//! | [`transport`] | Transport trait and the reqwest implementation |
//! | [`resilience`] | Concurrency gate and retry engine |
//! | [`classify`] | Response classifier |
//! | [`results`] | Result aggregator |
//! | [`cache`] | Optional GET response cache |
//! | [`telemetry`] | Call event sinks |
//! | [`logging`] | tracing subscriber setup |

pub mod cache;
pub mod classify;
pub mod client;
pub mod config;
pub mod logging;
pub mod request;
pub mod resilience;
pub mod response;
pub mod results;
pub mod telemetry;
pub mod transport;

pub use classify::{classify, ClassifiedOutcome, OutcomeTag, Payload};
pub use client::{ApiClient, ApiClientBuilder};
pub use config::{resolve, ClientConfig, ConfigLayer};
pub use request::{process_params, Body, CallRequest, Method};
pub use response::{FailureKind, RawOutcome, RawResult, ResponseEnvelope, TransportFailure};
pub use results::{BatchSummary, ProcessOptions, Results, SortOrder};
pub use tokio_util::sync::CancellationToken;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
