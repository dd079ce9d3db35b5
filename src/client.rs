//! The client facade.
//!
//! Implementation is split into submodules under `src/client/`: construction, single-call
//! dispatch and batch fan-out.

mod batch;
pub mod builder;
mod core;
mod dispatch;

pub use builder::ApiClientBuilder;
pub use core::ApiClient;
