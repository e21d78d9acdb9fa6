//! This crate provides an X-Ray server: an audit store for multi-step data pipelines. Pipelines
//! record each run, the ordered steps of the run, and the candidates each step considered,
//! together with whether each candidate was selected or rejected and why. The recorded data can
//! then be queried, and rejection statistics aggregated over filtering steps, to explain why a
//! pipeline produced the output it did.
//!
//! The X-Ray server is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team. Axum performs well in [various](https://github.com/programatik29/rust-web-benchmarks/blob/master/result/hello-world.md) [benchmarks](https://web-frameworks-benchmark.netlify.app/result?l=rust)
//!   and is built on top of various popular components, including the [hyper] HTTP library.
//! * [Serde](serde) performs (de)serialisation of JSON request and response data.
//! * [sled] is an embedded database used to persist runs, steps and candidates.
//! * [Rayon](rayon) optionally parallelises the aggregation of filtering statistics.

pub mod analytics;
pub mod app;
pub mod app_state;
pub mod cli;
pub mod error;
pub mod metrics;
pub mod models;
pub mod server;
pub mod store;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod validated_json;
