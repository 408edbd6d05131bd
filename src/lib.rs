//! # sales-rollup
//!
//! Aggregates per-department sales totals from CSV uploads through an
//! asynchronous job pipeline.
//!
//! ## Usage
//!
//! ```bash
//! sales-rollup serve --bind 127.0.0.1:8080
//! sales-rollup submit sales.csv --server http://127.0.0.1:8080 -o totals.csv
//! sales-rollup aggregate sales.csv
//! ```
//!
//! ## Modules
//!
//! - `codec` - Lenient sales CSV parsing and result CSV serialization
//! - `aggregate` - Per-department totals, ordered by total descending
//! - `storage` - Job/result document store with memory and file backends
//! - `job` - Job lifecycle controller and status queries
//! - `worker` - Background dispatcher that processes created jobs
//! - `client` - Local and HTTP clients plus the status poller
//! - `server` - axum HTTP API
//! - `app` - Configuration, logging and runtime wiring
//! - `cli` - Command-line entry points
pub mod aggregate;
pub mod app;
pub mod cli;
pub mod client;
pub mod codec;
pub mod error;
pub mod job;
pub mod server;
pub mod storage;
pub mod worker;

pub use error::{Error, LibResult};
