//! Server-side implementation of the profile service.
//!
//! ## Structure
//!
//! - [`app`] - Composition root: builds every component and runs them.
//! - [`config`] - CLI/environment configuration.
//! - [`gateway`] - HTTP/JSON gateway.
//! - [`lifecycle`] - Start, drain and stop coordination.
//! - [`service`] - The resource service and its gRPC handler.
//! - [`store`] - Storage adapters.
//! - [`telemetry`] - Logging setup and per-call logging.
//! - [`transport`] - gRPC and HTTP listeners.

pub mod app;
pub mod config;
pub mod gateway;
pub mod lifecycle;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod transport;
