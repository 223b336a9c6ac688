//! The resource service and the policies it applies.
//!
//! ## Structure
//!
//! - [`resource`] - `ProfileService`, the five CRUD operations over a store.
//! - [`handler`] - gRPC entry point (`UserHandler`).
//! - [`mask`] - Field mask resolution for updates and projections.
//! - [`page`] - Pagination normalization.

pub mod handler;
pub mod mask;
pub mod page;
pub mod resource;
