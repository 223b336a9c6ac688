//! Shared protocol, types and error definitions.
//!
//! ## Submodules
//!
//! - [`error`] - Service error taxonomy and its gRPC status mapping.
//! - [`types`] - The managed `User` resource, field masks and pagination
//!   constants.
//! - [`proto`] - Generated protobuf messages, server trait and client.

pub mod error;
pub mod types;

pub use error::{Error, Result};

/// gRPC service and message definitions generated from `proto/profile.proto`.
pub mod proto {
    tonic::include_proto!("profile.v1");

    /// Encoded descriptor set, registered with the reflection service.
    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("profile_descriptor");
}
