//! Network listeners.
//!
//! Each transport is bound during startup (a bind failure is fatal) and then
//! served as an independent lifecycle unit that stops accepting when the
//! shutdown token fires and returns once its in-flight calls have finished.
//!
//! - [`grpc::GrpcTransport`] - `profile.v1.UserService`, health and reflection.
//! - [`http::HttpTransport`] - the HTTP/JSON gateway.

pub mod grpc;
pub mod http;
