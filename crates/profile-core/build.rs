/// Builds the gRPC client and server code for `proto/profile.proto` using
/// `tonic-prost-build`.
///
/// The generated module exposes the `UserService` server trait, the matching
/// client, every request/response message, and an encoded file descriptor set
/// used by the server's reflection service.
///
/// Well-known types (`google.protobuf.Empty`, `google.protobuf.FieldMask`) are
/// mapped onto `prost-types`.
///
/// # Panics
///
/// Panics if code generation fails. Build scripts have no caller to report
/// to, so failing loudly is the only useful behaviour.
///
/// # Output
///
/// ```rust,ignore
/// pub mod proto {
///     tonic::include_proto!("profile.v1");
/// }
/// ```
use std::env;
use std::path::PathBuf;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("profile_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/profile.proto"], &["proto"])
        .unwrap();

    println!("cargo:rerun-if-changed=proto/profile.proto");
}
