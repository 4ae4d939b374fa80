fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=proto/run_function.proto");

    // Only generate protobuf bindings when the gRPC transport feature is enabled.
    // Library-only builds then never need `protoc`.
    if std::env::var_os("CARGO_FEATURE_TRANSPORT_GRPC").is_none() {
        return Ok(());
    }

    // Prefer a vendored protoc to avoid requiring a system installation.
    let protoc_path = protoc_bin_vendored::protoc_bin_path()
        .map_err(|e| format!("failed to locate vendored protoc: {e}"))?;
    std::env::set_var("PROTOC", protoc_path);

    // The well-known types (Struct, Duration) ship alongside the vendored binary.
    let well_known = protoc_bin_vendored::include_path()
        .map_err(|e| format!("failed to locate vendored protobuf includes: {e}"))?;

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(
            &["proto/run_function.proto"],
            &[std::path::PathBuf::from("proto/"), well_known],
        )?;
    Ok(())
}
