//! Build script for compiling the webitel cases Protocol Buffer definitions.
//!
//! Generates message types, gRPC clients and servers, and a file descriptor
//! set consumed by the gRPC reflection service.

use std::env;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_files = [
        "proto/webitel/cases/lookup.proto",
        "proto/webitel/cases/sla.proto",
        "proto/webitel/cases/sla_condition.proto",
        "proto/webitel/cases/close_reason.proto",
        "proto/webitel/cases/reason.proto",
        "proto/webitel/cases/source.proto",
        "proto/webitel/cases/status.proto",
        "proto/webitel/cases/status_condition.proto",
        "proto/webitel/cases/priority.proto",
        "proto/webitel/cases/case_comment.proto",
        "proto/webitel/cases/case_link.proto",
    ];

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .file_descriptor_set_path(out_dir.join("webitel_cases_descriptor.bin"))
        .compile_protos(&proto_files, &["proto/"])?;

    // Re-run build if any proto file changes
    for proto in &proto_files {
        println!("cargo:rerun-if-changed={proto}");
    }

    Ok(())
}
