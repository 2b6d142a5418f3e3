//! Webitel cases Protocol Buffer definitions.
//!
//! This crate provides the gRPC service definitions and message types of the
//! case-management dictionaries API, together with the [`webitel`] registry
//! that maps every RPC to its access level and HTTP gateway bindings.
//!
//! # Services
//!
//! - `Slas` / `SlaConditions` - service level agreements and their thresholds
//! - `CloseReasons` / `Reasons` - close reason groups and their reasons
//! - `Sources` - channels a case can originate from
//! - `Statuses` / `StatusConditions` - status groups and their states
//! - `Priorities` - case priorities
//! - `CaseComments` / `CaseLinks` - comments and links attached to a case
//!
//! # Generated Code
//!
//! Everything under [`cases`] is auto-generated from Protocol Buffer
//! definitions using `tonic-build`. Clippy lints for generated code are
//! configured in `Cargo.toml`.

pub mod webitel;

/// Webitel cases API, package `webitel.cases`.
#[allow(missing_docs)]
pub mod cases {
    tonic::include_proto!("webitel.cases");
}

/// Encoded file descriptor set for gRPC server reflection.
pub const FILE_DESCRIPTOR_SET: &[u8] =
    tonic::include_file_descriptor_set!("webitel_cases_descriptor");
