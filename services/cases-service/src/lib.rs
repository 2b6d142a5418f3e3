//! Cases service for Webitel.
//!
//! Serves the case-management dictionaries (SLAs, close reasons, sources,
//! statuses, priorities) together with case comments and links over gRPC,
//! keeping every record in memory.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod config;
pub mod error;
pub mod etag;
pub mod server;
pub mod services;
pub mod store;

pub use auth::{Authenticator, Caller, Grants};
pub use config::{AuthConfig, CasesServiceConfig, ListingConfig, ServiceConfig};
pub use error::{ServiceError, ServiceResult};
pub use etag::{Etag, EtagKind};
pub use services::{
    CasesState, CloseReasonServiceImpl, CommentServiceImpl, LinkServiceImpl, PriorityServiceImpl,
    ReasonServiceImpl, SlaConditionServiceImpl, SlaServiceImpl, SourceServiceImpl,
    StatusConditionServiceImpl, StatusServiceImpl,
};
