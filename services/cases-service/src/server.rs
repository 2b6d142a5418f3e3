//! gRPC server assembly.

use crate::auth::Authenticator;
use crate::services::{
    CasesState, CloseReasonServiceImpl, CommentServiceImpl, LinkServiceImpl, PriorityServiceImpl,
    ReasonServiceImpl, SlaConditionServiceImpl, SlaServiceImpl, SourceServiceImpl,
    StatusConditionServiceImpl, StatusServiceImpl,
};
use cases_proto::cases::{
    case_comments_server::CaseCommentsServer, case_links_server::CaseLinksServer,
    close_reasons_server::CloseReasonsServer, priorities_server::PrioritiesServer,
    reasons_server::ReasonsServer, sla_conditions_server::SlaConditionsServer,
    slas_server::SlasServer, sources_server::SourcesServer,
    status_conditions_server::StatusConditionsServer, statuses_server::StatusesServer,
};
use cases_proto::{webitel, FILE_DESCRIPTOR_SET};
use std::sync::Arc;
use tonic::transport::server::Router;
use tonic::transport::Server;
use tonic_health::ServingStatus;

/// Build a router serving every cases service behind `authenticator`, plus
/// the health and reflection services.
///
/// # Errors
///
/// Returns an error if the reflection descriptor set cannot be decoded.
pub async fn router(
    state: Arc<CasesState>,
    authenticator: Authenticator,
) -> anyhow::Result<Router> {
    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    for service in webitel::SERVICES {
        health_reporter
            .set_service_status(service.full_name(), ServingStatus::Serving)
            .await;
    }

    let reflection = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    let router = Server::builder()
        .add_service(SlasServer::with_interceptor(
            SlaServiceImpl::new(state.clone()),
            authenticator,
        ))
        .add_service(SlaConditionsServer::with_interceptor(
            SlaConditionServiceImpl::new(state.clone()),
            authenticator,
        ))
        .add_service(CloseReasonsServer::with_interceptor(
            CloseReasonServiceImpl::new(state.clone()),
            authenticator,
        ))
        .add_service(ReasonsServer::with_interceptor(
            ReasonServiceImpl::new(state.clone()),
            authenticator,
        ))
        .add_service(SourcesServer::with_interceptor(
            SourceServiceImpl::new(state.clone()),
            authenticator,
        ))
        .add_service(StatusesServer::with_interceptor(
            StatusServiceImpl::new(state.clone()),
            authenticator,
        ))
        .add_service(StatusConditionsServer::with_interceptor(
            StatusConditionServiceImpl::new(state.clone()),
            authenticator,
        ))
        .add_service(PrioritiesServer::with_interceptor(
            PriorityServiceImpl::new(state.clone()),
            authenticator,
        ))
        .add_service(CaseCommentsServer::with_interceptor(
            CommentServiceImpl::new(state.clone()),
            authenticator,
        ))
        .add_service(CaseLinksServer::with_interceptor(
            LinkServiceImpl::new(state),
            authenticator,
        ))
        .add_service(reflection)
        .add_service(health_service);

    Ok(router)
}
