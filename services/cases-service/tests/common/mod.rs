//! Shared helpers for the cases-service integration tests.

#![allow(dead_code)]

use cases_proto::webitel::Access;
use cases_service::{Caller, CasesState, Etag, EtagKind, Grants};
use std::sync::Arc;
use tonic::Request;

/// Fresh in-memory tables.
pub fn state() -> Arc<CasesState> {
    Arc::new(CasesState::default())
}

/// Caller with full access on the dictionaries and cases object classes.
pub fn admin(id: i64) -> Caller {
    Caller::new(id, format!("user {id}"), Grants::superuser())
}

/// Caller that may only read dictionaries.
pub fn reader(id: i64) -> Caller {
    Caller::new(id, "reader", Grants::default().with("dictionaries", [Access::Read]))
}

/// Wrap a message in a request that already passed the authenticator.
pub fn request<T>(message: T, caller: &Caller) -> Request<T> {
    let mut request = Request::new(message);
    request.extensions_mut().insert(caller.clone());
    request
}

/// Etag of a case.
pub fn case_etag(id: i64) -> String {
    Etag::new(EtagKind::Case, id, 1).encode()
}
