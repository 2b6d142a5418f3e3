//! Close reason gRPC implementation. Reasons belong to a close reason group.

use super::{now_millis, require_id, require_input, require_text, CasesState};
use crate::auth::authorize;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{field_names, FieldMask, ListQuery, Record, RowRef, StoreError};
use cases_proto::cases::{
    reasons_server::Reasons, CloseReason, CreateReasonRequest, DeleteReasonRequest, InputReason,
    ListReasonsRequest, LocateReasonRequest, LocateReasonResponse, Reason, ReasonList,
    UpdateReasonRequest,
};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{debug, info};

const SERVICE: &str = "Reasons";

/// Close reason service implementation.
#[derive(Debug, Clone)]
pub struct ReasonServiceImpl {
    state: Arc<CasesState>,
}

impl ReasonServiceImpl {
    /// Create the service over shared tables.
    #[must_use]
    pub const fn new(state: Arc<CasesState>) -> Self {
        Self { state }
    }

    fn group(&self, close_reason_id: i64) -> ServiceResult<i64> {
        let id = require_id("close_reason_id", close_reason_id)?;
        if self.state.close_reasons.contains(id) {
            Ok(id)
        } else {
            Err(StoreError::NotFound {
                kind: <CloseReason as Record>::KIND,
                id,
            }
            .into())
        }
    }

    fn apply(reason: &mut Reason, input: InputReason, mask: &FieldMask) -> ServiceResult<()> {
        if mask.contains("name") {
            reason.name = require_text("name", &input.name)?;
        }
        if mask.contains("description") {
            reason.description = input.description;
        }
        Ok(())
    }
}

#[tonic::async_trait]
impl Reasons for ReasonServiceImpl {
    async fn list_reasons(
        &self,
        request: Request<ListReasonsRequest>,
    ) -> Result<Response<ReasonList>, Status> {
        authorize(&request, SERVICE, "ListReasons")?;
        let req = request.into_inner();
        let group = self.group(req.close_reason_id)?;

        let query = ListQuery::new(req.page, req.size, self.state.limits)
            .search(&req.q)?
            .sort(&req.sort)
            .fields(&req.fields)
            .ids(&req.id);
        let page = self.state.reasons.list(Some(group), &query);
        debug!(close_reason_id = group, count = page.items.len(), "Listed close reasons");

        Ok(Response::new(ReasonList {
            page: page.page,
            next: page.next,
            items: page.into_values(),
        }))
    }

    async fn create_reason(
        &self,
        request: Request<CreateReasonRequest>,
    ) -> Result<Response<Reason>, Status> {
        let caller = authorize(&request, SERVICE, "CreateReason")?;
        let req = request.into_inner();
        let input = require_input(req.input)?;

        let _guard = self.state.write_lock.lock();
        let group = self.group(req.close_reason_id)?;
        let mut reason = Reason {
            close_reason_id: group,
            ..Default::default()
        };
        Self::apply(&mut reason, input, &FieldMask::default())?;
        reason.touch_created(&caller.user, now_millis());

        let row = self.state.reasons.insert(reason);
        info!(close_reason_id = group, id = row.value.id, "Close reason created");
        Ok(Response::new(row.value))
    }

    async fn update_reason(
        &self,
        request: Request<UpdateReasonRequest>,
    ) -> Result<Response<Reason>, Status> {
        let caller = authorize(&request, SERVICE, "UpdateReason")?;
        let req = request.into_inner();
        let input = require_input(req.input)?;
        let mask = FieldMask::new(&req.x_json_mask);
        let group = self.group(req.close_reason_id)?;

        let row = self
            .state
            .reasons
            .update(RowRef::id(req.id).in_scope(group), |reason| {
                Self::apply(reason, input, &mask)?;
                reason.touch_updated(&caller.user, now_millis());
                Ok::<_, ServiceError>(())
            })?;
        info!(close_reason_id = group, id = row.value.id, ver = row.ver, "Close reason updated");
        Ok(Response::new(row.value))
    }

    async fn delete_reason(
        &self,
        request: Request<DeleteReasonRequest>,
    ) -> Result<Response<Reason>, Status> {
        authorize(&request, SERVICE, "DeleteReason")?;
        let req = request.into_inner();
        let group = self.group(req.close_reason_id)?;

        let row = self
            .state
            .reasons
            .remove(RowRef::id(req.id).in_scope(group))
            .map_err(ServiceError::from)?;
        info!(close_reason_id = group, id = req.id, "Close reason deleted");
        Ok(Response::new(row.value))
    }

    async fn locate_reason(
        &self,
        request: Request<LocateReasonRequest>,
    ) -> Result<Response<LocateReasonResponse>, Status> {
        authorize(&request, SERVICE, "LocateReason")?;
        let req = request.into_inner();
        let group = self.group(req.close_reason_id)?;

        let row = self
            .state
            .reasons
            .get(RowRef::id(req.id).in_scope(group))
            .map_err(ServiceError::from)?;
        Ok(Response::new(LocateReasonResponse {
            reason: Some(row.value.project(&field_names(&req.fields))),
        }))
    }
}
