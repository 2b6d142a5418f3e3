//! Close reason group gRPC implementation.

use super::{now_millis, require_input, require_text, CasesState};
use crate::auth::authorize;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{field_names, FieldMask, ListQuery, Record, RowRef};
use cases_proto::cases::{
    close_reasons_server::CloseReasons, CloseReason, CloseReasonList, CreateCloseReasonRequest,
    DeleteCloseReasonRequest, InputCloseReason, ListCloseReasonsRequest, LocateCloseReasonRequest,
    LocateCloseReasonResponse, UpdateCloseReasonRequest,
};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{debug, info};

const SERVICE: &str = "CloseReasons";

/// Close reason group service implementation.
#[derive(Debug, Clone)]
pub struct CloseReasonServiceImpl {
    state: Arc<CasesState>,
}

impl CloseReasonServiceImpl {
    /// Create the service over shared tables.
    #[must_use]
    pub const fn new(state: Arc<CasesState>) -> Self {
        Self { state }
    }

    fn apply(
        group: &mut CloseReason,
        input: InputCloseReason,
        mask: &FieldMask,
    ) -> ServiceResult<()> {
        if mask.contains("name") {
            group.name = require_text("name", &input.name)?;
        }
        if mask.contains("description") {
            group.description = input.description;
        }
        Ok(())
    }
}

#[tonic::async_trait]
impl CloseReasons for CloseReasonServiceImpl {
    async fn list_close_reasons(
        &self,
        request: Request<ListCloseReasonsRequest>,
    ) -> Result<Response<CloseReasonList>, Status> {
        authorize(&request, SERVICE, "ListCloseReasons")?;
        let req = request.into_inner();

        let query = ListQuery::new(req.page, req.size, self.state.limits)
            .search(&req.q)?
            .sort(&req.sort)
            .fields(&req.fields)
            .ids(&req.id);
        let page = self.state.close_reasons.list(None, &query);
        debug!(page = page.page, count = page.items.len(), "Listed close reason groups");

        Ok(Response::new(CloseReasonList {
            page: page.page,
            next: page.next,
            items: page.into_values(),
        }))
    }

    async fn create_close_reason(
        &self,
        request: Request<CreateCloseReasonRequest>,
    ) -> Result<Response<CloseReason>, Status> {
        let caller = authorize(&request, SERVICE, "CreateCloseReason")?;
        let input = require_input(request.into_inner().input)?;

        let mut group = CloseReason::default();
        Self::apply(&mut group, input, &FieldMask::default())?;
        group.touch_created(&caller.user, now_millis());

        let row = self.state.close_reasons.insert(group);
        info!(id = row.value.id, name = %row.value.name, "Close reason group created");
        Ok(Response::new(row.value))
    }

    async fn update_close_reason(
        &self,
        request: Request<UpdateCloseReasonRequest>,
    ) -> Result<Response<CloseReason>, Status> {
        let caller = authorize(&request, SERVICE, "UpdateCloseReason")?;
        let req = request.into_inner();
        let input = require_input(req.input)?;
        let mask = FieldMask::new(&req.x_json_mask);

        let row = self
            .state
            .close_reasons
            .update(RowRef::id(req.id), |group| {
                Self::apply(group, input, &mask)?;
                group.touch_updated(&caller.user, now_millis());
                Ok::<_, ServiceError>(())
            })?;
        info!(id = row.value.id, ver = row.ver, "Close reason group updated");
        Ok(Response::new(row.value))
    }

    async fn delete_close_reason(
        &self,
        request: Request<DeleteCloseReasonRequest>,
    ) -> Result<Response<CloseReason>, Status> {
        authorize(&request, SERVICE, "DeleteCloseReason")?;
        let id = request.into_inner().id;

        let _guard = self.state.write_lock.lock();
        let row = self
            .state
            .close_reasons
            .remove(RowRef::id(id))
            .map_err(ServiceError::from)?;
        let reasons = self.state.reasons.remove_scope(id);
        info!(id, reasons, "Close reason group deleted");
        Ok(Response::new(row.value))
    }

    async fn locate_close_reason(
        &self,
        request: Request<LocateCloseReasonRequest>,
    ) -> Result<Response<LocateCloseReasonResponse>, Status> {
        authorize(&request, SERVICE, "LocateCloseReason")?;
        let req = request.into_inner();

        let row = self
            .state
            .close_reasons
            .get(RowRef::id(req.id))
            .map_err(ServiceError::from)?;
        Ok(Response::new(LocateCloseReasonResponse {
            close_reason: Some(row.value.project(&field_names(&req.fields))),
        }))
    }
}
