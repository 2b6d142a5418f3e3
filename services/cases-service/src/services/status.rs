//! Status group gRPC implementation.

use super::{now_millis, require_input, require_text, CasesState};
use crate::auth::authorize;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{field_names, FieldMask, ListQuery, Record, RowRef};
use cases_proto::cases::{
    statuses_server::Statuses, CreateStatusRequest, DeleteStatusRequest, InputStatus,
    ListStatusesRequest, LocateStatusRequest, LocateStatusResponse, Status as CaseStatus,
    StatusList, UpdateStatusRequest,
};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{debug, info};

const SERVICE: &str = "Statuses";

/// Status group service implementation.
#[derive(Debug, Clone)]
pub struct StatusServiceImpl {
    state: Arc<CasesState>,
}

impl StatusServiceImpl {
    /// Create the service over shared tables.
    #[must_use]
    pub const fn new(state: Arc<CasesState>) -> Self {
        Self { state }
    }

    fn apply(status: &mut CaseStatus, input: InputStatus, mask: &FieldMask) -> ServiceResult<()> {
        if mask.contains("name") {
            status.name = require_text("name", &input.name)?;
        }
        if mask.contains("description") {
            status.description = input.description;
        }
        Ok(())
    }
}

#[tonic::async_trait]
impl Statuses for StatusServiceImpl {
    async fn list_statuses(
        &self,
        request: Request<ListStatusesRequest>,
    ) -> Result<Response<StatusList>, Status> {
        authorize(&request, SERVICE, "ListStatuses")?;
        let req = request.into_inner();

        let query = ListQuery::new(req.page, req.size, self.state.limits)
            .search(&req.q)?
            .sort(&req.sort)
            .fields(&req.fields)
            .ids(&req.id);
        let page = self.state.statuses.list(None, &query);
        debug!(page = page.page, count = page.items.len(), "Listed statuses");

        Ok(Response::new(StatusList {
            page: page.page,
            next: page.next,
            items: page.into_values(),
        }))
    }

    async fn create_status(
        &self,
        request: Request<CreateStatusRequest>,
    ) -> Result<Response<CaseStatus>, Status> {
        let caller = authorize(&request, SERVICE, "CreateStatus")?;
        let input = require_input(request.into_inner().input)?;

        let mut status = CaseStatus::default();
        Self::apply(&mut status, input, &FieldMask::default())?;
        status.touch_created(&caller.user, now_millis());

        let row = self.state.statuses.insert(status);
        info!(id = row.value.id, name = %row.value.name, "Status created");
        Ok(Response::new(row.value))
    }

    async fn update_status(
        &self,
        request: Request<UpdateStatusRequest>,
    ) -> Result<Response<CaseStatus>, Status> {
        let caller = authorize(&request, SERVICE, "UpdateStatus")?;
        let req = request.into_inner();
        let input = require_input(req.input)?;
        let mask = FieldMask::new(&req.x_json_mask);

        let row = self
            .state
            .statuses
            .update(RowRef::id(req.id), |status| {
                Self::apply(status, input, &mask)?;
                status.touch_updated(&caller.user, now_millis());
                Ok::<_, ServiceError>(())
            })?;
        info!(id = row.value.id, ver = row.ver, "Status updated");
        Ok(Response::new(row.value))
    }

    async fn delete_status(
        &self,
        request: Request<DeleteStatusRequest>,
    ) -> Result<Response<CaseStatus>, Status> {
        authorize(&request, SERVICE, "DeleteStatus")?;
        let id = request.into_inner().id;

        let _guard = self.state.write_lock.lock();
        let row = self
            .state
            .statuses
            .remove(RowRef::id(id))
            .map_err(ServiceError::from)?;
        let conditions = self.state.status_conditions.remove_scope(id);
        info!(id, conditions, "Status deleted");
        Ok(Response::new(row.value))
    }

    async fn locate_status(
        &self,
        request: Request<LocateStatusRequest>,
    ) -> Result<Response<LocateStatusResponse>, Status> {
        authorize(&request, SERVICE, "LocateStatus")?;
        let req = request.into_inner();

        let row = self
            .state
            .statuses
            .get(RowRef::id(req.id))
            .map_err(ServiceError::from)?;
        Ok(Response::new(LocateStatusResponse {
            status: Some(row.value.project(&field_names(&req.fields))),
        }))
    }
}
