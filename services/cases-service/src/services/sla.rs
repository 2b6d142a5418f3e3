//! SLA dictionary gRPC implementation.

use super::{now_millis, require_duration, require_input, require_text, CasesState};
use crate::auth::authorize;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{field_names, FieldMask, ListQuery, Record, RowRef};
use cases_proto::cases::{
    slas_server::Slas, CreateSlaRequest, DeleteSlaRequest, InputSla, ListSlasRequest,
    LocateSlaRequest, LocateSlaResponse, Sla, SlaList, UpdateSlaRequest,
};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{debug, info};

const SERVICE: &str = "Slas";

/// SLA service implementation.
#[derive(Debug, Clone)]
pub struct SlaServiceImpl {
    state: Arc<CasesState>,
}

impl SlaServiceImpl {
    /// Create the service over shared tables.
    #[must_use]
    pub const fn new(state: Arc<CasesState>) -> Self {
        Self { state }
    }

    /// Copy the masked input fields onto `sla` and validate the result.
    fn apply(sla: &mut Sla, input: InputSla, mask: &FieldMask) -> ServiceResult<()> {
        if mask.contains("name") {
            sla.name = require_text("name", &input.name)?;
        }
        if mask.contains("description") {
            sla.description = input.description;
        }
        if mask.contains("valid_from") {
            sla.valid_from = input.valid_from;
        }
        if mask.contains("valid_to") {
            sla.valid_to = input.valid_to;
        }
        if mask.contains("calendar") {
            sla.calendar = input.calendar.filter(|c| c.id > 0);
        }
        if mask.contains("reaction_time") {
            sla.reaction_time = require_duration("reaction_time", input.reaction_time)?;
        }
        if mask.contains("resolution_time") {
            sla.resolution_time = require_duration("resolution_time", input.resolution_time)?;
        }

        if sla.valid_from > 0 && sla.valid_to > 0 && sla.valid_to < sla.valid_from {
            return Err(ServiceError::invalid("valid_to must not precede valid_from"));
        }
        Ok(())
    }
}

#[tonic::async_trait]
impl Slas for SlaServiceImpl {
    async fn list_slas(
        &self,
        request: Request<ListSlasRequest>,
    ) -> Result<Response<SlaList>, Status> {
        authorize(&request, SERVICE, "ListSlas")?;
        let req = request.into_inner();

        let query = ListQuery::new(req.page, req.size, self.state.limits)
            .search(&req.q)?
            .sort(&req.sort)
            .fields(&req.fields)
            .ids(&req.id);
        let page = self.state.slas.list(None, &query);
        debug!(page = page.page, count = page.items.len(), "Listed SLAs");

        Ok(Response::new(SlaList {
            page: page.page,
            next: page.next,
            items: page.into_values(),
        }))
    }

    async fn create_sla(
        &self,
        request: Request<CreateSlaRequest>,
    ) -> Result<Response<Sla>, Status> {
        let caller = authorize(&request, SERVICE, "CreateSla")?;
        let input = require_input(request.into_inner().input)?;

        let mut sla = Sla::default();
        Self::apply(&mut sla, input, &FieldMask::default())?;
        sla.touch_created(&caller.user, now_millis());

        let row = self.state.slas.insert(sla);
        info!(id = row.value.id, name = %row.value.name, "SLA created");
        Ok(Response::new(row.value))
    }

    async fn update_sla(
        &self,
        request: Request<UpdateSlaRequest>,
    ) -> Result<Response<Sla>, Status> {
        let caller = authorize(&request, SERVICE, "UpdateSla")?;
        let req = request.into_inner();
        let input = require_input(req.input)?;
        let mask = FieldMask::new(&req.x_json_mask);

        let row = self
            .state
            .slas
            .update(RowRef::id(req.id), |sla| {
                Self::apply(sla, input, &mask)?;
                sla.touch_updated(&caller.user, now_millis());
                Ok::<_, ServiceError>(())
            })?;
        info!(id = row.value.id, ver = row.ver, "SLA updated");
        Ok(Response::new(row.value))
    }

    async fn delete_sla(
        &self,
        request: Request<DeleteSlaRequest>,
    ) -> Result<Response<Sla>, Status> {
        authorize(&request, SERVICE, "DeleteSla")?;
        let id = request.into_inner().id;

        let _guard = self.state.write_lock.lock();
        let row = self.state.slas.remove(RowRef::id(id)).map_err(ServiceError::from)?;
        let conditions = self.state.sla_conditions.remove_scope(id);
        info!(id, conditions, "SLA deleted");
        Ok(Response::new(row.value))
    }

    async fn locate_sla(
        &self,
        request: Request<LocateSlaRequest>,
    ) -> Result<Response<LocateSlaResponse>, Status> {
        authorize(&request, SERVICE, "LocateSla")?;
        let req = request.into_inner();

        let row = self.state.slas.get(RowRef::id(req.id)).map_err(ServiceError::from)?;
        Ok(Response::new(LocateSlaResponse {
            sla: Some(row.value.project(&field_names(&req.fields))),
        }))
    }
}
