//! Priority dictionary gRPC implementation.

use super::{now_millis, require_input, require_text, CasesState};
use crate::auth::authorize;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{field_names, FieldMask, ListQuery, Record, RowRef};
use cases_proto::cases::{
    priorities_server::Priorities, CreatePriorityRequest, DeletePriorityRequest, InputPriority,
    ListPrioritiesRequest, LocatePriorityRequest, LocatePriorityResponse, Priority, PriorityList,
    UpdatePriorityRequest,
};
use regex::Regex;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{debug, info};

const SERVICE: &str = "Priorities";

const COLOR_PATTERN: &str = "^#[0-9A-Fa-f]{6}$";

/// Normalize a `#RRGGBB` color; empty means no color.
fn parse_color(raw: &str) -> ServiceResult<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(String::new());
    }
    let re = Regex::new(COLOR_PATTERN).map_err(|e| ServiceError::Internal(e.to_string()))?;
    if !re.is_match(raw) {
        return Err(ServiceError::invalid(format!(
            "color must look like #RRGGBB, got {raw}"
        )));
    }
    Ok(raw.to_ascii_uppercase())
}

/// Priority service implementation.
#[derive(Debug, Clone)]
pub struct PriorityServiceImpl {
    state: Arc<CasesState>,
}

impl PriorityServiceImpl {
    /// Create the service over shared tables.
    #[must_use]
    pub const fn new(state: Arc<CasesState>) -> Self {
        Self { state }
    }

    fn apply(
        priority: &mut Priority,
        input: InputPriority,
        mask: &FieldMask,
    ) -> ServiceResult<()> {
        if mask.contains("name") {
            priority.name = require_text("name", &input.name)?;
        }
        if mask.contains("description") {
            priority.description = input.description;
        }
        if mask.contains("color") {
            priority.color = parse_color(&input.color)?;
        }
        Ok(())
    }
}

#[tonic::async_trait]
impl Priorities for PriorityServiceImpl {
    async fn list_priorities(
        &self,
        request: Request<ListPrioritiesRequest>,
    ) -> Result<Response<PriorityList>, Status> {
        authorize(&request, SERVICE, "ListPriorities")?;
        let req = request.into_inner();

        let query = ListQuery::new(req.page, req.size, self.state.limits)
            .search(&req.q)?
            .sort(&req.sort)
            .fields(&req.fields)
            .ids(&req.id);
        let page = self.state.priorities.list(None, &query);
        debug!(page = page.page, count = page.items.len(), "Listed priorities");

        Ok(Response::new(PriorityList {
            page: page.page,
            next: page.next,
            items: page.into_values(),
        }))
    }

    async fn create_priority(
        &self,
        request: Request<CreatePriorityRequest>,
    ) -> Result<Response<Priority>, Status> {
        let caller = authorize(&request, SERVICE, "CreatePriority")?;
        let input = require_input(request.into_inner().input)?;

        let mut priority = Priority::default();
        Self::apply(&mut priority, input, &FieldMask::default())?;
        priority.touch_created(&caller.user, now_millis());

        let row = self.state.priorities.insert(priority);
        info!(id = row.value.id, name = %row.value.name, "Priority created");
        Ok(Response::new(row.value))
    }

    async fn update_priority(
        &self,
        request: Request<UpdatePriorityRequest>,
    ) -> Result<Response<Priority>, Status> {
        let caller = authorize(&request, SERVICE, "UpdatePriority")?;
        let req = request.into_inner();
        let input = require_input(req.input)?;
        let mask = FieldMask::new(&req.x_json_mask);

        let _guard = self.state.write_lock.lock();
        let row = self
            .state
            .priorities
            .update(RowRef::id(req.id), |priority| {
                Self::apply(priority, input, &mask)?;
                priority.touch_updated(&caller.user, now_millis());
                Ok::<_, ServiceError>(())
            })?;

        let (id, name) = (row.value.id, &row.value.name);
        let conditions = self.state.sla_conditions.modify_all(|condition| {
            let mut changed = false;
            for lookup in condition.priorities.iter_mut().filter(|p| p.id == id) {
                if lookup.name != *name {
                    lookup.name.clone_from(name);
                    changed = true;
                }
            }
            changed
        });
        info!(id, ver = row.ver, conditions, "Priority updated");
        Ok(Response::new(row.value))
    }

    async fn delete_priority(
        &self,
        request: Request<DeletePriorityRequest>,
    ) -> Result<Response<Priority>, Status> {
        authorize(&request, SERVICE, "DeletePriority")?;
        let id = request.into_inner().id;

        let _guard = self.state.write_lock.lock();
        let row = self
            .state
            .priorities
            .remove(RowRef::id(id))
            .map_err(ServiceError::from)?;
        let conditions = self.state.sla_conditions.modify_all(|condition| {
            let before = condition.priorities.len();
            condition.priorities.retain(|p| p.id != id);
            condition.priorities.len() != before
        });
        info!(id, conditions, "Priority deleted");
        Ok(Response::new(row.value))
    }

    async fn locate_priority(
        &self,
        request: Request<LocatePriorityRequest>,
    ) -> Result<Response<LocatePriorityResponse>, Status> {
        authorize(&request, SERVICE, "LocatePriority")?;
        let req = request.into_inner();

        let row = self
            .state
            .priorities
            .get(RowRef::id(req.id))
            .map_err(ServiceError::from)?;
        Ok(Response::new(LocatePriorityResponse {
            priority: Some(row.value.project(&field_names(&req.fields))),
        }))
    }
}
