//! Status condition gRPC implementation.
//!
//! Each status keeps exactly one initial condition once it has any: the
//! first condition created becomes initial, marking another condition as
//! initial clears the flag on the rest, and the initial condition can only
//! be removed when it is the last one.

use super::{now_millis, require_id, require_input, require_text, CasesState};
use crate::auth::authorize;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{field_names, FieldMask, ListQuery, Record, RowRef, StoreError};
use cases_proto::cases::{
    status_conditions_server::StatusConditions, CreateStatusConditionRequest,
    DeleteStatusConditionRequest, InputStatusCondition, ListStatusConditionsRequest,
    LocateStatusConditionRequest, LocateStatusConditionResponse, Status as CaseStatus,
    StatusCondition, StatusConditionList, UpdateStatusConditionRequest,
};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{debug, info};

const SERVICE: &str = "StatusConditions";

/// Status condition service implementation.
#[derive(Debug, Clone)]
pub struct StatusConditionServiceImpl {
    state: Arc<CasesState>,
}

impl StatusConditionServiceImpl {
    /// Create the service over shared tables.
    #[must_use]
    pub const fn new(state: Arc<CasesState>) -> Self {
        Self { state }
    }

    fn parent(&self, status_id: i64) -> ServiceResult<i64> {
        let id = require_id("status_id", status_id)?;
        if self.state.statuses.contains(id) {
            Ok(id)
        } else {
            Err(StoreError::NotFound {
                kind: <CaseStatus as Record>::KIND,
                id,
            }
            .into())
        }
    }

    /// Clear the initial flag on every condition of the status except `keep`.
    fn clear_initial(&self, status_id: i64, keep: i64) -> usize {
        self.state.status_conditions.modify_scope(status_id, |condition| {
            if condition.id != keep && condition.initial {
                condition.initial = false;
                true
            } else {
                false
            }
        })
    }

    fn apply(
        condition: &mut StatusCondition,
        input: InputStatusCondition,
        mask: &FieldMask,
    ) -> ServiceResult<()> {
        if mask.contains("name") {
            condition.name = require_text("name", &input.name)?;
        }
        if mask.contains("description") {
            condition.description = input.description;
        }
        if mask.contains("initial") {
            condition.initial = input.initial;
        }
        if mask.contains("final") {
            condition.r#final = input.r#final;
        }
        Ok(())
    }
}

#[tonic::async_trait]
impl StatusConditions for StatusConditionServiceImpl {
    async fn list_status_conditions(
        &self,
        request: Request<ListStatusConditionsRequest>,
    ) -> Result<Response<StatusConditionList>, Status> {
        authorize(&request, SERVICE, "ListStatusConditions")?;
        let req = request.into_inner();
        let status_id = self.parent(req.status_id)?;

        let query = ListQuery::new(req.page, req.size, self.state.limits)
            .search(&req.q)?
            .sort(&req.sort)
            .fields(&req.fields)
            .ids(&req.id);
        let page = self.state.status_conditions.list(Some(status_id), &query);
        debug!(status_id, count = page.items.len(), "Listed status conditions");

        Ok(Response::new(StatusConditionList {
            page: page.page,
            next: page.next,
            items: page.into_values(),
        }))
    }

    async fn create_status_condition(
        &self,
        request: Request<CreateStatusConditionRequest>,
    ) -> Result<Response<StatusCondition>, Status> {
        let caller = authorize(&request, SERVICE, "CreateStatusCondition")?;
        let req = request.into_inner();
        let input = require_input(req.input)?;

        let _guard = self.state.write_lock.lock();
        let status_id = self.parent(req.status_id)?;
        let mut condition = StatusCondition {
            status_id,
            ..Default::default()
        };
        Self::apply(&mut condition, input, &FieldMask::default())?;
        if self.state.status_conditions.scope_rows(status_id).is_empty() {
            condition.initial = true;
        }
        condition.touch_created(&caller.user, now_millis());

        let row = self.state.status_conditions.insert(condition);
        if row.value.initial {
            self.clear_initial(status_id, row.value.id);
        }
        info!(
            status_id,
            id = row.value.id,
            initial = row.value.initial,
            "Status condition created"
        );
        Ok(Response::new(row.value))
    }

    async fn update_status_condition(
        &self,
        request: Request<UpdateStatusConditionRequest>,
    ) -> Result<Response<StatusCondition>, Status> {
        let caller = authorize(&request, SERVICE, "UpdateStatusCondition")?;
        let req = request.into_inner();
        let input = require_input(req.input)?;
        let mask = FieldMask::new(&req.x_json_mask);

        let _guard = self.state.write_lock.lock();
        let status_id = self.parent(req.status_id)?;
        let key = RowRef::id(req.id).in_scope(status_id);
        let current = self
            .state
            .status_conditions
            .get(key)
            .map_err(ServiceError::from)?;

        let mut next = current.value.clone();
        Self::apply(&mut next, input, &mask)?;
        if current.value.initial && !next.initial {
            return Err(ServiceError::FailedPrecondition(format!(
                "condition {} is initial; mark another condition initial first",
                req.id
            ))
            .into());
        }
        next.touch_updated(&caller.user, now_millis());

        let promoted = next.initial && !current.value.initial;
        let row = self
            .state
            .status_conditions
            .update(key.at_version(Some(current.ver)), |condition| {
                *condition = next;
                Ok::<_, ServiceError>(())
            })?;
        if promoted {
            self.clear_initial(status_id, row.value.id);
        }
        info!(status_id, id = row.value.id, ver = row.ver, promoted, "Status condition updated");
        Ok(Response::new(row.value))
    }

    async fn delete_status_condition(
        &self,
        request: Request<DeleteStatusConditionRequest>,
    ) -> Result<Response<StatusCondition>, Status> {
        authorize(&request, SERVICE, "DeleteStatusCondition")?;
        let req = request.into_inner();

        let _guard = self.state.write_lock.lock();
        let status_id = self.parent(req.status_id)?;
        let key = RowRef::id(req.id).in_scope(status_id);
        let current = self
            .state
            .status_conditions
            .get(key)
            .map_err(ServiceError::from)?;
        if current.value.initial && self.state.status_conditions.scope_rows(status_id).len() > 1 {
            return Err(ServiceError::FailedPrecondition(format!(
                "condition {} is the initial condition of status {status_id}",
                req.id
            ))
            .into());
        }

        let row = self
            .state
            .status_conditions
            .remove(key)
            .map_err(ServiceError::from)?;
        info!(status_id, id = req.id, "Status condition deleted");
        Ok(Response::new(row.value))
    }

    async fn locate_status_condition(
        &self,
        request: Request<LocateStatusConditionRequest>,
    ) -> Result<Response<LocateStatusConditionResponse>, Status> {
        authorize(&request, SERVICE, "LocateStatusCondition")?;
        let req = request.into_inner();
        let status_id = self.parent(req.status_id)?;

        let row = self
            .state
            .status_conditions
            .get(RowRef::id(req.id).in_scope(status_id))
            .map_err(ServiceError::from)?;
        Ok(Response::new(LocateStatusConditionResponse {
            status_condition: Some(row.value.project(&field_names(&req.fields))),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> StatusConditionServiceImpl {
        let state = CasesState::default();
        state.statuses.insert(CaseStatus {
            name: "Support".into(),
            ..Default::default()
        });
        for (name, initial) in [("new", true), ("open", false), ("done", false)] {
            state.status_conditions.insert(StatusCondition {
                status_id: 1,
                name: name.into(),
                initial,
                ..Default::default()
            });
        }
        StatusConditionServiceImpl::new(Arc::new(state))
    }

    #[test]
    fn test_clear_initial_keeps_one() {
        let svc = seeded();
        svc.state.status_conditions.modify_scope(1, |c| {
            c.initial = true;
            true
        });
        assert_eq!(svc.clear_initial(1, 2), 2);

        let initial: Vec<i64> = svc
            .state
            .status_conditions
            .scope_rows(1)
            .into_iter()
            .filter(|row| row.value.initial)
            .map(|row| row.value.id)
            .collect();
        assert_eq!(initial, [2]);
    }

    #[test]
    fn test_apply_masks_flags() {
        let mut condition = StatusCondition {
            name: "open".into(),
            ..Default::default()
        };
        let input = InputStatusCondition {
            r#final: true,
            ..Default::default()
        };
        StatusConditionServiceImpl::apply(
            &mut condition,
            input,
            &FieldMask::new(&["final".to_string()]),
        )
        .expect("valid");
        assert!(condition.r#final);
        assert_eq!(condition.name, "open");
    }
}
