//! SLA condition gRPC implementation.
//!
//! Conditions live inside an SLA and map a set of priorities onto reaction
//! and resolution times. A priority may be claimed by at most one condition
//! of the same SLA.

use super::{now_millis, require_duration, require_id, require_input, require_text, CasesState};
use crate::auth::authorize;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{field_names, FieldMask, ListQuery, Record, RowRef, StoreError};
use cases_proto::cases::{
    sla_conditions_server::SlaConditions, CreateSlaConditionRequest, DeleteSlaConditionRequest,
    InputSlaCondition, ListSlaConditionsRequest, LocateSlaConditionRequest,
    LocateSlaConditionResponse, Lookup, Sla, SlaCondition, SlaConditionList,
    UpdateSlaConditionRequest,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{debug, info};

const SERVICE: &str = "SlaConditions";

/// SLA condition service implementation.
#[derive(Debug, Clone)]
pub struct SlaConditionServiceImpl {
    state: Arc<CasesState>,
}

impl SlaConditionServiceImpl {
    /// Create the service over shared tables.
    #[must_use]
    pub const fn new(state: Arc<CasesState>) -> Self {
        Self { state }
    }

    /// Ensure the parent SLA exists.
    fn parent(&self, sla_id: i64) -> ServiceResult<i64> {
        let sla_id = require_id("sla_id", sla_id)?;
        if self.state.slas.contains(sla_id) {
            Ok(sla_id)
        } else {
            Err(StoreError::NotFound {
                kind: <Sla as Record>::KIND,
                id: sla_id,
            }
            .into())
        }
    }

    /// Resolve priority references against the priority table, filling in
    /// their names and dropping duplicates.
    fn resolve_priorities(&self, refs: &[Lookup]) -> ServiceResult<Vec<Lookup>> {
        let mut seen = BTreeSet::new();
        let mut resolved = Vec::with_capacity(refs.len());
        for lookup in refs {
            if !seen.insert(lookup.id) {
                continue;
            }
            let priority = self
                .state
                .priorities
                .get(RowRef::id(lookup.id))
                .map_err(|_| ServiceError::invalid(format!("unknown priority {}", lookup.id)))?;
            resolved.push(Lookup {
                id: priority.value.id,
                name: priority.value.name,
            });
        }
        Ok(resolved)
    }

    /// Reject priorities already claimed by another condition of the SLA.
    fn check_priorities_free(
        &self,
        sla_id: i64,
        own_id: i64,
        priorities: &[Lookup],
    ) -> ServiceResult<()> {
        for sibling in self.state.sla_conditions.scope_rows(sla_id) {
            if sibling.value.id == own_id {
                continue;
            }
            if let Some(taken) = sibling
                .value
                .priorities
                .iter()
                .find(|p| priorities.iter().any(|mine| mine.id == p.id))
            {
                return Err(ServiceError::AlreadyExists(format!(
                    "priority {} is already used by condition {} of SLA {sla_id}",
                    taken.id, sibling.value.id
                )));
            }
        }
        Ok(())
    }

    /// Resolve and check the priorities of `input` before it is applied to
    /// condition `own_id` of the SLA.
    fn prepare(
        &self,
        sla_id: i64,
        own_id: i64,
        mut input: InputSlaCondition,
        mask: &FieldMask,
    ) -> ServiceResult<InputSlaCondition> {
        if mask.contains("priorities") {
            input.priorities = self.resolve_priorities(&input.priorities)?;
            self.check_priorities_free(sla_id, own_id, &input.priorities)?;
        }
        Ok(input)
    }

    fn apply(
        condition: &mut SlaCondition,
        input: InputSlaCondition,
        mask: &FieldMask,
    ) -> ServiceResult<()> {
        if mask.contains("name") {
            condition.name = require_text("name", &input.name)?;
        }
        if mask.contains("priorities") {
            condition.priorities = input.priorities;
        }
        if mask.contains("reaction_time") {
            condition.reaction_time = require_duration("reaction_time", input.reaction_time)?;
        }
        if mask.contains("resolution_time") {
            condition.resolution_time =
                require_duration("resolution_time", input.resolution_time)?;
        }
        Ok(())
    }
}

#[tonic::async_trait]
impl SlaConditions for SlaConditionServiceImpl {
    async fn list_sla_conditions(
        &self,
        request: Request<ListSlaConditionsRequest>,
    ) -> Result<Response<SlaConditionList>, Status> {
        authorize(&request, SERVICE, "ListSlaConditions")?;
        let req = request.into_inner();
        let sla_id = self.parent(req.sla_id)?;

        let query = ListQuery::new(req.page, req.size, self.state.limits)
            .search(&req.q)?
            .sort(&req.sort)
            .fields(&req.fields)
            .ids(&req.id);
        let page = self.state.sla_conditions.list(Some(sla_id), &query);
        debug!(sla_id, count = page.items.len(), "Listed SLA conditions");

        Ok(Response::new(SlaConditionList {
            page: page.page,
            next: page.next,
            items: page.into_values(),
        }))
    }

    async fn create_sla_condition(
        &self,
        request: Request<CreateSlaConditionRequest>,
    ) -> Result<Response<SlaCondition>, Status> {
        let caller = authorize(&request, SERVICE, "CreateSlaCondition")?;
        let req = request.into_inner();
        let input = require_input(req.input)?;

        let _guard = self.state.write_lock.lock();
        let sla_id = self.parent(req.sla_id)?;
        let input = self.prepare(sla_id, 0, input, &FieldMask::default())?;
        let mut condition = SlaCondition {
            sla_id,
            ..Default::default()
        };
        Self::apply(&mut condition, input, &FieldMask::default())?;
        condition.touch_created(&caller.user, now_millis());

        let row = self.state.sla_conditions.insert(condition);
        info!(sla_id, id = row.value.id, "SLA condition created");
        Ok(Response::new(row.value))
    }

    async fn update_sla_condition(
        &self,
        request: Request<UpdateSlaConditionRequest>,
    ) -> Result<Response<SlaCondition>, Status> {
        let caller = authorize(&request, SERVICE, "UpdateSlaCondition")?;
        let req = request.into_inner();
        let input = require_input(req.input)?;
        let mask = FieldMask::new(&req.x_json_mask);

        let _guard = self.state.write_lock.lock();
        let sla_id = self.parent(req.sla_id)?;
        let input = self.prepare(sla_id, req.id, input, &mask)?;
        let row = self
            .state
            .sla_conditions
            .update(RowRef::id(req.id).in_scope(sla_id), |condition| {
                Self::apply(condition, input, &mask)?;
                condition.touch_updated(&caller.user, now_millis());
                Ok::<_, ServiceError>(())
            })?;
        info!(sla_id, id = row.value.id, ver = row.ver, "SLA condition updated");
        Ok(Response::new(row.value))
    }

    async fn delete_sla_condition(
        &self,
        request: Request<DeleteSlaConditionRequest>,
    ) -> Result<Response<SlaCondition>, Status> {
        authorize(&request, SERVICE, "DeleteSlaCondition")?;
        let req = request.into_inner();
        let sla_id = self.parent(req.sla_id)?;

        let row = self
            .state
            .sla_conditions
            .remove(RowRef::id(req.id).in_scope(sla_id))
            .map_err(ServiceError::from)?;
        info!(sla_id, id = req.id, "SLA condition deleted");
        Ok(Response::new(row.value))
    }

    async fn locate_sla_condition(
        &self,
        request: Request<LocateSlaConditionRequest>,
    ) -> Result<Response<LocateSlaConditionResponse>, Status> {
        authorize(&request, SERVICE, "LocateSlaCondition")?;
        let req = request.into_inner();
        let sla_id = self.parent(req.sla_id)?;

        let row = self
            .state
            .sla_conditions
            .get(RowRef::id(req.id).in_scope(sla_id))
            .map_err(ServiceError::from)?;
        Ok(Response::new(LocateSlaConditionResponse {
            sla_condition: Some(row.value.project(&field_names(&req.fields))),
        }))
    }
}
