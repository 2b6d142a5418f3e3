//! Case source gRPC implementation.

use super::{now_millis, require_input, require_text, CasesState};
use crate::auth::authorize;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{field_names, FieldMask, ListQuery, Record, RowRef};
use cases_proto::cases::{
    sources_server::Sources, CreateSourceRequest, DeleteSourceRequest, InputSource,
    ListSourcesRequest, LocateSourceRequest, LocateSourceResponse, Source, SourceList,
    SourceType, UpdateSourceRequest,
};
use std::collections::HashSet;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{debug, info};

const SERVICE: &str = "Sources";

/// A known, specified source type.
fn require_type(raw: i32) -> ServiceResult<i32> {
    match SourceType::try_from(raw) {
        Ok(SourceType::Unspecified) => Err(ServiceError::invalid("type is required")),
        Ok(kind) => Ok(kind as i32),
        Err(_) => Err(ServiceError::invalid(format!("unknown source type {raw}"))),
    }
}

/// Case source service implementation.
#[derive(Debug, Clone)]
pub struct SourceServiceImpl {
    state: Arc<CasesState>,
}

impl SourceServiceImpl {
    /// Create the service over shared tables.
    #[must_use]
    pub const fn new(state: Arc<CasesState>) -> Self {
        Self { state }
    }

    fn apply(source: &mut Source, input: InputSource, mask: &FieldMask) -> ServiceResult<()> {
        if mask.contains("name") {
            source.name = require_text("name", &input.name)?;
        }
        if mask.contains("description") {
            source.description = input.description;
        }
        if mask.contains("type") {
            source.r#type = require_type(input.r#type)?;
        }
        Ok(())
    }
}

#[tonic::async_trait]
impl Sources for SourceServiceImpl {
    async fn list_sources(
        &self,
        request: Request<ListSourcesRequest>,
    ) -> Result<Response<SourceList>, Status> {
        authorize(&request, SERVICE, "ListSources")?;
        let req = request.into_inner();

        let query = ListQuery::new(req.page, req.size, self.state.limits)
            .search(&req.q)?
            .sort(&req.sort)
            .fields(&req.fields)
            .ids(&req.id);
        let types: HashSet<i32> = req.r#type.iter().copied().collect();
        let page = self.state.sources.list_filtered(None, &query, |source| {
            types.is_empty() || types.contains(&source.r#type)
        });
        debug!(page = page.page, count = page.items.len(), "Listed sources");

        Ok(Response::new(SourceList {
            page: page.page,
            next: page.next,
            items: page.into_values(),
        }))
    }

    async fn create_source(
        &self,
        request: Request<CreateSourceRequest>,
    ) -> Result<Response<Source>, Status> {
        let caller = authorize(&request, SERVICE, "CreateSource")?;
        let input = require_input(request.into_inner().input)?;

        let mut source = Source::default();
        Self::apply(&mut source, input, &FieldMask::default())?;
        source.touch_created(&caller.user, now_millis());

        let row = self.state.sources.insert(source);
        info!(id = row.value.id, source_type = row.value.r#type, "Source created");
        Ok(Response::new(row.value))
    }

    async fn update_source(
        &self,
        request: Request<UpdateSourceRequest>,
    ) -> Result<Response<Source>, Status> {
        let caller = authorize(&request, SERVICE, "UpdateSource")?;
        let req = request.into_inner();
        let input = require_input(req.input)?;
        let mask = FieldMask::new(&req.x_json_mask);

        let row = self
            .state
            .sources
            .update(RowRef::id(req.id), |source| {
                Self::apply(source, input, &mask)?;
                source.touch_updated(&caller.user, now_millis());
                Ok::<_, ServiceError>(())
            })?;
        info!(id = row.value.id, ver = row.ver, "Source updated");
        Ok(Response::new(row.value))
    }

    async fn delete_source(
        &self,
        request: Request<DeleteSourceRequest>,
    ) -> Result<Response<Source>, Status> {
        authorize(&request, SERVICE, "DeleteSource")?;
        let id = request.into_inner().id;

        let row = self
            .state
            .sources
            .remove(RowRef::id(id))
            .map_err(ServiceError::from)?;
        info!(id, "Source deleted");
        Ok(Response::new(row.value))
    }

    async fn locate_source(
        &self,
        request: Request<LocateSourceRequest>,
    ) -> Result<Response<LocateSourceResponse>, Status> {
        authorize(&request, SERVICE, "LocateSource")?;
        let req = request.into_inner();

        let row = self
            .state
            .sources
            .get(RowRef::id(req.id))
            .map_err(ServiceError::from)?;
        Ok(Response::new(LocateSourceResponse {
            source: Some(row.value.project(&field_names(&req.fields))),
        }))
    }
}
