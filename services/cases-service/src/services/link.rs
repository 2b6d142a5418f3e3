//! Case link gRPC implementation.

use super::{now_millis, require_input, require_text, CasesState};
use crate::auth::authorize;
use crate::error::{ServiceError, ServiceResult};
use crate::etag::{Etag, EtagKind};
use crate::store::{field_names, FieldMask, ListQuery, Record, RowRef, Versioned};
use cases_proto::cases::{
    case_links_server::CaseLinks, CaseLink, CaseLinkList, CreateLinkRequest, DeleteLinkRequest,
    InputCaseLink, ListLinksRequest, LocateLinkRequest, UpdateLinkRequest,
};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{debug, info};
use url::Url;

const SERVICE: &str = "CaseLinks";

fn parse_etag(kind: EtagKind, raw: &str) -> ServiceResult<Etag> {
    Ok(Etag::parse(kind, raw)?)
}

/// An absolute URL, trimmed.
fn require_url(raw: &str) -> ServiceResult<String> {
    let raw = require_text("url", raw)?;
    let parsed = Url::parse(&raw).map_err(|e| ServiceError::invalid(format!("url: {e}")))?;
    if parsed.cannot_be_a_base() {
        return Err(ServiceError::invalid(format!("url must be hierarchical: {raw}")));
    }
    Ok(raw)
}

fn present(row: Versioned<CaseLink>, fields: &[String]) -> CaseLink {
    let mut link = row.value.project(fields);
    link.ver = row.ver;
    link.etag = Etag::new(EtagKind::CaseLink, link.id, row.ver).encode();
    link
}

/// Case link service implementation.
#[derive(Debug, Clone)]
pub struct LinkServiceImpl {
    state: Arc<CasesState>,
}

impl LinkServiceImpl {
    /// Create the service over shared tables.
    #[must_use]
    pub const fn new(state: Arc<CasesState>) -> Self {
        Self { state }
    }

    /// Copy masked input onto `link`. An empty name falls back to the URL.
    fn apply(link: &mut CaseLink, input: InputCaseLink, mask: &FieldMask) -> ServiceResult<()> {
        if mask.contains("url") {
            link.url = require_url(&input.url)?;
        }
        if mask.contains("name") {
            link.name = input.name.trim().to_string();
        }
        if link.name.is_empty() {
            link.name.clone_from(&link.url);
        }
        Ok(())
    }
}

#[tonic::async_trait]
impl CaseLinks for LinkServiceImpl {
    async fn list_links(
        &self,
        request: Request<ListLinksRequest>,
    ) -> Result<Response<CaseLinkList>, Status> {
        authorize(&request, SERVICE, "ListLinks")?;
        let req = request.into_inner();
        let case = parse_etag(EtagKind::Case, &req.case_etag)?;

        let query = ListQuery::new(req.page, req.size, self.state.limits)
            .search(&req.q)?
            .sort(&req.sort)
            .ids(&req.id);
        let fields = field_names(&req.fields);
        let page = self.state.links.list(Some(case.id), &query);
        debug!(case_id = case.id, count = page.items.len(), "Listed links");

        Ok(Response::new(CaseLinkList {
            page: page.page,
            next: page.next,
            items: page
                .items
                .into_iter()
                .map(|row| present(row, &fields))
                .collect(),
        }))
    }

    async fn create_link(
        &self,
        request: Request<CreateLinkRequest>,
    ) -> Result<Response<CaseLink>, Status> {
        let caller = authorize(&request, SERVICE, "CreateLink")?;
        let req = request.into_inner();
        let case = parse_etag(EtagKind::Case, &req.case_etag)?;
        let input = require_input(req.input)?;

        let mut link = CaseLink {
            case_id: case.id,
            author: Some(caller.user.clone()),
            ..Default::default()
        };
        Self::apply(&mut link, input, &FieldMask::default())?;
        link.touch_created(&caller.user, now_millis());

        let row = self.state.links.insert(link);
        info!(case_id = case.id, id = row.value.id, url = %row.value.url, "Link created");
        Ok(Response::new(present(row, &[])))
    }

    async fn update_link(
        &self,
        request: Request<UpdateLinkRequest>,
    ) -> Result<Response<CaseLink>, Status> {
        let caller = authorize(&request, SERVICE, "UpdateLink")?;
        let req = request.into_inner();
        let case = parse_etag(EtagKind::Case, &req.case_etag)?;
        let tag = parse_etag(EtagKind::CaseLink, &req.etag)?;
        let input = require_input(req.input)?;
        let mask = FieldMask::new(&req.x_json_mask);

        let key = RowRef::id(tag.id).in_scope(case.id).at_version(tag.ver);
        let row = self.state.links.update(key, |link| {
            Self::apply(link, input, &mask)?;
            link.touch_updated(&caller.user, now_millis());
            Ok::<_, ServiceError>(())
        })?;
        info!(case_id = case.id, id = row.value.id, ver = row.ver, "Link updated");
        Ok(Response::new(present(row, &[])))
    }

    async fn delete_link(
        &self,
        request: Request<DeleteLinkRequest>,
    ) -> Result<Response<CaseLink>, Status> {
        authorize(&request, SERVICE, "DeleteLink")?;
        let req = request.into_inner();
        let case = parse_etag(EtagKind::Case, &req.case_etag)?;
        let tag = parse_etag(EtagKind::CaseLink, &req.etag)?;

        let key = RowRef::id(tag.id).in_scope(case.id).at_version(tag.ver);
        let row = self.state.links.remove(key).map_err(ServiceError::from)?;
        info!(case_id = case.id, id = tag.id, "Link deleted");
        Ok(Response::new(present(row, &[])))
    }

    async fn locate_link(
        &self,
        request: Request<LocateLinkRequest>,
    ) -> Result<Response<CaseLink>, Status> {
        authorize(&request, SERVICE, "LocateLink")?;
        let req = request.into_inner();
        let case = parse_etag(EtagKind::Case, &req.case_etag)?;
        let tag = parse_etag(EtagKind::CaseLink, &req.etag)?;

        let row = self
            .state
            .links
            .get(RowRef::id(tag.id).in_scope(case.id))
            .map_err(ServiceError::from)?;
        Ok(Response::new(present(row, &field_names(&req.fields))))
    }
}
