//! Case comment gRPC implementation.
//!
//! Comments are addressed by etag. The caller that publishes a comment
//! becomes its author and is the only one allowed to edit or remove it;
//! edits and removals must name the version the caller last saw.

use super::{now_millis, require_input, require_text, CasesState};
use crate::auth::{authorize, Caller};
use crate::error::{ServiceError, ServiceResult};
use crate::etag::{Etag, EtagKind};
use crate::store::{field_names, FieldMask, ListQuery, Record, RowRef, Versioned};
use cases_proto::cases::{
    case_comments_server::CaseComments, CaseComment, CaseCommentList, DeleteCommentRequest,
    ListCommentsRequest, LocateCommentRequest, PublishCommentRequest, UpdateCommentRequest,
};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{debug, info};

const SERVICE: &str = "CaseComments";

fn parse_etag(kind: EtagKind, raw: &str) -> ServiceResult<Etag> {
    Ok(Etag::parse(kind, raw)?)
}

/// Render a stored comment for `caller`, projected onto `fields`.
fn present(row: Versioned<CaseComment>, caller: &Caller, fields: &[String]) -> CaseComment {
    let can_edit = caller.is(row.value.author.as_ref());
    let mut comment = row.value.project(fields);
    comment.ver = row.ver;
    comment.etag = Etag::new(EtagKind::CaseComment, comment.id, row.ver).encode();
    comment.can_edit = can_edit;
    comment
}

fn require_author(caller: &Caller, comment: &CaseComment) -> ServiceResult<()> {
    if caller.is(comment.author.as_ref()) {
        Ok(())
    } else {
        Err(ServiceError::PermissionDenied(format!(
            "comment {} can only be changed by its author",
            comment.id
        )))
    }
}

/// Case comment service implementation.
#[derive(Debug, Clone)]
pub struct CommentServiceImpl {
    state: Arc<CasesState>,
}

impl CommentServiceImpl {
    /// Create the service over shared tables.
    #[must_use]
    pub const fn new(state: Arc<CasesState>) -> Self {
        Self { state }
    }
}

#[tonic::async_trait]
impl CaseComments for CommentServiceImpl {
    async fn list_comments(
        &self,
        request: Request<ListCommentsRequest>,
    ) -> Result<Response<CaseCommentList>, Status> {
        let caller = authorize(&request, SERVICE, "ListComments")?;
        let req = request.into_inner();
        let case = parse_etag(EtagKind::Case, &req.case_etag)?;

        let query = ListQuery::new(req.page, req.size, self.state.limits)
            .search(&req.q)?
            .sort(&req.sort)
            .ids(&req.id);
        let fields = field_names(&req.fields);
        let page = self.state.comments.list(Some(case.id), &query);
        debug!(case_id = case.id, count = page.items.len(), "Listed comments");

        Ok(Response::new(CaseCommentList {
            page: page.page,
            next: page.next,
            items: page
                .items
                .into_iter()
                .map(|row| present(row, &caller, &fields))
                .collect(),
        }))
    }

    async fn publish_comment(
        &self,
        request: Request<PublishCommentRequest>,
    ) -> Result<Response<CaseComment>, Status> {
        let caller = authorize(&request, SERVICE, "PublishComment")?;
        let req = request.into_inner();
        let case = parse_etag(EtagKind::Case, &req.case_etag)?;
        let input = require_input(req.input)?;

        let mut comment = CaseComment {
            case_id: case.id,
            text: require_text("text", &input.text)?,
            author: Some(caller.user.clone()),
            ..Default::default()
        };
        comment.touch_created(&caller.user, now_millis());

        let row = self.state.comments.insert(comment);
        info!(case_id = case.id, id = row.value.id, author = caller.user.id, "Comment published");
        Ok(Response::new(present(row, &caller, &[])))
    }

    async fn update_comment(
        &self,
        request: Request<UpdateCommentRequest>,
    ) -> Result<Response<CaseComment>, Status> {
        let caller = authorize(&request, SERVICE, "UpdateComment")?;
        let req = request.into_inner();
        let tag = parse_etag(EtagKind::CaseComment, &req.etag)?;
        let input = require_input(req.input)?;
        if !FieldMask::new(&req.x_json_mask).contains("text") {
            return Err(ServiceError::invalid("x_json_mask selects no editable field").into());
        }

        let row = self
            .state
            .comments
            .update(RowRef::id(tag.id).at_version(tag.ver), |comment| {
                require_author(&caller, comment)?;
                comment.text = require_text("text", &input.text)?;
                comment.edited = true;
                comment.touch_updated(&caller.user, now_millis());
                Ok::<_, ServiceError>(())
            })?;
        info!(id = row.value.id, ver = row.ver, "Comment updated");
        Ok(Response::new(present(row, &caller, &[])))
    }

    async fn delete_comment(
        &self,
        request: Request<DeleteCommentRequest>,
    ) -> Result<Response<CaseComment>, Status> {
        let caller = authorize(&request, SERVICE, "DeleteComment")?;
        let tag = parse_etag(EtagKind::CaseComment, &request.into_inner().etag)?;

        let row = self
            .state
            .comments
            .remove_with(RowRef::id(tag.id).at_version(tag.ver), |comment| {
                require_author(&caller, comment)
            })?;
        info!(id = tag.id, case_id = row.value.case_id, "Comment deleted");
        Ok(Response::new(present(row, &caller, &[])))
    }

    async fn locate_comment(
        &self,
        request: Request<LocateCommentRequest>,
    ) -> Result<Response<CaseComment>, Status> {
        let caller = authorize(&request, SERVICE, "LocateComment")?;
        let req = request.into_inner();
        let tag = parse_etag(EtagKind::CaseComment, &req.etag)?;

        let row = self
            .state
            .comments
            .get(RowRef::id(tag.id))
            .map_err(ServiceError::from)?;
        Ok(Response::new(present(row, &caller, &field_names(&req.fields))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Grants;
    use cases_proto::cases::Lookup;

    fn comment(author: i64) -> Versioned<CaseComment> {
        Versioned {
            ver: 3,
            value: CaseComment {
                id: 8,
                text: "call back tomorrow".into(),
                case_id: 2,
                author: Some(Lookup {
                    id: author,
                    name: String::new(),
                }),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_present_sets_etag_and_can_edit() {
        let author = Caller::new(4, "agent", Grants::default());
        let other = Caller::new(5, "other", Grants::default());

        let mine = present(comment(4), &author, &[]);
        assert!(mine.can_edit);
        assert_eq!(mine.ver, 3);
        assert_eq!(
            Etag::parse(EtagKind::CaseComment, &mine.etag),
            Ok(Etag::new(EtagKind::CaseComment, 8, 3))
        );

        assert!(!present(comment(4), &other, &[]).can_edit);
    }

    #[test]
    fn test_present_projection_keeps_identity() {
        let caller = Caller::new(4, "agent", Grants::default());
        let projected = present(comment(4), &caller, &["text".to_string()]);
        assert_eq!(projected.text, "call back tomorrow");
        assert!(projected.author.is_none());
        assert!(projected.can_edit);
        assert!(!projected.etag.is_empty());
    }

    #[test]
    fn test_require_author() {
        let stranger = Caller::new(9, "x", Grants::superuser());
        assert!(matches!(
            require_author(&stranger, &comment(4).value),
            Err(ServiceError::PermissionDenied(_))
        ));
    }
}
