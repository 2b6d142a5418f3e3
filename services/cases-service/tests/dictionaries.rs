//! Integration tests for the dictionary services.
//!
//! Handlers are driven through their generated service traits with requests
//! that carry an already authenticated caller.

mod common;

use cases_proto::cases::{
    close_reasons_server::CloseReasons, priorities_server::Priorities, reasons_server::Reasons,
    sla_conditions_server::SlaConditions, slas_server::Slas, sources_server::Sources,
    status_conditions_server::StatusConditions, statuses_server::Statuses,
    CreateCloseReasonRequest, CreatePriorityRequest, CreateReasonRequest,
    CreateSlaConditionRequest, CreateSlaRequest, CreateSourceRequest,
    CreateStatusConditionRequest, CreateStatusRequest, DeleteCloseReasonRequest,
    DeleteSlaRequest, DeleteStatusConditionRequest, DeletePriorityRequest, InputCloseReason,
    InputPriority, InputReason, InputSla, InputSlaCondition, InputSource, InputStatus,
    InputStatusCondition, ListPrioritiesRequest, ListReasonsRequest, ListSlaConditionsRequest,
    ListSlasRequest, ListSourcesRequest, ListStatusConditionsRequest, LocateReasonRequest,
    LocateSlaConditionRequest, LocateSlaRequest, Lookup, SourceType, UpdateSlaRequest,
    UpdatePriorityRequest, UpdateStatusConditionRequest,
};
use cases_service::{
    CloseReasonServiceImpl, PriorityServiceImpl, ReasonServiceImpl, SlaConditionServiceImpl,
    SlaServiceImpl, SourceServiceImpl, StatusConditionServiceImpl, StatusServiceImpl,
};
use common::{admin, reader, request, state};
use tonic::Code;

fn sla_input(name: &str) -> InputSla {
    InputSla {
        name: name.into(),
        description: "business hours".into(),
        reaction_time: 15 * 60_000,
        resolution_time: 8 * 3_600_000,
        ..Default::default()
    }
}

fn priority_ref(id: i64) -> Lookup {
    Lookup {
        id,
        name: String::new(),
    }
}

#[tokio::test]
async fn test_sla_lifecycle() {
    let svc = SlaServiceImpl::new(state());
    let caller = admin(7);

    let created = svc
        .create_sla(request(
            CreateSlaRequest {
                input: Some(sla_input("  Gold ")),
            },
            &caller,
        ))
        .await
        .expect("create")
        .into_inner();
    assert_eq!(created.id, 1);
    assert_eq!(created.name, "Gold");
    assert_eq!(created.created_by.as_ref().map(|u| u.id), Some(7));
    assert_eq!(created.created_at, created.updated_at);

    let updated = svc
        .update_sla(request(
            UpdateSlaRequest {
                id: created.id,
                input: Some(InputSla {
                    description: "24/7".into(),
                    ..Default::default()
                }),
                x_json_mask: vec!["description".into()],
            },
            &admin(8),
        ))
        .await
        .expect("update")
        .into_inner();
    assert_eq!(updated.name, "Gold");
    assert_eq!(updated.description, "24/7");
    assert_eq!(updated.reaction_time, 15 * 60_000);
    assert_eq!(updated.updated_by.as_ref().map(|u| u.id), Some(8));
    assert_eq!(updated.created_by.as_ref().map(|u| u.id), Some(7));

    let located = svc
        .locate_sla(request(
            LocateSlaRequest {
                id: created.id,
                fields: vec!["name,reaction_time".into()],
            },
            &caller,
        ))
        .await
        .expect("locate")
        .into_inner()
        .sla
        .expect("sla");
    assert_eq!(located.id, created.id);
    assert_eq!(located.reaction_time, 15 * 60_000);
    assert!(located.description.is_empty());

    svc.delete_sla(request(DeleteSlaRequest { id: created.id }, &caller))
        .await
        .expect("delete");
    let err = svc
        .locate_sla(request(
            LocateSlaRequest {
                id: created.id,
                fields: vec![],
            },
            &caller,
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
}

#[tokio::test]
async fn test_sla_validation_and_access() {
    let svc = SlaServiceImpl::new(state());

    let err = svc
        .create_sla(request(
            CreateSlaRequest {
                input: Some(sla_input("Gold")),
            },
            &reader(3),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::PermissionDenied);

    let err = svc
        .create_sla(request(
            CreateSlaRequest {
                input: Some(sla_input("   ")),
            },
            &admin(1),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    let err = svc
        .create_sla(request(CreateSlaRequest { input: None }, &admin(1)))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    let err = svc
        .list_slas(tonic::Request::new(ListSlasRequest::default()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Unauthenticated);
}

#[tokio::test]
async fn test_sla_list_paging_search_and_sort() {
    let svc = SlaServiceImpl::new(state());
    let caller = admin(1);
    for name in ["Gold", "Silver", "Bronze", "Gold Plus", "Platinum"] {
        svc.create_sla(request(
            CreateSlaRequest {
                input: Some(sla_input(name)),
            },
            &caller,
        ))
        .await
        .expect("create");
    }

    let page = svc
        .list_slas(request(
            ListSlasRequest {
                page: 2,
                size: 2,
                sort: "-name".into(),
                ..Default::default()
            },
            &reader(2),
        ))
        .await
        .expect("list")
        .into_inner();
    let names: Vec<_> = page.items.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Gold Plus", "Gold"]);
    assert_eq!(page.page, 2);
    assert!(page.next);

    let page = svc
        .list_slas(request(
            ListSlasRequest {
                q: "gold*".into(),
                fields: vec!["name".into()],
                ..Default::default()
            },
            &caller,
        ))
        .await
        .expect("list")
        .into_inner();
    assert_eq!(page.items.len(), 2);
    assert!(!page.next);
    assert!(page.items.iter().all(|s| s.reaction_time == 0));
}

#[tokio::test]
async fn test_sla_conditions_scoped_and_cascaded() {
    let state = state();
    let slas = SlaServiceImpl::new(state.clone());
    let conditions = SlaConditionServiceImpl::new(state.clone());
    let priorities = PriorityServiceImpl::new(state.clone());
    let caller = admin(1);

    for name in ["Gold", "Silver"] {
        slas.create_sla(request(
            CreateSlaRequest {
                input: Some(sla_input(name)),
            },
            &caller,
        ))
        .await
        .expect("sla");
    }
    for (name, color) in [("High", "#ff0000"), ("Low", "")] {
        priorities
            .create_priority(request(
                CreatePriorityRequest {
                    input: Some(InputPriority {
                        name: name.into(),
                        color: color.into(),
                        ..Default::default()
                    }),
                },
                &caller,
            ))
            .await
            .expect("priority");
    }

    let urgent = conditions
        .create_sla_condition(request(
            CreateSlaConditionRequest {
                sla_id: 1,
                input: Some(InputSlaCondition {
                    name: "urgent".into(),
                    priorities: vec![priority_ref(1)],
                    reaction_time: 60_000,
                    resolution_time: 600_000,
                }),
            },
            &caller,
        ))
        .await
        .expect("condition")
        .into_inner();
    assert_eq!(urgent.sla_id, 1);
    assert_eq!(urgent.priorities[0].name, "High");

    let err = conditions
        .create_sla_condition(request(
            CreateSlaConditionRequest {
                sla_id: 1,
                input: Some(InputSlaCondition {
                    name: "duplicate".into(),
                    priorities: vec![priority_ref(1)],
                    ..Default::default()
                }),
            },
            &caller,
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::AlreadyExists);

    // the same priority is free in another SLA
    conditions
        .create_sla_condition(request(
            CreateSlaConditionRequest {
                sla_id: 2,
                input: Some(InputSlaCondition {
                    name: "urgent".into(),
                    priorities: vec![priority_ref(1), priority_ref(2)],
                    ..Default::default()
                }),
            },
            &caller,
        ))
        .await
        .expect("condition in second sla");

    let err = conditions
        .locate_sla_condition(request(
            LocateSlaConditionRequest {
                sla_id: 2,
                id: urgent.id,
                fields: vec![],
            },
            &caller,
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    let err = conditions
        .list_sla_conditions(request(
            ListSlaConditionsRequest {
                sla_id: 99,
                ..Default::default()
            },
            &caller,
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    // removing a priority detaches it from every condition
    priorities
        .delete_priority(request(DeletePriorityRequest { id: 1 }, &caller))
        .await
        .expect("delete priority");
    let listed = conditions
        .list_sla_conditions(request(
            ListSlaConditionsRequest {
                sla_id: 2,
                ..Default::default()
            },
            &caller,
        ))
        .await
        .expect("list")
        .into_inner();
    let ids: Vec<i64> = listed.items[0].priorities.iter().map(|p| p.id).collect();
    assert_eq!(ids, [2]);

    slas.delete_sla(request(DeleteSlaRequest { id: 1 }, &caller))
        .await
        .expect("delete sla");
    assert!(state.sla_conditions.scope_rows(1).is_empty());
    assert_eq!(state.sla_conditions.scope_rows(2).len(), 1);
}

#[tokio::test]
async fn test_priority_color_validation() {
    let svc = PriorityServiceImpl::new(state());
    let err = svc
        .create_priority(request(
            CreatePriorityRequest {
                input: Some(InputPriority {
                    name: "High".into(),
                    color: "red".into(),
                    ..Default::default()
                }),
            },
            &admin(1),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    let list = svc
        .list_priorities(request(ListPrioritiesRequest::default(), &admin(1)))
        .await
        .expect("list")
        .into_inner();
    assert!(list.items.is_empty());
    assert_eq!(list.page, 1);
    assert!(!list.next);
}

#[tokio::test]
async fn test_priority_rename_reaches_sla_conditions() {
    let state = state();
    let slas = SlaServiceImpl::new(state.clone());
    let conditions = SlaConditionServiceImpl::new(state.clone());
    let priorities = PriorityServiceImpl::new(state.clone());
    let caller = admin(1);

    slas.create_sla(request(
        CreateSlaRequest {
            input: Some(sla_input("Gold")),
        },
        &caller,
    ))
    .await
    .expect("sla");
    priorities
        .create_priority(request(
            CreatePriorityRequest {
                input: Some(InputPriority {
                    name: "High".into(),
                    ..Default::default()
                }),
            },
            &caller,
        ))
        .await
        .expect("priority");
    let created = conditions
        .create_sla_condition(request(
            CreateSlaConditionRequest {
                sla_id: 1,
                input: Some(InputSlaCondition {
                    name: "urgent".into(),
                    priorities: vec![priority_ref(1)],
                    ..Default::default()
                }),
            },
            &caller,
        ))
        .await
        .expect("condition")
        .into_inner();
    assert_eq!(created.priorities[0].name, "High");

    priorities
        .update_priority(request(
            UpdatePriorityRequest {
                id: 1,
                input: Some(InputPriority {
                    name: "Critical".into(),
                    ..Default::default()
                }),
                x_json_mask: vec!["name".into()],
            },
            &caller,
        ))
        .await
        .expect("rename");

    let located = conditions
        .locate_sla_condition(request(
            LocateSlaConditionRequest {
                sla_id: 1,
                id: created.id,
                fields: vec![],
            },
            &caller,
        ))
        .await
        .expect("locate")
        .into_inner()
        .sla_condition
        .expect("condition");
    assert_eq!(located.priorities[0].name, "Critical");

    // a color change leaves the condition untouched
    priorities
        .update_priority(request(
            UpdatePriorityRequest {
                id: 1,
                input: Some(InputPriority {
                    color: "#00ff00".into(),
                    ..Default::default()
                }),
                x_json_mask: vec!["color".into()],
            },
            &caller,
        ))
        .await
        .expect("recolor");
    let rows = state.sla_conditions.scope_rows(1);
    assert_eq!(rows[0].ver, 2);
    assert_eq!(rows[0].value.priorities[0].name, "Critical");
}

#[tokio::test]
async fn test_close_reasons_cascade() {
    let state = state();
    let groups = CloseReasonServiceImpl::new(state.clone());
    let reasons = ReasonServiceImpl::new(state.clone());
    let caller = admin(1);

    for name in ["Resolved", "Rejected"] {
        groups
            .create_close_reason(request(
                CreateCloseReasonRequest {
                    input: Some(InputCloseReason {
                        name: name.into(),
                        ..Default::default()
                    }),
                },
                &caller,
            ))
            .await
            .expect("group");
    }
    for (group, name) in [(1, "Fixed"), (1, "Workaround"), (2, "Duplicate")] {
        reasons
            .create_reason(request(
                CreateReasonRequest {
                    close_reason_id: group,
                    input: Some(InputReason {
                        name: name.into(),
                        ..Default::default()
                    }),
                },
                &caller,
            ))
            .await
            .expect("reason");
    }

    let listed = reasons
        .list_reasons(request(
            ListReasonsRequest {
                close_reason_id: 1,
                ..Default::default()
            },
            &caller,
        ))
        .await
        .expect("list")
        .into_inner();
    assert_eq!(listed.items.len(), 2);

    let err = reasons
        .locate_reason(request(
            LocateReasonRequest {
                close_reason_id: 1,
                id: 3,
                fields: vec![],
            },
            &caller,
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    groups
        .delete_close_reason(request(DeleteCloseReasonRequest { id: 1 }, &caller))
        .await
        .expect("delete");
    assert!(state.reasons.scope_rows(1).is_empty());
    assert_eq!(state.reasons.scope_rows(2).len(), 1);

    let err = reasons
        .create_reason(request(
            CreateReasonRequest {
                close_reason_id: 1,
                input: Some(InputReason {
                    name: "orphan".into(),
                    ..Default::default()
                }),
            },
            &caller,
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
}

#[tokio::test]
async fn test_sources_type_filter() {
    let svc = SourceServiceImpl::new(state());
    let caller = admin(1);
    for (name, kind) in [
        ("Hotline", SourceType::Call),
        ("Support mailbox", SourceType::Email),
        ("Website chat", SourceType::Chat),
        ("Sales mailbox", SourceType::Email),
    ] {
        svc.create_source(request(
            CreateSourceRequest {
                input: Some(InputSource {
                    name: name.into(),
                    r#type: kind as i32,
                    ..Default::default()
                }),
            },
            &caller,
        ))
        .await
        .expect("source");
    }

    let emails = svc
        .list_sources(request(
            ListSourcesRequest {
                r#type: vec![SourceType::Email as i32],
                ..Default::default()
            },
            &caller,
        ))
        .await
        .expect("list")
        .into_inner();
    let names: Vec<_> = emails.items.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Support mailbox", "Sales mailbox"]);

    let err = svc
        .create_source(request(
            CreateSourceRequest {
                input: Some(InputSource {
                    name: "Unknown".into(),
                    ..Default::default()
                }),
            },
            &caller,
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn test_status_conditions_keep_one_initial() {
    let state = state();
    let statuses = StatusServiceImpl::new(state.clone());
    let conditions = StatusConditionServiceImpl::new(state.clone());
    let caller = admin(1);

    statuses
        .create_status(request(
            CreateStatusRequest {
                input: Some(InputStatus {
                    name: "Support".into(),
                    ..Default::default()
                }),
            },
            &caller,
        ))
        .await
        .expect("status");

    let create = |name: &str, initial: bool| {
        request(
            CreateStatusConditionRequest {
                status_id: 1,
                input: Some(InputStatusCondition {
                    name: name.into(),
                    initial,
                    ..Default::default()
                }),
            },
            &caller,
        )
    };

    let new = conditions
        .create_status_condition(create("New", false))
        .await
        .expect("first")
        .into_inner();
    assert!(new.initial);
    let open = conditions
        .create_status_condition(create("Open", false))
        .await
        .expect("second")
        .into_inner();
    assert!(!open.initial);

    let initial_ids = || {
        state
            .status_conditions
            .scope_rows(1)
            .into_iter()
            .filter(|row| row.value.initial)
            .map(|row| row.value.id)
            .collect::<Vec<_>>()
    };

    let err = conditions
        .delete_status_condition(request(
            DeleteStatusConditionRequest {
                status_id: 1,
                id: new.id,
            },
            &caller,
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::FailedPrecondition);

    let err = conditions
        .update_status_condition(request(
            UpdateStatusConditionRequest {
                status_id: 1,
                id: new.id,
                input: Some(InputStatusCondition::default()),
                x_json_mask: vec!["initial".into()],
            },
            &caller,
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::FailedPrecondition);
    assert_eq!(
        err.message(),
        format!("condition {} is initial; mark another condition initial first", new.id)
    );
    assert_eq!(initial_ids(), [new.id]);

    let promoted = conditions
        .update_status_condition(request(
            UpdateStatusConditionRequest {
                status_id: 1,
                id: open.id,
                input: Some(InputStatusCondition {
                    initial: true,
                    ..Default::default()
                }),
                x_json_mask: vec!["initial".into()],
            },
            &caller,
        ))
        .await
        .expect("promote")
        .into_inner();
    assert!(promoted.initial);
    assert_eq!(promoted.name, "Open");
    assert_eq!(initial_ids(), [open.id]);

    let closed = conditions
        .create_status_condition(create("Closed", true))
        .await
        .expect("third")
        .into_inner();
    assert_eq!(initial_ids(), [closed.id]);

    conditions
        .delete_status_condition(request(
            DeleteStatusConditionRequest {
                status_id: 1,
                id: new.id,
            },
            &caller,
        ))
        .await
        .expect("non-initial delete");

    let listed = conditions
        .list_status_conditions(request(
            ListStatusConditionsRequest {
                status_id: 1,
                sort: "-initial".into(),
                ..Default::default()
            },
            &caller,
        ))
        .await
        .expect("list")
        .into_inner();
    let names: Vec<_> = listed.items.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Closed", "Open"]);
}
