//! gRPC service implementations.

mod close_reason;
mod comment;
mod link;
mod priority;
mod reason;
mod sla;
mod sla_condition;
mod source;
mod status;
mod status_condition;

pub use close_reason::CloseReasonServiceImpl;
pub use comment::CommentServiceImpl;
pub use link::LinkServiceImpl;
pub use priority::PriorityServiceImpl;
pub use reason::ReasonServiceImpl;
pub use sla::SlaServiceImpl;
pub use sla_condition::SlaConditionServiceImpl;
pub use source::SourceServiceImpl;
pub use status::StatusServiceImpl;
pub use status_condition::StatusConditionServiceImpl;

use crate::error::{ServiceError, ServiceResult};
use crate::store::{PageLimits, Store};
use cases_proto::cases::{
    CaseComment, CaseLink, CloseReason, Priority, Reason, Sla, SlaCondition, Source,
    Status as CaseStatus, StatusCondition,
};
use chrono::Utc;
use parking_lot::Mutex;

/// Tables shared by every service.
#[derive(Debug, Default)]
pub struct CasesState {
    /// Service level agreements.
    pub slas: Store<Sla>,
    /// SLA conditions, scoped by SLA.
    pub sla_conditions: Store<SlaCondition>,
    /// Close reason groups.
    pub close_reasons: Store<CloseReason>,
    /// Close reasons, scoped by group.
    pub reasons: Store<Reason>,
    /// Case sources.
    pub sources: Store<Source>,
    /// Status groups.
    pub statuses: Store<CaseStatus>,
    /// Status conditions, scoped by status.
    pub status_conditions: Store<StatusCondition>,
    /// Case priorities.
    pub priorities: Store<Priority>,
    /// Case comments, scoped by case.
    pub comments: Store<CaseComment>,
    /// Case links, scoped by case.
    pub links: Store<CaseLink>,
    /// Paging limits for list requests.
    pub limits: PageLimits,
    /// Serializes multi-row writes that must keep cross-row invariants.
    pub(crate) write_lock: Mutex<()>,
}

impl CasesState {
    /// Create empty tables with the given paging limits.
    #[must_use]
    pub fn new(limits: PageLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }
}

/// Current time in unix milliseconds.
pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Unwrap the `input` of a create or update request.
pub(crate) fn require_input<T>(input: Option<T>) -> ServiceResult<T> {
    input.ok_or_else(|| ServiceError::invalid("input is required"))
}

/// Trimmed, non-empty text field.
pub(crate) fn require_text(field: &str, value: &str) -> ServiceResult<String> {
    let value = value.trim();
    if value.is_empty() {
        Err(ServiceError::invalid(format!("{field} is required")))
    } else {
        Ok(value.to_string())
    }
}

/// Positive record id.
pub(crate) fn require_id(field: &str, id: i64) -> ServiceResult<i64> {
    if id > 0 {
        Ok(id)
    } else {
        Err(ServiceError::invalid(format!("{field} must be a positive id")))
    }
}

/// Non-negative duration in milliseconds.
pub(crate) fn require_duration(field: &str, millis: i64) -> ServiceResult<i64> {
    if millis >= 0 {
        Ok(millis)
    } else {
        Err(ServiceError::invalid(format!("{field} must not be negative")))
    }
}
