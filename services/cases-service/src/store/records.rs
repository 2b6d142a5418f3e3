//! [`Record`] implementations for the stored message types.

use super::query::{SortKey, ToSortKey};
use cases_proto::cases::{
    CaseComment, CaseLink, CloseReason, Lookup, Priority, Reason, Sla, SlaCondition, Source,
    Status, StatusCondition,
};

/// A message type that can live in a [`Store`](super::Store).
pub trait Record: Clone + Default + Send + Sync + 'static {
    /// Human readable kind used in error messages.
    const KIND: &'static str;

    /// Primary key.
    fn id(&self) -> i64;

    /// Assign the primary key on insert.
    fn set_id(&mut self, id: i64);

    /// Parent key for records that only exist inside another record.
    fn scope(&self) -> Option<i64>;

    /// Text matched by the `q` list filter.
    fn search_text(&self) -> &str;

    /// Sort key of a named field, `None` for unknown or unsortable fields.
    fn sort_key(&self, field: &str) -> Option<SortKey>;

    /// Copy of the record holding only the named fields and the id.
    #[must_use]
    fn project(&self, fields: &[String]) -> Self;

    /// Stamp creation (and initial modification) audit fields.
    fn touch_created(&mut self, by: &Lookup, at: i64);

    /// Stamp modification audit fields.
    fn touch_updated(&mut self, by: &Lookup, at: i64);
}

macro_rules! record {
    (
        $ty:ty, $kind:literal,
        scope: [$($scope:ident)?],
        search: $search:ident,
        sort { $($skey:literal => $sfield:ident),* $(,)? },
        fields { $($fkey:literal => $ffield:ident),* $(,)? } $(,)?
    ) => {
        impl Record for $ty {
            const KIND: &'static str = $kind;

            fn id(&self) -> i64 {
                self.id
            }

            fn set_id(&mut self, id: i64) {
                self.id = id;
            }

            fn scope(&self) -> Option<i64> {
                None::<i64>$(.or(Some(self.$scope)))?
            }

            fn search_text(&self) -> &str {
                &self.$search
            }

            fn sort_key(&self, field: &str) -> Option<SortKey> {
                match field {
                    "id" => Some(self.id.to_sort_key()),
                    "created_at" => Some(self.created_at.to_sort_key()),
                    "updated_at" => Some(self.updated_at.to_sort_key()),
                    $($skey => Some(self.$sfield.to_sort_key()),)*
                    _ => None,
                }
            }

            fn project(&self, fields: &[String]) -> Self {
                if fields.is_empty() {
                    return self.clone();
                }
                let mut out = <$ty>::default();
                out.id = self.id;
                for field in fields {
                    match field.as_str() {
                        "created_at" => out.created_at = self.created_at,
                        "created_by" => out.created_by.clone_from(&self.created_by),
                        "updated_at" => out.updated_at = self.updated_at,
                        "updated_by" => out.updated_by.clone_from(&self.updated_by),
                        $($fkey => out.$ffield.clone_from(&self.$ffield),)*
                        _ => {}
                    }
                }
                out
            }

            fn touch_created(&mut self, by: &Lookup, at: i64) {
                self.created_at = at;
                self.created_by = Some(by.clone());
                self.touch_updated(by, at);
            }

            fn touch_updated(&mut self, by: &Lookup, at: i64) {
                self.updated_at = at;
                self.updated_by = Some(by.clone());
            }
        }
    };
}

record!(
    Sla, "sla",
    scope: [],
    search: name,
    sort {
        "name" => name,
        "valid_from" => valid_from,
        "valid_to" => valid_to,
        "reaction_time" => reaction_time,
        "resolution_time" => resolution_time,
    },
    fields {
        "name" => name,
        "description" => description,
        "valid_from" => valid_from,
        "valid_to" => valid_to,
        "calendar" => calendar,
        "reaction_time" => reaction_time,
        "resolution_time" => resolution_time,
    },
);

record!(
    SlaCondition, "sla condition",
    scope: [sla_id],
    search: name,
    sort {
        "name" => name,
        "reaction_time" => reaction_time,
        "resolution_time" => resolution_time,
    },
    fields {
        "name" => name,
        "priorities" => priorities,
        "reaction_time" => reaction_time,
        "resolution_time" => resolution_time,
        "sla_id" => sla_id,
    },
);

record!(
    CloseReason, "close reason",
    scope: [],
    search: name,
    sort { "name" => name },
    fields {
        "name" => name,
        "description" => description,
    },
);

record!(
    Reason, "reason",
    scope: [close_reason_id],
    search: name,
    sort { "name" => name },
    fields {
        "name" => name,
        "description" => description,
        "close_reason_id" => close_reason_id,
    },
);

record!(
    Source, "source",
    scope: [],
    search: name,
    sort {
        "name" => name,
        "type" => r#type,
    },
    fields {
        "name" => name,
        "description" => description,
        "type" => r#type,
    },
);

record!(
    Status, "status",
    scope: [],
    search: name,
    sort { "name" => name },
    fields {
        "name" => name,
        "description" => description,
    },
);

record!(
    StatusCondition, "status condition",
    scope: [status_id],
    search: name,
    sort {
        "name" => name,
        "initial" => initial,
        "final" => r#final,
    },
    fields {
        "name" => name,
        "description" => description,
        "initial" => initial,
        "final" => r#final,
        "status_id" => status_id,
    },
);

record!(
    Priority, "priority",
    scope: [],
    search: name,
    sort {
        "name" => name,
        "color" => color,
    },
    fields {
        "name" => name,
        "description" => description,
        "color" => color,
    },
);

record!(
    CaseComment, "comment",
    scope: [case_id],
    search: text,
    sort { "edited" => edited },
    fields {
        "text" => text,
        "edited" => edited,
        "author" => author,
        "case_id" => case_id,
    },
);

record!(
    CaseLink, "link",
    scope: [case_id],
    search: name,
    sort {
        "name" => name,
        "url" => url,
    },
    fields {
        "name" => name,
        "url" => url,
        "author" => author,
        "case_id" => case_id,
    },
);

#[cfg(test)]
mod tests {
    use super::*;

    fn sla() -> Sla {
        Sla {
            id: 3,
            name: "Gold".into(),
            description: "24/7".into(),
            reaction_time: 60_000,
            calendar: Some(Lookup {
                id: 1,
                name: "Default".into(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_project_keeps_id_and_named_fields() {
        let projected = sla().project(&["name".to_string(), "calendar".to_string()]);
        assert_eq!(projected.id, 3);
        assert_eq!(projected.name, "Gold");
        assert_eq!(projected.calendar.map(|c| c.id), Some(1));
        assert!(projected.description.is_empty());
        assert_eq!(projected.reaction_time, 0);
    }

    #[test]
    fn test_project_empty_is_identity() {
        assert_eq!(sla().project(&[]), sla());
    }

    #[test]
    fn test_scope() {
        assert_eq!(sla().scope(), None);
        let condition = StatusCondition {
            status_id: 9,
            ..Default::default()
        };
        assert_eq!(condition.scope(), Some(9));
    }

    #[test]
    fn test_sort_keys() {
        let s = sla();
        assert_eq!(s.sort_key("name"), Some(SortKey::Text("gold".into())));
        assert_eq!(s.sort_key("reaction_time"), Some(SortKey::Int(60_000)));
        assert_eq!(s.sort_key("calendar"), None);
    }

    #[test]
    fn test_touch_created_stamps_both() {
        let who = Lookup {
            id: 7,
            name: "agent".into(),
        };
        let mut s = sla();
        s.touch_created(&who, 1_000);
        assert_eq!(s.created_at, 1_000);
        assert_eq!(s.updated_at, 1_000);
        assert_eq!(s.created_by.as_ref().map(|l| l.id), Some(7));
        assert_eq!(s.updated_by, Some(who));
    }
}
