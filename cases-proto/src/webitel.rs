//! Static registry of the webitel cases RPC surface.
//!
//! For every service the registry records the access-control object class,
//! and for every method the access level it requires, the fully qualified
//! input and output message names, and the HTTP bindings an API gateway
//! exposes it under.
//!
//! ```
//! use cases_proto::webitel::{self, Access, HttpMethod};
//!
//! let found = webitel::route(HttpMethod::Put, "/cases/slas/42").unwrap();
//! assert_eq!(found.service.name, "Slas");
//! assert_eq!(found.method.name, "UpdateSla");
//! assert_eq!(found.method.access, Access::Update);
//! assert_eq!(found.param("id"), Some("42"));
//! ```

use regex::Regex;
use std::fmt;

/// Protobuf package of every service in the registry.
pub const PACKAGE: &str = "webitel.cases";

/// Access level a method requires on its service object class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// Create new records.
    Create,
    /// Read records.
    Read,
    /// Modify existing records.
    Update,
    /// Remove records.
    Delete,
}

impl Access {
    /// Single-letter flag used in grant strings (`c`, `r`, `u`, `d`).
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Create => 'c',
            Self::Read => 'r',
            Self::Update => 'u',
            Self::Delete => 'd',
        }
    }

    /// Parse a single grant flag.
    #[must_use]
    pub const fn from_char(flag: char) -> Option<Self> {
        match flag {
            'c' | 'C' => Some(Self::Create),
            'r' | 'R' => Some(Self::Read),
            'u' | 'U' => Some(Self::Update),
            'd' | 'D' => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// HTTP verb of a gateway binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl HttpMethod {
    /// Upper-case verb as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Parse a verb, ignoring ASCII case.
    #[must_use]
    pub fn parse(verb: &str) -> Option<Self> {
        [Self::Get, Self::Post, Self::Put, Self::Patch, Self::Delete]
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(verb))
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single HTTP route bound to an RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpBinding {
    /// HTTP verb.
    pub method: HttpMethod,
    /// Path template; `{name}` segments capture path parameters.
    pub path: &'static str,
}

impl HttpBinding {
    /// Anchored expression for the template: each `{name}` segment becomes a
    /// named group matching one path segment, and a trailing slash is allowed.
    fn pattern(&self) -> String {
        let mut pattern = String::from("^");
        for segment in segments(self.path) {
            pattern.push('/');
            match param_name(segment) {
                Some(name) => {
                    pattern.push_str("(?P<");
                    pattern.push_str(name);
                    pattern.push_str(">[^/]+)");
                }
                None => pattern.push_str(&regex::escape(segment)),
            }
        }
        pattern.push_str("/?$");
        pattern
    }

    /// Match `path` against this template, returning captured parameters.
    #[must_use]
    pub fn capture(&self, path: &str) -> Option<Vec<(&'static str, String)>> {
        let re = Regex::new(&self.pattern()).ok()?;
        let caps = re.captures(path)?;
        segments(self.path)
            .filter_map(param_name)
            .map(|name| Some((name, caps.name(name)?.as_str().to_string())))
            .collect()
    }

    /// Number of literal (non-parameter) segments in the template.
    #[must_use]
    pub fn literal_segments(&self) -> usize {
        segments(self.path)
            .filter(|s| param_name(s).is_none())
            .count()
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn param_name(segment: &str) -> Option<&str> {
    segment.strip_prefix('{')?.strip_suffix('}')
}

/// Registry entry for one RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebitelMethod {
    /// RPC name as declared in the service.
    pub name: &'static str,
    /// Access the caller must hold on the service object class.
    pub access: Access,
    /// Fully qualified input message name.
    pub input: &'static str,
    /// Fully qualified output message name.
    pub output: &'static str,
    /// Gateway bindings; never empty.
    pub bindings: &'static [HttpBinding],
}

/// Registry entry for one gRPC service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebitelService {
    /// Service name as declared in the proto package.
    pub name: &'static str,
    /// Access-control object class the methods are checked against.
    pub objclass: &'static str,
    /// Extra licenses required to use the service.
    pub additional_license: &'static [&'static str],
    /// Methods of the service.
    pub methods: &'static [WebitelMethod],
}

impl WebitelService {
    /// Fully qualified gRPC service name, e.g. `webitel.cases.Slas`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{PACKAGE}.{}", self.name)
    }

    /// Find a method by RPC name.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&'static WebitelMethod> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Result of resolving an HTTP request against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// Service owning the matched method.
    pub service: &'static WebitelService,
    /// Matched method.
    pub method: &'static WebitelMethod,
    /// Binding that matched.
    pub binding: &'static HttpBinding,
    /// Captured path parameters in template order.
    pub params: Vec<(&'static str, String)>,
}

impl RouteMatch {
    /// Value of a captured path parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Look up a service by name.
#[must_use]
pub fn service(name: &str) -> Option<&'static WebitelService> {
    SERVICES.iter().find(|s| s.name == name)
}

/// Look up a method by service and RPC name.
#[must_use]
pub fn method(service_name: &str, method_name: &str) -> Option<&'static WebitelMethod> {
    service(service_name).and_then(|s| s.method(method_name))
}

/// Resolve a gRPC request path such as `/webitel.cases.Slas/ListSlas`.
#[must_use]
pub fn lookup_path(path: &str) -> Option<(&'static WebitelService, &'static WebitelMethod)> {
    let (qualified, method_name) = path.trim_start_matches('/').split_once('/')?;
    let service_name = qualified.strip_prefix(PACKAGE)?.strip_prefix('.')?;
    let service = service(service_name)?;
    Some((service, service.method(method_name)?))
}

/// Resolve an HTTP request to the method bound to it.
///
/// When several templates match, the one with the most literal segments
/// wins; ties keep registry order.
#[must_use]
pub fn route(verb: HttpMethod, path: &str) -> Option<RouteMatch> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let mut best: Option<(usize, RouteMatch)> = None;

    for service in SERVICES {
        for method in service.methods {
            for binding in method.bindings.iter().filter(|b| b.method == verb) {
                let Some(params) = binding.capture(path) else {
                    continue;
                };
                let score = binding.literal_segments();
                if best.as_ref().is_none_or(|(top, _)| score > *top) {
                    best = Some((
                        score,
                        RouteMatch {
                            service,
                            method,
                            binding,
                            params,
                        },
                    ));
                }
            }
        }
    }

    best.map(|(_, found)| found)
}

macro_rules! method {
    ($name:literal, $access:ident, $input:literal => $output:literal, [$($verb:ident $path:literal),+ $(,)?]) => {
        WebitelMethod {
            name: $name,
            access: Access::$access,
            input: concat!("webitel.cases.", $input),
            output: concat!("webitel.cases.", $output),
            bindings: &[$(HttpBinding { method: HttpMethod::$verb, path: $path }),+],
        }
    };
}

const DICTIONARIES: &str = "dictionaries";
const CASES: &str = "cases";

/// Every service of the `webitel.cases` package.
pub static SERVICES: &[WebitelService] = &[
    WebitelService {
        name: "Slas",
        objclass: DICTIONARIES,
        additional_license: &[],
        methods: &[
            method!("ListSlas", Read, "ListSlasRequest" => "SlaList", [Get "/cases/slas"]),
            method!("CreateSla", Create, "CreateSlaRequest" => "Sla", [Post "/cases/slas"]),
            method!("UpdateSla", Update, "UpdateSlaRequest" => "Sla", [
                Put "/cases/slas/{id}",
                Patch "/cases/slas/{id}",
            ]),
            method!("DeleteSla", Delete, "DeleteSlaRequest" => "Sla", [Delete "/cases/slas/{id}"]),
            method!("LocateSla", Read, "LocateSlaRequest" => "LocateSlaResponse", [Get "/cases/slas/{id}"]),
        ],
    },
    WebitelService {
        name: "SlaConditions",
        objclass: DICTIONARIES,
        additional_license: &[],
        methods: &[
            method!("ListSlaConditions", Read, "ListSlaConditionsRequest" => "SlaConditionList", [
                Get "/cases/slas/{sla_id}/sla_conditions",
            ]),
            method!("CreateSlaCondition", Create, "CreateSlaConditionRequest" => "SlaCondition", [
                Post "/cases/slas/{sla_id}/sla_conditions",
            ]),
            method!("UpdateSlaCondition", Update, "UpdateSlaConditionRequest" => "SlaCondition", [
                Put "/cases/slas/{sla_id}/sla_conditions/{id}",
                Patch "/cases/slas/{sla_id}/sla_conditions/{id}",
            ]),
            method!("DeleteSlaCondition", Delete, "DeleteSlaConditionRequest" => "SlaCondition", [
                Delete "/cases/slas/{sla_id}/sla_conditions/{id}",
            ]),
            method!("LocateSlaCondition", Read, "LocateSlaConditionRequest" => "LocateSlaConditionResponse", [
                Get "/cases/slas/{sla_id}/sla_conditions/{id}",
            ]),
        ],
    },
    WebitelService {
        name: "CloseReasons",
        objclass: DICTIONARIES,
        additional_license: &[],
        methods: &[
            method!("ListCloseReasons", Read, "ListCloseReasonsRequest" => "CloseReasonList", [
                Get "/cases/close_reasons",
            ]),
            method!("CreateCloseReason", Create, "CreateCloseReasonRequest" => "CloseReason", [
                Post "/cases/close_reasons",
            ]),
            method!("UpdateCloseReason", Update, "UpdateCloseReasonRequest" => "CloseReason", [
                Put "/cases/close_reasons/{id}",
                Patch "/cases/close_reasons/{id}",
            ]),
            method!("DeleteCloseReason", Delete, "DeleteCloseReasonRequest" => "CloseReason", [
                Delete "/cases/close_reasons/{id}",
            ]),
            method!("LocateCloseReason", Read, "LocateCloseReasonRequest" => "LocateCloseReasonResponse", [
                Get "/cases/close_reasons/{id}",
            ]),
        ],
    },
    WebitelService {
        name: "Reasons",
        objclass: DICTIONARIES,
        additional_license: &[],
        methods: &[
            method!("ListReasons", Read, "ListReasonsRequest" => "ReasonList", [
                Get "/cases/close_reasons/{close_reason_id}/reasons",
            ]),
            method!("CreateReason", Create, "CreateReasonRequest" => "Reason", [
                Post "/cases/close_reasons/{close_reason_id}/reasons",
            ]),
            method!("UpdateReason", Update, "UpdateReasonRequest" => "Reason", [
                Put "/cases/close_reasons/{close_reason_id}/reasons/{id}",
                Patch "/cases/close_reasons/{close_reason_id}/reasons/{id}",
            ]),
            method!("DeleteReason", Delete, "DeleteReasonRequest" => "Reason", [
                Delete "/cases/close_reasons/{close_reason_id}/reasons/{id}",
            ]),
            method!("LocateReason", Read, "LocateReasonRequest" => "LocateReasonResponse", [
                Get "/cases/close_reasons/{close_reason_id}/reasons/{id}",
            ]),
        ],
    },
    WebitelService {
        name: "Sources",
        objclass: DICTIONARIES,
        additional_license: &[],
        methods: &[
            method!("ListSources", Read, "ListSourcesRequest" => "SourceList", [Get "/cases/sources"]),
            method!("CreateSource", Create, "CreateSourceRequest" => "Source", [Post "/cases/sources"]),
            method!("UpdateSource", Update, "UpdateSourceRequest" => "Source", [
                Put "/cases/sources/{id}",
                Patch "/cases/sources/{id}",
            ]),
            method!("DeleteSource", Delete, "DeleteSourceRequest" => "Source", [Delete "/cases/sources/{id}"]),
            method!("LocateSource", Read, "LocateSourceRequest" => "LocateSourceResponse", [Get "/cases/sources/{id}"]),
        ],
    },
    WebitelService {
        name: "Statuses",
        objclass: DICTIONARIES,
        additional_license: &[],
        methods: &[
            method!("ListStatuses", Read, "ListStatusesRequest" => "StatusList", [Get "/cases/statuses"]),
            method!("CreateStatus", Create, "CreateStatusRequest" => "Status", [Post "/cases/statuses"]),
            method!("UpdateStatus", Update, "UpdateStatusRequest" => "Status", [
                Put "/cases/statuses/{id}",
                Patch "/cases/statuses/{id}",
            ]),
            method!("DeleteStatus", Delete, "DeleteStatusRequest" => "Status", [Delete "/cases/statuses/{id}"]),
            method!("LocateStatus", Read, "LocateStatusRequest" => "LocateStatusResponse", [Get "/cases/statuses/{id}"]),
        ],
    },
    WebitelService {
        name: "StatusConditions",
        objclass: DICTIONARIES,
        additional_license: &[],
        methods: &[
            method!("ListStatusConditions", Read, "ListStatusConditionsRequest" => "StatusConditionList", [
                Get "/cases/statuses/{status_id}/conditions",
            ]),
            method!("CreateStatusCondition", Create, "CreateStatusConditionRequest" => "StatusCondition", [
                Post "/cases/statuses/{status_id}/conditions",
            ]),
            method!("UpdateStatusCondition", Update, "UpdateStatusConditionRequest" => "StatusCondition", [
                Put "/cases/statuses/{status_id}/conditions/{id}",
                Patch "/cases/statuses/{status_id}/conditions/{id}",
            ]),
            method!("DeleteStatusCondition", Delete, "DeleteStatusConditionRequest" => "StatusCondition", [
                Delete "/cases/statuses/{status_id}/conditions/{id}",
            ]),
            method!("LocateStatusCondition", Read, "LocateStatusConditionRequest" => "LocateStatusConditionResponse", [
                Get "/cases/statuses/{status_id}/conditions/{id}",
            ]),
        ],
    },
    WebitelService {
        name: "Priorities",
        objclass: DICTIONARIES,
        additional_license: &[],
        methods: &[
            method!("ListPriorities", Read, "ListPrioritiesRequest" => "PriorityList", [Get "/cases/priorities"]),
            method!("CreatePriority", Create, "CreatePriorityRequest" => "Priority", [Post "/cases/priorities"]),
            method!("UpdatePriority", Update, "UpdatePriorityRequest" => "Priority", [
                Put "/cases/priorities/{id}",
                Patch "/cases/priorities/{id}",
            ]),
            method!("DeletePriority", Delete, "DeletePriorityRequest" => "Priority", [
                Delete "/cases/priorities/{id}",
            ]),
            method!("LocatePriority", Read, "LocatePriorityRequest" => "LocatePriorityResponse", [
                Get "/cases/priorities/{id}",
            ]),
        ],
    },
    WebitelService {
        name: "CaseComments",
        objclass: CASES,
        additional_license: &[],
        methods: &[
            method!("ListComments", Read, "ListCommentsRequest" => "CaseCommentList", [
                Get "/cases/{case_etag}/comments",
            ]),
            method!("PublishComment", Create, "PublishCommentRequest" => "CaseComment", [
                Post "/cases/{case_etag}/comments",
            ]),
            method!("UpdateComment", Update, "UpdateCommentRequest" => "CaseComment", [
                Put "/cases/comments/{etag}",
                Patch "/cases/comments/{etag}",
            ]),
            method!("DeleteComment", Delete, "DeleteCommentRequest" => "CaseComment", [
                Delete "/cases/comments/{etag}",
            ]),
            method!("LocateComment", Read, "LocateCommentRequest" => "CaseComment", [
                Get "/cases/comments/{etag}",
            ]),
        ],
    },
    WebitelService {
        name: "CaseLinks",
        objclass: CASES,
        additional_license: &[],
        methods: &[
            method!("ListLinks", Read, "ListLinksRequest" => "CaseLinkList", [
                Get "/cases/{case_etag}/links",
            ]),
            method!("CreateLink", Create, "CreateLinkRequest" => "CaseLink", [
                Post "/cases/{case_etag}/links",
            ]),
            method!("UpdateLink", Update, "UpdateLinkRequest" => "CaseLink", [
                Put "/cases/{case_etag}/links/{etag}",
                Patch "/cases/{case_etag}/links/{etag}",
            ]),
            method!("DeleteLink", Delete, "DeleteLinkRequest" => "CaseLink", [
                Delete "/cases/{case_etag}/links/{etag}",
            ]),
            method!("LocateLink", Read, "LocateLinkRequest" => "CaseLink", [
                Get "/cases/{case_etag}/links/{etag}",
            ]),
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_method_has_a_binding() {
        for service in SERVICES {
            for method in service.methods {
                assert!(
                    !method.bindings.is_empty(),
                    "{}/{} has no bindings",
                    service.name,
                    method.name
                );
                assert!(method.input.starts_with("webitel.cases."));
                assert!(method.output.starts_with("webitel.cases."));
            }
        }
    }

    #[test]
    fn test_registry_matches_descriptor_set() {
        use prost::Message;

        let set = prost_types::FileDescriptorSet::decode(crate::FILE_DESCRIPTOR_SET)
            .expect("descriptor set decodes");
        let mut declared = HashSet::new();
        for file in set.file.iter().filter(|f| f.package() == PACKAGE) {
            for svc in &file.service {
                for rpc in &svc.method {
                    let input = rpc.input_type().trim_start_matches('.');
                    let output = rpc.output_type().trim_start_matches('.');
                    let entry = method(svc.name(), rpc.name()).unwrap_or_else(|| {
                        panic!("{}/{} missing from registry", svc.name(), rpc.name())
                    });
                    assert_eq!((entry.input, entry.output), (input, output), "{}", rpc.name());
                    declared.insert((svc.name().to_string(), rpc.name().to_string()));
                }
            }
        }

        let registered: usize = SERVICES.iter().map(|s| s.methods.len()).sum();
        assert_eq!(declared.len(), registered);
    }

    #[test]
    fn test_method_names_unique_per_service() {
        for service in SERVICES {
            let names: HashSet<_> = service.methods.iter().map(|m| m.name).collect();
            assert_eq!(names.len(), service.methods.len(), "{}", service.name);
        }
    }

    #[test]
    fn test_lookup_path() {
        let (service, method) = lookup_path("/webitel.cases.SlaConditions/DeleteSlaCondition")
            .expect("should resolve");
        assert_eq!(service.name, "SlaConditions");
        assert_eq!(method.access, Access::Delete);

        assert!(lookup_path("/webitel.cases.Slas/Nope").is_none());
        assert!(lookup_path("/other.pkg.Slas/ListSlas").is_none());
        assert!(lookup_path("garbage").is_none());
    }

    #[test]
    fn test_route_collection_and_item() {
        let list = route(HttpMethod::Get, "/cases/slas").expect("list route");
        assert_eq!(list.method.name, "ListSlas");
        assert!(list.params.is_empty());

        let locate = route(HttpMethod::Get, "/cases/slas/7?fields=name").expect("locate route");
        assert_eq!(locate.method.name, "LocateSla");
        assert_eq!(locate.param("id"), Some("7"));

        let patch = route(HttpMethod::Patch, "/cases/slas/7/").expect("patch route");
        assert_eq!(patch.method.name, "UpdateSla");
    }

    #[test]
    fn test_route_nested_parameters() {
        let found = route(HttpMethod::Delete, "/cases/statuses/3/conditions/9").expect("route");
        assert_eq!(found.service.name, "StatusConditions");
        assert_eq!(found.param("status_id"), Some("3"));
        assert_eq!(found.param("id"), Some("9"));
    }

    #[test]
    fn test_route_case_scoped_paths() {
        let found = route(HttpMethod::Get, "/cases/comments/abc").expect("route");
        assert_eq!(found.method.name, "LocateComment");
        assert_eq!(found.param("etag"), Some("abc"));

        let found = route(HttpMethod::Get, "/cases/abc/comments").expect("route");
        assert_eq!(found.method.name, "ListComments");
        assert_eq!(found.param("case_etag"), Some("abc"));
    }

    #[test]
    fn test_route_ambiguity_resolution() {
        // `/cases/slas/{id}` and `/cases/{case_etag}/links` both match with
        // two literal segments; registry order decides.
        let found = route(HttpMethod::Get, "/cases/slas/links").expect("route");
        assert_eq!(found.method.name, "LocateSla");

        let nested = HttpBinding {
            method: HttpMethod::Get,
            path: "/cases/slas/{sla_id}/sla_conditions",
        };
        assert_eq!(nested.literal_segments(), 3);
        assert_eq!(
            nested.capture("/cases/slas/4/sla_conditions"),
            Some(vec![("sla_id", "4".to_string())])
        );
    }

    #[test]
    fn test_route_rejects_unknown() {
        assert!(route(HttpMethod::Post, "/cases/slas/1").is_none());
        assert!(route(HttpMethod::Get, "/cases").is_none());
        assert!(route(HttpMethod::Get, "/cases/slas/1/extra/more").is_none());
        assert!(route(HttpMethod::Get, "/cases/slas/").is_some());
        assert!(route(HttpMethod::Get, "/cases/slasx").is_none());
    }

    #[test]
    fn test_capture_keeps_template_order() {
        let binding = HttpBinding {
            method: HttpMethod::Put,
            path: "/cases/close_reasons/{close_reason_id}/reasons/{id}",
        };
        assert_eq!(
            binding.capture("/cases/close_reasons/2/reasons/11"),
            Some(vec![
                ("close_reason_id", "2".to_string()),
                ("id", "11".to_string()),
            ])
        );
        assert_eq!(binding.capture("/cases/close_reasons/2/reasons"), None);
        assert_eq!(binding.capture("/cases/close_reasons/2/reasons/11/x"), None);
    }

    #[test]
    fn test_access_flags() {
        for access in [Access::Create, Access::Read, Access::Update, Access::Delete] {
            assert_eq!(Access::from_char(access.as_char()), Some(access));
        }
        assert_eq!(Access::from_char('x'), None);
        assert_eq!(HttpMethod::parse("patch"), Some(HttpMethod::Patch));
        assert_eq!(HttpMethod::parse("HEAD"), None);
    }

    #[test]
    fn test_objclasses() {
        assert_eq!(service("Slas").map(|s| s.objclass), Some("dictionaries"));
        assert_eq!(service("CaseLinks").map(|s| s.objclass), Some("cases"));
        assert_eq!(
            service("Priorities").map(WebitelService::full_name).as_deref(),
            Some("webitel.cases.Priorities")
        );
    }
}
