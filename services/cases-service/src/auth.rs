//! Caller identification and registry-driven access control.
//!
//! The [`Authenticator`] interceptor turns request metadata into a [`Caller`]
//! stored in the request extensions. Handlers then call [`authorize`] with
//! their service and RPC name; the required access level and object class
//! come from the [`webitel`] registry.

use crate::error::{ServiceError, ServiceResult};
use cases_proto::cases::Lookup;
use cases_proto::webitel::{self, Access};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use tonic::metadata::MetadataMap;
use tonic::service::Interceptor;
use tonic::{Request, Status};
use tracing::debug;

/// Metadata key carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-webitel-user-id";
/// Metadata key carrying the caller's display name.
pub const USER_NAME_HEADER: &str = "x-webitel-user-name";
/// Metadata key carrying the caller's grants, e.g. `dictionaries:crud,cases:r`.
pub const ACCESS_HEADER: &str = "x-webitel-access";

/// Access levels a caller holds, per object class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grants {
    superuser: bool,
    objclasses: HashMap<String, HashSet<Access>>,
}

impl Grants {
    /// Grants allowing everything.
    #[must_use]
    pub fn superuser() -> Self {
        Self {
            superuser: true,
            objclasses: HashMap::new(),
        }
    }

    /// Add access levels on an object class.
    #[must_use]
    pub fn with(mut self, objclass: &str, access: impl IntoIterator<Item = Access>) -> Self {
        self.objclasses
            .entry(objclass.to_string())
            .or_default()
            .extend(access);
        self
    }

    /// Whether `access` on `objclass` is granted.
    #[must_use]
    pub fn allows(&self, objclass: &str, access: Access) -> bool {
        self.superuser
            || self
                .objclasses
                .get(objclass)
                .is_some_and(|granted| granted.contains(&access))
    }
}

impl FromStr for Grants {
    type Err = String;

    /// Parse `*` or a comma separated list of `objclass:flags`, where flags
    /// is any combination of `c`, `r`, `u`, `d`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut grants = Self::default();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            if entry == "*" {
                grants.superuser = true;
                continue;
            }
            let (objclass, flags) = entry
                .split_once(':')
                .ok_or_else(|| format!("grant `{entry}` must look like objclass:flags"))?;
            let objclass = objclass.trim();
            if objclass.is_empty() {
                return Err(format!("grant `{entry}` has no object class"));
            }
            let access = flags
                .trim()
                .chars()
                .map(|flag| {
                    Access::from_char(flag).ok_or_else(|| format!("unknown access flag `{flag}`"))
                })
                .collect::<Result<Vec<_>, _>>()?;
            grants = grants.with(objclass, access);
        }
        Ok(grants)
    }
}

/// Identity of the caller of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct Caller {
    /// The calling user.
    pub user: Lookup,
    /// What the user may do.
    pub grants: Grants,
}

impl Caller {
    /// Create a caller.
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>, grants: Grants) -> Self {
        Self {
            user: Lookup {
                id,
                name: name.into(),
            },
            grants,
        }
    }

    /// Superuser used when anonymous access is enabled.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new(0, "anonymous", Grants::superuser())
    }

    /// Whether the caller is the user referenced by `who`.
    #[must_use]
    pub fn is(&self, who: Option<&Lookup>) -> bool {
        who.is_some_and(|who| who.id == self.user.id)
    }

    /// Check the caller may invoke `method` of `service`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Internal`] if the method is not registered and
    /// [`ServiceError::PermissionDenied`] if the access is not granted.
    pub fn authorize(&self, service: &str, method: &str) -> ServiceResult<()> {
        let registered = webitel::service(service);
        let (service, method) = registered
            .and_then(|s| s.method(method).map(|m| (s, m)))
            .ok_or_else(|| {
                ServiceError::Internal(format!("{service}/{method} is not registered"))
            })?;

        if self.grants.allows(service.objclass, method.access) {
            Ok(())
        } else {
            Err(ServiceError::PermissionDenied(format!(
                "{} access to {} is required for {}",
                method.access, service.objclass, method.name
            )))
        }
    }
}

/// Resolve the caller of a request and check it may invoke the method.
///
/// # Errors
///
/// Returns [`ServiceError::Unauthenticated`] when the request did not pass
/// through the [`Authenticator`], otherwise see [`Caller::authorize`].
pub fn authorize<T>(request: &Request<T>, service: &str, method: &str) -> ServiceResult<Caller> {
    let caller = request
        .extensions()
        .get::<Caller>()
        .cloned()
        .ok_or_else(|| ServiceError::Unauthenticated("caller identity is missing".into()))?;
    caller.authorize(service, method)?;
    debug!(user_id = caller.user.id, service, method, "authorized");
    Ok(caller)
}

/// Interceptor identifying the caller from request metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticator {
    allow_anonymous: bool,
}

impl Authenticator {
    /// Create an authenticator.
    #[must_use]
    pub const fn new(allow_anonymous: bool) -> Self {
        Self { allow_anonymous }
    }

    fn header<'a>(metadata: &'a MetadataMap, key: &str) -> ServiceResult<Option<&'a str>> {
        metadata
            .get(key)
            .map(|value| {
                value
                    .to_str()
                    .map(str::trim)
                    .map_err(|_| ServiceError::Unauthenticated(format!("{key} is not valid ASCII")))
            })
            .transpose()
    }

    /// Build the caller from metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Unauthenticated`] when the identity is missing
    /// (and anonymous access is off) or malformed.
    pub fn identify(&self, metadata: &MetadataMap) -> ServiceResult<Caller> {
        let Some(raw_id) = Self::header(metadata, USER_ID_HEADER)? else {
            return if self.allow_anonymous {
                Ok(Caller::anonymous())
            } else {
                Err(ServiceError::Unauthenticated(format!("{USER_ID_HEADER} is required")))
            };
        };

        let id = raw_id
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| ServiceError::Unauthenticated(format!("invalid {USER_ID_HEADER}")))?;
        let name = Self::header(metadata, USER_NAME_HEADER)?.unwrap_or_default();
        let grants = Self::header(metadata, ACCESS_HEADER)?
            .map(str::parse::<Grants>)
            .transpose()
            .map_err(|e| ServiceError::Unauthenticated(format!("invalid {ACCESS_HEADER}: {e}")))?
            .unwrap_or_default();

        Ok(Caller::new(id, name, grants))
    }
}

impl Interceptor for Authenticator {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let caller = self.identify(request.metadata())?;
        request.extensions_mut().insert(caller);
        Ok(request)
    }
}
