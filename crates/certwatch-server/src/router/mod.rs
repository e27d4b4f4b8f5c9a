//! Route table dispatch
//!
//! A route manifest is a static list of [`RouteDefinition`]s. [`register_routes`]
//! maps each entry onto the host router's per-verb registration call.
//!
//! The whole table is checked before the host sees anything: an unsupported
//! method, a duplicate method and path pair or a malformed path fails
//! registration with zero calls made. Host rejections during dispatch stop
//! registration and are returned unchanged.

pub mod axum_host;

pub use axum_host::AxumRouter;

use axum::http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{HostError, RegistrationError};
use crate::handler::ApiError;

/// HTTP verbs the host router can register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&Method> for Verb {
    type Error = RegistrationError;

    fn try_from(method: &Method) -> Result<Self, Self::Error> {
        match *method {
            Method::GET => Ok(Verb::Get),
            Method::POST => Ok(Verb::Post),
            Method::PUT => Ok(Verb::Put),
            Method::DELETE => Ok(Verb::Delete),
            _ => Err(RegistrationError::UnsupportedMethod {
                method: method.to_string(),
                path: String::new(),
            }),
        }
    }
}

/// Request data handed to a route handler
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteRequest {
    /// Path parameters, keyed by the `{name}` segments of the route path
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    /// Parsed JSON body, when one was sent and the route accepts it
    pub body: Option<serde_json::Value>,
}

impl RouteRequest {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Deserialize the body, treating a missing body as JSON `null`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let body = self.body.clone().unwrap_or(serde_json::Value::Null);
        serde_json::from_value(body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))
    }
}

/// Route handler callable
pub type RouteHandler =
    Arc<dyn Fn(RouteRequest) -> Result<serde_json::Value, ApiError> + Send + Sync>;

/// How a route treats the request body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyRule {
    /// Any body is dropped before the handler runs
    #[default]
    Ignore,
    Optional,
    Required,
}

/// Request validation enforced by the host before the handler runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteValidation {
    /// Query parameters that must be present
    pub query: Vec<String>,
    pub body: BodyRule,
}

impl RouteValidation {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, body: BodyRule) -> Self {
        self.body = body;
        self
    }

    pub fn require_query(mut self, name: impl Into<String>) -> Self {
        self.query.push(name.into());
        self
    }

    /// Check a request against this block, collecting every problem
    pub fn check(&self, request: &RouteRequest) -> Result<(), ApiError> {
        let mut problems: Vec<String> = self
            .query
            .iter()
            .filter(|name| !request.query.contains_key(name.as_str()))
            .map(|name| format!("missing required query parameter '{}'", name))
            .collect();

        if self.body == BodyRule::Required && request.body.is_none() {
            problems.push("request body is required".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ApiError::ValidationFailed(problems))
        }
    }
}

/// Who may call a route
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteAccess {
    #[default]
    Internal,
    Public,
}

impl RouteAccess {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteAccess::Internal => "internal",
            RouteAccess::Public => "public",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteOptions {
    pub access: RouteAccess,
    pub tags: Vec<String>,
}

impl RouteOptions {
    pub fn public() -> Self {
        Self {
            access: RouteAccess::Public,
            tags: Vec::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// One manifest entry
#[derive(Clone)]
pub struct RouteDefinition {
    pub method: Method,
    pub path: String,
    pub handler: RouteHandler,
    pub validate: RouteValidation,
    pub options: RouteOptions,
}

impl RouteDefinition {
    pub fn new<F>(method: Method, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(RouteRequest) -> Result<serde_json::Value, ApiError> + Send + Sync + 'static,
    {
        Self {
            method,
            path: path.into(),
            handler: Arc::new(handler),
            validate: RouteValidation::none(),
            options: RouteOptions::default(),
        }
    }

    pub fn with_validation(mut self, validate: RouteValidation) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_options(mut self, options: RouteOptions) -> Self {
        self.options = options;
        self
    }

    fn into_parts(self) -> (RouteConfig, RouteHandler) {
        (
            RouteConfig {
                path: self.path,
                validate: self.validate,
                options: self.options,
            },
            self.handler,
        )
    }
}

impl fmt::Debug for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("validate", &self.validate)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// The route fields a host receives alongside the handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteConfig {
    pub path: String,
    pub validate: RouteValidation,
    pub options: RouteOptions,
}

/// Host HTTP router with one registration entry point per verb
#[cfg_attr(test, mockall::automock)]
pub trait HostRouter {
    fn get(&mut self, config: RouteConfig, handler: RouteHandler) -> Result<(), HostError>;
    fn post(&mut self, config: RouteConfig, handler: RouteHandler) -> Result<(), HostError>;
    fn put(&mut self, config: RouteConfig, handler: RouteHandler) -> Result<(), HostError>;
    fn delete(&mut self, config: RouteConfig, handler: RouteHandler) -> Result<(), HostError>;
}

/// Summary of a manifest entry, for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSummary {
    pub method: String,
    pub path: String,
    pub access: RouteAccess,
    pub validate: RouteValidation,
}

impl From<&RouteDefinition> for RouteSummary {
    fn from(definition: &RouteDefinition) -> Self {
        Self {
            method: definition.method.to_string(),
            path: definition.path.clone(),
            access: definition.options.access,
            validate: definition.validate.clone(),
        }
    }
}

/// Check a manifest without registering it
///
/// Returns each entry paired with its verb, in manifest order.
pub fn plan_routes(
    definitions: Vec<RouteDefinition>,
) -> Result<Vec<(Verb, RouteDefinition)>, RegistrationError> {
    let mut seen = HashSet::with_capacity(definitions.len());
    let mut planned = Vec::with_capacity(definitions.len());

    for definition in definitions {
        if !definition.path.starts_with('/') {
            return Err(RegistrationError::InvalidPath(definition.path));
        }

        let verb = Verb::try_from(&definition.method).map_err(|_| {
            RegistrationError::UnsupportedMethod {
                method: definition.method.to_string(),
                path: definition.path.clone(),
            }
        })?;

        if !seen.insert((verb, definition.path.clone())) {
            return Err(RegistrationError::DuplicateRoute {
                method: verb.to_string(),
                path: definition.path,
            });
        }

        planned.push((verb, definition));
    }

    Ok(planned)
}

/// Register every route in `definitions` with `router`
///
/// Returns the number of routes registered.
pub fn register_routes<R>(
    definitions: Vec<RouteDefinition>,
    router: &mut R,
) -> Result<usize, RegistrationError>
where
    R: HostRouter + ?Sized,
{
    let planned = plan_routes(definitions)?;
    let count = planned.len();

    for (verb, definition) in planned {
        let (config, handler) = definition.into_parts();
        debug!(route.method = %verb, route.path = %config.path, "registering route");

        match verb {
            Verb::Get => router.get(config, handler)?,
            Verb::Post => router.post(config, handler)?,
            Verb::Put => router.put(config, handler)?,
            Verb::Delete => router.delete(config, handler)?,
        }
    }

    info!(routes = count, "routes registered");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::Sequence;

    fn ok_route(method: Method, path: &str) -> RouteDefinition {
        RouteDefinition::new(method, path, |_| Ok(serde_json::json!({})))
    }

    fn four_verbs() -> Vec<RouteDefinition> {
        vec![
            ok_route(Method::GET, "/a"),
            ok_route(Method::POST, "/b"),
            ok_route(Method::PUT, "/c"),
            ok_route(Method::DELETE, "/d"),
        ]
    }

    #[test]
    fn test_each_verb_dispatches_once() {
        let mut router = MockHostRouter::new();
        router
            .expect_get()
            .withf(|config, _| config.path == "/a")
            .times(1)
            .returning(|_, _| Ok(()));
        router
            .expect_post()
            .withf(|config, _| config.path == "/b")
            .times(1)
            .returning(|_, _| Ok(()));
        router
            .expect_put()
            .withf(|config, _| config.path == "/c")
            .times(1)
            .returning(|_, _| Ok(()));
        router
            .expect_delete()
            .withf(|config, _| config.path == "/d")
            .times(1)
            .returning(|_, _| Ok(()));

        let count = register_routes(four_verbs(), &mut router).unwrap();
        assert_eq!(count, 4);
    }

    #[test]
    fn test_dispatch_follows_manifest_order() {
        let mut router = MockHostRouter::new();
        let mut seq = Sequence::new();
        router
            .expect_post()
            .withf(|config, _| config.path == "/first")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        router
            .expect_get()
            .withf(|config, _| config.path == "/second")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let routes = vec![
            ok_route(Method::POST, "/first"),
            ok_route(Method::GET, "/second"),
        ];
        register_routes(routes, &mut router).unwrap();
    }

    #[test]
    fn test_unsupported_method_makes_no_calls() {
        // any call on an unexpecting mock panics
        let mut router = MockHostRouter::new();
        let routes = vec![ok_route(Method::GET, "/a"), ok_route(Method::PATCH, "/b")];

        let err = register_routes(routes, &mut router).unwrap_err();
        match err {
            RegistrationError::UnsupportedMethod { method, path } => {
                assert_eq!(method, "PATCH");
                assert_eq!(path, "/b");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let mut router = MockHostRouter::new();
        let routes = vec![
            ok_route(Method::GET, "/a"),
            ok_route(Method::POST, "/a"),
            ok_route(Method::GET, "/a"),
        ];

        let err = register_routes(routes, &mut router).unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::DuplicateRoute { ref method, ref path } if method == "GET" && path == "/a"
        ));
    }

    #[test]
    fn test_invalid_path_rejected() {
        let mut router = MockHostRouter::new();
        let err = register_routes(vec![ok_route(Method::GET, "health")], &mut router).unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidPath(ref p) if p == "health"));
    }

    #[test]
    fn test_host_rejection_stops_dispatch() {
        let mut router = MockHostRouter::new();
        router.expect_get().times(1).returning(|_, _| Ok(()));
        router
            .expect_post()
            .times(1)
            .returning(|config, _| Err(HostError::Rejected(config.path)));

        let err = register_routes(four_verbs(), &mut router).unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::Host(HostError::Rejected(ref p)) if p == "/b"
        ));
    }

    #[test]
    fn test_empty_manifest() {
        let mut router = MockHostRouter::new();
        assert_eq!(register_routes(Vec::new(), &mut router).unwrap(), 0);
    }

    #[test]
    fn test_handler_is_passed_through() {
        let mut router = MockHostRouter::new();
        router.expect_get().times(1).returning(|_, handler| {
            let value = handler(RouteRequest::default()).unwrap();
            assert_eq!(value["marker"], 7);
            Ok(())
        });

        let route = RouteDefinition::new(Method::GET, "/a", |_| Ok(serde_json::json!({"marker": 7})));
        register_routes(vec![route], &mut router).unwrap();
    }

    #[test]
    fn test_validation_collects_problems() {
        let validate = RouteValidation::none()
            .require_query("status")
            .with_body(BodyRule::Required);

        let err = validate.check(&RouteRequest::default()).unwrap_err();
        match err {
            ApiError::ValidationFailed(problems) => assert_eq!(problems.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }

        let request = RouteRequest {
            query: HashMap::from([("status".to_string(), "expired".to_string())]),
            body: Some(serde_json::json!([])),
            ..Default::default()
        };
        assert!(validate.check(&request).is_ok());
    }

    #[test]
    fn test_verb_from_method() {
        assert_eq!(Verb::try_from(&Method::DELETE).unwrap(), Verb::Delete);
        assert!(Verb::try_from(&Method::PATCH).is_err());
        assert!(Verb::try_from(&Method::HEAD).is_err());
    }
}
