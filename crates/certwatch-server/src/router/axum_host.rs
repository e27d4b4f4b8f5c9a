//! axum-backed host router

use axum::{
    body::Bytes,
    extract::{Path, Query},
    response::{IntoResponse, Response},
    routing::{MethodFilter, MethodRouter},
    Json, Router,
};
use std::collections::{BTreeMap, HashMap, HashSet};

use super::{BodyRule, HostRouter, RouteConfig, RouteHandler, RouteRequest, Verb};
use crate::error::HostError;
use crate::handler::{ApiError, ApiResponse};

/// Collects registered routes into an [`axum::Router`]
///
/// Each route's validation block is enforced before its handler runs;
/// failures answer HTTP 400 with the standard error envelope.
#[derive(Default)]
pub struct AxumRouter {
    routes: BTreeMap<String, MethodRouter>,
    registered: HashSet<(Verb, String)>,
}

impl AxumRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered method and path pairs
    pub fn len(&self) -> usize {
        self.registered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    pub fn is_registered(&self, verb: Verb, path: &str) -> bool {
        self.registered.contains(&(verb, path.to_string()))
    }

    pub fn into_router(self) -> Router {
        self.routes
            .into_iter()
            .fold(Router::new(), |router, (path, method_router)| {
                router.route(&path, method_router)
            })
    }

    fn mount(
        &mut self,
        verb: Verb,
        config: RouteConfig,
        handler: RouteHandler,
    ) -> Result<(), HostError> {
        if !self.registered.insert((verb, config.path.clone())) {
            return Err(HostError::Conflict(format!("{} {}", verb, config.path)));
        }

        let axum_path = to_axum_path(&config.path);
        let filter = match verb {
            Verb::Get => MethodFilter::GET,
            Verb::Post => MethodFilter::POST,
            Verb::Put => MethodFilter::PUT,
            Verb::Delete => MethodFilter::DELETE,
        };

        let endpoint = move |params: Option<Path<HashMap<String, String>>>,
                             Query(query): Query<HashMap<String, String>>,
                             body: Bytes| {
            let handler = handler.clone();
            let config = config.clone();
            async move {
                let params = params.map(|Path(p)| p).unwrap_or_default();
                serve(&config, &handler, params, query, &body)
            }
        };

        let method_router = self
            .routes
            .remove(&axum_path)
            .unwrap_or_else(MethodRouter::new)
            .on(filter, endpoint);
        self.routes.insert(axum_path, method_router);
        Ok(())
    }
}

impl HostRouter for AxumRouter {
    fn get(&mut self, config: RouteConfig, handler: RouteHandler) -> Result<(), HostError> {
        self.mount(Verb::Get, config, handler)
    }

    fn post(&mut self, config: RouteConfig, handler: RouteHandler) -> Result<(), HostError> {
        self.mount(Verb::Post, config, handler)
    }

    fn put(&mut self, config: RouteConfig, handler: RouteHandler) -> Result<(), HostError> {
        self.mount(Verb::Put, config, handler)
    }

    fn delete(&mut self, config: RouteConfig, handler: RouteHandler) -> Result<(), HostError> {
        self.mount(Verb::Delete, config, handler)
    }
}

fn serve(
    config: &RouteConfig,
    handler: &RouteHandler,
    params: HashMap<String, String>,
    query: HashMap<String, String>,
    body: &Bytes,
) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();

    let body = match parse_body(config.validate.body, body) {
        Ok(body) => body,
        Err(err) => return err.into_response(),
    };
    let request = RouteRequest {
        params,
        query,
        body,
    };

    let outcome = config
        .validate
        .check(&request)
        .and_then(|()| handler(request));

    match outcome {
        Ok(data) => Json(ApiResponse::success(data, request_id)).into_response(),
        Err(err) => err.into_response(),
    }
}

fn parse_body(rule: BodyRule, body: &Bytes) -> Result<Option<serde_json::Value>, ApiError> {
    if rule == BodyRule::Ignore || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))
}

/// Rewrite `{name}` path segments into axum's `:name` form
pub fn to_axum_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            match segment
                .strip_prefix('{')
                .and_then(|rest| rest.strip_suffix('}'))
            {
                Some(name) => format!(":{}", name),
                None => segment.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
