//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum Router with a single catch-all dispatch handler
//! - Wire up middleware (tracing)
//! - Look up the route in the current route table
//! - Answer function routes through cache and invocation engine
//! - Answer file and folder routes from disk
//! - Convert every per-request failure into a gateway-style response

use std::net::SocketAddr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{request::Parts, Request, StatusCode},
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::cache::{cache_url, ResponseCache};
use crate::config::{FunctionRoute, HttpMethod, RouteConfig};
use crate::http::{assets, cors, request, response};
use crate::invoke::{InvocationEngine, InvocationError};
use crate::observability::metrics;
use crate::routing::{RouteMatch, RouteTable};

/// Largest request body accepted, matching the upstream payload limit.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<ArcSwap<RouteTable>>,
    pub cache: ResponseCache,
    pub engine: InvocationEngine,
    pub stage: String,
}

/// HTTP server for the emulator.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server over the given state.
    pub fn new(state: AppState) -> Self {
        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the Axum router. Routes live in the swappable table, so the
    /// router and its middleware never change after construction.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(dispatch))
            .route("/{*path}", any(dispatch))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::debug!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: route lookup and per-kind dispatch.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let method_str = request.method().to_string();
    let path = request.uri().path().to_string();

    // One table per request; a reload swapping it mid-flight is not observed.
    let table = state.routes.load_full();

    let response = match HttpMethod::from_http(request.method()) {
        Some(method) => match table.match_route(method, &path) {
            Some(matched) => dispatch_route(&state, matched, request).await,
            None if method == HttpMethod::Options => match table.allowed_methods(&path) {
                (methods, true) if !methods.is_empty() => cors::preflight(&methods),
                _ => missing_route(&method_str, &path),
            },
            None => missing_route(&method_str, &path),
        },
        None => missing_route(&method_str, &path),
    };

    metrics::record_request(&method_str, response.status().as_u16());
    response
}

fn missing_route(method: &str, path: &str) -> Response {
    tracing::debug!(method = %method, path = %path, "No route matched");
    response::gateway_error(StatusCode::FORBIDDEN, "Missing Authentication Token")
}

async fn dispatch_route(state: &AppState, matched: RouteMatch, request: Request<Body>) -> Response {
    let route = matched.route.clone();
    let mut response = match &route.config {
        RouteConfig::Function(function) => invoke_function(state, function, &matched, request).await,
        RouteConfig::File(_) | RouteConfig::Folder(_) => serve_static(&matched).await,
    };

    if route.config.options().cors_enabled {
        cors::apply(response.headers_mut());
    }
    response
}

async fn serve_static(matched: &RouteMatch) -> Response {
    let remainder = matched.wildcard.as_ref().map(|(_, rest)| rest.as_str());
    let result = match assets::resolve(&matched.route.config, remainder) {
        Ok(path) => assets::serve_file(&path).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(response) => response,
        Err(assets::AssetError::NotFound(path)) => {
            tracing::debug!(route = %matched.route.key, path = ?path, "Asset not found");
            response::gateway_error(StatusCode::NOT_FOUND, "Not Found")
        }
        Err(e) => {
            tracing::error!(route = %matched.route.key, error = %e, "Asset read failed");
            response::gateway_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

fn missing_parameters(function: &FunctionRoute, parts: &Parts) -> Vec<String> {
    let (present, _) = request::query_parameters(parts.uri.query());
    function
        .required_parameters()
        .filter(|name| !present.contains_key(*name))
        .map(str::to_string)
        .collect()
}

async fn invoke_function(
    state: &AppState,
    function: &FunctionRoute,
    matched: &RouteMatch,
    request: Request<Body>,
) -> Response {
    let (parts, body) = request.into_parts();

    let missing = missing_parameters(function, &parts);
    if !missing.is_empty() {
        return response::gateway_error(
            StatusCode::BAD_REQUEST,
            &format!("Missing required request parameters: [{}]", missing.join(", ")),
        );
    }

    let url = cache_url(function, parts.uri.path(), parts.uri.query());
    let route_cache = state.cache.route_cache(&matched.route);
    if let Some(hit) = route_cache.as_ref().and_then(|c| c.lookup(&matched.route.key, &url)) {
        return translate(&matched.route.key.to_string(), hit);
    }

    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(route = %matched.route.key, error = %e, "Request body rejected");
            return response::gateway_error(StatusCode::PAYLOAD_TOO_LARGE, "Request Too Long");
        }
    };

    let event = request::build_event(&parts, &body, matched, &state.stage);
    match state.engine.invoke(function, &event).await {
        Ok(result) => {
            if let Some(cache) = &route_cache {
                cache.put(&url, &result);
            }
            translate(&matched.route.key.to_string(), result)
        }
        Err(InvocationError::Timeout(after)) => {
            tracing::error!(route = %matched.route.key, timeout = ?after, "Handler timed out");
            response::gateway_error(StatusCode::INTERNAL_SERVER_ERROR, "Endpoint request timed out")
        }
        Err(InvocationError::Handler(e)) => {
            tracing::error!(route = %matched.route.key, error = %e, "Handler failed");
            response::gateway_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

fn translate(route: &str, result: crate::invoke::InvocationResult) -> Response {
    response::into_response(result).unwrap_or_else(|e| {
        tracing::error!(route = %route, error = %e, "Malformed handler response");
        response::gateway_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    })
}
