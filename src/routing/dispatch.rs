use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::api::{index, relay};
use crate::state::AppState;

#[derive(Debug, PartialEq, Eq)]
enum RouteMatch {
    Index,
    Relay,
    MethodNotAllowed,
    NotFound,
}

/// Dispatch a raw HTTP request to the matching handler.
///
/// # Errors
///
/// This function currently never returns `Err` and uses `Infallible`.
pub async fn dispatch_request(
    state: Arc<AppState>,
    request: Request<Body>,
) -> Result<Response, Infallible> {
    let (parts, _body) = request.into_parts();
    let route = match_route(&parts.method, parts.uri.path());

    let response = match route {
        RouteMatch::Index => index::handler(state).await,
        RouteMatch::Relay => relay::handler(state).await,
        RouteMatch::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        RouteMatch::NotFound => StatusCode::NOT_FOUND.into_response(),
    };

    Ok(response)
}

fn match_route(method: &Method, path: &str) -> RouteMatch {
    match path {
        "/" => {
            if method == Method::GET || method == Method::HEAD {
                RouteMatch::Index
            } else {
                RouteMatch::MethodNotAllowed
            }
        }
        "/sse" => RouteMatch::Relay,
        _ => RouteMatch::NotFound,
    }
}
