//! Axum middleware that runs the gate in front of the wrapped routes.

use crate::gate::{login_location, Decision, Gate, RequestContext, WARNING_PATH};
use axum::{
    extract::{Request, State},
    http::{header::LOCATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

pub async fn guard(State(gate): State<Arc<Gate>>, request: Request, next: Next) -> Response {
    let ctx = RequestContext::from_request(request.uri(), request.headers());

    match gate.evaluate(&ctx) {
        Decision::Allow => next.run(request).await,
        Decision::Redirect { location } => {
            (StatusCode::MOVED_PERMANENTLY, [(LOCATION, location)]).into_response()
        }
        Decision::Warning => Redirect::temporary(WARNING_PATH).into_response(),
        Decision::Login { return_to } => {
            Redirect::temporary(&login_location(&return_to)).into_response()
        }
        Decision::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
    }
}
