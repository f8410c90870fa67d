use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};
use portal_types::Actor;
use portal_types::api::{HEADER_USER_ID, HEADER_USER_NAME, HEADER_VISITOR_NAME};
use uuid::Uuid;

use crate::error::ApiError;

/// Resolve the caller from the identity headers and stash it as an extension.
///
/// A user id makes the caller the owner; anyone else is a visitor, named or not.
pub async fn resolve_actor(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let actor = actor_from_headers(req.headers())?;
    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
    if let Some(raw) = header(headers, HEADER_USER_ID) {
        let user_id = raw
            .parse::<Uuid>()
            .map_err(|_| ApiError::BadRequest(format!("Invalid {HEADER_USER_ID} header")))?;
        let name = header(headers, HEADER_USER_NAME).unwrap_or("Owner").to_string();
        return Ok(Actor::Owner { user_id, name });
    }

    Ok(Actor::Visitor {
        name: header(headers, HEADER_VISITOR_NAME).map(str::to_string),
    })
}
