//! CORS and admin actor extraction
use crate::handlers::ApiError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use draftgate_core::Actor;
use tower_http::cors::CorsLayer;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

pub fn cors() -> CorsLayer {
    CorsLayer::permissive()
}

pub fn actor_from_headers(headers: &HeaderMap) -> Option<Actor> {
    let value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    Some(Actor {
        id: value(ACTOR_ID_HEADER)?,
        role: value(ACTOR_ROLE_HEADER)?,
    })
}

/// Extractor for admin-mutating routes; rejects with 401 when either actor
/// header is missing.
pub struct AdminActor(pub Actor);

impl<S> FromRequestParts<S> for AdminActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers)
            .map(AdminActor)
            .ok_or(ApiError::ActorRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_actor_needs_both_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ID_HEADER, HeaderValue::from_static("editor-7"));
        assert!(actor_from_headers(&headers).is_none());

        headers.insert(ACTOR_ROLE_HEADER, HeaderValue::from_static(" admin "));
        let actor = actor_from_headers(&headers).unwrap();
        assert_eq!(actor.id, "editor-7");
        assert_eq!(actor.role, "admin");
    }
}
