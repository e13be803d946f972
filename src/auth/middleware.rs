use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::{
    auth::jwt::{Claims, JwtKeys},
    error::AppError,
    state::AppState,
};

/// Outcome of running a request through the gate.
#[derive(Debug)]
pub enum Access {
    /// Read-only request, or the gate is switched off.
    Public,
    Authorized(Claims),
    Rejected(AppError),
}

/// Pure reads never need a token.
pub fn is_public(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

pub fn evaluate(require_auth: bool, keys: &JwtKeys, method: &Method, headers: &HeaderMap) -> Access {
    if !require_auth || is_public(method) {
        return Access::Public;
    }

    let Some(raw) = headers.get(AUTHORIZATION) else {
        return Access::Rejected(AppError::Unauthorized("Token missing".into()));
    };
    let Ok(raw) = raw.to_str() else {
        return Access::Rejected(AppError::Forbidden("Invalid token".into()));
    };

    let mut parts = raw.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().map(str::trim).unwrap_or_default();

    if !scheme.eq_ignore_ascii_case("bearer") {
        if scheme.is_empty() {
            return Access::Rejected(AppError::Unauthorized("Token missing".into()));
        }
        return Access::Rejected(AppError::Forbidden("Invalid token".into()));
    }
    if token.is_empty() {
        return Access::Rejected(AppError::Unauthorized("Token missing".into()));
    }

    match keys.verify(token) {
        Ok(claims) => Access::Authorized(claims),
        Err(e) => {
            warn!(error = %e, "invalid or expired token");
            Access::Rejected(AppError::Forbidden("Invalid token".into()))
        }
    }
}

/// Router-wide gate: rejects unauthenticated mutations and stores verified
/// claims in the request extensions.
pub async fn authorize(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    match evaluate(
        state.config.require_auth,
        &state.keys,
        req.method(),
        req.headers(),
    ) {
        Access::Public => next.run(req).await,
        Access::Authorized(claims) => {
            debug!(sub = %claims.sub, method = %req.method(), "request authorized");
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Access::Rejected(err) => err.into_response(),
    }
}

/// Caller identity placed on the request by [`authorize`].
pub struct AuthUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| AppError::Unauthorized("Token missing".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{
        tests::{expired_token, make_keys},
        Role,
    };
    use axum::http::HeaderValue;
    use uuid::Uuid;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    fn status_of(access: Access) -> u16 {
        match access {
            Access::Rejected(e) => e.status().as_u16(),
            Access::Public => 0,
            Access::Authorized(_) => 200,
        }
    }

    #[test]
    fn reads_are_public_without_a_token() {
        let keys = make_keys("s", "i", "a");
        for m in [Method::GET, Method::HEAD, Method::OPTIONS] {
            assert!(matches!(
                evaluate(true, &keys, &m, &HeaderMap::new()),
                Access::Public
            ));
        }
    }

    #[test]
    fn mutations_without_header_are_unauthorized() {
        let keys = make_keys("s", "i", "a");
        for m in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
            assert_eq!(status_of(evaluate(true, &keys, &m, &HeaderMap::new())), 401);
        }
        assert_eq!(status_of(evaluate(true, &keys, &Method::POST, &headers("Bearer "))), 401);
    }

    #[test]
    fn bad_tokens_are_forbidden() {
        let keys = make_keys("s", "i", "a");
        assert_eq!(
            status_of(evaluate(true, &keys, &Method::POST, &headers("Bearer junk"))),
            403
        );
        assert_eq!(
            status_of(evaluate(true, &keys, &Method::POST, &headers("Basic dXNlcjpwdw=="))),
            403
        );
        let expired = format!("Bearer {}", expired_token(&keys));
        assert_eq!(status_of(evaluate(true, &keys, &Method::DELETE, &headers(&expired))), 403);
    }

    #[test]
    fn fresh_token_is_authorized() {
        let keys = make_keys("s", "i", "a");
        let id = Uuid::new_v4();
        let token = keys.issue(id, "jdoe", Role::User).unwrap();
        match evaluate(true, &keys, &Method::PUT, &headers(&format!("bearer {token}"))) {
            Access::Authorized(claims) => assert_eq!(claims.sub, id),
            other => panic!("expected authorized, got {other:?}"),
        }
    }

    #[test]
    fn disabled_gate_lets_mutations_through() {
        let keys = make_keys("s", "i", "a");
        assert!(matches!(
            evaluate(false, &keys, &Method::POST, &HeaderMap::new()),
            Access::Public
        ));
    }
}
