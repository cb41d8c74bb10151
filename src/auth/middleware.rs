use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{error, warn};

use crate::{error::ApiError, state::AppState};

/// Verified identity attached to every request on a protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub email: String,
}

/// Reads `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::unauthenticated("No token provided"))?;

    let token = auth
        .strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .map(str::trim)
        .ok_or_else(|| ApiError::unauthenticated("Invalid auth scheme"))?;

    if token.is_empty() {
        return Err(ApiError::unauthenticated("No token provided"));
    }
    Ok(token)
}

/// Verifies the bearer token, resolves the user and attaches a
/// [`Principal`]. Short-circuits with 401 (no/invalid token) or 404
/// (unknown user) before the inner handler runs.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())?;

    let claims = state.jwt.verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        ApiError::unauthenticated("Invalid or expired token")
    })?;

    let profile = match state.users.get_profile(&claims.user_id).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            warn!(user_id = %claims.user_id, "token subject has no user record");
            return Err(ApiError::not_found("User not found"));
        }
        Err(e) => {
            error!(error = %e, user_id = %claims.user_id, "user lookup failed");
            return Err(ApiError::Internal(e.into()));
        }
    };

    request.extensions_mut().insert(Principal {
        user_id: profile.user_id,
        email: profile.email,
    });
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::User;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Extension, Router,
    };
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };
    use tower::ServiceExt;

    fn guarded(state: AppState, reached: Arc<AtomicBool>) -> Router {
        Router::new()
            .route(
                "/guarded",
                get(move |Extension(p): Extension<Principal>| {
                    let reached = reached.clone();
                    async move {
                        reached.store(true, Ordering::SeqCst);
                        p.user_id
                    }
                }),
            )
            .route_layer(from_fn_with_state(state.clone(), require_auth))
            .with_state(state)
    }

    async fn call(app: Router, auth: Option<&str>) -> (StatusCode, String) {
        let mut req = HttpRequest::builder().uri("/guarded");
        if let Some(value) = auth {
            req = req.header(AUTHORIZATION, value);
        }
        let res = app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn bearer_parsing() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_err());
        headers.insert(AUTHORIZATION, "Basic abc".parse().unwrap());
        assert!(bearer_token(&headers).is_err());
        headers.insert(AUTHORIZATION, "Bearer ".parse().unwrap());
        assert!(bearer_token(&headers).is_err());
        headers.insert(AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def");
    }

    #[tokio::test]
    async fn missing_token_is_401_and_handler_not_reached() {
        let state = AppState::fake();
        let reached = Arc::new(AtomicBool::new(false));
        let (status, body) = call(guarded(state, reached.clone()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("No token provided"));
        assert!(!reached.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn forged_token_is_401() {
        let state = AppState::fake();
        let reached = Arc::new(AtomicBool::new(false));
        let (status, body) = call(guarded(state, reached.clone()), Some("Bearer abc.def.ghi")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Invalid or expired token"));
        assert!(!reached.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn valid_token_for_unknown_user_is_404() {
        let state = AppState::fake();
        let token = state.jwt.sign("ghost").unwrap();
        let reached = Arc::new(AtomicBool::new(false));
        let (status, body) =
            call(guarded(state, reached.clone()), Some(&format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("User not found"));
        assert!(!reached.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn valid_token_attaches_principal() {
        let state = AppState::fake();
        let user = User::new("a@x.com".into(), "h".into());
        state.users.create(&user).await.unwrap();
        let token = state.jwt.sign(&user.user_id).unwrap();
        let reached = Arc::new(AtomicBool::new(false));
        let (status, body) =
            call(guarded(state, reached.clone()), Some(&format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, user.user_id);
        assert!(reached.load(Ordering::SeqCst));
    }
}
