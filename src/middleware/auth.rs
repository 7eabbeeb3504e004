use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::TenantContext;
use crate::error::ApiError;
use crate::state::AppState;

/// Outcome of reading the Authorization header
#[derive(Debug, PartialEq, Eq)]
enum BearerToken<'a> {
    Absent,
    Present(&'a str),
    Malformed,
}

/// Per-request authenticator, installed in front of every route.
///
/// - no bearer header: continue with nothing bound; route guards decide
/// - bearer token that fails verification: 401 immediately, handler never runs
/// - verified token: `Principal` in request extensions, tenant bound in
///   [`TenantContext`] for exactly the lifetime of the downstream future
pub async fn authenticate_request(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let token = match extract_bearer(request.headers()) {
        BearerToken::Absent => None,
        BearerToken::Malformed => {
            tracing::warn!("Rejected malformed bearer credentials");
            return reject();
        }
        BearerToken::Present(token) => Some(token.to_string()),
    };
    let Some(token) = token else {
        return TenantContext::scope(None, next.run(request)).await;
    };

    let claims = match state.tokens.verify(&token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!("Token verification failed: {}", e);
            return reject();
        }
    };

    let principal = claims.principal();
    let tenant_id = principal.tenant_id;
    tracing::debug!(
        subject = %principal.subject_id,
        tenant = %tenant_id,
        authorities = ?principal.authorities(),
        "Request authenticated"
    );

    request.extensions_mut().insert(principal);
    TenantContext::scope(Some(tenant_id), next.run(request)).await
}

fn reject() -> Response {
    TenantContext::clear();
    ApiError::unauthorized("Invalid or expired token").into_response()
}

fn extract_bearer(headers: &HeaderMap) -> BearerToken<'_> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return BearerToken::Absent;
    };
    // Present but unreadable is a bad credential, not a missing one
    let Ok(value) = value.to_str() else {
        return BearerToken::Malformed;
    };

    // Other schemes (Basic etc.) are simply not ours
    let Some(token) = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
    else {
        return BearerToken::Absent;
    };

    let token = token.trim();
    if token.is_empty() {
        BearerToken::Malformed
    } else {
        BearerToken::Present(token)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{HeaderValue, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::auth::password::TEST_BCRYPT_COST;
    use crate::auth::{Role, TokenCodec};
    use crate::database::MemoryStore;

    const SECRET: &str = "ZmllbGRsaW5lLXRlc3Qtc2lnbmluZy1rZXktMDEyMzQ1Njc4OWFiY2RlZg==";

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn reads_bearer_tokens() {
        assert_eq!(extract_bearer(&HeaderMap::new()), BearerToken::Absent);
        assert_eq!(extract_bearer(&headers("Bearer abc.def.ghi")), BearerToken::Present("abc.def.ghi"));
        assert_eq!(extract_bearer(&headers("Basic dXNlcjpwYXNz")), BearerToken::Absent);
        assert_eq!(extract_bearer(&headers("Bearer    ")), BearerToken::Malformed);
    }

    #[test]
    fn non_utf8_authorization_is_malformed() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_bytes(b"Bearer \xff\xfe").unwrap());
        assert_eq!(extract_bearer(&headers), BearerToken::Malformed);
    }

    fn state() -> AppState {
        let store = MemoryStore::new();
        let tokens = TokenCodec::new(SECRET, 60_000).unwrap();
        AppState::new(tokens, Arc::new(store.clone()), Arc::new(store), TEST_BCRYPT_COST)
    }

    async fn bound_tenant() -> String {
        TenantContext::get().map(|id| id.to_string()).unwrap_or_default()
    }

    fn probe(state: AppState) -> Router {
        Router::new()
            .route("/probe", get(bound_tenant))
            .layer(from_fn_with_state(state.clone(), authenticate_request))
            .with_state(state)
    }

    async fn call(app: &Router, authorization: Option<&str>) -> (StatusCode, String) {
        let mut builder = axum::http::Request::builder().uri("/probe");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        let res = app.clone().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = res.status();
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn binds_tenant_only_for_verified_tokens() {
        let state = state();
        let tenant = Uuid::new_v4();
        let token = state.tokens.issue(Uuid::new_v4(), tenant, Role::Engineer).unwrap();
        let app = probe(state);

        let (status, body) = call(&app, Some(&format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, tenant.to_string());

        let (status, body) = call(&app, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "");

        let (status, _) = call(&app, Some("Bearer abc.def.ghi")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // Unreadable header bytes on a public route still stop the request
        let request = axum::http::Request::builder()
            .uri("/probe")
            .header(AUTHORIZATION, HeaderValue::from_bytes(b"Bearer \xff").unwrap())
            .body(Body::empty())
            .unwrap();
        let res = app.clone().oneshot(request).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        assert!(TenantContext::get().is_none());
    }
}
