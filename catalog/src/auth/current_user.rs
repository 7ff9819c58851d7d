use crate::{
    AppState,
    auth::session,
    config::Config,
    errors::{Error, Result},
    types::UserId,
};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use serde::Serialize;
use tracing::{debug, instrument, trace};
use utoipa::ToSchema;

/// The verified caller of an authenticated route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CurrentUser {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub email: String,
}

/// Extract user from an `Authorization: Bearer` header if present
/// Returns:
/// - None: No Authorization header
/// - Some(Ok(user)): Valid token found and verified
/// - Some(Err(error)): Header present but not a bearer token, or token invalid/expired
#[instrument(skip(parts, config))]
fn try_bearer_auth(parts: &Parts, config: &Config) -> Option<Result<CurrentUser>> {
    let value = parts.headers.get(header::AUTHORIZATION)?;

    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    match token {
        Some(token) => Some(session::verify_session_token(token, config)),
        None => Some(Err(Error::Unauthenticated {
            message: Some("Authorization header must carry a Bearer token".to_string()),
        })),
    }
}

/// Extract user from the session cookie if present and valid
/// Returns:
/// - None: No session cookie present, or none that verifies
/// - Some(Ok(user)): Valid token found and verified
/// - Some(Err(error)): Cookie header is not valid text
#[instrument(skip(parts, config))]
fn try_cookie_auth(parts: &Parts, config: &Config) -> Option<Result<CurrentUser>> {
    let cookie_header = parts.headers.get(header::COOKIE)?;

    let cookie_str = match cookie_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid cookie header: {e}"),
            }));
        }
    };
    let cookie_name = &config.auth.session.cookie_name;

    for cookie in cookie_str.split(';') {
        if let Some((name, value)) = cookie.trim().split_once('=')
            && name == cookie_name
        {
            match session::verify_session_token(value, config) {
                Ok(user) => return Some(Ok(user)),
                // Expired cookies are expected, keep looking
                Err(_) => continue,
            }
        }
    }
    None
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        // An explicit header wins over any cookie the browser happens to send
        if let Some(result) = try_bearer_auth(parts, &state.config) {
            return match result {
                Ok(user) => {
                    debug!("Found bearer authenticated user: {}", user.id);
                    Ok(user)
                }
                Err(e) => {
                    trace!("Bearer authentication failed: {:?}", e);
                    Err(e)
                }
            };
        }

        match try_cookie_auth(parts, &state.config) {
            Some(Ok(user)) => {
                debug!("Found session cookie authenticated user: {}", user.id);
                Ok(user)
            }
            Some(Err(e)) => Err(e),
            None => {
                trace!("No authentication credentials found in request");
                Err(Error::Unauthenticated { message: None })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::utils::{create_test_state, test_user};
    use axum::http::StatusCode;

    fn parts_with_header(name: header::HeaderName, value: &str) -> Parts {
        let request = axum::http::Request::builder()
            .uri("http://localhost/test")
            .header(name, value)
            .body(())
            .unwrap();

        let (parts, _body) = request.into_parts();
        parts
    }

    #[tokio::test]
    async fn test_bearer_token_accepted() {
        let state = create_test_state();
        let user = test_user();
        let token = session::create_session_token(&user, &state.config).unwrap();

        let mut parts = parts_with_header(header::AUTHORIZATION, &format!("Bearer {token}"));
        let extracted = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(extracted, user);
    }

    #[tokio::test]
    async fn test_session_cookie_accepted() {
        let state = create_test_state();
        let user = test_user();
        let token = session::create_session_token(&user, &state.config).unwrap();
        let cookie = format!("theme=dark; {}={token}", state.config.auth.session.cookie_name);

        let mut parts = parts_with_header(header::COOKIE, &cookie);
        let extracted = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(extracted, user);
    }

    #[tokio::test]
    async fn test_missing_credentials_unauthorized() {
        let state = create_test_state();
        let request = axum::http::Request::builder().uri("http://localhost/test").body(()).unwrap();
        let (mut parts, _body) = request.into_parts();

        let err = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bad_bearer_unauthorized() {
        let state = create_test_state();

        for value in ["Bearer not-a-jwt", "Basic dXNlcjpwYXNz", "Bearer "] {
            let mut parts = parts_with_header(header::AUTHORIZATION, value);
            let err = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED, "{value}");
        }
    }

    #[tokio::test]
    async fn test_invalid_cookie_unauthorized() {
        let state = create_test_state();
        let cookie = format!("{}=garbage", state.config.auth.session.cookie_name);

        let mut parts = parts_with_header(header::COOKIE, &cookie);
        let err = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }
}
