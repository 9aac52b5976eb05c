use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, span, Instrument, Level};

use crate::service::ServiceState;
use crate::store::Store;
use crate::user_repo::UserRepository;
use crate::{found, LOGIN_PATH};

const BEARER_PREFIX: &str = "Bearer ";

/// Pulls the session token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn login_redirect(request: &Request) -> Response {
    found(&format!("{LOGIN_PATH}?next={}", request.uri().path()))
}

/// Resolves the session to a `User` extension, or sends the client to the
/// login page.
pub async fn session_auth_middleware<S: Store>(
    State(state): State<Arc<ServiceState<S>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let span = span!(Level::DEBUG, "auth");
    async move {
        debug!("validating request for {}", request.uri());

        let Some(user_id) = bearer_token(request.headers()).and_then(|token| state.session_user(token)) else {
            debug!("no valid session");
            return login_redirect(&request);
        };

        let user = match state.get_user(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!("session points at missing user {user_id}");
                return login_redirect(&request);
            }
            Err(e) => return e.into_response(),
        };

        request.extensions_mut().insert(user);
        next.run(request).await
    }
    .instrument(span)
    .await
}
