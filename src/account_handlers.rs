use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Form, Json};

use crate::auth_layer::bearer_token;
use crate::error::ServerError;
use crate::forms::{FormDescriptor, LoginForm, SignupForm, LOGIN_FORM, SIGNUP_FORM};
use crate::service::ServiceState;
use crate::store::{FollowDirection, Store};
use crate::user_models::{FriendShipView, Profile, User};
use crate::user_repo::UserRepository;
use crate::{found, ServiceArcState, HOME_PATH, LOGIN_PATH, SESSION_TOKEN_HEADER};

/// Redirects home and hands the new session token to the client.
fn session_redirect<S: Store>(state: &ServiceState<S>, user: &User) -> Response {
    let token = state.start_session(user.id);
    (
        StatusCode::FOUND,
        [
            (header::LOCATION, HOME_PATH.to_string()),
            (HeaderName::from_static(SESSION_TOKEN_HEADER), token),
        ],
    )
        .into_response()
}

pub async fn signup_form() -> Json<FormDescriptor> {
    Json(SIGNUP_FORM)
}

pub async fn signup<S: Store>(
    State(state): ServiceArcState<S>,
    Form(form): Form<SignupForm>,
) -> Result<Response, ServerError> {
    let user = state.signup(form).await?;
    Ok(session_redirect(&state, &user))
}

pub async fn login_form() -> Json<FormDescriptor> {
    Json(LOGIN_FORM)
}

pub async fn login<S: Store>(
    State(state): ServiceArcState<S>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ServerError> {
    let user = state.authenticate(form).await?;
    Ok(session_redirect(&state, &user))
}

pub async fn logout<S: Store>(State(state): ServiceArcState<S>, headers: HeaderMap) -> Response {
    if let Some(token) = bearer_token(&headers) {
        state.end_session(token);
    }
    found(LOGIN_PATH)
}

pub async fn user_profile<S: Store>(
    State(state): ServiceArcState<S>,
    Extension(viewer): Extension<User>,
    Path(username): Path<String>,
) -> Result<Json<Profile>, ServerError> {
    Ok(Json(state.get_user_profile(&viewer, &username).await?))
}

pub async fn follow<S: Store>(
    State(state): ServiceArcState<S>,
    Extension(actor): Extension<User>,
    Path(username): Path<String>,
) -> Result<Response, ServerError> {
    state.follow(&actor, &username).await?;
    Ok(found(HOME_PATH))
}

pub async fn unfollow<S: Store>(
    State(state): ServiceArcState<S>,
    Extension(actor): Extension<User>,
    Path(username): Path<String>,
) -> Result<Response, ServerError> {
    state.unfollow(&actor, &username).await?;
    Ok(found(HOME_PATH))
}

pub async fn following_list<S: Store>(
    State(state): ServiceArcState<S>,
    Path(username): Path<String>,
) -> Result<Json<Vec<FriendShipView>>, ServerError> {
    Ok(Json(state.get_friendships(&username, FollowDirection::Following).await?))
}

pub async fn follower_list<S: Store>(
    State(state): ServiceArcState<S>,
    Path(username): Path<String>,
) -> Result<Json<Vec<FriendShipView>>, ServerError> {
    Ok(Json(state.get_friendships(&username, FollowDirection::FollowedBy).await?))
}
