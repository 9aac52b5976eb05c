use axum::extract::{Path, State};
use axum::response::Response;
use axum::{Extension, Form, Json};

use crate::error::ServerError;
use crate::forms::{FormDescriptor, TweetForm, TWEET_FORM};
use crate::store::Store;
use crate::tweet_models::{LikeCount, Timeline, TweetDetail};
use crate::tweet_repo::TweetRepository;
use crate::user_models::User;
use crate::{found, ServiceArcState, HOME_PATH};

pub async fn home<S: Store>(
    State(state): ServiceArcState<S>,
    Extension(viewer): Extension<User>,
) -> Result<Json<Timeline>, ServerError> {
    Ok(Json(state.get_home_timeline(&viewer).await?))
}

pub async fn create_form() -> Json<FormDescriptor> {
    Json(TWEET_FORM)
}

pub async fn create<S: Store>(
    State(state): ServiceArcState<S>,
    Extension(author): Extension<User>,
    Form(form): Form<TweetForm>,
) -> Result<Response, ServerError> {
    state.create_tweet(&author, form).await?;
    Ok(found(HOME_PATH))
}

pub async fn detail<S: Store>(
    State(state): ServiceArcState<S>,
    Extension(viewer): Extension<User>,
    Path(id): Path<i64>,
) -> Result<Json<TweetDetail>, ServerError> {
    Ok(Json(state.get_tweet_detail(&viewer, id).await?))
}

pub async fn delete<S: Store>(
    State(state): ServiceArcState<S>,
    Extension(actor): Extension<User>,
    Path(id): Path<i64>,
) -> Result<Response, ServerError> {
    state.delete_tweet(&actor, id).await?;
    Ok(found(HOME_PATH))
}

pub async fn like<S: Store>(
    State(state): ServiceArcState<S>,
    Extension(actor): Extension<User>,
    Path(id): Path<i64>,
) -> Result<Json<LikeCount>, ServerError> {
    Ok(Json(state.like(&actor, id).await?))
}

pub async fn unlike<S: Store>(
    State(state): ServiceArcState<S>,
    Extension(actor): Extension<User>,
    Path(id): Path<i64>,
) -> Result<Json<LikeCount>, ServerError> {
    Ok(Json(state.unlike(&actor, id).await?))
}
