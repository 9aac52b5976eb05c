use axum::async_trait;
use tracing::{debug, info};

use crate::error::{FormErrors, ServerError};
use crate::forms::{LoginForm, SignupForm, INVALID_LOGIN, NON_FIELD_ERRORS, USERNAME_TAKEN};
use crate::password::{hash_password, verify_password};
use crate::service::ServiceState;
use crate::store::{FollowDirection, Store, Tx};
use crate::user_models::{FriendShipView, NewFriendShip, NewUser, Profile, User, UserSummary};

#[async_trait]
pub trait UserRepository {
    async fn signup(&self, form: SignupForm) -> Result<User, ServerError>;
    async fn authenticate(&self, form: LoginForm) -> Result<User, ServerError>;
    async fn get_user(&self, id: i64) -> Result<Option<User>, ServerError>;
    async fn get_user_profile(&self, viewer: &User, username: &str) -> Result<Profile, ServerError>;
    async fn follow(&self, actor: &User, username: &str) -> Result<(), ServerError>;
    async fn unfollow(&self, actor: &User, username: &str) -> Result<(), ServerError>;
    async fn get_friendships(&self, username: &str, direction: FollowDirection) -> Result<Vec<FriendShipView>, ServerError>;
}

fn find_target(tx: &mut dyn Tx, username: &str) -> Result<User, ServerError> {
    tx.user_by_username(username)?.ok_or(ServerError::NotFound)
}

#[async_trait]
impl<S: Store> UserRepository for ServiceState<S> {
    async fn signup(&self, form: SignupForm) -> Result<User, ServerError> {
        let (username, email) = form.clean()?;
        let password_hash = hash_password(&form.password1)?;
        let user = self.store.transaction(|tx| {
            if tx.user_by_username(&username)?.is_some() {
                return Err(ServerError::Validation(FormErrors::single("username", USERNAME_TAKEN)));
            }
            tx.insert_user(NewUser::new(username, email, password_hash))
        })?;
        info!("signed up user {} ({})", user.username, user.id);
        Ok(user)
    }

    async fn authenticate(&self, form: LoginForm) -> Result<User, ServerError> {
        form.clean()?;
        let user = self
            .store
            .transaction(|tx| tx.user_by_username(form.username.trim()))?
            .filter(|user| verify_password(&form.password, &user.password_hash));
        match user {
            Some(user) => {
                debug!("authenticated user {}", user.id);
                Ok(user)
            }
            None => Err(ServerError::Validation(FormErrors::single(NON_FIELD_ERRORS, INVALID_LOGIN))),
        }
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, ServerError> {
        self.store.transaction(|tx| tx.user_by_id(id))
    }

    async fn get_user_profile(&self, viewer: &User, username: &str) -> Result<Profile, ServerError> {
        self.store.transaction(|tx| {
            let user = find_target(tx, username)?;
            Ok(Profile {
                user: UserSummary::from(&user),
                date_joined: user.date_joined,
                tweets: tx.tweets_by_user(user.id)?,
                is_following: tx.friendship_exists(user.id, viewer.id)?,
                follower_count: tx.count_friendships(user.id, FollowDirection::FollowedBy)?,
                following_count: tx.count_friendships(user.id, FollowDirection::Following)?,
            })
        })
    }

    async fn follow(&self, actor: &User, username: &str) -> Result<(), ServerError> {
        self.store.transaction(|tx| {
            let target = find_target(tx, username)?;
            if target.id == actor.id {
                return Err(ServerError::BadRequest("You cannot follow yourself".to_string()));
            }
            tx.insert_friendship(NewFriendShip::new(actor, &target))?;
            debug!("user {} follows {}", actor.id, target.id);
            Ok(())
        })
    }

    async fn unfollow(&self, actor: &User, username: &str) -> Result<(), ServerError> {
        self.store.transaction(|tx| {
            let target = find_target(tx, username)?;
            if target.id == actor.id {
                return Err(ServerError::BadRequest("You cannot unfollow yourself".to_string()));
            }
            let removed = tx.delete_friendship(target.id, actor.id)?;
            debug!("user {} unfollowed {} ({removed} edges removed)", actor.id, target.id);
            Ok(())
        })
    }

    async fn get_friendships(&self, username: &str, direction: FollowDirection) -> Result<Vec<FriendShipView>, ServerError> {
        self.store.transaction(|tx| {
            let Some(user) = tx.user_by_username(username)? else {
                return Ok(vec![]);
            };
            let edges = tx.friendships(user.id, direction)?;

            let mut ids = edges
                .iter()
                .flat_map(|edge| [edge.follower_id, edge.following_id])
                .collect::<Vec<_>>();
            ids.sort_unstable();
            ids.dedup();
            let users = tx.users_by_ids(&ids)?;
            let summary = |id: i64| {
                users
                    .iter()
                    .find(|u| u.id == id)
                    .map(UserSummary::from)
                    .ok_or(ServerError::NotFound)
            };

            edges
                .iter()
                .map(|edge| {
                    Ok(FriendShipView {
                        id: edge.id,
                        follower: summary(edge.follower_id)?,
                        following: summary(edge.following_id)?,
                        created_at: edge.created_at,
                    })
                })
                .collect()
        })
    }
}
