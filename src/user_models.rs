use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;

use crate::tweet_models::Tweet;

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Eq, Serialize)]
#[diesel(table_name=crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub date_joined: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name=crate::schema::users)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub date_joined: NaiveDateTime,
}

impl NewUser {
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        NewUser {
            username,
            email,
            password_hash,
            date_joined: Utc::now().naive_utc(),
        }
    }
}

/// A directed follow edge.
///
/// The column names are kept as the schema has them: `follower_id` is the
/// user being followed and `following_id` is the user doing the following.
#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name=crate::schema::friendships)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FriendShip {
    pub id: i64,
    pub follower_id: i64,
    pub following_id: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name=crate::schema::friendships)]
pub struct NewFriendShip {
    pub follower_id: i64,
    pub following_id: i64,
    pub created_at: NaiveDateTime,
}

impl NewFriendShip {
    /// Edge recording that `actor` follows `target`.
    pub fn new(actor: &User, target: &User) -> Self {
        NewFriendShip {
            follower_id: target.id,
            following_id: actor.id,
            created_at: Utc::now().naive_utc(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct FriendShipView {
    pub id: i64,
    pub follower: UserSummary,
    pub following: UserSummary,
    pub created_at: NaiveDateTime,
}

#[derive(Serialize, Debug)]
pub struct Profile {
    pub user: UserSummary,
    pub date_joined: NaiveDateTime,
    pub tweets: Vec<Tweet>,
    pub is_following: bool,
    pub follower_count: i64,
    pub following_count: i64,
}
