use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;

use crate::user_models::UserSummary;

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Eq, Serialize)]
#[diesel(table_name=crate::schema::tweets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Tweet {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name=crate::schema::tweets)]
pub struct NewTweet {
    pub user_id: i64,
    pub content: String,
    pub created_at: NaiveDateTime,
}

impl NewTweet {
    pub fn new(user_id: i64, content: String) -> Self {
        NewTweet {
            user_id,
            content,
            created_at: Utc::now().naive_utc(),
        }
    }
}

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name=crate::schema::tweet_likes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TweetLike {
    pub id: i64,
    pub tweet_id: i64,
    pub user_id: i64,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name=crate::schema::tweet_likes)]
pub struct NewTweetLike {
    pub tweet_id: i64,
    pub user_id: i64,
}

/// A tweet together with its author and the users who liked it.
#[derive(Serialize, Debug, Clone)]
pub struct TweetView {
    pub id: i64,
    pub content: String,
    pub created_at: NaiveDateTime,
    pub user: UserSummary,
    pub liked_by: Vec<UserSummary>,
    pub liked_by_count: usize,
}

#[derive(Serialize, Debug)]
pub struct TweetDetail {
    pub tweet: TweetView,
    pub is_liked: bool,
}

#[derive(Serialize, Debug)]
pub struct Timeline {
    pub tweets: Vec<TweetView>,
    pub liking_tweet_ids: Vec<i64>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeCount {
    pub liked_by_count: i64,
}
