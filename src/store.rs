use crate::error::ServerError;
use crate::tweet_models::{NewTweet, NewTweetLike, Tweet};
use crate::user_models::{FriendShip, NewFriendShip, NewUser, User};

/// Which side of a follow edge a user sits on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FollowDirection {
    /// Edges where the user is the one following (`following_id`).
    Following,
    /// Edges where the user is the one being followed (`follower_id`).
    FollowedBy,
}

/// A relational store that runs work inside a scoped transaction.
///
/// The closure's writes are committed when it returns `Ok` and discarded
/// when it returns `Err`.
pub trait Store: Send + Sync + 'static {
    fn transaction<T, F>(&self, work: F) -> Result<T, ServerError>
    where
        F: FnOnce(&mut dyn Tx) -> Result<T, ServerError>;
}

/// Operations available inside a transaction.
pub trait Tx {
    /// Fails with a validation error when the username is taken.
    fn insert_user(&mut self, user: NewUser) -> Result<User, ServerError>;
    fn user_by_id(&mut self, id: i64) -> Result<Option<User>, ServerError>;
    fn user_by_username(&mut self, username: &str) -> Result<Option<User>, ServerError>;
    fn users_by_ids(&mut self, ids: &[i64]) -> Result<Vec<User>, ServerError>;

    /// No-op when the edge already exists.
    fn insert_friendship(&mut self, edge: NewFriendShip) -> Result<(), ServerError>;
    /// Returns the number of edges removed.
    fn delete_friendship(&mut self, follower_id: i64, following_id: i64) -> Result<usize, ServerError>;
    fn friendship_exists(&mut self, follower_id: i64, following_id: i64) -> Result<bool, ServerError>;
    /// Newest first.
    fn friendships(&mut self, user_id: i64, direction: FollowDirection) -> Result<Vec<FriendShip>, ServerError>;
    fn count_friendships(&mut self, user_id: i64, direction: FollowDirection) -> Result<i64, ServerError>;

    fn insert_tweet(&mut self, tweet: NewTweet) -> Result<Tweet, ServerError>;
    fn tweet_by_id(&mut self, id: i64) -> Result<Option<Tweet>, ServerError>;
    /// Removes the tweet and its likes.
    fn delete_tweet(&mut self, id: i64) -> Result<usize, ServerError>;
    /// Every tweet, oldest first.
    fn tweets(&mut self) -> Result<Vec<Tweet>, ServerError>;
    fn tweets_by_user(&mut self, user_id: i64) -> Result<Vec<Tweet>, ServerError>;

    /// No-op when the like already exists.
    fn insert_like(&mut self, like: NewTweetLike) -> Result<(), ServerError>;
    fn delete_like(&mut self, tweet_id: i64, user_id: i64) -> Result<usize, ServerError>;
    fn count_likes(&mut self, tweet_id: i64) -> Result<i64, ServerError>;
    /// `(tweet_id, user)` pairs in the order the likes were made.
    fn likes_for_tweets(&mut self, tweet_ids: &[i64]) -> Result<Vec<(i64, User)>, ServerError>;
    fn liked_tweet_ids(&mut self, user_id: i64) -> Result<Vec<i64>, ServerError>;
}
