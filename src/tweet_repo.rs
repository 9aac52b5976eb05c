use std::collections::HashMap;

use axum::async_trait;
use tracing::{debug, info, warn};

use crate::error::ServerError;
use crate::forms::TweetForm;
use crate::service::ServiceState;
use crate::store::{Store, Tx};
use crate::tweet_models::{LikeCount, NewTweet, NewTweetLike, Timeline, Tweet, TweetDetail, TweetView};
use crate::user_models::{User, UserSummary};

#[async_trait]
pub trait TweetRepository {
    async fn create_tweet(&self, author: &User, form: TweetForm) -> Result<Tweet, ServerError>;
    async fn get_tweet_detail(&self, viewer: &User, id: i64) -> Result<TweetDetail, ServerError>;
    async fn delete_tweet(&self, actor: &User, id: i64) -> Result<(), ServerError>;
    async fn get_home_timeline(&self, viewer: &User) -> Result<Timeline, ServerError>;
    async fn like(&self, actor: &User, id: i64) -> Result<LikeCount, ServerError>;
    async fn unlike(&self, actor: &User, id: i64) -> Result<LikeCount, ServerError>;
}

fn find_tweet(tx: &mut dyn Tx, id: i64) -> Result<Tweet, ServerError> {
    tx.tweet_by_id(id)?.ok_or(ServerError::NotFound)
}

/// Attaches authors and liked-by users, keeping the order of `tweets`.
fn tweet_views(tx: &mut dyn Tx, tweets: Vec<Tweet>) -> Result<Vec<TweetView>, ServerError> {
    let tweet_ids = tweets.iter().map(|t| t.id).collect::<Vec<_>>();
    let mut author_ids = tweets.iter().map(|t| t.user_id).collect::<Vec<_>>();
    author_ids.sort_unstable();
    author_ids.dedup();

    let authors = tx
        .users_by_ids(&author_ids)?
        .into_iter()
        .map(|u| (u.id, UserSummary::from(&u)))
        .collect::<HashMap<_, _>>();

    let mut liked_by: HashMap<i64, Vec<UserSummary>> = HashMap::new();
    for (tweet_id, user) in tx.likes_for_tweets(&tweet_ids)? {
        liked_by.entry(tweet_id).or_default().push(UserSummary::from(&user));
    }

    tweets
        .into_iter()
        .map(|tweet| {
            let user = authors.get(&tweet.user_id).cloned().ok_or_else(|| {
                warn!("tweet {} has no author {}", tweet.id, tweet.user_id);
                ServerError::NotFound
            })?;
            let likers = liked_by.remove(&tweet.id).unwrap_or_default();
            Ok(TweetView {
                id: tweet.id,
                content: tweet.content,
                created_at: tweet.created_at,
                user,
                liked_by_count: likers.len(),
                liked_by: likers,
            })
        })
        .collect()
}

#[async_trait]
impl<S: Store> TweetRepository for ServiceState<S> {
    async fn create_tweet(&self, author: &User, form: TweetForm) -> Result<Tweet, ServerError> {
        let content = form.clean()?;
        let tweet = self
            .store
            .transaction(|tx| tx.insert_tweet(NewTweet::new(author.id, content)))?;
        info!("user {} posted tweet {}", author.id, tweet.id);
        Ok(tweet)
    }

    async fn get_tweet_detail(&self, viewer: &User, id: i64) -> Result<TweetDetail, ServerError> {
        self.store.transaction(|tx| {
            let tweet = find_tweet(tx, id)?;
            let is_liked = tx.liked_tweet_ids(viewer.id)?.contains(&tweet.id);
            let tweet = tweet_views(tx, vec![tweet])?.pop().ok_or(ServerError::NotFound)?;
            Ok(TweetDetail { tweet, is_liked })
        })
    }

    async fn delete_tweet(&self, actor: &User, id: i64) -> Result<(), ServerError> {
        self.store.transaction(|tx| {
            let tweet = find_tweet(tx, id)?;
            if tweet.user_id != actor.id {
                return Err(ServerError::Forbidden);
            }
            tx.delete_tweet(tweet.id)?;
            debug!("user {} deleted tweet {}", actor.id, tweet.id);
            Ok(())
        })
    }

    async fn get_home_timeline(&self, viewer: &User) -> Result<Timeline, ServerError> {
        self.store.transaction(|tx| {
            let tweets = tx.tweets()?;
            Ok(Timeline {
                tweets: tweet_views(tx, tweets)?,
                liking_tweet_ids: tx.liked_tweet_ids(viewer.id)?,
            })
        })
    }

    async fn like(&self, actor: &User, id: i64) -> Result<LikeCount, ServerError> {
        self.store.transaction(|tx| {
            let tweet = find_tweet(tx, id)?;
            tx.insert_like(NewTweetLike { tweet_id: tweet.id, user_id: actor.id })?;
            Ok(LikeCount { liked_by_count: tx.count_likes(tweet.id)? })
        })
    }

    async fn unlike(&self, actor: &User, id: i64) -> Result<LikeCount, ServerError> {
        self.store.transaction(|tx| {
            let tweet = find_tweet(tx, id)?;
            tx.delete_like(tweet.id, actor.id)?;
            Ok(LikeCount { liked_by_count: tx.count_likes(tweet.id)? })
        })
    }
}
