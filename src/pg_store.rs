use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error::DatabaseError};
use tracing::{debug, warn};

use crate::error::{FormErrors, ServerError};
use crate::forms::USERNAME_TAKEN;
use crate::schema::{friendships, tweet_likes, tweets, users};
use crate::store::{FollowDirection, Store, Tx};
use crate::tweet_models::{NewTweet, NewTweetLike, Tweet};
use crate::user_models::{FriendShip, NewFriendShip, NewUser, User};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

/// Postgres-backed store on an r2d2 connection pool.
pub struct PgStore {
    db_pool: DbPool,
}

impl PgStore {
    pub fn connect(database_url: &str, pool_size: u32) -> eyre::Result<Self> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let db_pool = Pool::builder().max_size(pool_size).build(manager)?;
        debug!("Built database pool with {pool_size} connections");
        Ok(Self { db_pool })
    }
}

impl Store for PgStore {
    fn transaction<T, F>(&self, work: F) -> Result<T, ServerError>
    where
        F: FnOnce(&mut dyn Tx) -> Result<T, ServerError>,
    {
        let mut pooled = self.db_pool.get()?;
        let conn: &mut PgConnection = &mut pooled;
        conn.transaction::<T, ServerError, _>(|conn| work(&mut PgTx { conn }))
    }
}

struct PgTx<'a> {
    conn: &'a mut PgConnection,
}

impl Tx for PgTx<'_> {
    fn insert_user(&mut self, user: NewUser) -> Result<User, ServerError> {
        let inserted = diesel::insert_into(users::table)
            .values(&user)
            .returning(User::as_returning())
            .get_result(self.conn);
        match inserted {
            Ok(user) => Ok(user),
            Err(DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                warn!("username {} was taken concurrently", user.username);
                Err(ServerError::Validation(FormErrors::single("username", USERNAME_TAKEN)))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn user_by_id(&mut self, id: i64) -> Result<Option<User>, ServerError> {
        Ok(users::table
            .filter(users::id.eq(id))
            .select(User::as_select())
            .first(self.conn)
            .optional()?)
    }

    fn user_by_username(&mut self, username: &str) -> Result<Option<User>, ServerError> {
        Ok(users::table
            .filter(users::username.eq(username))
            .select(User::as_select())
            .first(self.conn)
            .optional()?)
    }

    fn users_by_ids(&mut self, ids: &[i64]) -> Result<Vec<User>, ServerError> {
        Ok(users::table
            .filter(users::id.eq_any(ids.to_vec()))
            .select(User::as_select())
            .load(self.conn)?)
    }

    fn insert_friendship(&mut self, edge: NewFriendShip) -> Result<(), ServerError> {
        diesel::insert_into(friendships::table)
            .values(&edge)
            .on_conflict((friendships::follower_id, friendships::following_id))
            .do_nothing()
            .execute(self.conn)?;
        Ok(())
    }

    fn delete_friendship(&mut self, follower_id: i64, following_id: i64) -> Result<usize, ServerError> {
        Ok(diesel::delete(
            friendships::table.filter(
                friendships::follower_id
                    .eq(follower_id)
                    .and(friendships::following_id.eq(following_id)),
            ),
        )
        .execute(self.conn)?)
    }

    fn friendship_exists(&mut self, follower_id: i64, following_id: i64) -> Result<bool, ServerError> {
        Ok(diesel::select(diesel::dsl::exists(
            friendships::table.filter(
                friendships::follower_id
                    .eq(follower_id)
                    .and(friendships::following_id.eq(following_id)),
            ),
        ))
        .get_result(self.conn)?)
    }

    fn friendships(&mut self, user_id: i64, direction: FollowDirection) -> Result<Vec<FriendShip>, ServerError> {
        let query = friendships::table
            .select(FriendShip::as_select())
            .order((friendships::created_at.desc(), friendships::id.desc()));
        Ok(match direction {
            FollowDirection::Following => query.filter(friendships::following_id.eq(user_id)).load(self.conn)?,
            FollowDirection::FollowedBy => query.filter(friendships::follower_id.eq(user_id)).load(self.conn)?,
        })
    }

    fn count_friendships(&mut self, user_id: i64, direction: FollowDirection) -> Result<i64, ServerError> {
        Ok(match direction {
            FollowDirection::Following => friendships::table
                .filter(friendships::following_id.eq(user_id))
                .count()
                .get_result(self.conn)?,
            FollowDirection::FollowedBy => friendships::table
                .filter(friendships::follower_id.eq(user_id))
                .count()
                .get_result(self.conn)?,
        })
    }

    fn insert_tweet(&mut self, tweet: NewTweet) -> Result<Tweet, ServerError> {
        Ok(diesel::insert_into(tweets::table)
            .values(&tweet)
            .returning(Tweet::as_returning())
            .get_result(self.conn)?)
    }

    fn tweet_by_id(&mut self, id: i64) -> Result<Option<Tweet>, ServerError> {
        Ok(tweets::table
            .filter(tweets::id.eq(id))
            .select(Tweet::as_select())
            .first(self.conn)
            .optional()?)
    }

    fn delete_tweet(&mut self, id: i64) -> Result<usize, ServerError> {
        diesel::delete(tweet_likes::table.filter(tweet_likes::tweet_id.eq(id))).execute(self.conn)?;
        Ok(diesel::delete(tweets::table.filter(tweets::id.eq(id))).execute(self.conn)?)
    }

    fn tweets(&mut self) -> Result<Vec<Tweet>, ServerError> {
        Ok(tweets::table
            .select(Tweet::as_select())
            .order(tweets::id.asc())
            .load(self.conn)?)
    }

    fn tweets_by_user(&mut self, user_id: i64) -> Result<Vec<Tweet>, ServerError> {
        Ok(tweets::table
            .filter(tweets::user_id.eq(user_id))
            .select(Tweet::as_select())
            .order(tweets::id.asc())
            .load(self.conn)?)
    }

    fn insert_like(&mut self, like: NewTweetLike) -> Result<(), ServerError> {
        diesel::insert_into(tweet_likes::table)
            .values(&like)
            .on_conflict((tweet_likes::tweet_id, tweet_likes::user_id))
            .do_nothing()
            .execute(self.conn)?;
        Ok(())
    }

    fn delete_like(&mut self, tweet_id: i64, user_id: i64) -> Result<usize, ServerError> {
        Ok(diesel::delete(
            tweet_likes::table.filter(
                tweet_likes::tweet_id
                    .eq(tweet_id)
                    .and(tweet_likes::user_id.eq(user_id)),
            ),
        )
        .execute(self.conn)?)
    }

    fn count_likes(&mut self, tweet_id: i64) -> Result<i64, ServerError> {
        Ok(tweet_likes::table
            .filter(tweet_likes::tweet_id.eq(tweet_id))
            .count()
            .get_result(self.conn)?)
    }

    fn likes_for_tweets(&mut self, tweet_ids: &[i64]) -> Result<Vec<(i64, User)>, ServerError> {
        Ok(tweet_likes::table
            .inner_join(users::table)
            .filter(tweet_likes::tweet_id.eq_any(tweet_ids.to_vec()))
            .order(tweet_likes::id.asc())
            .select((tweet_likes::tweet_id, User::as_select()))
            .load(self.conn)?)
    }

    fn liked_tweet_ids(&mut self, user_id: i64) -> Result<Vec<i64>, ServerError> {
        Ok(tweet_likes::table
            .filter(tweet_likes::user_id.eq(user_id))
            .order(tweet_likes::id.asc())
            .select(tweet_likes::tweet_id)
            .load(self.conn)?)
    }
}
