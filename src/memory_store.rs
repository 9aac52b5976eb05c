use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::{FormErrors, ServerError};
use crate::forms::USERNAME_TAKEN;
use crate::store::{FollowDirection, Store, Tx};
use crate::tweet_models::{NewTweet, NewTweetLike, Tweet, TweetLike};
use crate::user_models::{FriendShip, NewFriendShip, NewUser, User};

#[derive(Default, Clone)]
struct Tables {
    last_id: i64,
    users: BTreeMap<i64, User>,
    friendships: BTreeMap<i64, FriendShip>,
    tweets: BTreeMap<i64, Tweet>,
    likes: BTreeMap<i64, TweetLike>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn on_side(edge: &FriendShip, user_id: i64, direction: FollowDirection) -> bool {
        match direction {
            FollowDirection::Following => edge.following_id == user_id,
            FollowDirection::FollowedBy => edge.follower_id == user_id,
        }
    }
}

/// Tables seen by one transaction. Reads go to the committed tables; the first
/// write takes a private copy, which is swapped in on commit.
struct MemoryTx<'a> {
    committed: &'a Tables,
    working: Option<Tables>,
}

impl<'a> MemoryTx<'a> {
    fn new(committed: &'a Tables) -> Self {
        Self { committed, working: None }
    }

    fn view(&self) -> &Tables {
        self.working.as_ref().unwrap_or(self.committed)
    }

    fn edit(&mut self) -> &mut Tables {
        let committed = self.committed;
        self.working.get_or_insert_with(|| committed.clone())
    }
}

/// Store that keeps every table in process memory.
///
/// Transactions are serialized by the lock. Read-only work never copies the tables.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl Store for MemoryStore {
    fn transaction<T, F>(&self, work: F) -> Result<T, ServerError>
    where
        F: FnOnce(&mut dyn Tx) -> Result<T, ServerError>,
    {
        let mut committed = self.tables.lock().map_err(|_| ServerError::Poisoned)?;
        let mut tx = MemoryTx::new(&committed);
        let result = work(&mut tx)?;
        if let Some(working) = tx.working {
            *committed = working;
        }
        Ok(result)
    }
}

impl Tx for MemoryTx<'_> {
    fn insert_user(&mut self, user: NewUser) -> Result<User, ServerError> {
        if self.view().users.values().any(|u| u.username == user.username) {
            return Err(ServerError::Validation(FormErrors::single("username", USERNAME_TAKEN)));
        }
        let tables = self.edit();
        let id = tables.next_id();
        let user = User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            date_joined: user.date_joined,
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    fn user_by_id(&mut self, id: i64) -> Result<Option<User>, ServerError> {
        Ok(self.view().users.get(&id).cloned())
    }

    fn user_by_username(&mut self, username: &str) -> Result<Option<User>, ServerError> {
        Ok(self.view().users.values().find(|u| u.username == username).cloned())
    }

    fn users_by_ids(&mut self, ids: &[i64]) -> Result<Vec<User>, ServerError> {
        Ok(self.view().users.values().filter(|u| ids.contains(&u.id)).cloned().collect())
    }

    fn insert_friendship(&mut self, edge: NewFriendShip) -> Result<(), ServerError> {
        if self.friendship_exists(edge.follower_id, edge.following_id)? {
            return Ok(());
        }
        let tables = self.edit();
        let id = tables.next_id();
        tables.friendships.insert(id, FriendShip {
            id,
            follower_id: edge.follower_id,
            following_id: edge.following_id,
            created_at: edge.created_at,
        });
        Ok(())
    }

    fn delete_friendship(&mut self, follower_id: i64, following_id: i64) -> Result<usize, ServerError> {
        if !self.friendship_exists(follower_id, following_id)? {
            return Ok(0);
        }
        let friendships = &mut self.edit().friendships;
        let before = friendships.len();
        friendships.retain(|_, f| !(f.follower_id == follower_id && f.following_id == following_id));
        Ok(before - friendships.len())
    }

    fn friendship_exists(&mut self, follower_id: i64, following_id: i64) -> Result<bool, ServerError> {
        Ok(self
            .view()
            .friendships
            .values()
            .any(|f| f.follower_id == follower_id && f.following_id == following_id))
    }

    fn friendships(&mut self, user_id: i64, direction: FollowDirection) -> Result<Vec<FriendShip>, ServerError> {
        let mut edges = self
            .view()
            .friendships
            .values()
            .filter(|f| Tables::on_side(f, user_id, direction))
            .cloned()
            .collect::<Vec<_>>();
        edges.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(edges)
    }

    fn count_friendships(&mut self, user_id: i64, direction: FollowDirection) -> Result<i64, ServerError> {
        Ok(self
            .view()
            .friendships
            .values()
            .filter(|f| Tables::on_side(f, user_id, direction))
            .count() as i64)
    }

    fn insert_tweet(&mut self, tweet: NewTweet) -> Result<Tweet, ServerError> {
        let tables = self.edit();
        let id = tables.next_id();
        let tweet = Tweet {
            id,
            user_id: tweet.user_id,
            content: tweet.content,
            created_at: tweet.created_at,
        };
        tables.tweets.insert(id, tweet.clone());
        Ok(tweet)
    }

    fn tweet_by_id(&mut self, id: i64) -> Result<Option<Tweet>, ServerError> {
        Ok(self.view().tweets.get(&id).cloned())
    }

    fn delete_tweet(&mut self, id: i64) -> Result<usize, ServerError> {
        if !self.view().tweets.contains_key(&id) {
            return Ok(0);
        }
        let tables = self.edit();
        tables.likes.retain(|_, l| l.tweet_id != id);
        Ok(tables.tweets.remove(&id).map_or(0, |_| 1))
    }

    fn tweets(&mut self) -> Result<Vec<Tweet>, ServerError> {
        Ok(self.view().tweets.values().cloned().collect())
    }

    fn tweets_by_user(&mut self, user_id: i64) -> Result<Vec<Tweet>, ServerError> {
        Ok(self.view().tweets.values().filter(|t| t.user_id == user_id).cloned().collect())
    }

    fn insert_like(&mut self, like: NewTweetLike) -> Result<(), ServerError> {
        if self
            .view()
            .likes
            .values()
            .any(|l| l.tweet_id == like.tweet_id && l.user_id == like.user_id)
        {
            return Ok(());
        }
        let tables = self.edit();
        let id = tables.next_id();
        tables.likes.insert(id, TweetLike {
            id,
            tweet_id: like.tweet_id,
            user_id: like.user_id,
        });
        Ok(())
    }

    fn delete_like(&mut self, tweet_id: i64, user_id: i64) -> Result<usize, ServerError> {
        if !self.view().likes.values().any(|l| l.tweet_id == tweet_id && l.user_id == user_id) {
            return Ok(0);
        }
        let likes = &mut self.edit().likes;
        let before = likes.len();
        likes.retain(|_, l| !(l.tweet_id == tweet_id && l.user_id == user_id));
        Ok(before - likes.len())
    }

    fn count_likes(&mut self, tweet_id: i64) -> Result<i64, ServerError> {
        Ok(self.view().likes.values().filter(|l| l.tweet_id == tweet_id).count() as i64)
    }

    fn likes_for_tweets(&mut self, tweet_ids: &[i64]) -> Result<Vec<(i64, User)>, ServerError> {
        let tables = self.view();
        Ok(tables
            .likes
            .values()
            .filter(|l| tweet_ids.contains(&l.tweet_id))
            .filter_map(|l| tables.users.get(&l.user_id).map(|u| (l.tweet_id, u.clone())))
            .collect())
    }

    fn liked_tweet_ids(&mut self, user_id: i64) -> Result<Vec<i64>, ServerError> {
        Ok(self
            .view()
            .likes
            .values()
            .filter(|l| l.user_id == user_id)
            .map(|l| l.tweet_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(tx: &mut dyn Tx, name: &str) -> User {
        tx.insert_user(NewUser::new(name.to_string(), format!("{name}@example.com"), "x".to_string()))
            .unwrap()
    }

    #[test]
    fn failed_transaction_leaves_tables_untouched() {
        let store = MemoryStore::default();
        let result: Result<(), ServerError> = store.transaction(|tx| {
            new_user(tx, "alice");
            Err(ServerError::NotFound)
        });
        assert!(matches!(result, Err(ServerError::NotFound)));

        let alice = store.transaction(|tx| tx.user_by_username("alice")).unwrap();
        assert!(alice.is_none());
    }

    #[test]
    fn reads_and_no_op_writes_share_the_committed_tables() {
        let mut tables = Tables::default();
        let mut tx = MemoryTx::new(&tables);
        let alice = new_user(&mut tx, "alice");
        let bob = new_user(&mut tx, "bob");
        tx.insert_friendship(NewFriendShip::new(&bob, &alice)).unwrap();
        tables = tx.working.unwrap();

        let mut tx = MemoryTx::new(&tables);
        assert!(tx.user_by_username("alice").unwrap().is_some());
        assert_eq!(tx.count_friendships(alice.id, FollowDirection::FollowedBy).unwrap(), 1);
        assert!(tx.tweets().unwrap().is_empty());
        tx.insert_friendship(NewFriendShip::new(&bob, &alice)).unwrap();
        assert_eq!(tx.delete_like(1, alice.id).unwrap(), 0);
        assert_eq!(tx.delete_tweet(999).unwrap(), 0);
        assert!(tx.working.is_none());

        tx.delete_friendship(alice.id, bob.id).unwrap();
        assert!(tx.working.is_some());
        assert_eq!(tables.friendships.len(), 1);
    }

    #[test]
    fn writes_after_reads_are_committed() {
        let store = MemoryStore::default();
        store.transaction(|tx| Ok(new_user(tx, "alice"))).unwrap();
        let bob = store
            .transaction(|tx| {
                assert!(tx.user_by_username("bob")?.is_none());
                Ok(new_user(tx, "bob"))
            })
            .unwrap();
        assert_eq!(bob.id, 2);
        let found = store.transaction(|tx| tx.user_by_id(bob.id)).unwrap();
        assert_eq!(found.map(|u| u.username), Some("bob".to_string()));
    }

    #[test]
    fn duplicate_username_is_a_validation_error() {
        let store = MemoryStore::default();
        store.transaction(|tx| Ok(new_user(tx, "alice"))).unwrap();

        let again = store.transaction(|tx| {
            tx.insert_user(NewUser::new("alice".to_string(), "other@example.com".to_string(), "x".to_string()))
        });
        match again {
            Err(ServerError::Validation(errors)) => assert!(errors.has("username")),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn friendship_insert_is_idempotent() {
        let store = MemoryStore::default();
        let count = store
            .transaction(|tx| {
                let alice = new_user(tx, "alice");
                let bob = new_user(tx, "bob");
                tx.insert_friendship(NewFriendShip::new(&bob, &alice))?;
                tx.insert_friendship(NewFriendShip::new(&bob, &alice))?;
                tx.count_friendships(alice.id, FollowDirection::FollowedBy)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn deleting_a_tweet_drops_its_likes() {
        let store = MemoryStore::default();
        let (alice, tweet) = store
            .transaction(|tx| {
                let alice = new_user(tx, "alice");
                let tweet = tx.insert_tweet(NewTweet::new(alice.id, "hello".to_string()))?;
                tx.insert_like(NewTweetLike { tweet_id: tweet.id, user_id: alice.id })?;
                Ok((alice, tweet))
            })
            .unwrap();

        let liked = store
            .transaction(|tx| {
                tx.delete_tweet(tweet.id)?;
                tx.liked_tweet_ids(alice.id)
            })
            .unwrap();
        assert!(liked.is_empty());
    }
}
