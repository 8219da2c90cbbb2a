// MemoryStore — in-process backend implementing the Store trait.
//
// Rows live in plain Vecs behind a tokio RwLock; every trait method takes a
// read or write lock, does its filtering, and returns owned clones. This is
// the reference implementation of the query semantics and what the
// integration tests run against.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::models::{Engagement, Log, LogQuery, Profile};
use super::traits::Store;

#[derive(Default)]
struct Inner {
    logs: Vec<Log>,
    profiles: Vec<Profile>,
    /// (follower_id, following_id) pairs
    follows: Vec<(String, String)>,
    likes: Vec<Engagement>,
    comments: Vec<Engagement>,
    relogs: Vec<Engagement>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Seeding (tests and demos) ---

    pub async fn add_log(&self, log: Log) {
        self.inner.write().await.logs.push(log);
    }

    pub async fn add_profile(&self, profile: Profile) {
        self.inner.write().await.profiles.push(profile);
    }

    pub async fn add_follow(&self, follower_id: &str, following_id: &str) {
        self.inner
            .write()
            .await
            .follows
            .push((follower_id.to_string(), following_id.to_string()));
    }

    pub async fn add_comment(&self, user_id: &str, log_id: &str, created_at: DateTime<Utc>) {
        self.inner.write().await.comments.push(Engagement {
            user_id: user_id.to_string(),
            log_id: log_id.to_string(),
            created_at,
        });
    }

    pub async fn add_like_at(&self, user_id: &str, log_id: &str, created_at: DateTime<Utc>) {
        self.inner.write().await.likes.push(Engagement {
            user_id: user_id.to_string(),
            log_id: log_id.to_string(),
            created_at,
        });
    }

    pub async fn add_relog_at(&self, user_id: &str, log_id: &str, created_at: DateTime<Utc>) {
        self.inner.write().await.relogs.push(Engagement {
            user_id: user_id.to_string(),
            log_id: log_id.to_string(),
            created_at,
        });
    }
}

fn rows_for_logs(rows: &[Engagement], log_ids: &[String]) -> Vec<Engagement> {
    let wanted: HashSet<&str> = log_ids.iter().map(String::as_str).collect();
    rows.iter()
        .filter(|e| wanted.contains(e.log_id.as_str()))
        .cloned()
        .collect()
}

fn membership(rows: &[Engagement], user_id: &str, log_ids: &[String]) -> HashSet<String> {
    let wanted: HashSet<&str> = log_ids.iter().map(String::as_str).collect();
    rows.iter()
        .filter(|e| e.user_id == user_id && wanted.contains(e.log_id.as_str()))
        .map(|e| e.log_id.clone())
        .collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn visible_logs(&self, query: &LogQuery) -> Result<Vec<Log>> {
        let inner = self.inner.read().await;
        let authors: Option<HashSet<&str>> = query
            .authors
            .as_ref()
            .map(|a| a.iter().map(String::as_str).collect());

        let mut matched: Vec<Log> = inner
            .logs
            .iter()
            .filter(|l| l.is_visible())
            .filter(|l| query.before.is_none_or(|cutoff| l.created_at < cutoff))
            .filter(|l| {
                authors
                    .as_ref()
                    .is_none_or(|set| set.contains(l.user_id.as_str()))
            })
            .cloned()
            .collect();

        // Newest first; id as a secondary key so equal timestamps order
        // deterministically.
        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        matched.truncate(query.limit);
        Ok(matched)
    }

    async fn logs_by_id(&self, ids: &[String]) -> Result<Vec<Log>> {
        let inner = self.inner.read().await;
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        Ok(inner
            .logs
            .iter()
            .filter(|l| wanted.contains(l.id.as_str()))
            .cloned()
            .collect())
    }

    async fn profiles_by_user(&self, user_ids: &[String]) -> Result<Vec<Profile>> {
        let inner = self.inner.read().await;
        let wanted: HashSet<&str> = user_ids.iter().map(String::as_str).collect();
        Ok(inner
            .profiles
            .iter()
            .filter(|p| wanted.contains(p.user_id.as_str()))
            .cloned()
            .collect())
    }

    async fn following_of(&self, follower_id: &str) -> Result<Vec<String>> {
        let inner = self.inner.read().await;
        Ok(inner
            .follows
            .iter()
            .filter(|(follower, _)| follower == follower_id)
            .map(|(_, following)| following.clone())
            .collect())
    }

    async fn likes_for_logs(&self, log_ids: &[String]) -> Result<Vec<Engagement>> {
        let inner = self.inner.read().await;
        Ok(rows_for_logs(&inner.likes, log_ids))
    }

    async fn comments_for_logs(&self, log_ids: &[String]) -> Result<Vec<Engagement>> {
        let inner = self.inner.read().await;
        Ok(rows_for_logs(&inner.comments, log_ids))
    }

    async fn relogs_for_logs(&self, log_ids: &[String]) -> Result<Vec<Engagement>> {
        let inner = self.inner.read().await;
        Ok(rows_for_logs(&inner.relogs, log_ids))
    }

    async fn liked_log_ids(&self, user_id: &str, log_ids: &[String]) -> Result<HashSet<String>> {
        let inner = self.inner.read().await;
        Ok(membership(&inner.likes, user_id, log_ids))
    }

    async fn relogged_log_ids(
        &self,
        user_id: &str,
        log_ids: &[String],
    ) -> Result<HashSet<String>> {
        let inner = self.inner.read().await;
        Ok(membership(&inner.relogs, user_id, log_ids))
    }

    async fn likes_by_user_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Engagement>> {
        let inner = self.inner.read().await;
        Ok(inner
            .likes
            .iter()
            .filter(|e| e.user_id == user_id && e.created_at >= since)
            .cloned()
            .collect())
    }

    async fn insert_like(&self, user_id: &str, log_id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner
            .likes
            .iter()
            .any(|e| e.user_id == user_id && e.log_id == log_id)
        {
            return Ok(());
        }
        inner.likes.push(Engagement {
            user_id: user_id.to_string(),
            log_id: log_id.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn delete_like(&self, user_id: &str, log_id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .likes
            .retain(|e| !(e.user_id == user_id && e.log_id == log_id));
        Ok(())
    }

    async fn insert_relog(&self, user_id: &str, log_id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner
            .relogs
            .iter()
            .any(|e| e.user_id == user_id && e.log_id == log_id)
        {
            return Ok(());
        }
        inner.relogs.push(Engagement {
            user_id: user_id.to_string(),
            log_id: log_id.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn delete_relog(&self, user_id: &str, log_id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .relogs
            .retain(|e| !(e.user_id == user_id && e.log_id == log_id));
        Ok(())
    }
}
