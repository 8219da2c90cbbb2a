// Store trait — backend-agnostic async interface over the hosted data store.
//
// Implementors: MemoryStore (in-process, used by tests and embedders),
// RestStore (hosted HTTP data API), PgStore (direct PostgreSQL via sqlx,
// behind the `postgres` feature).
//
// Each method corresponds to one remote round trip against a named record
// collection (logs, profiles, follows, likes, comments, relogs). The feed
// core only reads; the write methods at the bottom belong to the engagement
// command layer.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::{Engagement, Log, LogQuery, Profile};

#[async_trait]
pub trait Store: Send + Sync {
    // --- Candidate window ---

    /// Chronological page of visible logs (hidden/deleted excluded),
    /// newest first, filtered per the query.
    async fn visible_logs(&self, query: &LogQuery) -> Result<Vec<Log>>;

    /// Fetch specific logs by id. Missing ids are silently absent from the
    /// result; callers must not assume order.
    async fn logs_by_id(&self, ids: &[String]) -> Result<Vec<Log>>;

    // --- Batched side data ---

    /// Profiles for a set of user ids.
    async fn profiles_by_user(&self, user_ids: &[String]) -> Result<Vec<Profile>>;

    /// User ids the given user follows.
    async fn following_of(&self, follower_id: &str) -> Result<Vec<String>>;

    /// All like rows touching the given logs.
    async fn likes_for_logs(&self, log_ids: &[String]) -> Result<Vec<Engagement>>;

    /// All comment rows touching the given logs.
    async fn comments_for_logs(&self, log_ids: &[String]) -> Result<Vec<Engagement>>;

    /// All relog rows touching the given logs.
    async fn relogs_for_logs(&self, log_ids: &[String]) -> Result<Vec<Engagement>>;

    // --- Viewer state ---

    /// Which of the given logs the user has liked.
    async fn liked_log_ids(&self, user_id: &str, log_ids: &[String]) -> Result<HashSet<String>>;

    /// Which of the given logs the user has relogged.
    async fn relogged_log_ids(&self, user_id: &str, log_ids: &[String])
        -> Result<HashSet<String>>;

    /// The user's likes created at or after the cutoff. Feeds the
    /// recently-interacted-authors signal.
    async fn likes_by_user_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Engagement>>;

    // --- Engagement writes ---

    /// Record a like. Idempotent — re-liking an already-liked log is a no-op.
    async fn insert_like(&self, user_id: &str, log_id: &str) -> Result<()>;

    /// Remove a like.
    async fn delete_like(&self, user_id: &str, log_id: &str) -> Result<()>;

    /// Record a relog. Idempotent like `insert_like`.
    async fn insert_relog(&self, user_id: &str, log_id: &str) -> Result<()>;

    /// Remove a relog.
    async fn delete_relog(&self, user_id: &str, log_id: &str) -> Result<()>;
}
