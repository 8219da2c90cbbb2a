// Data models — Rust structs that map to rows in the hosted store.
//
// These are the types that flow through the application. They're separate
// from the store backends so the feed core can use them without depending
// on reqwest or sqlx directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user profile row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A work-log post.
///
/// `hidden_at` and `deleted_at` are moderation/soft-delete markers — a log
/// with either set never enters a feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub hidden_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Log {
    /// Whether this log may appear in a feed.
    pub fn is_visible(&self) -> bool {
        self.hidden_at.is_none() && self.deleted_at.is_none()
    }
}

/// The `(user_id, log_id, created_at)` projection of a like, comment, or
/// relog row. All three relations share this shape for the columns the feed
/// core reads; counting happens by grouping these rows per log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Engagement {
    pub user_id: String,
    pub log_id: String,
    pub created_at: DateTime<Utc>,
}

/// Filter for the chronological candidate-log query.
///
/// `before` is a strict exclusive upper bound on `created_at` (the
/// pagination cursor). `authors`, when set, restricts to that author set —
/// the following feed passes the viewer's following set plus the viewer.
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    pub before: Option<DateTime<Utc>>,
    pub authors: Option<Vec<String>>,
    pub limit: usize,
}
