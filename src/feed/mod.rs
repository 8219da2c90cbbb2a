// Feed assembly and ranking.
//
// `fetcher` pulls the candidate window and its side data out of the store;
// `scoring` turns assembled candidates into a ranked order. The fetcher is
// the only caller of the scorer.

pub mod fetcher;
pub mod scoring;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::store::{Log, Profile};

/// Which feed the caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    /// Chronological, restricted to followed authors plus self.
    Following,
    /// Globally sourced, reordered by the relevance scorer.
    Suggested,
}

impl FeedMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedMode::Following => "following",
            FeedMode::Suggested => "suggested",
        }
    }
}

impl std::str::FromStr for FeedMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "following" => Ok(FeedMode::Following),
            "suggested" => Ok(FeedMode::Suggested),
            other => anyhow::bail!("Unknown feed mode '{other}' (expected following|suggested)"),
        }
    }
}

/// A log assembled with everything a client renders: author profile,
/// engagement counts, and the viewer's own like/relog state.
///
/// `author` is `None` when the profile could not be resolved (e.g. a
/// deleted account) — the item still renders, degraded.
#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
    pub log: Log,
    pub author: Option<Profile>,
    pub likes_count: u64,
    pub comments_count: u64,
    pub relogs_count: u64,
    pub viewer_has_liked: bool,
    pub viewer_has_relogged: bool,
}

/// One page of a feed plus the continuation cursor.
///
/// `next_cursor` is the `created_at` of the last item of the pre-truncation
/// chronological window — `None` means end of feed.
#[derive(Debug, Clone, Serialize)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    pub next_cursor: Option<DateTime<Utc>>,
}

impl FeedPage {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }
}
