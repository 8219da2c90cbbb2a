// Candidate fetching and page assembly.
//
// One call = one feed page: pull the chronological candidate window, fan
// out the batched side-data reads, assemble FeedItems, rank (suggested mode
// only), truncate, and hand back a continuation cursor.
//
// The reads are not a single consistent snapshot — a like landing between
// the window query and the count query shows up as a harmless off-by-one
// that self-corrects on the next fetch.
//
// Side data is always resolved by distinct-id-set batches, one round trip
// per relation. Per-record lookups in a loop are an error here, not a
// style choice.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::scoring::{self, ScoreContext, ScoreWeights};
use super::{FeedItem, FeedMode, FeedPage};
use crate::store::{Engagement, LogQuery, Store};

/// Suggested mode fetches this many times the page size so the scorer has
/// material to re-rank before truncation.
pub const SUGGESTED_OVERFETCH: usize = 3;

/// Likes within this trailing window mark their log's author as
/// recently-interacted-with.
pub const INTERACTION_WINDOW_DAYS: i64 = 7;

/// Parameters of one page fetch.
#[derive(Debug, Clone)]
pub struct FeedRequest {
    pub mode: FeedMode,
    /// None for logged-out viewers
    pub viewer_id: Option<String>,
    /// Exclusive upper bound on `created_at`, from the previous page
    pub cursor: Option<DateTime<Utc>>,
    pub page_size: usize,
    /// Deadline for the whole fetch, including all fanned-out reads
    pub deadline: Option<Duration>,
    pub weights: ScoreWeights,
}

impl FeedRequest {
    pub fn new(mode: FeedMode, viewer_id: Option<String>, page_size: usize) -> Self {
        Self {
            mode,
            viewer_id,
            cursor: None,
            page_size,
            deadline: None,
            weights: ScoreWeights::default(),
        }
    }
}

/// Fetch one feed page.
///
/// Any store failure aborts the whole fetch — no partial pages. A missing
/// author profile degrades that one item instead of failing the page.
pub async fn fetch_page(store: &dyn Store, req: &FeedRequest) -> Result<FeedPage> {
    match req.deadline {
        Some(deadline) => tokio::time::timeout(deadline, fetch_page_inner(store, req))
            .await
            .map_err(|_| anyhow!("Feed fetch exceeded deadline of {deadline:?}"))?,
        None => fetch_page_inner(store, req).await,
    }
}

async fn fetch_page_inner(store: &dyn Store, req: &FeedRequest) -> Result<FeedPage> {
    let now = Utc::now();

    // Graph signals. The following set is fetched in both modes — suggested
    // scoring consumes it too. Both reads are empty for anonymous viewers.
    let (following, recent_authors) = match req.viewer_id.as_deref() {
        Some(viewer) => futures::try_join!(
            following_set(store, viewer),
            recently_liked_authors(store, viewer, now),
        )?,
        None => (HashSet::new(), HashSet::new()),
    };

    // A personal feed needs a person.
    if req.mode == FeedMode::Following && req.viewer_id.is_none() {
        return Ok(FeedPage::empty());
    }

    let fetch_limit = match req.mode {
        FeedMode::Suggested => req.page_size * SUGGESTED_OVERFETCH,
        FeedMode::Following => req.page_size,
    };
    let authors = match (req.mode, req.viewer_id.as_deref()) {
        (FeedMode::Following, Some(viewer)) => {
            let mut ids: Vec<String> = following.iter().cloned().collect();
            ids.push(viewer.to_string());
            Some(ids)
        }
        _ => None,
    };

    let window = store
        .visible_logs(&LogQuery {
            before: req.cursor,
            authors,
            limit: fetch_limit,
        })
        .await?;

    debug!(
        mode = req.mode.as_str(),
        window = window.len(),
        limit = fetch_limit,
        "Candidate window fetched"
    );

    if window.is_empty() {
        return Ok(FeedPage::empty());
    }

    // The cursor tracks the chronological window, not the ranked order:
    // whatever the scorer does above, the next page resumes where this
    // window ended. A short window means the store ran out of logs.
    let next_cursor = if window.len() == fetch_limit {
        window.last().map(|log| log.created_at)
    } else {
        None
    };

    let log_ids: Vec<String> = window.iter().map(|log| log.id.clone()).collect();
    let author_ids: Vec<String> = {
        let distinct: HashSet<&str> = window.iter().map(|log| log.user_id.as_str()).collect();
        distinct.into_iter().map(str::to_string).collect()
    };

    // Batched side data, one round trip per relation, fanned out.
    let (profiles, likes, comments, relogs) = futures::try_join!(
        store.profiles_by_user(&author_ids),
        store.likes_for_logs(&log_ids),
        store.comments_for_logs(&log_ids),
        store.relogs_for_logs(&log_ids),
    )?;

    let (viewer_likes, viewer_relogs) = match req.viewer_id.as_deref() {
        Some(viewer) => futures::try_join!(
            store.liked_log_ids(viewer, &log_ids),
            store.relogged_log_ids(viewer, &log_ids),
        )?,
        None => (HashSet::new(), HashSet::new()),
    };

    let profile_by_user: HashMap<String, _> = profiles
        .into_iter()
        .map(|p| (p.user_id.clone(), p))
        .collect();
    let likes_count = count_by_log(&likes);
    let comments_count = count_by_log(&comments);
    let relogs_count = count_by_log(&relogs);

    // Posting consistency within this window, for the credibility term
    let mut author_window_counts: HashMap<String, usize> = HashMap::new();
    for log in &window {
        *author_window_counts.entry(log.user_id.clone()).or_default() += 1;
    }

    let items: Vec<FeedItem> = window
        .into_iter()
        .map(|log| {
            let author = profile_by_user.get(&log.user_id).cloned();
            if author.is_none() {
                warn!(log_id = %log.id, author_id = %log.user_id, "Author profile missing");
            }
            FeedItem {
                author,
                likes_count: likes_count.get(&log.id).copied().unwrap_or(0),
                comments_count: comments_count.get(&log.id).copied().unwrap_or(0),
                relogs_count: relogs_count.get(&log.id).copied().unwrap_or(0),
                viewer_has_liked: viewer_likes.contains(&log.id),
                viewer_has_relogged: viewer_relogs.contains(&log.id),
                log,
            }
        })
        .collect();

    let mut items = match req.mode {
        // Already newest-first from the store
        FeedMode::Following => items,
        FeedMode::Suggested => {
            let ctx = ScoreContext {
                now,
                viewer_id: req.viewer_id.as_deref(),
                following: &following,
                recent_authors: &recent_authors,
                author_window_counts: &author_window_counts,
            };
            scoring::rank(items, &ctx, &req.weights)
                .into_iter()
                .map(|scored| scored.item)
                .collect()
        }
    };
    items.truncate(req.page_size);

    info!(
        mode = req.mode.as_str(),
        items = items.len(),
        has_more = next_cursor.is_some(),
        "Feed page assembled"
    );

    Ok(FeedPage { items, next_cursor })
}

async fn following_set(store: &dyn Store, viewer_id: &str) -> Result<HashSet<String>> {
    Ok(store.following_of(viewer_id).await?.into_iter().collect())
}

/// Authors of logs the viewer liked within the trailing interaction
/// window, deduplicated. Two dependent round trips: likes, then the liked
/// logs (to learn their authors).
async fn recently_liked_authors(
    store: &dyn Store,
    viewer_id: &str,
    now: DateTime<Utc>,
) -> Result<HashSet<String>> {
    let cutoff = now - chrono::Duration::days(INTERACTION_WINDOW_DAYS);
    let recent_likes = store.likes_by_user_since(viewer_id, cutoff).await?;
    if recent_likes.is_empty() {
        return Ok(HashSet::new());
    }

    let liked_ids: Vec<String> = {
        let distinct: HashSet<&str> = recent_likes.iter().map(|e| e.log_id.as_str()).collect();
        distinct.into_iter().map(str::to_string).collect()
    };
    let liked_logs = store.logs_by_id(&liked_ids).await?;
    Ok(liked_logs.into_iter().map(|log| log.user_id).collect())
}

fn count_by_log(rows: &[Engagement]) -> HashMap<String, u64> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for row in rows {
        *counts.entry(row.log_id.clone()).or_default() += 1;
    }
    counts
}
