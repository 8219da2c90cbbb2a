// Suggested-feed scoring.
//
// Computes a relevance score for each log based on:
// - Interest (0.45): follows, recent interactions, topic-affinity placeholder
// - Engagement quality (0.25): likes/comments/relogs with log saturation
// - Recency (0.20): exponential decay over a 42-hour half-life
// - Credibility (0.10): author's posting consistency in the current window
// - Freshness boost: temporary additive boost for new, low-engagement logs
//
// The topic-affinity placeholder is a deterministic pseudo-random
// perturbation derived from (log id, UTC day number): stable within a
// calendar day, reshuffled across days. True per-request randomness would
// make near-tie ordering flap between requests.

use std::collections::{HashMap, HashSet};
use std::hash::{DefaultHasher, Hash, Hasher};

use chrono::{DateTime, Utc};

use super::FeedItem;

/// Configurable weights and thresholds for the relevance score.
///
/// The four term weights sum to 1.0, so the weighted sum stays in [0, 1]
/// as long as each term is clamped to [0, 1]. The freshness boost sits
/// outside the weighted sum.
#[derive(Debug, Clone)]
pub struct ScoreWeights {
    /// Weight of the interest term (default 0.45)
    pub interest: f64,
    /// Weight of the engagement-quality term (default 0.25)
    pub engagement: f64,
    /// Weight of the recency term (default 0.20)
    pub recency: f64,
    /// Weight of the credibility term (default 0.10)
    pub credibility: f64,
    /// Interest sub-weight: viewer follows the author (default 0.35)
    pub follows_author: f64,
    /// Interest sub-weight: viewer recently interacted with the author
    /// (default 0.20)
    pub recent_interaction: f64,
    /// Upper bound of the topic-affinity perturbation (default 0.15)
    pub affinity_jitter: f64,
    /// Recency half-life in hours (default 42, the middle of the 36-48h
    /// decay window)
    pub decay_half_life_hours: f64,
    /// Logs younger than this many hours qualify for the freshness boost
    /// (default 6)
    pub freshness_window_hours: f64,
    /// Maximum freshness boost (default 0.05)
    pub freshness_boost_max: f64,
    /// Raw engagement at or above this disqualifies the freshness boost
    /// (default 5)
    pub low_engagement_threshold: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            interest: 0.45,
            engagement: 0.25,
            recency: 0.20,
            credibility: 0.10,
            follows_author: 0.35,
            recent_interaction: 0.20,
            affinity_jitter: 0.15,
            decay_half_life_hours: 42.0,
            freshness_window_hours: 6.0,
            freshness_boost_max: 0.05,
            low_engagement_threshold: 5.0,
        }
    }
}

/// Engagement point values per interaction kind.
pub const LIKE_POINTS: f64 = 1.0;
pub const COMMENT_POINTS: f64 = 3.0;
pub const RELOG_POINTS: f64 = 4.0;

/// Raw engagement at which the normalized term reaches 1.0. A fully maxed
/// window post (1000 likes + 1000 comments + 1000 relogs = raw 8000) must
/// stay strictly below saturation, hence 10k rather than the knee of the
/// visible counter range.
pub const ENGAGEMENT_SATURATION: f64 = 10_000.0;

/// Window post count at which the credibility term reaches 1.0.
pub const CREDIBILITY_SATURATION: f64 = 20.0;

/// Scores closer than this are tied; ties order newest-first.
pub const SCORE_TIE_EPSILON: f64 = 0.001;

/// Per-request context the scorer reads. All sets are snapshots the
/// fetcher assembled for the current candidate window.
#[derive(Debug)]
pub struct ScoreContext<'a> {
    pub now: DateTime<Utc>,
    pub viewer_id: Option<&'a str>,
    /// Authors the viewer follows
    pub following: &'a HashSet<String>,
    /// Authors of logs the viewer liked in the trailing window
    pub recent_authors: &'a HashSet<String>,
    /// Author -> post count within the current candidate window
    pub author_window_counts: &'a HashMap<String, usize>,
}

/// A candidate paired with its computed score, alive for one ranking pass.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub item: FeedItem,
    pub score: f64,
}

/// Weighted raw engagement of a log.
pub fn raw_engagement(item: &FeedItem) -> f64 {
    item.likes_count as f64 * LIKE_POINTS
        + item.comments_count as f64 * COMMENT_POINTS
        + item.relogs_count as f64 * RELOG_POINTS
}

/// Deterministic stand-in for a content-similarity signal: a hash of the
/// log id and the UTC day number, mapped to [0, 1).
fn unit_noise(log_id: &str, day_bucket: i64) -> f64 {
    let mut hasher = DefaultHasher::new();
    log_id.hash(&mut hasher);
    day_bucket.hash(&mut hasher);
    // Keep 53 bits so the quotient is exact in an f64.
    (hasher.finish() >> 11) as f64 / (1u64 << 53) as f64
}

fn day_bucket(now: DateTime<Utc>) -> i64 {
    now.timestamp().div_euclid(86_400)
}

/// Compute the relevance score for one assembled log.
///
/// The weighted sum of the four terms lands in [0, 1]; the freshness boost
/// adds at most `freshness_boost_max` on top.
pub fn score_log(item: &FeedItem, ctx: &ScoreContext, weights: &ScoreWeights) -> f64 {
    let author_id = item.log.user_id.as_str();
    let noise = unit_noise(&item.log.id, day_bucket(ctx.now));

    // 1. Interest (0-1)
    let interest = match ctx.viewer_id {
        Some(_) => {
            let mut score = 0.0;
            if ctx.following.contains(author_id) {
                score += weights.follows_author;
            }
            if ctx.recent_authors.contains(author_id) {
                score += weights.recent_interaction;
            }
            // Topic-affinity placeholder
            score += noise * weights.affinity_jitter;
            score.min(1.0)
        }
        // Logged-out viewers get a flat 0.3-0.5 baseline
        None => 0.3 + noise * 0.2,
    };

    // 2. Engagement quality (0-1) with logarithmic saturation, so virality
    // cannot fully dominate ranking
    let raw = raw_engagement(item);
    let engagement = ((1.0 + raw).ln() / (1.0 + ENGAGEMENT_SATURATION).ln()).min(1.0);

    // 3. Recency (0-1) with exponential half-life decay. Negative ages
    // (clock skew) would push the term above 1, so clamp at zero.
    let age_hours = age_hours(item, ctx.now);
    let recency = 0.5_f64.powf(age_hours / weights.decay_half_life_hours);

    // 4. Author credibility (0-1): posting consistency within the current
    // candidate window, no historical data required
    let window_posts = ctx
        .author_window_counts
        .get(author_id)
        .copied()
        .unwrap_or(1)
        .max(1);
    let credibility = ((1.0 + window_posts as f64).ln() / CREDIBILITY_SATURATION.ln()).min(1.0);

    // 5. Freshness boost for young, not-yet-engaged logs, decaying linearly
    // to zero over the freshness window
    let freshness_boost = if age_hours < weights.freshness_window_hours
        && raw < weights.low_engagement_threshold
    {
        weights.freshness_boost_max * (1.0 - age_hours / weights.freshness_window_hours)
    } else {
        0.0
    };

    interest * weights.interest
        + engagement * weights.engagement
        + recency * weights.recency
        + credibility * weights.credibility
        + freshness_boost
}

fn age_hours(item: &FeedItem, now: DateTime<Utc>) -> f64 {
    let seconds = (now - item.log.created_at).num_milliseconds() as f64 / 1000.0;
    (seconds / 3600.0).max(0.0)
}

/// Score and sort candidates: best first, near-ties broken newest-first.
///
/// Scores are quantized into `SCORE_TIE_EPSILON`-wide buckets before
/// comparison — a pairwise "within epsilon" comparator is not a total
/// order, but the bucketed key is, so the sort is deterministic.
pub fn rank(items: Vec<FeedItem>, ctx: &ScoreContext, weights: &ScoreWeights) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = items
        .into_iter()
        .map(|item| {
            let score = score_log(&item, ctx, weights);
            ScoredCandidate { item, score }
        })
        .collect();

    scored.sort_by(|a, b| {
        let bucket_a = (a.score / SCORE_TIE_EPSILON).floor() as i64;
        let bucket_b = (b.score / SCORE_TIE_EPSILON).floor() as i64;
        bucket_b
            .cmp(&bucket_a)
            .then_with(|| b.item.log.created_at.cmp(&a.item.log.created_at))
    });

    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Log;
    use chrono::Duration;

    fn item(id: &str, author: &str, age_hours: i64, likes: u64, comments: u64, relogs: u64, now: DateTime<Utc>) -> FeedItem {
        FeedItem {
            log: Log {
                id: id.to_string(),
                user_id: author.to_string(),
                content: format!("log {id}"),
                created_at: now - Duration::hours(age_hours),
                hidden_at: None,
                deleted_at: None,
            },
            author: None,
            likes_count: likes,
            comments_count: comments,
            relogs_count: relogs,
            viewer_has_liked: false,
            viewer_has_relogged: false,
        }
    }

    fn empty_ctx(now: DateTime<Utc>, following: &'static HashSet<String>) -> ScoreContext<'static> {
        // Leaked statics keep the test helper signature simple.
        ScoreContext {
            now,
            viewer_id: None,
            following,
            recent_authors: following,
            author_window_counts: Box::leak(Box::new(HashMap::new())),
        }
    }

    fn sets() -> &'static HashSet<String> {
        Box::leak(Box::new(HashSet::new()))
    }

    #[test]
    fn test_engagement_saturates_below_one() {
        let now = Utc::now();
        // 1000 likes + 1000 comments + 1000 relogs = raw 8000
        let it = item("a", "u1", 40, 1000, 1000, 1000, now);
        let raw = raw_engagement(&it);
        assert_eq!(raw, 8000.0);
        let term = ((1.0 + raw).ln() / (1.0 + ENGAGEMENT_SATURATION).ln()).min(1.0);
        // ln(8001)/ln(10001) = 0.9758...
        assert!(term > 0.95 && term < 1.0, "expected just under 1.0, got {term}");
    }

    #[test]
    fn test_engagement_clamps_at_saturation() {
        let now = Utc::now();
        // raw = 20000, past the saturation point
        let it = item("a", "u1", 1, 20000, 0, 0, now);
        let raw = raw_engagement(&it);
        let term = ((1.0 + raw).ln() / (1.0 + ENGAGEMENT_SATURATION).ln()).min(1.0);
        assert_eq!(term, 1.0);
    }

    /// Weights that isolate a single term by zeroing the other three and
    /// the boost.
    fn isolating(term: &str) -> ScoreWeights {
        let mut weights = ScoreWeights {
            interest: 0.0,
            engagement: 0.0,
            recency: 0.0,
            credibility: 0.0,
            freshness_boost_max: 0.0,
            ..ScoreWeights::default()
        };
        match term {
            "interest" => weights.interest = 1.0,
            "engagement" => weights.engagement = 1.0,
            "recency" => weights.recency = 1.0,
            "credibility" => weights.credibility = 1.0,
            "boost" => weights.freshness_boost_max = 0.05,
            other => panic!("unknown term {other}"),
        }
        weights
    }

    #[test]
    fn test_freshness_boost_decays_linearly() {
        let now = Utc::now();
        let following = sets();
        let ctx = empty_ctx(now, following);
        let weights = isolating("boost");

        // Brand new, zero engagement: full 0.05
        let full = score_log(&item("a", "u", 0, 0, 0, 0, now), &ctx, &weights);
        assert!((full - 0.05).abs() < 1e-9, "got {full}");

        // Halfway through the window: half the boost
        let half = score_log(&item("a", "u", 3, 0, 0, 0, now), &ctx, &weights);
        assert!((half - 0.025).abs() < 1e-9, "got {half}");

        // At the window edge: gone
        let edge = score_log(&item("a", "u", 6, 0, 0, 0, now), &ctx, &weights);
        assert_eq!(edge, 0.0);

        // Young but already engaged (raw = 5): disqualified
        let engaged = score_log(&item("a", "u", 0, 5, 0, 0, now), &ctx, &weights);
        assert_eq!(engaged, 0.0);
    }

    #[test]
    fn test_recency_half_life() {
        let now = Utc::now();
        let following = sets();
        let ctx = empty_ctx(now, following);
        let weights = isolating("recency");

        let at_zero = score_log(&item("a", "u", 0, 0, 0, 0, now), &ctx, &weights);
        let at_half = score_log(&item("a", "u", 42, 0, 0, 0, now), &ctx, &weights);
        let at_full = score_log(&item("a", "u", 84, 0, 0, 0, now), &ctx, &weights);

        assert!((at_zero - 1.0).abs() < 1e-9, "got {at_zero}");
        assert!((at_half - 0.5).abs() < 1e-9, "got {at_half}");
        assert!((at_full - 0.25).abs() < 1e-9, "got {at_full}");
    }

    #[test]
    fn test_credibility_saturates_at_twenty_posts() {
        let now = Utc::now();
        let following = sets();
        let mut counts = HashMap::new();
        counts.insert("prolific".to_string(), 19usize);
        counts.insert("megaposter".to_string(), 50usize);
        let ctx = ScoreContext {
            now,
            viewer_id: None,
            following,
            recent_authors: following,
            author_window_counts: &counts,
        };
        let weights = isolating("credibility");

        // ln(20)/ln(20) = 1.0 at 19 posts; clamped at 1.0 past that
        let prolific = score_log(&item("a", "prolific", 100, 0, 0, 0, now), &ctx, &weights);
        let mega = score_log(&item("b", "megaposter", 100, 0, 0, 0, now), &ctx, &weights);
        assert!((prolific - 1.0).abs() < 1e-9, "got {prolific}");
        assert_eq!(mega, 1.0);

        // Unknown author defaults to one window post: ln(2)/ln(20) = 0.2314
        let unknown = score_log(&item("c", "lurker", 100, 0, 0, 0, now), &ctx, &weights);
        assert!((unknown - 0.2314).abs() < 0.001, "got {unknown}");
    }

    #[test]
    fn test_anonymous_interest_baseline_range() {
        let now = Utc::now();
        let following = sets();
        let ctx = empty_ctx(now, following);
        let weights = isolating("interest");

        for id in ["a", "b", "c", "d", "e", "f"] {
            let score = score_log(&item(id, "u", 100, 0, 0, 0, now), &ctx, &weights);
            assert!((0.3..0.5).contains(&score), "baseline out of range: {score}");
        }
    }

    #[test]
    fn test_score_is_bounded() {
        let now = Utc::now();
        let mut following = HashSet::new();
        following.insert("star".to_string());
        let mut recent = HashSet::new();
        recent.insert("star".to_string());
        let mut counts = HashMap::new();
        counts.insert("star".to_string(), 30usize);
        let ctx = ScoreContext {
            now,
            viewer_id: Some("viewer"),
            following: &following,
            recent_authors: &recent,
            author_window_counts: &counts,
        };
        let weights = ScoreWeights::default();

        // Max everything: followed + recent author, huge engagement,
        // brand-new post (boost disqualified by engagement anyway)
        let it = item("a", "star", 0, 100_000, 100_000, 100_000, now);
        let score = score_log(&it, &ctx, &weights);
        assert!(score <= 1.05, "score above bound: {score}");
        assert!(score >= 0.0);
    }

    #[test]
    fn test_score_is_deterministic() {
        let now = Utc::now();
        let following = sets();
        let ctx = empty_ctx(now, following);
        let weights = ScoreWeights::default();
        let it = item("a", "u", 5, 3, 1, 0, now);

        let first = score_log(&it, &ctx, &weights);
        let second = score_log(&it, &ctx, &weights);
        assert_eq!(first, second);
    }

    #[test]
    fn test_followed_author_outranks_stranger() {
        let now = Utc::now();
        let mut following = HashSet::new();
        following.insert("friend".to_string());
        let recent = HashSet::new();
        let counts = HashMap::new();
        let ctx = ScoreContext {
            now,
            viewer_id: Some("viewer"),
            following: &following,
            recent_authors: &recent,
            author_window_counts: &counts,
        };
        let weights = ScoreWeights::default();

        // Same age and engagement; the follow edge (0.45 * 0.35 = 0.1575)
        // dominates the jitter spread (0.45 * 0.15 = 0.0675)
        let ranked = rank(
            vec![
                item("x", "stranger", 10, 0, 0, 0, now),
                item("y", "friend", 10, 0, 0, 0, now),
            ],
            &ctx,
            &weights,
        );
        assert_eq!(ranked[0].item.log.user_id, "friend");
    }

    #[test]
    fn test_rank_is_monotone_non_increasing() {
        let now = Utc::now();
        let following = sets();
        let ctx = empty_ctx(now, following);
        let weights = ScoreWeights::default();

        let items = vec![
            item("a", "u1", 1, 50, 2, 1, now),
            item("b", "u2", 30, 0, 0, 0, now),
            item("c", "u3", 5, 3, 0, 0, now),
            item("d", "u1", 70, 400, 30, 12, now),
            item("e", "u4", 0, 0, 0, 0, now),
        ];
        let ranked = rank(items, &ctx, &weights);
        for pair in ranked.windows(2) {
            assert!(
                pair[1].score <= pair[0].score + SCORE_TIE_EPSILON,
                "ranking not monotone: {} then {}",
                pair[0].score,
                pair[1].score
            );
        }
    }

    #[test]
    fn test_near_ties_break_newest_first() {
        let now = Utc::now();
        let mut following = HashSet::new();
        following.insert("u".to_string());
        let recent = HashSet::new();
        let counts = HashMap::new();
        let ctx = ScoreContext {
            now,
            viewer_id: Some("viewer"),
            following: &following,
            recent_authors: &recent,
            author_window_counts: &counts,
        };
        // Zero jitter so the two logs score identically
        let weights = ScoreWeights {
            affinity_jitter: 0.0,
            ..ScoreWeights::default()
        };

        let older = FeedItem {
            log: Log {
                id: "old".to_string(),
                user_id: "u".to_string(),
                content: String::new(),
                created_at: now - Duration::hours(20),
                hidden_at: None,
                deleted_at: None,
            },
            author: None,
            likes_count: 0,
            comments_count: 0,
            relogs_count: 0,
            viewer_has_liked: false,
            viewer_has_relogged: false,
        };
        let newer = FeedItem {
            log: Log {
                id: "new".to_string(),
                created_at: now - Duration::hours(20) + Duration::seconds(1),
                ..older.log.clone()
            },
            ..older.clone()
        };

        let ranked = rank(vec![older, newer], &ctx, &weights);
        assert_eq!(ranked[0].item.log.id, "new");
        assert_eq!(ranked[1].item.log.id, "old");
    }
}
