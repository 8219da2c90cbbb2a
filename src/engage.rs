// Optimistic engagement commands — like/relog with rollback.
//
// The client flips its local counters first so the tap feels instant, then
// persists. If the write fails, the local transition is reverted and the
// error surfaces to the caller. The next authoritative feed fetch
// reconciles whatever drift optimism introduced.

use anyhow::Result;
use tracing::warn;

use crate::feed::FeedItem;
use crate::store::Store;

/// The client-side engagement state of one log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngagementState {
    pub likes_count: u64,
    pub relogs_count: u64,
    pub viewer_has_liked: bool,
    pub viewer_has_relogged: bool,
}

impl EngagementState {
    /// Seed the local state from an authoritative feed item.
    pub fn from_item(item: &FeedItem) -> Self {
        Self {
            likes_count: item.likes_count,
            relogs_count: item.relogs_count,
            viewer_has_liked: item.viewer_has_liked,
            viewer_has_relogged: item.viewer_has_relogged,
        }
    }
}

/// One engagement mutation on one log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngageAction {
    Like,
    Unlike,
    Relog,
    Unrelog,
}

impl EngageAction {
    /// The action a like-button tap means given the current state.
    pub fn toggle_like(state: &EngagementState) -> Self {
        if state.viewer_has_liked {
            EngageAction::Unlike
        } else {
            EngageAction::Like
        }
    }

    /// The action a relog-button tap means given the current state.
    pub fn toggle_relog(state: &EngagementState) -> Self {
        if state.viewer_has_relogged {
            EngageAction::Unrelog
        } else {
            EngageAction::Relog
        }
    }

    /// Apply the local state transition. Counters saturate at zero —
    /// un-liking a log whose count the server already reconciled down must
    /// not underflow.
    pub fn apply(&self, state: &mut EngagementState) {
        match self {
            EngageAction::Like => {
                state.likes_count += 1;
                state.viewer_has_liked = true;
            }
            EngageAction::Unlike => {
                state.likes_count = state.likes_count.saturating_sub(1);
                state.viewer_has_liked = false;
            }
            EngageAction::Relog => {
                state.relogs_count += 1;
                state.viewer_has_relogged = true;
            }
            EngageAction::Unrelog => {
                state.relogs_count = state.relogs_count.saturating_sub(1);
                state.viewer_has_relogged = false;
            }
        }
    }

    /// Undo `apply`.
    pub fn revert(&self, state: &mut EngagementState) {
        match self {
            EngageAction::Like => EngageAction::Unlike.apply(state),
            EngageAction::Unlike => EngageAction::Like.apply(state),
            EngageAction::Relog => EngageAction::Unrelog.apply(state),
            EngageAction::Unrelog => EngageAction::Relog.apply(state),
        }
    }
}

/// Apply the action locally, then persist it. On a failed write the local
/// transition is rolled back and the error propagates.
pub async fn engage(
    store: &dyn Store,
    viewer_id: &str,
    log_id: &str,
    action: EngageAction,
    state: &mut EngagementState,
) -> Result<()> {
    action.apply(state);

    let result = match action {
        EngageAction::Like => store.insert_like(viewer_id, log_id).await,
        EngageAction::Unlike => store.delete_like(viewer_id, log_id).await,
        EngageAction::Relog => store.insert_relog(viewer_id, log_id).await,
        EngageAction::Unrelog => store.delete_relog(viewer_id, log_id).await,
    };

    if let Err(error) = result {
        warn!(log_id = %log_id, action = ?action, "Engagement write failed, rolling back");
        action.revert(state);
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::models::{Engagement, Log, LogQuery, Profile};
    use anyhow::bail;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::HashSet;

    #[test]
    fn test_apply_then_revert_round_trips() {
        let initial = EngagementState {
            likes_count: 3,
            relogs_count: 1,
            viewer_has_liked: false,
            viewer_has_relogged: true,
        };
        for action in [
            EngageAction::Like,
            EngageAction::Unlike,
            EngageAction::Relog,
            EngageAction::Unrelog,
        ] {
            let mut state = initial;
            action.apply(&mut state);
            action.revert(&mut state);
            assert_eq!(state, initial, "{action:?} did not round-trip");
        }
    }

    #[test]
    fn test_unlike_saturates_at_zero() {
        let mut state = EngagementState {
            likes_count: 0,
            viewer_has_liked: true,
            ..Default::default()
        };
        EngageAction::Unlike.apply(&mut state);
        assert_eq!(state.likes_count, 0);
        assert!(!state.viewer_has_liked);
    }

    #[test]
    fn test_toggle_picks_the_inverse() {
        let mut state = EngagementState::default();
        assert_eq!(EngageAction::toggle_like(&state), EngageAction::Like);
        EngageAction::Like.apply(&mut state);
        assert_eq!(EngageAction::toggle_like(&state), EngageAction::Unlike);

        assert_eq!(EngageAction::toggle_relog(&state), EngageAction::Relog);
        EngageAction::Relog.apply(&mut state);
        assert_eq!(EngageAction::toggle_relog(&state), EngageAction::Unrelog);
    }

    #[tokio::test]
    async fn test_engage_applies_and_persists() {
        let store = MemoryStore::new();
        let mut state = EngagementState::default();

        engage(&store, "viewer", "log-1", EngageAction::Like, &mut state)
            .await
            .expect("like should persist");

        assert_eq!(state.likes_count, 1);
        assert!(state.viewer_has_liked);
        let liked = store
            .liked_log_ids("viewer", &["log-1".to_string()])
            .await
            .expect("membership query");
        assert!(liked.contains("log-1"));
    }

    /// A store whose writes always fail.
    struct BrokenStore;

    #[async_trait]
    impl Store for BrokenStore {
        async fn visible_logs(&self, _: &LogQuery) -> anyhow::Result<Vec<Log>> {
            bail!("offline")
        }
        async fn logs_by_id(&self, _: &[String]) -> anyhow::Result<Vec<Log>> {
            bail!("offline")
        }
        async fn profiles_by_user(&self, _: &[String]) -> anyhow::Result<Vec<Profile>> {
            bail!("offline")
        }
        async fn following_of(&self, _: &str) -> anyhow::Result<Vec<String>> {
            bail!("offline")
        }
        async fn likes_for_logs(&self, _: &[String]) -> anyhow::Result<Vec<Engagement>> {
            bail!("offline")
        }
        async fn comments_for_logs(&self, _: &[String]) -> anyhow::Result<Vec<Engagement>> {
            bail!("offline")
        }
        async fn relogs_for_logs(&self, _: &[String]) -> anyhow::Result<Vec<Engagement>> {
            bail!("offline")
        }
        async fn liked_log_ids(&self, _: &str, _: &[String]) -> anyhow::Result<HashSet<String>> {
            bail!("offline")
        }
        async fn relogged_log_ids(
            &self,
            _: &str,
            _: &[String],
        ) -> anyhow::Result<HashSet<String>> {
            bail!("offline")
        }
        async fn likes_by_user_since(
            &self,
            _: &str,
            _: DateTime<Utc>,
        ) -> anyhow::Result<Vec<Engagement>> {
            bail!("offline")
        }
        async fn insert_like(&self, _: &str, _: &str) -> anyhow::Result<()> {
            bail!("offline")
        }
        async fn delete_like(&self, _: &str, _: &str) -> anyhow::Result<()> {
            bail!("offline")
        }
        async fn insert_relog(&self, _: &str, _: &str) -> anyhow::Result<()> {
            bail!("offline")
        }
        async fn delete_relog(&self, _: &str, _: &str) -> anyhow::Result<()> {
            bail!("offline")
        }
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back() {
        let store = BrokenStore;
        let mut state = EngagementState {
            likes_count: 7,
            ..Default::default()
        };
        let before = state;

        let result = engage(&store, "viewer", "log-1", EngageAction::Like, &mut state).await;

        assert!(result.is_err());
        assert_eq!(state, before, "state should roll back on write failure");
    }
}
