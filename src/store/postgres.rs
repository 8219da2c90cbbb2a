// PgStore — direct PostgreSQL backend implementing the Store trait.
//
// Uses sqlx PgPool for native async queries. All queries use runtime
// parameter binding (not compile-time macros) to avoid requiring
// DATABASE_URL at compile time.
//
// The schema is owned by the hosted backend — this crate ships no
// migrations and only assumes the table and column names the data API
// exposes (logs, profiles, follows, likes, comments, relogs).

use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use super::models::{Engagement, Log, LogQuery, Profile};
use super::traits::Store;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to PostgreSQL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;
        Ok(Self { pool })
    }
}

fn log_from_row(row: &PgRow) -> Log {
    Log {
        id: row.get("id"),
        user_id: row.get("user_id"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        hidden_at: row.get("hidden_at"),
        deleted_at: row.get("deleted_at"),
    }
}

fn engagement_from_row(row: &PgRow) -> Engagement {
    Engagement {
        user_id: row.get("user_id"),
        log_id: row.get("log_id"),
        created_at: row.get("created_at"),
    }
}

const ENGAGEMENT_TABLES: [&str; 3] = ["likes", "comments", "relogs"];

impl PgStore {
    async fn engagement_for_logs(&self, table: &str, log_ids: &[String]) -> Result<Vec<Engagement>> {
        // Table names come from the fixed list above, never from input.
        debug_assert!(ENGAGEMENT_TABLES.contains(&table));
        if log_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(&format!(
            "SELECT user_id, log_id, created_at FROM {table} WHERE log_id = ANY($1)"
        ))
        .bind(log_ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Select on {table} failed"))?;

        Ok(rows.iter().map(engagement_from_row).collect())
    }

    async fn membership(
        &self,
        table: &str,
        user_id: &str,
        log_ids: &[String],
    ) -> Result<HashSet<String>> {
        debug_assert!(ENGAGEMENT_TABLES.contains(&table));
        if log_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let rows = sqlx::query(&format!(
            "SELECT log_id FROM {table} WHERE user_id = $1 AND log_id = ANY($2)"
        ))
        .bind(user_id)
        .bind(log_ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Membership select on {table} failed"))?;

        Ok(rows.iter().map(|row| row.get("log_id")).collect())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn visible_logs(&self, query: &LogQuery) -> Result<Vec<Log>> {
        if let Some(authors) = &query.authors {
            if authors.is_empty() {
                return Ok(Vec::new());
            }
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, user_id, content, created_at, hidden_at, deleted_at FROM logs \
             WHERE hidden_at IS NULL AND deleted_at IS NULL",
        );
        if let Some(before) = query.before {
            builder.push(" AND created_at < ").push_bind(before);
        }
        if let Some(authors) = &query.authors {
            builder.push(" AND user_id = ANY(").push_bind(authors.clone()).push(")");
        }
        builder
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(query.limit as i64);

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .context("Candidate log select failed")?;

        Ok(rows.iter().map(log_from_row).collect())
    }

    async fn logs_by_id(&self, ids: &[String]) -> Result<Vec<Log>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            "SELECT id, user_id, content, created_at, hidden_at, deleted_at \
             FROM logs WHERE id = ANY($1)",
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .context("Log select by id failed")?;

        Ok(rows.iter().map(log_from_row).collect())
    }

    async fn profiles_by_user(&self, user_ids: &[String]) -> Result<Vec<Profile>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            "SELECT user_id, username, display_name, avatar_url, created_at \
             FROM profiles WHERE user_id = ANY($1)",
        )
        .bind(user_ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .context("Profile select failed")?;

        Ok(rows
            .iter()
            .map(|row| Profile {
                user_id: row.get("user_id"),
                username: row.get("username"),
                display_name: row.get("display_name"),
                avatar_url: row.get("avatar_url"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn following_of(&self, follower_id: &str) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT following_id FROM follows WHERE follower_id = $1")
            .bind(follower_id)
            .fetch_all(&self.pool)
            .await
            .context("Follow select failed")?;

        Ok(rows.iter().map(|row| row.get("following_id")).collect())
    }

    async fn likes_for_logs(&self, log_ids: &[String]) -> Result<Vec<Engagement>> {
        self.engagement_for_logs("likes", log_ids).await
    }

    async fn comments_for_logs(&self, log_ids: &[String]) -> Result<Vec<Engagement>> {
        self.engagement_for_logs("comments", log_ids).await
    }

    async fn relogs_for_logs(&self, log_ids: &[String]) -> Result<Vec<Engagement>> {
        self.engagement_for_logs("relogs", log_ids).await
    }

    async fn liked_log_ids(&self, user_id: &str, log_ids: &[String]) -> Result<HashSet<String>> {
        self.membership("likes", user_id, log_ids).await
    }

    async fn relogged_log_ids(
        &self,
        user_id: &str,
        log_ids: &[String],
    ) -> Result<HashSet<String>> {
        self.membership("relogs", user_id, log_ids).await
    }

    async fn likes_by_user_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Engagement>> {
        let rows = sqlx::query(
            "SELECT user_id, log_id, created_at FROM likes \
             WHERE user_id = $1 AND created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .context("Recent-like select failed")?;

        Ok(rows.iter().map(engagement_from_row).collect())
    }

    async fn insert_like(&self, user_id: &str, log_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO likes (user_id, log_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(log_id)
        .execute(&self.pool)
        .await
        .context("Like insert failed")?;
        Ok(())
    }

    async fn delete_like(&self, user_id: &str, log_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM likes WHERE user_id = $1 AND log_id = $2")
            .bind(user_id)
            .bind(log_id)
            .execute(&self.pool)
            .await
            .context("Like delete failed")?;
        Ok(())
    }

    async fn insert_relog(&self, user_id: &str, log_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO relogs (user_id, log_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(log_id)
        .execute(&self.pool)
        .await
        .context("Relog insert failed")?;
        Ok(())
    }

    async fn delete_relog(&self, user_id: &str, log_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM relogs WHERE user_id = $1 AND log_id = $2")
            .bind(user_id)
            .bind(log_id)
            .execute(&self.pool)
            .await
            .context("Relog delete failed")?;
        Ok(())
    }
}
