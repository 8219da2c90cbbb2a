// RestStore — hosted data API backend implementing the Store trait.
//
// The hosted backend exposes its tables over HTTP in the PostgREST dialect:
// filters are query parameters (`eq.`, `in.(…)`, `is.null`, `lt.`, `gte.`),
// ordering is `order=<col>.desc`, and rows come back as JSON arrays. This is
// a thin reqwest wrapper with one generic typed GET helper; each trait
// method is a single round trip.
//
// Batch lookups with an empty id set return early without touching the
// network — `in.()` is not a valid filter.

use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::models::{Engagement, Log, LogQuery, Profile};
use super::traits::Store;

pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl RestStore {
    /// Create a client for the data API at `base_url`. The key, when set,
    /// is sent as both `apikey` and bearer token (the hosted backend's
    /// anonymous-role convention).
    pub fn new(base_url: &str, api_key: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("timber/0.1")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()).map(str::to_string),
        })
    }

    fn request(&self, method: reqwest::Method, table: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, table);
        let mut req = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            req = req
                .header("apikey", key)
                .header("Authorization", format!("Bearer {key}"));
        }
        req
    }

    /// GET rows from a table and deserialize the JSON array response.
    async fn get_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>> {
        debug!(table = table, "data API select");

        let response = self
            .request(reqwest::Method::GET, table)
            .query(params)
            .send()
            .await
            .with_context(|| format!("Select on {table} failed"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Select on {table} returned {status}: {body}");
        }

        response
            .json::<Vec<T>>()
            .await
            .with_context(|| format!("Failed to deserialize {table} rows"))
    }

    async fn delete_rows(&self, table: &str, params: &[(&str, String)]) -> Result<()> {
        debug!(table = table, "data API delete");

        let response = self
            .request(reqwest::Method::DELETE, table)
            .query(params)
            .send()
            .await
            .with_context(|| format!("Delete on {table} failed"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Delete on {table} returned {status}: {body}");
        }
        Ok(())
    }

    async fn insert_engagement(&self, table: &str, user_id: &str, log_id: &str) -> Result<()> {
        debug!(table = table, "data API insert");

        let response = self
            .request(reqwest::Method::POST, table)
            // Duplicate (user_id, log_id) pairs are a no-op, matching the
            // trait's idempotence contract.
            .header("Prefer", "resolution=ignore-duplicates")
            .json(&json!({ "user_id": user_id, "log_id": log_id }))
            .send()
            .await
            .with_context(|| format!("Insert into {table} failed"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Insert into {table} returned {status}: {body}");
        }
        Ok(())
    }
}

fn in_filter(ids: &[String]) -> String {
    format!("in.({})", ids.join(","))
}

fn ts(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Row shape of a `follows?select=following_id` projection.
#[derive(Deserialize)]
struct FollowingRow {
    following_id: String,
}

/// Row shape of a `select=log_id` membership projection.
#[derive(Deserialize)]
struct LogIdRow {
    log_id: String,
}

#[async_trait]
impl Store for RestStore {
    async fn visible_logs(&self, query: &LogQuery) -> Result<Vec<Log>> {
        let mut params: Vec<(&str, String)> = vec![
            ("select", "*".to_string()),
            ("hidden_at", "is.null".to_string()),
            ("deleted_at", "is.null".to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(before) = query.before {
            params.push(("created_at", format!("lt.{}", ts(before))));
        }
        if let Some(authors) = &query.authors {
            if authors.is_empty() {
                return Ok(Vec::new());
            }
            params.push(("user_id", in_filter(authors)));
        }

        self.get_rows("logs", &params).await
    }

    async fn logs_by_id(&self, ids: &[String]) -> Result<Vec<Log>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.get_rows(
            "logs",
            &[("select", "*".to_string()), ("id", in_filter(ids))],
        )
        .await
    }

    async fn profiles_by_user(&self, user_ids: &[String]) -> Result<Vec<Profile>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.get_rows(
            "profiles",
            &[("select", "*".to_string()), ("user_id", in_filter(user_ids))],
        )
        .await
    }

    async fn following_of(&self, follower_id: &str) -> Result<Vec<String>> {
        let rows: Vec<FollowingRow> = self
            .get_rows(
                "follows",
                &[
                    ("select", "following_id".to_string()),
                    ("follower_id", format!("eq.{follower_id}")),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.following_id).collect())
    }

    async fn likes_for_logs(&self, log_ids: &[String]) -> Result<Vec<Engagement>> {
        if log_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.get_rows(
            "likes",
            &[
                ("select", "user_id,log_id,created_at".to_string()),
                ("log_id", in_filter(log_ids)),
            ],
        )
        .await
    }

    async fn comments_for_logs(&self, log_ids: &[String]) -> Result<Vec<Engagement>> {
        if log_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.get_rows(
            "comments",
            &[
                ("select", "user_id,log_id,created_at".to_string()),
                ("log_id", in_filter(log_ids)),
            ],
        )
        .await
    }

    async fn relogs_for_logs(&self, log_ids: &[String]) -> Result<Vec<Engagement>> {
        if log_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.get_rows(
            "relogs",
            &[
                ("select", "user_id,log_id,created_at".to_string()),
                ("log_id", in_filter(log_ids)),
            ],
        )
        .await
    }

    async fn liked_log_ids(&self, user_id: &str, log_ids: &[String]) -> Result<HashSet<String>> {
        if log_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let rows: Vec<LogIdRow> = self
            .get_rows(
                "likes",
                &[
                    ("select", "log_id".to_string()),
                    ("user_id", format!("eq.{user_id}")),
                    ("log_id", in_filter(log_ids)),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.log_id).collect())
    }

    async fn relogged_log_ids(
        &self,
        user_id: &str,
        log_ids: &[String],
    ) -> Result<HashSet<String>> {
        if log_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let rows: Vec<LogIdRow> = self
            .get_rows(
                "relogs",
                &[
                    ("select", "log_id".to_string()),
                    ("user_id", format!("eq.{user_id}")),
                    ("log_id", in_filter(log_ids)),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.log_id).collect())
    }

    async fn likes_by_user_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Engagement>> {
        self.get_rows(
            "likes",
            &[
                ("select", "user_id,log_id,created_at".to_string()),
                ("user_id", format!("eq.{user_id}")),
                ("created_at", format!("gte.{}", ts(since))),
            ],
        )
        .await
    }

    async fn insert_like(&self, user_id: &str, log_id: &str) -> Result<()> {
        self.insert_engagement("likes", user_id, log_id).await
    }

    async fn delete_like(&self, user_id: &str, log_id: &str) -> Result<()> {
        self.delete_rows(
            "likes",
            &[
                ("user_id", format!("eq.{user_id}")),
                ("log_id", format!("eq.{log_id}")),
            ],
        )
        .await
    }

    async fn insert_relog(&self, user_id: &str, log_id: &str) -> Result<()> {
        self.insert_engagement("relogs", user_id, log_id).await
    }

    async fn delete_relog(&self, user_id: &str, log_id: &str) -> Result<()> {
        self.delete_rows(
            "relogs",
            &[
                ("user_id", format!("eq.{user_id}")),
                ("log_id", format!("eq.{log_id}")),
            ],
        )
        .await
    }
}
