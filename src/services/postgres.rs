use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use crate::models::{GradeProfile, HistoryEntry, MatchResponse, ProgramRecord, RankedSchool, RankingTable, RecommendRequest};
use crate::services::catalog::{decode_programs, CatalogError, CatalogProvider};

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// PostgreSQL client
///
/// Serves the program catalog, school rankings and grade profiles, and
/// stores recommendation history for identified users.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout_secs: u64,
        idle_timeout_secs: u64,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(idle_timeout_secs))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            acquire_timeout_secs.unwrap_or(5),
            idle_timeout_secs.unwrap_or(600),
        )
        .await
    }

    /// Persist a recommendation for a user's history
    pub async fn record_recommendation(
        &self,
        user_id: &str,
        request: &RecommendRequest,
        response: &MatchResponse,
    ) -> Result<uuid::Uuid, PostgresError> {
        let id = uuid::Uuid::new_v4();
        let query = r#"
            INSERT INTO user_recommendations (id, user_id, request, result_type, response, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
        "#;

        sqlx::query(query)
            .bind(id)
            .bind(user_id)
            .bind(serde_json::to_value(request)?)
            .bind(response.kind())
            .bind(serde_json::to_value(response)?)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Recorded {} recommendation {} for {}", response.kind(), id, user_id);
        Ok(id)
    }

    /// Recommendation history for a user, newest first
    pub async fn get_history(&self, user_id: &str, limit: i64) -> Result<Vec<HistoryEntry>, PostgresError> {
        let query = r#"
            SELECT id, user_id, request, result_type, response, created_at
            FROM user_recommendations
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
        "#;

        let rows = sqlx::query(query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let entries = rows
            .iter()
            .map(|row| HistoryEntry {
                id: row.get("id"),
                user_id: row.get("user_id"),
                request: row.get("request"),
                result_type: row.get("result_type"),
                response: row.get("response"),
                created_at: row.get("created_at"),
            })
            .collect();

        Ok(entries)
    }

    /// Delete every stored recommendation for a user, returning the count
    pub async fn clear_history(&self, user_id: &str) -> Result<u64, PostgresError> {
        let result = sqlx::query("DELETE FROM user_recommendations WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Health check
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(true)
    }
}

#[async_trait]
impl CatalogProvider for PostgresClient {
    async fn catalog_snapshot(&self) -> Result<Vec<ProgramRecord>, CatalogError> {
        let rows = sqlx::query("SELECT data FROM program_vectors ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let documents: Vec<Value> = rows.iter().map(|row| row.get("data")).collect();
        let (programs, skipped) = decode_programs(documents);
        if skipped > 0 {
            tracing::warn!("Skipped {} program rows while loading catalog", skipped);
        }

        Ok(programs)
    }

    async fn ranking_table(&self) -> Result<RankingTable, CatalogError> {
        let rows = sqlx::query(
            "SELECT category, school, rating FROM school_rankings ORDER BY category, position",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut rankings = RankingTable::new();
        for row in &rows {
            let category: String = row.get("category");
            rankings.entry(category).or_default().push(RankedSchool {
                school: row.get("school"),
                rating: row.get("rating"),
            });
        }

        Ok(rankings)
    }

    async fn grade_profiles(&self) -> Result<Vec<GradeProfile>, CatalogError> {
        let rows = sqlx::query("SELECT category, subject, grade FROM grade_profiles ORDER BY category, subject")
            .fetch_all(&self.pool)
            .await?;

        let mut profiles: HashMap<String, GradeProfile> = HashMap::new();
        for row in &rows {
            let category: String = row.get("category");
            profiles
                .entry(category.clone())
                .or_insert_with(|| GradeProfile {
                    category,
                    subjects: HashMap::new(),
                })
                .subjects
                .insert(row.get("subject"), row.get("grade"));
        }

        Ok(profiles.into_values().collect())
    }
}
