use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use crate::models::{CatalogSnapshot, GradeProfile, ProgramRecord, RankingTable};

/// Errors that can occur while loading catalog data
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid catalog data: {0}")]
    InvalidData(#[from] serde_json::Error),
}

/// Read-only source of programs, rankings and grade profiles
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn catalog_snapshot(&self) -> Result<Vec<ProgramRecord>, CatalogError>;

    async fn ranking_table(&self) -> Result<RankingTable, CatalogError>;

    async fn grade_profiles(&self) -> Result<Vec<GradeProfile>, CatalogError>;
}

/// Load all three collections into one snapshot
pub async fn load_snapshot(provider: &dyn CatalogProvider) -> Result<CatalogSnapshot, CatalogError> {
    let (programs, rankings, profiles) = futures::try_join!(
        provider.catalog_snapshot(),
        provider.ranking_table(),
        provider.grade_profiles(),
    )?;

    tracing::info!(
        "Loaded catalog snapshot: {} programs, {} ranked categories, {} grade profiles",
        programs.len(),
        rankings.len(),
        profiles.len()
    );

    Ok(CatalogSnapshot::new(programs, rankings, profiles))
}

/// Decode raw program documents, skipping (and counting) those that do
/// not fit the record shape
pub fn decode_programs(documents: Vec<Value>) -> (Vec<ProgramRecord>, usize) {
    let mut skipped = 0;
    let programs = documents
        .into_iter()
        .enumerate()
        .filter_map(|(index, doc)| match serde_json::from_value::<ProgramRecord>(doc) {
            Ok(program) => Some(program),
            Err(e) => {
                tracing::warn!("Skipping undecodable program document #{}: {}", index, e);
                skipped += 1;
                None
            }
        })
        .collect();

    (programs, skipped)
}

/// Catalog file layout used by [`StaticCatalog::from_json_file`]
#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    programs: Vec<Value>,
    #[serde(default)]
    rankings: RankingTable,
    #[serde(default)]
    grade_profiles: Vec<GradeProfile>,
}

/// In-memory catalog, loaded from a JSON file or built directly
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    programs: Vec<ProgramRecord>,
    rankings: RankingTable,
    grade_profiles: Vec<GradeProfile>,
}

impl StaticCatalog {
    pub fn new(programs: Vec<ProgramRecord>, rankings: RankingTable, grade_profiles: Vec<GradeProfile>) -> Self {
        Self {
            programs,
            rankings,
            grade_profiles,
        }
    }

    /// Load a catalog from `{"programs": [...], "rankings": {...}, "grade_profiles": [...]}`
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        let (programs, skipped) = decode_programs(file.programs);
        if skipped > 0 {
            tracing::warn!("Skipped {} program documents while loading catalog file", skipped);
        }

        Ok(Self::new(programs, file.rankings, file.grade_profiles))
    }
}

#[async_trait]
impl CatalogProvider for StaticCatalog {
    async fn catalog_snapshot(&self) -> Result<Vec<ProgramRecord>, CatalogError> {
        Ok(self.programs.clone())
    }

    async fn ranking_table(&self) -> Result<RankingTable, CatalogError> {
        Ok(self.rankings.clone())
    }

    async fn grade_profiles(&self) -> Result<Vec<GradeProfile>, CatalogError> {
        Ok(self.grade_profiles.clone())
    }
}

/// Owns the current catalog snapshot
///
/// The snapshot is loaded lazily, reused for `refresh` and then reloaded on
/// the next request. [`SnapshotStore::invalidate`] forces a reload.
pub struct SnapshotStore {
    provider: Arc<dyn CatalogProvider>,
    cache: moka::future::Cache<(), Arc<CatalogSnapshot>>,
}

impl SnapshotStore {
    pub fn new(provider: Arc<dyn CatalogProvider>, refresh: Duration) -> Self {
        let cache = moka::future::CacheBuilder::new(1)
            .time_to_live(refresh)
            .build();

        Self { provider, cache }
    }

    /// Current snapshot, loading it from the provider when absent or expired
    pub async fn current(&self) -> Result<Arc<CatalogSnapshot>, Arc<CatalogError>> {
        let provider = Arc::clone(&self.provider);
        self.cache
            .try_get_with((), async move { load_snapshot(provider.as_ref()).await.map(Arc::new) })
            .await
    }

    /// Drop the current snapshot so the next call reloads it
    pub async fn invalidate(&self) {
        self.cache.invalidate(&()).await;
        tracing::info!("Catalog snapshot invalidated");
    }
}
