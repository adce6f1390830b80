use serde::{Deserialize, Serialize};
use crate::models::domain::{RankedSchool, ScoredResult};

pub const NO_INPUT_MESSAGE: &str = "No valid input provided. Please answer at least one question.";
pub const NO_STRONG_MATCH_MESSAGE: &str = "We couldn't find a strong match for your interest, so here are a few programs you might explore or Click Try Again!";

/// Recommendation outcome, tagged by `type` on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MatchResponse {
    Exact {
        results: Vec<ScoredResult>,
        weak_matches: Vec<ScoredResult>,
        matched_category: Option<String>,
        top_schools_for_category: Vec<RankedSchool>,
    },
    Fallback {
        message: String,
        results: Vec<ScoredResult>,
        weak_matches: Vec<ScoredResult>,
        matched_category: Option<String>,
        top_schools_for_category: Vec<RankedSchool>,
    },
}

impl MatchResponse {
    /// Fallback returned when no facet produced a usable vector
    pub fn no_input() -> Self {
        MatchResponse::Fallback {
            message: NO_INPUT_MESSAGE.to_string(),
            results: vec![],
            weak_matches: vec![],
            matched_category: None,
            top_schools_for_category: vec![],
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MatchResponse::Exact { .. } => "exact",
            MatchResponse::Fallback { .. } => "fallback",
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, MatchResponse::Exact { .. })
    }

    pub fn results(&self) -> &[ScoredResult] {
        match self {
            MatchResponse::Exact { results, .. } | MatchResponse::Fallback { results, .. } => results,
        }
    }

    pub fn weak_matches(&self) -> &[ScoredResult] {
        match self {
            MatchResponse::Exact { weak_matches, .. }
            | MatchResponse::Fallback { weak_matches, .. } => weak_matches,
        }
    }

    pub fn matched_category(&self) -> Option<&str> {
        match self {
            MatchResponse::Exact { matched_category, .. }
            | MatchResponse::Fallback { matched_category, .. } => matched_category.as_deref(),
        }
    }

    pub fn top_schools(&self) -> &[RankedSchool] {
        match self {
            MatchResponse::Exact { top_schools_for_category, .. }
            | MatchResponse::Fallback { top_schools_for_category, .. } => top_schools_for_category,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            MatchResponse::Exact { .. } => None,
            MatchResponse::Fallback { message, .. } => Some(message),
        }
    }
}

/// Stored recommendation, newest first in history listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: uuid::Uuid,
    pub user_id: String,
    pub request: serde_json::Value,
    pub result_type: String,
    pub response: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub catalog_size: usize,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
