//! Program Match - academic program recommendation service
//!
//! Turns a student's questionnaire answers, grades and constraints into a
//! ranked list of degree programs, with a graceful fallback when nothing
//! matches strongly.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{Matcher, MatchResult, ScanStats, Embedder, cosine_similarity, normalize_subject};
pub use models::{AnswerSet, CatalogSnapshot, Filters, MatchResponse, ProgramRecord, RecommendRequest, ScoredResult, ScoringWeights};
