// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{AnswerSet, CatalogSnapshot, CustomAnswers, Facet, Filters, GradeProfile, GradeSet, MatchPolicy, ProgramRecord, RankedSchool, RankingTable, ScoredResult, ScoringWeights};
pub use requests::{ProgramSearchQuery, RecommendRequest};
pub use responses::{MatchResponse, HistoryEntry, HealthResponse, ErrorResponse};
