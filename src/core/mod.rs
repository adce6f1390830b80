// Core algorithm exports
pub mod category;
pub mod filters;
pub mod matcher;
pub mod scoring;
pub mod similarity;
pub mod subjects;
pub mod vectorizer;

pub use category::{aggregate, dominant_category, top_schools};
pub use filters::{filter_candidates, passes_filters, search_programs};
pub use matcher::{Matcher, MatchResult, ScanStats};
pub use scoring::{score_program, SkipReason};
pub use similarity::cosine_similarity;
pub use subjects::{normalize_grades, normalize_subject};
pub use vectorizer::{vectorize, Embedder};
