use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::models::domain::{default_school_type, AnswerSet, Filters, GradeSet};

/// Request to recommend programs
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecommendRequest {
    #[serde(default)]
    pub answers: AnswerSet,
    #[serde(default)]
    pub grades: Option<GradeSet>,
    #[validate(length(max = 50))]
    #[serde(default = "default_school_type")]
    pub school_type: String,
    #[validate(length(max = 20))]
    #[serde(default)]
    pub locations: Option<Vec<String>>,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub max_budget: Option<f64>,
    /// Caller identity supplied by the gateway; enables history persistence
    #[validate(length(min = 1, max = 255))]
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,
}

impl RecommendRequest {
    pub fn filters(&self) -> Filters {
        Filters {
            school_type: self.school_type.clone(),
            locations: self.locations.clone().unwrap_or_default(),
            max_budget: self.max_budget,
        }
    }
}

/// Catalog search terms; every present term must match (case-insensitive substring)
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProgramSearchQuery {
    #[validate(length(max = 100))]
    #[serde(default)]
    pub name: Option<String>,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub location: Option<String>,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub category: Option<String>,
}
