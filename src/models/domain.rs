use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use crate::core::subjects::normalize_grades;

/// The closed set of questionnaire facets that feed the query vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facet {
    Academics,
    Fields,
    Activities,
    Goals,
    Environment,
}

impl Facet {
    pub const ALL: [Facet; 5] = [
        Facet::Academics,
        Facet::Fields,
        Facet::Activities,
        Facet::Goals,
        Facet::Environment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Facet::Academics => "academics",
            Facet::Fields => "fields",
            Facet::Activities => "activities",
            Facet::Goals => "goals",
            Facet::Environment => "environment",
        }
    }
}

/// Free-text "other" entry per facet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomAnswers {
    #[serde(default)]
    pub academics: Option<String>,
    #[serde(default)]
    pub fields: Option<String>,
    #[serde(default)]
    pub activities: Option<String>,
    #[serde(default)]
    pub goals: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
}

/// User questionnaire answers.
///
/// Unknown keys in the incoming document are ignored rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerSet {
    #[serde(default)]
    pub academics: Vec<String>,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub activities: Vec<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub environment: Vec<String>,
    #[serde(default)]
    pub custom: CustomAnswers,
}

impl AnswerSet {
    pub fn tags(&self, facet: Facet) -> &[String] {
        match facet {
            Facet::Academics => &self.academics,
            Facet::Fields => &self.fields,
            Facet::Activities => &self.activities,
            Facet::Goals => &self.goals,
            Facet::Environment => &self.environment,
        }
    }

    pub fn custom(&self, facet: Facet) -> Option<&str> {
        let custom = match facet {
            Facet::Academics => &self.custom.academics,
            Facet::Fields => &self.custom.fields,
            Facet::Activities => &self.custom.activities,
            Facet::Goals => &self.custom.goals,
            Facet::Environment => &self.custom.environment,
        };
        custom.as_deref()
    }

    /// Tags plus the custom entry (when non-blank), space-joined.
    /// Returns `None` when the result is blank.
    pub fn facet_text(&self, facet: Facet) -> Option<String> {
        let mut parts: Vec<&str> = self.tags(facet).iter().map(String::as_str).collect();
        if let Some(custom) = self.custom(facet) {
            if !custom.trim().is_empty() {
                parts.push(custom);
            }
        }

        let text = parts.join(" ");
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn is_blank(&self) -> bool {
        Facet::ALL.iter().all(|f| self.facet_text(*f).is_none())
    }
}

/// Raw subject name to numeric grade, as entered by the user
pub type GradeSet = HashMap<String, f64>;

/// Hard constraints applied before scoring. All filters are conjunctive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    #[serde(default = "default_school_type")]
    pub school_type: String,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub max_budget: Option<f64>,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            school_type: default_school_type(),
            locations: vec![],
            max_budget: None,
        }
    }
}

pub fn default_school_type() -> String {
    "any".to_string()
}

/// One candidate program from the catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramRecord {
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Precomputed embedding. Unreadable values decode as `None`; never
    /// sent back to clients.
    #[serde(default, deserialize_with = "lenient_vector", skip_serializing)]
    pub vector: Option<Vec<f32>>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub school_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tuition_per_semester: Option<Value>,
    #[serde(default)]
    pub tuition_annual: Option<Value>,
    #[serde(default)]
    pub tuition_notes: Option<Value>,
    #[serde(default)]
    pub admission_requirements: Option<Value>,
    #[serde(default)]
    pub grade_requirements: Option<Value>,
    #[serde(default)]
    pub school_requirements: Option<Value>,
    #[serde(default)]
    pub school_website: Option<Value>,
    #[serde(default)]
    pub school_logo: Option<Value>,
    #[serde(default)]
    pub board_passing_rate: Option<Value>,
    #[serde(default)]
    pub national_passing_rate: Option<Value>,
    #[serde(default)]
    pub uni_rank: Option<Value>,
}

impl ProgramRecord {
    /// Tuition per semester, only when it is stored as a number
    pub fn tuition_amount(&self) -> Option<f64> {
        self.tuition_per_semester.as_ref().and_then(Value::as_f64)
    }

    /// Non-empty category label
    pub fn category_label(&self) -> Option<&str> {
        self.category.as_deref().filter(|c| !c.trim().is_empty())
    }
}

fn lenient_vector<'de, D>(deserializer: D) -> Result<Option<Vec<f32>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(items)) = value else {
        return Ok(None);
    };

    let parsed: Option<Vec<f32>> = items
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect();
    Ok(parsed)
}

/// Reference grades for one category, keyed by subject name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradeProfile {
    pub category: String,
    pub subjects: HashMap<String, f64>,
}

impl GradeProfile {
    /// Same profile with subject names canonicalized
    pub fn normalized(self) -> Self {
        let subjects = normalize_grades(&self.subjects).into_iter().collect();
        Self {
            category: self.category,
            subjects,
        }
    }
}

/// A (school, rating) entry in a category's ranked list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSchool {
    pub school: String,
    pub rating: f64,
}

/// Per-category ordered list of ranked schools
pub type RankingTable = HashMap<String, Vec<RankedSchool>>;

/// Read-only view of the catalog used for one or more scoring passes.
///
/// Grade profile subjects are normalized once, on construction.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub programs: Vec<ProgramRecord>,
    pub rankings: RankingTable,
    pub grade_profiles: HashMap<String, GradeProfile>,
    pub loaded_at: chrono::DateTime<chrono::Utc>,
}

impl CatalogSnapshot {
    pub fn new(
        programs: Vec<ProgramRecord>,
        rankings: RankingTable,
        grade_profiles: Vec<GradeProfile>,
    ) -> Self {
        let grade_profiles = grade_profiles
            .into_iter()
            .map(|profile| (profile.category.clone(), profile.normalized()))
            .collect();

        Self {
            programs,
            rankings,
            grade_profiles,
            loaded_at: chrono::Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![], RankingTable::new(), vec![])
    }
}

/// Scoring output for one candidate. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub school: String,
    pub program: String,
    pub description: Option<String>,
    #[serde(rename = "similarity_score")]
    pub interest_similarity: f64,
    pub grade_similarity: f64,
    #[serde(rename = "school_rank")]
    pub institutional_rating: f64,
    pub final_score: f64,
    pub tuition_per_semester: Option<Value>,
    pub tuition_annual: Option<Value>,
    pub tuition_notes: Option<Value>,
    pub admission_requirements: Option<Value>,
    pub grade_requirements: Option<Value>,
    pub school_requirements: Option<Value>,
    pub school_website: Option<Value>,
    pub school_type: Option<String>,
    pub location: Option<String>,
    pub school_logo: Option<Value>,
    pub board_passing_rate: Option<Value>,
    pub national_passing_rate: Option<Value>,
    pub uni_rank: Option<Value>,
    pub category: Option<String>,
}

/// Scoring weights for the final score fusion.
///
/// These do not sum to 1: grade fit and institutional rating are two
/// independent boosts on top of interest similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub interest: f64,
    pub grade: f64,
    pub rating: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            interest: 0.7,
            grade: 0.3,
            rating: 0.3,
        }
    }
}

/// Partitioning and truncation rules for the final response
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPolicy {
    /// Interest similarity at or above which a result is a confident match
    pub threshold: f64,
    /// Length of both lists in an exact response
    pub exact_limit: usize,
    /// Length of both lists in a fallback response
    pub fallback_limit: usize,
    /// Number of ranked schools shown for the dominant category
    pub top_schools: usize,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            threshold: 0.4,
            exact_limit: 10,
            fallback_limit: 6,
            top_schools: 5,
        }
    }
}
