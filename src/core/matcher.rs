use rayon::prelude::*;
use serde::Serialize;
use crate::models::{AnswerSet, CatalogSnapshot, Filters, GradeSet, MatchPolicy, MatchResponse, RankingTable, ScoredResult, ScoringWeights};
use crate::models::responses::NO_STRONG_MATCH_MESSAGE;
use crate::core::{
    category::aggregate,
    filters::filter_candidates,
    scoring::score_program,
    subjects::normalize_grades,
    vectorizer::{vectorize, Embedder},
};
use crate::services::embedding::EmbeddingError;

/// Counters for one scan over the catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub catalog_size: usize,
    pub filtered_out: usize,
    pub scored: usize,
    /// Records skipped because their embedding was missing or malformed
    pub skipped: usize,
}

/// Result of the matching process
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub response: MatchResponse,
    pub stats: ScanStats,
}

/// Main matching orchestrator
///
/// # Pipeline Stages
/// 1. Vectorize the answers into a query vector
/// 2. Hard filtering (school type, location, budget)
/// 3. Scoring (interest, grade fit, institutional rating)
/// 4. Confident/weak partition, category detection, ranking and fallback
#[derive(Debug, Clone)]
pub struct Matcher {
    weights: ScoringWeights,
    policy: MatchPolicy,
}

impl Matcher {
    pub fn new(weights: ScoringWeights, policy: MatchPolicy) -> Self {
        Self { weights, policy }
    }

    pub fn with_defaults() -> Self {
        Self::new(ScoringWeights::default(), MatchPolicy::default())
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    /// Recommend programs for a set of answers
    ///
    /// # Arguments
    /// * `embedder` - Text embedding capability
    /// * `snapshot` - Read-only catalog, rankings and grade profiles
    /// * `answers` - Questionnaire answers
    /// * `grades` - Optional user grades by raw subject name
    /// * `filters` - Hard constraints
    ///
    /// # Returns
    /// The response plus scan counters. When no facet yields a vector, a
    /// "no input" fallback is returned without filtering or scoring.
    /// Fails only when the embedding collaborator fails for every facet.
    pub async fn recommend(
        &self,
        embedder: &dyn Embedder,
        snapshot: &CatalogSnapshot,
        answers: &AnswerSet,
        grades: Option<&GradeSet>,
        filters: &Filters,
    ) -> Result<MatchResult, EmbeddingError> {
        match vectorize(embedder, answers).await? {
            Some(query) => Ok(self.match_query(&query, grades, filters, snapshot)),
            None => Ok(self.no_input(snapshot)),
        }
    }

    /// Result for answers that produced no query vector
    pub fn no_input(&self, snapshot: &CatalogSnapshot) -> MatchResult {
        tracing::debug!("No usable answer text, returning no-input fallback");
        MatchResult {
            response: MatchResponse::no_input(),
            stats: ScanStats {
                catalog_size: snapshot.programs.len(),
                ..Default::default()
            },
        }
    }

    /// Filter, score and rank the catalog against an existing query vector
    pub fn match_query(
        &self,
        query: &[f32],
        grades: Option<&GradeSet>,
        filters: &Filters,
        snapshot: &CatalogSnapshot,
    ) -> MatchResult {
        let (results, stats) = self.score_candidates(query, grades, filters, snapshot);

        tracing::debug!(
            "Scanned {} programs: {} filtered out, {} scored, {} skipped",
            stats.catalog_size,
            stats.filtered_out,
            stats.scored,
            stats.skipped
        );

        MatchResult {
            response: self.rank(results, &snapshot.rankings),
            stats,
        }
    }

    /// Stages 2 and 3: filter the catalog and score the survivors.
    ///
    /// Output keeps catalog order. Malformed records are logged, counted
    /// and left out.
    pub fn score_candidates(
        &self,
        query: &[f32],
        grades: Option<&GradeSet>,
        filters: &Filters,
        snapshot: &CatalogSnapshot,
    ) -> (Vec<ScoredResult>, ScanStats) {
        let user_grades = grades.map(|g| normalize_grades(g));
        let candidates = filter_candidates(&snapshot.programs, filters);

        let mut stats = ScanStats {
            catalog_size: snapshot.programs.len(),
            filtered_out: snapshot.programs.len() - candidates.len(),
            ..Default::default()
        };

        let outcomes: Vec<_> = candidates
            .par_iter()
            .map(|program| {
                let outcome = score_program(program, query, user_grades.as_ref(), snapshot, &self.weights);
                (*program, outcome)
            })
            .collect();

        let mut results = Vec::with_capacity(outcomes.len());
        for (program, outcome) in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(reason) => {
                    tracing::warn!(
                        "Skipping program {} at {}: {}",
                        program.name,
                        program.school,
                        reason
                    );
                    stats.skipped += 1;
                }
            }
        }
        stats.scored = results.len();

        (results, stats)
    }

    /// Stage 4: partition, aggregate and assemble the response
    ///
    /// Results with interest similarity at or above the threshold are
    /// confident, the rest weak. The dominant category is computed over the
    /// confident set in scan order, before sorting. Both sets are then sorted
    /// by final score, descending, keeping scan order for ties.
    pub fn rank(&self, results: Vec<ScoredResult>, rankings: &RankingTable) -> MatchResponse {
        let (mut confident, mut weak): (Vec<_>, Vec<_>) = results
            .into_iter()
            .partition(|r| r.interest_similarity >= self.policy.threshold);

        let (matched_category, top_schools_for_category) =
            aggregate(&confident, rankings, self.policy.top_schools);

        sort_by_final_score(&mut confident);
        sort_by_final_score(&mut weak);

        if confident.is_empty() {
            let limit = self.policy.fallback_limit;
            let fallback_weak: Vec<_> = weak.iter().skip(limit).take(limit).cloned().collect();
            weak.truncate(limit);

            return MatchResponse::Fallback {
                message: NO_STRONG_MATCH_MESSAGE.to_string(),
                results: weak,
                weak_matches: fallback_weak,
                matched_category,
                top_schools_for_category,
            };
        }

        confident.truncate(self.policy.exact_limit);
        weak.truncate(self.policy.exact_limit);

        MatchResponse::Exact {
            results: confident,
            weak_matches: weak,
            matched_category,
            top_schools_for_category,
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Stable sort, highest final score first
fn sort_by_final_score(results: &mut [ScoredResult]) {
    results.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
}
