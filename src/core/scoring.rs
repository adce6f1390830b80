use std::collections::BTreeMap;
use thiserror::Error;
use crate::core::similarity::{cosine_similarity, cosine_similarity_f64};
use crate::models::{CatalogSnapshot, GradeProfile, ProgramRecord, RankingTable, ScoredResult, ScoringWeights};

/// Why a catalog record could not be scored
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkipReason {
    #[error("embedding vector missing or unreadable")]
    MissingVector,

    #[error("embedding has {actual} components, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding contains a non-finite component")]
    NonFiniteComponent,
}

/// Score a single candidate against the query
///
/// Scoring formula:
/// final_score = (
///     interest_similarity * 0.7 +     # cosine(program vector, query vector)
///     grade_similarity * 0.3 +        # cosine over shared normalized subjects
///     institutional_rating * 0.3      # rating in the program's own category
/// )
///
/// `user_grades` must already be normalized with
/// [`normalize_grades`](crate::core::subjects::normalize_grades).
pub fn score_program(
    program: &ProgramRecord,
    query: &[f32],
    user_grades: Option<&BTreeMap<String, f64>>,
    snapshot: &CatalogSnapshot,
    weights: &ScoringWeights,
) -> Result<ScoredResult, SkipReason> {
    let vector = program.vector.as_deref().ok_or(SkipReason::MissingVector)?;
    if vector.len() != query.len() {
        return Err(SkipReason::DimensionMismatch {
            expected: query.len(),
            actual: vector.len(),
        });
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(SkipReason::NonFiniteComponent);
    }

    let interest_similarity = cosine_similarity(vector, query);

    let grade_similarity = match (user_grades, program.category_label()) {
        (Some(grades), Some(category)) => snapshot
            .grade_profiles
            .get(category)
            .map(|profile| grade_similarity(grades, profile))
            .unwrap_or(0.0),
        _ => 0.0,
    };

    let institutional_rating = program
        .category_label()
        .map(|category| institutional_rating(&program.school, category, &snapshot.rankings))
        .unwrap_or(0.0);

    let final_score = interest_similarity * weights.interest
        + grade_similarity * weights.grade
        + institutional_rating * weights.rating;

    Ok(ScoredResult {
        school: program.school.clone(),
        program: program.name.clone(),
        description: program.description.clone(),
        interest_similarity,
        grade_similarity,
        institutional_rating,
        final_score,
        tuition_per_semester: program.tuition_per_semester.clone(),
        tuition_annual: program.tuition_annual.clone(),
        tuition_notes: program.tuition_notes.clone(),
        admission_requirements: program.admission_requirements.clone(),
        grade_requirements: program.grade_requirements.clone(),
        school_requirements: program.school_requirements.clone(),
        school_website: program.school_website.clone(),
        school_type: program.school_type.clone(),
        location: program.location.clone(),
        school_logo: program.school_logo.clone(),
        board_passing_rate: program.board_passing_rate.clone(),
        national_passing_rate: program.national_passing_rate.clone(),
        uni_rank: program.uni_rank.clone(),
        category: program.category.clone(),
    })
}

/// Cosine similarity between user grades and a category's reference grades,
/// restricted to the subjects both sides have.
///
/// Both sides must already be normalized; [`CatalogSnapshot::new`] does this
/// for profiles. Returns 0.0 when no subject overlaps.
pub fn grade_similarity(user_grades: &BTreeMap<String, f64>, profile: &GradeProfile) -> f64 {
    let (user, expected): (Vec<f64>, Vec<f64>) = user_grades
        .iter()
        .filter_map(|(subject, grade)| profile.subjects.get(subject).map(|expected| (*grade, *expected)))
        .unzip();

    if user.is_empty() {
        return 0.0;
    }

    cosine_similarity_f64(&user, &expected)
}

/// Rating of a school within a category's ranked list.
///
/// Matches when the school name appears (case-insensitive) inside a ranked
/// entry's name; the first match wins. Missing entries rate 0.0.
pub fn institutional_rating(school: &str, category: &str, rankings: &RankingTable) -> f64 {
    let needle = school.trim().to_lowercase();
    if needle.is_empty() {
        return 0.0;
    }

    rankings
        .get(category)
        .and_then(|ranked| {
            ranked
                .iter()
                .find(|entry| entry.school.to_lowercase().contains(&needle))
        })
        .map(|entry| entry.rating)
        .unwrap_or(0.0)
}
