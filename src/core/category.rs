use std::collections::HashMap;
use crate::models::{RankedSchool, RankingTable, ScoredResult};

/// Most frequent non-empty category among the confident matches.
///
/// Ties go to the category encountered first in `confident`.
pub fn dominant_category(confident: &[ScoredResult]) -> Option<String> {
    // category -> (count, first position)
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();

    for (position, result) in confident.iter().enumerate() {
        let Some(category) = result.category.as_deref().filter(|c| !c.trim().is_empty()) else {
            continue;
        };
        counts.entry(category).or_insert((0, position)).0 += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then_with(|| first_b.cmp(first_a))
        })
        .map(|(category, _)| category.to_string())
}

/// First `limit` ranked schools for a category
pub fn top_schools(category: Option<&str>, rankings: &RankingTable, limit: usize) -> Vec<RankedSchool> {
    category
        .and_then(|c| rankings.get(c))
        .map(|ranked| ranked.iter().take(limit).cloned().collect())
        .unwrap_or_default()
}

/// Dominant category of the confident set and its top-ranked schools
pub fn aggregate(
    confident: &[ScoredResult],
    rankings: &RankingTable,
    limit: usize,
) -> (Option<String>, Vec<RankedSchool>) {
    let category = dominant_category(confident);
    let schools = top_schools(category.as_deref(), rankings, limit);
    (category, schools)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_result(category: Option<&str>) -> ScoredResult {
        ScoredResult {
            school: "School".to_string(),
            program: "Program".to_string(),
            description: None,
            interest_similarity: 0.5,
            grade_similarity: 0.0,
            institutional_rating: 0.0,
            final_score: 0.35,
            tuition_per_semester: None,
            tuition_annual: None,
            tuition_notes: None,
            admission_requirements: None,
            grade_requirements: None,
            school_requirements: None,
            school_website: None,
            school_type: None,
            location: None,
            school_logo: None,
            board_passing_rate: None,
            national_passing_rate: None,
            uni_rank: None,
            category: category.map(str::to_string),
        }
    }

    fn create_rankings() -> RankingTable {
        let schools = (1..=7)
            .map(|i| RankedSchool { school: format!("School {}", i), rating: 1.0 - i as f64 * 0.1 })
            .collect();
        RankingTable::from([("IT".to_string(), schools)])
    }

    #[test]
    fn test_most_frequent_category() {
        let confident = vec![
            create_result(Some("Nursing")),
            create_result(Some("IT")),
            create_result(Some("IT")),
            create_result(None),
        ];

        assert_eq!(dominant_category(&confident).as_deref(), Some("IT"));
    }

    #[test]
    fn test_tie_goes_to_first_encountered() {
        let confident = vec![
            create_result(Some("Nursing")),
            create_result(Some("IT")),
            create_result(Some("IT")),
            create_result(Some("Nursing")),
        ];

        assert_eq!(dominant_category(&confident).as_deref(), Some("Nursing"));
    }

    #[test]
    fn test_empty_and_blank_categories() {
        assert_eq!(dominant_category(&[]), None);
        assert_eq!(dominant_category(&[create_result(Some("  ")), create_result(None)]), None);
    }

    #[test]
    fn test_top_schools_limited_to_five() {
        let rankings = create_rankings();
        let confident = vec![create_result(Some("IT"))];

        let (category, schools) = aggregate(&confident, &rankings, 5);
        assert_eq!(category.as_deref(), Some("IT"));
        assert_eq!(schools.len(), 5);
        assert_eq!(schools[0].school, "School 1");
    }

    #[test]
    fn test_top_schools_without_ranking_data() {
        let rankings = create_rankings();
        assert!(top_schools(Some("Law"), &rankings, 5).is_empty());
        assert!(top_schools(None, &rankings, 5).is_empty());
    }
}
