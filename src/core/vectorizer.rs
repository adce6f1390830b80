use async_trait::async_trait;
use futures::future::join_all;
use crate::core::similarity::{mean_vector, norm};
use crate::models::{AnswerSet, Facet};
use crate::services::embedding::EmbeddingError;

/// Text-to-vector capability.
///
/// Implementations must be deterministic for identical input and always
/// return vectors of `dimension()` components.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Turn the questionnaire answers into one query vector
///
/// Each non-blank facet is embedded independently (concurrently) and the
/// non-zero vectors are averaged with equal weight. A vector of the wrong
/// length or with a non-finite component counts as a failed facet.
///
/// # Returns
/// - `Ok(Some(vector))` when at least one facet produced a non-zero vector
/// - `Ok(None)` when no facet had text, or every vector was zero
/// - `Err(_)` when facets had text but every embedding call failed
pub async fn vectorize(
    embedder: &dyn Embedder,
    answers: &AnswerSet,
) -> Result<Option<Vec<f32>>, EmbeddingError> {
    let facets: Vec<(Facet, String)> = Facet::ALL
        .iter()
        .filter_map(|facet| answers.facet_text(*facet).map(|text| (*facet, text)))
        .collect();

    if facets.is_empty() {
        return Ok(None);
    }

    let dimension = embedder.dimension();
    let embeddings = join_all(facets.iter().map(|(_, text)| embedder.embed(text))).await;

    let mut vectors = Vec::with_capacity(facets.len());
    let mut failures = 0;
    let mut last_error = None;

    for ((facet, _), embedding) in facets.iter().zip(embeddings) {
        let vector = embedding.and_then(|v| {
            if v.len() != dimension {
                Err(EmbeddingError::DimensionMismatch { expected: dimension, actual: v.len() })
            } else if v.iter().any(|x| !x.is_finite()) {
                Err(EmbeddingError::InvalidResponse("embedding has non-finite components".to_string()))
            } else {
                Ok(v)
            }
        });

        match vector {
            Ok(v) if norm(&v) > 0.0 => vectors.push(v),
            Ok(_) => tracing::debug!("Facet {} produced a zero vector", facet.as_str()),
            Err(e) => {
                tracing::warn!("Embedding failed for facet {}, ignoring it: {}", facet.as_str(), e);
                failures += 1;
                last_error = Some(e);
            }
        }
    }

    if vectors.is_empty() {
        return match last_error {
            Some(e) if failures == facets.len() => Err(e),
            _ => Ok(None),
        };
    }

    Ok(mean_vector(&vectors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use crate::models::CustomAnswers;

    struct FixtureEmbedder {
        vectors: HashMap<String, Vec<f32>>,
        dimension: usize,
    }

    #[async_trait]
    impl Embedder for FixtureEmbedder {
        fn dimension(&self) -> usize {
            self.dimension
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.vectors
                .get(text)
                .cloned()
                .ok_or_else(|| EmbeddingError::ApiError(format!("no fixture for {}", text)))
        }
    }

    fn create_embedder(entries: &[(&str, Vec<f32>)]) -> FixtureEmbedder {
        FixtureEmbedder {
            vectors: entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            dimension: 2,
        }
    }

    #[tokio::test]
    async fn test_blank_answers_yield_none() {
        let embedder = create_embedder(&[]);
        let answers = AnswerSet {
            custom: CustomAnswers { goals: Some("   ".to_string()), ..Default::default() },
            ..Default::default()
        };

        assert_eq!(vectorize(&embedder, &answers).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_facets_averaged_equally() {
        let embedder = create_embedder(&[
            ("algorithms", vec![1.0, 0.0]),
            ("build games", vec![0.0, 1.0]),
        ]);
        let answers = AnswerSet {
            academics: vec!["algorithms".to_string()],
            goals: vec!["build".to_string()],
            custom: CustomAnswers { goals: Some("games".to_string()), ..Default::default() },
            ..Default::default()
        };

        assert_eq!(vectorize(&embedder, &answers).await.unwrap(), Some(vec![0.5, 0.5]));
    }

    #[tokio::test]
    async fn test_zero_vectors_excluded_from_mean() {
        let embedder = create_embedder(&[
            ("algorithms", vec![2.0, 0.0]),
            ("quiet", vec![0.0, 0.0]),
        ]);
        let answers = AnswerSet {
            academics: vec!["algorithms".to_string()],
            environment: vec!["quiet".to_string()],
            ..Default::default()
        };

        assert_eq!(vectorize(&embedder, &answers).await.unwrap(), Some(vec![2.0, 0.0]));
    }

    #[tokio::test]
    async fn test_failed_facet_degrades() {
        let embedder = create_embedder(&[
            ("algorithms", vec![1.0, 1.0]),
            ("wrong dim", vec![1.0, 2.0, 3.0]),
        ]);
        let answers = AnswerSet {
            academics: vec!["algorithms".to_string()],
            fields: vec!["unknown text".to_string()],
            activities: vec!["wrong dim".to_string()],
            ..Default::default()
        };

        assert_eq!(vectorize(&embedder, &answers).await.unwrap(), Some(vec![1.0, 1.0]));
    }

    #[tokio::test]
    async fn test_non_finite_facet_is_dropped() {
        let embedder = create_embedder(&[
            ("algorithms", vec![1.0, 0.0]),
            ("robotics", vec![f32::INFINITY, 0.0]),
            ("quiet", vec![f32::NAN, 1.0]),
        ]);
        let answers = AnswerSet {
            academics: vec!["algorithms".to_string()],
            fields: vec!["robotics".to_string()],
            environment: vec!["quiet".to_string()],
            ..Default::default()
        };

        assert_eq!(vectorize(&embedder, &answers).await.unwrap(), Some(vec![1.0, 0.0]));
    }

    #[tokio::test]
    async fn test_only_non_finite_facets_is_an_error() {
        let embedder = create_embedder(&[("robotics", vec![f32::INFINITY, 0.0])]);
        let answers = AnswerSet {
            fields: vec!["robotics".to_string()],
            ..Default::default()
        };

        assert!(matches!(
            vectorize(&embedder, &answers).await,
            Err(EmbeddingError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_all_facets_failing_is_an_error() {
        let embedder = create_embedder(&[]);
        let answers = AnswerSet {
            academics: vec!["algorithms".to_string()],
            ..Default::default()
        };

        assert!(vectorize(&embedder, &answers).await.is_err());
    }
}
