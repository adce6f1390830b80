use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;
use crate::core::{filters::search_programs, vectorizer::{vectorize, Embedder}, Matcher};
use crate::models::{ErrorResponse, HealthResponse, ProgramSearchQuery, RecommendRequest};
use crate::services::{PostgresClient, SnapshotStore};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub embedder: Arc<dyn Embedder>,
    pub catalog: Arc<SnapshotStore>,
    /// Absent when the catalog comes from a file; history is then disabled
    pub postgres: Option<Arc<PostgresClient>>,
    pub matcher: Matcher,
}

/// Configure all recommendation routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/recommend", web::post().to(recommend))
        .route("/recommendations/history", web::get().to(get_history))
        .route("/recommendations/history", web::delete().to(clear_history))
        .route("/school-rankings", web::get().to(get_school_rankings))
        .route("/programs/search", web::get().to(search_catalog))
        .route("/catalog/refresh", web::post().to(refresh_catalog));
}

fn error_response(status: actix_web::http::StatusCode, error: &str, message: String) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: status.as_u16(),
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let catalog_size = match state.catalog.current().await {
        Ok(snapshot) => Some(snapshot.programs.len()),
        Err(e) => {
            tracing::warn!("Catalog unavailable during health check: {}", e);
            None
        }
    };

    let pg_healthy = match &state.postgres {
        Some(pg) => pg.health_check().await.unwrap_or(false),
        None => true,
    };

    let status = if catalog_size.is_some() && pg_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        catalog_size: catalog_size.unwrap_or(0),
        timestamp: chrono::Utc::now(),
    })
}

/// Recommend programs
///
/// POST /api/v1/recommend
///
/// Request body:
/// ```json
/// {
///   "answers": {"academics": ["algorithms"], "custom": {"goals": "build games"}},
///   "grades": {"General Mathematics": 95},
///   "school_type": "any",
///   "locations": ["Manila"],
///   "max_budget": 50000,
///   "user_id": "string"
/// }
/// ```
async fn recommend(
    state: web::Data<AppState>,
    req: web::Json<RecommendRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for recommend request: {:?}", errors);
        return error_response(
            actix_web::http::StatusCode::BAD_REQUEST,
            "Validation failed",
            errors.to_string(),
        );
    }

    let snapshot = match state.catalog.current().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::error!("Failed to load catalog snapshot: {}", e);
            return error_response(
                actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
                "Catalog unavailable",
                e.to_string(),
            );
        }
    };

    let query = match vectorize(state.embedder.as_ref(), &req.answers).await {
        Ok(query) => query,
        Err(e) => {
            tracing::error!("Embedding service failed: {}", e);
            return error_response(
                actix_web::http::StatusCode::BAD_GATEWAY,
                "Embedding service failed",
                e.to_string(),
            );
        }
    };

    let result = match query {
        None => state.matcher.no_input(&snapshot),
        Some(query) => {
            let matcher = state.matcher.clone();
            let grades = req.grades.clone();
            let filters = req.filters();
            let snapshot = Arc::clone(&snapshot);

            // The scan is CPU-bound; keep it off the worker thread
            let scan = web::block(move || matcher.match_query(&query, grades.as_ref(), &filters, &snapshot));
            match scan.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!("Catalog scan failed: {}", e);
                    return error_response(
                        actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                        "Catalog scan failed",
                        e.to_string(),
                    );
                }
            }
        }
    };

    tracing::info!(
        "Returning {} response: {} results, {} weak matches, category {:?} (scanned {}, skipped {})",
        result.response.kind(),
        result.response.results().len(),
        result.response.weak_matches().len(),
        result.response.matched_category(),
        result.stats.catalog_size,
        result.stats.skipped
    );

    // History is best-effort
    if let (Some(user_id), Some(pg)) = (&req.user_id, &state.postgres) {
        if let Err(e) = pg.record_recommendation(user_id, &req, &result.response).await {
            tracing::warn!("Failed to record recommendation history for {}: {}", user_id, e);
        }
    }

    HttpResponse::Ok().json(result.response)
}

/// Recommendation history for a user
///
/// GET /api/v1/recommendations/history?userId={userId}&limit={limit}
async fn get_history(
    state: web::Data<AppState>,
    query: web::Query<std::collections::HashMap<String, String>>,
) -> impl Responder {
    let Some(user_id) = query.get("userId") else {
        return error_response(
            actix_web::http::StatusCode::BAD_REQUEST,
            "Missing userId parameter",
            "userId query parameter is required".to_string(),
        );
    };

    let Some(pg) = &state.postgres else {
        return error_response(
            actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
            "History unavailable",
            "recommendation history requires the PostgreSQL catalog".to_string(),
        );
    };

    let limit = query
        .get("limit")
        .and_then(|l| l.parse::<i64>().ok())
        .unwrap_or(20)
        .clamp(1, 100);

    match pg.get_history(user_id, limit).await {
        Ok(entries) => HttpResponse::Ok().json(entries),
        Err(e) => {
            tracing::error!("Failed to fetch history for {}: {}", user_id, e);
            error_response(
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch history",
                e.to_string(),
            )
        }
    }
}

/// Delete a user's stored recommendations
///
/// DELETE /api/v1/recommendations/history?userId={userId}
async fn clear_history(
    state: web::Data<AppState>,
    query: web::Query<std::collections::HashMap<String, String>>,
) -> impl Responder {
    let Some(user_id) = query.get("userId") else {
        return error_response(
            actix_web::http::StatusCode::BAD_REQUEST,
            "Missing userId parameter",
            "userId query parameter is required".to_string(),
        );
    };

    let Some(pg) = &state.postgres else {
        return error_response(
            actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
            "History unavailable",
            "recommendation history requires the PostgreSQL catalog".to_string(),
        );
    };

    match pg.clear_history(user_id).await {
        Ok(deleted) => {
            tracing::info!("Cleared {} recommendations for {}", deleted, user_id);
            HttpResponse::Ok().json(serde_json::json!({
                "message": "Results cleared",
                "deleted": deleted,
            }))
        }
        Err(e) => {
            tracing::error!("Failed to clear history for {}: {}", user_id, e);
            error_response(
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to clear history",
                e.to_string(),
            )
        }
    }
}

/// Ranked schools per category
///
/// GET /api/v1/school-rankings
async fn get_school_rankings(state: web::Data<AppState>) -> impl Responder {
    match state.catalog.current().await {
        Ok(snapshot) => HttpResponse::Ok().json(&snapshot.rankings),
        Err(e) => {
            tracing::error!("Failed to load catalog snapshot: {}", e);
            error_response(
                actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
                "Catalog unavailable",
                e.to_string(),
            )
        }
    }
}

/// Search programs by name, location or category
///
/// GET /api/v1/programs/search?name={name}&location={location}&category={category}
async fn search_catalog(
    state: web::Data<AppState>,
    query: web::Query<ProgramSearchQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return error_response(
            actix_web::http::StatusCode::BAD_REQUEST,
            "Validation failed",
            errors.to_string(),
        );
    }

    let snapshot = match state.catalog.current().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::error!("Failed to load catalog snapshot: {}", e);
            return error_response(
                actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
                "Catalog unavailable",
                e.to_string(),
            );
        }
    };

    let programs = search_programs(&snapshot.programs, &query);
    tracing::debug!("Program search matched {} of {}", programs.len(), snapshot.programs.len());

    HttpResponse::Ok().json(programs)
}

/// Drop the cached catalog snapshot so the next request reloads it
///
/// POST /api/v1/catalog/refresh
async fn refresh_catalog(state: web::Data<AppState>) -> impl Responder {
    state.catalog.invalidate().await;
    HttpResponse::Accepted().json(serde_json::json!({ "status": "invalidated" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use async_trait::async_trait;
    use std::time::Duration;
    use crate::models::{ProgramRecord, RankedSchool, RankingTable};
    use crate::services::embedding::EmbeddingError;
    use crate::services::StaticCatalog;

    struct ConstantEmbedder;

    #[async_trait]
    impl Embedder for ConstantEmbedder {
        fn dimension(&self) -> usize {
            2
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![1.0, 0.0])
        }
    }

    fn create_state() -> AppState {
        let catalog = StaticCatalog::new(
            vec![
                ProgramRecord {
                    school: "Mapua University".to_string(),
                    name: "BS Computer Science".to_string(),
                    vector: Some(vec![1.0, 0.0]),
                    category: Some("IT".to_string()),
                    location: Some("Intramuros, Manila".to_string()),
                    ..Default::default()
                },
                ProgramRecord {
                    school: "Cebu Doctors' University".to_string(),
                    name: "BS Nursing".to_string(),
                    vector: Some(vec![0.0, 1.0]),
                    category: Some("Nursing".to_string()),
                    location: Some("Mandaue, Cebu".to_string()),
                    ..Default::default()
                },
            ],
            RankingTable::from([(
                "IT".to_string(),
                vec![RankedSchool { school: "Mapua University".to_string(), rating: 0.8 }],
            )]),
            vec![],
        );

        AppState {
            embedder: Arc::new(ConstantEmbedder),
            catalog: Arc::new(SnapshotStore::new(Arc::new(catalog), Duration::from_secs(60))),
            postgres: None,
            matcher: Matcher::with_defaults(),
        }
    }

    #[actix_web::test]
    async fn test_recommend_endpoint() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(create_state()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/recommend")
            .set_json(serde_json::json!({"answers": {"academics": ["algorithms"]}}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["type"], "exact");
        assert_eq!(body["results"][0]["program"], "BS Computer Science");
        assert_eq!(body["matched_category"], "IT");
    }

    #[actix_web::test]
    async fn test_recommend_blank_answers() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(create_state()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/recommend")
            .set_json(serde_json::json!({"answers": {}, "school_type": "private"}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["type"], "fallback");
        assert_eq!(body["results"], serde_json::json!([]));
    }

    #[actix_web::test]
    async fn test_history_requires_user_id() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(create_state()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/recommendations/history").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_health_reports_catalog_size() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(create_state()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "healthy");
        assert_eq!(body["catalog_size"], 2);
    }

    #[actix_web::test]
    async fn test_school_rankings() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(create_state()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/school-rankings").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["IT"][0]["school"], "Mapua University");
        assert_eq!(body["IT"][0]["rating"], 0.8);
    }

    #[actix_web::test]
    async fn test_program_search_is_case_insensitive() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(create_state()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/programs/search?location=cebu&category=NURS").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        let programs = body.as_array().unwrap();
        assert_eq!(programs.len(), 1);
        assert_eq!(programs[0]["name"], "BS Nursing");
        assert!(programs[0].get("vector").is_none());

        let req = test::TestRequest::get().uri("/programs/search").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn test_program_search_rejects_long_terms() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(create_state()))
                .configure(configure),
        )
        .await;

        let uri = format!("/programs/search?name={}", "a".repeat(101));
        let req = test::TestRequest::get().uri(&uri).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_clear_history_without_postgres() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(create_state()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::delete()
            .uri("/recommendations/history?userId=student-1")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::SERVICE_UNAVAILABLE);

        let req = test::TestRequest::delete().uri("/recommendations/history").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_recommend_embedding_failure_is_bad_gateway() {
        struct FailingEmbedder;

        #[async_trait]
        impl Embedder for FailingEmbedder {
            fn dimension(&self) -> usize {
                2
            }

            async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
                Err(EmbeddingError::ApiError("model unavailable".to_string()))
            }
        }

        let state = AppState {
            embedder: Arc::new(FailingEmbedder),
            ..create_state()
        };
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/recommend")
            .set_json(serde_json::json!({"answers": {"academics": ["algorithms"]}}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_GATEWAY);
    }
}
