use crate::backup::write_backup;
use crate::error::{AppError, Result};
use crate::models::{FoodRecord, RESULT_COLUMNS};
use crate::services::goals::{parse_allergies, registry_map};
use crate::services::recommender::{LoadOutcome, RecommenderState};
use crate::services::worker::RecommenderHandle;
use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

pub struct AppState {
    pub recommender: RecommenderHandle,
    pub backup_path: Option<PathBuf>,
    pub default_top_n: usize,
}

#[derive(Debug, Deserialize)]
pub struct LoadRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct LoadResponse {
    pub query: String,
    pub loaded: bool,
    pub outcome: LoadOutcome,
    pub state: RecommenderState,
    pub records: usize,
}

#[derive(Debug, Deserialize)]
pub struct RecommendParams {
    pub goal: String,
    #[serde(default)]
    pub allergies: String,
}

#[derive(Debug, Deserialize)]
pub struct SimilarParams {
    pub query: String,
    pub top_n: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ClusterParams {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub state: RecommenderState,
    pub columns: &'static [&'static str],
    pub results: Vec<FoodRecord>,
    pub count: usize,
}

impl QueryResponse {
    fn new(query: String, state: RecommenderState, results: Vec<FoodRecord>) -> Self {
        Self {
            query,
            state,
            columns: &RESULT_COLUMNS,
            count: results.len(),
            results,
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(|| async { "OK" }))
        .service(list_goals)
        .service(load_foods)
        .service(recommend_by_goal)
        .service(find_similar)
        .service(find_cluster);
}

/// GET /api/v1/goals
/// Goal identifiers with their nutrient constraints
#[get("/api/v1/goals")]
pub async fn list_goals() -> HttpResponse {
    HttpResponse::Ok().json(registry_map())
}

/// POST /api/v1/foods/load
/// Load the dataset for a query, train the cluster model, then back it up
#[post("/api/v1/foods/load")]
pub async fn load_foods(
    state: web::Data<AppState>,
    body: web::Json<LoadRequest>,
) -> Result<HttpResponse> {
    let query = body.query.trim().to_string();
    if query.is_empty() {
        return Err(AppError::BadRequest("Please enter a food name".into()));
    }
    if !state.recommender.is_running() {
        return Err(AppError::ServiceUnavailable(
            "recommender worker is not running".into(),
        ));
    }

    let outcome = state.recommender.load_and_train(query.clone()).await;
    let snapshot = state.recommender.snapshot();

    if outcome.is_loaded() {
        if let Some(path) = state.backup_path.as_deref() {
            if let Err(e) = write_backup(path, &snapshot) {
                warn!("Failed to save dataset backup: {:#}", e);
            }
        }
    }

    Ok(HttpResponse::Ok().json(LoadResponse {
        query,
        loaded: outcome.is_loaded(),
        outcome,
        state: snapshot.state(),
        records: snapshot.len(),
    }))
}

/// GET /api/v1/foods/recommend?goal=..&allergies=a,b
#[get("/api/v1/foods/recommend")]
pub async fn recommend_by_goal(
    state: web::Data<AppState>,
    params: web::Query<RecommendParams>,
) -> HttpResponse {
    let params = params.into_inner();
    let allergies = parse_allergies(&params.allergies);
    let snapshot = state.recommender.snapshot();
    let results = snapshot.filter_by_goal(&params.goal, &allergies);

    debug!(
        "Goal '{}' with {} allergy terms matched {} foods",
        params.goal,
        allergies.len(),
        results.len()
    );

    HttpResponse::Ok().json(QueryResponse::new(params.goal, snapshot.state(), results))
}

/// GET /api/v1/foods/similar?query=..&top_n=..
#[get("/api/v1/foods/similar")]
pub async fn find_similar(
    state: web::Data<AppState>,
    params: web::Query<SimilarParams>,
) -> Result<HttpResponse> {
    let params = params.into_inner();
    let top_n = params.top_n.unwrap_or(state.default_top_n);
    if top_n == 0 {
        return Err(AppError::BadRequest("top_n must be greater than 0".into()));
    }

    let snapshot = state.recommender.snapshot();
    let results = snapshot.find_similar(&params.query, top_n);

    Ok(HttpResponse::Ok().json(QueryResponse::new(params.query, snapshot.state(), results)))
}

/// GET /api/v1/foods/cluster?query=..
/// Empty results with `state != trained` mean the model has not been trained yet
#[get("/api/v1/foods/cluster")]
pub async fn find_cluster(
    state: web::Data<AppState>,
    params: web::Query<ClusterParams>,
) -> HttpResponse {
    let params = params.into_inner();
    let snapshot = state.recommender.snapshot();
    let results = snapshot.cluster_foods(&params.query);

    HttpResponse::Ok().json(QueryResponse::new(params.query, snapshot.state(), results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NutrientKind, Nutrients, RawFood};
    use crate::services::recommender::{Recommender, RecommenderConfig};
    use crate::services::source::StaticFoodSource;
    use crate::services::worker::RecommenderWorker;
    use actix_web::{test, App};
    use serde_json::Value;
    use std::sync::Arc;

    fn food(id: &str, description: &str, category: &str, calories: f64, protein: f64) -> RawFood {
        RawFood {
            source_id: id.to_string(),
            description: description.to_string(),
            brand: "Market".to_string(),
            category: category.to_string(),
            nutrients: Nutrients::default()
                .with(NutrientKind::Calories, calories)
                .with(NutrientKind::Protein, protein),
        }
    }

    fn app_state() -> web::Data<AppState> {
        let source = StaticFoodSource::new(vec![
            food("1", "Chicken breast", "Poultry", 165.0, 31.0),
            food("2", "Chicken nuggets", "Fast food", 296.0, 15.0),
            food("3", "Chicken salad", "Salads", 120.0, 12.0),
            food("4", "Chicken cheese melt", "Dairy", 300.0, 20.0),
        ]);
        let recommender = Arc::new(Recommender::new(
            Arc::new(source),
            RecommenderConfig::default(),
        ));

        web::Data::new(AppState {
            recommender: RecommenderWorker::spawn(recommender),
            backup_path: None,
            default_top_n: 2,
        })
    }

    #[actix_web::test]
    async fn test_load_then_recommend() {
        let app = test::init_service(App::new().app_data(app_state()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/foods/load")
            .set_json(serde_json::json!({ "query": "chicken" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["loaded"], true);
        assert_eq!(body["state"], "trained");
        assert_eq!(body["records"], 4);

        let req = test::TestRequest::get()
            .uri("/api/v1/foods/recommend?goal=muscle_gain&allergies=dairy")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let names: Vec<&str> = body["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["description"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Chicken breast", "Chicken nuggets"]);
        assert_eq!(body["columns"][0], "description");
    }

    #[actix_web::test]
    async fn test_load_without_matches_is_not_an_error() {
        let app = test::init_service(App::new().app_data(app_state()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/foods/load")
            .set_json(serde_json::json!({ "query": "tofu" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["loaded"], false);
        assert_eq!(body["outcome"]["status"], "no_data_found");
        assert_eq!(body["state"], "empty");
    }

    #[actix_web::test]
    async fn test_empty_query_is_rejected() {
        let app = test::init_service(App::new().app_data(app_state()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/foods/load")
            .set_json(serde_json::json!({ "query": "  " }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_cluster_before_training_reports_state() {
        let app = test::init_service(App::new().app_data(app_state()).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/api/v1/foods/cluster?query=chicken")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 0);
        assert_eq!(body["state"], "empty");
    }

    #[actix_web::test]
    async fn test_similar_uses_default_top_n() {
        let app = test::init_service(App::new().app_data(app_state()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/foods/load")
            .set_json(serde_json::json!({ "query": "chicken" }))
            .to_request();
        let _: Value = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::get()
            .uri("/api/v1/foods/similar?query=breast")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 2);
        assert!(body["results"]
            .as_array()
            .unwrap()
            .iter()
            .all(|r| r["description"] != "Chicken breast"));
    }

    #[actix_web::test]
    async fn test_goals_listing() {
        let app = test::init_service(App::new().configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/v1/goals").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["muscle_gain"][0]["nutrient"], "protein");
        assert_eq!(body["muscle_gain"][0]["direction"], "maximize");
    }
}
