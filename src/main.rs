use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use clap::Parser;
use fuzzyrec::services::recommendation::RelevanceScore;
use fuzzyrec::services::store::CatalogView;
use fuzzyrec::utils::validation::{self, ValidationError};
use fuzzyrec::{
    init_tracing, AppState, Config, Decision, DurationBucket, EvaluationSession, Interaction,
    Item, ItemId, RecommendationFilters, RecommendationRequest, RecommendationResponse,
    SessionId, SessionProgress, UserId, UserPreferenceProfile,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Overrides the catalog path from the configuration.
    #[arg(long)]
    catalog: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FilterQuery {
    categories: Option<String>,
    duration: Option<String>,
}

impl FilterQuery {
    fn into_filters(self) -> Result<RecommendationFilters, ValidationError> {
        let duration = self
            .duration
            .filter(|d| !d.trim().is_empty())
            .map(|d| d.parse::<DurationBucket>())
            .transpose()?;
        let filters = RecommendationFilters {
            categories: self
                .categories
                .map(|c| validation::parse_category_list(&c))
                .unwrap_or_default(),
            duration,
        };
        validation::validate_filters(&filters)?;
        Ok(filters)
    }
}

#[derive(Debug, Deserialize)]
struct RecommendationQuery {
    user_id: UserId,
    k: Option<usize>,
    breakdown: Option<bool>,
    categories: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProfileQuery {
    session_id: Option<SessionId>,
}

#[derive(Debug, Deserialize)]
struct StartSessionBody {
    user_id: UserId,
    target: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct DecisionBody {
    item_id: ItemId,
    decision: Decision,
    score: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct RatingBody {
    item_id: ItemId,
    score: u8,
}

#[derive(Debug, Deserialize)]
struct RelevanceBody {
    affinity: f64,
    popularity: f64,
    rating_similarity: f64,
    #[serde(default)]
    diagnostics: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    message: String,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
        }
    }

    fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message,
        }
    }
}

type ApiError = (StatusCode, Json<ApiResponse<()>>);
type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn no_action(message: impl Into<String>) -> ApiError {
    (StatusCode::NOT_FOUND, Json(ApiResponse::error(message.into())))
}

fn bad_request(error: ValidationError) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::error(error.to_string())))
}

async fn health_check() -> Json<ApiResponse<HashMap<String, String>>> {
    let mut status = HashMap::new();
    status.insert("status".to_string(), "healthy".to_string());
    status.insert("service".to_string(), "fuzzyrec".to_string());
    status.insert("version".to_string(), env!("CARGO_PKG_VERSION").to_string());

    Json(ApiResponse::success(status))
}

async fn start_session(
    State(state): State<AppState>,
    Json(body): Json<StartSessionBody>,
) -> ApiResult<EvaluationSession> {
    if let Some(target) = body.target {
        validation::validate_target(target).map_err(bad_request)?;
    }
    let session = state.session_service.start_session(body.user_id, body.target);
    Ok(Json(ApiResponse::success(session)))
}

async fn get_progress(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
) -> ApiResult<SessionProgress> {
    state
        .session_service
        .progress(session_id)
        .map(|progress| Json(ApiResponse::success(progress)))
        .ok_or_else(|| no_action(format!("Session {} not found", session_id)))
}

async fn next_candidate(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    Query(query): Query<FilterQuery>,
) -> ApiResult<Item> {
    let filters = query.into_filters().map_err(bad_request)?;
    state
        .session_service
        .next_candidate(session_id, &filters)
        .map(|item| Json(ApiResponse::success(item)))
        .ok_or_else(|| no_action("No further candidates for this session"))
}

async fn register_decision(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    Json(body): Json<DecisionBody>,
) -> ApiResult<Interaction> {
    validation::validate_score(body.score).map_err(bad_request)?;
    state
        .session_service
        .register_decision(session_id, body.item_id, body.decision, body.score)
        .map(|interaction| Json(ApiResponse::success(interaction)))
        .ok_or_else(|| no_action("Decision not registered"))
}

async fn rate_recommendation(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    Json(body): Json<RatingBody>,
) -> ApiResult<Interaction> {
    validation::validate_score(Some(body.score)).map_err(bad_request)?;
    state
        .session_service
        .rate_recommendation(session_id, body.item_id, body.score)
        .map(|interaction| Json(ApiResponse::success(interaction)))
        .ok_or_else(|| no_action("Rating not registered"))
}

async fn get_recommendations(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    Query(params): Query<RecommendationQuery>,
) -> ApiResult<RecommendationResponse> {
    let filters = FilterQuery {
        categories: params.categories,
        duration: params.duration,
    }
    .into_filters()
    .map_err(bad_request)?;

    let request = RecommendationRequest {
        user_id: params.user_id,
        session_id,
        num_recommendations: params
            .k
            .unwrap_or(state.config.recommendation.default_k),
        include_breakdown: params.breakdown.unwrap_or(false),
        filters,
    };
    validation::validate_recommendation_request(&request, state.config.recommendation.max_k)
        .map_err(bad_request)?;

    state
        .recommendation_service
        .recommend(&request)
        .map(|response| Json(ApiResponse::success(response)))
        .ok_or_else(|| no_action("Recommendations not available for this session yet"))
}

async fn get_user_profile(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(params): Query<ProfileQuery>,
) -> Json<ApiResponse<UserPreferenceProfile>> {
    let profile = state
        .preference_service
        .build_profile(user_id, params.session_id);
    Json(ApiResponse::success(profile))
}

async fn score_relevance(
    State(state): State<AppState>,
    Json(body): Json<RelevanceBody>,
) -> Json<ApiResponse<RelevanceScore>> {
    let score = state.recommendation_service.score_relevance(
        body.affinity,
        body.popularity,
        body.rating_similarity,
        body.diagnostics,
    );
    Json(ApiResponse::success(score))
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/sessions", post(start_session))
        .route("/sessions/:session_id", get(get_progress))
        .route("/sessions/:session_id/next", get(next_candidate))
        .route("/sessions/:session_id/decisions", post(register_decision))
        .route("/sessions/:session_id/ratings", post(rate_recommendation))
        .route("/sessions/:session_id/recommendations", get(get_recommendations))
        .route("/users/:user_id/profile", get(get_user_profile))
        .route("/relevance", post(score_relevance))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing();

    let mut config = Config::load_or_default(&args.config)?;
    if let Some(catalog) = args.catalog {
        config.catalog.path = Some(catalog);
    }
    info!("Starting fuzzyrec server with config: {:?}", config.server);

    let addr = config.server.socket_addr()?;
    let state = AppState::new(config)?;
    info!("Catalog holds {} items", state.catalog.len());
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
