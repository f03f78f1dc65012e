// Helike Planner API v0.1
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod errors;
mod helpers;
mod routes;
mod services;

use config::AppConfig;
use routes::AppState;
use services::course::{load_course_file, Course};
use services::gemini::GeminiClient;

/// OpenAPI document for the Helike Planner API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Helike Planner API",
        version = "0.1.0",
        description = "Race-plan API for the Ultra Helike 100km. Turns a target finish time \
            into terrain-adjusted paces per segment, projected checkpoint arrival times and \
            a printable itinerary, and hosts a race-coach chat that locks out after three \
            off-topic questions.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Course", description = "Course segments, checkpoints and elevation profile"),
        (name = "Plan", description = "Pace and arrival-time projections"),
        (name = "Chat", description = "Race-coach chat with off-topic lockout"),
    ),
    paths(
        routes::health::health_check,
        routes::course::get_course,
        routes::plan::get_plan,
        routes::plan::get_arrival,
        routes::plan::get_itinerary,
        routes::plan::download_itinerary,
        routes::chat::create_session,
        routes::chat::get_session,
        routes::chat::post_message,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::course::CourseResponse,
            routes::plan::PlanResponse,
            routes::plan::ArrivalResponse,
            routes::chat::SendMessageRequest,
            routes::chat::SendMessageResponse,
            services::course::Segment,
            services::course::Terrain,
            services::course::CheckpointSpec,
            services::course::CheckpointKind,
            services::course::ElevationPoint,
            services::pacing::TargetDuration,
            services::pacing::SegmentProjection,
            services::pacing::ComputedSegment,
            services::checkpoints::Checkpoint,
            services::summary::RacePace,
            services::itinerary::Itinerary,
            services::chat::ChatSession,
            services::chat::ChatMessage,
            services::chat::ChatStatus,
            services::chat::Role,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "helike_planner_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    // Load the course; an explicit file that fails to load is fatal
    let course = match &config.course_file {
        Some(path) => match load_course_file(Path::new(path)) {
            Ok(course) => course,
            Err(e) => {
                tracing::error!("Failed to load course file {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => {
            tracing::info!("COURSE_FILE not set, using the built-in Ultra Helike course");
            Course::ultra_helike()
        }
    };
    tracing::info!(
        "Loaded course '{}': {} segments, {} checkpoints, {} km",
        course.name(),
        course.segments().len(),
        course.checkpoints().len(),
        course.total_distance_km()
    );

    // Create Gemini client for the race coach
    let gemini = GeminiClient::new(
        config.gemini_api_key.clone(),
        &config.gemini_model,
        &config.gemini_api_url,
    )
    .with_timeout(Duration::from_secs(config.gemini_timeout_secs));
    if !gemini.is_enabled() {
        tracing::warn!("GEMINI_API_KEY not set, race-coach chat will only answer with a fallback");
    }

    // Build shared application state
    let app_state = AppState {
        course: Arc::new(course),
        gemini,
        sessions: services::chat::new_session_registry(),
    };

    // CORS: plan endpoints are GET, chat needs POST
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any)
        .expose_headers([axum::http::header::CONTENT_DISPOSITION]);

    // Build router
    let plan_routes = Router::new()
        .route("/api/v1/course", get(routes::course::get_course))
        .route("/api/v1/plan", get(routes::plan::get_plan))
        .route("/api/v1/plan/arrival", get(routes::plan::get_arrival))
        .route("/api/v1/plan/itinerary", get(routes::plan::get_itinerary))
        .route(
            "/api/v1/plan/itinerary.txt",
            get(routes::plan::download_itinerary),
        );

    let chat_routes = Router::new()
        .route("/api/v1/chat/sessions", post(routes::chat::create_session))
        .route(
            "/api/v1/chat/sessions/:session_id",
            get(routes::chat::get_session),
        )
        .route(
            "/api/v1/chat/sessions/:session_id/messages",
            post(routes::chat::post_message),
        );

    let app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .merge(plan_routes)
        .merge(chat_routes)
        .with_state(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
