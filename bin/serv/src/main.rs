use axum::{Router, middleware, routing::get};
use lms_api::{
    config::ApiConfig,
    jobs, metrics,
    middleware::{apply_security_headers, create_cors_layer, request_id_middleware},
    state::ApiState,
};
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment variables
    dotenvy::dotenv().ok();
    let config = ApiConfig::from_env()?;

    lms_api::tracing::init_tracing(&config.env);
    let metrics_handle = metrics::init_metrics()?;

    let state = ApiState::from_config(&config).await?;

    let _jobs = jobs::start_background_jobs(state.recovery.clone(), state.recovery_config);
    let environment = state.environment.clone();

    let metrics_router = Router::new()
        .route("/metrics", get(metrics::metrics_handler))
        .with_state(metrics_handle);

    let app = lms_api::router::router()
        .with_state(state)
        .merge(metrics_router)
        .layer(middleware::from_fn(metrics::track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(create_cors_layer(config.parsed_allowed_origins()));
    let app = apply_security_headers(app, environment);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!(address = %config.bind_address, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
