use axum::{routing::get, Router};
use safepass::{
    api,
    backend::{Backend, SeaOrmBackend},
    config::Config,
    migrator,
    notifications::FunctionsClient,
    refresher,
    state::AppState,
};
use sea_orm::Database;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present (dotenvy)
    dotenvy::dotenv().ok();

    safepass::telemetry::init_telemetry("safepass-server");

    let config = Config::from_env()?;
    let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();

    let db = Database::connect(&config.database_url).await?;

    use sea_orm_migration::MigratorTrait;
    migrator::Migrator::up(&db, None).await?;

    let backend: Arc<dyn Backend> = Arc::new(SeaOrmBackend::new(db));
    safepass::metrics::init_metrics(backend.as_ref()).await;

    let functions = Arc::new(FunctionsClient::from_config(&config));
    let state = AppState::new(config.clone(), backend, functions);

    if let Err(e) = state.cache.refresh().await {
        tracing::error!("Initial cache load failed: {}", e);
    }
    refresher::spawn_refresher(state.cache.clone(), config.refresh_interval);

    let app = app(state, &config, prometheus_layer, metric_handle)?;

    tracing::info!("listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn app(
    state: AppState,
    config: &Config,
    prometheus_layer: axum_prometheus::PrometheusMetricLayer<'static>,
    metric_handle: metrics_exporter_prometheus::PrometheusHandle,
) -> Result<Router, Box<dyn std::error::Error>> {
    let origin = config.cors_origin.parse::<axum::http::HeaderValue>()?;

    let router = api::router(state)
        .layer(prometheus_layer)
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<axum::body::Body>| {
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched| matched.as_str());

                    // "METHOD /path", e.g. "POST /scans"
                    let span_name = if let Some(path) = matched_path {
                        format!("{} {}", request.method(), path)
                    } else {
                        format!("{} {}", request.method(), request.uri().path())
                    };

                    let user_ip = request
                        .headers()
                        .get("x-forwarded-for")
                        .and_then(|v| v.to_str().ok())
                        .or_else(|| {
                            request
                                .headers()
                                .get("x-real-ip")
                                .and_then(|v| v.to_str().ok())
                        })
                        .unwrap_or("unknown");

                    tracing::info_span!(
                        "request",
                        "otel.name" = span_name,
                        user_ip = user_ip,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        // filled in by handlers
                        table = tracing::field::Empty,
                        action = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        student_id = tracing::field::Empty,
                        business_event = tracing::field::Empty,
                        error = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency = tracing::field::Empty,
                    )
                })
                .on_request(|_request: &axum::http::Request<axum::body::Body>, _span: &tracing::Span| {})
                .on_response(
                    |response: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                        span.record("status", tracing::field::display(response.status()));
                        span.record("latency", tracing::field::debug(latency));
                        tracing::info!("request completed");
                    },
                ),
        )
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::PATCH,
                    axum::http::Method::DELETE,
                ])
                .allow_headers([axum::http::header::CONTENT_TYPE])
                .allow_credentials(true),
        )
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(axum::extract::DefaultBodyLimit::max(10 * 1024 * 1024));

    Ok(router)
}
