use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use examprep_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware, routes, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let admin_api = Router::new()
        .route(
            "/api/admin/exams",
            get(routes::admin::list_exams).post(routes::admin::create_exam),
        )
        .route(
            "/api/admin/exams/:id",
            patch(routes::admin::update_exam).delete(routes::admin::archive_exam),
        )
        .route(
            "/api/admin/exams/:id/restore",
            post(routes::admin::restore_exam),
        )
        .route(
            "/api/admin/questions/preview",
            post(routes::admin::preview_questions),
        )
        .route(
            "/api/admin/questions/commit",
            post(routes::admin::commit_questions),
        )
        .route(
            "/api/admin/questions/upload",
            post(routes::admin::upload_questions),
        )
        .route(
            "/api/admin/questions/bulk",
            post(routes::admin::bulk_import_questions),
        )
        .route(
            "/api/admin/uploads/history",
            get(routes::admin::upload_history),
        )
        .route("/api/admin/users", get(routes::admin::list_users))
        .route(
            "/api/admin/users/:id",
            patch(routes::admin::update_user).delete(routes::admin::archive_user),
        )
        .route(
            "/api/admin/users/:id/restore",
            post(routes::admin::restore_user),
        )
        .layer(axum::middleware::from_fn(
            middleware::auth::require_admin,
        ))
        .layer(axum::middleware::from_fn_with_state(
            middleware::rate_limit::new_rps_state(config.admin_rps),
            middleware::rate_limit::rps_middleware,
        ));

    let student_api = Router::new()
        .route("/api/exams", get(routes::exam::list_exams))
        .route("/api/exams/featured", get(routes::exam::featured_exams))
        .route("/api/exams/:id", get(routes::exam::get_exam))
        .route("/api/exams/:id/start", post(routes::exam::start_exam))
        .route("/api/exams/:id/submit", post(routes::exam::submit_exam))
        .route(
            "/api/exams/:id/leaderboard",
            get(routes::exam::exam_leaderboard),
        )
        .route("/api/results", get(routes::exam::my_results))
        .route("/api/results/:id", get(routes::exam::result_details))
        .layer(axum::middleware::from_fn(
            middleware::auth::require_bearer_auth,
        ))
        .layer(axum::middleware::from_fn_with_state(
            middleware::rate_limit::new_rps_state(config.public_rps),
            middleware::rate_limit::rps_middleware,
        ));

    let app = base_routes
        .merge(admin_api)
        .merge(student_api)
        .with_state(app_state)
        .layer(middleware::cors::permissive_cors())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(4 * 1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
