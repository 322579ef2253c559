use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod auth;
mod config;
mod database;
mod envelope;
mod error;
mod handlers;
mod session;
mod validate;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "course_portal_api=info,tower_http=info".into()),
        )
        .init();

    let config = crate::config::config();
    tracing::info!("Starting course portal API in {:?} mode", config.environment);

    run_migrations().await;

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(config.api.port);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Course portal API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

/// Apply embedded migrations. Startup proceeds even when the database is
/// unreachable; requests will surface errors until it comes back.
async fn run_migrations() {
    match database::DatabaseManager::pool().await {
        Ok(pool) => {
            if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
                tracing::warn!("Migrations failed: {}", e);
            }
        }
        Err(e) => tracing::warn!("Database unavailable at startup: {}", e),
    }
}

fn app() -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(auth_routes())
        .merge(portal_routes())
        // Global middleware; CORS handles OPTIONS preflight with 200
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn auth_routes() -> Router {
    use handlers::auth;

    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/change-password", post(auth::change_password))
}

fn portal_routes() -> Router {
    use handlers::{assignments, discussion, resources, students, weeks};

    // One route per resource family; actions and sub-resources ride query
    // parameters. Unmapped verbs fall through to a 405 that still renders
    // the failure envelope.
    Router::new()
        .route(
            "/api/students",
            get(students::get)
                .post(students::post)
                .put(students::put)
                .delete(students::delete)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/resources",
            get(resources::get)
                .post(resources::post)
                .put(resources::put)
                .delete(resources::delete)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/assignments",
            get(assignments::get)
                .post(assignments::post)
                .put(assignments::put)
                .delete(assignments::delete)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/discussion",
            get(discussion::get)
                .post(discussion::post)
                .put(discussion::put)
                .delete(discussion::delete)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/weeks",
            get(weeks::get)
                .post(weeks::post)
                .put(weeks::put)
                .delete(weeks::delete)
                .fallback(method_not_allowed),
        )
}

async fn method_not_allowed() -> crate::error::ApiError {
    crate::error::ApiError::method_not_allowed("Method not allowed.")
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match database::DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            // Real cause goes to the log, never to the client
            tracing::warn!("Health check failed: {}", e);
            (
                axum::http::StatusCode::SERVICE_UNAVAILABLE,
                axum::response::Json(json!({
                    "success": false,
                    "message": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database": "unreachable"
                    }
                })),
            )
        }
    }
}
