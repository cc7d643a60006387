use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Json, Response},
    routing::{get, patch, post, put},
    Router,
};
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::database::repos::PgDocumentStore;
use crate::database::DatabaseManager;
use crate::handlers::{admin, protected, public};
use crate::middleware::{jwt_auth_middleware, require_admin};
use crate::services::{DocumentService, UploadPolicy};
use crate::storage::Storage;
use crate::types::Paging;

/// Shared handles every handler receives
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub storage: Arc<dyn Storage>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(pool: PgPool, storage: Arc<dyn Storage>, config: AppConfig) -> Self {
        Self {
            pool,
            storage,
            config: Arc::new(config),
        }
    }

    pub fn documents(&self) -> DocumentService<PgDocumentStore> {
        DocumentService::new(
            PgDocumentStore::new(self.pool.clone()),
            self.storage.clone(),
            UploadPolicy::from(&self.config.storage),
        )
    }

    /// Resolve list paging against the configured limits
    pub fn page(&self, paging: &Paging) -> (i64, i64) {
        paging.resolve(self.config.api.default_page_limit, self.config.api.max_page_limit)
    }
}

pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(public_routes(&state))
        .merge(protected_routes(&state))
        .nest("/admin", admin_routes(&state));

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/v1", api)
        // Global middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config)),
        )
        .with_state(state)
}

fn public_routes(_state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(public::auth::register))
        .route("/login", post(public::auth::login))
        .route("/categories", get(public::categories::list))
        .route("/categories/:id", get(public::categories::show))
}

fn protected_routes(state: &AppState) -> Router<AppState> {
    let upload_limit = state.config.storage.request_body_limit();

    Router::new()
        .route("/me", get(protected::me::show))
        .route(
            "/documents",
            get(protected::documents::list)
                .post(protected::documents::upload)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/documents/:id",
            get(protected::documents::download).delete(protected::documents::delete),
        )
        .route(
            "/clients/me/profile",
            get(protected::profile::show).put(protected::profile::update),
        )
        .route("/forms", post(protected::forms::save))
        .route("/forms/me", get(protected::forms::show).put(protected::forms::update))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Customers and their documents
        .route("/customers", get(admin::customers::list))
        .route("/customers/:user_id/documents", get(admin::customers::documents))
        // Document review
        .route("/documents", get(admin::documents::list))
        .route("/documents/:id/download", get(admin::documents::download))
        .route(
            "/documents/:id",
            put(admin::documents::review).patch(admin::documents::review),
        )
        // Client profiles
        .route("/clients", get(admin::clients::list).post(admin::clients::create))
        .route(
            "/clients/:id",
            get(admin::clients::show)
                .put(admin::clients::update)
                .delete(admin::clients::delete),
        )
        .route("/clients/:id/documents", get(admin::clients::documents))
        // User accounts
        .route("/users/stats", get(admin::users::stats))
        .route("/users", get(admin::users::list).post(admin::users::create))
        .route(
            "/users/:id",
            get(admin::users::show)
                .put(admin::users::update)
                .delete(admin::users::delete),
        )
        .route("/users/:id/password", patch(admin::users::set_password))
        .route("/users/:id/toggle-active", patch(admin::users::toggle_active))
        // Intake forms
        .route("/forms", get(admin::forms::list))
        .route("/forms/:id", get(admin::forms::show))
        // Category catalog
        .route("/categories", get(admin::categories::list).post(admin::categories::create))
        .route(
            "/categories/:id",
            put(admin::categories::update).delete(admin::categories::delete),
        )
        // Activity log
        .route("/activities", get(admin::activities::list).post(admin::activities::create))
        .route("/activities/recent", get(admin::activities::recent))
        .route("/activities/types", get(admin::activities::types))
        // Layers run bottom-up: authenticate, then check the role
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn root() -> Json<serde_json::Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Visa Intake API",
            "version": version,
            "description": "Back office for visa applications: accounts, client profiles, documents and intake forms",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "auth": "/api/v1/register, /api/v1/login (public - token acquisition)",
                "categories": "/api/v1/categories[/:id] (public)",
                "documents": "/api/v1/documents[/:id] (protected)",
                "profile": "/api/v1/clients/me/profile (protected)",
                "forms": "/api/v1/forms, /api/v1/forms/me (protected)",
                "admin": "/api/v1/admin/* (admin role)"
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> Response {
    match DatabaseManager::health_check(&state.pool).await {
        Ok(()) => Json(json!({
            "success": true,
            "data": { "status": "healthy", "database": "connected" }
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": true,
                    "message": "Database unavailable",
                    "code": "SERVICE_UNAVAILABLE"
                })),
            )
                .into_response()
        }
    }
}
