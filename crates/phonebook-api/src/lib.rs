pub mod accounts;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use phonebook_auth::{CredentialHasher, SessionTokens};
use phonebook_db::{ListFilter, PhoneRepository, PhoneStore, UserRepository, UserStore};
use sea_orm::DatabaseConnection;

pub use accounts::{AccountError, AccountService, NewAccount};
pub use error::ApiError;
pub use middleware::{AuthUser, GateState, TokenSource};

/// Application state shared across handlers
pub struct AppState {
    pub accounts: AccountService,
    pub phones: Arc<dyn PhoneRepository>,
    pub pagination: Pagination,
    pub token_source: TokenSource,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Phonebook API",
        version = "0.1.0",
        description = "REST API for accounts and their phone numbers"
    ),
    paths(
        handlers::health_check,
        handlers::register,
        handlers::login,
        handlers::create_user,
        handlers::get_user,
        handlers::list_users,
        handlers::update_user,
        handlers::delete_user,
        handlers::create_phone,
        handlers::get_phone,
        handlers::list_phones,
        handlers::update_phone,
        handlers::delete_phone,
    ),
    components(
        schemas(
            models::HealthResponse,
            models::RegisterRequest,
            models::LoginRequest,
            models::LoginResponse,
            models::UpdateAccountRequest,
            models::Account,
            models::AccountList,
            models::CreatePhoneRequest,
            models::UpdatePhoneRequest,
            models::Phone,
            models::PhoneList,
        )
    ),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "users", description = "Self-service account management"),
        (name = "phones", description = "Phone numbers of the authenticated account"),
        (name = "system", description = "System health and info endpoints")
    )
)]
struct ApiDoc;

/// Defaults applied to list endpoints when `offset`/`limit` are omitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub default_offset: u64,
    pub default_limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            default_offset: 0,
            default_limit: 10,
        }
    }
}

impl Pagination {
    /// Build a repository filter scoped to `owner`.
    ///
    /// Missing or empty values take the defaults. Anything that is not a
    /// non-negative integer no larger than `i64::MAX` is rejected, since the
    /// database binds both as signed 64-bit values.
    pub fn filter(&self, query: models::ListQuery, owner: Uuid) -> Result<ListFilter, ApiError> {
        let offset = parse_or(query.offset.as_deref(), self.default_offset)
            .ok_or_else(|| ApiError::Validation("invalid offset".to_string()))?;
        let limit = parse_or(query.limit.as_deref(), self.default_limit)
            .ok_or_else(|| ApiError::Validation("invalid limit".to_string()))?;

        Ok(ListFilter {
            offset,
            limit,
            search: query.search,
            owner: Some(owner),
        })
    }
}

fn parse_or(raw: Option<&str>, default: u64) -> Option<u64> {
    match raw {
        None | Some("") => Some(default),
        Some(value) => value
            .parse::<u64>()
            .ok()
            .filter(|v| i64::try_from(*v).is_ok()),
    }
}

/// API server configuration
pub struct ApiServerConfig {
    /// Address to bind the API server
    pub bind_addr: SocketAddr,
    /// Extra allowed CORS origins (localhost is always allowed)
    pub cors_origins: Vec<String>,
    /// HMAC secret for session tokens
    pub jwt_secret: String,
    /// Request channel carrying the session token
    pub token_source: TokenSource,
    pub pagination: Pagination,
    /// Work factor for new password hashes
    pub hasher: CredentialHasher,
}

impl ApiServerConfig {
    pub fn new(bind_addr: SocketAddr, jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr,
            cors_origins: Vec::new(),
            jwt_secret: jwt_secret.into(),
            token_source: TokenSource::default(),
            pagination: Pagination::default(),
            hasher: CredentialHasher::default(),
        }
    }
}

/// API Server
pub struct ApiServer {
    config: ApiServerConfig,
    state: Arc<AppState>,
    gate: Arc<GateState>,
}

impl ApiServer {
    /// Create a server backed by the sea-orm repositories
    pub fn new(config: ApiServerConfig, db: DatabaseConnection) -> Self {
        Self::with_repositories(
            config,
            Arc::new(UserStore::new(db.clone())),
            Arc::new(PhoneStore::new(db)),
        )
    }

    pub fn with_repositories(
        config: ApiServerConfig,
        users: Arc<dyn UserRepository>,
        phones: Arc<dyn PhoneRepository>,
    ) -> Self {
        let tokens = Arc::new(SessionTokens::new(config.jwt_secret.as_bytes()));

        let state = Arc::new(AppState {
            accounts: AccountService::new(users, config.hasher.clone(), tokens.clone()),
            phones,
            pagination: config.pagination,
            token_source: config.token_source.clone(),
        });

        let gate = Arc::new(GateState::new(tokens, config.token_source.clone()));

        Self {
            config,
            state,
            gate,
        }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let api_doc = ApiDoc::openapi();

        // Build PUBLIC routes (no authentication required)
        let public_router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/register", post(handlers::register))
            .route("/login", post(handlers::login))
            .with_state(self.state.clone());

        // Build PROTECTED routes (require session token authentication)
        let protected_router = Router::new()
            .route(
                "/v1/user",
                get(handlers::list_users).post(handlers::create_user),
            )
            .route(
                "/v1/user/{id}",
                get(handlers::get_user)
                    .put(handlers::update_user)
                    .delete(handlers::delete_user),
            )
            .route(
                "/v1/user/phone",
                get(handlers::list_phones).post(handlers::create_phone),
            )
            .route(
                "/v1/user/phone/{id}",
                get(handlers::get_phone)
                    .put(handlers::update_phone)
                    .delete(handlers::delete_phone),
            )
            .with_state(self.state.clone())
            .layer(axum_middleware::from_fn_with_state(
                self.gate.clone(),
                middleware::require_auth,
            ));

        let router = Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/openapi.json", api_doc))
            .merge(public_router)
            .merge(protected_router);

        router
            .layer(TraceLayer::new_for_http())
            .layer(self.cors_layer())
    }

    /// Credentialed CORS: exact origins only, plus local development hosts
    fn cors_layer(&self) -> CorsLayer {
        let allowed: Arc<Vec<String>> = Arc::new(self.config.cors_origins.clone());

        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
            .allow_credentials(true)
            .allow_origin(AllowOrigin::predicate(
                move |origin: &HeaderValue, _| {
                    let origin = origin.to_str().unwrap_or("");
                    origin.starts_with("http://localhost:")
                        || origin.starts_with("http://127.0.0.1:")
                        || allowed.iter().any(|o| o == origin)
                },
            ))
    }

    /// Start the API server
    pub async fn start(self) -> Result<(), anyhow::Error> {
        let router = self.build_router();

        info!("Starting API server on {}", self.config.bind_addr);
        info!("OpenAPI spec: http://{}/openapi.json", self.config.bind_addr);
        info!("Swagger UI: http://{}/swagger-ui", self.config.bind_addr);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        axum::serve(listener, router)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        Ok(())
    }
}

/// Convenience function to create and start an API server
pub async fn run_api_server(
    config: ApiServerConfig,
    db: DatabaseConnection,
) -> Result<(), anyhow::Error> {
    ApiServer::new(config, db).start().await
}
