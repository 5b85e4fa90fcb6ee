/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use mealplan_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = mealplan_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use mealplan_shared::auth::middleware::{authenticate, Authenticator, JwtAuthenticator};
use mealplan_shared::permissions::PermissionMatrix;
use mealplan_shared::services::{
    invites::InviteService, meals::MealService, membership::MembershipService,
    sync::SyncService, users::UserService,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Role → action table, fixed at start-up
    pub permissions: Arc<PermissionMatrix>,

    /// Bearer token verifier
    pub authenticator: Arc<dyn Authenticator>,
}

impl AppState {
    /// Creates state with the standard permission matrix and JWT verification
    pub fn new(db: PgPool, config: Config) -> Self {
        let authenticator = Arc::new(JwtAuthenticator::new(config.jwt.secret.clone()));
        Self::with_parts(db, config, PermissionMatrix::standard(), authenticator)
    }

    /// Creates state with an explicit matrix and authenticator
    pub fn with_parts(
        db: PgPool,
        config: Config,
        permissions: PermissionMatrix,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            permissions: Arc::new(permissions),
            authenticator,
        }
    }

    pub fn membership(&self) -> MembershipService {
        MembershipService::new(self.db.clone(), self.permissions.clone())
    }

    pub fn invites(&self) -> InviteService {
        InviteService::new(self.db.clone(), self.permissions.clone())
    }

    pub fn meals(&self) -> MealService {
        MealService::new(self.db.clone(), self.permissions.clone())
    }

    pub fn sync(&self) -> SyncService {
        SyncService::new(self.db.clone())
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.db.clone())
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check (public)
/// ├── /users/                          # Caller profile
/// │   ├── GET  /me
/// │   └── PUT  /name
/// ├── /groups/
/// │   ├── POST   /                     # Create group
/// │   ├── POST   /invite               # Create invite
/// │   ├── POST   /invite/join/:token   # Join via invite
/// │   ├── DELETE /invite/:token        # Void invite
/// │   ├── GET    /:groupId             # Group detail
/// │   ├── DELETE /:groupId             # Delete group
/// │   ├── GET    /:groupId/members
/// │   ├── GET    /:groupId/invites
/// │   ├── PUT    /:groupId/name
/// │   └── DELETE /:groupId/leave
/// ├── /management/
/// │   ├── POST /users/{kick,ban,unban}
/// │   └── POST /roles/{add,remove}
/// ├── /meals/
/// │   ├── POST   /
/// │   ├── PUT    /preferences
/// │   ├── DELETE /cooks
/// │   ├── GET    /:mealId
/// │   ├── PUT    /:mealId
/// │   ├── DELETE /:mealId
/// │   └── PUT    /:mealId/flags
/// └── /sync/
///     ├── GET /groups
///     ├── GET /group/meals
///     └── GET /group/meal
/// ```
///
/// Everything except `/health` requires a bearer token.
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Security headers
/// 4. Authentication (per route group)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let user_routes = Router::new()
        .route("/me", get(routes::users::me))
        .route("/name", put(routes::users::rename));

    let group_routes = Router::new()
        .route("/", post(routes::groups::create_group))
        .route("/invite", post(routes::invites::create_invite))
        .route("/invite/join/:token", post(routes::invites::join_via_invite))
        .route("/invite/:token", delete(routes::invites::void_invite))
        .route(
            "/:group_id",
            get(routes::groups::group_detail).delete(routes::groups::delete_group),
        )
        .route("/:group_id/members", get(routes::groups::list_members))
        .route("/:group_id/invites", get(routes::invites::list_invites))
        .route("/:group_id/name", put(routes::groups::rename_group))
        .route("/:group_id/leave", delete(routes::groups::leave_group));

    let management_routes = Router::new()
        .route("/users/kick", post(routes::management::kick_user))
        .route("/users/ban", post(routes::management::ban_user))
        .route("/users/unban", post(routes::management::unban_user))
        .route("/roles/add", post(routes::management::add_role))
        .route("/roles/remove", post(routes::management::remove_role));

    let meal_routes = Router::new()
        .route("/", post(routes::meals::create_meal))
        .route("/preferences", put(routes::meals::update_participation))
        .route("/cooks", delete(routes::meals::remove_cook))
        .route(
            "/:meal_id",
            get(routes::meals::meal_detail)
                .put(routes::meals::update_meal)
                .delete(routes::meals::delete_meal),
        )
        .route("/:meal_id/flags", put(routes::meals::set_flags));

    let sync_routes = Router::new()
        .route("/groups", get(routes::sync::sync_groups))
        .route("/group/meals", get(routes::sync::sync_group_meals))
        .route("/group/meal", get(routes::sync::sync_meal));

    let authenticated = Router::new()
        .nest("/users", user_routes)
        .nest("/groups", group_routes)
        .nest("/management", management_routes)
        .nest("/meals", meal_routes)
        .nest("/sync", sync_routes)
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_layer,
        ));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|origin| origin == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    // Combine all routes with middleware stack
    Router::new()
        .merge(health_routes)
        .merge(authenticated)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Authentication middleware layer
///
/// Resolves the bearer token to a user and injects `AuthContext` into the request
/// extensions.
async fn auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(state.authenticator.as_ref(), req.headers())?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
