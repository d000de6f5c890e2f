mod handlers;
pub mod middleware;

use axum::{
    extract::FromRef,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::cache::SubscriptionCache;
use crate::db::Database;
use crate::engine::DecreaseRule;
use middleware::SecurityConfig;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub subscriptions: SubscriptionCache,
    /// Rule applied when a request does not pick one.
    pub decrease_rule: DecreaseRule,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            subscriptions: SubscriptionCache::default(),
            decrease_rule: DecreaseRule::default(),
        }
    }

    pub fn with_cache(mut self, cache: SubscriptionCache) -> Self {
        self.subscriptions = cache;
        self
    }

    pub fn with_decrease_rule(mut self, rule: DecreaseRule) -> Self {
        self.decrease_rule = rule;
        self
    }
}

impl FromRef<AppState> for Database {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

/// Router with default state and no authentication.
pub fn create_router(db: Database) -> Router {
    create_app(AppState::new(db), SecurityConfig::disabled())
}

pub fn create_app(state: AppState, security: SecurityConfig) -> Router {
    let mut api = Router::new()
        // Patterns
        .route(
            "/patterns",
            get(handlers::list_patterns).post(handlers::create_pattern),
        )
        .route(
            "/patterns/{id}",
            get(handlers::get_pattern)
                .put(handlers::update_pattern)
                .delete(handlers::delete_pattern),
        )
        .route("/patterns/{id}/export", get(handlers::export_pattern))
        .route("/patterns/{id}/rounds", get(handlers::list_rounds))
        .route(
            "/patterns/{id}/rounds/{round_id}/groups",
            post(handlers::create_group),
        )
        .route(
            "/patterns/{id}/stitches/{stitch_id}",
            delete(handlers::delete_stitch),
        )
        .route("/preview", post(handlers::preview_round))
        // Profiles
        .route(
            "/profiles",
            get(handlers::list_profiles).post(handlers::create_profile),
        )
        .route("/profiles/{id}", get(handlers::get_profile))
        .route("/profiles/{id}/subscription", get(handlers::get_subscription))
        .route(
            "/profiles/{id}/custom-stitches",
            get(handlers::list_custom_stitches).post(handlers::add_custom_stitch),
        )
        .route("/billing/webhook", post(handlers::billing_webhook))
        // Free pattern directory
        .route(
            "/free-patterns",
            get(handlers::list_free_patterns).post(handlers::create_free_pattern),
        )
        .route("/free-patterns/{id}", get(handlers::get_free_pattern))
        .route_layer(from_fn_with_state(
            security.clone(),
            middleware::auth_middleware,
        ))
        // Health stays reachable without credentials
        .route("/health", get(handlers::health));

    if let Some(limiter) = security.rate_limiter.clone() {
        api = api.layer(from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(security.cors_layer()),
        )
        .with_state(state)
}
