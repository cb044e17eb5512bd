pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod models;
pub mod redis;
pub mod services;
pub mod stores;

use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    cache::SessionCache,
    config::Config,
    services::{
        engagement_service::EngagementService, notification_service::NotificationService,
        report_service::ReportService,
    },
    stores::{AccountStore, Store},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: Arc<dyn SessionCache>,
    pub accounts: Arc<dyn AccountStore>,
    pub reports: ReportService,
    pub engagement: EngagementService,
    pub notifications: NotificationService,
}

impl AppState {
    /// Wires every service onto one backing store.
    pub fn new<S>(config: Config, store: Arc<S>, cache: Arc<dyn SessionCache>) -> Self
    where
        S: Store + 'static,
    {
        let notifications = NotificationService::new(store.clone());
        Self {
            config: Arc::new(config),
            cache,
            accounts: store.clone(),
            reports: ReportService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                notifications.clone(),
            ),
            engagement: EngagementService::new(store.clone(), store.clone(), store),
            notifications,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        )
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route(
            "/api/v1/votes/{kind}/{item_id}",
            get(handlers::engagement::get_aggregate),
        );

    // Protected routes
    let protected_routes = Router::new()
        .route("/api/v1/auth/logout", post(handlers::auth::logout))
        // Report routes
        .route(
            "/api/v1/reports",
            post(handlers::reports::submit_report).get(handlers::reports::list_reports),
        )
        .route(
            "/api/v1/reports/my-reports",
            get(handlers::reports::get_my_reports),
        )
        .route(
            "/api/v1/reports/stats",
            get(handlers::reports::get_report_stats),
        )
        .route(
            "/api/v1/reports/target/{report_type}/{target_id}",
            get(handlers::reports::get_target_reports),
        )
        .route(
            "/api/v1/reports/{report_id}",
            get(handlers::reports::get_report),
        )
        .route(
            "/api/v1/reports/{report_id}/details",
            get(handlers::reports::get_report_details),
        )
        .route(
            "/api/v1/reports/{report_id}/process",
            post(handlers::reports::process_report),
        )
        .route(
            "/api/v1/reports/{report_id}/dismiss",
            post(handlers::reports::dismiss_report),
        )
        // Vote routes
        .route(
            "/api/v1/votes/{kind}",
            post(handlers::engagement::cast_vote),
        )
        // Bookmark routes
        .route(
            "/api/v1/bookmarks",
            get(handlers::engagement::get_bookmarks),
        )
        .route(
            "/api/v1/bookmarks/{post_id}",
            post(handlers::engagement::add_bookmark).delete(handlers::engagement::remove_bookmark),
        )
        .route(
            "/api/v1/bookmarks/{post_id}/toggle",
            post(handlers::engagement::toggle_bookmark),
        )
        // Notification routes
        .route(
            "/api/v1/notifications",
            get(handlers::notifications::get_notifications),
        )
        .route(
            "/api/v1/notifications/unread-count",
            get(handlers::notifications::get_unread_count),
        )
        .route(
            "/api/v1/notifications/mark-all-read",
            post(handlers::notifications::mark_all_notifications_read),
        )
        .route(
            "/api/v1/notifications/{notification_id}",
            delete(handlers::notifications::delete_notification),
        )
        .route(
            "/api/v1/notifications/{notification_id}/mark-read",
            post(handlers::notifications::mark_notification_read),
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
