//! Route definitions for Inventa

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        .nest("/distributions", distribution_routes(&state))
        .nest("/requests", request_routes(&state))
        .nest("/procurements", procurement_routes(&state))
        .nest("/assets", asset_routes(&state))
        .nest("/notifications", notification_routes(&state))
        .nest("/audit-logs", audit_routes(&state))
        .nest("/dashboard", dashboard_routes(&state))
}

/// Distribution drafts, execution and the receipt handshake
fn distribution_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_distributions).post(handlers::create_distribution),
        )
        .route(
            "/:id",
            get(handlers::get_distribution)
                .put(handlers::update_distribution)
                .delete(handlers::delete_distribution),
        )
        .route("/:id/execute", post(handlers::execute_distribution))
        .route("/:id/assets", get(handlers::list_distribution_assets))
        .route("/targets/:target_id/receive", post(handlers::receive_target))
        .route("/rooms/:room_id/pending", get(handlers::list_pending_for_room))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Consumable requests
fn request_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_requests).post(handlers::create_request))
        .route("/:id", get(handlers::get_request))
        .route("/:id/approve-unit", post(handlers::approve_request_unit))
        .route("/:id/approve-faculty", post(handlers::approve_request_faculty))
        .route("/:id/process", post(handlers::process_request))
        .route("/:id/ready", post(handlers::mark_request_ready))
        .route("/:id/complete", post(handlers::complete_request))
        .route("/:id/reject", post(handlers::reject_request))
        .route("/:id/cancel", post(handlers::cancel_request))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Procurements
fn procurement_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_procurements).post(handlers::create_procurement),
        )
        .route("/:id", get(handlers::get_procurement))
        .route("/:id/approve", post(handlers::approve_procurement))
        .route("/:id/reject", post(handlers::reject_procurement))
        .route("/:id/complete", post(handlers::complete_procurement))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Physical asset listing
fn asset_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_assets))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// In-app notifications
fn notification_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_notifications))
        .route("/unread-count", get(handlers::get_unread_count))
        .route("/mark-all-read", post(handlers::mark_all_notifications_read))
        .route("/:id/read", post(handlers::mark_notification_read))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Audit log viewer
fn audit_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_audit_logs))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Role-scoped dashboard
fn dashboard_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_dashboard))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}
