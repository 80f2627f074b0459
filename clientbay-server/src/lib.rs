//! HTTP surface: router assembly, identity extraction, and error mapping
//! over the `clientbay-core` services.

pub mod config;
pub mod controllers;
pub mod error;
pub mod identity;
pub mod state;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api/workspaces", controllers::workspaces::router())
        .nest("/api/clients", controllers::clients::router())
        .nest("/api/projects", controllers::projects::router())
        .nest("/api/files", controllers::projects::files_router())
        .nest("/api/approvals", controllers::approvals::router())
        .nest("/api/invoices", controllers::invoices::router())
        .nest("/api/activity", controllers::activity::router())
        .nest("/api/search", controllers::search::router())
        .nest("/api/dashboard", controllers::dashboard::router())
        .nest("/api/reports", controllers::reports::router())
        .nest("/api/user", controllers::users::router())
        .nest("/api/portal", controllers::portal::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
