pub mod health;
pub mod menu_items;
pub mod resource;
pub mod widgets;

use std::sync::Arc;

use axum::{extract::Extension, routing::get, Router};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

pub use menu_items::MenuItemsController;
pub use resource::ResourceController;
pub use widgets::WidgetsController;

/// Assemble the full application router: health probes at the root, both
/// resource surfaces nested under the configured namespace.
pub fn build_router(
    menu_items: Arc<MenuItemsController>,
    widgets: Arc<WidgetsController>,
    namespace: &str,
) -> Router {
    let api = Router::new()
        .merge(menu_items::routes())
        .merge(widgets::routes());

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .nest(&format!("/{}", namespace.trim_matches('/')), api)
        .layer(Extension(menu_items))
        .layer(Extension(widgets))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
}
