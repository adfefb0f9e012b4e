use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use cms_api_server::config::Settings;
use cms_api_server::controllers::{build_router, MenuItemsController, WidgetsController};
use cms_api_server::hooks::MenuItemHooks;
use cms_api_server::store::{MemoryStore, ObjectStore, WidgetRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,cms_api_server=debug".to_string()),
        )
        .with_target(true)
        .json()
        .init();

    info!("🚀 Starting CMS API Server...");

    // Load configuration
    let settings = Settings::load()?;
    info!("✅ Configuration loaded");

    // Object store, pre-loaded with the stock content model
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::with_defaults(&settings.site.home_url));
    info!("✅ Object store ready");

    // Widget registry is populated once and read-only afterwards
    let widgets = Arc::new(WidgetRegistry::with_builtin());

    // Extension points for the menu item write pipeline
    let hooks = Arc::new(MenuItemHooks::new());

    let menu_items_controller = Arc::new(MenuItemsController::new(
        &settings.api.namespace,
        store.clone() as Arc<dyn ObjectStore>,
        hooks,
    ));
    let widgets_controller = Arc::new(WidgetsController::new(&settings.api.namespace, widgets));

    let app = build_router(
        menu_items_controller,
        widgets_controller,
        &settings.api.namespace,
    );

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
