//! Host-platform object store: models, the trait seam the adapters call
//! through, and the in-memory implementation that stands in for the real
//! persistence engine.

pub mod memory;
pub mod models;
pub mod nav;
pub mod query;
pub mod widgets;

use async_trait::async_trait;
use serde_json::{Map, Value};

pub use memory::MemoryStore;
pub use models::{
    Post, PostTypeDef, PreparedMenuItem, StatusDef, StoreError, TaxonomyDef, Term,
};
pub use nav::NavMenuItem;
pub use query::{PostQuery, SortOrder};
pub use widgets::{WidgetRegistry, WidgetType};

/// Reserved post type for navigation menu items.
pub const NAV_MENU_ITEM_TYPE: &str = "nav_menu_item";

/// Taxonomy that owns navigation menus.
pub const NAV_MENU_TAXONOMY: &str = "nav_menu";

/// Persistence contract the resource adapters are written against. The
/// production engine lives outside this repo; [`MemoryStore`] fills the seam.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_post(&self, id: u64) -> Option<Post>;

    /// Filtered, sorted, paginated listing. Returns the page of posts plus
    /// the total match count before pagination.
    async fn list_posts(&self, query: PostQuery) -> (Vec<Post>, usize);

    async fn get_term(&self, id: u64) -> Option<Term>;

    async fn post_type(&self, name: &str) -> Option<PostTypeDef>;

    async fn taxonomy(&self, name: &str) -> Option<TaxonomyDef>;

    /// Names of registered statuses, in registration order.
    async fn post_statuses(&self, include_internal: bool) -> Vec<String>;

    /// Persist a menu item. `item_id` zero inserts, anything else updates.
    /// Returns the stored item's id.
    async fn save_menu_item(
        &self,
        menu_id: u64,
        item_id: u64,
        item: PreparedMenuItem,
    ) -> Result<u64, StoreError>;

    /// REST-exposed metadata for a post, keyed by registered meta key.
    async fn get_meta(&self, post_id: u64) -> Map<String, Value>;

    /// Apply metadata updates. Errors carry the metadata subsystem's own
    /// status code.
    async fn update_meta(&self, post_id: u64, values: Map<String, Value>)
        -> Result<(), StoreError>;

    fn permalink(&self, post: &Post) -> String;

    fn term_link(&self, term: &Term) -> String;
}
