//! Widget type registry.
//!
//! Descriptors are injected once at startup and read-only afterwards; no
//! live widget instance data is modeled here.

#[derive(Debug, Clone)]
pub struct WidgetType {
    pub id_base: String,
    /// Human label, carried for completeness.
    pub name: String,
}

impl WidgetType {
    pub fn new(id_base: &str, name: &str) -> Self {
        WidgetType {
            id_base: id_base.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WidgetRegistry {
    types: Vec<WidgetType>,
}

impl WidgetRegistry {
    pub fn new(types: Vec<WidgetType>) -> Self {
        WidgetRegistry { types }
    }

    pub fn empty() -> Self {
        WidgetRegistry { types: Vec::new() }
    }

    /// Registry pre-loaded with the stock widget set.
    pub fn with_builtin() -> Self {
        WidgetRegistry::new(vec![
            WidgetType::new("archives", "Archives"),
            WidgetType::new("calendar", "Calendar"),
            WidgetType::new("categories", "Categories"),
            WidgetType::new("meta", "Meta"),
            WidgetType::new("nav_menu", "Navigation Menu"),
            WidgetType::new("pages", "Pages"),
            WidgetType::new("recent_comments", "Recent Comments"),
            WidgetType::new("recent_posts", "Recent Posts"),
            WidgetType::new("rss", "RSS"),
            WidgetType::new("search", "Search"),
            WidgetType::new("tag_cloud", "Tag Cloud"),
            WidgetType::new("text", "Text"),
        ])
    }

    pub fn find(&self, id_base: &str) -> Option<&WidgetType> {
        self.types.iter().find(|t| t.id_base == id_base)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WidgetType> {
        self.types.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
