use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Failure reported by the object store. `code` is the stable machine code
/// the adapters classify on; `status` is only set by subsystems that own
/// their own status mapping (metadata updates).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct StoreError {
    pub code: String,
    pub message: String,
    pub status: Option<u16>,
}

impl StoreError {
    pub fn new(code: &str, message: &str) -> Self {
        StoreError {
            code: code.to_string(),
            message: message.to_string(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn db_insert() -> Self {
        StoreError::new("db_insert_error", "Could not insert post into the database.")
    }

    pub fn db_update() -> Self {
        StoreError::new("db_update_error", "Could not update post in the database.")
    }
}

/// Generic post entity. Navigation menu items are posts of the reserved
/// `nav_menu_item` type; their link fields live in `meta` under the
/// `_menu_item_*` keys.
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: u64,
    pub post_type: String,
    pub title: String,
    /// Doubles as the menu item description.
    pub content: String,
    /// Doubles as the menu item attr-title.
    pub excerpt: String,
    pub status: String,
    pub parent: u64,
    pub menu_order: i64,
    pub name: String,
    pub author: u64,
    pub password: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub meta: Map<String, Value>,
}

impl Post {
    /// Read a numeric meta value, tolerating string-encoded numbers.
    pub fn meta_u64(&self, key: &str) -> u64 {
        match self.meta.get(key) {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
            Some(Value::String(s)) => s.parse().unwrap_or(0),
            _ => 0,
        }
    }

    pub fn meta_str(&self, key: &str) -> &str {
        self.meta.get(key).and_then(Value::as_str).unwrap_or("")
    }
}

/// Term entity from the taxonomy subsystem.
#[derive(Debug, Clone, Serialize)]
pub struct Term {
    pub id: u64,
    pub taxonomy: String,
    pub name: String,
    pub slug: String,
}

/// Registered post type. `rest_base` doubles as the REST visibility flag.
#[derive(Debug, Clone)]
pub struct PostTypeDef {
    pub name: String,
    pub label: String,
    pub rest_base: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TaxonomyDef {
    pub name: String,
    pub label: String,
    pub rest_base: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StatusDef {
    pub name: String,
    pub internal: bool,
}

/// The flat write payload a menu item is persisted from. Field names are the
/// persistence layer's own vocabulary and are fixed; the adapter translates
/// API names into them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedMenuItem {
    #[serde(rename = "menu-item-db-id")]
    pub db_id: u64,
    #[serde(rename = "menu-item-object-id")]
    pub object_id: u64,
    #[serde(rename = "menu-item-object")]
    pub object: String,
    #[serde(rename = "menu-item-parent-id")]
    pub parent_id: u64,
    #[serde(rename = "menu-item-position")]
    pub position: i64,
    #[serde(rename = "menu-item-type")]
    pub item_type: String,
    #[serde(rename = "menu-item-title")]
    pub title: String,
    #[serde(rename = "menu-item-url")]
    pub url: String,
    #[serde(rename = "menu-item-description")]
    pub description: String,
    #[serde(rename = "menu-item-attr-title")]
    pub attr_title: String,
    #[serde(rename = "menu-item-target")]
    pub target: String,
    #[serde(rename = "menu-item-classes")]
    pub classes: String,
    #[serde(rename = "menu-item-xfn")]
    pub xfn: String,
    #[serde(rename = "menu-item-status")]
    pub status: String,
}

impl Default for PreparedMenuItem {
    fn default() -> Self {
        PreparedMenuItem {
            db_id: 0,
            object_id: 0,
            object: String::new(),
            parent_id: 0,
            position: 0,
            item_type: "custom".to_string(),
            title: String::new(),
            url: String::new(),
            description: String::new(),
            attr_title: String::new(),
            target: String::new(),
            classes: String::new(),
            xfn: String::new(),
            status: "publish".to_string(),
        }
    }
}
