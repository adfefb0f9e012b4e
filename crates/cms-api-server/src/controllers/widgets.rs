//! Widget resource adapter.
//!
//! Serves schemas synthesized from the widget type registry. Instance
//! handlers are declared but intentionally empty; only the type surface is
//! live.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Extension, Path},
    routing::get,
    Json, Router,
};
use once_cell::sync::Lazy;
use serde_json::{json, Value};

use crate::schema::{PropertySchema, RequestContext, Schema, SchemaType};
use crate::store::WidgetRegistry;
use crate::utils::ApiError;

use super::resource::ResourceController;

pub const REST_BASE: &str = "widgets";

/// Widget kinds that carry a generic title field.
const TITLED_WIDGETS: &[&str] = &[
    "pages",
    "calendar",
    "archives",
    "meta",
    "search",
    "text",
    "categories",
    "recent-posts",
    "recent-comments",
    "rss",
    "tag_cloud",
    "nav_menu",
    "next_recent_posts",
];

/// Configuration fields of the built-in widget kinds. Pure configuration;
/// the table is fixed for the life of the process.
static CORE_WIDGET_FIELDS: Lazy<BTreeMap<&'static str, Vec<(&'static str, PropertySchema)>>> =
    Lazy::new(|| {
        let string_field =
            |default: &str| PropertySchema::new(SchemaType::String).default_value(json!(default));
        let bool_field =
            |default: bool| PropertySchema::new(SchemaType::Boolean).default_value(json!(default));
        let int_field =
            |default: i64| PropertySchema::new(SchemaType::Integer).default_value(json!(default));

        BTreeMap::from([
            (
                "archives",
                vec![("count", bool_field(false)), ("dropdown", bool_field(false))],
            ),
            ("calendar", vec![]),
            (
                "categories",
                vec![
                    ("count", bool_field(false)),
                    ("hierarchical", bool_field(false)),
                    ("dropdown", bool_field(false)),
                ],
            ),
            ("meta", vec![]),
            (
                "nav_menu",
                vec![
                    ("sortby", string_field("post_title")),
                    ("exclude", string_field("")),
                ],
            ),
            (
                "pages",
                vec![
                    ("sortby", string_field("post_title")),
                    ("exclude", string_field("")),
                ],
            ),
            ("recent_comments", vec![("number", int_field(5))]),
            (
                "recent_posts",
                vec![("number", int_field(5)), ("show_date", bool_field(false))],
            ),
            (
                "rss",
                vec![
                    ("url", string_field("")),
                    ("link", string_field("")),
                    ("items", int_field(10)),
                    (
                        "error",
                        PropertySchema::new(SchemaType::String).default_value(Value::Null),
                    ),
                    ("show_summary", bool_field(false)),
                    ("show_author", bool_field(false)),
                    ("show_date", bool_field(false)),
                ],
            ),
            ("search", vec![]),
            ("tag_cloud", vec![("taxonomy", string_field("post_tag"))]),
            (
                "text",
                vec![("text", string_field("")), ("filter", bool_field(false))],
            ),
        ])
    });

pub struct WidgetsController {
    namespace: String,
    registry: Arc<WidgetRegistry>,
}

#[async_trait]
impl ResourceController for WidgetsController {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn rest_base(&self) -> &str {
        REST_BASE
    }

    async fn item_schema(&self) -> Schema {
        Schema::object("widget")
            .with_property("id", base_property("Unique identifier for the object."))
            .with_property("type", base_property("Type of Widget for the object."))
    }
}

impl WidgetsController {
    pub fn new(namespace: &str, registry: Arc<WidgetRegistry>) -> Self {
        WidgetsController {
            namespace: namespace.trim_matches('/').to_string(),
            registry,
        }
    }

    /// Schemas for every registered type with a usable identifier. An empty
    /// registry is an empty list, not an error.
    pub fn get_types(&self) -> Vec<Schema> {
        self.registry
            .iter()
            .filter(|t| !t.id_base.is_empty())
            .filter_map(|t| self.get_type_schema(&t.id_base))
            .collect()
    }

    pub fn get_type(&self, id_base: Option<&str>) -> Result<Schema, ApiError> {
        let id_base = match id_base {
            Some(value) if !value.is_empty() => value,
            _ => return Err(ApiError::WidgetMissingType),
        };

        self.get_type_schema(id_base)
            .ok_or(ApiError::WidgetTypeNotFound)
    }

    /// Synthesize the schema for one widget type. Deterministic; the output
    /// depends only on the registry and the constant field table.
    pub fn get_type_schema(&self, id_base: &str) -> Option<Schema> {
        let widget = self.registry.find(id_base)?;

        let mut properties = BTreeMap::new();
        properties.insert(
            "id".to_string(),
            base_property("Unique identifier for the object."),
        );
        properties.insert(
            "type".to_string(),
            base_property("Type of Widget for the object."),
        );

        if TITLED_WIDGETS.contains(&id_base) {
            properties.insert(
                "title".to_string(),
                PropertySchema::string("The title for the object."),
            );
        }

        if let Some(fields) = CORE_WIDGET_FIELDS.get(id_base) {
            for (name, prop) in fields {
                properties.insert((*name).to_string(), prop.clone());
            }
        }

        // Fields without an explicit context annotation are visible in all
        // three contexts.
        for prop in properties.values_mut() {
            if prop.context.is_empty() {
                prop.context = RequestContext::ALL.to_vec();
            }
        }

        let mut schema = Schema::object(&widget.id_base);
        schema.properties = properties;
        Some(schema)
    }
}

fn base_property(description: &str) -> PropertySchema {
    PropertySchema::string(description)
        .context(&RequestContext::ALL)
        .readonly()
}

// ---- axum wiring ----

pub fn routes() -> Router {
    Router::new()
        .route("/widget-types", get(get_widget_types_handler))
        .route("/widgets/types/{type}", get(get_widget_type_handler))
        .route(
            "/widgets",
            get(widget_placeholder_handler).post(widget_placeholder_handler),
        )
        .route(
            "/widgets/{id_base}",
            get(widget_placeholder_handler)
                .put(widget_placeholder_handler)
                .patch(widget_placeholder_handler)
                .delete(widget_placeholder_handler),
        )
        .route(
            "/widgets/{id_base}/{number}",
            get(widget_placeholder_handler)
                .put(widget_placeholder_handler)
                .patch(widget_placeholder_handler)
                .delete(widget_placeholder_handler),
        )
}

pub async fn get_widget_types_handler(
    Extension(controller): Extension<Arc<WidgetsController>>,
) -> Result<Json<Value>, ApiError> {
    controller.check_read_permission()?;
    let schemas = controller.get_types();
    Ok(Json(serde_json::to_value(schemas).unwrap_or_else(|_| json!([]))))
}

pub async fn get_widget_type_handler(
    Extension(controller): Extension<Arc<WidgetsController>>,
    Path(id_base): Path<String>,
) -> Result<Json<Value>, ApiError> {
    controller.check_read_permission()?;
    let schema = controller.get_type(Some(&id_base))?;
    serde_json::to_value(schema)
        .map(Json)
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Widget instance storage is not wired up; the declared instance routes
/// answer with empty bodies after the permission check passes.
pub async fn widget_placeholder_handler(
    Extension(controller): Extension<Arc<WidgetsController>>,
) -> Result<Json<Value>, ApiError> {
    controller.check_read_permission()?;
    Ok(Json(Value::Null))
}
