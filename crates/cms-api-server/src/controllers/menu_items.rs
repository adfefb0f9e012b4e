//! Menu item resource adapter.
//!
//! Translates between the API field vocabulary and the persistence field
//! vocabulary, delegates storage to the object store, and shapes stored
//! posts back into menu item JSON.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Extension, Path, Query},
    http::{header, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::hooks::MenuItemHooks;
use crate::schema::{
    sanitize_value_from_schema, PropertySchema, RequestContext, Schema, SchemaType,
};
use crate::store::{
    NavMenuItem, ObjectStore, Post, PostQuery, PreparedMenuItem, SortOrder, NAV_MENU_ITEM_TYPE,
};
use crate::utils::{sanitize_token_list, ApiError};

use super::resource::ResourceController;

pub const REST_BASE: &str = "menu-items";

/// Persistence field name for each API field the write payload accepts.
/// Title is handled separately because it arrives in two shapes.
const FIELD_MAPPING: &[(&str, &str)] = &[
    ("menu-item-db-id", "db_id"),
    ("menu-item-object-id", "object_id"),
    ("menu-item-object", "object"),
    ("menu-item-parent-id", "menu_item_parent"),
    ("menu-item-position", "menu_order"),
    ("menu-item-type", "type"),
    ("menu-item-url", "url"),
    ("menu-item-description", "description"),
    ("menu-item-attr-title", "attr_title"),
    ("menu-item-target", "target"),
    ("menu-item-classes", "classes"),
    ("menu-item-xfn", "xfn"),
    ("menu-item-status", "status"),
];

/// Sort keys the collection accepts.
const ORDERBY_ENUM: &[&str] = &[
    "author",
    "date",
    "id",
    "include",
    "modified",
    "parent",
    "relevance",
    "slug",
    "include_slugs",
    "title",
    "menu_order",
];

/// API sort keys that differ from the store's own sort vocabulary.
const ORDERBY_MAPPINGS: &[(&str, &str)] = &[
    ("id", "ID"),
    ("include", "post__in"),
    ("slug", "post_name"),
    ("include_slugs", "post_name__in"),
    ("menu_order", "menu_order"),
];

/// Fields whose values require resolving the referenced object. Responses
/// that do not ask for any of them skip the lookups entirely.
const RESOLVED_FIELDS: &[&str] = &["title", "url", "link", "type_label", "_invalid"];

/// Translate an API sort key to the store's vocabulary. Unrecognized keys
/// pass through unchanged.
pub fn translate_orderby(key: &str) -> &str {
    ORDERBY_MAPPINGS
        .iter()
        .find(|(api, _)| *api == key)
        .map(|(_, store)| *store)
        .unwrap_or(key)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CollectionQuery {
    pub context: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub search: Option<String>,
    pub order: Option<String>,
    pub orderby: Option<String>,
    pub menu_order: Option<i64>,
    #[serde(rename = "_fields")]
    pub fields: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ItemQuery {
    pub context: Option<String>,
    #[serde(rename = "_fields")]
    pub fields: Option<String>,
}

#[derive(Debug)]
pub struct ListPage {
    pub items: Vec<Value>,
    pub total: usize,
    pub total_pages: usize,
}

#[derive(Debug)]
pub struct CreatedItem {
    pub id: u64,
    pub location: String,
    pub body: Value,
}

pub type AdditionalFieldGetter = Box<dyn Fn(&NavMenuItem) -> Value + Send + Sync>;
pub type AdditionalFieldUpdater =
    Box<dyn Fn(&Value, &NavMenuItem) -> Result<(), ApiError> + Send + Sync>;

/// A field registered onto the resource from outside the adapter. Its
/// schema joins the published item schema; its callbacks run during
/// response shaping and after every write.
pub struct AdditionalField {
    pub name: String,
    pub schema: PropertySchema,
    pub get: Option<AdditionalFieldGetter>,
    pub update: Option<AdditionalFieldUpdater>,
}

pub struct MenuItemsController {
    namespace: String,
    store: Arc<dyn ObjectStore>,
    hooks: Arc<MenuItemHooks>,
    additional_fields: Vec<AdditionalField>,
}

#[async_trait]
impl ResourceController for MenuItemsController {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn rest_base(&self) -> &str {
        REST_BASE
    }

    async fn item_schema(&self) -> Schema {
        self.schema().await
    }
}

impl MenuItemsController {
    pub fn new(namespace: &str, store: Arc<dyn ObjectStore>, hooks: Arc<MenuItemHooks>) -> Self {
        MenuItemsController {
            namespace: namespace.trim_matches('/').to_string(),
            store,
            hooks,
            additional_fields: Vec::new(),
        }
    }

    /// Register an additional field. Call before the controller is shared.
    pub fn with_field(mut self, field: AdditionalField) -> Self {
        self.additional_fields.push(field);
        self
    }

    /// The item schema. The `status` enumeration reflects the platform's
    /// currently registered non-internal statuses, so it can differ between
    /// deployments.
    pub async fn schema(&self) -> Schema {
        let statuses = self.store.post_statuses(false).await;

        let title = PropertySchema::object("The title for the object.")
            .context(&RequestContext::ALL)
            .property(
                "raw",
                PropertySchema::string("Title for the object, as it exists in the database.")
                    .context(&[RequestContext::Edit]),
            )
            .property(
                "rendered",
                PropertySchema::string("HTML title for the object, transformed for display.")
                    .context(&RequestContext::ALL)
                    .readonly(),
            );

        let mut schema = Schema::object(NAV_MENU_ITEM_TYPE)
            .with_property("title", title)
            .with_property(
                "id",
                PropertySchema::integer("Unique identifier for the object.")
                    .default_value(json!(0))
                    .context(&RequestContext::ALL)
                    .readonly(),
            )
            .with_property(
                "menu_id",
                PropertySchema::integer("Unique identifier for the menu.")
                    .context(&[RequestContext::Edit])
                    .default_value(json!(0)),
            )
            .with_property(
                "type",
                PropertySchema::string("Type of menu item.")
                    .one_of(
                        ["taxonomy", "post_type", "post_type_archive", "custom"]
                            .map(String::from)
                            .to_vec(),
                    )
                    .context(&RequestContext::ALL),
            )
            .with_property(
                "type_label",
                PropertySchema::string("The singular label used to describe this type of menu item.")
                    .context(&[RequestContext::View])
                    .readonly(),
            )
            .with_property(
                "status",
                PropertySchema::string("A named status for the object.")
                    .one_of(statuses)
                    .context(&[RequestContext::View, RequestContext::Edit]),
            )
            .with_property(
                "link",
                PropertySchema::string("URL to the object.")
                    .format("uri")
                    .context(&RequestContext::ALL)
                    .readonly(),
            )
            .with_property(
                "parent",
                PropertySchema::integer("The ID for the parent of the object.")
                    .context(&[RequestContext::View, RequestContext::Edit]),
            )
            .with_property(
                "attr_title",
                PropertySchema::string("The title attribute of the link element for this menu item.")
                    .context(&[RequestContext::View, RequestContext::Edit]),
            )
            .with_property(
                "classes",
                PropertySchema::array_of(
                    PropertySchema::new(SchemaType::String),
                    "The class attribute values for the link element of this menu item.",
                )
                .context(&[RequestContext::View, RequestContext::Edit]),
            )
            .with_property(
                "db_id",
                PropertySchema::integer(
                    "The DB ID of this item as a nav_menu_item object, or 0 if it is not stored.",
                )
                .context(&[RequestContext::View, RequestContext::Edit]),
            )
            .with_property(
                "description",
                PropertySchema::string("The description of this menu item.")
                    .context(&[RequestContext::View, RequestContext::Edit]),
            )
            .with_property(
                "menu_item_parent",
                PropertySchema::integer(
                    "The DB ID of the nav_menu_item that is this item's menu parent, or 0.",
                )
                .context(&[RequestContext::View, RequestContext::Edit]),
            )
            .with_property(
                "menu_order",
                PropertySchema::integer("Position of this item within its menu.")
                    .context(&[RequestContext::View, RequestContext::Edit]),
            )
            .with_property(
                "object",
                PropertySchema::string(
                    "The type of object originally represented, such as a category or a page.",
                )
                .context(&[RequestContext::View, RequestContext::Edit]),
            )
            .with_property(
                "object_id",
                PropertySchema::integer(
                    "The DB ID of the original object this menu item represents.",
                )
                .context(&[RequestContext::View, RequestContext::Edit]),
            )
            .with_property(
                "target",
                PropertySchema::string("The target attribute of the link element for this menu item.")
                    .context(&[RequestContext::View, RequestContext::Edit]),
            )
            .with_property(
                "url",
                PropertySchema::string("The URL to which this menu item points.")
                    .format("uri")
                    .context(&[RequestContext::View, RequestContext::Edit]),
            )
            .with_property(
                "xfn",
                PropertySchema::array_of(
                    PropertySchema::new(SchemaType::String),
                    "The XFN relationship expressed in the link of this menu item.",
                )
                .context(&[RequestContext::View, RequestContext::Edit]),
            )
            .with_property(
                "_invalid",
                PropertySchema::boolean("Whether the menu item represents an object that no longer exists.")
                    .context(&[RequestContext::View, RequestContext::Edit]),
            )
            .with_property(
                "meta",
                PropertySchema::object("Meta fields.")
                    .context(&[RequestContext::View, RequestContext::Edit]),
            );

        for field in &self.additional_fields {
            schema = schema.with_property(&field.name, field.schema.clone());
        }

        schema
    }

    pub async fn get_item(&self, id: u64, query: &ItemQuery) -> Result<Value, ApiError> {
        let post = self.fetch_item(id).await?;
        let context = parse_context(query.context.as_deref())?;
        self.prepare_item_for_response(&post, context, query.fields.as_deref())
            .await
    }

    pub async fn list_items(&self, params: &CollectionQuery) -> Result<ListPage, ApiError> {
        let context = parse_context(params.context.as_deref())?;

        let order = match params.order.as_deref() {
            None | Some("asc") => SortOrder::Asc,
            Some("desc") => SortOrder::Desc,
            Some(other) => {
                return Err(ApiError::InvalidParam(format!(
                    "order '{other}' is not one of asc, desc"
                )))
            }
        };

        let orderby = params.orderby.as_deref().unwrap_or("menu_order");
        if !ORDERBY_ENUM.contains(&orderby) {
            return Err(ApiError::InvalidParam(format!(
                "orderby '{orderby}' is not supported"
            )));
        }

        let query = PostQuery {
            post_type: NAV_MENU_ITEM_TYPE.to_string(),
            orderby: translate_orderby(orderby).to_string(),
            order,
            menu_order: params.menu_order,
            search: params.search.clone(),
            page: params.page.unwrap_or(1).max(1),
            per_page: params.per_page.unwrap_or(10).clamp(1, 100),
        };

        let (posts, total) = self.store.list_posts(query.clone()).await;
        let mut items = Vec::with_capacity(posts.len());
        for post in &posts {
            items.push(
                self.prepare_item_for_response(post, context, params.fields.as_deref())
                    .await?,
            );
        }

        Ok(ListPage {
            items,
            total,
            total_pages: query.total_pages(total),
        })
    }

    pub async fn create_item(&self, request: &Map<String, Value>) -> Result<CreatedItem, ApiError> {
        // An id in the body means the caller is addressing an existing item;
        // creation refuses it before anything touches the store.
        if request.get("id").map_or(false, id_is_present) {
            return Err(ApiError::PostExists);
        }

        let prepared = self.prepare_item_for_database(request, true).await?;
        let menu_id = request.get("menu_id").and_then(Value::as_u64).unwrap_or(0);

        let id = self
            .store
            .save_menu_item(menu_id, 0, prepared)
            .await
            .map_err(|e| ApiError::from_save_error(e, true))?;
        info!("created menu item {}", id);

        let body = self.finalize_write(id, request, true).await?;
        Ok(CreatedItem {
            id,
            location: self.resource_url(id),
            body,
        })
    }

    pub async fn update_item(&self, id: u64, request: &Map<String, Value>) -> Result<Value, ApiError> {
        // The target must already resolve to a valid item.
        self.fetch_item(id).await?;

        let prepared = self.prepare_item_for_database(request, false).await?;
        let menu_id = request.get("menu_id").and_then(Value::as_u64).unwrap_or(0);

        let stored = self
            .store
            .save_menu_item(menu_id, id, prepared)
            .await
            .map_err(|e| ApiError::from_save_error(e, false))?;

        self.finalize_write(stored, request, false).await
    }

    async fn fetch_item(&self, id: u64) -> Result<Post, ApiError> {
        self.store
            .get_post(id)
            .await
            .filter(|p| p.post_type == NAV_MENU_ITEM_TYPE)
            .ok_or(ApiError::PostNotFound)
    }

    /// Shared tail of the write pipeline: re-fetch, notify, apply metadata
    /// and additional fields, then serialize under the edit context. The
    /// first failure aborts and is returned as-is.
    async fn finalize_write(
        &self,
        id: u64,
        request: &Map<String, Value>,
        creating: bool,
    ) -> Result<Value, ApiError> {
        // A vanished post right after a successful write is a real
        // inconsistency, surfaced rather than ignored.
        let post = self.fetch_item(id).await?;
        let item = NavMenuItem::resolve(&post, self.store.as_ref()).await;
        self.hooks.emit_insert(&item, creating);

        if let Some(meta) = request.get("meta").and_then(Value::as_object) {
            self.store
                .update_meta(id, meta.clone())
                .await
                .map_err(ApiError::from_meta_error)?;
        }

        let post = self.fetch_item(id).await?;
        let item = NavMenuItem::resolve(&post, self.store.as_ref()).await;
        self.update_additional_fields(&item, request)?;
        self.hooks.emit_after_insert(&item, creating);

        self.prepare_item_for_response(&post, RequestContext::Edit, None)
            .await
    }

    /// Build the flat write payload from an API request.
    pub async fn prepare_item_for_database(
        &self,
        request: &Map<String, Value>,
        creating: bool,
    ) -> Result<PreparedMenuItem, ApiError> {
        let schema = self.schema().await;

        let mut prepared = match serde_json::to_value(PreparedMenuItem::default()) {
            Ok(Value::Object(map)) => map,
            _ => return Err(ApiError::Internal("default payload is not an object".to_string())),
        };

        for (storage_key, api_key) in FIELD_MAPPING {
            if let (Some(prop), Some(value)) = (schema.properties.get(*api_key), request.get(*api_key))
            {
                prepared.insert(
                    (*storage_key).to_string(),
                    sanitize_value_from_schema(value, prop),
                );
            }
        }

        // Title arrives either as a bare string or as an object carrying the
        // raw variant.
        if schema.properties.contains_key("title") {
            match request.get("title") {
                Some(Value::String(s)) => {
                    prepared.insert("menu-item-title".to_string(), Value::from(s.clone()));
                }
                Some(Value::Object(obj)) => {
                    if let Some(raw) = obj.get("raw").and_then(Value::as_str) {
                        if !raw.is_empty() {
                            prepared.insert("menu-item-title".to_string(), Value::from(raw));
                        }
                    }
                }
                _ => {}
            }
        }

        // Resolve the referenced object's sub-type when only the id came in.
        // A dangling reference fails the whole write before it can reach the
        // store.
        let object_missing = prepared
            .get("menu-item-object")
            .and_then(Value::as_str)
            .map_or(true, str::is_empty);
        let object_id = prepared
            .get("menu-item-object-id")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        if object_missing && object_id > 0 {
            let item_type = prepared
                .get("menu-item-type")
                .and_then(Value::as_str)
                .unwrap_or("");
            match item_type {
                "taxonomy" => {
                    let term = self
                        .store
                        .get_term(object_id)
                        .await
                        .ok_or(ApiError::InvalidTermId)?;
                    prepared.insert("menu-item-object".to_string(), Value::from(term.taxonomy));
                }
                "post_type" => {
                    let original = self
                        .store
                        .get_post(object_id)
                        .await
                        .ok_or(ApiError::InvalidPostId)?;
                    prepared.insert(
                        "menu-item-object".to_string(),
                        Value::from(original.post_type),
                    );
                }
                _ => {}
            }
        }

        // Class-like lists flatten to a single space-joined storage string.
        for key in ["menu-item-classes", "menu-item-xfn"] {
            let joined = join_class_tokens(prepared.get(key));
            prepared.insert(key.to_string(), Value::from(joined));
        }

        let mut item: PreparedMenuItem =
            serde_json::from_value(Value::Object(prepared)).map_err(|e| {
                ApiError::InvalidParam(format!("request body does not match the item schema: {e}"))
            })?;

        self.hooks.apply_pre_insert(&mut item, creating)?;
        Ok(item)
    }

    /// Shape a stored post into response JSON. Only requested fields are
    /// computed; reference lookups are skipped when no derived field was
    /// selected.
    pub async fn prepare_item_for_response(
        &self,
        post: &Post,
        context: RequestContext,
        fields_param: Option<&str>,
    ) -> Result<Value, ApiError> {
        let schema = self.schema().await;
        let fields = schema.fields_for_response(fields_param);
        let has = |name: &str| fields.iter().any(|f| f == name);

        let item = if RESOLVED_FIELDS.iter().any(|f| has(f)) {
            NavMenuItem::resolve(post, self.store.as_ref()).await
        } else {
            NavMenuItem::from_post(post)
        };

        let mut data = Map::new();
        if has("id") {
            data.insert("id".to_string(), json!(item.id));
        }
        if has("title") {
            data.insert(
                "title".to_string(),
                json!({ "raw": item.title_raw, "rendered": item.title_rendered }),
            );
        }
        if has("status") {
            data.insert("status".to_string(), json!(item.status));
        }
        if has("url") {
            data.insert("url".to_string(), json!(item.url));
        }
        if has("attr_title") {
            data.insert("attr_title".to_string(), json!(item.attr_title));
        }
        if has("description") {
            data.insert("description".to_string(), json!(item.description));
        }
        if has("type") {
            data.insert("type".to_string(), json!(item.item_type));
        }
        if has("type_label") {
            data.insert("type_label".to_string(), json!(item.type_label));
        }
        if has("object") {
            data.insert("object".to_string(), json!(item.object));
        }
        if has("object_id") {
            data.insert("object_id".to_string(), json!(item.object_id));
        }
        if has("parent") {
            data.insert("parent".to_string(), json!(item.post_parent));
        }
        if has("menu_item_parent") {
            data.insert("menu_item_parent".to_string(), json!(item.menu_item_parent));
        }
        if has("menu_order") {
            data.insert("menu_order".to_string(), json!(item.menu_order));
        }
        if has("target") {
            data.insert("target".to_string(), json!(item.target));
        }
        if has("classes") {
            data.insert("classes".to_string(), json!(item.classes));
        }
        if has("xfn") {
            data.insert("xfn".to_string(), json!(item.xfn));
        }
        if has("_invalid") {
            data.insert("_invalid".to_string(), json!(item.invalid));
        }
        if has("meta") {
            data.insert(
                "meta".to_string(),
                Value::Object(self.store.get_meta(item.id).await),
            );
        }

        for field in &self.additional_fields {
            if has(&field.name) {
                if let Some(get) = &field.get {
                    data.insert(field.name.clone(), get(&item));
                }
            }
        }

        data.retain(|key, _| {
            schema
                .properties
                .get(key)
                .map_or(true, |prop| prop.visible_in(context))
        });

        data.insert("_links".to_string(), self.prepare_links(&item).await);

        Ok(Value::Object(data))
    }

    async fn prepare_links(&self, item: &NavMenuItem) -> Value {
        let mut links = Map::new();
        links.insert(
            "self".to_string(),
            json!([{ "href": self.resource_url(item.id) }]),
        );
        links.insert(
            "collection".to_string(),
            json!([{ "href": self.collection_url() }]),
        );

        if item.object_id > 0 {
            match item.item_type.as_str() {
                "post_type" => {
                    if let Some(def) = self.store.post_type(&item.object).await {
                        if let Some(rest_base) = def.rest_base {
                            links.insert(
                                "object".to_string(),
                                json!([{
                                    "href": format!("/{}/{}/{}", self.namespace, rest_base, item.object_id),
                                    "post_type": item.item_type,
                                    "embeddable": true,
                                }]),
                            );
                        }
                    }
                }
                "taxonomy" => {
                    if let Some(def) = self.store.taxonomy(&item.object).await {
                        if let Some(rest_base) = def.rest_base {
                            links.insert(
                                "object".to_string(),
                                json!([{
                                    "href": format!("/{}/{}/{}", self.namespace, rest_base, item.object_id),
                                    "taxonomy": item.item_type,
                                    "embeddable": true,
                                }]),
                            );
                        }
                    }
                }
                _ => {}
            }
        }

        Value::Object(links)
    }

    fn update_additional_fields(
        &self,
        item: &NavMenuItem,
        request: &Map<String, Value>,
    ) -> Result<(), ApiError> {
        for field in &self.additional_fields {
            if let (Some(update), Some(value)) = (&field.update, request.get(&field.name)) {
                update(value, item)?;
            }
        }
        Ok(())
    }
}

fn id_is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Number(n) => n.as_u64() != Some(0),
        Value::String(s) => !matches!(s.as_str(), "" | "0"),
        _ => true,
    }
}

fn parse_context(param: Option<&str>) -> Result<RequestContext, ApiError> {
    match param {
        Some(value) => RequestContext::parse(value),
        None => Ok(RequestContext::View),
    }
}

fn join_class_tokens(value: Option<&Value>) -> String {
    match value {
        Some(Value::Array(items)) => {
            sanitize_token_list(items.iter().filter_map(Value::as_str))
        }
        Some(Value::String(s)) => sanitize_token_list(s.split_whitespace()),
        _ => String::new(),
    }
}

// ---- axum wiring ----

pub fn routes() -> Router {
    Router::new()
        .route(
            "/menu-items",
            get(list_menu_items_handler).post(create_menu_item_handler),
        )
        .route(
            "/menu-items/{id}",
            get(get_menu_item_handler)
                .put(update_menu_item_handler)
                .patch(update_menu_item_handler),
        )
}

pub async fn list_menu_items_handler(
    Extension(controller): Extension<Arc<MenuItemsController>>,
    Query(params): Query<CollectionQuery>,
) -> Result<Response, ApiError> {
    controller.check_read_permission()?;
    let page = controller.list_items(&params).await?;
    let headers = AppendHeaders([
        ("x-total-count", page.total.to_string()),
        ("x-total-pages", page.total_pages.to_string()),
    ]);
    Ok((headers, Json(Value::Array(page.items))).into_response())
}

pub async fn get_menu_item_handler(
    Extension(controller): Extension<Arc<MenuItemsController>>,
    Path(id): Path<u64>,
    Query(query): Query<ItemQuery>,
) -> Result<Json<Value>, ApiError> {
    controller.check_read_permission()?;
    Ok(Json(controller.get_item(id, &query).await?))
}

pub async fn create_menu_item_handler(
    Extension(controller): Extension<Arc<MenuItemsController>>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    controller.check_write_permission()?;
    let request = body
        .as_object()
        .ok_or_else(|| ApiError::InvalidParam("request body must be a JSON object".to_string()))?;

    let created = controller.create_item(request).await?;
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, created.location)],
        Json(created.body),
    )
        .into_response())
}

pub async fn update_menu_item_handler(
    Extension(controller): Extension<Arc<MenuItemsController>>,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    controller.check_write_permission()?;
    let request = body
        .as_object()
        .ok_or_else(|| ApiError::InvalidParam("request body must be a JSON object".to_string()))?;
    Ok(Json(controller.update_item(id, request).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, MockObjectStore, StoreError};

    fn controller_with(store: Arc<MemoryStore>) -> MenuItemsController {
        MenuItemsController::new("cms/v1", store, Arc::new(MenuItemHooks::new()))
    }

    fn setup() -> (Arc<MemoryStore>, MenuItemsController) {
        let store = Arc::new(MemoryStore::with_defaults("http://localhost:8080"));
        let controller = controller_with(store.clone());
        (store, controller)
    }

    fn request(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn orderby_translation_table() {
        assert_eq!(translate_orderby("id"), "ID");
        assert_eq!(translate_orderby("include"), "post__in");
        assert_eq!(translate_orderby("slug"), "post_name");
        assert_eq!(translate_orderby("include_slugs"), "post_name__in");
        assert_eq!(translate_orderby("menu_order"), "menu_order");
        // Unrecognized keys pass through untouched.
        assert_eq!(translate_orderby("date"), "date");
        assert_eq!(translate_orderby("weird"), "weird");
    }

    #[tokio::test]
    async fn prepare_applies_defaults_and_mapping() {
        let (_, controller) = setup();
        let prepared = controller
            .prepare_item_for_database(
                &request(json!({
                    "title": "Home",
                    "url": "https://example.com/",
                    "menu_order": "7",
                    "target": "_blank",
                })),
                true,
            )
            .await
            .unwrap();

        assert_eq!(prepared.title, "Home");
        assert_eq!(prepared.url, "https://example.com/");
        assert_eq!(prepared.position, 7);
        assert_eq!(prepared.target, "_blank");
        // Untouched fields keep the fixed defaults.
        assert_eq!(prepared.item_type, "custom");
        assert_eq!(prepared.status, "publish");
        assert_eq!(prepared.db_id, 0);
    }

    #[tokio::test]
    async fn prepare_accepts_title_object_with_raw() {
        let (_, controller) = setup();
        let prepared = controller
            .prepare_item_for_database(
                &request(json!({ "title": { "raw": "From Raw" } })),
                true,
            )
            .await
            .unwrap();
        assert_eq!(prepared.title, "From Raw");
    }

    #[tokio::test]
    async fn prepare_resolves_taxonomy_object_from_id() {
        let (store, controller) = setup();
        let term = store.insert_term("category", "News", "news");

        let prepared = controller
            .prepare_item_for_database(
                &request(json!({ "type": "taxonomy", "object_id": term })),
                true,
            )
            .await
            .unwrap();
        assert_eq!(prepared.object, "category");
    }

    #[tokio::test]
    async fn prepare_rejects_dangling_references() {
        let (store, controller) = setup();

        let err = controller
            .prepare_item_for_database(
                &request(json!({ "type": "taxonomy", "object_id": 555 })),
                true,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "rest_term_invalid_id");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = controller
            .prepare_item_for_database(
                &request(json!({ "type": "post_type", "object_id": 555 })),
                true,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "rest_post_invalid_id");

        // Nothing was written along the way.
        let (_, total) = store
            .list_posts(PostQuery::for_type(NAV_MENU_ITEM_TYPE))
            .await;
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn prepare_joins_class_lists() {
        let (_, controller) = setup();
        let prepared = controller
            .prepare_item_for_database(
                &request(json!({
                    "classes": ["current", "menu item!", ""],
                    "xfn": ["friend", "met"],
                })),
                true,
            )
            .await
            .unwrap();
        assert_eq!(prepared.classes, "current menuitem");
        assert_eq!(prepared.xfn, "friend met");
    }

    #[tokio::test]
    async fn pre_insert_filter_can_reject_the_write() {
        let store = Arc::new(MemoryStore::with_defaults("http://localhost:8080"));
        let hooks = Arc::new(MenuItemHooks::new());
        hooks.register_pre_insert(|item, _| {
            if item.url.starts_with("ftp:") {
                return Err(ApiError::InvalidParam("ftp links are not allowed".to_string()));
            }
            Ok(())
        });
        let controller = MenuItemsController::new("cms/v1", store.clone(), hooks);

        let err = controller
            .create_item(&request(json!({ "url": "ftp://example.com" })))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "rest_invalid_param");

        let (_, total) = store
            .list_posts(PostQuery::for_type(NAV_MENU_ITEM_TYPE))
            .await;
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn create_rejects_an_existing_id() {
        let (store, controller) = setup();
        let err = controller
            .create_item(&request(json!({ "id": 12, "title": "Nope" })))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "rest_post_exists");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let (_, total) = store
            .list_posts(PostQuery::for_type(NAV_MENU_ITEM_TYPE))
            .await;
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn create_round_trips_supplied_fields() {
        let (_, controller) = setup();
        let created = controller
            .create_item(&request(json!({
                "title": "Docs",
                "url": "https://example.com/docs",
                "classes": ["primary", "wide"],
                "xfn": ["me"],
                "menu_order": 3,
                "attr_title": "Documentation",
                "description": "All the docs",
            })))
            .await
            .unwrap();

        assert_eq!(created.location, format!("/cms/v1/menu-items/{}", created.id));
        let body = created.body.as_object().unwrap();
        assert_eq!(body["id"], json!(created.id));
        assert_eq!(body["title"]["raw"], json!("Docs"));
        assert_eq!(body["title"]["rendered"], json!("Docs"));
        assert_eq!(body["url"], json!("https://example.com/docs"));
        assert_eq!(body["classes"], json!(["primary", "wide"]));
        assert_eq!(body["xfn"], json!(["me"]));
        assert_eq!(body["menu_order"], json!(3));
        assert_eq!(body["attr_title"], json!("Documentation"));
        assert_eq!(body["description"], json!("All the docs"));
        assert_eq!(body["status"], json!("publish"));
        assert_eq!(body["type"], json!("custom"));
        // The write response is shaped under the edit context, which the
        // view-only type label is not part of.
        assert!(!body.contains_key("type_label"));
    }

    #[tokio::test]
    async fn view_context_includes_the_type_label() {
        let (_, controller) = setup();
        let created = controller
            .create_item(&request(json!({ "title": "Home", "url": "https://example.com" })))
            .await
            .unwrap();

        let body = controller
            .get_item(created.id, &ItemQuery::default())
            .await
            .unwrap();
        assert_eq!(body["type_label"], json!("Custom Link"));
        assert_eq!(body["_invalid"], json!(false));
        assert_eq!(body["_links"]["self"][0]["href"], json!(created.location));
    }

    #[tokio::test]
    async fn field_selection_limits_the_response() {
        let (_, controller) = setup();
        let created = controller
            .create_item(&request(json!({ "title": "Home" })))
            .await
            .unwrap();

        let query = ItemQuery {
            fields: Some("id,title".to_string()),
            ..Default::default()
        };
        let body = controller.get_item(created.id, &query).await.unwrap();
        let map = body.as_object().unwrap();
        assert!(map.contains_key("id"));
        assert!(map.contains_key("title"));
        assert!(!map.contains_key("url"));
    }

    #[tokio::test]
    async fn missing_items_are_not_found() {
        let (_, controller) = setup();
        let err = controller
            .get_item(404, &ItemQuery::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "rest_post_invalid_id");
    }

    #[tokio::test]
    async fn update_requires_a_valid_item() {
        let (_, controller) = setup();
        let err = controller
            .update_item(999, &request(json!({ "title": "x" })))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_replaces_fields() {
        let (_, controller) = setup();
        let created = controller
            .create_item(&request(json!({ "title": "Old", "url": "https://example.com" })))
            .await
            .unwrap();

        let body = controller
            .update_item(created.id, &request(json!({ "title": "New" })))
            .await
            .unwrap();
        assert_eq!(body["title"]["raw"], json!("New"));
        assert_eq!(body["id"], json!(created.id));
    }

    #[tokio::test]
    async fn meta_failures_abort_with_the_subsystem_status() {
        let (_, controller) = setup();
        let err = controller
            .create_item(&request(json!({
                "title": "With meta",
                "meta": { "unregistered": 1 },
            })))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.code(), "invalid_meta_key");
    }

    #[tokio::test]
    async fn insert_failure_maps_to_server_error() {
        let mut mock = MockObjectStore::new();
        mock.expect_post_statuses()
            .returning(|_| vec!["publish".to_string()]);
        mock.expect_save_menu_item()
            .returning(|_, _, _| Err(StoreError::db_insert()));

        let controller = MenuItemsController::new(
            "cms/v1",
            Arc::new(mock),
            Arc::new(MenuItemHooks::new()),
        );

        let err = controller
            .create_item(&request(json!({ "title": "x" })))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "db_insert_error");
    }

    #[tokio::test]
    async fn non_insert_store_failures_are_client_errors() {
        let (_, controller) = setup();
        // No menu term with this id exists.
        let err = controller
            .create_item(&request(json!({ "title": "x", "menu_id": 777 })))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "invalid_menu_id");
    }

    #[tokio::test]
    async fn list_filters_on_menu_order_and_sorts() {
        let (_, controller) = setup();
        for (title, order) in [("b", 2), ("a", 1), ("c", 3)] {
            controller
                .create_item(&request(json!({ "title": title, "menu_order": order })))
                .await
                .unwrap();
        }

        let page = controller
            .list_items(&CollectionQuery::default())
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        let titles: Vec<_> = page
            .items
            .iter()
            .map(|i| i["title"]["raw"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(titles, ["a", "b", "c"]);

        let page = controller
            .list_items(&CollectionQuery {
                menu_order: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0]["title"]["raw"], json!("b"));
    }

    #[tokio::test]
    async fn list_rejects_unknown_sort_parameters() {
        let (_, controller) = setup();
        let err = controller
            .list_items(&CollectionQuery {
                order: Some("sideways".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "rest_invalid_param");

        let err = controller
            .list_items(&CollectionQuery {
                orderby: Some("karma".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "rest_invalid_param");
    }

    #[tokio::test]
    async fn schema_status_enum_tracks_the_registry() {
        let store = Arc::new(MemoryStore::new("http://localhost:8080"));
        store.register_status("publish", false);
        store.register_status("limbo", false);
        store.register_status("trash", true);
        let controller = controller_with(store);

        let schema = controller.schema().await;
        let statuses = schema.properties["status"].one_of.clone().unwrap();
        assert_eq!(statuses, vec!["publish".to_string(), "limbo".to_string()]);
    }

    #[tokio::test]
    async fn additional_fields_join_schema_response_and_write() {
        let store = Arc::new(MemoryStore::with_defaults("http://localhost:8080"));
        let controller = controller_with(store.clone()).with_field(AdditionalField {
            name: "badge".to_string(),
            schema: PropertySchema::string("A badge.").context(&RequestContext::ALL),
            get: Some(Box::new(|item| json!(format!("item-{}", item.id)))),
            update: Some(Box::new(|value, _| {
                if value.as_str() == Some("forbidden") {
                    Err(ApiError::InvalidParam("bad badge".to_string()))
                } else {
                    Ok(())
                }
            })),
        });

        let schema = controller.schema().await;
        assert!(schema.properties.contains_key("badge"));

        let created = controller
            .create_item(&request(json!({ "title": "x", "badge": "ok" })))
            .await
            .unwrap();
        assert_eq!(
            created.body["badge"],
            json!(format!("item-{}", created.id))
        );

        let err = controller
            .create_item(&request(json!({ "title": "x", "badge": "forbidden" })))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "rest_invalid_param");
    }
}
