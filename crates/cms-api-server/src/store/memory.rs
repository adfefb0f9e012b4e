//! In-memory object store.
//!
//! Stands in for the platform persistence engine behind [`ObjectStore`].
//! Maps are guarded with `parking_lot` locks; lock scope is a single call
//! and never spans an await point.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::{Map, Value};

use super::models::{Post, PostTypeDef, PreparedMenuItem, StatusDef, StoreError, TaxonomyDef, Term};
use super::query::{PostQuery, SortOrder};
use super::{ObjectStore, NAV_MENU_ITEM_TYPE, NAV_MENU_TAXONOMY};

pub struct MemoryStore {
    home_url: String,
    posts: RwLock<BTreeMap<u64, Post>>,
    terms: RwLock<BTreeMap<u64, Term>>,
    post_types: RwLock<BTreeMap<String, PostTypeDef>>,
    taxonomies: RwLock<BTreeMap<String, TaxonomyDef>>,
    statuses: RwLock<Vec<StatusDef>>,
    registered_meta: RwLock<BTreeMap<String, Value>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new(home_url: &str) -> Self {
        MemoryStore {
            home_url: home_url.trim_end_matches('/').to_string(),
            posts: RwLock::new(BTreeMap::new()),
            terms: RwLock::new(BTreeMap::new()),
            post_types: RwLock::new(BTreeMap::new()),
            taxonomies: RwLock::new(BTreeMap::new()),
            statuses: RwLock::new(Vec::new()),
            registered_meta: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// A store pre-loaded with the stock content model: the standard status
    /// set, the built-in post types and the built-in taxonomies.
    pub fn with_defaults(home_url: &str) -> Self {
        let store = MemoryStore::new(home_url);

        for (name, internal) in [
            ("publish", false),
            ("future", false),
            ("draft", false),
            ("pending", false),
            ("private", false),
            ("trash", true),
            ("auto-draft", true),
            ("inherit", true),
        ] {
            store.register_status(name, internal);
        }

        store.register_post_type("post", "Post", Some("posts"));
        store.register_post_type("page", "Page", Some("pages"));
        store.register_post_type(NAV_MENU_ITEM_TYPE, "Navigation Menu Item", None);

        store.register_taxonomy("category", "Category", Some("categories"));
        store.register_taxonomy("post_tag", "Tag", Some("tags"));
        store.register_taxonomy(NAV_MENU_TAXONOMY, "Navigation Menu", None);

        store
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    // ---- registration, done once at bootstrap ----

    pub fn register_status(&self, name: &str, internal: bool) {
        self.statuses.write().push(StatusDef {
            name: name.to_string(),
            internal,
        });
    }

    pub fn register_post_type(&self, name: &str, label: &str, rest_base: Option<&str>) {
        self.post_types.write().insert(
            name.to_string(),
            PostTypeDef {
                name: name.to_string(),
                label: label.to_string(),
                rest_base: rest_base.map(str::to_string),
            },
        );
    }

    pub fn register_taxonomy(&self, name: &str, label: &str, rest_base: Option<&str>) {
        self.taxonomies.write().insert(
            name.to_string(),
            TaxonomyDef {
                name: name.to_string(),
                label: label.to_string(),
                rest_base: rest_base.map(str::to_string),
            },
        );
    }

    /// Expose a meta key over the REST surface, with its default value.
    pub fn register_meta_key(&self, key: &str, default: Value) {
        self.registered_meta.write().insert(key.to_string(), default);
    }

    // ---- direct content manipulation, used by bootstrap and tests ----

    pub fn insert_post(&self, mut post: Post) -> u64 {
        let id = self.allocate_id();
        post.id = id;
        self.posts.write().insert(id, post);
        id
    }

    pub fn insert_term(&self, taxonomy: &str, name: &str, slug: &str) -> u64 {
        let id = self.allocate_id();
        self.terms.write().insert(
            id,
            Term {
                id,
                taxonomy: taxonomy.to_string(),
                name: name.to_string(),
                slug: slug.to_string(),
            },
        );
        id
    }

    pub fn remove_post(&self, id: u64) -> Option<Post> {
        self.posts.write().remove(&id)
    }

    fn menu_exists(&self, menu_id: u64) -> bool {
        self.terms
            .read()
            .get(&menu_id)
            .map_or(false, |t| t.taxonomy == NAV_MENU_TAXONOMY)
    }

    fn apply_payload(post: &mut Post, menu_id: u64, item: &PreparedMenuItem) {
        post.title = item.title.clone();
        post.content = item.description.clone();
        post.excerpt = item.attr_title.clone();
        post.status = item.status.clone();
        post.menu_order = item.position;
        post.modified_at = Utc::now();

        post.meta
            .insert("_menu_item_type".to_string(), Value::from(item.item_type.clone()));
        post.meta.insert(
            "_menu_item_menu_item_parent".to_string(),
            Value::from(item.parent_id),
        );
        post.meta
            .insert("_menu_item_object_id".to_string(), Value::from(item.object_id));
        post.meta
            .insert("_menu_item_object".to_string(), Value::from(item.object.clone()));
        post.meta
            .insert("_menu_item_target".to_string(), Value::from(item.target.clone()));
        post.meta
            .insert("_menu_item_classes".to_string(), Value::from(item.classes.clone()));
        post.meta
            .insert("_menu_item_xfn".to_string(), Value::from(item.xfn.clone()));
        post.meta
            .insert("_menu_item_url".to_string(), Value::from(item.url.clone()));
        if menu_id > 0 {
            post.meta
                .insert("_menu_item_menu_id".to_string(), Value::from(menu_id));
        }
    }
}

fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_dash = true;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_post(&self, id: u64) -> Option<Post> {
        self.posts.read().get(&id).cloned()
    }

    async fn list_posts(&self, query: PostQuery) -> (Vec<Post>, usize) {
        let posts = self.posts.read();
        let needle = query.search.as_deref().map(str::to_lowercase);

        let mut matches: Vec<Post> = posts
            .values()
            .filter(|p| p.post_type == query.post_type)
            .filter(|p| query.menu_order.map_or(true, |mo| p.menu_order == mo))
            .filter(|p| {
                needle.as_deref().map_or(true, |n| {
                    p.title.to_lowercase().contains(n) || p.content.to_lowercase().contains(n)
                })
            })
            .cloned()
            .collect();
        drop(posts);

        match query.orderby.as_str() {
            // Explicit id-list orderings degrade to primary-key order when no
            // id list accompanies the query.
            "ID" | "post__in" | "post_name__in" => matches.sort_by_key(|p| p.id),
            "post_name" => matches.sort_by(|a, b| a.name.cmp(&b.name)),
            "date" => matches.sort_by_key(|p| p.created_at),
            "modified" => matches.sort_by_key(|p| p.modified_at),
            "title" => matches.sort_by(|a, b| a.title.cmp(&b.title)),
            "parent" => matches.sort_by_key(|p| p.parent),
            "author" => matches.sort_by_key(|p| p.author),
            _ => matches.sort_by_key(|p| (p.menu_order, p.id)),
        }
        if query.order == SortOrder::Desc {
            matches.reverse();
        }

        let total = matches.len();
        let page = query.page.max(1);
        let start = (page - 1).saturating_mul(query.per_page);
        let items = matches
            .into_iter()
            .skip(start)
            .take(query.per_page)
            .collect();

        (items, total)
    }

    async fn get_term(&self, id: u64) -> Option<Term> {
        self.terms.read().get(&id).cloned()
    }

    async fn post_type(&self, name: &str) -> Option<PostTypeDef> {
        self.post_types.read().get(name).cloned()
    }

    async fn taxonomy(&self, name: &str) -> Option<TaxonomyDef> {
        self.taxonomies.read().get(name).cloned()
    }

    async fn post_statuses(&self, include_internal: bool) -> Vec<String> {
        self.statuses
            .read()
            .iter()
            .filter(|s| include_internal || !s.internal)
            .map(|s| s.name.clone())
            .collect()
    }

    async fn save_menu_item(
        &self,
        menu_id: u64,
        item_id: u64,
        item: PreparedMenuItem,
    ) -> Result<u64, StoreError> {
        if menu_id > 0 && !self.menu_exists(menu_id) {
            return Err(StoreError::new("invalid_menu_id", "Invalid menu ID."));
        }

        if item_id == 0 {
            let id = self.allocate_id();
            let now = Utc::now();
            let name = if item.title.is_empty() {
                format!("menu-item-{id}")
            } else {
                slugify(&item.title)
            };
            let mut post = Post {
                id,
                post_type: NAV_MENU_ITEM_TYPE.to_string(),
                title: String::new(),
                content: String::new(),
                excerpt: String::new(),
                status: String::new(),
                parent: 0,
                menu_order: 0,
                name,
                author: 0,
                password: None,
                created_at: now,
                modified_at: now,
                meta: Map::new(),
            };
            Self::apply_payload(&mut post, menu_id, &item);
            self.posts.write().insert(id, post);
            Ok(id)
        } else {
            let mut posts = self.posts.write();
            let post = posts.get_mut(&item_id).ok_or_else(StoreError::db_update)?;
            Self::apply_payload(post, menu_id, &item);
            Ok(item_id)
        }
    }

    async fn get_meta(&self, post_id: u64) -> Map<String, Value> {
        let registered = self.registered_meta.read();
        let posts = self.posts.read();
        let stored = posts.get(&post_id).map(|p| &p.meta);

        registered
            .iter()
            .map(|(key, default)| {
                let value = stored
                    .and_then(|m| m.get(key))
                    .cloned()
                    .unwrap_or_else(|| default.clone());
                (key.clone(), value)
            })
            .collect()
    }

    async fn update_meta(
        &self,
        post_id: u64,
        values: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let registered = self.registered_meta.read();
        for key in values.keys() {
            if !registered.contains_key(key) {
                return Err(StoreError::new(
                    "invalid_meta_key",
                    &format!("Meta key '{key}' is not registered."),
                )
                .with_status(403));
            }
        }
        drop(registered);

        let mut posts = self.posts.write();
        let post = posts.get_mut(&post_id).ok_or_else(|| {
            StoreError::new("invalid_post_id", "Invalid post ID.").with_status(404)
        })?;
        for (key, value) in values {
            post.meta.insert(key, value);
        }
        Ok(())
    }

    fn permalink(&self, post: &Post) -> String {
        format!("{}/?p={}", self.home_url, post.id)
    }

    fn term_link(&self, term: &Term) -> String {
        format!("{}/?{}={}", self.home_url, term.taxonomy, term.id)
    }
}
