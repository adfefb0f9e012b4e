//! Navigation menu item read view.
//!
//! A menu item is stored as a plain post plus reserved meta keys. The view
//! here is synthesized per request and never persisted in this shape.

use super::models::Post;
use super::ObjectStore;

/// Title transform applied to password-protected entries outside of menu
/// rendering.
const PROTECTED_TITLE_FORMAT: &str = "Protected: %s";

/// Menu item resolution renders titles without the protected prefix.
const PLAIN_TITLE_FORMAT: &str = "%s";

const CUSTOM_LINK_LABEL: &str = "Custom Link";

#[derive(Debug, Clone)]
pub struct NavMenuItem {
    pub id: u64,
    pub db_id: u64,
    /// Parent within the menu tree. Distinct from `post_parent`.
    pub menu_item_parent: u64,
    /// Parent of the underlying post entity.
    pub post_parent: u64,
    pub menu_order: i64,
    pub item_type: String,
    pub type_label: String,
    pub object: String,
    pub object_id: u64,
    pub url: String,
    pub title_raw: String,
    pub title_rendered: String,
    pub target: String,
    pub attr_title: String,
    pub description: String,
    pub classes: Vec<String>,
    pub xfn: Vec<String>,
    pub status: String,
    /// True when the referenced object no longer exists.
    pub invalid: bool,
}

impl NavMenuItem {
    /// Build the view from persistence fields alone, without any reference
    /// lookups. Derived fields keep their unresolved fallbacks.
    pub fn from_post(post: &Post) -> Self {
        let item_type = {
            let t = post.meta_str("_menu_item_type");
            if t.is_empty() { "custom" } else { t }.to_string()
        };
        let type_label = if item_type == "custom" {
            CUSTOM_LINK_LABEL.to_string()
        } else {
            item_type.clone()
        };

        NavMenuItem {
            id: post.id,
            db_id: post.id,
            menu_item_parent: post.meta_u64("_menu_item_menu_item_parent"),
            post_parent: post.parent,
            menu_order: post.menu_order,
            type_label,
            object: post.meta_str("_menu_item_object").to_string(),
            object_id: post.meta_u64("_menu_item_object_id"),
            url: post.meta_str("_menu_item_url").to_string(),
            title_raw: post.title.clone(),
            title_rendered: render_title(&post.title, post.password.is_some(), PLAIN_TITLE_FORMAT),
            target: post.meta_str("_menu_item_target").to_string(),
            attr_title: post.excerpt.clone(),
            description: post.content.clone(),
            classes: split_tokens(post.meta_str("_menu_item_classes")),
            xfn: split_tokens(post.meta_str("_menu_item_xfn")),
            status: post.status.clone(),
            invalid: false,
            item_type,
        }
    }

    /// Build the view and resolve the referenced object: title fallback,
    /// resolved link, human type label and the validity flag.
    pub async fn resolve(post: &Post, store: &dyn ObjectStore) -> Self {
        let mut item = Self::from_post(post);

        match item.item_type.as_str() {
            "post_type" => {
                item.type_label = match store.post_type(&item.object).await {
                    Some(def) => def.label,
                    None => item.object.clone(),
                };
                match store.get_post(item.object_id).await {
                    Some(original) => {
                        if item.title_raw.is_empty() {
                            item.title_raw = original.title.clone();
                            item.title_rendered = render_title(
                                &original.title,
                                original.password.is_some(),
                                PLAIN_TITLE_FORMAT,
                            );
                        }
                        item.url = store.permalink(&original);
                    }
                    None => item.invalid = true,
                }
            }
            "taxonomy" => {
                item.type_label = match store.taxonomy(&item.object).await {
                    Some(def) => def.label,
                    None => item.object.clone(),
                };
                match store.get_term(item.object_id).await {
                    Some(term) => {
                        item.url = store.term_link(&term);
                        if item.title_raw.is_empty() {
                            item.title_raw = term.name.clone();
                            item.title_rendered = term.name;
                        }
                    }
                    None => item.invalid = true,
                }
            }
            "post_type_archive" => match store.post_type(&item.object).await {
                Some(def) => item.type_label = def.label,
                None => item.invalid = true,
            },
            _ => item.type_label = CUSTOM_LINK_LABEL.to_string(),
        }

        item
    }
}

fn render_title(raw: &str, protected: bool, format: &str) -> String {
    if protected {
        format.replace("%s", raw)
    } else {
        raw.to_string()
    }
}

/// The stock transform, kept for callers that render titles outside menu
/// resolution.
pub fn protected_title(raw: &str) -> String {
    render_title(raw, true, PROTECTED_TITLE_FORMAT)
}

fn split_tokens(joined: &str) -> Vec<String> {
    joined.split_whitespace().map(str::to_string).collect()
}
