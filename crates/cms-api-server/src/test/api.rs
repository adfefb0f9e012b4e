//! End-to-end tests against the assembled router.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::controllers::{build_router, MenuItemsController, WidgetsController};
use crate::hooks::MenuItemHooks;
use crate::store::{MemoryStore, ObjectStore, WidgetRegistry};

const NAMESPACE: &str = "cms/v1";

fn app() -> (Arc<MemoryStore>, Router) {
    let store = Arc::new(MemoryStore::with_defaults("http://localhost:8080"));
    let menu_items = Arc::new(MenuItemsController::new(
        NAMESPACE,
        store.clone() as Arc<dyn ObjectStore>,
        Arc::new(MenuItemHooks::new()),
    ));
    let widgets = Arc::new(WidgetsController::new(
        NAMESPACE,
        Arc::new(WidgetRegistry::with_builtin()),
    ));
    (store, build_router(menu_items, widgets, NAMESPACE))
}

fn get(path: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(path)
        .body(Body::empty())
        .unwrap()
}

fn send_json(method: &str, path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}

#[tokio::test]
async fn health_endpoints_respond() {
    let (_, app) = app();
    let response = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("healthy"));

    let response = app.oneshot(get("/health/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_returns_created_with_location() {
    let (_, app) = app();
    let response = app
        .oneshot(send_json(
            "POST",
            "/cms/v1/menu-items",
            json!({ "title": "Home", "url": "https://example.com/" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    let body = body_json(response).await;
    let id = body["id"].as_u64().unwrap();
    assert_eq!(location, format!("/cms/v1/menu-items/{id}"));
    assert_eq!(body["title"]["raw"], json!("Home"));
}

#[tokio::test]
async fn create_with_id_is_a_structured_conflict() {
    let (_, app) = app();
    let response = app
        .oneshot(send_json(
            "POST",
            "/cms/v1/menu-items",
            json!({ "id": 3, "title": "Nope" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], json!("rest_post_exists"));
    assert_eq!(body["message"], json!("Cannot create existing post."));
    assert_eq!(body["data"]["status"], json!(400));
}

#[tokio::test]
async fn read_after_create_round_trips() {
    let (_, app) = app();
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/cms/v1/menu-items",
            json!({
                "title": "Docs",
                "url": "https://example.com/docs",
                "classes": ["primary"],
            }),
        ))
        .await
        .unwrap();
    let created = body_json(response).await;
    let id = created["id"].as_u64().unwrap();

    let response = app
        .oneshot(get(&format!("/cms/v1/menu-items/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["title"]["raw"], json!("Docs"));
    assert_eq!(body["url"], json!("https://example.com/docs"));
    assert_eq!(body["classes"], json!(["primary"]));
    assert_eq!(body["type_label"], json!("Custom Link"));
}

#[tokio::test]
async fn update_via_put_changes_the_item() {
    let (_, app) = app();
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/cms/v1/menu-items",
            json!({ "title": "Old" }),
        ))
        .await
        .unwrap();
    let id = body_json(response).await["id"].as_u64().unwrap();

    let response = app
        .oneshot(send_json(
            "PUT",
            &format!("/cms/v1/menu-items/{id}"),
            json!({ "title": "New" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["title"]["raw"], json!("New"));
}

#[tokio::test]
async fn missing_item_is_not_found() {
    let (_, app) = app();
    let response = app
        .oneshot(get("/cms/v1/menu-items/9001"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["code"], json!("rest_post_invalid_id"));
    assert_eq!(body["data"]["status"], json!(404));
}

#[tokio::test]
async fn listing_carries_pagination_headers() {
    let (_, app) = app();
    for title in ["a", "b", "c"] {
        app.clone()
            .oneshot(send_json(
                "POST",
                "/cms/v1/menu-items",
                json!({ "title": title }),
            ))
            .await
            .unwrap();
    }

    let response = app
        .oneshot(get("/cms/v1/menu-items?per_page=2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-total-count"], "3");
    assert_eq!(response.headers()["x-total-pages"], "2");
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn widget_type_collection_and_lookup() {
    let (_, app) = app();

    let response = app.clone().oneshot(get("/cms/v1/widget-types")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 12);

    let response = app
        .clone()
        .oneshot(get("/cms/v1/widgets/types/rss"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["title"], json!("rss"));
    assert_eq!(body["properties"]["items"]["default"], json!(10));

    let response = app
        .oneshot(get("/cms/v1/widgets/types/hologram"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["code"], json!("rest_widget_type_not_found"));
}

#[tokio::test]
async fn widget_instance_routes_are_placeholders() {
    let (_, app) = app();

    for path in ["/cms/v1/widgets", "/cms/v1/widgets/text", "/cms/v1/widgets/text/2"] {
        let response = app.clone().oneshot(get(path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{path}");
        assert_eq!(body_json(response).await, Value::Null, "{path}");
    }
}

#[tokio::test]
async fn taxonomy_reference_resolution_spans_the_full_pipeline() {
    let (store, app) = app();
    let term = store.insert_term("category", "News", "news");

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/cms/v1/menu-items",
            json!({ "type": "taxonomy", "object_id": term }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["object"], json!("category"));
    let id = body["id"].as_u64().unwrap();

    // Reading back resolves the term name and link.
    let response = app
        .oneshot(get(&format!("/cms/v1/menu-items/{id}")))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["title"]["raw"], json!("News"));
    assert_eq!(body["type_label"], json!("Category"));
    assert_eq!(body["_invalid"], json!(false));
}

#[tokio::test]
async fn dangling_taxonomy_reference_never_stores() {
    let (store, app) = app();

    let response = app
        .oneshot(send_json(
            "POST",
            "/cms/v1/menu-items",
            json!({ "type": "taxonomy", "object_id": 12345 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], json!("rest_term_invalid_id"));

    let (_, total) = store
        .list_posts(crate::store::PostQuery::for_type(
            crate::store::NAV_MENU_ITEM_TYPE,
        ))
        .await;
    assert_eq!(total, 0);
}
