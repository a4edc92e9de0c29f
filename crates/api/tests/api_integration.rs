//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::{BookId, InMemoryStore, Money, NewBook};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

/// App over an in-memory store holding one book with stock 5.
async fn setup() -> (Router, InMemoryStore, BookId) {
    let store = InMemoryStore::new();
    let book = store
        .seed_book(NewBook::new(
            "The Pragmatic Programmer",
            "Hunt & Thomas",
            "Programming",
            Money::from_cents(4250),
            5,
        ))
        .await;
    let state = Arc::new(api::AppState::new(store.clone()));
    let app = api::create_app(state, get_metrics_handle());
    (app, store, book.id)
}

enum As {
    Anonymous,
    Customer(i64),
    Admin(i64),
}

fn request(method: &str, uri: &str, caller: As, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    builder = match caller {
        As::Anonymous => builder,
        As::Customer(id) => builder.header("x-customer-id", id.to_string()),
        As::Admin(id) => builder.header("x-admin-id", id.to_string()),
    };
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn create_order(app: &Router, customer: i64, book: BookId, quantity: u32, mode: &str) -> Value {
    let (status, json) = send(
        app,
        request(
            "POST",
            "/orders",
            As::Customer(customer),
            Some(json!({ "items": [{ "book_id": book, "quantity": quantity }], "mode": mode })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json
}

mod ops {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let (app, _, _) = setup().await;

        let (status, json) = send(&app, request("GET", "/health", As::Anonymous, None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["store"], "ok");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let (app, _, _) = setup().await;

        let response = app
            .oneshot(request("GET", "/metrics", As::Anonymous, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()["content-type"].to_str().unwrap();
        assert!(content_type.starts_with("text/plain"));
    }

    #[tokio::test]
    async fn test_requests_are_counted_per_route() {
        let (app, _, book) = setup().await;

        let uri = format!("/books/{book}");
        let (status, _) = send(&app, request("GET", &uri, As::Anonymous, None)).await;
        assert_eq!(status, StatusCode::OK);

        let response = app
            .oneshot(request("GET", "/metrics", As::Anonymous, None))
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let rendered = String::from_utf8(body.to_vec()).unwrap();

        assert!(rendered.contains("http_requests_total"));
        assert!(rendered.contains(r#"route="/books/{id}""#));
        assert!(rendered.contains("http_request_duration_seconds"));
    }
}

mod books {
    use super::*;

    fn book_body(title: &str) -> Value {
        json!({
            "title": title,
            "author": "Brian Kernighan",
            "genre": "Programming",
            "price_cents": 3500,
            "stock": 4
        })
    }

    #[tokio::test]
    async fn test_list_and_get_are_public() {
        let (app, _, book) = setup().await;

        let (status, json) = send(&app, request("GET", "/books", As::Anonymous, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 1);

        let uri = format!("/books/{book}");
        let (status, json) = send(&app, request("GET", &uri, As::Anonymous, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["price"], "$42.50");
        assert_eq!(json["stock"], 5);

        let (status, _) = send(&app, request("GET", "/books/999", As::Anonymous, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_only_admins_change_the_catalog() {
        let (app, _, _) = setup().await;

        let (status, _) = send(
            &app,
            request("POST", "/books", As::Anonymous, Some(book_body("The C Book"))),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &app,
            request("POST", "/books", As::Customer(1), Some(book_body("The C Book"))),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, created) = send(
            &app,
            request("POST", "/books", As::Admin(1), Some(book_body("The C Book"))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["title"], "The C Book");

        let uri = format!("/books/{}", created["id"]);
        let (status, updated) = send(
            &app,
            request("PUT", &uri, As::Admin(1), Some(book_body("The Go Book"))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "The Go Book");

        let (status, _) = send(&app, request("DELETE", &uri, As::Admin(1), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_book_in_use_cannot_be_deleted() {
        let (app, _, book) = setup().await;
        create_order(&app, 1, book, 1, "save").await;

        let uri = format!("/books/{book}");
        let (status, _) = send(&app, request("DELETE", &uri, As::Admin(1), None)).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}

mod orders {
    use super::*;

    #[tokio::test]
    async fn test_create_saved_order() {
        let (app, store, book) = setup().await;

        let json = create_order(&app, 1, book, 2, "save").await;

        assert_eq!(json["status"], "Saved");
        assert_eq!(json["customer_id"], 1);
        assert_eq!(json["items"][0]["title"], "The Pragmatic Programmer");
        assert_eq!(json["total_cents"], 8500);
        assert_eq!(store.stock_of(book).await, Some(5));
    }

    #[tokio::test]
    async fn test_insufficient_stock_reports_the_book() {
        let (app, store, book) = setup().await;
        create_order(&app, 1, book, 5, "confirm").await;
        assert_eq!(store.stock_of(book).await, Some(0));

        let (status, json) = send(
            &app,
            request(
                "POST",
                "/orders",
                As::Customer(2),
                Some(json!({ "items": [{ "book_id": book, "quantity": 1 }], "mode": "confirm" })),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["book_id"], json!(book));
        assert_eq!(json["requested"], 1);
        assert_eq!(json["available"], 0);
        assert_eq!(store.stock_of(book).await, Some(0));
    }

    #[tokio::test]
    async fn test_anonymous_and_invalid_identity() {
        let (app, _, book) = setup().await;
        let body = json!({ "items": [{ "book_id": book, "quantity": 1 }] });

        let (status, _) = send(
            &app,
            request("POST", "/orders", As::Anonymous, Some(body.clone())),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let req = Request::builder()
            .method("GET")
            .uri("/orders")
            .header("x-customer-id", "not-a-number")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("x-customer-id"));
    }

    #[tokio::test]
    async fn test_empty_order_is_rejected() {
        let (app, _, _) = setup().await;

        let (status, _) = send(
            &app,
            request("POST", "/orders", As::Customer(1), Some(json!({ "items": [] }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_order_requires_owner_or_admin() {
        let (app, _, book) = setup().await;
        let created = create_order(&app, 1, book, 1, "save").await;
        let uri = format!("/orders/{}", created["id"]);

        let (status, _) = send(&app, request("GET", &uri, As::Customer(1), None)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, request("GET", &uri, As::Admin(1), None)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, request("GET", &uri, As::Customer(2), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = send(&app, request("GET", "/orders/999", As::Customer(1), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_edit_confirm_delete_lifecycle() {
        let (app, store, book) = setup().await;
        let created = create_order(&app, 1, book, 1, "save").await;
        let uri = format!("/orders/{}", created["id"]);

        let (status, edited) = send(
            &app,
            request(
                "PUT",
                &uri,
                As::Customer(1),
                Some(json!({ "items": [{ "book_id": book, "quantity": 3 }] })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(edited["items"][0]["quantity"], 3);

        let confirm_uri = format!("{uri}/confirm");
        let (status, confirmed) =
            send(&app, request("POST", &confirm_uri, As::Customer(1), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(confirmed["status"], "Confirmed");
        assert_eq!(store.stock_of(book).await, Some(2));

        let (status, _) = send(&app, request("POST", &confirm_uri, As::Customer(1), None)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(
            &app,
            request(
                "PUT",
                &uri,
                As::Customer(1),
                Some(json!({ "items": [{ "book_id": book, "quantity": 1 }] })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&app, request("DELETE", &uri, As::Customer(1), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(store.stock_of(book).await, Some(5));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_history_lists_own_orders_newest_first() {
        let (app, _, book) = setup().await;
        let first = create_order(&app, 1, book, 1, "save").await;
        create_order(&app, 2, book, 1, "save").await;
        let third = create_order(&app, 1, book, 2, "confirm").await;

        let (status, json) = send(&app, request("GET", "/orders", As::Customer(1), None)).await;
        assert_eq!(status, StatusCode::OK);
        let orders = json.as_array().unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0]["id"], third["id"]);
        assert_eq!(orders[1]["id"], first["id"]);

        let (_, json) = send(
            &app,
            request("GET", "/orders?status=Confirmed", As::Admin(1), None),
        )
        .await;
        assert_eq!(json.as_array().unwrap().len(), 1);
    }
}

mod reports {
    use super::*;

    #[tokio::test]
    async fn test_revenue_report() {
        let (app, _, book) = setup().await;
        create_order(&app, 1, book, 2, "confirm").await;
        create_order(&app, 2, book, 1, "save").await;

        let (status, json) = send(
            &app,
            request("GET", "/reports/revenue", As::Admin(1), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["confirmed_orders"], 1);
        assert_eq!(json["revenue_cents"], 8500);

        let (status, _) = send(
            &app,
            request("GET", "/reports/revenue", As::Customer(1), None),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_inverted_range_is_rejected() {
        let (app, _, _) = setup().await;

        let (status, _) = send(
            &app,
            request(
                "GET",
                "/reports/revenue?from=2025-02-01T00:00:00Z&to=2025-01-01T00:00:00Z",
                As::Admin(1),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
