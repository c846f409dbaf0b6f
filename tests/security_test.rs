use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use bookstore::auth::{TokenService, hash_password, verify_password};
use bookstore::config::Config;
use bookstore::infrastructure::AppState;
use bookstore::infrastructure::cookies::CookieSigner;
use bookstore::models::{customer, order};
use bookstore::{db, server};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Set};
use serde_json::{Value, json};
use tower::util::ServiceExt; // for `oneshot`

async fn setup_app(config: Config) -> (Router, DatabaseConnection) {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    let state = AppState::in_memory(db.clone(), &config);
    (server::build_router(state, &config.cors_allowed_origins), db)
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl Reply {
    fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    /// `name=value` pair of a cookie set by this response
    fn cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{}=", name);
        self.set_cookies()
            .into_iter()
            .find(|c| c.starts_with(&prefix))
            .map(|c| c.split(';').next().unwrap().to_string())
    }
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookies: &[String],
    body: Option<Value>,
) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if !cookies.is_empty() {
        builder = builder.header(header::COOKIE, cookies.join("; "));
    }
    let req = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    Reply {
        status,
        headers,
        body: serde_json::from_slice(&bytes).unwrap_or(Value::Null),
    }
}

// Register and log in; returns the customer id and both session cookies
async fn login_as(app: &Router, email: &str) -> (i64, Vec<String>) {
    let reply = send(
        app,
        "POST",
        "/api/customer/register",
        &[],
        Some(json!({
            "first_name": "test",
            "last_name": "reader",
            "email": email,
            "password": "correct horse"
        })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let id = reply.body["data"]["id"].as_i64().unwrap();

    let reply = send(
        app,
        "POST",
        "/api/customer/login",
        &[],
        Some(json!({ "email": email, "password": "correct horse" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    let cookies = vec![
        reply.cookie("access_token").expect("access cookie"),
        reply.cookie("refresh_token").expect("refresh cookie"),
    ];
    (id, cookies)
}

// Catalogue with a single book priced at 12.5
async fn create_book(app: &Router) -> i64 {
    let author = send(app, "POST", "/api/author", &[], Some(json!({ "name": "Le Guin" }))).await;
    let genre = send(app, "POST", "/api/genre", &[], Some(json!({ "name": "Fantasy" }))).await;
    let publisher =
        send(app, "POST", "/api/publisher", &[], Some(json!({ "name": "Parnassus" }))).await;
    let book = send(
        app,
        "POST",
        "/api/book",
        &[],
        Some(json!({
            "title": "A Wizard of Earthsea",
            "price": 12.5,
            "author_id": author.body["data"]["id"],
            "genre_id": genre.body["data"]["id"],
            "publisher_id": publisher.body["data"]["id"]
        })),
    )
    .await;
    assert_eq!(book.status, StatusCode::CREATED);
    book.body["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_password_hashing() {
    let hash = hash_password("super_secret_password").expect("Failed to hash password");

    assert_ne!(hash, "super_secret_password");
    assert!(verify_password("super_secret_password", &hash).unwrap());
    assert!(!verify_password("wrong_password", &hash).unwrap());
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let (app, _db) = setup_app(Config::for_tests()).await;
    let payload = json!({
        "first_name": "michael",
        "last_name": "ende",
        "email": "michael@example.com",
        "password": "momo-1973"
    });

    let first = send(&app, "POST", "/api/customer/register", &[], Some(payload.clone())).await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["data"]["first_name"], "Michael");
    assert!(first.body["data"].get("password_hash").is_none());

    let mut shouting = payload;
    shouting["email"] = json!("MICHAEL@example.com");
    let second = send(&app, "POST", "/api/customer/register", &[], Some(shouting)).await;
    assert_eq!(second.status, StatusCode::BAD_REQUEST);
    assert_eq!(second.body["success"], false);
    assert_eq!(second.body["statusCode"], 400);
    assert_eq!(second.body["message"], "Customer already registered");
}

#[tokio::test]
async fn test_missing_registration_fields_never_reach_the_store() {
    let (app, db) = setup_app(Config::for_tests()).await;

    let reply = send(
        &app,
        "POST",
        "/api/customer/register",
        &[],
        Some(json!({ "email": "half@example.com" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(reply.body["message"], "first_name is required");
    assert_eq!(customer::Entity::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_login_sets_session_cookies() {
    let (app, _db) = setup_app(Config::for_tests()).await;
    login_as(&app, "reader@example.com").await;

    let wrong = send(
        &app,
        "POST",
        "/api/customer/login",
        &[],
        Some(json!({ "email": "reader@example.com", "password": "not the password" })),
    )
    .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["message"], "Invalid credentials");
    assert!(wrong.set_cookies().is_empty());

    let ok = send(
        &app,
        "POST",
        "/api/customer/login",
        &[],
        Some(json!({ "email": "Reader@Example.com", "password": "correct horse" })),
    )
    .await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(ok.body["data"]["email"], "reader@example.com");
    let cookies = ok.set_cookies();
    assert_eq!(cookies.len(), 2);
    for cookie in cookies {
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(!cookie.contains("Secure"));
    }
}

#[tokio::test]
async fn test_no_cookies_is_unauthorized_and_clears_both() {
    let (app, _db) = setup_app(Config::for_tests()).await;

    let reply = send(&app, "POST", "/api/review", &[], Some(json!({ "book_id": 1, "rating": 5 }))).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["statusCode"], 401);

    let cleared = reply.set_cookies();
    assert_eq!(cleared.len(), 2);
    assert!(cleared.iter().any(|c| c.starts_with("access_token=;")));
    assert!(cleared.iter().any(|c| c.starts_with("refresh_token=;")));
    assert!(cleared.iter().all(|c| c.contains("Max-Age=0")));
}

#[tokio::test]
async fn test_refresh_token_alone_mints_a_new_access_token() {
    let (app, _db) = setup_app(Config::for_tests()).await;
    let (_, cookies) = login_as(&app, "refresh@example.com").await;
    let refresh_only = vec![cookies[1].clone()];

    // The handler runs (404 for an unknown order) and a fresh access cookie is set
    let reply = send(&app, "DELETE", "/api/order/999", &refresh_only, None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["message"], "Order not found");
    let access = reply.cookie("access_token").expect("fresh access cookie");
    assert!(access.len() > "access_token=".len());

    // With both cookies nothing is re-issued
    let both = vec![access, cookies[1].clone()];
    let reply = send(&app, "DELETE", "/api/order/999", &both, None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert!(reply.set_cookies().is_empty());
}

#[tokio::test]
async fn test_forged_or_missing_refresh_token_is_rejected() {
    let config = Config::for_tests();
    let (app, _db) = setup_app(config.clone()).await;
    let (id, cookies) = login_as(&app, "forged@example.com").await;

    // Access cookie alone is not enough
    let reply = send(&app, "DELETE", "/api/order/1", &cookies[..1], None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    // Token signed with the right JWT secret but the wrong cookie secret
    let tokens = TokenService::new(
        config.access_token_secret.clone(),
        config.refresh_token_secret.clone(),
        config.access_token_ttl,
        config.refresh_token_ttl,
    );
    let refresh = tokens.create_refresh_token(id as i32).unwrap();
    let forged = CookieSigner::new("not-the-cookie-secret", false).sign(&refresh);
    let reply = send(
        &app,
        "DELETE",
        "/api/order/1",
        &[format!("refresh_token={}", forged)],
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    // Correctly signed cookie around a token from another JWT secret
    let other = TokenService::new(
        "a".into(),
        "b".into(),
        Duration::from_secs(60),
        Duration::from_secs(60),
    );
    let signed = CookieSigner::new(&config.cookie_secret, false)
        .sign(&other.create_refresh_token(id as i32).unwrap());
    let reply = send(
        &app,
        "DELETE",
        "/api/order/1",
        &[format!("refresh_token={}", signed)],
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_orders_are_priced_and_owned() {
    let (app, _db) = setup_app(Config::for_tests()).await;
    let book_id = create_book(&app).await;
    let (_, alice) = login_as(&app, "alice@example.com").await;
    let (_, bob) = login_as(&app, "bob@example.com").await;

    let reply = send(
        &app,
        "POST",
        "/api/order",
        &alice,
        Some(json!({ "details": [{ "book_id": book_id, "quantity": 3 }] })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["data"]["total_amount"], 37.5);
    assert_eq!(reply.body["data"]["details"][0]["price_per_item"], 12.5);
    let order_id = reply.body["data"]["id"].as_i64().unwrap();

    let missing = send(
        &app,
        "POST",
        "/api/order",
        &alice,
        Some(json!({ "details": [{ "book_id": 4040, "quantity": 1 }] })),
    )
    .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let listed = send(&app, "GET", "/api/order", &[], None).await;
    assert_eq!(listed.body["count"], 1);
    assert_eq!(listed.body["data"][0]["details"][0]["quantity"], 3);

    let uri = format!("/api/order/{}", order_id);
    let foreign = send(&app, "DELETE", &uri, &bob, None).await;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);

    let own = send(&app, "DELETE", &uri, &alice, None).await;
    assert_eq!(own.status, StatusCode::OK);
}

// Order with no lines placed at `order_date` (RFC 3339)
async fn insert_order(db: &DatabaseConnection, customer_id: i64, order_date: &str) {
    order::ActiveModel {
        customer_id: Set(customer_id as i32),
        order_date: Set(order_date.to_string()),
        total_amount: Set(0.0),
        created_at: Set(order_date.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
}

fn customer_ids(reply: &Reply) -> Vec<i64> {
    reply.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["customer_id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_order_list_filters_by_customer_and_date_range() {
    let (app, db) = setup_app(Config::for_tests()).await;
    let book_id = create_book(&app).await;
    let (alice_id, alice) = login_as(&app, "alice@example.com").await;
    let (bob_id, bob) = login_as(&app, "bob@example.com").await;

    for cookies in [&alice, &bob] {
        let reply = send(
            &app,
            "POST",
            "/api/order",
            cookies,
            Some(json!({ "details": [{ "book_id": book_id, "quantity": 1 }] })),
        )
        .await;
        assert_eq!(reply.status, StatusCode::CREATED);
    }
    insert_order(&db, alice_id, "2024-01-15T10:30:00+00:00").await;
    insert_order(&db, bob_id, "2024-01-31T23:59:59+00:00").await;
    insert_order(&db, alice_id, "2024-02-01T00:00:00+00:00").await;
    insert_order(&db, bob_id, "2023-12-31T23:59:59+00:00").await;

    let uri = format!("/api/order?customer={}", alice_id);
    let reply = send(&app, "GET", &uri, &[], None).await;
    assert_eq!(reply.body["count"], 3);
    assert_eq!(customer_ids(&reply), vec![alice_id; 3]);

    // Both bounds are whole days, the end day included
    let reply = send(
        &app,
        "GET",
        "/api/order?dateinit=2024-01-01&dateend=2024-01-31",
        &[],
        None,
    )
    .await;
    assert_eq!(reply.body["count"], 2);
    let dates: Vec<&str> = reply.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["order_date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, ["2024-01-15T10:30:00+00:00", "2024-01-31T23:59:59+00:00"]);

    let uri = format!(
        "/api/order?customer={}&dateinit=2024-01-01&dateend=2024-02-01",
        bob_id
    );
    let reply = send(&app, "GET", &uri, &[], None).await;
    assert_eq!(reply.body["count"], 1);
    assert_eq!(customer_ids(&reply), vec![bob_id]);
}

#[tokio::test]
async fn test_customer_list_filters_by_key() {
    let (app, _db) = setup_app(Config::for_tests()).await;
    login_as(&app, "alice@example.com").await;
    login_as(&app, "bob@example.com").await;

    let reply = send(
        &app,
        "GET",
        "/api/customer?filterkey=email&filterval=ALICE@",
        &[],
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["count"], 1);
    assert_eq!(reply.body["data"][0]["email"], "alice@example.com");
    assert!(reply.body["data"][0].get("password_hash").is_none());

    let reply = send(
        &app,
        "GET",
        "/api/customer?filterkey=last_name&filterval=READ",
        &[],
        None,
    )
    .await;
    assert_eq!(reply.body["count"], 2);

    let reply = send(
        &app,
        "GET",
        "/api/customer?filterkey=first_name&filterval=nobody",
        &[],
        None,
    )
    .await;
    assert_eq!(reply.body["count"], 0);
}

#[tokio::test]
async fn test_one_review_per_customer_and_book() {
    let (app, _db) = setup_app(Config::for_tests()).await;
    let book_id = create_book(&app).await;
    let (customer_id, cookies) = login_as(&app, "critic@example.com").await;
    let review = json!({ "book_id": book_id, "rating": 9, "comment": "Timeless" });

    let first = send(&app, "POST", "/api/review", &cookies, Some(review.clone())).await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["data"]["customer_id"], customer_id);

    let second = send(&app, "POST", "/api/review", &cookies, Some(review)).await;
    assert_eq!(second.status, StatusCode::BAD_REQUEST);
    assert_eq!(second.body["message"], "Review already exists");

    let out_of_range = send(
        &app,
        "POST",
        "/api/review",
        &cookies,
        Some(json!({ "book_id": book_id, "rating": 11 })),
    )
    .await;
    assert_eq!(out_of_range.status, StatusCode::UNPROCESSABLE_ENTITY);

    let filtered = send(&app, "GET", "/api/review?rateMin=9&rateMax=10", &[], None).await;
    assert_eq!(filtered.body["count"], 1);
    let filtered = send(&app, "GET", "/api/review?rateMax=5", &[], None).await;
    assert_eq!(filtered.body["count"], 0);
}

#[tokio::test]
async fn test_customers_only_modify_themselves() {
    let (app, _db) = setup_app(Config::for_tests()).await;
    let (alice_id, alice) = login_as(&app, "alice@example.com").await;
    let (bob_id, _) = login_as(&app, "bob@example.com").await;

    let reply = send(
        &app,
        "PATCH",
        &format!("/api/customer/{}", bob_id),
        &alice,
        Some(json!({ "first_name": "mallory" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = send(
        &app,
        "PATCH",
        &format!("/api/customer/{}", alice_id),
        &alice,
        Some(json!({ "first_name": "alice maría" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["first_name"], "Alice María");

    let reply = send(&app, "DELETE", &format!("/api/customer/{}", alice_id), &alice, None).await;
    assert_eq!(reply.status, StatusCode::OK);

    // The refresh token now points at a deleted customer
    let reply = send(&app, "DELETE", "/api/order/1", &alice[1..], None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_clears_cookies() {
    let (app, _db) = setup_app(Config::for_tests()).await;
    let reply = send(&app, "POST", "/api/customer/logout", &[], None).await;

    assert_eq!(reply.status, StatusCode::OK);
    let cleared = reply.set_cookies();
    assert_eq!(cleared.len(), 2);
    assert!(cleared.iter().all(|c| c.contains("Max-Age=0")));
}

#[tokio::test]
async fn test_login_rate_limit_blocks_then_recovers() {
    let mut config = Config::for_tests();
    config.rate_limit_points = 2;
    config.rate_limit_window = Duration::from_secs(60);
    config.rate_limit_block = Duration::from_secs(1);
    let (app, _db) = setup_app(config).await;
    let attempt = json!({ "email": "nobody@example.com", "password": "guess" });

    for _ in 0..2 {
        let reply = send(&app, "POST", "/api/customer/login", &[], Some(attempt.clone())).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    }

    let blocked = send(&app, "POST", "/api/customer/login", &[], Some(attempt.clone())).await;
    assert_eq!(blocked.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        blocked.body["message"],
        "Too many requests, please try again later"
    );
    assert_eq!(blocked.headers[header::RETRY_AFTER], "1");

    // Another email from the same client has its own budget
    let other = send(
        &app,
        "POST",
        "/api/customer/login",
        &[],
        Some(json!({ "email": "somebody@example.com", "password": "guess" })),
    )
    .await;
    assert_eq!(other.status, StatusCode::UNAUTHORIZED);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let recovered = send(&app, "POST", "/api/customer/login", &[], Some(attempt)).await;
    assert_eq!(recovered.status, StatusCode::UNAUTHORIZED);
}

async fn login_from(app: &Router, forwarded_for: &str, attempt: &Value) -> StatusCode {
    let req = Request::builder()
        .method("POST")
        .uri("/api/customer/login")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", forwarded_for)
        .body(Body::from(serde_json::to_vec(attempt).unwrap()))
        .unwrap();
    app.clone().oneshot(req).await.unwrap().status()
}

#[tokio::test]
async fn test_rotating_forwarded_for_does_not_reset_the_limit() {
    let mut config = Config::for_tests();
    config.rate_limit_points = 2;
    let (app, _db) = setup_app(config).await;
    let attempt = json!({ "email": "victim@example.com", "password": "guess" });

    let statuses = [
        login_from(&app, "10.0.0.1", &attempt).await,
        login_from(&app, "10.0.0.2", &attempt).await,
        login_from(&app, "10.0.0.3", &attempt).await,
        login_from(&app, "10.0.0.4", &attempt).await,
    ];
    assert_eq!(
        statuses,
        [
            StatusCode::UNAUTHORIZED,
            StatusCode::UNAUTHORIZED,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::TOO_MANY_REQUESTS,
        ]
    );
}

#[tokio::test]
async fn test_trusted_proxy_limits_per_forwarded_client() {
    let mut config = Config::for_tests();
    config.rate_limit_points = 2;
    config.trust_proxy = true;
    let (app, _db) = setup_app(config).await;
    let attempt = json!({ "email": "victim@example.com", "password": "guess" });

    for _ in 0..2 {
        assert_eq!(
            login_from(&app, "10.0.0.1", &attempt).await,
            StatusCode::UNAUTHORIZED
        );
    }
    assert_eq!(
        login_from(&app, "10.0.0.1", &attempt).await,
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(
        login_from(&app, "10.0.0.2", &attempt).await,
        StatusCode::UNAUTHORIZED
    );
}
