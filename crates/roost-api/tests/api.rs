use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use roost_api::{AppStateInner, router};
use roost_db::Database;

fn app() -> Router {
    let db = Database::open_in_memory().unwrap();
    router(AppStateInner::new(db, "test-secret"))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, name: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/register",
        Some(json!({
            "name": name,
            "email": format!("{}@example.com", name.to_lowercase()),
            "password": "hunter2hunter2",
            "phone": "+1-555-0100",
            "location": "Austin, TX",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["user_id"].as_str().unwrap().to_string()
}

async fn create_listing(app: &Router, owner: &str, title: &str, extra: Value) -> String {
    let mut body = json!({
        "title": title,
        "description": format!("{} for sale", title),
        "category": "poultry",
        "price": 15.0,
        "location": "Austin, TX",
    });
    if let (Some(target), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            target.insert(k.clone(), v.clone());
        }
    }
    let (status, listing) = send(app, Method::POST, &format!("/listings?user_id={owner}"), Some(body)).await;
    assert_eq!(status, StatusCode::OK, "{listing}");
    listing["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_running() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
}

#[tokio::test]
async fn register_login_and_me() {
    let app = app();
    let user_id = register(&app, "Hannah").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        Some(json!({
            "name": "Other Hannah",
            "email": "HANNAH@example.com",
            "password": "hunter2hunter2",
            "phone": "",
            "location": "",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["detail"], "Email already registered");

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/login",
        Some(json!({"email": "hannah@example.com", "password": "wrong-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        Some(json!({"email": "hannah@example.com", "password": "hunter2hunter2"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], user_id.as_str());
    let token = body["token"].as_str().unwrap().to_string();

    let request = Request::builder()
        .uri("/auth/me")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let me: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(me["email"], "hannah@example.com");
    assert!(me.get("password").is_none());

    let (status, _) = send(&app, Method::GET, "/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn short_password_is_rejected() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        Some(json!({
            "name": "Pat",
            "email": "pat@example.com",
            "password": "short",
            "phone": "",
            "location": "",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Password must be at least 8 characters");
}

#[tokio::test]
async fn follow_twice_conflicts_and_unfollow_requires_edge() {
    let app = app();
    let alice = register(&app, "Alice").await;
    let bob = register(&app, "Bob").await;
    let follow = format!("/users/{bob}/follow?current_user_id={alice}");

    let (status, body) = send(&app, Method::POST, &follow, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully followed user");

    let (status, body) = send(&app, Method::POST, &follow, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["detail"], "Already following this user");

    let (_, stats) = send(
        &app,
        Method::GET,
        &format!("/users/{bob}/follow-stats?current_user_id={alice}"),
        None,
    )
    .await;
    assert_eq!(stats["followers_count"], 1);
    assert_eq!(stats["is_following"], true);

    let (status, _) = send(&app, Method::DELETE, &follow, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, Method::DELETE, &follow, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Not following this user");
}

#[tokio::test]
async fn self_follow_is_a_validation_error() {
    let app = app();
    let alice = register(&app, "Alice").await;

    let uri = format!("/users/{alice}/follow?current_user_id={alice}");
    let (status, _) = send(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn following_missing_user_is_not_found() {
    let app = app();
    let alice = register(&app, "Alice").await;
    let ghost = uuid::Uuid::new_v4();

    let uri = format!("/users/{ghost}/follow?current_user_id={alice}");
    let (status, _) = send(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::POST, &format!("/users/nope/follow?current_user_id={alice}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unrated_seller_summary_is_zeroed() {
    let app = app();
    let seller = register(&app, "Seller").await;

    let (status, body) = send(&app, Method::GET, &format!("/sellers/{seller}/rating-summary"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["average_rating"], 0.0);
    assert_eq!(body["total_ratings"], 0);
    assert_eq!(
        body["rating_breakdown"],
        json!({"1": 0, "2": 0, "3": 0, "4": 0, "5": 0})
    );
}

#[tokio::test]
async fn rating_twice_conflicts() {
    let app = app();
    let seller = register(&app, "Seller").await;
    let buyer = register(&app, "Buyer").await;
    let listing = create_listing(&app, &seller, "Silkie pullets", json!({})).await;
    let rating = json!({"seller_id": seller, "listing_id": listing, "rating": 5, "review": "Great birds"});
    let uri = format!("/ratings?buyer_id={buyer}");

    let (status, body) = send(&app, Method::POST, &uri, Some(rating.clone())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["rating"], 5);

    let (status, body) = send(&app, Method::POST, &uri, Some(rating)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["detail"], "You have already rated this seller for this listing");

    let (_, ratings) = send(&app, Method::GET, &format!("/sellers/{seller}/ratings"), None).await;
    assert_eq!(ratings.as_array().unwrap().len(), 1);
    assert_eq!(ratings[0]["buyer_name"], "Buyer");

    let (_, summary) = send(&app, Method::GET, &format!("/sellers/{seller}/rating-summary"), None).await;
    assert_eq!(summary["average_rating"], 5.0);
    assert_eq!(summary["rating_breakdown"]["5"], 1);
}

#[tokio::test]
async fn rating_checks_range_and_listing_owner() {
    let app = app();
    let seller = register(&app, "Seller").await;
    let other = register(&app, "Other").await;
    let buyer = register(&app, "Buyer").await;
    let listing = create_listing(&app, &seller, "Coop", json!({"category": "coop"})).await;
    let uri = format!("/ratings?buyer_id={buyer}");

    let (status, _) = send(
        &app,
        Method::POST,
        &uri,
        Some(json!({"seller_id": seller, "listing_id": listing, "rating": 6})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        &uri,
        Some(json!({"seller_id": other, "listing_id": listing, "rating": 4})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Listing not found or seller mismatch");
}

#[tokio::test]
async fn conversation_shows_latest_message() {
    let app = app();
    let seller = register(&app, "Seller").await;
    let buyer = register(&app, "Buyer").await;
    let listing = create_listing(&app, &seller, "Brahma rooster", json!({})).await;

    for (from, to, content) in [(&buyer, &seller, "Is he still available?"), (&seller, &buyer, "Yes, come by Saturday")] {
        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/messages?sender_id={from}"),
            Some(json!({"receiver_id": to, "listing_id": listing, "content": content})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    let (status, conversations) = send(&app, Method::GET, &format!("/users/{buyer}/conversations"), None).await;
    assert_eq!(status, StatusCode::OK);
    let conversations = conversations.as_array().unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0]["id"], format!("{listing}_{seller}"));
    assert_eq!(conversations[0]["listing_title"], "Brahma rooster");
    assert_eq!(conversations[0]["other_user_name"], "Seller");
    assert_eq!(conversations[0]["last_message"], "Yes, come by Saturday");
    assert_eq!(conversations[0]["unread_count"], 1);

    let (_, thread) = send(
        &app,
        Method::GET,
        &format!("/conversations/{listing}/{seller}/messages?user_id={buyer}"),
        None,
    )
    .await;
    let thread = thread.as_array().unwrap();
    assert_eq!(thread.len(), 2);
    assert_eq!(thread[0]["content"], "Is he still available?");
    assert_eq!(thread[1]["read"], true);

    let (_, conversations) = send(&app, Method::GET, &format!("/users/{buyer}/conversations"), None).await;
    assert_eq!(conversations[0]["unread_count"], 0);
}

#[tokio::test]
async fn messaging_yourself_is_rejected() {
    let app = app();
    let seller = register(&app, "Seller").await;
    let listing = create_listing(&app, &seller, "Hens", json!({})).await;

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/messages?sender_id={seller}"),
        Some(json!({"receiver_id": seller, "listing_id": listing, "content": "hello"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn feed_is_empty_without_follows_and_lists_followed_sellers() {
    let app = app();
    let reader = register(&app, "Reader").await;
    let seller = register(&app, "Seller").await;
    create_listing(&app, &seller, "Orpington hens", json!({})).await;

    for query in ["", "&limit=5", "&limit=5&skip=10"] {
        let (status, feed) = send(
            &app,
            Method::GET,
            &format!("/feed/following?current_user_id={reader}{query}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(feed.as_array().unwrap().is_empty());
    }

    send(&app, Method::POST, &format!("/users/{seller}/follow?current_user_id={reader}"), None).await;
    let (_, feed) = send(&app, Method::GET, &format!("/feed/following?current_user_id={reader}"), None).await;
    assert_eq!(feed.as_array().unwrap().len(), 1);
    assert_eq!(feed[0]["seller_name"], "Seller");
    assert_eq!(feed[0]["title"], "Orpington hens");
}

#[tokio::test]
async fn category_filter_returns_only_that_category() {
    let app = app();
    let seller = register(&app, "Seller").await;
    create_listing(&app, &seller, "Hens", json!({})).await;
    create_listing(&app, &seller, "Fresh eggs", json!({"category": "eggs", "egg_type": "Chicken"})).await;

    let (status, listings) = send(&app, Method::GET, "/listings?category=eggs", None).await;
    assert_eq!(status, StatusCode::OK);
    let listings = listings.as_array().unwrap();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0]["category"], "eggs");

    let (_, found) = send(
        &app,
        Method::POST,
        "/advanced-search",
        Some(json!({"category": "eggs", "query": "chicken"})),
    )
    .await;
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["seller_rating"], 0.0);
}

#[tokio::test]
async fn unknown_category_finds_nothing() {
    let app = app();
    let seller = register(&app, "Seller").await;
    create_listing(&app, &seller, "Hens", json!({})).await;

    let (status, listings) = send(&app, Method::GET, "/listings?category=ducks", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listings, json!([]));

    let (status, found) = send(&app, Method::GET, "/search?q=hens&category=ducks", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found, json!([]));
}

#[tokio::test]
async fn malformed_requests_still_answer_with_detail() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/feed/following", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("current_user_id"), "{body}");

    let (status, body) = send(
        &app,
        Method::POST,
        "/advanced-search",
        Some(json!({"min_price": "cheap"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("min_price"), "{body}");

    let (status, body) = send(&app, Method::GET, "/listings?limit=lots", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string(), "{body}");
}

#[tokio::test]
async fn owner_only_update_and_soft_delete() {
    let app = app();
    let owner = register(&app, "Owner").await;
    let stranger = register(&app, "Stranger").await;
    let listing = create_listing(&app, &owner, "Chicken tractor", json!({"category": "cage"})).await;

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/listings/{listing}?user_id={stranger}"),
        Some(json!({"price": 1.0})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, updated) = send(
        &app,
        Method::PUT,
        &format!("/listings/{listing}?user_id={owner}"),
        Some(json!({"price": 120.0, "material": "Cedar"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["price"], 120.0);
    assert_eq!(updated["material"], "Cedar");
    assert_eq!(updated["title"], "Chicken tractor");

    let (status, _) = send(&app, Method::DELETE, &format!("/listings/{listing}?user_id={owner}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, &format!("/listings/{listing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, all) = send(&app, Method::GET, "/admin/listings", None).await;
    assert_eq!(all[0]["is_active"], false);
}

#[tokio::test]
async fn flagging_twice_conflicts_and_moderation_closes_flags() {
    let app = app();
    let owner = register(&app, "Owner").await;
    let reporter = register(&app, "Reporter").await;
    let admin = register(&app, "Admin").await;
    let listing = create_listing(&app, &owner, "Too good to be true", json!({})).await;
    let flag_uri = format!("/listings/{listing}/flag?user_id={reporter}");

    let (status, flag) = send(&app, Method::POST, &flag_uri, Some(json!({"reason": "scam"}))).await;
    assert_eq!(status, StatusCode::OK, "{flag}");
    assert_eq!(flag["status"], "pending");

    let (status, body) = send(&app, Method::POST, &flag_uri, Some(json!({"reason": "fake"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["detail"], "You have already flagged this listing");

    let (_, stats) = send(&app, Method::GET, "/admin/stats", None).await;
    assert_eq!(stats["pending_flags"], 1);
    assert_eq!(stats["listings_by_category"]["coop"], 0);

    let (status, action) = send(
        &app,
        Method::POST,
        &format!("/admin/listings/{listing}/action?admin_id={admin}"),
        Some(json!({"action": "deactivate", "reason": "Scam report confirmed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{action}");
    assert_eq!(action["action"], "deactivate");

    let (_, pending) = send(&app, Method::GET, "/admin/flags?status=pending", None).await;
    assert!(pending.as_array().unwrap().is_empty());
    let (_, resolved) = send(&app, Method::GET, "/admin/flags?status=resolved", None).await;
    assert_eq!(resolved[0]["listing_title"], "Too good to be true");

    let (status, _) = send(&app, Method::GET, &format!("/listings/{listing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, notices) = send(&app, Method::GET, &format!("/users/{owner}/notifications"), None).await;
    let notices = notices.as_array().unwrap();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0]["read"], false);

    let notice_id = notices[0]["id"].as_str().unwrap();
    let (status, _) = send(&app, Method::POST, &format!("/notifications/{notice_id}/read"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, actions) = send(&app, Method::GET, "/admin/actions", None).await;
    assert_eq!(actions.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn admin_users_report_activity() {
    let app = app();
    let owner = register(&app, "Owner").await;
    create_listing(&app, &owner, "Ducks", json!({})).await;

    let (status, users) = send(&app, Method::GET, "/admin/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users[0]["listing_count"], 1);
    assert_eq!(users[0]["message_count"], 0);
    assert!(users[0].get("password").is_none());

    let (_, stats) = send(&app, Method::GET, "/admin/stats", None).await;
    assert_eq!(stats["total_users"], 1);
    assert_eq!(stats["recent_users"], 1);
    assert_eq!(stats["active_listings"], 1);
    assert_eq!(stats["listings_by_category"]["poultry"], 1);
}
