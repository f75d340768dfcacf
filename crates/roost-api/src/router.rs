use axum::{
    Json, Router, middleware,
    routing::{get, post},
};

use roost_types::api::Health;

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{admin, auth, follows, listings, messages, moderation, ratings, search, users};

/// All marketplace routes. Transport layers (CORS, tracing) are added by
/// the binary.
pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let public_routes = Router::new()
        .route("/", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        // Users
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}/listings", get(listings::user_listings))
        // Listings
        .route("/listings", get(listings::list_listings).post(listings::create_listing))
        .route(
            "/listings/{id}",
            get(listings::get_listing)
                .put(listings::update_listing)
                .delete(listings::delete_listing),
        )
        .route("/search", get(search::search))
        .route("/advanced-search", post(search::advanced_search))
        // Messages
        .route("/messages", post(messages::send_message))
        .route("/users/{id}/conversations", get(messages::get_conversations))
        .route(
            "/conversations/{listing_id}/{other_user_id}/messages",
            get(messages::get_thread),
        )
        // Ratings
        .route("/ratings", post(ratings::create_rating))
        .route("/sellers/{id}/ratings", get(ratings::seller_ratings))
        .route("/sellers/{id}/rating-summary", get(ratings::rating_summary))
        // Follows
        .route("/users/{id}/follow", post(follows::follow).delete(follows::unfollow))
        .route("/users/{id}/followers", get(follows::followers))
        .route("/users/{id}/following", get(follows::following))
        .route("/users/{id}/follow-stats", get(follows::follow_stats))
        .route("/feed/following", get(follows::following_feed))
        // Moderation
        .route("/listings/{id}/flag", post(moderation::flag_listing))
        .route("/users/{id}/notifications", get(moderation::notifications))
        .route("/notifications/{id}/read", post(moderation::mark_notification_read))
        .route("/admin/flags", get(moderation::list_flags))
        .route("/admin/listings/{id}/action", post(moderation::take_action))
        .route("/admin/actions", get(moderation::list_actions))
        .route("/admin/listings", get(admin::list_listings))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/stats", get(admin::stats));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> Json<Health> {
    Json(Health {
        message: "Roost Marketplace API".into(),
        status: "running".into(),
    })
}
