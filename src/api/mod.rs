pub mod author;
pub mod book;
pub mod category;
pub mod customer;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod genre;
pub mod health;
pub mod image;
pub mod listing;
pub mod order;
pub mod publisher;
pub mod rate_limit;
pub mod review;
pub mod session;

use axum::{
    Router, middleware,
    routing::{delete, get, patch, post},
};

use crate::infrastructure::AppState;

pub fn api_router(state: AppState) -> Router {
    let session = middleware::from_fn_with_state(state.clone(), session::require_session);
    let throttle = middleware::from_fn_with_state(state.clone(), rate_limit::limit_by_ip_email);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Books
        .route("/book", get(book::list_books).post(book::create_book))
        .route(
            "/book/:id",
            patch(book::update_book).delete(book::delete_book),
        )
        // Authors
        .route("/author", get(author::list_authors).post(author::create_author))
        .route(
            "/author/:id",
            patch(author::update_author).delete(author::delete_author),
        )
        // Genres
        .route("/genre", get(genre::list_genres).post(genre::create_genre))
        .route(
            "/genre/:id",
            patch(genre::update_genre).delete(genre::delete_genre),
        )
        // Publishers
        .route(
            "/publisher",
            get(publisher::list_publishers).post(publisher::create_publisher),
        )
        .route(
            "/publisher/:id",
            patch(publisher::update_publisher).delete(publisher::delete_publisher),
        )
        // Customers
        .route(
            "/customer",
            get(customer::list_customers).post(customer::create_customer),
        )
        .route(
            "/customer/:id",
            patch(customer::update_customer)
                .delete(customer::delete_customer)
                .route_layer(session.clone()),
        )
        .route(
            "/customer/register",
            post(customer::register).route_layer(throttle.clone()),
        )
        .route(
            "/customer/login",
            post(customer::login).route_layer(throttle),
        )
        .route("/customer/logout", post(customer::logout))
        // Orders
        .route(
            "/order",
            get(order::list_orders).merge(post(order::create_order).route_layer(session.clone())),
        )
        .route(
            "/order/:id",
            delete(order::delete_order).route_layer(session.clone()),
        )
        // Reviews
        .route(
            "/review",
            get(review::list_reviews)
                .merge(post(review::create_review).route_layer(session.clone())),
        )
        .route(
            "/review/:id",
            delete(review::delete_review).route_layer(session),
        )
        // Images and schema introspection
        .route("/image/:id", get(image::get_image))
        .route("/category", get(category::list_models))
        .route("/category/model", get(category::model_schema))
        .with_state(state)
}
