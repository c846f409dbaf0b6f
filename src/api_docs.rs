use crate::api;
use crate::models::{BookDto, CustomerDto, OrderDto, order::OrderDetailDto};
use crate::services::{
    author_service, book_service, customer_service, genre_service, order_service,
    publisher_service, review_service,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::book::list_books,
        api::book::create_book,
        api::book::update_book,
        api::book::delete_book,
        api::author::list_authors,
        api::author::create_author,
        api::author::update_author,
        api::author::delete_author,
        api::genre::list_genres,
        api::genre::create_genre,
        api::genre::update_genre,
        api::genre::delete_genre,
        api::publisher::list_publishers,
        api::publisher::create_publisher,
        api::publisher::update_publisher,
        api::publisher::delete_publisher,
        api::customer::list_customers,
        api::customer::create_customer,
        api::customer::register,
        api::customer::login,
        api::customer::logout,
        api::customer::update_customer,
        api::customer::delete_customer,
        api::order::list_orders,
        api::order::create_order,
        api::order::delete_order,
        api::review::list_reviews,
        api::review::create_review,
        api::review::delete_review,
        api::image::get_image,
        api::category::list_models,
        api::category::model_schema,
    ),
    components(
        schemas(
            BookDto,
            CustomerDto,
            OrderDto,
            OrderDetailDto,
            api::envelope::Deleted,
            book_service::NewBook,
            book_service::BookChanges,
            author_service::NewAuthor,
            author_service::AuthorChanges,
            genre_service::NewGenre,
            genre_service::GenreChanges,
            publisher_service::NewPublisher,
            publisher_service::PublisherChanges,
            customer_service::NewCustomer,
            customer_service::CustomerChanges,
            customer_service::Credentials,
            order_service::NewOrder,
            order_service::OrderLine,
            review_service::NewReview,
        )
    ),
    tags(
        (name = "bookstore", description = "Bookstore API")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_resource() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/book",
            "/api/author/{id}",
            "/api/customer/login",
            "/api/order",
            "/api/review/{id}",
            "/api/category/model",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
