//! Demo data for `SEED_DEMO`, plus the order total reconciliation pass.

use sea_orm::*;

use crate::domain::{capitalize_words, search_key};
use crate::infrastructure::auth::hash_password;
use crate::models::{author, book, customer, genre, order, order_detail, publisher, review};
use crate::services::order_service::round_amount;

pub const DEMO_EMAIL: &str = "demo@bookstore.local";
pub const DEMO_PASSWORD: &str = "bookstore-demo";

/// Seed a small catalogue, one customer with orders and reviews. Does
/// nothing when authors already exist.
pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DbErr> {
    if author::Entity::find().count(db).await? > 0 {
        tracing::info!("Catalogue already populated, skipping demo seed");
        return Ok(());
    }
    let now = chrono::Utc::now().to_rfc3339();

    // 1. Authors
    let authors = [
        ("gabriel garcía márquez", "Colombian", "1927-03-06"),
        ("ursula k. le guin", "American", "1929-10-21"),
        ("frank herbert", "American", "1920-10-08"),
    ];
    let mut author_ids = Vec::new();
    for (name, nationality, born) in authors {
        let name = capitalize_words(name);
        let model = author::ActiveModel {
            name_search: Set(search_key(&name)),
            name: Set(name),
            nationality: Set(Some(nationality.to_owned())),
            birth_date: Set(Some(born.to_owned())),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        author_ids.push(model.id);
    }

    // 2. Genres and publishers
    let mut genre_ids = Vec::new();
    for name in ["Magical Realism", "Science Fiction", "Fantasy"] {
        let model = genre::ActiveModel {
            name: Set(name.to_owned()),
            name_search: Set(search_key(name)),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        genre_ids.push(model.id);
    }

    let mut publisher_ids = Vec::new();
    for (name, country) in [("Harper & Row", "United States"), ("Ace Books", "United States")] {
        let model = publisher::ActiveModel {
            name: Set(name.to_owned()),
            name_search: Set(search_key(name)),
            country: Set(Some(country.to_owned())),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        publisher_ids.push(model.id);
    }

    // 3. Books: (title, isbn, price, stock, published, author, genre, publisher)
    let books = [
        ("One Hundred Years of Solitude", "9780060883287", 17.99, 12, "1967-05-30", 0, 0, 0),
        ("Love in the Time of Cholera", "9780307389732", 16.00, 7, "1985-09-05", 0, 0, 0),
        ("The Left Hand of Darkness", "9780441478125", 9.99, 4, "1969-03-01", 1, 1, 1),
        ("A Wizard of Earthsea", "9780547773742", 10.99, 9, "1968-11-01", 1, 2, 1),
        ("Dune", "9780441172719", 10.29, 20, "1965-08-01", 2, 1, 1),
    ];
    let mut book_rows = Vec::new();
    for (title, isbn, price, stock, published, a, g, p) in books {
        let model = book::ActiveModel {
            title: Set(title.to_owned()),
            title_search: Set(search_key(title)),
            isbn: Set(Some(isbn.to_owned())),
            price: Set(price),
            stock: Set(stock),
            publication_date: Set(Some(published.to_owned())),
            author_id: Set(author_ids[a]),
            genre_id: Set(genre_ids[g]),
            publisher_id: Set(publisher_ids[p]),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        book_rows.push(model);
    }

    // 4. Demo customer
    let password_hash = hash_password(DEMO_PASSWORD).map_err(DbErr::Custom)?;
    let demo = customer::ActiveModel {
        first_name: Set("Demo".to_owned()),
        last_name: Set("Reader".to_owned()),
        first_name_search: Set("demo".to_owned()),
        last_name_search: Set("reader".to_owned()),
        email: Set(DEMO_EMAIL.to_owned()),
        password_hash: Set(password_hash),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    // 5. Orders, totals left at zero for the reconciliation pass
    for lines in [vec![(0, 1), (4, 2)], vec![(2, 1)]] {
        let order = order::ActiveModel {
            customer_id: Set(demo.id),
            order_date: Set(now.clone()),
            total_amount: Set(0.0),
            created_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        for (book_index, quantity) in lines {
            let book = &book_rows[book_index];
            order_detail::ActiveModel {
                order_id: Set(order.id),
                book_id: Set(book.id),
                price_per_item: Set(book.price),
                quantity: Set(quantity),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }

    // 6. Reviews
    for (book_index, rating, comment) in [(0, 10, "A masterpiece"), (4, 8, "Dense but rewarding")] {
        review::ActiveModel {
            book_id: Set(book_rows[book_index].id),
            customer_id: Set(demo.id),
            rating: Set(rating),
            comment: Set(Some(comment.to_owned())),
            created_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    tracing::info!(
        "Seeded {} authors, {} books and customer {}",
        author_ids.len(),
        book_rows.len(),
        DEMO_EMAIL
    );
    Ok(())
}

/// Recompute every order total from its lines. Returns how many orders
/// changed.
pub async fn reconcile_order_totals(db: &DatabaseConnection) -> Result<u64, DbErr> {
    let orders = order::Entity::find()
        .find_with_related(order_detail::Entity)
        .all(db)
        .await?;

    let mut updated = 0;
    for (order, details) in orders {
        let total = round_amount(details.iter().map(order_detail::Model::line_total).sum());
        if (order.total_amount - total).abs() < f64::EPSILON {
            continue;
        }
        let mut active: order::ActiveModel = order.into();
        active.total_amount = Set(total);
        active.update(db).await?;
        updated += 1;
    }

    if updated > 0 {
        tracing::info!("Reconciled {} order totals", updated);
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::db::init_db;

    #[tokio::test]
    async fn seeding_is_idempotent_and_totals_reconcile() {
        let db = init_db("sqlite::memory:").await.unwrap();

        seed_demo_data(&db).await.unwrap();
        seed_demo_data(&db).await.unwrap();
        assert_eq!(author::Entity::find().count(&db).await.unwrap(), 3);

        assert_eq!(reconcile_order_totals(&db).await.unwrap(), 2);
        assert_eq!(reconcile_order_totals(&db).await.unwrap(), 0);

        let totals: Vec<f64> = order::Entity::find()
            .order_by_asc(order::Column::Id)
            .all(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.total_amount)
            .collect();
        assert_eq!(totals, vec![round_amount(17.99 + 2.0 * 10.29), 9.99]);
    }
}
