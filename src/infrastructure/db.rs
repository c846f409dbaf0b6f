use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

use crate::domain::search_key;

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    tracing::info!("Database ready");
    Ok(db)
}

const MIGRATIONS: &[(&str, &str)] = &[
    (
        "authors",
        r#"
        CREATE TABLE IF NOT EXISTS authors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            name_search TEXT NOT NULL DEFAULT '',
            biography TEXT,
            nationality TEXT,
            birth_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "genres",
        r#"
        CREATE TABLE IF NOT EXISTS genres (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            name_search TEXT NOT NULL DEFAULT '',
            description TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "publishers",
        r#"
        CREATE TABLE IF NOT EXISTS publishers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            name_search TEXT NOT NULL DEFAULT '',
            country TEXT,
            website TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "books",
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            title_search TEXT NOT NULL DEFAULT '',
            isbn TEXT,
            description TEXT,
            price REAL NOT NULL DEFAULT 0,
            stock INTEGER NOT NULL DEFAULT 0,
            publication_date TEXT,
            author_id INTEGER NOT NULL,
            genre_id INTEGER NOT NULL,
            publisher_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (author_id) REFERENCES authors(id) ON DELETE CASCADE,
            FOREIGN KEY (genre_id) REFERENCES genres(id) ON DELETE CASCADE,
            FOREIGN KEY (publisher_id) REFERENCES publishers(id) ON DELETE CASCADE
        )
        "#,
    ),
    (
        "customers",
        r#"
        CREATE TABLE IF NOT EXISTS customers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            first_name_search TEXT NOT NULL DEFAULT '',
            last_name_search TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            phone TEXT,
            address TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "orders",
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_id INTEGER NOT NULL,
            order_date TEXT NOT NULL,
            total_amount REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            FOREIGN KEY (customer_id) REFERENCES customers(id) ON DELETE CASCADE
        )
        "#,
    ),
    (
        "order_details",
        r#"
        CREATE TABLE IF NOT EXISTS order_details (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id INTEGER NOT NULL,
            book_id INTEGER NOT NULL,
            price_per_item REAL NOT NULL,
            quantity INTEGER NOT NULL,
            FOREIGN KEY (order_id) REFERENCES orders(id) ON DELETE CASCADE,
            FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE
        )
        "#,
    ),
    (
        "reviews",
        r#"
        CREATE TABLE IF NOT EXISTS reviews (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            book_id INTEGER NOT NULL,
            customer_id INTEGER NOT NULL,
            rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 10),
            comment TEXT,
            created_at TEXT NOT NULL,
            UNIQUE (book_id, customer_id),
            FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE,
            FOREIGN KEY (customer_id) REFERENCES customers(id) ON DELETE CASCADE
        )
        "#,
    ),
];

/// `(table, display column, lowercased shadow column)`
const SEARCH_COLUMNS: &[(&str, &str, &str)] = &[
    ("authors", "name", "name_search"),
    ("genres", "name", "name_search"),
    ("publishers", "name", "name_search"),
    ("books", "title", "title_search"),
    ("customers", "first_name", "first_name_search"),
    ("customers", "last_name", "last_name_search"),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_books_author ON books(author_id)",
    "CREATE INDEX IF NOT EXISTS idx_books_genre ON books(genre_id)",
    "CREATE INDEX IF NOT EXISTS idx_books_publisher ON books(publisher_id)",
    "CREATE INDEX IF NOT EXISTS idx_orders_customer ON orders(customer_id)",
    "CREATE INDEX IF NOT EXISTS idx_order_details_order ON order_details(order_id)",
];

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();

    // Foreign keys are off by default on SQLite connections opened elsewhere
    db.execute(Statement::from_string(
        backend,
        "PRAGMA foreign_keys = ON".to_owned(),
    ))
    .await?;

    for (table, sql) in MIGRATIONS {
        tracing::debug!("Migrating table {}", table);
        db.execute(Statement::from_string(backend, sql.to_string()))
            .await?;
    }

    backfill_search_columns(db).await?;

    for sql in INDEXES {
        db.execute(Statement::from_string(backend, sql.to_string()))
            .await?;
    }

    Ok(())
}

/// Add the shadow columns to databases created before they existed and fill
/// any that are still empty.
async fn backfill_search_columns(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();

    for (table, source, target) in SEARCH_COLUMNS {
        // SQLite has no ADD COLUMN IF NOT EXISTS; a duplicate column error is expected
        let _ = db
            .execute(Statement::from_string(
                backend,
                format!(
                    "ALTER TABLE {} ADD COLUMN {} TEXT NOT NULL DEFAULT ''",
                    table, target
                ),
            ))
            .await;

        let rows = db
            .query_all(Statement::from_string(
                backend,
                format!(
                    "SELECT id, {} FROM {} WHERE {} = '' AND {} <> ''",
                    source, table, target, source
                ),
            ))
            .await?;
        if !rows.is_empty() {
            tracing::info!("Backfilling {}.{} for {} rows", table, target, rows.len());
        }

        for row in rows {
            let id: i32 = row.try_get("", "id")?;
            let value: String = row.try_get("", source)?;
            db.execute(Statement::from_sql_and_values(
                backend,
                format!("UPDATE {} SET {} = ? WHERE id = ?", table, target),
                [search_key(&value).into(), id.into()],
            ))
            .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init DB");
        run_migrations(&db).await.expect("Second run failed");
    }

    #[tokio::test]
    async fn rows_without_search_key_are_backfilled() {
        let db = init_db("sqlite::memory:").await.unwrap();
        let backend = db.get_database_backend();
        db.execute(Statement::from_string(
            backend,
            "INSERT INTO authors (name, created_at, updated_at) VALUES ('Émile Zola', 'x', 'x')"
                .to_owned(),
        ))
        .await
        .unwrap();

        run_migrations(&db).await.unwrap();

        let row = db
            .query_one(Statement::from_string(
                backend,
                "SELECT name_search FROM authors".to_owned(),
            ))
            .await
            .unwrap()
            .unwrap();
        let key: String = row.try_get("", "name_search").unwrap();
        assert_eq!(key, "émile zola");
    }
}
