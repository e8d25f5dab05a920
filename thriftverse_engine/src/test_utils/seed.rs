//! Catalogue seeding for tests. The payment engine never creates products or sellers itself, so tests insert them
//! directly.
use sqlx::SqlitePool;
use tv_common::Rupees;

pub async fn seed_product(pool: &SqlitePool, id: &str, seller_id: &str, price: Rupees, stock: i64) {
    sqlx::query(
        "INSERT INTO products (id, seller_id, name, price, availability_count, status) VALUES ($1, $2, $3, $4, $5, \
         'Available')",
    )
    .bind(id)
    .bind(seller_id)
    .bind(format!("Test product {id}"))
    .bind(price)
    .bind(stock)
    .execute(pool)
    .await
    .expect("Error seeding product");
}

pub async fn seed_seller(pool: &SqlitePool, id: &str, email: &str, push_token: Option<&str>, muted: bool) {
    sqlx::query(
        "INSERT INTO seller_profiles (id, name, email, push_token, notifications_muted) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(format!("Seller {id}"))
    .bind(email)
    .bind(push_token)
    .bind(muted)
    .execute(pool)
    .await
    .expect("Error seeding seller");
}
