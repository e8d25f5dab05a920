use sqlx::SqliteConnection;

use crate::{db_types::SellerProfile, traits::MarketplaceError};

pub async fn fetch_seller_profile(
    seller_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<SellerProfile>, MarketplaceError> {
    let profile =
        sqlx::query_as("SELECT * FROM seller_profiles WHERE id = $1").bind(seller_id).fetch_optional(conn).await?;
    Ok(profile)
}
