pub mod app_config;
pub mod database;
pub mod watchlist_repo;

pub use database::DbClient;
pub use watchlist_repo::{
    NewWatch, PostgresWatchlistRepository, PricePoint, WatchedFlight, WatchlistRepository,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("snapshot serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
