use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;

use farewatch_core::details::OfferDetails;
use farewatch_core::offer::FlightOffer;

use crate::StoreError;

/// A watched flight row, with the latest and lowest recorded price joined in.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WatchedFlight {
    pub id: i64,
    pub airline: String,
    pub airline_code: Option<String>,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub depart_date: NaiveDate,
    pub return_date: NaiveDate,
    pub offer_id: Option<String>,
    pub offer_fingerprint: Option<String>,
    /// Raw supplier offer snapshot as of the last watch/refresh.
    pub offer: Option<serde_json::Value>,
    /// Normalized details snapshot as of the last watch/refresh.
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub min_price: Option<f64>,
    pub last_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub id: i64,
    pub price: f64,
    pub currency: String,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWatch {
    pub airline: String,
    pub airline_code: Option<String>,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub depart_date: NaiveDate,
    pub return_date: NaiveDate,
    pub price: f64,
    pub currency: String,
    pub details: Option<OfferDetails>,
    pub offer: Option<FlightOffer>,
    pub offer_id: Option<String>,
    pub offer_fingerprint: Option<String>,
}

/// Data access for watched flights and their price history.
#[async_trait]
pub trait WatchlistRepository: Send + Sync {
    /// Create a watch, or update the existing row when the offer fingerprint
    /// is already watched. Appends one price observation either way.
    async fn watch(&self, new: &NewWatch) -> Result<WatchedFlight, StoreError>;

    async fn list(&self) -> Result<Vec<WatchedFlight>, StoreError>;

    async fn get(&self, id: i64) -> Result<Option<WatchedFlight>, StoreError>;

    async fn history(&self, id: i64) -> Result<Vec<PricePoint>, StoreError>;

    /// Append a price observation for an existing watch.
    async fn record_price(&self, id: i64, price: f64, currency: &str) -> Result<(), StoreError>;

    /// Rebind the stored snapshots after a refresh selected a fresh offer.
    async fn update_snapshot(
        &self,
        id: i64,
        details: &OfferDetails,
        offer: &FlightOffer,
        offer_fingerprint: Option<&str>,
        offer_id: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Delete a watch. History rows go with it via the FK cascade.
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
}

pub struct PostgresWatchlistRepository {
    pub pool: PgPool,
}

const SELECT_WITH_AGGREGATES: &str = r#"
SELECT wf.*,
       (SELECT MIN(ph.price) FROM price_history ph WHERE ph.watched_flight_id = wf.id) AS min_price,
       (SELECT ph.price FROM price_history ph WHERE ph.watched_flight_id = wf.id
         ORDER BY ph.fetched_at DESC LIMIT 1) AS last_price
FROM watched_flights wf
"#;

#[async_trait]
impl WatchlistRepository for PostgresWatchlistRepository {
    async fn watch(&self, new: &NewWatch) -> Result<WatchedFlight, StoreError> {
        let details = new.details.as_ref().map(serde_json::to_value).transpose()?;
        let offer = new.offer.as_ref().map(serde_json::to_value).transpose()?;

        let mut tx = self.pool.begin().await?;

        let watched_id: i64 = if new.offer_id.is_some() || new.offer_fingerprint.is_some() {
            sqlx::query_scalar(
                r#"
                INSERT INTO watched_flights
                    (airline, airline_code, flight_number, origin, destination,
                     depart_date, return_date, offer_id, offer_fingerprint, offer, details)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                ON CONFLICT (offer_fingerprint) DO UPDATE SET
                    offer = EXCLUDED.offer,
                    details = EXCLUDED.details,
                    offer_id = COALESCE(EXCLUDED.offer_id, watched_flights.offer_id)
                RETURNING id
                "#,
            )
            .bind(&new.airline)
            .bind(new.airline_code.as_deref())
            .bind(&new.flight_number)
            .bind(&new.origin)
            .bind(&new.destination)
            .bind(new.depart_date)
            .bind(new.return_date)
            .bind(new.offer_id.as_deref())
            .bind(new.offer_fingerprint.as_deref())
            .bind(&offer)
            .bind(&details)
            .fetch_one(&mut *tx)
            .await?
        } else {
            sqlx::query_scalar(
                r#"
                INSERT INTO watched_flights
                    (airline, airline_code, flight_number, origin, destination,
                     depart_date, return_date, details)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING id
                "#,
            )
            .bind(&new.airline)
            .bind(new.airline_code.as_deref())
            .bind(&new.flight_number)
            .bind(&new.origin)
            .bind(&new.destination)
            .bind(new.depart_date)
            .bind(new.return_date)
            .bind(&details)
            .fetch_one(&mut *tx)
            .await?
        };

        sqlx::query("INSERT INTO price_history (watched_flight_id, price, currency) VALUES ($1, $2, $3)")
            .bind(watched_id)
            .bind(new.price)
            .bind(&new.currency)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let sql = format!("{SELECT_WITH_AGGREGATES} WHERE wf.id = $1");
        let row = sqlx::query_as::<_, WatchedFlight>(&sql)
            .bind(watched_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list(&self) -> Result<Vec<WatchedFlight>, StoreError> {
        let sql = format!("{SELECT_WITH_AGGREGATES} ORDER BY wf.created_at DESC");
        let rows = sqlx::query_as::<_, WatchedFlight>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get(&self, id: i64) -> Result<Option<WatchedFlight>, StoreError> {
        let sql = format!("{SELECT_WITH_AGGREGATES} WHERE wf.id = $1");
        let row = sqlx::query_as::<_, WatchedFlight>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn history(&self, id: i64) -> Result<Vec<PricePoint>, StoreError> {
        let rows = sqlx::query_as::<_, PricePoint>(
            r#"
            SELECT id, price, currency, fetched_at
            FROM price_history
            WHERE watched_flight_id = $1
            ORDER BY fetched_at ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn record_price(&self, id: i64, price: f64, currency: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO price_history (watched_flight_id, price, currency) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(price)
            .bind(currency)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_snapshot(
        &self,
        id: i64,
        details: &OfferDetails,
        offer: &FlightOffer,
        offer_fingerprint: Option<&str>,
        offer_id: Option<&str>,
    ) -> Result<(), StoreError> {
        let details = serde_json::to_value(details)?;
        let offer = serde_json::to_value(offer)?;

        sqlx::query(
            r#"
            UPDATE watched_flights
            SET details = $1,
                offer = $2,
                offer_fingerprint = $3,
                offer_id = COALESCE($4, offer_id)
            WHERE id = $5
            "#,
        )
        .bind(&details)
        .bind(&offer)
        .bind(offer_fingerprint)
        .bind(offer_id)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM watched_flights WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
