use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use farewatch_core::details::OfferDetails;
use farewatch_core::fingerprint::fingerprint;
use farewatch_core::offer::FlightOffer;
use farewatch_core::supplier::SearchQuery;
use farewatch_offer::{fetch_all_prices, reconcile, RefreshOutcome, WatchKeys};
use farewatch_store::{NewWatch, PricePoint, WatchedFlight, WatchlistRepository};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/watchlist", post(watch).get(list))
        .route("/api/watchlist/refresh", post(refresh))
        .route("/api/watchlist/{id}/history", get(history))
        .route("/api/watchlist/{id}", delete(remove))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchRequest {
    pub airline: Option<String>,
    pub airline_code: Option<String>,
    pub flight_number: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub depart_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub price: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub details: Option<OfferDetails>,
    pub offer_id: Option<String>,
    pub offer: Option<FlightOffer>,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedFlight {
    pub id: i64,
    pub price: Option<i64>,
    pub currency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResults {
    pub count: usize,
    pub refreshed: Vec<RefreshedFlight>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/watchlist
/// Create or update a watched flight, then record the current price.
async fn watch(
    State(state): State<AppState>,
    Json(req): Json<WatchRequest>,
) -> Result<(StatusCode, Json<WatchedFlight>), AppError> {
    let (
        Some(airline),
        Some(flight_number),
        Some(origin),
        Some(destination),
        Some(depart_date),
        Some(return_date),
        Some(price),
    ) = (
        req.airline,
        req.flight_number,
        req.origin,
        req.destination,
        req.depart_date,
        req.return_date,
        req.price,
    )
    else {
        return Err(AppError::Validation("Missing required fields".to_string()));
    };

    let offer_fingerprint = req.offer.as_ref().and_then(fingerprint);

    let new = NewWatch {
        airline,
        airline_code: req.airline_code,
        flight_number,
        origin,
        destination,
        depart_date,
        return_date,
        price,
        currency: req.currency,
        details: req.details,
        offer: req.offer,
        offer_id: req.offer_id,
        offer_fingerprint,
    };

    let row = state.watchlist.watch(&new).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/watchlist
async fn list(State(state): State<AppState>) -> Result<Json<Vec<WatchedFlight>>, AppError> {
    Ok(Json(state.watchlist.list().await?))
}

/// GET /api/watchlist/{id}/history
async fn history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<PricePoint>>, AppError> {
    if state.watchlist.get(id).await?.is_none() {
        return Err(AppError::NotFound(format!("watched flight {id} not found")));
    }
    Ok(Json(state.watchlist.history(id).await?))
}

/// POST /api/watchlist/refresh
/// Re-fetch prices for every watched flight and append an observation each.
async fn refresh(State(state): State<AppState>) -> Result<Json<RefreshResults>, AppError> {
    let watched = state.watchlist.list().await?;
    let mut refreshed = Vec::with_capacity(watched.len());

    // One outbound search per watched flight, strictly sequential.
    for flight in &watched {
        let query = SearchQuery {
            origin: flight.origin.clone(),
            destination: flight.destination.clone(),
            depart_date: flight.depart_date,
            return_date: Some(flight.return_date),
            adults: 1,
            airline: None,
        };
        let priced = fetch_all_prices(&*state.amadeus, &query, state.search.flex_days).await;

        let keys = WatchKeys {
            offer_id: flight.offer_id.as_deref(),
            offer_fingerprint: flight.offer_fingerprint.as_deref(),
            airline_code: flight.airline_code.as_deref(),
        };

        match reconcile(&keys, &priced.results) {
            RefreshOutcome::Selected(best) => {
                state
                    .watchlist
                    .record_price(flight.id, best.price as f64, &best.currency)
                    .await?;
                state
                    .watchlist
                    .update_snapshot(
                        flight.id,
                        &best.details,
                        &best.offer,
                        best.offer_fingerprint.as_deref(),
                        best.offer_id.as_deref(),
                    )
                    .await?;
                refreshed.push(RefreshedFlight {
                    id: flight.id,
                    price: Some(best.price),
                    currency: Some(best.currency.clone()),
                });
            }
            RefreshOutcome::Unavailable => {
                tracing::info!(id = flight.id, "no offers available on refresh");
                refreshed.push(RefreshedFlight {
                    id: flight.id,
                    price: None,
                    currency: None,
                });
            }
        }
    }

    Ok(Json(RefreshResults {
        count: refreshed.len(),
        refreshed,
    }))
}

/// DELETE /api/watchlist/{id}
async fn remove(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if state.watchlist.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("watched flight {id} not found")))
    }
}
