use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use farewatch_amadeus::{Airline, ConfirmedPrice, Location};
use farewatch_core::offer::FlightOffer;
use farewatch_core::supplier::SearchQuery;
use farewatch_offer::{fetch_all_prices, CarrierOffer};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/flights/search", get(search))
        .route("/api/flights/price-confirm", post(price_confirm))
        .route("/api/flights/locations", get(locations))
        .route("/api/flights/airlines", get(airlines))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub depart: Option<NaiveDate>,
    #[serde(rename = "return")]
    pub return_date: Option<NaiveDate>,
    pub airline: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub origin: String,
    pub destination: String,
    pub depart_date: NaiveDate,
    pub return_date: NaiveDate,
    pub adults: u32,
    pub results: Vec<CarrierOffer>,
    pub grouped: BTreeMap<String, Vec<CarrierOffer>>,
}

#[derive(Debug, Deserialize)]
pub struct PriceConfirmRequest {
    pub offer: Option<FlightOffer>,
}

#[derive(Debug, Deserialize)]
pub struct LocationsParams {
    #[serde(default)]
    pub keyword: String,
}

#[derive(Debug, Deserialize)]
pub struct AirlinesParams {
    #[serde(default)]
    pub query: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/flights/search?origin=CLT&destination=DXB&depart=YYYY-MM-DD&return=YYYY-MM-DD
async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResults>, AppError> {
    let (Some(depart_date), Some(return_date)) = (params.depart, params.return_date) else {
        return Err(AppError::Validation(
            "depart and return query params are required (YYYY-MM-DD)".to_string(),
        ));
    };

    let origin = params
        .origin
        .unwrap_or_else(|| state.search.default_origin.clone())
        .to_uppercase();
    let destination = params
        .destination
        .unwrap_or_else(|| state.search.default_destination.clone())
        .to_uppercase();

    let query = SearchQuery {
        origin: origin.clone(),
        destination: destination.clone(),
        depart_date,
        return_date: Some(return_date),
        adults: 1,
        airline: params.airline,
    };

    let priced = fetch_all_prices(&*state.amadeus, &query, state.search.flex_days).await;

    Ok(Json(SearchResults {
        origin,
        destination,
        depart_date,
        return_date,
        adults: query.adults,
        results: priced.results,
        grouped: priced.grouped,
    }))
}

/// POST /api/flights/price-confirm
/// Body: { offer: <raw flight offer from a prior search> }
async fn price_confirm(
    State(state): State<AppState>,
    Json(req): Json<PriceConfirmRequest>,
) -> Result<Json<ConfirmedPrice>, AppError> {
    let Some(offer) = req.offer else {
        return Err(AppError::Validation("offer is required".to_string()));
    };

    let priced = state
        .amadeus
        .confirm_price(&offer)
        .await
        .map_err(AppError::Upstream)?;
    Ok(Json(priced))
}

/// GET /api/flights/locations?keyword=
async fn locations(
    State(state): State<AppState>,
    Query(params): Query<LocationsParams>,
) -> Result<Json<Vec<Location>>, AppError> {
    let found = state
        .amadeus
        .search_locations(&params.keyword)
        .await
        .map_err(AppError::Upstream)?;
    Ok(Json(found))
}

/// GET /api/flights/airlines?query=
async fn airlines(
    State(state): State<AppState>,
    Query(params): Query<AirlinesParams>,
) -> Result<Json<Vec<Airline>>, AppError> {
    let found = state
        .amadeus
        .search_airlines(&params.query)
        .await
        .map_err(AppError::Upstream)?;
    Ok(Json(found))
}
