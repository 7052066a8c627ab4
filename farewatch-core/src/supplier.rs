use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::offer::FlightOffer;

/// A round-trip (or one-way) fare search as the pipeline understands it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub origin: String,
    pub destination: String,
    pub depart_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub adults: u32,
    /// Optional IATA airline filter applied supplier-side.
    pub airline: Option<String>,
}

/// Offers plus the supplier's carrier-code → display-name dictionary.
#[derive(Debug, Clone, Default)]
pub struct SearchResponse {
    pub offers: Vec<FlightOffer>,
    pub carriers: HashMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SupplierError {
    #[error("supplier credentials are not configured")]
    MissingCredentials,
    #[error("supplier authentication failed with status {status}")]
    Auth { status: u16 },
    #[error("supplier returned status {status}")]
    Status { status: u16 },
    #[error("failed to reach supplier: {0}")]
    Transport(String),
    #[error("failed to decode supplier response: {0}")]
    Decode(String),
}

/// Capability seam to the external fare supplier. The production
/// implementation lives in the supplier client crate; tests substitute
/// in-memory fakes.
#[async_trait]
pub trait FlightSupplier: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SupplierError>;
}
